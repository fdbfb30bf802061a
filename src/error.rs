use crate::ident::ReportId;

/// Transport failure from the fetch capability. Carries the URL so callers
/// can log it and decide on a retry.
#[derive(Debug, thiserror::Error)]
#[error("fetch {url}: {message}")]
pub struct FetchError {
    pub url: String,
    pub message: String,
}

impl FetchError {
    pub fn new(url: impl Into<String>, message: impl ToString) -> Self {
        Self {
            url: url.into(),
            message: message.to_string(),
        }
    }
}

/// Index pages define the identifier universe, so these abort the run.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("index page unavailable: {0}")]
    Fetch(#[from] FetchError),
    #[error("no period index links found on {url}")]
    NoIndexLinks { url: String },
}

/// Failure processing a single report. Caught at the per-identifier
/// boundary; the batch carries on.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("report {id}: {source}")]
    Fetch {
        id: ReportId,
        #[source]
        source: FetchError,
    },
    #[error("unknown report type {label:?}")]
    UnknownReportType { label: String },
    #[error("unparseable {field} timestamp {raw:?}")]
    DateParse { field: &'static str, raw: String },
    #[error("report history incomplete: {0}")]
    AmendmentParse(String),
    #[error("layout mismatch: {0}")]
    StructuralParse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Classify,
    History,
    Extract,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Fetch => "fetch",
            Stage::Classify => "classify",
            Stage::History => "history",
            Stage::Extract => "extract",
        }
    }
}

impl ReportError {
    pub fn stage(&self) -> Stage {
        match self {
            ReportError::Fetch { .. } => Stage::Fetch,
            ReportError::UnknownReportType { .. } | ReportError::DateParse { .. } => {
                Stage::Classify
            }
            ReportError::AmendmentParse(_) => Stage::History,
            ReportError::StructuralParse(_) => Stage::Extract,
        }
    }

    pub(crate) fn missing(what: impl std::fmt::Display) -> Self {
        ReportError::StructuralParse(format!("missing {}", what))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("payload encoding: {0}")]
    Json(#[from] serde_json::Error),
    #[error("stored identifier {0:?} is malformed")]
    BadIdentifier(String),
    #[error("database directory: {0}")]
    Io(#[from] std::io::Error),
}
