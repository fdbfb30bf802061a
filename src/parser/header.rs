use chrono::NaiveDateTime;

use super::extract::{parse_quarter, parse_year};
use super::query::{cell_text, normalize_whitespace, Document};
use crate::error::ReportError;
use crate::model::{ReportHint, ReportType};

const PREFIX: &str = "SEEC -";
const FILED: &str = "Filed";
/// `Aug 14 2012  5:25PM`, after whitespace is collapsed.
const FILED_FORMAT: &str = "%b %d %Y %I:%M%p";
const PERIOD_LABEL: &str = "Reporting Period";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderKind {
    Known(ReportType),
    /// Quarterly and annual expense reports print the same title.
    Expenditures,
}

const LABELS: &[(&str, HeaderKind)] = &[
    ("BASIC LOBBYIST REGISTRATION STATEMENT", HeaderKind::Known(ReportType::BasicRegistration)),
    ("CLIENT/EMPLOYER REGISTRATION STATEMENT", HeaderKind::Known(ReportType::ClientEmployerRegistration)),
    ("CLIENT EMPLOYER REGISTRATION STATEMENT", HeaderKind::Known(ReportType::ClientEmployerRegistration)),
    ("QUARTERLY REPORT OF EXPENDITURES", HeaderKind::Known(ReportType::QuarterlyExpenseReport)),
    ("ANNUAL REPORT OF EXPENDITURES", HeaderKind::Known(ReportType::AnnualExpenseReport)),
    ("LOBBYIST REPORT OF EXPENDITURES", HeaderKind::Expenditures),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub label: String,
    pub report_type: ReportType,
    pub filed_at: NaiveDateTime,
}

/// Report type and filing time from the header cell, e.g.
/// `SEEC - BASIC LOBBYIST REGISTRATION STATEMENT<br/>Filed Aug 14 2012  5:25PM`.
pub fn classify(doc: &Document, hint: Option<ReportHint>) -> Result<Classified, ReportError> {
    let cell = doc
        .find_cell_containing(PREFIX)
        .ok_or_else(|| ReportError::missing("header cell"))?;
    let text = cell_text(cell);
    let (label, raw_date) = split_header(&text)?;

    let kind = LABELS
        .iter()
        .find(|(known, _)| *known == label)
        .map(|(_, kind)| *kind)
        .ok_or_else(|| ReportError::UnknownReportType {
            label: label.clone(),
        })?;

    let report_type = match kind {
        HeaderKind::Known(t) => t,
        HeaderKind::Expenditures => disambiguate(doc, hint, &label)?,
    };

    Ok(Classified {
        label,
        report_type,
        filed_at: parse_filed_at(raw_date)?,
    })
}

/// Uppercased type label and the raw text after the `Filed` marker.
fn split_header(text: &str) -> Result<(String, &str), ReportError> {
    let start = text
        .find(PREFIX)
        .map(|i| i + PREFIX.len())
        .ok_or_else(|| ReportError::missing("header prefix"))?;
    let rest = &text[start..];
    let filed = rest
        .find(FILED)
        .ok_or_else(|| ReportError::missing("filing date in header"))?;
    let label = rest[..filed].trim().to_uppercase();
    Ok((label, rest[filed + FILED.len()..].trim()))
}

pub fn parse_filed_at(raw: &str) -> Result<NaiveDateTime, ReportError> {
    let collapsed = normalize_whitespace(raw);
    NaiveDateTime::parse_from_str(&collapsed, FILED_FORMAT).map_err(|_| ReportError::DateParse {
        field: "filed",
        raw: raw.to_string(),
    })
}

/// The reporting period printed in the body decides; the discovery hint is
/// only a fallback for pages whose period is missing or unreadable.
fn disambiguate(
    doc: &Document,
    hint: Option<ReportHint>,
    label: &str,
) -> Result<ReportType, ReportError> {
    let period = doc.root().optional(PERIOD_LABEL).unwrap_or_default();
    if parse_quarter(&period).is_some() {
        Ok(ReportType::QuarterlyExpenseReport)
    } else if parse_year(&period).is_some() {
        Ok(ReportType::AnnualExpenseReport)
    } else if let Some(h) = hint {
        Ok(h.report_type())
    } else {
        Err(ReportError::UnknownReportType {
            label: format!("{label} (period {period:?})"),
        })
    }
}
