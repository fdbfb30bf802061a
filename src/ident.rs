use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// 8-4-4-4-12 token. Braces in the markup sit outside the match, so the
/// captured text is already the unbraced form. Boundaries are checked by
/// [`find_all`]: only an alphanumeric neighbour disqualifies a match.
pub static ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9A-Za-z]{8}-[0-9A-Za-z]{4}-[0-9A-Za-z]{4}-[0-9A-Za-z]{4}-[0-9A-Za-z]{12}")
        .unwrap()
});

const PERMALINK_PATH: &str = "/eldata/filings/popfiling.asp?prguid=";

/// Canonical report identifier: no braces, uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(String);

impl ReportId {
    /// Accepts `XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX` with or without a
    /// surrounding `{}` pair. Anything else is rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        let s = raw.trim();
        let s = match (s.strip_prefix('{'), s.ends_with('}')) {
            (Some(inner), true) => &inner[..inner.len() - 1],
            (None, false) => s,
            _ => return None,
        };
        let m = ID_RE.find(s)?;
        if m.start() != 0 || m.end() != s.len() {
            return None;
        }
        Some(Self(s.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Brace-free fixed link to the report popup.
    pub fn permalink(&self, base_url: &str) -> String {
        format!("{}{}{}", base_url.trim_end_matches('/'), PERMALINK_PATH, self.0)
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Every identifier occurring in `text`, in document order, duplicates kept.
/// `_`, `=`, braces and other punctuation may touch an identifier; a letter
/// or digit may not.
pub fn find_all(text: &str) -> impl Iterator<Item = ReportId> + '_ {
    ID_RE
        .find_iter(text)
        .filter(move |m| {
            let before = text[..m.start()].chars().next_back();
            let after = text[m.end()..].chars().next();
            !before.is_some_and(|c| c.is_ascii_alphanumeric())
                && !after.is_some_and(|c| c.is_ascii_alphanumeric())
        })
        .map(|m| ReportId(m.as_str().to_ascii_uppercase()))
}
