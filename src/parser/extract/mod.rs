pub mod annual;
pub mod client;
pub mod quarterly;
pub mod registration;

use std::sync::LazyLock;

use regex::Regex;

use super::query::Document;
use crate::error::ReportError;
use crate::model::{ReportType, TypeSpecificFields};

static QUARTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:q([1-4])|([1-4])(?:st|nd|rd|th)\s+quarter|quarter\s+([1-4]),?)\s+(\d{4})$")
        .unwrap()
});
static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:(?:calendar\s+)?year\s+)?(\d{4})$").unwrap());

/// Type-specific field extraction. Implementations only do label lookups
/// through [`Document`]; they never walk the tree themselves.
pub trait Extractor: Sync {
    fn extract(&self, doc: &Document) -> Result<TypeSpecificFields, ReportError>;
}

pub fn extractor_for(report_type: ReportType) -> &'static dyn Extractor {
    match report_type {
        ReportType::BasicRegistration => &registration::BasicRegistration,
        ReportType::ClientEmployerRegistration => &client::ClientEmployerRegistration,
        ReportType::QuarterlyExpenseReport => &quarterly::QuarterlyExpenses,
        ReportType::AnnualExpenseReport => &annual::AnnualExpenses,
    }
}

/// `Q3 2012`, `3rd Quarter 2012` or `Quarter 3, 2012` -> (2012, 3).
pub fn parse_quarter(raw: &str) -> Option<(i32, u8)> {
    let caps = QUARTER_RE.captures(raw.trim())?;
    let quarter = caps
        .get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))?
        .as_str()
        .parse()
        .ok()?;
    let year = caps[4].parse().ok()?;
    Some((year, quarter))
}

/// `2012`, `Year 2012` or `Calendar Year 2012`.
pub fn parse_year(raw: &str) -> Option<i32> {
    YEAR_RE.captures(raw.trim())?[1].parse().ok()
}

/// Dollar amount in cents. Accepts `$1,234.56`, `1234`, `-5.5` and the
/// accounting form `($12.00)`.
pub fn parse_cents(raw: &str) -> Result<i64, ReportError> {
    let bad = || ReportError::StructuralParse(format!("bad amount {raw:?}"));

    let s = raw.trim().replace(['$', ',', ' '], "");
    let (negative, s) = if let Some(inner) = s.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
        (true, inner)
    } else if let Some(rest) = s.strip_prefix('-') {
        (true, rest)
    } else {
        (false, s.as_str())
    };

    let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
    let digits = |p: &str| p.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && frac.is_empty()) || !digits(whole) || !digits(frac) || frac.len() > 2 {
        return Err(bad());
    }

    let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().map_err(|_| bad())? };
    let frac: i64 = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().map_err(|_| bad())? * 10,
        _ => frac.parse().map_err(|_| bad())?,
    };
    let cents = whole.checked_mul(100).and_then(|w| w.checked_add(frac)).ok_or_else(bad)?;
    Ok(if negative { -cents } else { cents })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarters() {
        assert_eq!(parse_quarter("Q3 2012"), Some((2012, 3)));
        assert_eq!(parse_quarter("q1  2010"), Some((2010, 1)));
        assert_eq!(parse_quarter("2nd Quarter 2011"), Some((2011, 2)));
        assert_eq!(parse_quarter("Quarter 4, 2009"), Some((2009, 4)));
        assert_eq!(parse_quarter("Q5 2012"), None);
        assert_eq!(parse_quarter("2012"), None);
    }

    #[test]
    fn years() {
        assert_eq!(parse_year("2012"), Some(2012));
        assert_eq!(parse_year("Calendar Year 2012"), Some(2012));
        assert_eq!(parse_year("Q3 2012"), None);
        assert_eq!(parse_year(""), None);
    }

    #[test]
    fn amounts() {
        assert_eq!(parse_cents("$1,234.56").unwrap(), 123_456);
        assert_eq!(parse_cents("1234").unwrap(), 123_400);
        assert_eq!(parse_cents("$0.5").unwrap(), 50);
        assert_eq!(parse_cents("($12.00)").unwrap(), -1_200);
        assert_eq!(parse_cents("-.75").unwrap(), -75);
    }

    #[test]
    fn bad_amounts() {
        for raw in ["", "$", "abc", "1.234", "12.3.4", "$1,2a4"] {
            assert!(
                matches!(parse_cents(raw), Err(ReportError::StructuralParse(_))),
                "accepted {raw:?}"
            );
        }
    }

    #[test]
    fn every_type_has_an_extractor() {
        // Each extractor rejects an empty page with a layout error rather
        // than producing fields for the wrong type.
        let doc = Document::parse("<html></html>");
        for t in ReportType::ALL {
            assert!(matches!(
                extractor_for(t).extract(&doc),
                Err(ReportError::StructuralParse(_))
            ));
        }
    }
}
