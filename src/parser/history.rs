use chrono::NaiveDateTime;

use super::query::{following_markup, sibling_text, Document, Scope};
use crate::error::ReportError;
use crate::ident;
use crate::model::{FilingRef, ReportHistory};

const HISTORY_LABEL: &str = "Report History";
const ORIGINAL_LABEL: &str = "Originally filed:";
const AMENDMENT_LABEL: &str = "Amendment filed:";
/// `4/14/2009 10:35:06 AM`
const HISTORY_FORMAT: &str = "%m/%d/%Y %I:%M:%S %p";

/// `None` when the report has no history block. Once the block is present
/// both rows must parse completely; a half-filled history is corrupt data.
pub fn read_history(doc: &Document) -> Result<Option<ReportHistory>, ReportError> {
    let Some(marker) = doc.find_cell_by_label(HISTORY_LABEL) else {
        return Ok(None);
    };
    let scope = Scope::table_of(marker).unwrap_or_else(|| doc.root());

    let original = filing_ref(&scope, ORIGINAL_LABEL)?;
    let amendment = filing_ref(&scope, AMENDMENT_LABEL)?;
    if original.id == amendment.id {
        return Err(ReportError::AmendmentParse(format!(
            "original and amendment both point at {}",
            original.id
        )));
    }
    Ok(Some(ReportHistory {
        original,
        amendment,
    }))
}

fn filing_ref(scope: &Scope, label: &str) -> Result<FilingRef, ReportError> {
    let cell = scope
        .find_cell_by_label(label)
        .ok_or_else(|| ReportError::AmendmentParse(format!("no {label:?} row")))?;

    let raw = sibling_text(cell)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ReportError::AmendmentParse(format!("no timestamp after {label:?}")))?;
    let filed_at = NaiveDateTime::parse_from_str(&raw, HISTORY_FORMAT).map_err(|_| {
        ReportError::AmendmentParse(format!("bad timestamp {raw:?} after {label:?}"))
    })?;

    let id = ident::find_all(&following_markup(cell))
        .next()
        .ok_or_else(|| ReportError::AmendmentParse(format!("no report link after {label:?}")))?;

    Ok(FilingRef { id, filed_at })
}
