pub mod extract;
pub mod header;
pub mod history;
pub mod query;

use crate::error::ReportError;
use crate::ident::ReportId;
use crate::model::{Report, ReportHint};
use query::Document;

/// Markup -> classified, fully extracted report. Any failure rejects the whole
/// report; nothing partial comes out of here.
pub fn process_report(
    id: &ReportId,
    base_url: &str,
    markup: &str,
    hint: Option<ReportHint>,
) -> Result<Report, ReportError> {
    let doc = Document::parse(markup);
    let header = header::classify(&doc, hint)?;
    let history = history::read_history(&doc)?;
    let fields = extract::extractor_for(header.report_type).extract(&doc)?;

    Ok(Report {
        id: id.clone(),
        permalink: id.permalink(base_url),
        report_type: header.report_type,
        filed_at: header.filed_at,
        history,
        fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Stage;
    use crate::model::{ReportType, TypeSpecificFields};

    const BASE: &str = "http://www2.seattle.gov/ethics";

    fn id() -> ReportId {
        ReportId::parse("5D1E8C3A-7B2F-4E11-9A0C-3F6B2D8E1A47").unwrap()
    }

    fn load(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap()
    }

    #[test]
    fn basic_registration_end_to_end() {
        let r = process_report(&id(), BASE, &load("basic_registration"), None).unwrap();
        assert_eq!(r.report_type, ReportType::BasicRegistration);
        assert_eq!(r.filed_at.to_string(), "2012-08-14 17:25:00");
        assert!(r.history.is_none());
        assert_eq!(r.original_report_ref(), None);
        assert_eq!(r.originally_filed_at(), None);
        assert!(r.permalink.ends_with("prguid=5D1E8C3A-7B2F-4E11-9A0C-3F6B2D8E1A47"));
        assert!(matches!(r.fields, TypeSpecificFields::BasicRegistration { .. }));
    }

    #[test]
    fn amended_registration_carries_history() {
        let r = process_report(&id(), BASE, &load("amended_registration"), None).unwrap();
        assert_eq!(
            r.original_report_ref().map(|i| i.as_str()),
            Some("6C0FFEE1-0000-4000-8000-00000000A001")
        );
        assert_eq!(
            r.amendment_report_ref().map(|i| i.as_str()),
            Some("6C0FFEE1-0000-4000-8000-00000000A002")
        );
        assert_eq!(r.originally_filed_at().unwrap().to_string(), "2009-04-14 10:35:06");
        assert_eq!(r.amendment_filed_at().unwrap().to_string(), "2009-05-02 15:10:44");
        let TypeSpecificFields::BasicRegistration { filer } = &r.fields else {
            panic!("wrong variant");
        };
        assert_eq!(filer.organization, None);
    }

    #[test]
    fn expense_reports_split_by_period() {
        let q = process_report(&id(), BASE, &load("quarterly_expenses"), None).unwrap();
        assert_eq!(q.report_type, ReportType::QuarterlyExpenseReport);
        let a = process_report(&id(), BASE, &load("annual_expenses"), None).unwrap();
        assert_eq!(a.report_type, ReportType::AnnualExpenseReport);
        assert_eq!(a.fields.report_type(), a.report_type);
    }

    #[test]
    fn misleading_hint_is_overruled_by_period() {
        let r = process_report(
            &id(),
            BASE,
            &load("annual_expenses"),
            Some(ReportHint::Quarterly),
        )
        .unwrap();
        assert_eq!(r.report_type, ReportType::AnnualExpenseReport);
    }

    #[test]
    fn hint_used_when_period_unreadable() {
        let html = load("quarterly_expenses").replace("Q3 2012", "Third quarter");
        let err = process_report(&id(), BASE, &html, Some(ReportHint::Quarterly)).unwrap_err();
        // Classified by the hint; the quarterly extractor then rejects the period.
        assert_eq!(err.stage(), Stage::Extract);
        let err = process_report(&id(), BASE, &html, None).unwrap_err();
        assert!(matches!(err, ReportError::UnknownReportType { .. }));
    }

    #[test]
    fn partial_history_rejects_report() {
        let html = load("amended_registration").replace("Amendment filed:", "Amended:");
        let err = process_report(&id(), BASE, &html, None).unwrap_err();
        assert!(matches!(err, ReportError::AmendmentParse(_)));
        assert_eq!(err.stage(), Stage::History);
    }
}
