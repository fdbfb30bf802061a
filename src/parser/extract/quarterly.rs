use super::{parse_cents, parse_quarter, Extractor};
use crate::error::ReportError;
use crate::model::{Expenditure, TypeSpecificFields};
use crate::parser::query::Document;

const ITEM_COLUMNS: [&str; 4] = ["Date", "Payee", "Purpose", "Amount"];

pub struct QuarterlyExpenses;

impl Extractor for QuarterlyExpenses {
    fn extract(&self, doc: &Document) -> Result<TypeSpecificFields, ReportError> {
        let summary = doc.section("Report of Expenditures", "Reporting Period")?;
        let lobbyist = summary.required("Lobbyist")?;
        let period = summary.required("Reporting Period")?;
        let (year, quarter) = parse_quarter(&period)
            .ok_or_else(|| ReportError::StructuralParse(format!("not a quarter: {period:?}")))?;
        let compensation_cents = parse_cents(&summary.required("Compensation")?)?;
        let expenses_cents = parse_cents(&summary.required("Total Expenditures")?)?;

        // A quarter with nothing spent still prints the empty grid.
        let items = doc
            .section("Itemized Expenditures", ITEM_COLUMNS[0])?
            .grid(&ITEM_COLUMNS)?
            .into_iter()
            .map(|row| {
                Ok(Expenditure {
                    date: row[0].clone(),
                    payee: row[1].clone(),
                    purpose: row[2].clone(),
                    amount_cents: parse_cents(&row[3])?,
                })
            })
            .collect::<Result<Vec<_>, ReportError>>()?;

        Ok(TypeSpecificFields::QuarterlyExpenses {
            lobbyist,
            year,
            quarter,
            compensation_cents,
            expenses_cents,
            items,
        })
    }
}
