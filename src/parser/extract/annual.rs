use super::{parse_cents, parse_year, Extractor};
use crate::error::ReportError;
use crate::model::{ClientTotal, TypeSpecificFields};
use crate::parser::query::Document;

const CLIENT_COLUMNS: [&str; 3] = ["Client", "Compensation", "Expenditures"];

pub struct AnnualExpenses;

impl Extractor for AnnualExpenses {
    fn extract(&self, doc: &Document) -> Result<TypeSpecificFields, ReportError> {
        let summary = doc.section("Report of Expenditures", "Reporting Period")?;
        let lobbyist = summary.required("Lobbyist")?;
        let period = summary.required("Reporting Period")?;
        let year = parse_year(&period)
            .ok_or_else(|| ReportError::StructuralParse(format!("not a year: {period:?}")))?;

        let clients = doc
            .section("Client Totals", CLIENT_COLUMNS[0])?
            .grid(&CLIENT_COLUMNS)?
            .into_iter()
            .map(|row| {
                Ok(ClientTotal {
                    client: row[0].clone(),
                    compensation_cents: parse_cents(&row[1])?,
                    expenses_cents: parse_cents(&row[2])?,
                })
            })
            .collect::<Result<Vec<_>, ReportError>>()?;

        // An annual report always lists at least one client.
        if clients.is_empty() {
            return Err(ReportError::missing("client totals"));
        }

        Ok(TypeSpecificFields::AnnualExpenses {
            lobbyist,
            year,
            clients,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> String {
        std::fs::read_to_string("tests/fixtures/annual_expenses.html").unwrap()
    }

    #[test]
    fn client_totals() {
        let fields = AnnualExpenses.extract(&Document::parse(&fixture())).unwrap();
        let TypeSpecificFields::AnnualExpenses { lobbyist, year, clients } = fields else {
            panic!("wrong variant");
        };
        assert_eq!(lobbyist, "Jane Q. Doe");
        assert_eq!(year, 2012);
        assert_eq!(
            clients,
            vec![
                ClientTotal {
                    client: "Acme Widgets Inc.".into(),
                    compensation_cents: 4_800_000,
                    expenses_cents: 31_250,
                },
                ClientTotal {
                    client: "Northwest Ferries Assn.".into(),
                    compensation_cents: 1_200_000,
                    expenses_cents: 0,
                },
            ]
        );
    }

    #[test]
    fn no_clients_is_structural() {
        let html = fixture();
        let start = html.find("<!-- clients -->").unwrap();
        let end = html.find("<!-- /clients -->").unwrap();
        let stripped = format!("{}{}", &html[..start], &html[end..]);
        assert!(matches!(
            AnnualExpenses.extract(&Document::parse(&stripped)),
            Err(ReportError::StructuralParse(_))
        ));
    }

    fn client_names(html: &str) -> Vec<String> {
        match AnnualExpenses.extract(&Document::parse(html)).unwrap() {
            TypeSpecificFields::AnnualExpenses { clients, .. } => {
                clients.into_iter().map(|c| c.client).collect()
            }
            other => panic!("wrong variant {other:?}"),
        }
    }

    #[test]
    fn client_named_total_is_kept() {
        let html = fixture().replace("Northwest Ferries Assn.", "Total Wine &amp; More");
        assert_eq!(client_names(&html), vec!["Acme Widgets Inc.", "Total Wine & More"]);
    }

    #[test]
    fn extra_cell_is_structural() {
        let html = fixture().replace("<td>$0.00</td></tr>", "<td>$0.00</td><td>note</td></tr>");
        assert!(matches!(
            AnnualExpenses.extract(&Document::parse(&html)),
            Err(ReportError::StructuralParse(_))
        ));
    }
}
