use crate::db::{ClientTotalRow, ExpenditureRow, PartyRow, Record, ReportRow};
use crate::model::{ClientContact, Filer, TypeSpecificFields};
use crate::resolver::Resolved;

/// Flattens a resolved report into storage rows. The full type-specific
/// payload is kept as JSON alongside the flat columns.
pub fn normalize(resolved: &Resolved) -> Result<Record, serde_json::Error> {
    let r = &resolved.report;
    let report = ReportRow {
        permalink: r.permalink.clone(),
        report_type: r.report_type.as_str(),
        filed_at: r.filed_at,
        originally_filed_at: r.originally_filed_at(),
        original_ref: r.original_report_ref().map(|i| i.to_string()),
        amendment_filed_at: r.amendment_filed_at(),
        amendment_ref: r.amendment_report_ref().map(|i| i.to_string()),
        lineage: resolved.lineage.as_str(),
        fields: serde_json::to_string(&r.fields)?,
    };

    let mut parties = Vec::new();
    let mut expenditures = Vec::new();
    let mut client_totals = Vec::new();
    match &r.fields {
        TypeSpecificFields::BasicRegistration { filer } => parties.push(filer_party(filer)),
        TypeSpecificFields::ClientEmployerRegistration {
            client, lobbyist, ..
        } => {
            parties.push(client_party(client));
            parties.push(named("lobbyist", lobbyist));
        }
        TypeSpecificFields::QuarterlyExpenses {
            lobbyist, items, ..
        } => {
            parties.push(named("lobbyist", lobbyist));
            expenditures.extend(items.iter().enumerate().map(|(i, e)| ExpenditureRow {
                line: i + 1,
                date: e.date.clone(),
                payee: e.payee.clone(),
                purpose: e.purpose.clone(),
                amount_cents: e.amount_cents,
            }));
        }
        TypeSpecificFields::AnnualExpenses {
            lobbyist, clients, ..
        } => {
            parties.push(named("lobbyist", lobbyist));
            client_totals.extend(clients.iter().enumerate().map(|(i, c)| ClientTotalRow {
                line: i + 1,
                client: c.client.clone(),
                compensation_cents: c.compensation_cents,
                expenses_cents: c.expenses_cents,
            }));
        }
    }

    Ok(Record {
        report,
        parties,
        expenditures,
        client_totals,
    })
}

fn filer_party(f: &Filer) -> PartyRow {
    PartyRow {
        role: "filer",
        name: f.name.clone(),
        organization: f.organization.clone(),
        address1: Some(f.address1.clone()),
        address2: f.address2.clone(),
        city: Some(f.city.clone()),
        state: Some(f.state.clone()),
        postal_code: Some(f.postal_code.clone()),
        phone: Some(f.phone.clone()),
        email: Some(f.email.clone()),
    }
}

fn client_party(c: &ClientContact) -> PartyRow {
    PartyRow {
        role: "client",
        name: c.name.clone(),
        organization: None,
        address1: Some(c.address1.clone()),
        address2: c.address2.clone(),
        city: Some(c.city.clone()),
        state: Some(c.state.clone()),
        postal_code: Some(c.postal_code.clone()),
        phone: c.phone.clone(),
        email: c.email.clone(),
    }
}

fn named(role: &'static str, name: &str) -> PartyRow {
    PartyRow {
        role,
        name: name.to_string(),
        organization: None,
        address1: None,
        address2: None,
        city: None,
        state: None,
        postal_code: None,
        phone: None,
        email: None,
    }
}
