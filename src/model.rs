use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::ident::ReportId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportType {
    BasicRegistration,
    ClientEmployerRegistration,
    QuarterlyExpenseReport,
    AnnualExpenseReport,
}

impl ReportType {
    pub const ALL: [ReportType; 4] = [
        ReportType::BasicRegistration,
        ReportType::ClientEmployerRegistration,
        ReportType::QuarterlyExpenseReport,
        ReportType::AnnualExpenseReport,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReportType::BasicRegistration => "basic_registration",
            ReportType::ClientEmployerRegistration => "client_employer_registration",
            ReportType::QuarterlyExpenseReport => "quarterly_expense_report",
            ReportType::AnnualExpenseReport => "annual_expense_report",
        }
    }
}

/// Which expense report an index row advertised. Only consulted when the
/// report header itself is ambiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportHint {
    Quarterly,
    Annual,
}

impl ReportHint {
    pub fn report_type(self) -> ReportType {
        match self {
            ReportHint::Quarterly => ReportType::QuarterlyExpenseReport,
            ReportHint::Annual => ReportType::AnnualExpenseReport,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingRef {
    pub id: ReportId,
    pub filed_at: NaiveDateTime,
}

/// Contents of a "Report History" block. Both sides are required, which
/// keeps each ref paired with its timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportHistory {
    pub original: FilingRef,
    pub amendment: FilingRef,
}

/// The registering lobbyist. Every non-`Option` field is required on the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filer {
    pub name: String,
    pub organization: Option<String>,
    pub address1: String,
    pub address2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub phone: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientContact {
    pub name: String,
    pub address1: String,
    pub address2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expenditure {
    pub date: String,
    pub payee: String,
    pub purpose: String,
    pub amount_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientTotal {
    pub client: String,
    pub compensation_cents: i64,
    pub expenses_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeSpecificFields {
    BasicRegistration { filer: Filer },
    ClientEmployerRegistration {
        client: ClientContact,
        lobbyist: String,
        business: Option<String>,
    },
    QuarterlyExpenses {
        lobbyist: String,
        year: i32,
        quarter: u8,
        compensation_cents: i64,
        expenses_cents: i64,
        items: Vec<Expenditure>,
    },
    AnnualExpenses {
        lobbyist: String,
        year: i32,
        clients: Vec<ClientTotal>,
    },
}

impl TypeSpecificFields {
    pub fn report_type(&self) -> ReportType {
        match self {
            TypeSpecificFields::BasicRegistration { .. } => ReportType::BasicRegistration,
            TypeSpecificFields::ClientEmployerRegistration { .. } => {
                ReportType::ClientEmployerRegistration
            }
            TypeSpecificFields::QuarterlyExpenses { .. } => ReportType::QuarterlyExpenseReport,
            TypeSpecificFields::AnnualExpenses { .. } => ReportType::AnnualExpenseReport,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub id: ReportId,
    pub permalink: String,
    pub report_type: ReportType,
    pub filed_at: NaiveDateTime,
    pub history: Option<ReportHistory>,
    pub fields: TypeSpecificFields,
}

impl Report {
    pub fn originally_filed_at(&self) -> Option<NaiveDateTime> {
        self.history.as_ref().map(|h| h.original.filed_at)
    }

    pub fn original_report_ref(&self) -> Option<&ReportId> {
        self.history.as_ref().map(|h| &h.original.id)
    }

    pub fn amendment_filed_at(&self) -> Option<NaiveDateTime> {
        self.history.as_ref().map(|h| h.amendment.filed_at)
    }

    pub fn amendment_report_ref(&self) -> Option<&ReportId> {
        self.history.as_ref().map(|h| &h.amendment.id)
    }
}
