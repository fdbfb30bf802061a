use std::collections::HashSet;
use std::path::Path;

use chrono::NaiveDateTime;
use rusqlite::{Connection, OptionalExtension};

use crate::error::StoreError;
use crate::ident::ReportId;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertResult {
    Inserted,
    AlreadyPresent,
}

/// Lineage columns of a stored report, enough to walk amendment chains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSummary {
    pub id: ReportId,
    pub filed_at: NaiveDateTime,
    pub original_ref: Option<ReportId>,
    pub amendment_ref: Option<ReportId>,
}

/// Storage seam. Reports are write-once: `upsert` inserts when the id is new
/// and otherwise leaves the stored record untouched.
pub trait Repository {
    fn exists(&self, id: &ReportId) -> Result<bool>;
    fn upsert(&self, id: &ReportId, record: &Record) -> Result<UpsertResult>;
    fn list_known_identifiers(&self) -> Result<HashSet<ReportId>>;
    fn summary(&self, id: &ReportId) -> Result<Option<ReportSummary>>;
    /// Stored reports naming `id` as their original.
    fn amendments_of(&self, id: &ReportId) -> Result<Vec<ReportSummary>>;
    fn stats(&self) -> Result<Stats>;
}

// ── Rows ──

pub struct ReportRow {
    pub permalink: String,
    pub report_type: &'static str,
    pub filed_at: NaiveDateTime,
    pub originally_filed_at: Option<NaiveDateTime>,
    pub original_ref: Option<String>,
    pub amendment_filed_at: Option<NaiveDateTime>,
    pub amendment_ref: Option<String>,
    pub lineage: &'static str,
    pub fields: String,
}

pub struct PartyRow {
    pub role: &'static str, // "filer", "client", "lobbyist"
    pub name: String,
    pub organization: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

pub struct ExpenditureRow {
    pub line: usize,
    pub date: String,
    pub payee: String,
    pub purpose: String,
    pub amount_cents: i64,
}

pub struct ClientTotalRow {
    pub line: usize,
    pub client: String,
    pub compensation_cents: i64,
    pub expenses_cents: i64,
}

/// Everything written for one report, in one transaction.
pub struct Record {
    pub report: ReportRow,
    pub parties: Vec<PartyRow>,
    pub expenditures: Vec<ExpenditureRow>,
    pub client_totals: Vec<ClientTotalRow>,
}

// ── SQLite ──

pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        Ok(Self { conn })
    }
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS reports (
            id                  TEXT PRIMARY KEY,
            permalink           TEXT NOT NULL,
            report_type         TEXT NOT NULL CHECK(report_type IN (
                                    'basic_registration', 'client_employer_registration',
                                    'quarterly_expense_report', 'annual_expense_report')),
            filed_at            TEXT NOT NULL,
            originally_filed_at TEXT,
            original_ref        TEXT,
            amendment_filed_at  TEXT,
            amendment_ref       TEXT,
            lineage             TEXT NOT NULL CHECK(lineage IN ('standalone','original','amendment')),
            fields              TEXT NOT NULL,
            scraped_at          TEXT NOT NULL DEFAULT (datetime('now')),
            CHECK ((original_ref IS NULL) = (originally_filed_at IS NULL)),
            CHECK ((amendment_ref IS NULL) = (amendment_filed_at IS NULL))
        );
        CREATE INDEX IF NOT EXISTS idx_reports_type ON reports(report_type);
        CREATE INDEX IF NOT EXISTS idx_reports_original ON reports(original_ref);

        CREATE TABLE IF NOT EXISTS parties (
            id           INTEGER PRIMARY KEY,
            report_id    TEXT NOT NULL REFERENCES reports(id),
            role         TEXT NOT NULL CHECK(role IN ('filer','client','lobbyist')),
            name         TEXT NOT NULL,
            organization TEXT,
            address1     TEXT,
            address2     TEXT,
            city         TEXT,
            state        TEXT,
            postal_code  TEXT,
            phone        TEXT,
            email        TEXT,
            UNIQUE(report_id, role)
        );
        CREATE INDEX IF NOT EXISTS idx_parties_name ON parties(name);

        CREATE TABLE IF NOT EXISTS expenditures (
            id           INTEGER PRIMARY KEY,
            report_id    TEXT NOT NULL REFERENCES reports(id),
            line         INTEGER NOT NULL,
            date         TEXT NOT NULL,
            payee        TEXT NOT NULL,
            purpose      TEXT NOT NULL,
            amount_cents INTEGER NOT NULL,
            UNIQUE(report_id, line)
        );

        CREATE TABLE IF NOT EXISTS client_totals (
            id                 INTEGER PRIMARY KEY,
            report_id          TEXT NOT NULL REFERENCES reports(id),
            line               INTEGER NOT NULL,
            client             TEXT NOT NULL,
            compensation_cents INTEGER NOT NULL,
            expenses_cents     INTEGER NOT NULL,
            UNIQUE(report_id, line)
        );
        ",
    )?;
    Ok(())
}

impl Repository for SqliteRepository {
    fn exists(&self, id: &ReportId) -> Result<bool> {
        let found = self
            .conn
            .query_row("SELECT 1 FROM reports WHERE id = ?1", [id.as_str()], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    fn upsert(&self, id: &ReportId, record: &Record) -> Result<UpsertResult> {
        let tx = self.conn.unchecked_transaction()?;
        let r = &record.report;
        // First writer wins: the primary key turns a second insert into a no-op.
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO reports
             (id, permalink, report_type, filed_at, originally_filed_at, original_ref,
              amendment_filed_at, amendment_ref, lineage, fields)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            rusqlite::params![
                id.as_str(), r.permalink, r.report_type, r.filed_at, r.originally_filed_at,
                r.original_ref, r.amendment_filed_at, r.amendment_ref, r.lineage, r.fields,
            ],
        )?;
        if inserted == 0 {
            return Ok(UpsertResult::AlreadyPresent);
        }

        {
            let mut p_stmt = tx.prepare(
                "INSERT INTO parties
                 (report_id, role, name, organization, address1, address2, city, state,
                  postal_code, phone, email)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for p in &record.parties {
                p_stmt.execute(rusqlite::params![
                    id.as_str(), p.role, p.name, p.organization, p.address1, p.address2,
                    p.city, p.state, p.postal_code, p.phone, p.email,
                ])?;
            }

            let mut e_stmt = tx.prepare(
                "INSERT INTO expenditures (report_id, line, date, payee, purpose, amount_cents)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for e in &record.expenditures {
                e_stmt.execute(rusqlite::params![
                    id.as_str(), e.line as i64, e.date, e.payee, e.purpose, e.amount_cents,
                ])?;
            }

            let mut c_stmt = tx.prepare(
                "INSERT INTO client_totals
                 (report_id, line, client, compensation_cents, expenses_cents)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for c in &record.client_totals {
                c_stmt.execute(rusqlite::params![
                    id.as_str(), c.line as i64, c.client, c.compensation_cents, c.expenses_cents,
                ])?;
            }
        }
        tx.commit()?;
        Ok(UpsertResult::Inserted)
    }

    fn list_known_identifiers(&self) -> Result<HashSet<ReportId>> {
        let mut stmt = self.conn.prepare("SELECT id FROM reports")?;
        let raw = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        raw.into_iter().map(|s| parse_stored(&s)).collect()
    }

    fn summary(&self, id: &ReportId) -> Result<Option<ReportSummary>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, filed_at, original_ref, amendment_ref FROM reports WHERE id = ?1",
                [id.as_str()],
                summary_columns,
            )
            .optional()?;
        row.map(into_summary).transpose()
    }

    fn amendments_of(&self, id: &ReportId) -> Result<Vec<ReportSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, filed_at, original_ref, amendment_ref FROM reports
             WHERE original_ref = ?1 AND id != ?1
             ORDER BY filed_at",
        )?;
        let rows = stmt
            .query_map([id.as_str()], summary_columns)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter().map(into_summary).collect()
    }

    fn stats(&self) -> Result<Stats> {
        let total: usize = self
            .conn
            .query_row("SELECT COUNT(*) FROM reports", [], |r| r.get(0))?;
        let amendments: usize = self.conn.query_row(
            "SELECT COUNT(*) FROM reports WHERE lineage = 'amendment'",
            [],
            |r| r.get(0),
        )?;
        let mut stmt = self.conn.prepare(
            "SELECT report_type, COUNT(*) FROM reports GROUP BY report_type ORDER BY report_type",
        )?;
        let by_type = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Stats {
            total,
            amendments,
            by_type,
        })
    }
}

type SummaryColumns = (String, NaiveDateTime, Option<String>, Option<String>);

fn summary_columns(row: &rusqlite::Row) -> rusqlite::Result<SummaryColumns> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn into_summary((id, filed_at, original, amendment): SummaryColumns) -> Result<ReportSummary> {
    Ok(ReportSummary {
        id: parse_stored(&id)?,
        filed_at,
        original_ref: original.as_deref().map(parse_stored).transpose()?,
        amendment_ref: amendment.as_deref().map(parse_stored).transpose()?,
    })
}

fn parse_stored(raw: &str) -> Result<ReportId> {
    ReportId::parse(raw).ok_or_else(|| StoreError::BadIdentifier(raw.to_string()))
}

// ── Stats ──

pub struct Stats {
    pub total: usize,
    pub amendments: usize,
    pub by_type: Vec<(String, usize)>,
}
