//! Typed read helpers for the entity store.
//!
//! All functions take a shared `&Connection` (a `Transaction` derefs to one,
//! so the lifecycle controller reads through the same unit of work it writes
//! in) and return typed structs, never raw rows.

use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::{date_from_sql, date_to_sql, timestamp_from_sql};
use crate::error::{EngineError, Entity, Result};
use crate::model::audit::AuditRecord;
use crate::model::ledger::{LedgerEntry, LedgerKind};
use crate::model::money;
use crate::model::party::{Client, Technician};
use crate::model::role::Role;
use crate::model::status::TicketStatus;
use crate::model::ticket::{LineItem, Ticket};
use crate::model::{ClientId, LedgerEntryId, LineItemId, TechnicianId, TicketId};

const TICKET_COLUMNS: &str = "ticket_id, client_id, technician_id, description, device, status, \
     value_cents, note, opened_at, expected_on, completed_at";

const LEDGER_COLUMNS: &str = "ledger_id, description, amount_cents, kind, posted_on, month, \
     year, settled, technician_id, created_at";

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn conversion_error(
    idx: usize,
    err: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into())
}

fn client_from_row(row: &Row<'_>) -> rusqlite::Result<Client> {
    Ok(Client {
        id: row.get(0)?,
        phone: row.get(1)?,
        name: row.get(2)?,
        address: row.get(3)?,
    })
}

fn technician_from_row(row: &Row<'_>) -> rusqlite::Result<Technician> {
    let role: String = row.get(3)?;
    let created_at: String = row.get(5)?;
    Ok(Technician {
        id: row.get(0)?,
        username: row.get(1)?,
        name: row.get(2)?,
        role: role.parse::<Role>().map_err(|err| conversion_error(3, err))?,
        active: row.get(4)?,
        created_at: timestamp_from_sql(5, &created_at)?,
    })
}

fn ticket_from_row(row: &Row<'_>) -> rusqlite::Result<Ticket> {
    let status: String = row.get(5)?;
    let opened_at: String = row.get(8)?;
    let expected_on: Option<String> = row.get(9)?;
    let completed_at: Option<String> = row.get(10)?;
    Ok(Ticket {
        id: row.get(0)?,
        client_id: row.get(1)?,
        technician_id: row.get(2)?,
        description: row.get(3)?,
        device: row.get(4)?,
        status: TicketStatus::new(status).map_err(|err| conversion_error(5, err))?,
        value: money::from_cents(row.get(6)?),
        note: row.get(7)?,
        opened_at: timestamp_from_sql(8, &opened_at)?,
        expected_on: expected_on
            .as_deref()
            .map(|raw| date_from_sql(9, raw))
            .transpose()?,
        completed_at: completed_at
            .as_deref()
            .map(|raw| timestamp_from_sql(10, raw))
            .transpose()?,
    })
}

fn line_item_from_row(row: &Row<'_>) -> rusqlite::Result<LineItem> {
    let quantity: i64 = row.get(3)?;
    Ok(LineItem {
        id: row.get(0)?,
        ticket_id: row.get(1)?,
        description: row.get(2)?,
        quantity: u32::try_from(quantity).map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(3, Type::Integer, Box::new(err))
        })?,
        unit_price: money::from_cents(row.get(4)?),
    })
}

fn audit_record_from_row(row: &Row<'_>) -> rusqlite::Result<AuditRecord> {
    let changed_at: String = row.get(5)?;
    Ok(AuditRecord {
        id: row.get(0)?,
        ticket_id: row.get(1)?,
        field: row.get(2)?,
        old_value: row.get(3)?,
        new_value: row.get(4)?,
        changed_at: timestamp_from_sql(5, &changed_at)?,
        technician_id: row.get(6)?,
    })
}

fn ledger_entry_from_row(row: &Row<'_>) -> rusqlite::Result<LedgerEntry> {
    let kind: String = row.get(3)?;
    let posted_on: String = row.get(4)?;
    let created_at: String = row.get(9)?;
    Ok(LedgerEntry {
        id: row.get(0)?,
        description: row.get(1)?,
        amount: money::from_cents(row.get(2)?),
        kind: kind.parse::<LedgerKind>().map_err(|err| conversion_error(3, err))?,
        posted_on: date_from_sql(4, &posted_on)?,
        month: row.get(5)?,
        year: row.get(6)?,
        settled: row.get(7)?,
        technician_id: row.get(8)?,
        created_at: timestamp_from_sql(9, &created_at)?,
    })
}

// ---------------------------------------------------------------------------
// Parties
// ---------------------------------------------------------------------------

/// Fetch a client by id.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn get_client(conn: &Connection, client_id: ClientId) -> Result<Option<Client>> {
    Ok(conn
        .query_row(
            "SELECT client_id, phone, name, address FROM clients WHERE client_id = ?1",
            [client_id],
            client_from_row,
        )
        .optional()?)
}

/// Fetch a client or fail with `NotFound`.
///
/// # Errors
///
/// Returns [`EngineError::NotFound`] when the client is absent.
pub fn require_client(conn: &Connection, client_id: ClientId) -> Result<Client> {
    get_client(conn, client_id)?.ok_or_else(|| EngineError::not_found(Entity::Client, client_id))
}

/// Fetch a technician by id.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn get_technician(
    conn: &Connection,
    technician_id: TechnicianId,
) -> Result<Option<Technician>> {
    Ok(conn
        .query_row(
            "SELECT technician_id, username, name, role, active, created_at \
             FROM technicians WHERE technician_id = ?1",
            [technician_id],
            technician_from_row,
        )
        .optional()?)
}

/// Fetch a technician or fail with `NotFound`.
///
/// # Errors
///
/// Returns [`EngineError::NotFound`] when the technician is absent.
pub fn require_technician(conn: &Connection, technician_id: TechnicianId) -> Result<Technician> {
    get_technician(conn, technician_id)?
        .ok_or_else(|| EngineError::not_found(Entity::Technician, technician_id))
}

/// Look a technician up by exact username.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn find_technician_by_username(
    conn: &Connection,
    username: &str,
) -> Result<Option<Technician>> {
    Ok(conn
        .query_row(
            "SELECT technician_id, username, name, role, active, created_at \
             FROM technicians WHERE username = ?1",
            [username],
            technician_from_row,
        )
        .optional()?)
}

/// Number of registered technicians, active or not.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn count_technicians(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM technicians", [], |row| row.get(0))?)
}

/// Stored password credential for a username, if any.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn password_hash_for(conn: &Connection, username: &str) -> Result<Option<String>> {
    Ok(conn
        .query_row(
            "SELECT password_hash FROM technicians WHERE username = ?1",
            [username],
            |row| row.get(0),
        )
        .optional()?)
}

// ---------------------------------------------------------------------------
// Tickets and items
// ---------------------------------------------------------------------------

/// Fetch a single ticket by id.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn get_ticket(conn: &Connection, ticket_id: TicketId) -> Result<Option<Ticket>> {
    let sql = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE ticket_id = ?1");
    Ok(conn.query_row(&sql, [ticket_id], ticket_from_row).optional()?)
}

/// Fetch a ticket or fail with `NotFound`.
///
/// # Errors
///
/// Returns [`EngineError::NotFound`] when the ticket is absent.
pub fn require_ticket(conn: &Connection, ticket_id: TicketId) -> Result<Ticket> {
    get_ticket(conn, ticket_id)?.ok_or_else(|| EngineError::not_found(Entity::Ticket, ticket_id))
}

/// All tickets owned by a client, newest first.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn tickets_for_client(conn: &Connection, client_id: ClientId) -> Result<Vec<Ticket>> {
    let sql = format!(
        "SELECT {TICKET_COLUMNS} FROM tickets WHERE client_id = ?1 \
         ORDER BY opened_at DESC, ticket_id DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([client_id], ticket_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Tickets expected to be finished on `date`, oldest ticket first.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn tickets_due_on(conn: &Connection, date: NaiveDate) -> Result<Vec<Ticket>> {
    let sql = format!(
        "SELECT {TICKET_COLUMNS} FROM tickets WHERE expected_on = ?1 ORDER BY ticket_id ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([date_to_sql(date)], ticket_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Current line items of a ticket, in insertion order.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn list_line_items(conn: &Connection, ticket_id: TicketId) -> Result<Vec<LineItem>> {
    let mut stmt = conn.prepare(
        "SELECT line_item_id, ticket_id, description, quantity, unit_price_cents \
         FROM line_items WHERE ticket_id = ?1 ORDER BY line_item_id ASC",
    )?;
    let rows = stmt.query_map([ticket_id], line_item_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Fetch a single line item by id.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn get_line_item(conn: &Connection, item_id: LineItemId) -> Result<Option<LineItem>> {
    Ok(conn
        .query_row(
            "SELECT line_item_id, ticket_id, description, quantity, unit_price_cents \
             FROM line_items WHERE line_item_id = ?1",
            [item_id],
            line_item_from_row,
        )
        .optional()?)
}

/// Fetch a line item or fail with `NotFound`.
///
/// # Errors
///
/// Returns [`EngineError::NotFound`] when the item is absent.
pub fn require_line_item(conn: &Connection, item_id: LineItemId) -> Result<LineItem> {
    get_line_item(conn, item_id)?.ok_or_else(|| EngineError::not_found(Entity::LineItem, item_id))
}

/// Audit trail of a ticket in commit order.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn list_audit_records(conn: &Connection, ticket_id: TicketId) -> Result<Vec<AuditRecord>> {
    let mut stmt = conn.prepare(
        "SELECT audit_id, ticket_id, field, old_value, new_value, changed_at, technician_id \
         FROM audit_records WHERE ticket_id = ?1 ORDER BY audit_id ASC",
    )?;
    let rows = stmt.query_map([ticket_id], audit_record_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Filter criteria for ledger listings. Fields combine with AND semantics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerFilter {
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub kind: Option<LedgerKind>,
}

/// Fetch one ledger entry by id.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn get_ledger_entry(
    conn: &Connection,
    ledger_id: LedgerEntryId,
) -> Result<Option<LedgerEntry>> {
    let sql = format!("SELECT {LEDGER_COLUMNS} FROM ledger_entries WHERE ledger_id = ?1");
    Ok(conn.query_row(&sql, [ledger_id], ledger_entry_from_row).optional()?)
}

/// Ledger entries matching `filter`, newest posting first.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn list_ledger_entries(conn: &Connection, filter: &LedgerFilter) -> Result<Vec<LedgerEntry>> {
    let sql = format!(
        "SELECT {LEDGER_COLUMNS} FROM ledger_entries \
         WHERE (?1 IS NULL OR month = ?1) \
           AND (?2 IS NULL OR year = ?2) \
           AND (?3 IS NULL OR kind = ?3) \
         ORDER BY posted_on DESC, ledger_id DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params![filter.month, filter.year, filter.kind.map(LedgerKind::as_str)],
        ledger_entry_from_row,
    )?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}
