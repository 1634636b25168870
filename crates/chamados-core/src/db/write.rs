//! Row-level writes.
//!
//! These helpers do not open transactions and do not enforce business rules;
//! callers pass a `Transaction` (as `&Connection`) and decide what to commit.
//! Constraint failures surface as [`EngineError::Conflict`] through the
//! `From<rusqlite::Error>` conversion.
//!
//! [`EngineError::Conflict`]: crate::error::EngineError::Conflict

use chrono::{DateTime, Datelike, Utc};
use rusqlite::{Connection, params};

use super::{date_to_sql, timestamp_to_sql};
use crate::error::Result;
use crate::model::audit::FieldChange;
use crate::model::ledger::NewLedgerEntry;
use crate::model::money;
use crate::model::party::{NewClient, NewTechnician};
use crate::model::ticket::{LineItem, NewLineItem, NewTicket, Ticket};
use crate::model::{
    AuditRecordId, ClientId, LedgerEntryId, LineItemId, TechnicianId, TicketId,
};

/// # Errors
///
/// Returns `Conflict` if the phone number is already registered.
pub fn insert_client(conn: &Connection, client: &NewClient) -> Result<ClientId> {
    conn.execute(
        "INSERT INTO clients (phone, name, address) VALUES (?1, ?2, ?3)",
        params![client.phone.trim(), client.name.trim(), client.address],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Delete a client and, through `ON DELETE CASCADE`, its tickets with their
/// items and audit records. Returns whether a row was removed.
///
/// # Errors
///
/// Returns an error if the database write fails.
pub fn delete_client(conn: &Connection, client_id: ClientId) -> Result<bool> {
    let removed = conn.execute("DELETE FROM clients WHERE client_id = ?1", [client_id])?;
    Ok(removed > 0)
}

/// # Errors
///
/// Returns `Conflict` if the username is taken.
pub fn insert_technician(
    conn: &Connection,
    technician: &NewTechnician,
    password_hash: &str,
    created_at: DateTime<Utc>,
) -> Result<TechnicianId> {
    conn.execute(
        "INSERT INTO technicians (username, name, password_hash, role, active, created_at) \
         VALUES (?1, ?2, ?3, ?4, 1, ?5)",
        params![
            technician.username.trim(),
            technician.name.trim(),
            password_hash,
            technician.role.as_str(),
            timestamp_to_sql(created_at),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// # Errors
///
/// Returns an error if the database write fails.
pub fn set_technician_active(
    conn: &Connection,
    technician_id: TechnicianId,
    active: bool,
) -> Result<()> {
    conn.execute(
        "UPDATE technicians SET active = ?2 WHERE technician_id = ?1",
        params![technician_id, active],
    )?;
    Ok(())
}

/// Insert a ticket with a zero total.
///
/// # Errors
///
/// Returns `Conflict` on a dangling client or technician reference.
pub fn insert_ticket(
    conn: &Connection,
    ticket: &NewTicket,
    opened_at: DateTime<Utc>,
) -> Result<TicketId> {
    conn.execute(
        "INSERT INTO tickets (client_id, technician_id, description, device, status, \
         value_cents, note, opened_at, expected_on, completed_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7, ?8, ?9)",
        params![
            ticket.client_id,
            ticket.technician_id,
            ticket.description,
            ticket.device,
            ticket.status.as_str(),
            ticket.note,
            timestamp_to_sql(opened_at),
            ticket.expected_on.map(date_to_sql),
            ticket.completed_at.map(timestamp_to_sql),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Persist every editable field of `ticket`. The cached total is left
/// untouched; see [`set_ticket_value`].
///
/// # Errors
///
/// Returns `Conflict` on a dangling technician reference.
pub fn update_ticket_fields(conn: &Connection, ticket: &Ticket) -> Result<()> {
    conn.execute(
        "UPDATE tickets SET technician_id = ?2, description = ?3, device = ?4, status = ?5, \
         note = ?6, expected_on = ?7, completed_at = ?8 WHERE ticket_id = ?1",
        params![
            ticket.id,
            ticket.technician_id,
            ticket.description,
            ticket.device,
            ticket.status.as_str(),
            ticket.note,
            ticket.expected_on.map(date_to_sql),
            ticket.completed_at.map(timestamp_to_sql),
        ],
    )?;
    Ok(())
}

/// # Errors
///
/// Returns an error if the amount is out of range or the write fails.
pub fn set_ticket_value(
    conn: &Connection,
    ticket_id: TicketId,
    value: rust_decimal::Decimal,
) -> Result<()> {
    conn.execute(
        "UPDATE tickets SET value_cents = ?2 WHERE ticket_id = ?1",
        params![ticket_id, money::to_cents(value)?],
    )?;
    Ok(())
}

/// # Errors
///
/// Returns `Conflict` if the ticket does not exist.
pub fn insert_line_item(
    conn: &Connection,
    ticket_id: TicketId,
    item: &NewLineItem,
) -> Result<LineItemId> {
    conn.execute(
        "INSERT INTO line_items (ticket_id, description, quantity, unit_price_cents) \
         VALUES (?1, ?2, ?3, ?4)",
        params![
            ticket_id,
            item.description,
            item.quantity,
            money::to_cents(item.unit_price)?,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// # Errors
///
/// Returns an error if the amount is out of range or the write fails.
pub fn update_line_item(conn: &Connection, item: &LineItem) -> Result<()> {
    conn.execute(
        "UPDATE line_items SET description = ?2, quantity = ?3, unit_price_cents = ?4 \
         WHERE line_item_id = ?1",
        params![
            item.id,
            item.description,
            item.quantity,
            money::to_cents(item.unit_price)?,
        ],
    )?;
    Ok(())
}

/// # Errors
///
/// Returns an error if the database write fails.
pub fn delete_line_item(conn: &Connection, item_id: LineItemId) -> Result<()> {
    conn.execute("DELETE FROM line_items WHERE line_item_id = ?1", [item_id])?;
    Ok(())
}

/// Append one audit row.
///
/// # Errors
///
/// Returns `Conflict` if the ticket does not exist.
pub fn insert_audit_record(
    conn: &Connection,
    ticket_id: TicketId,
    change: &FieldChange,
    changed_at: DateTime<Utc>,
    technician_id: Option<TechnicianId>,
) -> Result<AuditRecordId> {
    conn.execute(
        "INSERT INTO audit_records (ticket_id, field, old_value, new_value, changed_at, \
         technician_id) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            ticket_id,
            change.field.as_str(),
            change.old_value,
            change.new_value,
            timestamp_to_sql(changed_at),
            technician_id,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Insert a ledger entry; month and year are derived from `posted_on`.
///
/// # Errors
///
/// Returns an error if the amount is out of range or the write fails.
pub fn insert_ledger_entry(
    conn: &Connection,
    entry: &NewLedgerEntry,
    created_at: DateTime<Utc>,
) -> Result<LedgerEntryId> {
    conn.execute(
        "INSERT INTO ledger_entries (description, amount_cents, kind, posted_on, month, year, \
         settled, technician_id, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            entry.description,
            money::to_cents(entry.amount)?,
            entry.kind.as_str(),
            date_to_sql(entry.posted_on),
            entry.posted_on.month(),
            entry.posted_on.year(),
            entry.settled,
            entry.technician_id,
            timestamp_to_sql(created_at),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}
