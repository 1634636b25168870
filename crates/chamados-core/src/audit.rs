//! Field-level change detection and the append-only audit trail.

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::db::write;
use crate::error::Result;
use crate::model::audit::{AuditRecord, FieldChange};
use crate::model::ticket::{Ticket, TicketField};
use crate::model::{TechnicianId, TicketId};

/// Compare `before` and `after` on each of `fields`, returning one change per
/// field whose value differs. Unchanged fields produce nothing.
#[must_use]
pub fn diff(before: &Ticket, after: &Ticket, fields: &[TicketField]) -> Vec<FieldChange> {
    fields
        .iter()
        .filter(|&&field| !before.same_field(after, field))
        .map(|&field| FieldChange {
            field,
            old_value: before.field_text(field),
            new_value: after.field_text(field),
        })
        .collect()
}

/// Append one audit row per change, all stamped with `at`.
///
/// # Errors
///
/// Returns an error if any insert fails; the caller's transaction is then
/// expected to roll back.
pub fn record(
    conn: &Connection,
    ticket_id: TicketId,
    changes: &[FieldChange],
    at: DateTime<Utc>,
    technician_id: Option<TechnicianId>,
) -> Result<Vec<AuditRecord>> {
    changes
        .iter()
        .map(|change| {
            let id = write::insert_audit_record(conn, ticket_id, change, at, technician_id)?;
            Ok(AuditRecord {
                id,
                ticket_id,
                field: change.field.as_str().to_string(),
                old_value: change.old_value.clone(),
                new_value: change.new_value.clone(),
                changed_at: at,
                technician_id,
            })
        })
        .collect()
}

/// [`diff`] then [`record`].
///
/// # Errors
///
/// Returns an error if any insert fails.
pub fn diff_and_record(
    conn: &Connection,
    before: &Ticket,
    after: &Ticket,
    fields: &[TicketField],
    at: DateTime<Utc>,
    technician_id: Option<TechnicianId>,
) -> Result<Vec<AuditRecord>> {
    let changes = diff(before, after, fields);
    record(conn, before.id, &changes, at, technician_id)
}
