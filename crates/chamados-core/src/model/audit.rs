use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ticket::TicketField;
use super::{AuditRecordId, TechnicianId, TicketId};

/// One field's old/new value as it will be written to the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: TicketField,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

/// An immutable record of a single field change on a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: AuditRecordId,
    pub ticket_id: TicketId,
    pub field: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub changed_at: DateTime<Utc>,
    pub technician_id: Option<TechnicianId>,
}
