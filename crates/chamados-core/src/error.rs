use std::fmt;

use thiserror::Error;

/// Entities that can be the subject of a lookup failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Client,
    Technician,
    Ticket,
    LineItem,
}

impl Entity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Technician => "technician",
            Self::Ticket => "ticket",
            Self::LineItem => "line item",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The stable failure categories callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    InvalidState,
    Conflict,
    Invalid,
    Storage,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Forbidden => "forbidden",
            Self::InvalidState => "invalid_state",
            Self::Conflict => "conflict",
            Self::Invalid => "invalid",
            Self::Storage => "storage",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Machine-readable error codes for callers that need finer detail than
/// [`ErrorKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InvalidInput,
    ClientNotFound,
    TechnicianNotFound,
    TicketNotFound,
    LineItemNotFound,
    AccessDenied,
    TicketCanceled,
    ConstraintViolation,
    StorageFailure,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidInput => "E1001",
            Self::ClientNotFound => "E2001",
            Self::TechnicianNotFound => "E2002",
            Self::TicketNotFound => "E2003",
            Self::LineItemNotFound => "E2004",
            Self::AccessDenied => "E3001",
            Self::TicketCanceled => "E4001",
            Self::ConstraintViolation => "E5001",
            Self::StorageFailure => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::InvalidInput => "Invalid input",
            Self::ClientNotFound => "Client not found",
            Self::TechnicianNotFound => "Technician not found",
            Self::TicketNotFound => "Ticket not found",
            Self::LineItemNotFound => "Line item not found",
            Self::AccessDenied => "Access denied",
            Self::TicketCanceled => "Ticket is canceled",
            Self::ConstraintViolation => "Data conflict",
            Self::StorageFailure => "Storage failure",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::InvalidInput => Some("Correct the highlighted field and retry."),
            Self::ClientNotFound => Some("Register the client before opening tickets for it."),
            Self::TechnicianNotFound => Some("Check the technician id with `chm tech add`."),
            Self::TicketNotFound | Self::LineItemNotFound => None,
            Self::AccessDenied => {
                Some("Employees may only work on tickets assigned to them.")
            }
            Self::TicketCanceled => Some("Canceled tickets no longer accept line item changes."),
            Self::ConstraintViolation => {
                Some("Another record already uses this value, or a reference is dangling.")
            }
            Self::StorageFailure => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Failure surfaced by every engine operation.
///
/// Any of these aborts the unit of work it was raised in; nothing written
/// before the failure is committed.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: i64 },

    #[error("forbidden: {reason}")]
    Forbidden { reason: String },

    #[error("invalid state: {reason}")]
    InvalidState { reason: String },

    #[error("conflict: {reason}")]
    Conflict { reason: String },

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("storage failure: {0}")]
    Storage(#[source] rusqlite::Error),
}

impl EngineError {
    pub(crate) const fn not_found(entity: Entity, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    pub(crate) fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Invalid { .. } => ErrorKind::Invalid,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }

    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { entity, .. } => match entity {
                Entity::Client => ErrorCode::ClientNotFound,
                Entity::Technician => ErrorCode::TechnicianNotFound,
                Entity::Ticket => ErrorCode::TicketNotFound,
                Entity::LineItem => ErrorCode::LineItemNotFound,
            },
            Self::Forbidden { .. } => ErrorCode::AccessDenied,
            Self::InvalidState { .. } => ErrorCode::TicketCanceled,
            Self::Conflict { .. } => ErrorCode::ConstraintViolation,
            Self::Invalid { .. } => ErrorCode::InvalidInput,
            Self::Storage(_) => ErrorCode::StorageFailure,
        }
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(err: rusqlite::Error) -> Self {
        if err.sqlite_error_code() == Some(rusqlite::ErrorCode::ConstraintViolation) {
            Self::Conflict {
                reason: err.to_string(),
            }
        } else {
            Self::Storage(err)
        }
    }
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
