//! Ticket status.
//!
//! Status is free text chosen by the shop. Only two labels carry behaviour:
//! [`COMPLETED`] posts a ledger entry on entry, and [`CANCELED`] locks the
//! ticket's line items. Everything else is stored and compared verbatim.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{EngineError, Result};

pub const OPEN: &str = "Open";
pub const IN_PROGRESS: &str = "In Progress";
pub const COMPLETED: &str = "Completed";
pub const CANCELED: &str = "Canceled";

/// Labels the reporting queries break counts down by.
pub const RESERVED: [&str; 4] = [OPEN, IN_PROGRESS, COMPLETED, CANCELED];

pub const MAX_STATUS_LEN: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TicketStatus(String);

impl TicketStatus {
    /// Validate and wrap a status label.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Invalid`] when the label is empty, padded with
    /// whitespace, longer than [`MAX_STATUS_LEN`], or contains control
    /// characters.
    pub fn new(label: impl Into<String>) -> Result<Self> {
        let label = label.into();
        if label.trim().is_empty() {
            return Err(EngineError::invalid("status", "must not be empty"));
        }
        if label.trim() != label {
            return Err(EngineError::invalid(
                "status",
                format!("'{label}' must not start or end with whitespace"),
            ));
        }
        if label.chars().count() > MAX_STATUS_LEN {
            return Err(EngineError::invalid(
                "status",
                format!("must be <= {MAX_STATUS_LEN} characters"),
            ));
        }
        if label.chars().any(char::is_control) {
            return Err(EngineError::invalid(
                "status",
                "must not contain control characters",
            ));
        }
        Ok(Self(label))
    }

    #[must_use]
    pub fn open() -> Self {
        Self(OPEN.to_string())
    }

    #[must_use]
    pub fn completed() -> Self {
        Self(COMPLETED.to_string())
    }

    #[must_use]
    pub fn canceled() -> Self {
        Self(CANCELED.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.0 == COMPLETED
    }

    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.0 == CANCELED
    }

    /// True when moving from `self` to `next` enters the completed state.
    #[must_use]
    pub fn enters_completed(&self, next: &Self) -> bool {
        !self.is_completed() && next.is_completed()
    }
}

impl Default for TicketStatus {
    fn default() -> Self {
        Self::open()
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TicketStatus {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<TicketStatus> for String {
    fn from(status: TicketStatus) -> Self {
        status.0
    }
}
