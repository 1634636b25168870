use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::{LedgerEntryId, TechnicianId};

/// Direction of a cash movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerKind {
    Inflow,
    Outflow,
}

impl LedgerKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inflow => "inflow",
            Self::Outflow => "outflow",
        }
    }
}

impl fmt::Display for LedgerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LedgerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inflow" | "in" | "entrada" => Ok(Self::Inflow),
            "outflow" | "out" | "saida" | "saída" => Ok(Self::Outflow),
            other => Err(format!("invalid ledger kind '{other}': expected inflow or outflow")),
        }
    }
}

/// A cash-flow record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: LedgerEntryId,
    pub description: String,
    pub amount: Decimal,
    pub kind: LedgerKind,
    pub posted_on: NaiveDate,
    pub month: u32,
    pub year: i32,
    pub settled: bool,
    pub technician_id: Option<TechnicianId>,
    pub created_at: DateTime<Utc>,
}

/// Ledger entry before it has been assigned an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLedgerEntry {
    pub description: String,
    pub amount: Decimal,
    pub kind: LedgerKind,
    pub posted_on: NaiveDate,
    pub settled: bool,
    pub technician_id: Option<TechnicianId>,
}
