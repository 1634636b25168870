//! Cash ledger: completion postings and period summaries.
//!
//! The lifecycle controller is the only caller of [`LedgerPoster::post_completion`],
//! and only on a transition into `Completed`. Entries are never reversed when
//! a ticket later leaves that state; each re-entry posts again.

use chrono::{DateTime, Datelike, Utc};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use crate::db::query::{self, LedgerFilter};
use crate::db::write;
use crate::error::Result;
use crate::model::ledger::{LedgerEntry, LedgerKind, NewLedgerEntry};
use crate::model::money;
use crate::model::ticket::Ticket;

pub const DEFAULT_DESCRIPTION_PREFIX: &str = "Ticket";

/// Builds and writes completion entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerPoster {
    description_prefix: String,
}

impl Default for LedgerPoster {
    fn default() -> Self {
        Self::new(DEFAULT_DESCRIPTION_PREFIX)
    }
}

impl LedgerPoster {
    #[must_use]
    pub fn new(description_prefix: impl Into<String>) -> Self {
        Self {
            description_prefix: description_prefix.into(),
        }
    }

    /// The entry a completed ticket should produce, posted on the ticket's
    /// completion date or, absent one, on `now`.
    #[must_use]
    pub fn completion_entry(&self, ticket: &Ticket, now: DateTime<Utc>) -> NewLedgerEntry {
        let posted_at = ticket.completed_at.unwrap_or(now);
        NewLedgerEntry {
            description: format!("{} #{} - {}", self.description_prefix, ticket.id, ticket.device),
            amount: money::normalize(ticket.value),
            kind: LedgerKind::Inflow,
            posted_on: posted_at.date_naive(),
            settled: false,
            technician_id: ticket.technician_id,
        }
    }

    /// Write the completion entry for `ticket` as it stands inside the
    /// caller's unit of work.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn post_completion(
        &self,
        conn: &Connection,
        ticket: &Ticket,
        now: DateTime<Utc>,
    ) -> Result<LedgerEntry> {
        let entry = self.completion_entry(ticket, now);
        let id = write::insert_ledger_entry(conn, &entry, now)?;
        info!(
            ticket_id = ticket.id,
            ledger_id = id,
            amount = %entry.amount,
            posted_on = %entry.posted_on,
            "posted completion ledger entry"
        );
        Ok(LedgerEntry {
            id,
            description: entry.description,
            amount: entry.amount,
            kind: entry.kind,
            posted_on: entry.posted_on,
            month: entry.posted_on.month(),
            year: entry.posted_on.year(),
            settled: entry.settled,
            technician_id: entry.technician_id,
            created_at: now,
        })
    }
}

/// Totals over a reporting period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LedgerSummary {
    pub total_inflow: Decimal,
    pub total_outflow: Decimal,
    pub balance: Decimal,
}

/// Entries matching `filter`, newest posting first.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn list_entries(conn: &Connection, filter: &LedgerFilter) -> Result<Vec<LedgerEntry>> {
    query::list_ledger_entries(conn, filter)
}

/// Sum inflows and outflows over the month and/or year in `filter`. The
/// filter's `kind` is ignored; both sides are always reported.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn summary(conn: &Connection, filter: &LedgerFilter) -> Result<LedgerSummary> {
    let (inflow_cents, outflow_cents): (i64, i64) = conn.query_row(
        "SELECT \
             COALESCE(SUM(CASE WHEN kind = 'inflow' THEN amount_cents END), 0), \
             COALESCE(SUM(CASE WHEN kind = 'outflow' THEN amount_cents END), 0) \
         FROM ledger_entries \
         WHERE (?1 IS NULL OR month = ?1) AND (?2 IS NULL OR year = ?2)",
        params![filter.month, filter.year],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    let total_inflow = money::from_cents(inflow_cents);
    let total_outflow = money::from_cents(outflow_cents);
    Ok(LedgerSummary {
        total_inflow,
        total_outflow,
        balance: total_inflow - total_outflow,
    })
}
