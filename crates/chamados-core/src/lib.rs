//! chamados-core library.
//!
//! Ticket lifecycle engine for a repair shop: tickets with billable line
//! items, a derived ticket total, a field-level audit trail and cash ledger
//! postings on completion, all over a single SQLite store.
//!
//! # Conventions
//!
//! - **Errors**: engine operations return [`error::Result`]; setup paths
//!   (opening the store, loading config) use `anyhow::Result`.
//! - **Logging**: use `tracing` macros (`info!`, `warn!`, `debug!`).
//! - **Writes**: only [`lifecycle::Lifecycle`] mutates tickets, items, audit
//!   records and completion ledger entries.

pub mod audit;
pub mod authz;
pub mod config;
pub mod db;
pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod model;
pub mod stats;
pub mod valuation;
