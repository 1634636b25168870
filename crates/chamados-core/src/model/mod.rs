//! Domain types shared by the store, the engines and the CLI.

pub mod audit;
pub mod ledger;
pub mod money;
pub mod party;
pub mod role;
pub mod status;
pub mod ticket;

pub type ClientId = i64;
pub type TechnicianId = i64;
pub type TicketId = i64;
pub type LineItemId = i64;
pub type AuditRecordId = i64;
pub type LedgerEntryId = i64;
