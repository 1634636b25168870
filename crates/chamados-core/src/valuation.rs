//! Derived ticket totals.
//!
//! A ticket's `value` is a cache of the sum of its line items. It is
//! recomputed inside the same transaction as every line item mutation and
//! never computed lazily at read time.

use rusqlite::Connection;
use rust_decimal::Decimal;
use tracing::debug;

use crate::db::query;
use crate::error::Result;
use crate::model::TicketId;
use crate::model::money;
use crate::model::ticket::LineItem;

/// Sum of `quantity × unit_price` over `items`; zero for an empty set.
#[must_use]
pub fn total_of(items: &[LineItem]) -> Decimal {
    money::normalize(items.iter().map(LineItem::total).sum())
}

/// Recompute a ticket's total from the line items currently visible on
/// `conn`. Does not write anything.
///
/// # Errors
///
/// Returns an error if reading the line items fails.
pub fn recompute(conn: &Connection, ticket_id: TicketId) -> Result<Decimal> {
    let items = query::list_line_items(conn, ticket_id)?;
    let total = total_of(&items);
    debug!(ticket_id, items = items.len(), total = %total, "recomputed ticket value");
    Ok(total)
}
