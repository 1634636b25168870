//! Shop-wide ticket statistics.

use chrono::{Datelike, NaiveDate};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::Result;
use crate::model::money;
use crate::model::status::{CANCELED, COMPLETED, IN_PROGRESS, OPEN};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketStatistics {
    pub total_open: i64,
    pub total_in_progress: i64,
    pub total_completed: i64,
    pub total_canceled: i64,
    /// Sum of totals over tickets currently `In Progress`.
    pub open_value: Decimal,
    /// Inflow ledger entries posted in the month of `today`.
    pub received_this_month: Decimal,
    /// Ticket count per client name. Clients sharing a name are merged.
    pub tickets_by_client: BTreeMap<String, i64>,
}

/// # Errors
///
/// Returns an error if any of the aggregate queries fails.
pub fn ticket_statistics(conn: &Connection, today: NaiveDate) -> Result<TicketStatistics> {
    let count = |status: &str| -> Result<i64> {
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM tickets WHERE status = ?1",
            [status],
            |row| row.get(0),
        )?)
    };

    let open_value_cents: i64 = conn.query_row(
        "SELECT COALESCE(SUM(value_cents), 0) FROM tickets WHERE status = ?1",
        [IN_PROGRESS],
        |row| row.get(0),
    )?;

    let received_cents: i64 = conn.query_row(
        "SELECT COALESCE(SUM(amount_cents), 0) FROM ledger_entries \
         WHERE kind = 'inflow' AND month = ?1 AND year = ?2",
        params![today.month(), today.year()],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(
        "SELECT c.name, COUNT(t.ticket_id) FROM clients c \
         JOIN tickets t ON t.client_id = c.client_id \
         GROUP BY c.name ORDER BY c.name",
    )?;
    let tickets_by_client = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
        .collect::<rusqlite::Result<BTreeMap<_, _>>>()?;

    Ok(TicketStatistics {
        total_open: count(OPEN)?,
        total_in_progress: count(IN_PROGRESS)?,
        total_completed: count(COMPLETED)?,
        total_canceled: count(CANCELED)?,
        open_value: money::from_cents(open_value_cents),
        received_this_month: money::from_cents(received_cents),
        tickets_by_client,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{self, write};
    use crate::model::ledger::{LedgerKind, NewLedgerEntry};
    use crate::model::party::NewClient;
    use crate::model::status::TicketStatus;
    use crate::model::ticket::NewTicket;
    use chrono::Utc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn empty_store_is_all_zero() {
        let conn = db::open_in_memory().expect("store");
        let stats = ticket_statistics(&conn, date(2024, 6, 1)).expect("stats");
        assert_eq!(stats.total_open, 0);
        assert_eq!(stats.open_value, Decimal::ZERO);
        assert!(stats.tickets_by_client.is_empty());
    }

    #[test]
    fn counts_values_and_monthly_receipts() {
        let conn = db::open_in_memory().expect("store");
        let now = Utc::now();
        let ana = write::insert_client(
            &conn,
            &NewClient {
                phone: "1130001000".into(),
                name: "Ana".into(),
                address: None,
            },
        )
        .expect("client");
        let bruno = write::insert_client(
            &conn,
            &NewClient {
                phone: "1130002000".into(),
                name: "Bruno".into(),
                address: None,
            },
        )
        .expect("client");

        for (client_id, status) in [
            (ana, TicketStatus::open()),
            (ana, TicketStatus::new(IN_PROGRESS).expect("status")),
            (bruno, TicketStatus::new(IN_PROGRESS).expect("status")),
            (bruno, TicketStatus::canceled()),
        ] {
            let id = write::insert_ticket(
                &conn,
                &NewTicket {
                    client_id,
                    description: "Does not turn on".into(),
                    device: "Blender".into(),
                    status,
                    ..NewTicket::default()
                },
                now,
            )
            .expect("ticket");
            write::set_ticket_value(&conn, id, money::from_cents(5_000)).expect("value");
        }

        for (posted_on, kind) in [
            (date(2024, 6, 3), LedgerKind::Inflow),
            (date(2024, 6, 20), LedgerKind::Inflow),
            (date(2024, 6, 21), LedgerKind::Outflow),
            (date(2024, 5, 30), LedgerKind::Inflow),
        ] {
            let entry = NewLedgerEntry {
                description: "entry".into(),
                amount: money::from_cents(1_000),
                kind,
                posted_on,
                settled: false,
                technician_id: None,
            };
            write::insert_ledger_entry(&conn, &entry, now).expect("ledger");
        }

        let stats = ticket_statistics(&conn, date(2024, 6, 25)).expect("stats");
        assert_eq!(stats.total_open, 1);
        assert_eq!(stats.total_in_progress, 2);
        assert_eq!(stats.total_completed, 0);
        assert_eq!(stats.total_canceled, 1);
        assert_eq!(money::display(stats.open_value), "100.00");
        assert_eq!(money::display(stats.received_this_month), "20.00");
        assert_eq!(stats.tickets_by_client.get("Ana"), Some(&2));
        assert_eq!(stats.tickets_by_client.get("Bruno"), Some(&2));
    }
}
