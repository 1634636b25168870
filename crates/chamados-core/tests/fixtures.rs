//! Shared setup for the lifecycle integration tests.
//!
//! Included from sibling test files with `#[path = "fixtures.rs"] mod fixtures;`.

#![allow(dead_code)]

use chamados_core::db;
use chamados_core::lifecycle::{FixedClock, Lifecycle};
use chamados_core::model::party::NewClient;
use chamados_core::model::role::{Actor, Role};
use chamados_core::model::ticket::{NewLineItem, NewTicket, Ticket};
use chamados_core::model::{ClientId, TechnicianId};
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;

pub const ADMIN: Actor = Actor::new(1, Role::Administrator);
pub const MANAGER: Actor = Actor::new(2, Role::Manager);

pub fn at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 15, 10, 30, 0)
        .single()
        .expect("valid timestamp")
}

pub fn lifecycle(conn: &mut Connection) -> Lifecycle<'_, FixedClock> {
    Lifecycle::with_clock(conn, FixedClock(at()))
}

/// Insert a technician with a fixed id so scenarios can name it.
pub fn technician(conn: &Connection, id: TechnicianId, role: Role) {
    conn.execute(
        "INSERT INTO technicians (technician_id, username, name, password_hash, role, created_at) \
         VALUES (?1, ?2, ?3, 'x', ?4, '2024-01-01T00:00:00Z')",
        params![id, format!("tech{id}"), format!("Technician {id}"), role.as_str()],
    )
    .expect("insert technician");
}

/// A store with technicians 1 (admin), 2 (manager), 7 and 9 (employees)
/// and one client.
pub fn shop() -> (Connection, ClientId) {
    let mut conn = db::open_in_memory().expect("open store");
    technician(&conn, 1, Role::Administrator);
    technician(&conn, 2, Role::Manager);
    technician(&conn, 7, Role::Employee);
    technician(&conn, 9, Role::Employee);
    let client = lifecycle(&mut conn)
        .register_client(&NewClient {
            phone: "11987654321".into(),
            name: "Marina Costa".into(),
            address: Some("Rua das Flores, 12".into()),
        })
        .expect("register client");
    (conn, client.id)
}

pub fn open_ticket(
    conn: &mut Connection,
    client_id: ClientId,
    assignee: Option<TechnicianId>,
) -> Ticket {
    lifecycle(conn)
        .create(&NewTicket {
            client_id,
            technician_id: assignee,
            description: "Washing machine does not spin".into(),
            device: "Brastemp washer".into(),
            ..NewTicket::default()
        })
        .expect("create ticket")
}

pub fn item(quantity: u32, unit_price_cents: i64) -> NewLineItem {
    NewLineItem {
        description: "Drive belt".into(),
        quantity,
        unit_price: Decimal::new(unit_price_cents, 2),
    }
}

pub fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .expect("count rows")
}
