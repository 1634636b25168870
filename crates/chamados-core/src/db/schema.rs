//! Canonical SQLite schema for chamados.
//!
//! - `clients` and `technicians` are the parties tickets point at
//! - `tickets` carries the cached `value_cents` total of its `line_items`
//! - `audit_records` is append-only; nothing in the crate updates or deletes rows
//! - `ledger_entries` holds cash movements, including completion postings
//! - `store_meta` mirrors the schema version for diagnostics

/// Migration v1: core tables and store metadata.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS clients (
    client_id INTEGER PRIMARY KEY AUTOINCREMENT,
    phone TEXT NOT NULL UNIQUE CHECK (length(trim(phone)) > 0),
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    address TEXT
);

CREATE TABLE IF NOT EXISTS technicians (
    technician_id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE CHECK (length(trim(username)) > 0),
    name TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'employee'
        CHECK (role IN ('administrator', 'manager', 'employee')),
    active INTEGER NOT NULL DEFAULT 1 CHECK (active IN (0, 1)),
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tickets (
    ticket_id INTEGER PRIMARY KEY AUTOINCREMENT,
    client_id INTEGER NOT NULL REFERENCES clients(client_id) ON DELETE CASCADE,
    technician_id INTEGER REFERENCES technicians(technician_id) ON DELETE SET NULL,
    description TEXT NOT NULL,
    device TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'Open' CHECK (length(trim(status)) > 0),
    value_cents INTEGER NOT NULL DEFAULT 0 CHECK (value_cents >= 0),
    note TEXT,
    opened_at TEXT NOT NULL,
    expected_on TEXT,
    completed_at TEXT
);

CREATE TABLE IF NOT EXISTS line_items (
    line_item_id INTEGER PRIMARY KEY AUTOINCREMENT,
    ticket_id INTEGER NOT NULL REFERENCES tickets(ticket_id) ON DELETE CASCADE,
    description TEXT NOT NULL,
    quantity INTEGER NOT NULL DEFAULT 1 CHECK (quantity >= 1),
    unit_price_cents INTEGER NOT NULL CHECK (unit_price_cents >= 0)
);

CREATE TABLE IF NOT EXISTS audit_records (
    audit_id INTEGER PRIMARY KEY AUTOINCREMENT,
    ticket_id INTEGER NOT NULL REFERENCES tickets(ticket_id) ON DELETE CASCADE,
    field TEXT NOT NULL,
    old_value TEXT,
    new_value TEXT,
    changed_at TEXT NOT NULL,
    technician_id INTEGER
);

CREATE TABLE IF NOT EXISTS ledger_entries (
    ledger_id INTEGER PRIMARY KEY AUTOINCREMENT,
    description TEXT NOT NULL,
    amount_cents INTEGER NOT NULL,
    kind TEXT NOT NULL CHECK (kind IN ('inflow', 'outflow')),
    posted_on TEXT NOT NULL,
    month INTEGER NOT NULL CHECK (month BETWEEN 1 AND 12),
    year INTEGER NOT NULL,
    settled INTEGER NOT NULL DEFAULT 0 CHECK (settled IN (0, 1)),
    technician_id INTEGER REFERENCES technicians(technician_id) ON DELETE SET NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL
);

INSERT OR IGNORE INTO store_meta (id, schema_version) VALUES (1, 1);
";

/// Migration v2: read-path indexes and the audit immutability guard.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_tickets_client_opened
    ON tickets(client_id, opened_at DESC);

CREATE INDEX IF NOT EXISTS idx_tickets_technician
    ON tickets(technician_id);

CREATE INDEX IF NOT EXISTS idx_tickets_status
    ON tickets(status);

CREATE INDEX IF NOT EXISTS idx_line_items_ticket
    ON line_items(ticket_id);

CREATE INDEX IF NOT EXISTS idx_audit_records_ticket
    ON audit_records(ticket_id, audit_id);

CREATE INDEX IF NOT EXISTS idx_ledger_entries_period
    ON ledger_entries(year, month, kind);

CREATE TRIGGER IF NOT EXISTS audit_records_no_update
BEFORE UPDATE ON audit_records
BEGIN
    SELECT RAISE(ABORT, 'audit records are immutable');
END;
";

/// Indexes expected after all migrations are applied.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_tickets_client_opened",
    "idx_tickets_technician",
    "idx_tickets_status",
    "idx_line_items_ticket",
    "idx_audit_records_ticket",
    "idx_ledger_entries_period",
];
