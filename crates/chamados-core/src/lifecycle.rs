//! Ticket lifecycle controller.
//!
//! [`Lifecycle`] is the only writer of tickets, line items, audit records
//! and completion ledger entries. Every mutating operation runs as one
//! `BEGIN IMMEDIATE` unit of work: either every row it touches commits, or
//! the transaction is dropped and nothing does.
//!
//! # Ordering inside a unit of work
//!
//! 1. validate input (no store access)
//! 2. load the ticket, authorize the actor
//! 3. apply the mutation
//! 4. revalue / audit
//! 5. dispatch [`TicketEvent`]s (ledger posting)
//! 6. commit

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use rust_decimal::Decimal;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::audit;
use crate::authz;
use crate::db::{query, write};
use crate::error::{EngineError, Entity, Result};
use crate::ledger::LedgerPoster;
use crate::model::audit::{AuditRecord, FieldChange};
use crate::model::ledger::LedgerEntry;
use crate::model::party::{Client, NewClient, NewTechnician, Technician};
use crate::model::role::Actor;
use crate::model::status::TicketStatus;
use crate::model::ticket::{
    LineItem, LineItemPatch, NewLineItem, NewTicket, Ticket, TicketDetail, TicketField,
    TicketPatch,
};
use crate::model::{ClientId, LineItemId, TechnicianId, TicketId};
use crate::valuation;

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of the wall-clock time stamped on rows.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Events and outcomes
// ---------------------------------------------------------------------------

/// Cross-entity side effects raised by a ticket transition and handled
/// before the unit of work commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketEvent {
    /// The ticket moved into `Completed` from any other status. Carries the
    /// ticket as it stands after the transition.
    Completed(Ticket),
}

/// Result of a ticket field update or cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateOutcome {
    pub ticket: Ticket,
    /// One record per field whose value actually changed.
    pub changes: Vec<AuditRecord>,
    pub ledger_entry: Option<LedgerEntry>,
}

impl UpdateOutcome {
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Result of a line item mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemOutcome {
    /// The item as written, or as it was just before removal.
    pub item: LineItem,
    pub ticket_value: Decimal,
    /// Present only when the ticket total moved.
    pub value_change: Option<AuditRecord>,
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Orchestrates authorization, valuation, auditing and ledger posting over
/// one store connection.
pub struct Lifecycle<'conn, C = SystemClock> {
    conn: &'conn mut Connection,
    clock: C,
    poster: LedgerPoster,
}

impl<'conn> Lifecycle<'conn, SystemClock> {
    /// Controller on the system clock with the default ledger poster.
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self::with_clock(conn, SystemClock)
    }
}

impl<'conn, C: Clock> Lifecycle<'conn, C> {
    pub fn with_clock(conn: &'conn mut Connection, clock: C) -> Self {
        Self {
            conn,
            clock,
            poster: LedgerPoster::default(),
        }
    }

    #[must_use]
    pub fn with_poster(mut self, poster: LedgerPoster) -> Self {
        self.poster = poster;
        self
    }

    // -----------------------------------------------------------------------
    // Tickets
    // -----------------------------------------------------------------------

    /// Open a ticket for an existing client with a zero total. Initial field
    /// values are not audited.
    ///
    /// # Errors
    ///
    /// `Invalid` for malformed input, `NotFound` for a missing client or
    /// assignee, `Conflict` on a constraint failure.
    pub fn create(&mut self, new: &NewTicket) -> Result<Ticket> {
        new.validate()?;
        let now = self.clock.now();
        in_unit_of_work(self.conn, "create", |tx| {
            query::require_client(tx, new.client_id)?;
            if let Some(technician_id) = new.technician_id {
                query::require_technician(tx, technician_id)?;
            }
            let id = write::insert_ticket(tx, new, now)?;
            let ticket = query::require_ticket(tx, id)?;
            info!(
                ticket_id = id,
                client_id = new.client_id,
                status = %ticket.status,
                "ticket opened"
            );
            Ok(ticket)
        })
    }

    /// Apply a partial update on behalf of `actor`.
    ///
    /// Fields set to their current value are ignored; an update that changes
    /// nothing writes nothing. A transition into `Completed` posts a ledger
    /// entry for the ticket's current total in the same unit of work.
    ///
    /// # Errors
    ///
    /// `Invalid`, `NotFound` (ticket or new assignee), `Forbidden`, or
    /// `Conflict`.
    pub fn update(
        &mut self,
        actor: Actor,
        ticket_id: TicketId,
        patch: &TicketPatch,
    ) -> Result<UpdateOutcome> {
        patch.validate()?;
        let now = self.clock.now();
        let poster = &self.poster;
        in_unit_of_work(self.conn, "update", |tx| {
            let before = query::require_ticket(tx, ticket_id)?;
            authz::ensure_ticket_access(actor, before.technician_id)?;
            if let Some(Some(assignee)) = patch.technician_id {
                query::require_technician(tx, assignee)?;
            }

            let after = patch.apply_to(&before);
            let diff = audit::diff(&before, &after, &patch.fields());
            if diff.is_empty() {
                return Ok(UpdateOutcome {
                    ticket: before,
                    changes: Vec::new(),
                    ledger_entry: None,
                });
            }

            write::update_ticket_fields(tx, &after)?;
            let changes = audit::record(tx, ticket_id, &diff, now, Some(actor.id))?;

            let mut ledger_entry = None;
            if before.status.enters_completed(&after.status) {
                ledger_entry = dispatch(tx, poster, &TicketEvent::Completed(after.clone()), now)?;
            }

            info!(
                ticket_id,
                actor_id = actor.id,
                fields = %field_list(&diff),
                ledger_id = ledger_entry.as_ref().map(|entry| entry.id),
                "ticket updated"
            );
            Ok(UpdateOutcome {
                ticket: after,
                changes,
                ledger_entry,
            })
        })
    }

    /// Soft-delete: move the ticket to `Canceled`. Canceling a canceled
    /// ticket succeeds without writing anything.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Forbidden`, or `Conflict`.
    pub fn cancel(&mut self, actor: Actor, ticket_id: TicketId) -> Result<UpdateOutcome> {
        let now = self.clock.now();
        in_unit_of_work(self.conn, "cancel", |tx| {
            let before = query::require_ticket(tx, ticket_id)?;
            authz::ensure_ticket_access(actor, before.technician_id)?;
            if before.status.is_canceled() {
                info!(ticket_id, "ticket already canceled");
                return Ok(UpdateOutcome {
                    ticket: before,
                    changes: Vec::new(),
                    ledger_entry: None,
                });
            }

            let mut after = before.clone();
            after.status = TicketStatus::canceled();
            write::update_ticket_fields(tx, &after)?;
            let changes = audit::diff_and_record(
                tx,
                &before,
                &after,
                &[TicketField::Status],
                now,
                Some(actor.id),
            )?;
            info!(ticket_id, actor_id = actor.id, from = %before.status, "ticket canceled");
            Ok(UpdateOutcome {
                ticket: after,
                changes,
                ledger_entry: None,
            })
        })
    }

    /// Ticket with its client and current line items.
    ///
    /// # Errors
    ///
    /// `NotFound` or `Forbidden`.
    pub fn get_ticket(&self, actor: Actor, ticket_id: TicketId) -> Result<TicketDetail> {
        let ticket = self.authorized_ticket(actor, ticket_id)?;
        let client = query::require_client(self.conn, ticket.client_id)?;
        let items = query::list_line_items(self.conn, ticket_id)?;
        Ok(TicketDetail {
            ticket,
            client,
            items,
        })
    }

    /// # Errors
    ///
    /// `NotFound` or `Forbidden`.
    pub fn list_items(&self, actor: Actor, ticket_id: TicketId) -> Result<Vec<LineItem>> {
        self.authorized_ticket(actor, ticket_id)?;
        query::list_line_items(self.conn, ticket_id)
    }

    /// Audit trail of a ticket, oldest first.
    ///
    /// # Errors
    ///
    /// `NotFound` or `Forbidden`.
    pub fn history(&self, actor: Actor, ticket_id: TicketId) -> Result<Vec<AuditRecord>> {
        self.authorized_ticket(actor, ticket_id)?;
        query::list_audit_records(self.conn, ticket_id)
    }

    /// Every ticket of a client, newest first.
    ///
    /// # Errors
    ///
    /// `NotFound` when the client does not exist.
    pub fn tickets_for_client(&self, client_id: ClientId) -> Result<Vec<Ticket>> {
        query::require_client(self.conn, client_id)?;
        query::tickets_for_client(self.conn, client_id)
    }

    /// Tickets expected on `date` that `actor` may see, oldest ticket first.
    ///
    /// Employees only get the tickets assigned to them.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn tickets_due_on(&self, actor: Actor, date: NaiveDate) -> Result<Vec<Ticket>> {
        let mut tickets = query::tickets_due_on(self.conn, date)?;
        tickets.retain(|ticket| authz::can_access(actor.role, actor.id, ticket.technician_id));
        Ok(tickets)
    }

    fn authorized_ticket(&self, actor: Actor, ticket_id: TicketId) -> Result<Ticket> {
        let ticket = query::require_ticket(self.conn, ticket_id)?;
        authz::ensure_ticket_access(actor, ticket.technician_id)?;
        Ok(ticket)
    }

    // -----------------------------------------------------------------------
    // Line items
    // -----------------------------------------------------------------------

    /// # Errors
    ///
    /// `Invalid`, `NotFound`, `Forbidden`, `InvalidState` when the ticket is
    /// canceled, or `Conflict`.
    pub fn add_item(
        &mut self,
        actor: Actor,
        ticket_id: TicketId,
        item: &NewLineItem,
    ) -> Result<ItemOutcome> {
        item.validate()?;
        let now = self.clock.now();
        in_unit_of_work(self.conn, "add_item", |tx| {
            let ticket = mutable_ticket(tx, actor, ticket_id, "add items to")?;
            let item_id = write::insert_line_item(tx, ticket_id, item)?;
            let item = query::require_line_item(tx, item_id)?;
            let (ticket_value, value_change) = revalue(tx, &ticket, actor, now)?;
            info!(ticket_id, item_id, value = %ticket_value, "line item added");
            Ok(ItemOutcome {
                item,
                ticket_value,
                value_change,
            })
        })
    }

    /// # Errors
    ///
    /// `Invalid`, `NotFound`, `Forbidden`, `InvalidState` when the owning
    /// ticket is canceled, or `Conflict`.
    pub fn update_item(
        &mut self,
        actor: Actor,
        item_id: LineItemId,
        patch: &LineItemPatch,
    ) -> Result<ItemOutcome> {
        patch.validate()?;
        let now = self.clock.now();
        in_unit_of_work(self.conn, "update_item", |tx| {
            let current = query::require_line_item(tx, item_id)?;
            let ticket = mutable_ticket(tx, actor, current.ticket_id, "update items of")?;
            let item = patch.apply_to(&current);
            write::update_line_item(tx, &item)?;
            let (ticket_value, value_change) = revalue(tx, &ticket, actor, now)?;
            info!(ticket_id = ticket.id, item_id, value = %ticket_value, "line item updated");
            Ok(ItemOutcome {
                item,
                ticket_value,
                value_change,
            })
        })
    }

    /// # Errors
    ///
    /// `NotFound`, `Forbidden`, `InvalidState` when the owning ticket is
    /// canceled, or `Conflict`.
    pub fn remove_item(&mut self, actor: Actor, item_id: LineItemId) -> Result<ItemOutcome> {
        let now = self.clock.now();
        in_unit_of_work(self.conn, "remove_item", |tx| {
            let item = query::require_line_item(tx, item_id)?;
            let ticket = mutable_ticket(tx, actor, item.ticket_id, "remove items from")?;
            write::delete_line_item(tx, item_id)?;
            let (ticket_value, value_change) = revalue(tx, &ticket, actor, now)?;
            info!(ticket_id = ticket.id, item_id, value = %ticket_value, "line item removed");
            Ok(ItemOutcome {
                item,
                ticket_value,
                value_change,
            })
        })
    }

    // -----------------------------------------------------------------------
    // Parties
    // -----------------------------------------------------------------------

    /// # Errors
    ///
    /// `Invalid`, or `Conflict` when the phone number is taken.
    pub fn register_client(&mut self, new: &NewClient) -> Result<Client> {
        new.validate()?;
        in_unit_of_work(self.conn, "register_client", |tx| {
            let id = write::insert_client(tx, new)?;
            info!(client_id = id, "client registered");
            query::require_client(tx, id)
        })
    }

    /// Remove a client together with its tickets, items and audit trail.
    ///
    /// # Errors
    ///
    /// `NotFound` when the client does not exist.
    pub fn remove_client(&mut self, client_id: ClientId) -> Result<()> {
        in_unit_of_work(self.conn, "remove_client", |tx| {
            if !write::delete_client(tx, client_id)? {
                return Err(EngineError::not_found(Entity::Client, client_id));
            }
            info!(client_id, "client removed");
            Ok(())
        })
    }

    /// Create a staff account on behalf of `actor`.
    ///
    /// # Errors
    ///
    /// `Invalid`, `Forbidden` when the actor may not manage the new role,
    /// or `Conflict` when the username is taken.
    pub fn register_technician(&mut self, actor: Actor, new: &NewTechnician) -> Result<Technician> {
        new.validate()?;
        authz::ensure_can_manage(actor, new.role)?;
        self.insert_technician(new)
    }

    /// Create the first account of an empty store. There is no actor yet,
    /// so this only succeeds while no technician exists.
    ///
    /// # Errors
    ///
    /// `Invalid`, or `Forbidden` once any technician is registered.
    pub fn bootstrap_technician(&mut self, new: &NewTechnician) -> Result<Technician> {
        new.validate()?;
        let now = self.clock.now();
        let hash = password_hash(&new.password);
        in_unit_of_work(self.conn, "bootstrap_technician", |tx| {
            if query::count_technicians(tx)? > 0 {
                return Err(EngineError::forbidden(
                    "technicians already exist; register new ones as an existing actor",
                ));
            }
            store_technician(tx, new, &hash, now)
        })
    }

    /// # Errors
    ///
    /// `NotFound`, or `Forbidden` when the actor may not manage the target's
    /// role.
    pub fn set_technician_active(
        &mut self,
        actor: Actor,
        technician_id: TechnicianId,
        active: bool,
    ) -> Result<Technician> {
        in_unit_of_work(self.conn, "set_technician_active", |tx| {
            let mut technician = query::require_technician(tx, technician_id)?;
            authz::ensure_can_manage(actor, technician.role)?;
            write::set_technician_active(tx, technician_id, active)?;
            technician.active = active;
            info!(technician_id, active, actor_id = actor.id, "technician activation changed");
            Ok(technician)
        })
    }

    fn insert_technician(&mut self, new: &NewTechnician) -> Result<Technician> {
        let now = self.clock.now();
        let hash = password_hash(&new.password);
        in_unit_of_work(self.conn, "register_technician", |tx| {
            store_technician(tx, new, &hash, now)
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn in_unit_of_work<T>(
    conn: &mut Connection,
    operation: &'static str,
    work: impl FnOnce(&Transaction<'_>) -> Result<T>,
) -> Result<T> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    match work(&tx) {
        Ok(value) => {
            tx.commit()?;
            Ok(value)
        }
        Err(err) => {
            warn!(operation, kind = %err.kind(), error = %err, "rolling back");
            Err(err)
        }
    }
}

fn store_technician(
    conn: &Connection,
    new: &NewTechnician,
    hash: &str,
    now: DateTime<Utc>,
) -> Result<Technician> {
    let id = write::insert_technician(conn, new, hash, now)?;
    info!(technician_id = id, role = %new.role, "technician registered");
    query::require_technician(conn, id)
}

/// Load and authorize a ticket whose items are about to change.
fn mutable_ticket(
    conn: &Connection,
    actor: Actor,
    ticket_id: TicketId,
    verb: &str,
) -> Result<Ticket> {
    let ticket = query::require_ticket(conn, ticket_id)?;
    authz::ensure_ticket_access(actor, ticket.technician_id)?;
    if ticket.status.is_canceled() {
        return Err(EngineError::invalid_state(format!(
            "cannot {verb} canceled ticket {ticket_id}"
        )));
    }
    Ok(ticket)
}

/// Recompute the ticket total and, when it moved, persist it with a `value`
/// audit record.
fn revalue(
    conn: &Connection,
    ticket: &Ticket,
    actor: Actor,
    now: DateTime<Utc>,
) -> Result<(Decimal, Option<AuditRecord>)> {
    let total = valuation::recompute(conn, ticket.id)?;
    if total == ticket.value {
        return Ok((total, None));
    }
    write::set_ticket_value(conn, ticket.id, total)?;
    let mut after = ticket.clone();
    after.value = total;
    let record =
        audit::diff_and_record(conn, ticket, &after, &[TicketField::Value], now, Some(actor.id))?
            .into_iter()
            .next();
    Ok((total, record))
}

fn dispatch(
    conn: &Connection,
    poster: &LedgerPoster,
    event: &TicketEvent,
    now: DateTime<Utc>,
) -> Result<Option<LedgerEntry>> {
    match event {
        TicketEvent::Completed(ticket) => poster.post_completion(conn, ticket, now).map(Some),
    }
}

fn field_list(changes: &[FieldChange]) -> String {
    changes
        .iter()
        .map(|change| change.field.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

/// SHA-256 hex digest stored as the account credential.
#[must_use]
pub fn password_hash(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}
