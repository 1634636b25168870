//! Ticket commands: `chm create`, `chm show`, `chm update`, `chm cancel`,
//! `chm history` and `chm due`.

use super::{Context, GlobalArgs};
use crate::output::{OutputMode, pretty_kv, pretty_rule, pretty_section, render_mode};
use anyhow::Result;
use chamados_core::lifecycle::UpdateOutcome;
use chamados_core::model::audit::AuditRecord;
use chamados_core::model::money;
use chamados_core::model::status::TicketStatus;
use chamados_core::model::ticket::{NewTicket, Ticket, TicketDetail, TicketPatch};
use chamados_core::model::{ClientId, TechnicianId, TicketId};
use chrono::{DateTime, Local, NaiveDate, SecondsFormat, Utc};
use clap::Args;
use std::io::{self, Write};
use std::path::Path;

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Client the ticket is opened for.
    #[arg(long)]
    pub client: ClientId,

    /// Technician to assign.
    #[arg(long)]
    pub assignee: Option<TechnicianId>,

    /// What the client reports.
    #[arg(long)]
    pub description: String,

    /// Appliance or device under repair.
    #[arg(long)]
    pub device: String,

    /// Initial status label.
    #[arg(long, default_value = "Open")]
    pub status: String,

    #[arg(long)]
    pub note: Option<String>,

    /// Promised date (YYYY-MM-DD).
    #[arg(long)]
    pub expected_on: Option<NaiveDate>,

    /// Completion timestamp (RFC 3339).
    #[arg(long)]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    pub id: TicketId,
}

#[derive(Args, Debug, Default)]
pub struct UpdateArgs {
    pub id: TicketId,

    #[arg(long, conflicts_with = "unassign")]
    pub assignee: Option<TechnicianId>,

    /// Remove the assigned technician.
    #[arg(long)]
    pub unassign: bool,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub device: Option<String>,

    /// New status label. Moving to "Completed" posts a ledger entry.
    #[arg(long)]
    pub status: Option<String>,

    #[arg(long, conflicts_with = "clear_note")]
    pub note: Option<String>,

    #[arg(long)]
    pub clear_note: bool,

    #[arg(long, conflicts_with = "clear_expected_on")]
    pub expected_on: Option<NaiveDate>,

    #[arg(long)]
    pub clear_expected_on: bool,

    #[arg(long, conflicts_with = "clear_completed_at")]
    pub completed_at: Option<DateTime<Utc>>,

    #[arg(long)]
    pub clear_completed_at: bool,
}

impl UpdateArgs {
    /// Build the field patch; `None` for flags that were not given.
    fn patch(&self) -> Result<TicketPatch> {
        Ok(TicketPatch {
            technician_id: set_or_clear(self.assignee, self.unassign),
            description: self.description.clone(),
            device: self.device.clone(),
            status: self.status.clone().map(TicketStatus::new).transpose()?,
            note: set_or_clear(self.note.clone(), self.clear_note),
            expected_on: set_or_clear(self.expected_on, self.clear_expected_on),
            completed_at: set_or_clear(self.completed_at, self.clear_completed_at),
        })
    }
}

fn set_or_clear<T>(value: Option<T>, clear: bool) -> Option<Option<T>> {
    if clear { Some(None) } else { value.map(Some) }
}

#[derive(Args, Debug)]
pub struct CancelArgs {
    pub id: TicketId,
}

#[derive(Args, Debug)]
pub struct HistoryArgs {
    pub id: TicketId,
}

#[derive(Args, Debug)]
pub struct DueArgs {
    /// Day to list (YYYY-MM-DD); defaults to today in local time.
    pub date: Option<NaiveDate>,
}

/// Execute `chm create`.
///
/// # Errors
///
/// Returns an error if the input is invalid, the client or assignee does
/// not exist, or the store write fails.
pub fn run_create(
    args: &CreateArgs,
    globals: &GlobalArgs,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let mut ctx = Context::open(globals, project_root)?;
    let ticket = ctx.lifecycle().create(&NewTicket {
        client_id: args.client,
        technician_id: args.assignee,
        description: args.description.clone(),
        device: args.device.clone(),
        status: TicketStatus::new(args.status.clone())?,
        note: args.note.clone(),
        expected_on: args.expected_on,
        completed_at: args.completed_at,
    })?;
    render_mode(
        output,
        &ticket,
        |t, w| write_ticket_rows(w, std::slice::from_ref(t)),
        |t, w| {
            writeln!(w, "✓ Opened ticket #{}", t.id)?;
            write_ticket_fields(w, t)
        },
    )
}

/// Execute `chm show <id>`.
///
/// # Errors
///
/// Returns an error if the ticket does not exist or the actor may not see it.
pub fn run_show(
    args: &ShowArgs,
    globals: &GlobalArgs,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let mut ctx = Context::open(globals, project_root)?;
    let actor = ctx.actor()?;
    let detail = ctx.lifecycle().get_ticket(actor, args.id)?;
    render_mode(output, &detail, write_detail_text, write_detail_pretty)
}

/// Execute `chm update <id>`.
///
/// # Errors
///
/// Returns an error if no field flag is given, input is invalid, or the
/// update is refused.
pub fn run_update(
    args: &UpdateArgs,
    globals: &GlobalArgs,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let patch = args.patch()?;
    if patch.is_empty() {
        anyhow::bail!("nothing to update. Pass at least one field flag, e.g. --status.");
    }
    let mut ctx = Context::open(globals, project_root)?;
    let actor = ctx.actor()?;
    let outcome = ctx.lifecycle().update(actor, args.id, &patch)?;
    render_mode(output, &outcome, write_outcome_text, write_outcome_pretty)
}

/// Execute `chm cancel <id>`.
///
/// # Errors
///
/// Returns an error if the ticket does not exist or the actor may not
/// change it.
pub fn run_cancel(
    args: &CancelArgs,
    globals: &GlobalArgs,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let mut ctx = Context::open(globals, project_root)?;
    let actor = ctx.actor()?;
    let outcome = ctx.lifecycle().cancel(actor, args.id)?;
    render_mode(output, &outcome, write_outcome_text, write_outcome_pretty)
}

/// Execute `chm history <id>`.
///
/// # Errors
///
/// Returns an error if the ticket does not exist or the actor may not see it.
pub fn run_history(
    args: &HistoryArgs,
    globals: &GlobalArgs,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let mut ctx = Context::open(globals, project_root)?;
    let actor = ctx.actor()?;
    let records = ctx.lifecycle().history(actor, args.id)?;
    render_mode(
        output,
        &records,
        |r, w| write_audit_rows(w, r),
        |r, w| {
            pretty_section(w, &format!("History of ticket #{}", args.id))?;
            if r.is_empty() {
                writeln!(w, "(no changes recorded)")
            } else {
                write_audit_rows(w, r)
            }
        },
    )
}

/// Execute `chm due [date]`.
///
/// # Errors
///
/// Returns an error if the actor cannot be resolved or the store read fails.
pub fn run_due(
    args: &DueArgs,
    globals: &GlobalArgs,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let mut ctx = Context::open(globals, project_root)?;
    let actor = ctx.actor()?;
    let date = args.date.unwrap_or_else(|| Local::now().date_naive());
    let tickets = ctx.lifecycle().tickets_due_on(actor, date)?;
    render_mode(
        output,
        &tickets,
        |t, w| write_ticket_rows(w, t),
        |t, w| {
            pretty_section(w, &format!("Due on {date}"))?;
            if t.is_empty() {
                writeln!(w, "(none)")
            } else {
                write_ticket_rows(w, t)
            }
        },
    )
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn text_or_dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// One tab-separated row per ticket: id, client, assignee, status, value,
/// device.
pub(crate) fn write_ticket_rows(w: &mut dyn Write, tickets: &[Ticket]) -> io::Result<()> {
    for t in tickets {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}",
            t.id,
            t.client_id,
            t.technician_id.map_or_else(|| "-".to_string(), |id| id.to_string()),
            t.status,
            money::display(t.value),
            t.device
        )?;
    }
    Ok(())
}

fn write_ticket_fields(w: &mut dyn Write, t: &Ticket) -> io::Result<()> {
    pretty_kv(w, "Status", t.status.as_str())?;
    pretty_kv(w, "Device", &t.device)?;
    pretty_kv(w, "Description", &t.description)?;
    pretty_kv(
        w,
        "Assignee",
        t.technician_id.map_or_else(|| "-".to_string(), |id| format!("#{id}")),
    )?;
    pretty_kv(w, "Value", money::display(t.value))?;
    pretty_kv(w, "Opened", format_timestamp(t.opened_at))?;
    pretty_kv(
        w,
        "Expected",
        t.expected_on
            .map_or_else(|| "-".to_string(), |d| d.format("%Y-%m-%d").to_string()),
    )?;
    pretty_kv(
        w,
        "Completed",
        t.completed_at.map_or_else(|| "-".to_string(), format_timestamp),
    )?;
    pretty_kv(w, "Note", text_or_dash(t.note.as_deref()))
}

fn write_detail_text(d: &TicketDetail, w: &mut dyn Write) -> io::Result<()> {
    write_ticket_rows(w, std::slice::from_ref(&d.ticket))?;
    for item in &d.items {
        writeln!(
            w,
            "item\t{}\t{}\t{}\t{}",
            item.id,
            item.quantity,
            money::display(item.unit_price),
            item.description
        )?;
    }
    Ok(())
}

fn write_detail_pretty(d: &TicketDetail, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, &format!("Ticket #{}", d.ticket.id))?;
    pretty_kv(w, "Client", format!("#{} {} ({})", d.client.id, d.client.name, d.client.phone))?;
    write_ticket_fields(w, &d.ticket)?;
    writeln!(w)?;
    pretty_section(w, "Items")?;
    if d.items.is_empty() {
        return writeln!(w, "(none)");
    }
    for item in &d.items {
        writeln!(
            w,
            "#{:<5} {:>3} x {:>10}  = {:>10}  {}",
            item.id,
            item.quantity,
            money::display(item.unit_price),
            money::display(item.total()),
            item.description
        )?;
    }
    pretty_rule(w)?;
    pretty_kv(w, "Total", money::display(d.ticket.value))
}

fn write_audit_rows(w: &mut dyn Write, records: &[AuditRecord]) -> io::Result<()> {
    for r in records {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}",
            format_timestamp(r.changed_at),
            r.technician_id.map_or_else(|| "-".to_string(), |id| id.to_string()),
            r.field,
            text_or_dash(r.old_value.as_deref()),
            text_or_dash(r.new_value.as_deref())
        )?;
    }
    Ok(())
}

fn write_outcome_text(o: &UpdateOutcome, w: &mut dyn Write) -> io::Result<()> {
    if o.is_noop() {
        return writeln!(w, "unchanged\t{}", o.ticket.id);
    }
    write_audit_rows(w, &o.changes)?;
    if let Some(entry) = &o.ledger_entry {
        writeln!(w, "ledger\t{}\t{}", entry.id, money::display(entry.amount))?;
    }
    Ok(())
}

fn write_outcome_pretty(o: &UpdateOutcome, w: &mut dyn Write) -> io::Result<()> {
    if o.is_noop() {
        return writeln!(w, "Ticket #{} unchanged.", o.ticket.id);
    }
    writeln!(w, "✓ Updated ticket #{}", o.ticket.id)?;
    for change in &o.changes {
        writeln!(
            w,
            "  {}: {} → {}",
            change.field,
            text_or_dash(change.old_value.as_deref()),
            text_or_dash(change.new_value.as_deref())
        )?;
    }
    if let Some(entry) = &o.ledger_entry {
        writeln!(
            w,
            "  ledger: entry #{} {} {} on {}",
            entry.id,
            entry.kind,
            money::display(entry.amount),
            entry.posted_on
        )?;
    }
    Ok(())
}
