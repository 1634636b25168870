//! `chm ledger` — cash ledger listing and period totals.
//!
//! Restricted to administrators and managers.

use super::{Context, GlobalArgs};
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};
use anyhow::Result;
use chamados_core::authz;
use chamados_core::db::query::LedgerFilter;
use chamados_core::ledger::{self, LedgerSummary};
use chamados_core::model::ledger::{LedgerEntry, LedgerKind};
use chamados_core::model::money;
use clap::{Args, Subcommand};
use std::io::{self, Write};
use std::path::Path;

#[derive(Args, Debug)]
pub struct LedgerArgs {
    #[command(subcommand)]
    pub command: LedgerCommand,
}

#[derive(Subcommand, Debug)]
pub enum LedgerCommand {
    /// List entries, newest posting first.
    List {
        #[command(flatten)]
        period: PeriodArgs,

        /// inflow or outflow.
        #[arg(long)]
        kind: Option<LedgerKind>,
    },
    /// Inflow, outflow and balance over a period.
    Summary {
        #[command(flatten)]
        period: PeriodArgs,
    },
}

#[derive(Args, Debug, Clone, Copy, Default)]
pub struct PeriodArgs {
    /// Month of posting (1-12).
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
    pub month: Option<u32>,

    /// Year of posting.
    #[arg(long)]
    pub year: Option<i32>,
}

impl PeriodArgs {
    const fn filter(self, kind: Option<LedgerKind>) -> LedgerFilter {
        LedgerFilter {
            month: self.month,
            year: self.year,
            kind,
        }
    }

    fn label(self) -> String {
        match (self.month, self.year) {
            (Some(m), Some(y)) => format!("{y}-{m:02}"),
            (Some(m), None) => format!("month {m:02}, all years"),
            (None, Some(y)) => format!("{y}"),
            (None, None) => "all time".to_string(),
        }
    }
}

/// # Errors
///
/// Returns an error if the actor may not view finances or a query fails.
pub fn run_ledger(
    args: &LedgerArgs,
    globals: &GlobalArgs,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let ctx = Context::open(globals, project_root)?;
    let actor = ctx.actor()?;
    authz::ensure_can_view_finances(actor)?;

    match args.command {
        LedgerCommand::List { period, kind } => {
            let entries = ledger::list_entries(ctx.conn(), &period.filter(kind))?;
            render_mode(
                output,
                &entries,
                |e, w| write_entry_rows(w, e),
                |e, w| {
                    pretty_section(w, &format!("Ledger ({})", period.label()))?;
                    if e.is_empty() {
                        writeln!(w, "(no entries)")
                    } else {
                        write_entry_rows(w, e)
                    }
                },
            )
        }
        LedgerCommand::Summary { period } => {
            let summary = ledger::summary(ctx.conn(), &period.filter(None))?;
            render_mode(
                output,
                &summary,
                |s, w| {
                    writeln!(
                        w,
                        "{}\t{}\t{}",
                        money::display(s.total_inflow),
                        money::display(s.total_outflow),
                        money::display(s.balance)
                    )
                },
                |s, w| write_summary_pretty(w, &period.label(), s),
            )
        }
    }
}

fn write_entry_rows(w: &mut dyn Write, entries: &[LedgerEntry]) -> io::Result<()> {
    for e in entries {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}",
            e.id,
            e.posted_on,
            e.kind,
            money::display(e.amount),
            if e.settled { "settled" } else { "pending" },
            e.description
        )?;
    }
    Ok(())
}

fn write_summary_pretty(w: &mut dyn Write, label: &str, s: &LedgerSummary) -> io::Result<()> {
    pretty_section(w, &format!("Ledger summary ({label})"))?;
    pretty_kv(w, "Inflow", money::display(s.total_inflow))?;
    pretty_kv(w, "Outflow", money::display(s.total_outflow))?;
    pretty_kv(w, "Balance", money::display(s.balance))
}
