//! `chm stats` — shop-wide ticket counts and money totals.

use super::{Context, GlobalArgs};
use crate::output::{OutputMode, pretty_kv, pretty_rule, pretty_section, render_mode};
use anyhow::Result;
use chamados_core::authz;
use chamados_core::model::money;
use chamados_core::stats::{self, TicketStatistics};
use chrono::{Local, NaiveDate};
use clap::Args;
use std::io::{self, Write};
use std::path::Path;

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Reference date for "received this month" (YYYY-MM-DD). Defaults to
    /// today in local time.
    #[arg(long)]
    pub today: Option<NaiveDate>,
}

/// # Errors
///
/// Returns an error if the actor may not view finances or a query fails.
pub fn run_stats(
    args: &StatsArgs,
    globals: &GlobalArgs,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let ctx = Context::open(globals, project_root)?;
    let actor = ctx.actor()?;
    authz::ensure_can_view_finances(actor)?;

    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let statistics = stats::ticket_statistics(ctx.conn(), today)?;
    render_mode(output, &statistics, write_stats_text, write_stats_pretty)
}

fn write_stats_text(s: &TicketStatistics, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "open\t{}", s.total_open)?;
    writeln!(w, "in_progress\t{}", s.total_in_progress)?;
    writeln!(w, "completed\t{}", s.total_completed)?;
    writeln!(w, "canceled\t{}", s.total_canceled)?;
    writeln!(w, "open_value\t{}", money::display(s.open_value))?;
    writeln!(w, "received_this_month\t{}", money::display(s.received_this_month))?;
    for (client, count) in &s.tickets_by_client {
        writeln!(w, "client\t{count}\t{client}")?;
    }
    Ok(())
}

fn write_stats_pretty(s: &TicketStatistics, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, "Tickets")?;
    pretty_kv(w, "Open", s.total_open.to_string())?;
    pretty_kv(w, "In progress", s.total_in_progress.to_string())?;
    pretty_kv(w, "Completed", s.total_completed.to_string())?;
    pretty_kv(w, "Canceled", s.total_canceled.to_string())?;
    writeln!(w)?;
    pretty_section(w, "Money")?;
    pretty_kv(w, "In progress", money::display(s.open_value))?;
    pretty_kv(w, "Received", money::display(s.received_this_month))?;
    writeln!(w)?;
    pretty_section(w, "By client")?;
    for (client, count) in &s.tickets_by_client {
        writeln!(w, "{count:>5}  {client}")?;
    }
    pretty_rule(w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use rust_decimal::Decimal;
    use std::collections::BTreeMap;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: StatsArgs,
    }

    #[test]
    fn today_is_optional() {
        assert_eq!(Wrapper::parse_from(["test"]).args.today, None);
        let w = Wrapper::parse_from(["test", "--today", "2024-07-31"]);
        assert_eq!(w.args.today, NaiveDate::from_ymd_opt(2024, 7, 31));
    }

    #[test]
    fn text_lists_clients_after_totals() {
        let s = TicketStatistics {
            total_open: 2,
            total_in_progress: 1,
            total_completed: 0,
            total_canceled: 0,
            open_value: Decimal::new(9100, 2),
            received_this_month: Decimal::ZERO,
            tickets_by_client: BTreeMap::from([("Marina Costa".to_string(), 3)]),
        };
        let mut buf = Vec::new();
        write_stats_text(&s, &mut buf).expect("write");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.starts_with("open\t2\n"));
        assert!(text.contains("open_value\t91.00\n"));
        assert!(text.ends_with("client\t3\tMarina Costa\n"));
    }
}
