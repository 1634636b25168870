//! `chm item` — billable line items on a ticket.

use super::{Context, GlobalArgs};
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};
use anyhow::Result;
use chamados_core::lifecycle::ItemOutcome;
use chamados_core::model::money;
use chamados_core::model::ticket::{LineItem, LineItemPatch, NewLineItem};
use chamados_core::model::{LineItemId, TicketId};
use clap::{Args, Subcommand};
use rust_decimal::Decimal;
use std::io::{self, Write};
use std::path::Path;

#[derive(Args, Debug)]
pub struct ItemArgs {
    #[command(subcommand)]
    pub command: ItemCommand,
}

#[derive(Subcommand, Debug)]
pub enum ItemCommand {
    /// Add a line item to a ticket.
    Add(ItemAddArgs),
    /// Change a line item.
    Update(ItemUpdateArgs),
    /// Remove a line item.
    Rm {
        /// Line item id.
        id: LineItemId,
    },
    /// List a ticket's line items.
    List {
        /// Ticket id.
        ticket: TicketId,
    },
}

#[derive(Args, Debug)]
pub struct ItemAddArgs {
    /// Ticket id.
    pub ticket: TicketId,

    #[arg(long)]
    pub description: String,

    #[arg(long, default_value_t = 1)]
    pub quantity: u32,

    /// Unit price, e.g. 45.90.
    #[arg(long)]
    pub price: Decimal,
}

#[derive(Args, Debug)]
pub struct ItemUpdateArgs {
    /// Line item id.
    pub id: LineItemId,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub quantity: Option<u32>,

    #[arg(long)]
    pub price: Option<Decimal>,
}

/// # Errors
///
/// Returns an error if the store cannot be opened, the actor cannot be
/// resolved, or the item operation is refused.
pub fn run_item(
    args: &ItemArgs,
    globals: &GlobalArgs,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    if matches!(
        &args.command,
        ItemCommand::Update(ItemUpdateArgs {
            description: None,
            quantity: None,
            price: None,
            ..
        })
    ) {
        anyhow::bail!("nothing to update. Pass --description, --quantity or --price.");
    }

    let mut ctx = Context::open(globals, project_root)?;
    let actor = ctx.actor()?;
    let (verb, outcome) = match &args.command {
        ItemCommand::Add(add) => (
            "Added",
            ctx.lifecycle().add_item(
                actor,
                add.ticket,
                &NewLineItem {
                    description: add.description.clone(),
                    quantity: add.quantity,
                    unit_price: add.price,
                },
            )?,
        ),
        ItemCommand::Update(update) => (
            "Updated",
            ctx.lifecycle().update_item(
                actor,
                update.id,
                &LineItemPatch {
                    description: update.description.clone(),
                    quantity: update.quantity,
                    unit_price: update.price,
                },
            )?,
        ),
        ItemCommand::Rm { id } => ("Removed", ctx.lifecycle().remove_item(actor, *id)?),
        ItemCommand::List { ticket } => {
            let items = ctx.lifecycle().list_items(actor, *ticket)?;
            return render_mode(
                output,
                &items,
                |i, w| write_item_rows(w, i),
                |i, w| {
                    pretty_section(w, &format!("Items of ticket #{ticket}"))?;
                    if i.is_empty() {
                        writeln!(w, "(none)")
                    } else {
                        write_item_rows(w, i)
                    }
                },
            );
        }
    };
    render_mode(output, &outcome, write_outcome_text, |o, w| {
        write_outcome_pretty(verb, o, w)
    })
}

fn write_item_rows(w: &mut dyn Write, items: &[LineItem]) -> io::Result<()> {
    for item in items {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}",
            item.id,
            item.ticket_id,
            item.quantity,
            money::display(item.unit_price),
            money::display(item.total()),
            item.description
        )?;
    }
    Ok(())
}

fn write_outcome_text(o: &ItemOutcome, w: &mut dyn Write) -> io::Result<()> {
    write_item_rows(w, std::slice::from_ref(&o.item))?;
    writeln!(w, "value\t{}", money::display(o.ticket_value))
}

fn write_outcome_pretty(verb: &str, o: &ItemOutcome, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "✓ {verb} item #{} on ticket #{}", o.item.id, o.item.ticket_id)?;
    pretty_kv(w, "Item", &o.item.description)?;
    pretty_kv(
        w,
        "Line total",
        format!(
            "{} x {} = {}",
            o.item.quantity,
            money::display(o.item.unit_price),
            money::display(o.item.total())
        ),
    )?;
    let value_line = o.value_change.as_ref().map_or_else(
        || format!("{} (unchanged)", money::display(o.ticket_value)),
        |change| {
            format!(
                "{} → {}",
                change.old_value.as_deref().unwrap_or("-"),
                money::display(o.ticket_value)
            )
        },
    );
    pretty_kv(w, "Ticket value", value_line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::str::FromStr;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: ItemArgs,
    }

    #[test]
    fn add_parses_decimal_price_and_default_quantity() {
        let w = Wrapper::parse_from([
            "test", "add", "3", "--description", "Belt", "--price", "45.90",
        ]);
        match w.args.command {
            ItemCommand::Add(add) => {
                assert_eq!(add.ticket, 3);
                assert_eq!(add.quantity, 1);
                assert_eq!(add.price, Decimal::from_str("45.90").expect("decimal"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn add_rejects_non_numeric_price() {
        let result = Wrapper::try_parse_from([
            "test", "add", "3", "--description", "Belt", "--price", "R$5",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn update_fields_are_optional() {
        let w = Wrapper::parse_from(["test", "update", "12", "--quantity", "4"]);
        match w.args.command {
            ItemCommand::Update(update) => {
                assert_eq!(update.id, 12);
                assert_eq!(update.quantity, Some(4));
                assert_eq!(update.price, None);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rows_show_line_total() {
        let item = LineItem {
            id: 4,
            ticket_id: 2,
            description: "Drive belt".into(),
            quantity: 2,
            unit_price: Decimal::new(4550, 2),
        };
        let mut buf = Vec::new();
        write_item_rows(&mut buf, &[item]).expect("write");
        assert_eq!(
            String::from_utf8(buf).expect("utf8"),
            "4\t2\t2\t45.50\t91.00\tDrive belt\n"
        );
    }
}
