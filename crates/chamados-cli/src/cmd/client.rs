//! `chm client` — register, remove and inspect clients.

use super::ticket::write_ticket_rows;
use super::{Context, GlobalArgs};
use crate::output::{OutputMode, pretty_kv, pretty_section, render, render_mode};
use anyhow::Result;
use chamados_core::model::ClientId;
use chamados_core::model::party::NewClient;
use clap::{Args, Subcommand};
use serde::Serialize;
use std::path::Path;

#[derive(Args, Debug)]
pub struct ClientArgs {
    #[command(subcommand)]
    pub command: ClientCommand,
}

#[derive(Subcommand, Debug)]
pub enum ClientCommand {
    /// Register a client.
    Add(ClientAddArgs),
    /// Remove a client with all of its tickets.
    Rm {
        /// Client id.
        id: ClientId,
    },
    /// List a client's tickets, newest first.
    Tickets {
        /// Client id.
        id: ClientId,
    },
}

#[derive(Args, Debug)]
pub struct ClientAddArgs {
    /// Contact phone; must be unique across clients.
    #[arg(long)]
    pub phone: String,

    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub address: Option<String>,
}

#[derive(Debug, Serialize)]
struct Removed {
    id: ClientId,
    removed: bool,
}

/// # Errors
///
/// Returns an error if the store cannot be opened or the operation fails.
pub fn run_client(
    args: &ClientArgs,
    globals: &GlobalArgs,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let mut ctx = Context::open(globals, project_root)?;
    match &args.command {
        ClientCommand::Add(add) => {
            let client = ctx.lifecycle().register_client(&NewClient {
                phone: add.phone.clone(),
                name: add.name.clone(),
                address: add.address.clone(),
            })?;
            render_mode(
                output,
                &client,
                |c, w| writeln!(w, "{}\t{}\t{}", c.id, c.phone, c.name),
                |c, w| {
                    writeln!(w, "✓ Registered client #{}", c.id)?;
                    pretty_kv(w, "Name", &c.name)?;
                    pretty_kv(w, "Phone", &c.phone)?;
                    pretty_kv(w, "Address", c.address.as_deref().unwrap_or("-"))
                },
            )
        }
        ClientCommand::Rm { id } => {
            ctx.lifecycle().remove_client(*id)?;
            let removed = Removed {
                id: *id,
                removed: true,
            };
            render(output, &removed, |r, w| writeln!(w, "✓ Removed client #{}", r.id))
        }
        ClientCommand::Tickets { id } => {
            let tickets = ctx.lifecycle().tickets_for_client(*id)?;
            render_mode(
                output,
                &tickets,
                |t, w| write_ticket_rows(w, t),
                |t, w| {
                    pretty_section(w, &format!("Tickets of client #{id}"))?;
                    if t.is_empty() {
                        writeln!(w, "(none)")
                    } else {
                        write_ticket_rows(w, t)
                    }
                },
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: ClientArgs,
    }

    #[test]
    fn add_parses_optional_address() {
        let w = Wrapper::parse_from([
            "test", "add", "--phone", "11987654321", "--name", "Marina Costa",
        ]);
        match w.args.command {
            ClientCommand::Add(add) => {
                assert_eq!(add.phone, "11987654321");
                assert_eq!(add.address, None);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rm_and_tickets_take_ids() {
        let w = Wrapper::parse_from(["test", "rm", "4"]);
        assert!(matches!(w.args.command, ClientCommand::Rm { id: 4 }));
        let w = Wrapper::parse_from(["test", "tickets", "9"]);
        assert!(matches!(w.args.command, ClientCommand::Tickets { id: 9 }));
    }
}
