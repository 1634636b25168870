//! `chm tech` — manage technician accounts.
//!
//! On an empty store `tech add` runs without an actor and creates the first
//! account. Every later account is created on behalf of an actor allowed to
//! manage the new role.

use super::{Context, GlobalArgs};
use crate::output::{OutputMode, pretty_kv, render_mode};
use anyhow::Result;
use chamados_core::model::TechnicianId;
use chamados_core::model::party::{NewTechnician, Technician};
use chamados_core::model::role::Role;
use clap::{Args, Subcommand};
use std::io::{self, Write};
use std::path::Path;

#[derive(Args, Debug)]
pub struct TechArgs {
    #[command(subcommand)]
    pub command: TechCommand,
}

#[derive(Subcommand, Debug)]
pub enum TechCommand {
    /// Register a technician.
    Add(TechAddArgs),
    /// Block a technician from acting on the store.
    Deactivate {
        /// Technician id.
        id: TechnicianId,
    },
    /// Restore a deactivated technician.
    Activate {
        /// Technician id.
        id: TechnicianId,
    },
}

#[derive(Args, Debug)]
pub struct TechAddArgs {
    #[arg(long)]
    pub username: String,

    #[arg(long)]
    pub name: String,

    /// Stored as a SHA-256 digest.
    #[arg(long)]
    pub password: String,

    /// administrator, manager or employee (Portuguese names accepted).
    #[arg(long, default_value = "employee")]
    pub role: Role,
}

/// # Errors
///
/// Returns an error if the store cannot be opened, the actor cannot be
/// resolved, or the operation fails.
pub fn run_tech(
    args: &TechArgs,
    globals: &GlobalArgs,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let mut ctx = Context::open(globals, project_root)?;
    let technician = match &args.command {
        TechCommand::Add(add) => {
            let new = NewTechnician {
                username: add.username.clone(),
                name: add.name.clone(),
                password: add.password.clone(),
                role: add.role,
            };
            if ctx.has_claim() {
                let actor = ctx.actor()?;
                ctx.lifecycle().register_technician(actor, &new)?
            } else {
                ctx.lifecycle().bootstrap_technician(&new)?
            }
        }
        TechCommand::Deactivate { id } => {
            let actor = ctx.actor()?;
            ctx.lifecycle().set_technician_active(actor, *id, false)?
        }
        TechCommand::Activate { id } => {
            let actor = ctx.actor()?;
            ctx.lifecycle().set_technician_active(actor, *id, true)?
        }
    };
    render_mode(output, &technician, write_tech_row, write_tech_pretty)
}

fn write_tech_row(t: &Technician, w: &mut dyn Write) -> io::Result<()> {
    writeln!(
        w,
        "{}\t{}\t{}\t{}\t{}",
        t.id,
        t.username,
        t.name,
        t.role,
        if t.active { "active" } else { "inactive" }
    )
}

fn write_tech_pretty(t: &Technician, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "Technician #{}", t.id)?;
    pretty_kv(w, "Username", &t.username)?;
    pretty_kv(w, "Name", &t.name)?;
    pretty_kv(w, "Role", t.role.as_str())?;
    pretty_kv(w, "Active", if t.active { "yes" } else { "no" })
}
