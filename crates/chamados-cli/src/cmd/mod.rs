pub mod client;
pub mod init;
pub mod item;
pub mod ledger;
pub mod stats;
pub mod tech;
pub mod ticket;

use crate::actor::{self, ActorClaim};
use anyhow::Result;
use chamados_core::config::{self, EffectiveConfig};
use chamados_core::db;
use chamados_core::lifecycle::Lifecycle;
use chamados_core::model::TechnicianId;
use chamados_core::model::role::{Actor, Role};
use clap::Args;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// Flags shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Read store settings from this file instead of `.chamados/config.toml`.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Store database path (overrides `CHAMADOS_DB` and config).
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Technician acting on the store (overrides `CHAMADOS_ACTOR_ID`).
    #[arg(long, global = true, value_name = "ID")]
    pub actor_id: Option<TechnicianId>,

    /// Role the actor claims; must match the stored technician.
    #[arg(long, global = true, value_name = "ROLE")]
    pub actor_role: Option<Role>,
}

/// An open store plus the identity and settings a command runs with.
pub struct Context {
    conn: Connection,
    config: EffectiveConfig,
    claim: Option<ActorClaim>,
}

impl Context {
    /// Resolve config and actor claim, then open an existing store.
    ///
    /// # Errors
    ///
    /// Returns an error if config or actor values are malformed, the store
    /// has not been initialized, or opening it fails.
    pub fn open(globals: &GlobalArgs, project_root: &Path) -> Result<Self> {
        let config = config::resolve_config(
            project_root,
            globals.config.as_deref(),
            globals.db.as_deref(),
        )?;
        let claim = actor::resolve_claim(globals.actor_id, globals.actor_role, &config.user)?;
        if !config.store_path.exists() {
            anyhow::bail!(
                "store not found at {}. Run `chm init` first.",
                config.store_path.display()
            );
        }
        let conn = db::open_store(&config.store_path, config.project.busy_timeout())?;
        Ok(Self {
            conn,
            config,
            claim,
        })
    }

    /// # Errors
    ///
    /// Returns an error when no actor is named or the stored technician
    /// does not back the claim.
    pub fn actor(&self) -> Result<Actor> {
        actor::require_actor(&self.conn, self.claim)
    }

    pub const fn has_claim(&self) -> bool {
        self.claim.is_some()
    }

    pub const fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn lifecycle(&mut self) -> Lifecycle<'_> {
        let poster = self.config.project.ledger_poster();
        Lifecycle::new(&mut self.conn).with_poster(poster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        globals: GlobalArgs,
    }

    #[test]
    fn globals_parse_role_aliases() {
        let w = Wrapper::parse_from(["test", "--actor-id", "2", "--actor-role", "gerente"]);
        assert_eq!(w.globals.actor_id, Some(2));
        assert_eq!(w.globals.actor_role, Some(Role::Manager));
    }

    #[test]
    fn globals_reject_unknown_role() {
        assert!(Wrapper::try_parse_from(["test", "--actor-role", "intern"]).is_err());
    }

    #[test]
    fn open_requires_initialized_store() {
        let dir = tempfile::tempdir().expect("temp dir");
        let globals = GlobalArgs {
            db: Some(dir.path().join("missing.sqlite3")),
            ..GlobalArgs::default()
        };
        let err = Context::open(&globals, dir.path())
            .err()
            .expect("missing store");
        assert!(err.to_string().contains("chm init"));
    }
}
