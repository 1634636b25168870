use super::GlobalArgs;
use crate::output::{OutputMode, pretty_kv, render};
use anyhow::{Context as _, Result};
use chamados_core::config::{self, STORE_DIR};
use chamados_core::db::{self, migrations};
use clap::Args;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Rewrite `.chamados/config.toml` even if it already exists. Store
    /// data is kept.
    #[arg(long)]
    pub force: bool,
}

const CONFIG_TOML: &str = "[store]\n\
    path = \".chamados/chamados.sqlite3\"\n\
    busy_timeout_ms = 5000\n\
    \n\
    [ledger]\n\
    description_prefix = \"Ticket\"\n";

const GITIGNORE: &str = "*.sqlite3\n*.sqlite3-wal\n*.sqlite3-shm\n";

#[derive(Debug, Serialize)]
struct InitReport {
    config: PathBuf,
    store: PathBuf,
    schema_version: u32,
}

/// Execute `chm init`. Creates the store skeleton:
///
/// ```text
/// .chamados/
///   config.toml        (default store config)
///   .gitignore         (database files)
///   chamados.sqlite3   (migrated store, unless --db points elsewhere)
/// ```
///
/// # Errors
///
/// Returns an error if `.chamados/config.toml` exists and `--force` is not
/// set, or if any filesystem or store operation fails.
pub fn run_init(
    args: &InitArgs,
    globals: &GlobalArgs,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let store_dir = project_root.join(STORE_DIR);
    let config_path = store_dir.join("config.toml");

    if config_path.exists() && !args.force {
        anyhow::bail!(".chamados/ already exists. Use `chm init --force` to reinitialize.");
    }

    std::fs::create_dir_all(&store_dir)
        .with_context(|| format!("Failed to create {}", store_dir.display()))?;
    std::fs::write(&config_path, CONFIG_TOML)
        .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
    let gitignore_path = store_dir.join(".gitignore");
    std::fs::write(&gitignore_path, GITIGNORE)
        .with_context(|| format!("Failed to write .gitignore: {}", gitignore_path.display()))?;

    let effective =
        config::resolve_config(project_root, globals.config.as_deref(), globals.db.as_deref())?;
    let conn = db::open_store(&effective.store_path, effective.project.busy_timeout())?;
    let schema_version = migrations::current_schema_version(&conn)?;
    tracing::info!(store = %effective.store_path.display(), schema_version, "store initialized");

    let report = InitReport {
        config: config_path,
        store: effective.store_path,
        schema_version,
    };
    render(output, &report, |r, w| {
        writeln!(w, "Initialized chamados store.")?;
        pretty_kv(w, "Config", r.config.display().to_string())?;
        pretty_kv(w, "Store", r.store.display().to_string())?;
        pretty_kv(w, "Schema", r.schema_version.to_string())?;
        writeln!(w)?;
        writeln!(w, "Next steps:")?;
        writeln!(w, "  Create the first administrator:")?;
        writeln!(
            w,
            "    chm tech add --username admin --name \"Shop Owner\" --password ... --role admin"
        )?;
        writeln!(w, "  Then act as it:")?;
        writeln!(w, "    export CHAMADOS_ACTOR_ID=1")
    })
}
