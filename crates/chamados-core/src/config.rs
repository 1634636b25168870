use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ledger::{DEFAULT_DESCRIPTION_PREFIX, LedgerPoster};

/// Directory under the working directory holding the store and its config.
pub const STORE_DIR: &str = ".chamados";

/// Per-store settings, read from `.chamados/config.toml` or `--config`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_description_prefix")]
    pub description_prefix: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            description_prefix: default_description_prefix(),
        }
    }
}

impl Config {
    #[must_use]
    pub const fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.store.busy_timeout_ms)
    }

    #[must_use]
    pub fn ledger_poster(&self) -> LedgerPoster {
        LedgerPoster::new(self.ledger.description_prefix.clone())
    }
}

/// Per-user defaults from `$XDG_CONFIG_HOME/chamados/config.toml`: the
/// actor to act as when neither flags nor environment name one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub actor_id: Option<i64>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub project: Config,
    pub user: UserConfig,
    /// Absolute store path after flag and environment overrides.
    pub store_path: PathBuf,
}

/// Read and parse one config file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid TOML.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<Config>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// `.chamados/config.toml` under `project_root`, or defaults when absent.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<Config> {
    let path = project_root.join(STORE_DIR).join("config.toml");
    if !path.exists() {
        return Ok(Config::default());
    }
    load_config(&path)
}

/// # Errors
///
/// Returns an error if the user config exists but cannot be read or parsed.
pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("chamados/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Resolve the configuration for a command run in `project_root`.
///
/// Config file precedence: `explicit` path, then the project file, then
/// defaults. Store path precedence: `db_flag`, then `CHAMADOS_DB`, then the
/// config value. Relative store paths are taken from `project_root`.
///
/// # Errors
///
/// Returns an error if any config file that should be read fails to load.
pub fn resolve_config(
    project_root: &Path,
    explicit: Option<&Path>,
    db_flag: Option<&Path>,
) -> Result<EffectiveConfig> {
    let project = match explicit {
        Some(path) => load_config(path)?,
        None => load_project_config(project_root)?,
    };
    let user = load_user_config()?;
    let env_db = env::var("CHAMADOS_DB").ok().filter(|v| !v.is_empty());
    let store_path =
        resolve_store_path(project_root, db_flag, env_db.as_deref(), &project.store.path);

    Ok(EffectiveConfig {
        project,
        user,
        store_path,
    })
}

fn resolve_store_path(
    project_root: &Path,
    db_flag: Option<&Path>,
    env_db: Option<&str>,
    configured: &Path,
) -> PathBuf {
    let chosen = db_flag
        .map(Path::to_path_buf)
        .or_else(|| env_db.map(PathBuf::from))
        .unwrap_or_else(|| configured.to_path_buf());
    if chosen.is_absolute() {
        chosen
    } else {
        project_root.join(chosen)
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from(STORE_DIR).join("chamados.sqlite3")
}

const fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_description_prefix() -> String {
    DEFAULT_DESCRIPTION_PREFIX.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_project_config_uses_defaults() {
        let root = tempfile::tempdir().expect("temp dir");
        let cfg = load_project_config(root.path()).expect("load should succeed");
        assert_eq!(cfg.store.path, PathBuf::from(".chamados/chamados.sqlite3"));
        assert_eq!(cfg.busy_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.ledger.description_prefix, "Ticket");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let root = tempfile::tempdir().expect("temp dir");
        let dir = root.path().join(STORE_DIR);
        std::fs::create_dir_all(&dir).expect("create dir");
        std::fs::write(
            dir.join("config.toml"),
            "[ledger]\ndescription_prefix = \"Chamado\"\n",
        )
        .expect("write config");

        let cfg = load_project_config(root.path()).expect("load");
        assert_eq!(cfg.ledger.description_prefix, "Chamado");
        assert_eq!(cfg.store.busy_timeout_ms, 5_000);
        assert_eq!(
            cfg.ledger_poster(),
            LedgerPoster::new("Chamado")
        );
    }

    #[test]
    fn malformed_file_reports_path() {
        let root = tempfile::tempdir().expect("temp dir");
        let path = root.path().join("broken.toml");
        std::fs::write(&path, "[store\npath = 1").expect("write");
        let err = load_config(&path).expect_err("invalid toml");
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn db_flag_beats_env_and_config() {
        let root = Path::new("/srv/shop");
        let path = resolve_store_path(
            root,
            Some(Path::new("/tmp/flag.sqlite3")),
            Some("env.sqlite3"),
            Path::new("cfg.sqlite3"),
        );
        assert_eq!(path, PathBuf::from("/tmp/flag.sqlite3"));
    }

    #[test]
    fn env_beats_config_and_relative_paths_join_root() {
        let root = Path::new("/srv/shop");
        let path = resolve_store_path(root, None, Some("env.sqlite3"), Path::new("cfg.sqlite3"));
        assert_eq!(path, PathBuf::from("/srv/shop/env.sqlite3"));

        let path = resolve_store_path(root, None, None, Path::new("cfg.sqlite3"));
        assert_eq!(path, PathBuf::from("/srv/shop/cfg.sqlite3"));
    }

    #[test]
    fn user_config_parses_actor_defaults() {
        let cfg: UserConfig = toml::from_str("actor_id = 3\nrole = \"gerente\"\n").expect("parse");
        assert_eq!(cfg.actor_id, Some(3));
        assert_eq!(cfg.role.as_deref(), Some("gerente"));
    }
}
