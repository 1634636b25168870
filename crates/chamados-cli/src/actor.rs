//! Actor identity resolution for CLI commands.
//!
//! The resolution chain for the technician id: `--actor-id` flag >
//! `CHAMADOS_ACTOR_ID` env > `actor_id` in the user config. A role claimed
//! through `--actor-role`, `CHAMADOS_ROLE` or the user config is checked against
//! the stored technician; the store is authoritative.
//!
//! Commands acting on tickets, items or staff require an actor; client
//! registration and ticket creation do not.

use chamados_core::config::UserConfig;
use chamados_core::db::query;
use chamados_core::model::TechnicianId;
use chamados_core::model::role::{Actor, Role};
use rusqlite::Connection;
use std::env;

/// Errors from actor resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorResolutionError {
    pub message: String,
    /// Machine error code.
    pub code: &'static str,
}

impl ActorResolutionError {
    fn new(message: impl Into<String>, code: &'static str) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }
}

impl std::fmt::Display for ActorResolutionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ActorResolutionError {}

/// Who the caller says they are, before checking the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorClaim {
    pub id: TechnicianId,
    pub role: Option<Role>,
}

/// Environment reader trait for dependency injection in tests.
trait EnvReader {
    fn get(&self, key: &str) -> Option<String>;
}

struct RealEnv;

impl EnvReader for RealEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.is_empty())
    }
}

fn resolve_claim_with(
    id_flag: Option<TechnicianId>,
    role_flag: Option<Role>,
    env: &dyn EnvReader,
    user: &UserConfig,
) -> Result<Option<ActorClaim>, ActorResolutionError> {
    let id = match id_flag {
        Some(id) => Some(id),
        None => match env.get("CHAMADOS_ACTOR_ID") {
            Some(raw) => Some(raw.trim().parse::<TechnicianId>().map_err(|_| {
                ActorResolutionError::new(
                    format!("CHAMADOS_ACTOR_ID must be a technician id, got '{raw}'"),
                    "invalid_actor_id",
                )
            })?),
            None => user.actor_id,
        },
    };
    let Some(id) = id else {
        return Ok(None);
    };

    let role = match role_flag {
        Some(role) => Some(role),
        None => env
            .get("CHAMADOS_ROLE")
            .or_else(|| user.role.clone())
            .map(|raw| {
                raw.parse::<Role>()
                    .map_err(|e| ActorResolutionError::new(e.to_string(), "invalid_role"))
            })
            .transpose()?,
    };

    Ok(Some(ActorClaim { id, role }))
}

/// Resolve the claimed actor from flags, environment and user config.
///
/// Returns `Ok(None)` when no source names a technician.
///
/// # Errors
///
/// Returns an error when an environment or config value does not parse.
pub fn resolve_claim(
    id_flag: Option<TechnicianId>,
    role_flag: Option<Role>,
    user: &UserConfig,
) -> Result<Option<ActorClaim>, ActorResolutionError> {
    resolve_claim_with(id_flag, role_flag, &RealEnv, user)
}

/// Turn a claim into an [`Actor`] using the stored technician record.
///
/// # Errors
///
/// Returns an error when no actor was named, the id names no technician,
/// the claimed role differs from the stored one, the technician is
/// deactivated, or the lookup fails.
pub fn require_actor(conn: &Connection, claim: Option<ActorClaim>) -> anyhow::Result<Actor> {
    let Some(claim) = claim else {
        return Err(ActorResolutionError::new(
            "An actor is required for this command. \
             Set --actor-id, CHAMADOS_ACTOR_ID, or actor_id in the user config.",
            "missing_actor",
        )
        .into());
    };

    let Some(technician) = query::get_technician(conn, claim.id)? else {
        return Err(ActorResolutionError::new(
            format!("no technician with id {} can act on this store", claim.id),
            "invalid_actor_id",
        )
        .into());
    };
    if let Some(role) = claim.role.filter(|role| *role != technician.role) {
        return Err(ActorResolutionError::new(
            format!(
                "technician {} is {}, not {role}",
                technician.id, technician.role
            ),
            "role_mismatch",
        )
        .into());
    }
    if !technician.active {
        return Err(ActorResolutionError::new(
            format!("technician {} is deactivated", technician.id),
            "inactive_actor",
        )
        .into());
    }
    tracing::debug!(actor_id = technician.id, role = %technician.role, "actor resolved");
    Ok(Actor::new(technician.id, technician.role))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chamados_core::db;
    use chamados_core::lifecycle::Lifecycle;
    use chamados_core::model::party::NewTechnician;
    use std::collections::HashMap;

    struct MockEnv {
        vars: HashMap<String, String>,
    }

    impl MockEnv {
        fn new() -> Self {
            Self {
                vars: HashMap::new(),
            }
        }

        fn var(mut self, key: &str, val: &str) -> Self {
            self.vars.insert(key.to_string(), val.to_string());
            self
        }
    }

    impl EnvReader for MockEnv {
        fn get(&self, key: &str) -> Option<String> {
            self.vars.get(key).filter(|v| !v.is_empty()).cloned()
        }
    }

    fn user(actor_id: Option<i64>, role: Option<&str>) -> UserConfig {
        UserConfig {
            actor_id,
            role: role.map(str::to_string),
        }
    }

    #[test]
    fn flag_takes_priority() {
        let env = MockEnv::new()
            .var("CHAMADOS_ACTOR_ID", "5")
            .var("CHAMADOS_ROLE", "gerente");
        let claim = resolve_claim_with(Some(3), Some(Role::Employee), &env, &user(Some(9), None))
            .expect("resolves");
        assert_eq!(
            claim,
            Some(ActorClaim {
                id: 3,
                role: Some(Role::Employee)
            })
        );
    }

    #[test]
    fn env_beats_user_config() {
        let env = MockEnv::new().var("CHAMADOS_ACTOR_ID", " 5 ");
        let claim = resolve_claim_with(None, None, &env, &user(Some(9), Some("admin")))
            .expect("resolves")
            .expect("some");
        assert_eq!(claim.id, 5);
        assert_eq!(claim.role, Some(Role::Administrator));
    }

    #[test]
    fn user_config_is_last_resort() {
        let claim = resolve_claim_with(None, None, &MockEnv::new(), &user(Some(9), None))
            .expect("resolves")
            .expect("some");
        assert_eq!(claim, ActorClaim { id: 9, role: None });
    }

    #[test]
    fn nothing_named_is_none() {
        let claim =
            resolve_claim_with(None, Some(Role::Manager), &MockEnv::new(), &user(None, None))
                .expect("resolves");
        assert_eq!(claim, None);
    }

    #[test]
    fn bad_env_values_are_errors() {
        let env = MockEnv::new().var("CHAMADOS_ACTOR_ID", "seven");
        let err = resolve_claim_with(None, None, &env, &UserConfig::default()).expect_err("bad id");
        assert_eq!(err.code, "invalid_actor_id");

        let env = MockEnv::new()
            .var("CHAMADOS_ACTOR_ID", "7")
            .var("CHAMADOS_ROLE", "intern");
        let err =
            resolve_claim_with(None, None, &env, &UserConfig::default()).expect_err("bad role");
        assert_eq!(err.code, "invalid_role");
    }

    fn store_with_employee() -> (rusqlite::Connection, TechnicianId) {
        let mut conn = db::open_in_memory().expect("store");
        let tech = Lifecycle::new(&mut conn)
            .bootstrap_technician(&NewTechnician {
                username: "rafa".into(),
                name: "Rafael Lima".into(),
                password: "s3cret".into(),
                role: Role::Employee,
            })
            .expect("bootstrap");
        (conn, tech.id)
    }

    #[test]
    fn stored_role_is_used_when_none_claimed() {
        let (conn, id) = store_with_employee();
        let actor = require_actor(&conn, Some(ActorClaim { id, role: None })).expect("actor");
        assert_eq!(actor, Actor::new(id, Role::Employee));
    }

    #[test]
    fn claimed_role_must_match_store() {
        let (conn, id) = store_with_employee();
        let err = require_actor(
            &conn,
            Some(ActorClaim {
                id,
                role: Some(Role::Administrator),
            }),
        )
        .expect_err("mismatch");
        let err = err.downcast_ref::<ActorResolutionError>().expect("resolution error");
        assert_eq!(err.code, "role_mismatch");
    }

    #[test]
    fn missing_claim_is_reported() {
        let (conn, _) = store_with_employee();
        let err = require_actor(&conn, None).expect_err("missing");
        let err = err.downcast_ref::<ActorResolutionError>().expect("resolution error");
        assert_eq!(err.code, "missing_actor");
    }

    #[test]
    fn unknown_technician_is_a_resolution_error() {
        let (conn, id) = store_with_employee();
        let err = require_actor(&conn, Some(ActorClaim { id: id + 98, role: None }))
            .expect_err("unknown id");
        let err = err.downcast_ref::<ActorResolutionError>().expect("resolution error");
        assert_eq!(err.code, "invalid_actor_id");
    }

    #[test]
    fn deactivated_technician_cannot_act() {
        let (conn, id) = store_with_employee();
        conn.execute("UPDATE technicians SET active = 0 WHERE technician_id = ?1", [id])
            .expect("deactivate");
        let err = require_actor(&conn, Some(ActorClaim { id, role: None })).expect_err("inactive");
        let err = err.downcast_ref::<ActorResolutionError>().expect("resolution error");
        assert_eq!(err.code, "inactive_actor");
    }
}
