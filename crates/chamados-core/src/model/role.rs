use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::TechnicianId;

/// The three staff roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Administrator,
    Manager,
    Employee,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Administrator => "administrator",
            Self::Manager => "manager",
            Self::Employee => "employee",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a role from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRoleError {
    pub got: String,
}

impl fmt::Display for ParseRoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid role: '{}' (expected administrator, manager or employee)",
            self.got
        )
    }
}

impl std::error::Error for ParseRoleError {}

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "administrator" | "admin" | "administrador" => Ok(Self::Administrator),
            "manager" | "gerente" => Ok(Self::Manager),
            "employee" | "funcionario" | "funcionário" => Ok(Self::Employee),
            _ => Err(ParseRoleError { got: s.to_string() }),
        }
    }
}

/// The already-authenticated identity performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: TechnicianId,
    pub role: Role,
}

impl Actor {
    #[must_use]
    pub const fn new(id: TechnicianId, role: Role) -> Self {
        Self { id, role }
    }
}

#[cfg(test)]
mod tests {
    use super::Role;

    #[test]
    fn parses_english_and_portuguese_names() {
        assert_eq!("Manager".parse::<Role>(), Ok(Role::Manager));
        assert_eq!("gerente".parse::<Role>(), Ok(Role::Manager));
        assert_eq!("ADMINISTRADOR".parse::<Role>(), Ok(Role::Administrator));
        assert_eq!(" funcionario ".parse::<Role>(), Ok(Role::Employee));
    }

    #[test]
    fn rejects_unknown_role() {
        let err = "intern".parse::<Role>().expect_err("unknown role");
        assert!(err.to_string().contains("intern"));
    }

    #[test]
    fn display_round_trips() {
        for role in [Role::Administrator, Role::Manager, Role::Employee] {
            assert_eq!(role.to_string().parse::<Role>(), Ok(role));
        }
    }
}
