//! Clients and technicians: the parties a ticket points at.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::role::Role;
use super::{ClientId, TechnicianId};
use crate::error::{EngineError, Result};

pub const MIN_PHONE_LEN: usize = 8;
pub const MAX_PHONE_LEN: usize = 20;
pub const MAX_NAME_LEN: usize = 100;
pub const MAX_USERNAME_LEN: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub phone: String,
    pub name: String,
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewClient {
    pub phone: String,
    pub name: String,
    pub address: Option<String>,
}

impl NewClient {
    /// # Errors
    ///
    /// Returns [`EngineError::Invalid`] for a malformed phone or name.
    pub fn validate(&self) -> Result<()> {
        let phone_len = self.phone.trim().chars().count();
        if !(MIN_PHONE_LEN..=MAX_PHONE_LEN).contains(&phone_len) {
            return Err(EngineError::invalid(
                "phone",
                format!("must be {MIN_PHONE_LEN}-{MAX_PHONE_LEN} characters"),
            ));
        }
        validate_name(&self.name)
    }
}

/// A staff member. Never owned by a ticket; tickets only point at one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Technician {
    pub id: TechnicianId,
    pub username: String,
    pub name: String,
    pub role: Role,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTechnician {
    pub username: String,
    pub name: String,
    pub password: String,
    pub role: Role,
}

impl NewTechnician {
    /// # Errors
    ///
    /// Returns [`EngineError::Invalid`] for a malformed username, name or an
    /// empty password.
    pub fn validate(&self) -> Result<()> {
        let username = self.username.trim();
        if username.is_empty() || username.chars().count() > MAX_USERNAME_LEN {
            return Err(EngineError::invalid(
                "username",
                format!("must be 1-{MAX_USERNAME_LEN} characters"),
            ));
        }
        if username.chars().any(char::is_whitespace) {
            return Err(EngineError::invalid("username", "must not contain whitespace"));
        }
        if self.password.is_empty() {
            return Err(EngineError::invalid("password", "must not be empty"));
        }
        validate_name(&self.name)
    }
}

fn validate_name(name: &str) -> Result<()> {
    let len = name.trim().chars().count();
    if !(2..=MAX_NAME_LEN).contains(&len) {
        return Err(EngineError::invalid(
            "name",
            format!("must be 2-{MAX_NAME_LEN} characters"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_phone_length_is_bounded() {
        let mut client = NewClient {
            phone: "1199".into(),
            name: "Maria Silva".into(),
            address: None,
        };
        assert!(client.validate().is_err());
        client.phone = "11999887766".into();
        assert!(client.validate().is_ok());
    }

    #[test]
    fn technician_username_rejects_spaces() {
        let tech = NewTechnician {
            username: "joao silva".into(),
            name: "João".into(),
            password: "secret".into(),
            role: Role::Employee,
        };
        assert!(tech.validate().is_err());
    }
}
