//! Role-scoped access checks.
//!
//! Pure functions over `(role, identity)` pairs. Nothing here touches the
//! store, so callers can evaluate access before loading anything else.

use crate::error::{EngineError, Result};
use crate::model::TechnicianId;
use crate::model::role::{Actor, Role};

/// Whether an actor may read or modify a ticket owned by `owner`.
///
/// Administrators and managers see everything. Employees see only tickets
/// assigned to them; unassigned tickets are invisible to them.
#[must_use]
pub const fn can_access(role: Role, actor_id: TechnicianId, owner: Option<TechnicianId>) -> bool {
    match role {
        Role::Administrator | Role::Manager => true,
        Role::Employee => match owner {
            Some(owner) => owner == actor_id,
            None => false,
        },
    }
}

/// [`can_access`] as a `Forbidden` error.
///
/// # Errors
///
/// Returns [`EngineError::Forbidden`] when access is denied.
pub fn ensure_ticket_access(actor: Actor, owner: Option<TechnicianId>) -> Result<()> {
    if can_access(actor.role, actor.id, owner) {
        return Ok(());
    }
    let reason = match owner {
        Some(owner) => format!(
            "technician {} ({}) cannot access a ticket assigned to technician {owner}",
            actor.id, actor.role
        ),
        None => format!(
            "technician {} ({}) cannot access an unassigned ticket",
            actor.id, actor.role
        ),
    };
    Err(EngineError::forbidden(reason))
}

/// Whether `manager` may create or modify accounts holding `target`.
///
/// Administrators manage every role, managers manage managers and
/// employees, employees manage nobody.
#[must_use]
pub const fn can_manage(manager: Role, target: Role) -> bool {
    match manager {
        Role::Administrator => true,
        Role::Manager => matches!(target, Role::Manager | Role::Employee),
        Role::Employee => false,
    }
}

/// [`can_manage`] as a `Forbidden` error.
///
/// # Errors
///
/// Returns [`EngineError::Forbidden`] when the actor may not manage `target`.
pub fn ensure_can_manage(actor: Actor, target: Role) -> Result<()> {
    if can_manage(actor.role, target) {
        Ok(())
    } else {
        Err(EngineError::forbidden(format!(
            "{} accounts cannot manage {target} accounts",
            actor.role
        )))
    }
}

/// Whether the role may view the cash ledger and shop-wide reports.
#[must_use]
pub const fn can_view_finances(role: Role) -> bool {
    matches!(role, Role::Administrator | Role::Manager)
}

/// [`can_view_finances`] as a `Forbidden` error.
///
/// # Errors
///
/// Returns [`EngineError::Forbidden`] for employees.
pub fn ensure_can_view_finances(actor: Actor) -> Result<()> {
    if can_view_finances(actor.role) {
        Ok(())
    } else {
        Err(EngineError::forbidden(
            "only administrators and managers may view the ledger",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn admins_and_managers_access_everything() {
        for role in [Role::Administrator, Role::Manager] {
            assert!(can_access(role, 1, Some(2)));
            assert!(can_access(role, 1, None));
        }
    }

    #[test]
    fn employee_only_accesses_own_tickets() {
        assert!(!can_access(Role::Employee, 7, Some(9)));
        assert!(can_access(Role::Employee, 7, Some(7)));
    }

    #[test]
    fn employee_cannot_access_unassigned_ticket() {
        assert!(!can_access(Role::Employee, 7, None));
        let err = ensure_ticket_access(Actor::new(7, Role::Employee), None)
            .expect_err("unassigned ticket is hidden");
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        assert!(err.to_string().contains("unassigned"));
    }

    #[test]
    fn management_matrix() {
        use Role::{Administrator, Employee, Manager};
        let expected = [
            (Administrator, Administrator, true),
            (Administrator, Manager, true),
            (Administrator, Employee, true),
            (Manager, Administrator, false),
            (Manager, Manager, true),
            (Manager, Employee, true),
            (Employee, Administrator, false),
            (Employee, Manager, false),
            (Employee, Employee, false),
        ];
        for (manager, target, allowed) in expected {
            assert_eq!(can_manage(manager, target), allowed, "{manager} -> {target}");
        }
    }

    #[test]
    fn ensure_can_manage_reports_forbidden() {
        let err = ensure_can_manage(Actor::new(3, Role::Manager), Role::Administrator)
            .expect_err("managers cannot create admins");
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[test]
    fn finances_are_staff_only() {
        assert!(can_view_finances(Role::Manager));
        assert!(!can_view_finances(Role::Employee));
    }
}
