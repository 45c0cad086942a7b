//! Permission checking for servdesk.
//!
//! Role-based access rules shared by the service-order and user endpoints.

use thiserror::Error;

use crate::db::Role;

/// Permission-related errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PermissionError {
    /// The operation is reserved for staff.
    #[error("staff access required")]
    StaffRequired,

    /// The resource belongs to another user.
    #[error("you do not have permission to access this resource")]
    NotOwner,

    /// Only staff may change roles or activation.
    #[error("only staff can change role or active status")]
    PrivilegeChange,
}

/// The authenticated caller of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    /// User ID of the caller.
    pub id: i64,
    /// Role of the caller.
    pub role: Role,
}

impl Actor {
    /// Create a new actor.
    pub fn new(id: i64, role: Role) -> Self {
        Self { id, role }
    }

    /// Whether the actor is staff.
    pub fn is_staff(&self) -> bool {
        self.role == Role::Staff
    }

    /// Require staff role.
    ///
    /// # Examples
    ///
    /// ```
    /// use servdesk::auth::{Actor, PermissionError};
    /// use servdesk::db::Role;
    ///
    /// assert!(Actor::new(1, Role::Staff).require_staff().is_ok());
    /// assert_eq!(
    ///     Actor::new(2, Role::Member).require_staff(),
    ///     Err(PermissionError::StaffRequired)
    /// );
    /// ```
    pub fn require_staff(&self) -> Result<(), PermissionError> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(PermissionError::StaffRequired)
        }
    }

    /// Check access to a resource owned by `owner_id`.
    ///
    /// Staff may access everything; members only their own resources.
    pub fn can_access(&self, owner_id: i64) -> Result<(), PermissionError> {
        if self.is_staff() || self.id == owner_id {
            Ok(())
        } else {
            Err(PermissionError::NotOwner)
        }
    }

    /// Check whether the actor may change role or activation of an account.
    pub fn can_change_privileges(&self) -> Result<(), PermissionError> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(PermissionError::PrivilegeChange)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_staff() {
        assert!(Actor::new(1, Role::Staff).require_staff().is_ok());
        assert_eq!(
            Actor::new(1, Role::Member).require_staff(),
            Err(PermissionError::StaffRequired)
        );
    }

    #[test]
    fn test_member_accesses_only_own_resources() {
        let member = Actor::new(5, Role::Member);
        assert!(member.can_access(5).is_ok());
        assert_eq!(member.can_access(6), Err(PermissionError::NotOwner));
    }

    #[test]
    fn test_staff_accesses_everything() {
        let staff = Actor::new(1, Role::Staff);
        assert!(staff.can_access(1).is_ok());
        assert!(staff.can_access(42).is_ok());
    }

    #[test]
    fn test_privilege_change() {
        assert!(Actor::new(1, Role::Staff).can_change_privileges().is_ok());
        assert_eq!(
            Actor::new(2, Role::Member).can_change_privileges(),
            Err(PermissionError::PrivilegeChange)
        );
    }

    #[test]
    fn test_permission_error_display() {
        assert_eq!(
            PermissionError::StaffRequired.to_string(),
            "staff access required"
        );
    }
}
