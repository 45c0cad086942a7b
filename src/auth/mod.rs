//! Authentication module for servdesk.
//!
//! Password hashing, permission checks and the start-up staff bootstrap.

mod password;
mod permission;

pub use password::{
    hash_password, validate_password, verify_password, PasswordError, MAX_PASSWORD_LENGTH,
    MIN_PASSWORD_LENGTH,
};
pub use permission::{Actor, PermissionError};

use tracing::info;

use crate::config::AdminConfig;
use crate::db::{NewUser, Role, User, UserRepository};
use crate::{Database, Result, ServdeskError};

/// Create the configured staff account if it does not exist yet.
///
/// Returns the created user, or `None` when nothing was configured or the
/// username is already taken.
pub async fn ensure_admin(db: &Database, admin: &AdminConfig) -> Result<Option<User>> {
    if !admin.is_configured() {
        return Ok(None);
    }

    let repo = UserRepository::new(db.pool());
    if repo.username_exists(&admin.username).await? {
        return Ok(None);
    }

    let hash =
        hash_password(&admin.password).map_err(|e| ServdeskError::Config(format!("admin: {e}")))?;
    let email = if admin.email.is_empty() {
        format!("{}@localhost", admin.username)
    } else {
        admin.email.clone()
    };

    let user = repo
        .create(&NewUser::new(&admin.username, hash, email).with_role(Role::Staff))
        .await?;
    info!(username = %user.username, "Created bootstrap staff account");
    Ok(Some(user))
}
