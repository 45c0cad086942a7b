//! User repository for servdesk.
//!
//! This module provides CRUD operations for users in the database.

use sqlx::{QueryBuilder, SqlitePool};

use super::user::{NewUser, User, UserUpdate};
use crate::{Result, ServdeskError};

const USER_COLUMNS: &str = "id, username, password, email, first_name, last_name, role, \
                            is_active, created_at, updated_at, last_login";

/// Repository for user CRUD operations.
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    /// Create a new UserRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user in the database.
    ///
    /// Returns the created user with the assigned ID. A username that is
    /// already taken (case-insensitive) yields [`ServdeskError::Conflict`].
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        let result = sqlx::query(
            "INSERT INTO users (username, password, email, first_name, last_name, role)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&new_user.username)
        .bind(&new_user.password)
        .bind(&new_user.email)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(new_user.role)
        .execute(self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.get_by_id(id)
            .await?
            .ok_or_else(|| ServdeskError::NotFound("user".to_string()))
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        let result = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| ServdeskError::Database(e.to_string()))?;

        Ok(result)
    }

    /// Get a user by username (case-insensitive).
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ? COLLATE NOCASE");
        let result = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| ServdeskError::Database(e.to_string()))?;

        Ok(result)
    }

    /// Update a user by ID.
    ///
    /// Only fields that are set in the update will be modified.
    /// Returns the updated user, or None if not found.
    pub async fn update(&self, id: i64, update: &UserUpdate) -> Result<Option<User>> {
        if update.is_empty() {
            return self.get_by_id(id).await;
        }

        let mut query: QueryBuilder<sqlx::Sqlite> =
            QueryBuilder::new("UPDATE users SET updated_at = datetime('now')");

        if let Some(ref password) = update.password {
            query.push(", password = ");
            query.push_bind(password);
        }
        if let Some(ref email) = update.email {
            query.push(", email = ");
            query.push_bind(email);
        }
        if let Some(ref first_name) = update.first_name {
            query.push(", first_name = ");
            query.push_bind(first_name);
        }
        if let Some(ref last_name) = update.last_name {
            query.push(", last_name = ");
            query.push_bind(last_name);
        }
        if let Some(role) = update.role {
            query.push(", role = ");
            query.push_bind(role);
        }
        if let Some(is_active) = update.is_active {
            query.push(", is_active = ");
            query.push_bind(is_active);
        }

        query.push(" WHERE id = ");
        query.push_bind(id);

        let result = query
            .build()
            .execute(self.pool)
            .await
            .map_err(|e| ServdeskError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_by_id(id).await
    }

    /// Update the last login timestamp for a user.
    pub async fn update_last_login(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE users SET last_login = datetime('now') WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| ServdeskError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a user by ID.
    ///
    /// Returns true if a user was deleted, false if not found.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| ServdeskError::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    /// List users ordered by username, one page at a time.
    pub async fn list(&self, offset: i64, limit: i64) -> Result<Vec<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY username COLLATE NOCASE LIMIT ? OFFSET ?"
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool)
            .await
            .map_err(|e| ServdeskError::Database(e.to_string()))?;

        Ok(users)
    }

    /// Count all users.
    pub async fn count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool)
            .await
            .map_err(|e| ServdeskError::Database(e.to_string()))?;
        Ok(count.0)
    }

    /// Check if a username is already taken (case-insensitive).
    pub async fn username_exists(&self, username: &str) -> Result<bool> {
        let exists: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE username = ? COLLATE NOCASE)")
                .bind(username)
                .fetch_one(self.pool)
                .await
                .map_err(|e| ServdeskError::Database(e.to_string()))?;
        Ok(exists.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Role;
    use crate::Database;

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn test_create_user() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        let new_user = NewUser::new("testuser", "hashedpw", "test@example.com").with_name("Test", "User");
        let user = repo.create(&new_user).await.unwrap();

        assert_eq!(user.id, 1);
        assert_eq!(user.username, "testuser");
        assert_eq!(user.email, "test@example.com");
        assert_eq!(user.first_name, "Test");
        assert_eq!(user.role, Role::Member);
        assert!(user.is_active);
        assert!(user.last_login.is_none());
    }

    #[tokio::test]
    async fn test_create_duplicate_username_conflicts() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        repo.create(&NewUser::new("dupuser", "pw", "a@example.com"))
            .await
            .unwrap();
        let result = repo
            .create(&NewUser::new("DupUser", "pw", "b@example.com"))
            .await;
        assert!(matches!(result, Err(ServdeskError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_get_by_username_case_insensitive() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        repo.create(&NewUser::new("Alice", "pw", "alice@example.com"))
            .await
            .unwrap();

        let found = repo.get_by_username("alice").await.unwrap().unwrap();
        assert_eq!(found.username, "Alice");
        assert!(repo.get_by_username("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_user() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        let user = repo
            .create(&NewUser::new("upd", "pw", "upd@example.com"))
            .await
            .unwrap();

        let update = UserUpdate::new()
            .first_name("Updated")
            .role(Role::Staff)
            .is_active(false);
        let updated = repo.update(user.id, &update).await.unwrap().unwrap();

        assert_eq!(updated.first_name, "Updated");
        assert_eq!(updated.role, Role::Staff);
        assert!(!updated.is_active);
        assert_eq!(updated.email, "upd@example.com");
    }

    #[tokio::test]
    async fn test_update_nonexistent_user() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        let result = repo
            .update(999, &UserUpdate::new().first_name("x"))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_update_last_login() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        let user = repo
            .create(&NewUser::new("login", "pw", "login@example.com"))
            .await
            .unwrap();
        repo.update_last_login(user.id).await.unwrap();

        let user = repo.get_by_id(user.id).await.unwrap().unwrap();
        assert!(user.last_login.is_some());
    }

    #[tokio::test]
    async fn test_delete_user() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        let user = repo
            .create(&NewUser::new("gone", "pw", "gone@example.com"))
            .await
            .unwrap();
        assert!(repo.delete(user.id).await.unwrap());
        assert!(!repo.delete(user.id).await.unwrap());
        assert!(repo.get_by_id(user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_and_count() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        for name in ["charlie", "alice", "bob"] {
            repo.create(&NewUser::new(name, "pw", format!("{name}@example.com")))
                .await
                .unwrap();
        }

        assert_eq!(repo.count().await.unwrap(), 3);

        let page = repo.list(0, 2).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].username, "alice");
        assert_eq!(page[1].username, "bob");

        let rest = repo.list(2, 2).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].username, "charlie");
    }

    #[tokio::test]
    async fn test_username_exists() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        repo.create(&NewUser::new("exists", "pw", "e@example.com"))
            .await
            .unwrap();
        assert!(repo.username_exists("EXISTS").await.unwrap());
        assert!(!repo.username_exists("missing").await.unwrap());
    }
}
