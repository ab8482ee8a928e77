//! User repository for filestore.

use super::user::{NewUser, User};
use super::DbPool;
use crate::Result;

const USER_COLUMNS: &str =
    "id, username, password, token, token_issued_at, created_at, last_active, is_active";

/// Repository for user accounts.
pub struct UserRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new UserRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert a user unless the username is already taken.
    ///
    /// Returns `false` when another account holds the name; the check and the
    /// insert are a single statement so concurrent signups cannot both win.
    pub async fn create_if_absent(&self, new_user: &NewUser) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO users (username, password) VALUES (?, ?)
             ON CONFLICT(username) DO NOTHING",
        )
        .bind(&new_user.username)
        .bind(&new_user.password)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Get a user by username (case-insensitive).
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ? COLLATE NOCASE"
        ))
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Record a freshly issued token, replacing any earlier one.
    pub async fn store_token(&self, id: i64, token: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE users
             SET token = ?, token_issued_at = datetime('now'), last_active = datetime('now')
             WHERE id = ?",
        )
        .bind(token)
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Forget the user's current token.
    pub async fn clear_token(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET token = NULL, token_issued_at = NULL WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Check if a username exists (case-insensitive).
    pub async fn username_exists(&self, username: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = ? COLLATE NOCASE)",
        )
        .bind(username)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    /// Count all users.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn test_create_user() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        assert!(repo.create_if_absent(&NewUser::new("alice", "hash")).await.unwrap());

        let user = repo.get_by_username("alice").await.unwrap().unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(user.username, "alice");
        assert!(user.token.is_none());
        assert!(user.is_active);
    }

    #[tokio::test]
    async fn test_create_duplicate_username() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        assert!(repo.create_if_absent(&NewUser::new("alice", "hash")).await.unwrap());
        assert!(!repo.create_if_absent(&NewUser::new("alice", "other")).await.unwrap());
        // Usernames collide regardless of case
        assert!(!repo.create_if_absent(&NewUser::new("ALICE", "other")).await.unwrap());

        assert_eq!(repo.count().await.unwrap(), 1);
        let user = repo.get_by_username("alice").await.unwrap().unwrap();
        assert_eq!(user.password, "hash");
    }

    #[tokio::test]
    async fn test_get_by_id() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());
        repo.create_if_absent(&NewUser::new("alice", "hash")).await.unwrap();

        assert!(repo.get_by_id(1).await.unwrap().is_some());
        assert!(repo.get_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_and_clear_token() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());
        repo.create_if_absent(&NewUser::new("alice", "hash")).await.unwrap();

        assert!(repo.store_token(1, "tok-1").await.unwrap());
        let user = repo.get_by_id(1).await.unwrap().unwrap();
        assert!(user.holds_token("tok-1"));
        assert!(user.token_issued_at.is_some());
        assert!(user.last_active.is_some());

        repo.store_token(1, "tok-2").await.unwrap();
        let user = repo.get_by_id(1).await.unwrap().unwrap();
        assert!(!user.holds_token("tok-1"));
        assert!(user.holds_token("tok-2"));

        assert!(repo.clear_token(1).await.unwrap());
        let user = repo.get_by_id(1).await.unwrap().unwrap();
        assert!(user.token.is_none());
    }

    #[tokio::test]
    async fn test_store_token_unknown_user() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());

        assert!(!repo.store_token(42, "tok").await.unwrap());
    }

    #[tokio::test]
    async fn test_username_exists_case_insensitive() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool());
        repo.create_if_absent(&NewUser::new("Alice", "hash")).await.unwrap();

        assert!(repo.username_exists("alice").await.unwrap());
        assert!(repo.username_exists("ALICE").await.unwrap());
        assert!(!repo.username_exists("bob").await.unwrap());
    }
}
