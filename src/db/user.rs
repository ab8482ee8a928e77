//! User model for filestore.

/// A registered account.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Unique user ID.
    pub id: i64,
    /// Login username (unique, case-insensitive).
    pub username: String,
    /// Password hash (Argon2).
    pub password: String,
    /// The most recently issued token, if the user has signed in.
    pub token: Option<String>,
    /// When `token` was issued.
    pub token_issued_at: Option<String>,
    /// Account creation timestamp.
    pub created_at: String,
    /// Last successful sign-in.
    pub last_active: Option<String>,
    /// Whether the account may sign in.
    pub is_active: bool,
}

impl User {
    /// Whether `token` is the one this user was last issued.
    pub fn holds_token(&self, token: &str) -> bool {
        self.token.as_deref() == Some(token)
    }
}

/// Data for creating a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Login username.
    pub username: String,
    /// Password hash (should be pre-hashed with Argon2).
    pub password: String,
}

impl NewUser {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}
