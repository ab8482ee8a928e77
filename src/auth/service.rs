//! User registration, sign-in and token checks.

use std::sync::Arc;

use tracing::{debug, info};

use super::password::{hash_password, validate_password, verify_password, PasswordError};
use super::token::{IssuedToken, TokenClaims, TokenIssuer};
use crate::db::{Database, NewUser, User, UserRepository};
use crate::{FilestoreError, Result};

/// Minimum username length.
pub const MIN_USERNAME_LENGTH: usize = 3;

/// Maximum username length.
pub const MAX_USERNAME_LENGTH: usize = 32;

/// Check username rules: 3 to 32 ASCII letters, digits, `_` or `-`.
pub fn validate_username(username: &str) -> Result<()> {
    let len = username.chars().count();
    if !(MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&len) {
        return Err(FilestoreError::Validation(format!(
            "username must be {MIN_USERNAME_LENGTH}-{MAX_USERNAME_LENGTH} characters"
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(FilestoreError::Validation(
            "username may contain only letters, digits, '_' and '-'".to_string(),
        ));
    }
    Ok(())
}

impl From<PasswordError> for FilestoreError {
    fn from(e: PasswordError) -> Self {
        match e {
            PasswordError::TooShort | PasswordError::TooLong => {
                FilestoreError::Validation(e.to_string())
            }
            PasswordError::VerificationFailed | PasswordError::InvalidHash => {
                FilestoreError::Auth(e.to_string())
            }
            PasswordError::HashError(msg) => FilestoreError::Internal(msg),
        }
    }
}

/// Authentication service.
///
/// A user holds at most one valid token: signing in again replaces it.
#[derive(Clone)]
pub struct AuthService {
    db: Arc<Database>,
    tokens: TokenIssuer,
}

impl AuthService {
    pub fn new(db: Arc<Database>, secret: &str, token_lifetime_secs: u64) -> Self {
        Self {
            db,
            tokens: TokenIssuer::new(secret, token_lifetime_secs),
        }
    }

    fn repo(&self) -> UserRepository<'_> {
        UserRepository::new(self.db.pool())
    }

    /// Register a user. Returns `false` if the username is taken.
    pub async fn signup(&self, username: &str, password: &str) -> Result<bool> {
        validate_username(username)?;
        validate_password(password)?;

        let hash = hash_password(password)?;
        let created = self
            .repo()
            .create_if_absent(&NewUser::new(username, hash))
            .await?;

        if created {
            info!(username = %username, "User registered");
        } else {
            debug!(username = %username, "Signup rejected, username taken");
        }
        Ok(created)
    }

    /// Check credentials and issue a new token, invalidating any earlier one.
    pub async fn signin(&self, username: &str, password: &str) -> Result<IssuedToken> {
        let invalid = || FilestoreError::Auth("invalid username or password".to_string());

        let user = self
            .repo()
            .get_by_username(username)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(invalid)?;
        verify_password(password, &user.password).map_err(|_| invalid())?;

        let issued = self.tokens.issue(user.id, &user.username)?;
        if !self.repo().store_token(user.id, &issued.token).await? {
            return Err(invalid());
        }

        info!(username = %user.username, "User signed in");
        Ok(issued)
    }

    /// Validate a token and return its claims.
    ///
    /// The token must be well signed, unexpired, and the one most recently
    /// issued to an active user.
    pub async fn verify(&self, token: &str) -> Result<TokenClaims> {
        let claims = self.tokens.decode(token)?;

        let user = self.repo().get_by_id(claims.uid).await?;
        match user {
            Some(user) if user.is_active && user.holds_token(token) => Ok(claims),
            _ => Err(FilestoreError::Auth("token has been revoked".to_string())),
        }
    }

    /// Whether `token` currently grants access.
    pub async fn authorize(&self, token: &str) -> bool {
        self.verify(token).await.is_ok()
    }

    /// Forget the user's current token.
    pub async fn signout(&self, user_id: i64) -> Result<()> {
        self.repo().clear_token(user_id).await?;
        Ok(())
    }

    /// Fetch the user behind a set of claims.
    pub async fn user_info(&self, user_id: i64) -> Result<Option<User>> {
        self.repo().get_by_id(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup() -> AuthService {
        let db = Arc::new(Database::open_in_memory().await.unwrap());
        AuthService::new(db, "test-secret", 3600)
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("a_b-c").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username(&"a".repeat(33)).is_err());
        assert!(validate_username("bad name").is_err());
    }

    #[tokio::test]
    async fn test_signup_and_signin() {
        let auth = setup().await;

        assert!(auth.signup("alice", "password123").await.unwrap());
        assert!(!auth.signup("alice", "password456").await.unwrap());

        let issued = auth.signin("alice", "password123").await.unwrap();
        let claims = auth.verify(&issued.token).await.unwrap();
        assert_eq!(claims.sub, "alice");
        assert!(auth.authorize(&issued.token).await);
    }

    #[tokio::test]
    async fn test_signup_validation() {
        let auth = setup().await;

        assert!(matches!(
            auth.signup("alice", "short").await,
            Err(FilestoreError::Validation(_))
        ));
        assert!(matches!(
            auth.signup("a", "password123").await,
            Err(FilestoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_signin_wrong_password() {
        let auth = setup().await;
        auth.signup("alice", "password123").await.unwrap();

        assert!(matches!(
            auth.signin("alice", "wrongpassword").await,
            Err(FilestoreError::Auth(_))
        ));
        assert!(matches!(
            auth.signin("nobody", "password123").await,
            Err(FilestoreError::Auth(_))
        ));
    }

    #[tokio::test]
    async fn test_second_signin_revokes_first_token() {
        let auth = setup().await;
        auth.signup("alice", "password123").await.unwrap();

        let first = auth.signin("alice", "password123").await.unwrap();
        let second = auth.signin("alice", "password123").await.unwrap();

        assert!(!auth.authorize(&first.token).await);
        assert!(auth.authorize(&second.token).await);
    }

    #[tokio::test]
    async fn test_signout_revokes_token() {
        let auth = setup().await;
        auth.signup("alice", "password123").await.unwrap();
        let issued = auth.signin("alice", "password123").await.unwrap();
        let claims = auth.verify(&issued.token).await.unwrap();

        auth.signout(claims.uid).await.unwrap();
        assert!(!auth.authorize(&issued.token).await);
    }

    #[tokio::test]
    async fn test_authorize_garbage() {
        let auth = setup().await;
        assert!(!auth.authorize("garbage").await);
        assert!(!auth.authorize("").await);
    }

    #[tokio::test]
    async fn test_user_info() {
        let auth = setup().await;
        auth.signup("alice", "password123").await.unwrap();
        let issued = auth.signin("alice", "password123").await.unwrap();
        let claims = auth.verify(&issued.token).await.unwrap();

        let user = auth.user_info(claims.uid).await.unwrap().unwrap();
        assert_eq!(user.username, "alice");
        assert!(user.last_active.is_some());
    }
}
