//! Token authentication extractor.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use std::sync::Arc;

use crate::auth::TokenClaims;
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// Find the access token in a request.
///
/// The `Authorization: Bearer` header wins; the `token` query parameter is
/// accepted so plain links can download files.
pub fn extract_token(parts: &Parts) -> Option<String> {
    let header_token = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    if header_token.is_some() {
        return header_token;
    }

    parts.uri.query().and_then(|query| {
        query.split('&').find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            if key == "token" && !value.is_empty() {
                urlencoding::decode(value).ok().map(|s| s.into_owned())
            } else {
                None
            }
        })
    })
}

/// Extractor for authenticated users.
///
/// Rejects the request with 401 unless the token is valid and is the one
/// most recently issued to its user.
#[derive(Debug, Clone)]
pub struct AuthUser(pub TokenClaims);

impl AuthUser {
    pub fn user_id(&self) -> i64 {
        self.0.uid
    }

    pub fn username(&self) -> &str {
        &self.0.sub
    }
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let token = extract_token(parts)
                .ok_or_else(|| ApiError::unauthorized("Missing authorization"))?;

            let claims = state.auth.verify(&token).await.map_err(|e| {
                tracing::debug!("Token rejected: {}", e);
                match e {
                    crate::FilestoreError::StorageUnavailable(_) => ApiError::from(e),
                    _ => ApiError::unauthorized("Invalid or expired token"),
                }
            })?;

            Ok(AuthUser(claims))
        })
    }
}
