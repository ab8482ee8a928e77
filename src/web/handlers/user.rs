//! User handlers.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};

use crate::web::dto::{
    ApiResponse, CredentialsRequest, SigninResponse, SignupResponse, UserInfoResponse,
    ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::middleware::AuthUser;

use super::AppState;

/// POST /api/user/signup - Register a new user.
///
/// A taken username is reported as `created: false`, not as an error.
pub async fn signup(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CredentialsRequest>,
) -> Result<Json<ApiResponse<SignupResponse>>, ApiError> {
    let created = state.auth.signup(&req.username, &req.password).await?;
    Ok(Json(ApiResponse::new(SignupResponse { created })))
}

/// POST /api/user/signin - Exchange credentials for a token.
pub async fn signin(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CredentialsRequest>,
) -> Result<Json<ApiResponse<SigninResponse>>, ApiError> {
    let issued = state.auth.signin(&req.username, &req.password).await?;

    Ok(Json(ApiResponse::new(SigninResponse {
        token: issued.token,
        expires_at: issued.expires_at,
    })))
}

/// POST /api/user/signout - Revoke the current token.
pub async fn signout(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<StatusCode, ApiError> {
    state.auth.signout(user.user_id()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/user/info - Information about the signed-in user.
pub async fn user_info(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<ApiResponse<UserInfoResponse>>, ApiError> {
    let info = state
        .auth
        .user_info(user.user_id())
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(ApiResponse::new(info.into())))
}
