//! Validated request extraction.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::web::error::ApiError;

/// A JSON extractor that validates the request body.
///
/// Malformed JSON is a 400; a body that parses but fails its `validator`
/// rules is a 422 with field-level details.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid JSON: {}", e)))?;

        value.validate().map_err(ApiError::from_validation_errors)?;

        Ok(ValidatedJson(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::dto::{CredentialsRequest, RenameRequest};
    use crate::web::error::ErrorCode;
    use axum::body::Body;

    fn json_request(body: &str) -> Request {
        Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_valid_body() {
        let req = json_request(r#"{"username":"alice","password":"password123"}"#);
        let ValidatedJson(body) = ValidatedJson::<CredentialsRequest>::from_request(req, &())
            .await
            .unwrap();
        assert_eq!(body.username, "alice");
    }

    #[tokio::test]
    async fn test_invalid_json_is_bad_request() {
        let req = json_request("{not json");
        let err = ValidatedJson::<CredentialsRequest>::from_request(req, &())
            .await
            .err()
            .unwrap();
        assert_eq!(err.code(), ErrorCode::BadRequest);
    }

    #[tokio::test]
    async fn test_rule_violation_is_validation_error() {
        let req = json_request(r#"{"name":""}"#);
        let err = ValidatedJson::<RenameRequest>::from_request(req, &())
            .await
            .err()
            .unwrap();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }
}
