//! File handlers.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::header,
    response::Response,
    Json,
};
use futures::TryStreamExt;

use crate::file::{Fingerprint, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use crate::web::dto::{
    ApiResponse, DeleteResponse, FastUploadRequest, FastUploadResponse, FileResponse, ListQuery,
    RenameRequest, UploadResponse, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::middleware::AuthUser;

use super::AppState;

/// Generate a safe Content-Disposition header value for file downloads.
///
/// Control characters, quotes and backslashes never reach the plain
/// `filename` parameter; non-ASCII names are also sent RFC 5987 encoded.
fn content_disposition_header(filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' | '\\' => '_',
            _ => c,
        })
        .collect();

    if filename.is_ascii() && sanitized == filename {
        return format!("attachment; filename=\"{}\"", filename);
    }

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        sanitized,
        urlencoding::encode(filename)
    )
}

/// Parse a path fingerprint, rejecting malformed values before any lookup.
fn parse_fingerprint(raw: &str) -> Result<Fingerprint, ApiError> {
    Fingerprint::from_hex(raw).map_err(|_| ApiError::bad_request("Malformed fingerprint"))
}

/// POST /api/files - Upload a file.
///
/// Request body: multipart/form-data with a "file" field and an optional
/// "name" field. The name must precede the file to take effect; otherwise
/// the part's filename is used.
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<UploadResponse>>, ApiError> {
    let mut name: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::debug!("Failed to read multipart field: {}", e);
        ApiError::bad_request("Invalid multipart data")
    })? {
        match field.name().unwrap_or("") {
            "name" => {
                let text = field.text().await.map_err(|e| {
                    tracing::debug!("Failed to read name field: {}", e);
                    ApiError::bad_request("Invalid name")
                })?;
                if !text.trim().is_empty() {
                    name = Some(text);
                }
            }
            "file" => {
                let name = name.or_else(|| {
                    field
                        .file_name()
                        .filter(|f| !f.trim().is_empty())
                        .map(str::to_string)
                });
                let body_failed = AtomicBool::new(false);
                let stream = Box::pin(field.map_err(|e| {
                    body_failed.store(true, Ordering::Relaxed);
                    io::Error::new(io::ErrorKind::InvalidData, e)
                }));

                let outcome = state
                    .files
                    .upload(name.as_deref(), stream)
                    .await
                    .map_err(|e| {
                        if body_failed.load(Ordering::Relaxed) {
                            ApiError::bad_request("Failed to read file")
                        } else {
                            ApiError::from(e)
                        }
                    })?;

                tracing::info!(
                    user = %user.username(),
                    fingerprint = %outcome.record.fingerprint,
                    created = outcome.is_created(),
                    "File uploaded"
                );
                return Ok(Json(ApiResponse::new(outcome.into())));
            }
            _ => {}
        }
    }

    Err(ApiError::bad_request("No file provided"))
}

/// POST /api/files/fast-upload - Skip the transfer if the content is stored.
pub async fn fast_upload(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Json(req): Json<FastUploadRequest>,
) -> Result<Json<ApiResponse<FastUploadResponse>>, ApiError> {
    let fingerprint = parse_fingerprint(&req.fingerprint)?;
    let outcome = state.files.fast_upload(&fingerprint, req.size).await?;

    Ok(Json(ApiResponse::new(outcome.into())))
}

/// GET /api/files - List active files.
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<FileResponse>>>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);
    let records = state.files.list(limit).await?;

    Ok(Json(ApiResponse::new(
        records.into_iter().map(FileResponse::from).collect(),
    )))
}

/// GET /api/files/:fingerprint - File metadata.
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(raw): Path<String>,
) -> Result<Json<ApiResponse<FileResponse>>, ApiError> {
    let fingerprint = parse_fingerprint(&raw)?;
    let record = state
        .files
        .metadata(&fingerprint)
        .await?
        .ok_or_else(|| ApiError::not_found("File not found"))?;

    Ok(Json(ApiResponse::new(record.into())))
}

/// PATCH /api/files/:fingerprint - Rename a file.
pub async fn rename_file(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(raw): Path<String>,
    ValidatedJson(req): ValidatedJson<RenameRequest>,
) -> Result<Json<ApiResponse<FileResponse>>, ApiError> {
    let fingerprint = parse_fingerprint(&raw)?;
    let record = state
        .files
        .rename(&fingerprint, &req.name)
        .await?
        .ok_or_else(|| ApiError::not_found("File not found"))?;

    Ok(Json(ApiResponse::new(record.into())))
}

/// DELETE /api/files/:fingerprint - Remove a file.
///
/// Deleting a file that is already gone reports `removed: false`.
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(raw): Path<String>,
) -> Result<Json<ApiResponse<DeleteResponse>>, ApiError> {
    let fingerprint = parse_fingerprint(&raw)?;
    let removed = state.files.delete(&fingerprint).await?;

    if removed {
        tracing::info!(user = %user.username(), fingerprint = %fingerprint, "File deleted");
    }
    Ok(Json(ApiResponse::new(DeleteResponse { removed })))
}

/// GET /api/files/:fingerprint/content - Download file bytes.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(raw): Path<String>,
) -> Result<Response<Body>, ApiError> {
    let fingerprint = parse_fingerprint(&raw)?;
    let (record, content) = state
        .files
        .download(&fingerprint)
        .await?
        .ok_or_else(|| ApiError::not_found("File not found"))?;

    let content_type = mime_guess::from_path(&record.name)
        .first_or_octet_stream()
        .to_string();

    Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header(&record.name),
        )
        .header(header::CONTENT_LENGTH, content.len())
        .header(header::ETAG, format!("\"{}\"", record.fingerprint))
        .body(Body::from(content))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })
}

/// POST /api/files/:fingerprint/relocate - Move the bytes to a fresh blob.
pub async fn relocate_file(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(raw): Path<String>,
) -> Result<Json<ApiResponse<FileResponse>>, ApiError> {
    let fingerprint = parse_fingerprint(&raw)?;
    let record = state
        .files
        .relocate(&fingerprint)
        .await?
        .ok_or_else(|| ApiError::not_found("File not found"))?;

    Ok(Json(ApiResponse::new(record.into())))
}
