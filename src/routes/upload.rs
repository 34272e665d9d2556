//! PDF upload endpoint
//!
//! Receives a multipart `file` field, stores the binary in the object
//! store, and records a book row for the authenticated user.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::db::BookRepository;
use crate::error::{AppError, Result};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub book_id: i64,
    pub title: String,
    pub url: String,
}

/// Create the upload router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload_file))
        // Allow up to 100MB uploads for large PDFs
        .layer(DefaultBodyLimit::max(100 * 1024 * 1024))
}

/// Upload a new PDF
async fn upload_file(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    tracing::debug!("Starting upload for user {}", claims.id);

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name != "file" {
            continue;
        }

        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "upload.pdf".to_string());

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read file data: {}", e)))?
            .to_vec();

        tracing::debug!("Read {} bytes for '{}'", data.len(), filename);

        let object_key = format!("books/{}/{}", Uuid::new_v4(), filename);
        state
            .store()
            .put_object(&object_key, data, "application/pdf")
            .await?;

        let url = state.store().public_url(&object_key);
        let repo = BookRepository::new(state.db());
        let book_id = repo.insert(claims.id, &filename, &object_key, &url).await?;

        tracing::info!("Uploaded book {} ('{}') for user {}", book_id, filename, claims.id);

        return Ok(Json(UploadResponse {
            message: "File uploaded and saved successfully".to_string(),
            book_id,
            title: filename,
            url,
        }));
    }

    Err(AppError::BadRequest(
        "No file provided. Use field name 'file'".to_string(),
    ))
}
