//! Book listing, rename and delete endpoints

use axum::{
    extract::{Path, State},
    routing::{delete, get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::db::{BookListing, BookRepository};
use crate::error::{AppError, Result};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameRequest {
    pub new_name: String,
}

#[derive(Debug, Serialize)]
pub struct RenameResponse {
    pub message: String,
    #[serde(rename = "newName")]
    pub new_name: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: String,
}

/// Create the books router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/my-books", get(list_my_books))
        .route("/books/:id/rename", put(rename_book))
        .route("/books/:id", delete(delete_book))
}

/// List the authenticated user's books
async fn list_my_books(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<Vec<BookListing>>> {
    let repo = BookRepository::new(state.db());
    let books = repo.list_for_user(claims.id).await?;
    Ok(Json(books))
}

/// Rename one of the user's books
async fn rename_book(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(book_id): Path<i64>,
    Json(request): Json<RenameRequest>,
) -> Result<Json<RenameResponse>> {
    let repo = BookRepository::new(state.db());
    let renamed = repo.rename(book_id, claims.id, &request.new_name).await?;

    if !renamed {
        return Err(AppError::NotFound(format!("Book {} not found", book_id)));
    }

    Ok(Json(RenameResponse {
        message: "Book renamed successfully".to_string(),
        new_name: request.new_name,
    }))
}

/// Delete one of the user's books
///
/// The database row is the system of record; removing the stored binary
/// afterwards is best-effort.
async fn delete_book(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(book_id): Path<i64>,
) -> Result<Json<DeleteResponse>> {
    let repo = BookRepository::new(state.db());
    let object_key = repo
        .delete(book_id, claims.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book {} not found", book_id)))?;

    if let Err(e) = state.store().delete_object(&object_key).await {
        tracing::warn!("Failed to delete object {} from storage: {}", object_key, e);
    }

    Ok(Json(DeleteResponse {
        message: "Book deleted successfully".to_string(),
    }))
}
