//! Registration and login endpoints

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::auth::{hash_password, issue_token, verify_password};
use crate::db::UserRepository;
use crate::error::{AppError, Result};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub token: String,
    pub user: UserInfo,
}

/// Create the auth router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// Register a new user and sign them in
async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let repo = UserRepository::new(state.db());

    if repo.find_by_email(&request.email).await?.is_some() {
        return Err(AppError::BadRequest("User already exists".to_string()));
    }

    let password_hash = hash_password(&request.password)?;
    let user_id = repo
        .create(&request.username, &request.email, &password_hash)
        .await?;

    let auth = &state.config().auth;
    let token = issue_token(
        user_id,
        &request.username,
        &request.email,
        &auth.jwt_secret,
        auth.token_ttl_hours,
    )?;

    tracing::info!("Registered user {} ({})", request.username, user_id);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: Some("User registered successfully".to_string()),
            token,
            user: UserInfo {
                id: user_id,
                username: request.username,
                email: request.email,
            },
        }),
    ))
}

/// Log an existing user in
async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let repo = UserRepository::new(state.db());

    let user = repo
        .find_by_email(&request.email)
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid credentials".to_string()))?;

    if !verify_password(&request.password, &user.password_hash) {
        return Err(AppError::BadRequest("Invalid credentials".to_string()));
    }

    let auth = &state.config().auth;
    let token = issue_token(
        user.id,
        &user.username,
        &user.email,
        &auth.jwt_secret,
        auth.token_ttl_hours,
    )?;

    Ok(Json(AuthResponse {
        message: None,
        token,
        user: UserInfo {
            id: user.id,
            username: user.username,
            email: user.email,
        },
    }))
}
