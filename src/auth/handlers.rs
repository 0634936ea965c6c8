use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::{password, users};
use crate::db;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

// -- Request/Response types --

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub username: String,
}

fn required(value: Option<String>, field: &str) -> AppResult<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("Missing required field: {}", field)))
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let Json(req) = payload?;
    let username = required(req.username, "username")?.trim().to_string();
    let email = users::normalize_email(&required(req.email, "email")?);
    let password = required(req.password, "password")?;

    {
        let conn = state.db.get()?;
        if users::find_by_email(&conn, &email)?.is_some() {
            return Err(AppError::Conflict("User already exists".into()));
        }
    }

    let password_hash = password::hash(password, state.config.auth.bcrypt_cost).await?;

    let user = {
        let conn = state.db.get()?;
        // The unique index on email catches a registration racing this one.
        users::insert(&conn, &username, &email, &password_hash).map_err(|e| {
            if db::is_unique_violation(&e) {
                AppError::Conflict("User already exists".into())
            } else {
                AppError::Database(e)
            }
        })?
    };

    let token = state
        .tokens
        .issue(&user.id, &user.username)
        .map_err(|e| AppError::Internal(format!("token signing failed: {}", e)))?;

    tracing::info!(user_id = %user.id, "Registered user {}", user.username);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            username: user.username,
        }),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<AuthResponse>> {
    let Json(req) = payload?;
    let email = users::normalize_email(&required(req.email, "email")?);
    let password = required(req.password, "password")?;

    let user = {
        let conn = state.db.get()?;
        users::find_by_email(&conn, &email)?
    };

    // Unknown email and wrong password are indistinguishable to the caller.
    let user = user.ok_or(AppError::InvalidCredentials)?;
    if !password::verify(password, user.password_hash.clone()).await? {
        return Err(AppError::InvalidCredentials);
    }

    let token = state
        .tokens
        .issue(&user.id, &user.username)
        .map_err(|e| AppError::Internal(format!("token signing failed: {}", e)))?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(AuthResponse {
        token,
        username: user.username,
    }))
}
