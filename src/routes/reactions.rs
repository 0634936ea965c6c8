use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::posts::repository as posts;
use crate::reactions::{
    summarize, ReactionKind, ReactionRepository, ReactionSummary, SqliteReactionRepository,
    ToggleOutcome,
};
use crate::state::AppState;

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct ToggleRequest {
    pub post: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// POST /api/reactions/toggle
async fn toggle(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Result<Json<ToggleRequest>, JsonRejection>,
) -> AppResult<Json<ToggleOutcome>> {
    let Json(req) = payload?;
    let (post_id, kind) = match (req.post, req.kind) {
        (Some(post), Some(kind)) if !post.is_empty() && !kind.is_empty() => (post, kind),
        _ => {
            return Err(AppError::BadRequest(
                "Missing required fields: post or type".into(),
            ))
        }
    };
    let kind: ReactionKind = kind
        .parse()
        .map_err(|e: crate::reactions::UnknownKind| AppError::BadRequest(e.to_string()))?;

    {
        let conn = state.db.get()?;
        if !posts::exists(&conn, &post_id)? {
            return Err(AppError::NotFound("Post not found".into()));
        }
    }

    let repo = SqliteReactionRepository::new(state.db.clone());
    let outcome = repo.toggle(&post_id, &user.id, kind).await?;

    tracing::debug!(
        post_id = %post_id,
        user_id = %user.id,
        kind = %kind,
        "Reaction {:?}, total {}",
        outcome.action,
        outcome.total
    );
    Ok(Json(outcome))
}

/// GET /api/reactions/summary/{post_id} — every kind, zeros included
async fn summary(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(post_id): Path<String>,
) -> AppResult<Json<ReactionSummary>> {
    let repo = SqliteReactionRepository::new(state.db.clone());
    let counts = repo.counts(&post_id).await?;
    let user_reacted = match user {
        Some(user) => repo.kinds_by_user(&post_id, &user.id).await?,
        None => Vec::new(),
    };
    Ok(Json(summarize(&counts, user_reacted)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/reactions/toggle", post(toggle))
        .route("/api/reactions/summary/{post_id}", get(summary))
}
