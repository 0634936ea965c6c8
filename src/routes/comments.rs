use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::comments;
use crate::db::models::{Author, Comment};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::posts::repository as posts;
use crate::state::AppState;

/// Any `author` sent by the client is ignored; the author is the caller.
#[derive(Deserialize, Default)]
#[serde(default)]
pub struct CreateCommentRequest {
    pub post: Option<String>,
    pub content: Option<String>,
}

#[derive(Deserialize)]
pub struct ListCommentsQuery {
    pub post: Option<String>,
    pub limit: Option<u32>,
}

/// POST /api/comments
async fn create_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Result<Json<CreateCommentRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    let Json(req) = payload?;
    let (post_id, content) = match (req.post, req.content) {
        (Some(post), Some(content)) if !post.is_empty() && !content.trim().is_empty() => {
            (post, content)
        }
        _ => {
            return Err(AppError::BadRequest(
                "Missing required fields: post or content".into(),
            ))
        }
    };

    let conn = state.db.get()?;
    if !posts::exists(&conn, &post_id)? {
        return Err(AppError::NotFound("Post not found".into()));
    }

    let author = Author {
        id: user.id,
        username: user.username,
    };
    let comment = comments::insert(&conn, &post_id, &author, &content)?;

    tracing::info!(post_id = %post_id, comment_id = %comment.id, "Created comment");
    Ok((StatusCode::CREATED, Json(comment)))
}

/// GET /api/comments?post=&limit=
async fn list_comments(
    State(state): State<AppState>,
    Query(query): Query<ListCommentsQuery>,
) -> AppResult<Json<Vec<Comment>>> {
    let post_id = query
        .post
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing query parameter: post".into()))?;
    // A zero limit means no cap.
    let limit = query.limit.filter(|l| *l > 0);

    let conn = state.db.get()?;
    Ok(Json(comments::list_for_post(&conn, &post_id, limit)?))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/comments", get(list_comments).post(create_comment))
}
