use axum::extract::{DefaultBodyLimit, FromRequest, Multipart, Path, Query, Request, State};
use axum::http::{header, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::db::models::{Author, Post};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::posts::repository::{self, NewPost};
use crate::posts::tags::split_tag_field;
use crate::posts::{ranking, search, RankedPost, SearchHit};
use crate::reactions::{present_counts, KindCount, ReactionRepository, SqliteReactionRepository};
use crate::state::AppState;
use crate::uploads::{self, ImageUpload};

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct CreatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// Fields of a create-post form, whichever encoding they arrived in.
#[derive(Default)]
struct PostForm {
    title: Option<String>,
    content: Option<String>,
    tags: Vec<String>,
    image: Option<ImageUpload>,
}

impl PostForm {
    fn into_new_post(self) -> AppResult<(NewPost, Option<ImageUpload>)> {
        let title = self
            .title
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AppError::BadRequest("Missing required fields: title or content".into()))?;
        let content = self
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| AppError::BadRequest("Missing required fields: title or content".into()))?;

        Ok((
            NewPost {
                title,
                content,
                tags: self.tags,
                image: None,
            },
            self.image,
        ))
    }
}

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"))
}

/// A form `tags` value: either a JSON array or a comma-separated list.
fn parse_tag_field(text: &str) -> Vec<String> {
    if text.trim_start().starts_with('[') {
        if let Ok(tags) = serde_json::from_str::<Vec<String>>(text) {
            return tags;
        }
    }
    split_tag_field(text).map(String::from).collect()
}

async fn read_multipart(mut multipart: Multipart) -> AppResult<PostForm> {
    let mut form = PostForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "title" | "content" | "tags" | "tags[]" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                match name.as_str() {
                    "title" => form.title = Some(text),
                    "content" => form.content = Some(text),
                    _ => form.tags.extend(parse_tag_field(&text)),
                }
            }
            "image" => {
                let file_name = field.file_name().map(String::from);
                let content_type = field.content_type().map(String::from);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                // Browsers send an empty part when no file was chosen.
                if !data.is_empty() {
                    form.image = Some(ImageUpload {
                        file_name,
                        content_type,
                        data: data.to_vec(),
                    });
                }
            }
            _ => continue,
        }
    }

    Ok(form)
}

/// POST /api/posts — JSON or multipart (with an optional `image` part)
async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    request: Request,
) -> AppResult<(StatusCode, Json<Post>)> {
    let form = if is_multipart(&request) {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        read_multipart(multipart).await?
    } else {
        let Json(body) = Json::<CreatePostRequest>::from_request(request, &state).await?;
        PostForm {
            title: body.title,
            content: body.content,
            tags: body.tags.unwrap_or_default(),
            image: None,
        }
    };

    let (mut new_post, image) = form.into_new_post()?;
    let uploads_dir = state.config.uploads_path();
    if let Some(image) = image {
        new_post.image = Some(uploads::store_image(&uploads_dir, image).await?);
    }
    let stored_image = new_post.image.clone();

    let author = Author {
        id: user.id,
        username: user.username,
    };
    let inserted = match state.db.get() {
        Ok(conn) => repository::insert(&conn, &author, new_post).map_err(AppError::from),
        Err(e) => Err(AppError::from(e)),
    };
    let post = match inserted {
        Ok(post) => post,
        Err(e) => {
            // No post references the file, so it must not outlive the failed insert.
            if let Some(image) = stored_image {
                uploads::discard(&uploads_dir, &image).await;
            }
            return Err(e);
        }
    };

    tracing::info!(post_id = %post.id, author = %author.username, "Created post");
    Ok((StatusCode::CREATED, Json(post)))
}

/// GET /api/posts and /api/posts/latest
async fn latest(State(state): State<AppState>) -> AppResult<Json<Vec<Post>>> {
    let conn = state.db.get()?;
    Ok(Json(repository::list_latest(&conn)?))
}

async fn relevant(State(state): State<AppState>) -> AppResult<Json<Vec<RankedPost>>> {
    let conn = state.db.get()?;
    let stats = repository::list_with_stats(&conn)?;
    Ok(Json(ranking::rank_relevant(stats)))
}

async fn trending(State(state): State<AppState>) -> AppResult<Json<Vec<RankedPost>>> {
    let conn = state.db.get()?;
    let stats = repository::list_with_stats(&conn)?;
    Ok(Json(ranking::rank_trending(stats)))
}

async fn all_tags(State(state): State<AppState>) -> AppResult<Json<Vec<String>>> {
    let conn = state.db.get()?;
    Ok(Json(repository::all_tags(&conn)?))
}

async fn by_tag(
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> AppResult<Json<Vec<Post>>> {
    if tag.trim().is_empty() {
        return Err(AppError::BadRequest("Missing tag".into()));
    }
    let conn = state.db.get()?;
    Ok(Json(repository::list_by_tag(&conn, &tag)?))
}

async fn search_posts(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Vec<SearchHit>>> {
    let q = query
        .q
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing search parameter: q".into()))?;

    let conn = state.db.get()?;
    let posts = repository::list_latest(&conn)?;
    Ok(Json(search::search(posts, &q)))
}

async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Post>> {
    let conn = state.db.get()?;
    repository::find_by_id(&conn, &id)?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Post not found".into()))
}

/// GET /api/posts/{id}/reactions — only kinds present on the post
async fn post_reactions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<KindCount>>> {
    if uuid::Uuid::parse_str(&id).is_err() {
        return Err(AppError::BadRequest("Invalid post id".into()));
    }
    let repo = SqliteReactionRepository::new(state.db.clone());
    let counts = repo.counts(&id).await?;
    Ok(Json(present_counts(&counts)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/posts", get(latest).post(create_post))
        .route("/api/posts/latest", get(latest))
        .route("/api/posts/relevant", get(relevant))
        .route("/api/posts/trending", get(trending))
        .route("/api/posts/tags", get(all_tags))
        .route("/api/posts/by-tag/{tag}", get(by_tag))
        .route("/api/posts/search", get(search_posts))
        .route("/api/posts/{id}", get(get_post))
        .route("/api/posts/{id}/reactions", get(post_reactions))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}
