pub mod auth;
pub mod comments;
pub mod home;
pub mod posts;
pub mod reactions;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::uploads;

/// The complete application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(home::index))
        .route("/uploads/{file}", get(uploads::serve))
        .merge(auth::router())
        .merge(posts::router())
        .merge(comments::router())
        .merge(reactions::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
