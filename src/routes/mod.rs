//! Route modules for Booklet Server

pub mod booklet;
pub mod combine;
pub mod health;
pub mod students;

use axum::{extract::DefaultBodyLimit, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full application router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(health::router())
        .merge(students::router())
        .merge(booklet::router())
        .merge(combine::router())
        .layer(DefaultBodyLimit::max(state.config().server.body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
