pub mod datasets;
pub mod portal;
pub mod state;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

/// The full portal router. The binary wraps this with CORS and tracing
/// layers; tests drive it directly.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/staff", get(datasets::staff))
        .route("/api/divisions", get(datasets::divisions))
        .route("/api/messages", get(datasets::messages))
        .route("/api/portal/login", post(portal::login))
        .route("/api/portal/overview", get(portal::overview))
        .route(
            "/api/portal/staff/{id}/messages",
            get(portal::list_messages).post(portal::submit_message),
        )
        .route(
            "/api/portal/staff/{id}/messages/response",
            put(portal::save_response),
        )
        .with_state(state)
}
