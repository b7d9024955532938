//! Read-only endpoints re-exposing the three static JSON datasets.
//!
//! Each file is read on every request; a read failure surfaces on the
//! request that hit it. No filtering, pagination, or parameters: the
//! whole collection or a generic error payload.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse, response::Response};
use serde_json::Value;
use tracing::error;

use atrium_types::api::ErrorResponse;

use crate::state::AppState;

pub async fn staff(State(state): State<AppState>) -> Response {
    dataset(&state, "staff").await
}

pub async fn divisions(State(state): State<AppState>) -> Response {
    dataset(&state, "divisions").await
}

pub async fn messages(State(state): State<AppState>) -> Response {
    dataset(&state, "messages").await
}

async fn dataset(state: &AppState, name: &str) -> Response {
    let path = state.data_dir.join(format!("{name}.json"));

    let parsed = match tokio::fs::read_to_string(&path).await {
        Ok(raw) => serde_json::from_str::<Value>(&raw).map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };

    match parsed {
        Ok(value) => Json(value).into_response(),
        Err(reason) => {
            error!("Failed to read dataset {}: {}", path.display(), reason);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to load {name} data"),
                }),
            )
                .into_response()
        }
    }
}
