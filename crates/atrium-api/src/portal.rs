//! Portal operations: the flows a student or staff member performs
//! against the store and roster. Identify, read a mailbox, submit a
//! note, save a reply, and the overview counters.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::error;

use atrium_roster::valid_id_number;
use atrium_types::api::{
    ErrorResponse, LoginRequest, LoginResponse, MessageView, OverviewResponse,
    SaveResponseRequest, SaveResponseResult, SubmitMessageRequest,
};
use atrium_types::models::MessageRecord;

use crate::state::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn internal<E: std::fmt::Display>(err: E) -> ApiError {
    error!("portal error: {err}");
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
}

/// Identify a staff member by identification number. Misses are
/// non-fatal: a validation message, never a panic.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !valid_id_number(&req.id_number) {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Identification number is not valid",
        ));
    }

    let staff = state.roster.find(&req.id_number).ok_or_else(|| {
        api_error(
            StatusCode::NOT_FOUND,
            "Identification number not found in the roster",
        )
    })?;

    Ok(Json(LoginResponse {
        staff: staff.clone(),
        division: state.divisions.display_name(&staff.division).to_string(),
    }))
}

/// The recipient's mailbox, oldest first.
pub async fn list_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let recipient = id.trim().to_string();

    let store = state.clone();
    let records = tokio::task::spawn_blocking(move || store.store.load_list(&recipient))
        .await
        .map_err(internal)?
        .map_err(internal)?;

    let views: Vec<MessageView> = records
        .into_iter()
        .map(|r| message_view(&state, r))
        .collect();
    Ok(Json(views))
}

/// Submit a note to a staff member. The creation timestamp is assigned
/// here, at submission.
pub async fn submit_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SubmitMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !valid_id_number(&req.sender_id) {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Sender identification number is not valid",
        ));
    }
    let body = req.body.trim().to_string();
    if body.is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Message body must not be empty",
        ));
    }

    let staff = state
        .roster
        .find(&id)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Recipient not found in the roster"))?;

    let record = MessageRecord::new(req.sender_id.trim(), &staff.id_number, &body);

    let store = state.clone();
    let stored = record.clone();
    tokio::task::spawn_blocking(move || store.store.append_message(&stored))
        .await
        .map_err(internal)?
        .map_err(internal)?;

    Ok((StatusCode::CREATED, Json(message_view(&state, record))))
}

/// Save (or overwrite) the reply on one record, addressed by its
/// (sender, created_at) pair. A miss reports `updated: false` and leaves
/// the list untouched.
pub async fn save_response(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SaveResponseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let recipient = id.trim().to_string();

    let store = state.clone();
    let updated = tokio::task::spawn_blocking(move || {
        store
            .store
            .save_response(&recipient, &req.sender_id, req.created_at, &req.response)
    })
    .await
    .map_err(internal)?
    .map_err(internal)?;

    Ok(Json(SaveResponseResult { updated }))
}

/// Dashboard counters across every mailbox.
pub async fn overview(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let store = state.clone();
    let messages = tokio::task::spawn_blocking(move || store.store.all_messages())
        .await
        .map_err(internal)?
        .map_err(internal)?;

    let answered = messages.iter().filter(|m| m.is_answered()).count();
    Ok(Json(OverviewResponse {
        total_messages: messages.len(),
        answered,
        unanswered: messages.len() - answered,
        staff_count: state.roster.len(),
    }))
}

fn message_view(state: &AppState, record: MessageRecord) -> MessageView {
    // Display name resolved from the roster at read time; unknown ids
    // fall back to the raw number.
    let recipient_name = state
        .roster
        .find(&record.recipient_id)
        .map(|s| s.name.clone())
        .unwrap_or_else(|| record.recipient_id.clone());
    let answered = record.is_answered();

    MessageView {
        sender_id: record.sender_id,
        recipient_id: record.recipient_id,
        recipient_name,
        body: record.body,
        response: record.response,
        created_at: record.created_at,
        answered,
    }
}
