use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::StaffRecord;

// -- Errors --

/// Generic error payload shared by the dataset endpoints and the portal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// -- Login --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub id_number: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub staff: StaffRecord,
    pub division: String,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitMessageRequest {
    pub sender_id: String,
    pub body: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SaveResponseRequest {
    pub sender_id: String,
    pub created_at: DateTime<Utc>,
    pub response: String,
}

#[derive(Debug, Serialize)]
pub struct SaveResponseResult {
    pub updated: bool,
}

/// A stored record enriched for display. The recipient name is resolved
/// from the roster at read time and never persisted.
#[derive(Debug, Serialize)]
pub struct MessageView {
    pub sender_id: String,
    pub recipient_id: String,
    pub recipient_name: String,
    pub body: String,
    pub response: String,
    pub created_at: DateTime<Utc>,
    pub answered: bool,
}

// -- Overview --

#[derive(Debug, Serialize)]
pub struct OverviewResponse {
    pub total_messages: usize,
    pub answered: usize,
    pub unanswered: usize,
    pub staff_count: usize,
}
