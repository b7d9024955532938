use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One staff member, loaded once from the static roster dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffRecord {
    pub no: u32,
    pub name: String,
    pub id_number: String,
    pub title: String,
    pub division: String,
    pub photo: String,
}

/// One division, loaded once from the static division dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DivisionRecord {
    pub id: String,
    pub abbr: String,
    pub name: String,
    pub image: String,
}

/// A "message & impression" note addressed to one staff member.
///
/// Within a recipient's stored list a record is located by the pair
/// (sender_id, created_at). Records are never deleted or reordered; the
/// only mutation is filling in `response`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub sender_id: String,
    pub recipient_id: String,
    pub body: String,
    #[serde(default)]
    pub response: String,
    pub created_at: DateTime<Utc>,
}

impl MessageRecord {
    /// A fresh record: response empty, creation timestamp assigned now.
    pub fn new(sender_id: &str, recipient_id: &str, body: &str) -> Self {
        Self {
            sender_id: sender_id.to_string(),
            recipient_id: recipient_id.to_string(),
            body: body.to_string(),
            response: String::new(),
            created_at: Utc::now(),
        }
    }

    /// Answered once a non-empty response has been saved. Re-editing a
    /// reply keeps the record answered; there is no way back.
    pub fn is_answered(&self) -> bool {
        !self.response.is_empty()
    }
}

/// Deserialization shape of the seed dataset (`messages.json`).
///
/// Older exports denormalized the recipient display name onto each entry;
/// the field still deserializes but is dropped at import. Names are
/// resolved from the roster at read time instead.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedRecord {
    pub sender_id: String,
    pub recipient_id: String,
    #[serde(default)]
    pub recipient_name: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}
