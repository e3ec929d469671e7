use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::zoom::MeetingResource;

/// Caller-supplied correlation key: the marketplace transaction id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionId(String);

impl TransactionId {
    /// Trims surrounding whitespace; blank or missing ids are rejected.
    pub fn parse(raw: Option<&str>) -> Result<Self, AppError> {
        match raw.map(str::trim) {
            Some(id) if !id.is_empty() => Ok(Self(id.to_string())),
            _ => Err(AppError::Validation("Transaction ID is required".to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Topic given to the remote meeting.
    pub fn meeting_topic(&self) -> String {
        format!("Meeting for Transaction: {}", self.0)
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Locally cached copy of a remote meeting. Replaced wholesale, never patched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingRecord {
    pub meeting_id: String,
    pub join_url: String,
    pub start_url: String,
    pub topic: String,
    pub transaction_id: String,
    pub created_at: DateTime<Utc>,
}

impl MeetingRecord {
    pub fn from_resource(transaction_id: &TransactionId, meeting: MeetingResource) -> Self {
        Self {
            meeting_id: meeting.id,
            join_url: meeting.join_url,
            start_url: meeting.start_url,
            topic: meeting.topic,
            transaction_id: transaction_id.as_str().to_string(),
            created_at: Utc::now(),
        }
    }
}
