//! Wire types for the Zoom OAuth and Meetings APIs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Scheduled meeting (fixed start time).
pub const MEETING_TYPE_SCHEDULED: u8 = 2;
pub const MEETING_DURATION_MINUTES: u32 = 60;

// ── OAuth ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Lifetime in seconds.
    pub expires_in: i64,
}

// ── Meetings ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct CreateMeetingRequest {
    pub topic: String,
    #[serde(rename = "type")]
    pub meeting_type: u8,
    pub start_time: String,
    pub duration: u32,
    pub timezone: String,
    pub settings: MeetingSettings,
}

impl CreateMeetingRequest {
    /// An instant-start, 60 minute meeting that participants can join without
    /// the host and without registration or a waiting room.
    pub fn starting_at(topic: &str, start: DateTime<Utc>) -> Self {
        Self {
            topic: topic.to_string(),
            meeting_type: MEETING_TYPE_SCHEDULED,
            start_time: start.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            duration: MEETING_DURATION_MINUTES,
            timezone: "UTC".to_string(),
            settings: MeetingSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MeetingSettings {
    pub host_video: bool,
    pub participant_video: bool,
    pub join_before_host: bool,
    pub waiting_room: bool,
    pub mute_upon_entry: bool,
    /// 0 = automatically approve.
    pub approval_type: u8,
    /// 1 = attendees register once for all occurrences.
    pub registration_type: u8,
    pub use_pmi: bool,
}

impl Default for MeetingSettings {
    fn default() -> Self {
        Self {
            host_video: true,
            participant_video: true,
            join_before_host: true,
            waiting_room: false,
            mute_upon_entry: false,
            approval_type: 0,
            registration_type: 1,
            use_pmi: false,
        }
    }
}

/// The subset of a Zoom meeting object this service relies on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MeetingResource {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub join_url: String,
    pub start_url: String,
    pub topic: String,
}

/// Zoom meeting ids are 64-bit integers; accept strings as well.
fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Num(u64),
        Str(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Num(n) => Ok(n.to_string()),
        RawId::Str(s) if !s.trim().is_empty() => Ok(s),
        RawId::Str(_) => Err(serde::de::Error::custom("empty meeting id")),
    }
}
