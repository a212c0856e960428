//! Wire format for scheduling-provider webhook deliveries.
//!
//! Every delivery is a JSON object `{triggerEvent, payload}`. The payload
//! shape depends on the event kind: only `BOOKING_CREATED` is held to the full
//! booking schema; the other kinds carry whatever the provider sends and are
//! only probed for their `metadata` bag.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Event kinds delivered by the scheduling provider.
///
/// `Unrecognized` covers any tag outside the known set; those deliveries are
/// logged and acknowledged rather than rejected, so a provider rollout of a
/// new event kind never turns into an error storm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEvent {
    BookingCreated,
    NoShowAfterHosts,
    TranscriptionGenerated,
    RecordingReady,
    MeetingStarted,
    MeetingEnded,
    BookingCancelled,
    Unrecognized,
}

impl TriggerEvent {
    pub fn parse(tag: &str) -> Self {
        match tag {
            "BOOKING_CREATED" => Self::BookingCreated,
            "AFTER_HOSTS_CAL_VIDEO_NO_SHOW" => Self::NoShowAfterHosts,
            "RECORDING_TRANSCRIPTION_GENERATED" => Self::TranscriptionGenerated,
            "RECORDING_READY" => Self::RecordingReady,
            "MEETING_STARTED" => Self::MeetingStarted,
            "MEETING_ENDED" => Self::MeetingEnded,
            "BOOKING_CANCELLED" => Self::BookingCancelled,
            _ => Self::Unrecognized,
        }
    }
}

/// One webhook delivery as it arrives on the wire. The raw tag string is kept
/// alongside the payload so unrecognized kinds can be logged verbatim.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEnvelope {
    pub trigger_event: String,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    pub time_zone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organizer {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Optional metadata bag attached to booking payloads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingMetadata {
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub mentor_user_id: Option<String>,
    #[serde(default)]
    pub actor_user_id: Option<String>,
    #[serde(default)]
    pub video_call_url: Option<String>,
}

impl BookingMetadata {
    /// Pull the metadata bag out of an arbitrary event payload.
    ///
    /// Events other than `BOOKING_CREATED` are not schema-validated, so a
    /// missing or malformed bag collapses to the empty default.
    pub fn from_payload(payload: &serde_json::Value) -> Self {
        payload
            .get("metadata")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }
}

/// Fully validated payload of a `BOOKING_CREATED` delivery.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingPayload {
    pub booking_id: i64,
    pub uid: String,
    pub title: String,
    pub attendees: Vec<Attendee>,
    pub start_time: DateTime<Utc>,
    /// Duration in minutes.
    pub length: i32,
    pub organizer: Organizer,
    pub event_type_id: i64,
    #[serde(default)]
    pub metadata: BookingMetadata,
}

impl BookingPayload {
    /// Semantic checks beyond what deserialization enforces.
    pub fn validate(&self) -> Result<(), String> {
        if self.attendees.is_empty() {
            return Err("booking has no attendees".to_string());
        }
        if self.length < 1 {
            return Err(format!("booking length must be at least 1 minute, got {}", self.length));
        }
        Ok(())
    }

    /// When the booking ends: start time plus its length in minutes.
    pub fn end_time(&self) -> DateTime<Utc> {
        self.start_time + Duration::minutes(self.length as i64)
    }
}
