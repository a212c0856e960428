use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cal_events::BookingPayload;

/// Diesel model for the bookings table
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::bookings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Booking {
    pub id: Uuid,
    pub booking_id: i64,
    pub uid: String,
    pub title: String,
    pub attendees: serde_json::Value,
    pub organizer_id: i64,
    pub organizer_email: String,
    pub organizer_username: Option<String>,
    pub organizer_name: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub event_type_id: i64,
    pub payment_id: Option<String>,
    pub mentor_user_id: Option<String>,
    pub video_call_url: Option<String>,
    /// The delivery payload exactly as received, kept as an audit trail.
    pub raw_payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Insert model for new bookings
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::bookings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewBooking {
    pub booking_id: i64,
    pub uid: String,
    pub title: String,
    pub attendees: serde_json::Value,
    pub organizer_id: i64,
    pub organizer_email: String,
    pub organizer_username: Option<String>,
    pub organizer_name: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub event_type_id: i64,
    pub payment_id: Option<String>,
    pub mentor_user_id: Option<String>,
    pub video_call_url: Option<String>,
    pub raw_payload: serde_json::Value,
}

impl NewBooking {
    /// Build the record to persist from a validated payload. The end time is
    /// computed here (start + length minutes); `raw_payload` is the delivery
    /// body before schema validation.
    pub fn from_payload(payload: &BookingPayload, raw_payload: serde_json::Value) -> Self {
        Self {
            booking_id: payload.booking_id,
            uid: payload.uid.clone(),
            title: payload.title.clone(),
            attendees: serde_json::to_value(&payload.attendees)
                .unwrap_or(serde_json::Value::Array(vec![])),
            organizer_id: payload.organizer.id,
            organizer_email: payload.organizer.email.clone(),
            organizer_username: payload.organizer.username.clone(),
            organizer_name: payload.organizer.name.clone(),
            start_time: payload.start_time,
            end_time: payload.end_time(),
            duration_minutes: payload.length,
            event_type_id: payload.event_type_id,
            payment_id: payload.metadata.payment_id.clone(),
            mentor_user_id: payload.metadata.mentor_user_id.clone(),
            video_call_url: payload.metadata.video_call_url.clone(),
            raw_payload,
        }
    }
}
