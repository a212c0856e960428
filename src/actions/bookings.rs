use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use crate::bookings::Booking;
use crate::bookings_repo::BookingsRepository;
use crate::web::AppState;

use super::{DataListResponse, DataResponse, json_error};

const DEFAULT_LIST_LIMIT: i64 = 50;
const MAX_LIST_LIMIT: i64 = 500;

/// View model for bookings (API response). The raw delivery payload stays in
/// the database as audit trail and is not exposed here.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingView {
    pub id: String,
    pub booking_id: i64,
    pub uid: String,
    pub title: String,
    pub attendees: serde_json::Value,
    pub organizer_id: i64,
    pub organizer_email: String,
    pub organizer_username: Option<String>,
    pub organizer_name: Option<String>,
    pub start_time: String,
    pub end_time: String,
    pub duration_minutes: i32,
    pub event_type_id: i64,
    pub payment_id: Option<String>,
    pub mentor_user_id: Option<String>,
    pub video_call_url: Option<String>,
    pub created_at: String,
}

impl From<Booking> for BookingView {
    fn from(b: Booking) -> Self {
        Self {
            id: b.id.to_string(),
            booking_id: b.booking_id,
            uid: b.uid,
            title: b.title,
            attendees: b.attendees,
            organizer_id: b.organizer_id,
            organizer_email: b.organizer_email,
            organizer_username: b.organizer_username,
            organizer_name: b.organizer_name,
            start_time: b.start_time.to_rfc3339(),
            end_time: b.end_time.to_rfc3339(),
            duration_minutes: b.duration_minutes,
            event_type_id: b.event_type_id,
            payment_id: b.payment_id,
            mentor_user_id: b.mentor_user_id,
            video_call_url: b.video_call_url,
            created_at: b.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListBookingsQuery {
    pub limit: Option<i64>,
}

/// GET /bookings
/// List stored bookings, most recent first
pub async fn list_bookings(
    State(state): State<AppState>,
    Query(query): Query<ListBookingsQuery>,
) -> impl IntoResponse {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);

    let repo = BookingsRepository::new(state.pool.clone());

    match repo.list_recent(limit).await {
        Ok(bookings) => {
            let views: Vec<BookingView> = bookings.into_iter().map(BookingView::from).collect();
            Json(DataListResponse { data: views }).into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to list bookings");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to list bookings")
                .into_response()
        }
    }
}

/// GET /bookings/{id}
/// Get a stored booking
pub async fn get_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> impl IntoResponse {
    let repo = BookingsRepository::new(state.pool.clone());

    match repo.get_by_id(booking_id).await {
        Ok(Some(booking)) => Json(DataResponse {
            data: BookingView::from(booking),
        })
        .into_response(),
        Ok(None) => json_error(StatusCode::NOT_FOUND, "Booking not found").into_response(),
        Err(e) => {
            error!(booking_id = %booking_id, error = %e, "Failed to get booking");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to get booking").into_response()
        }
    }
}
