use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event kind recorded when a mentorship booking ran to completion.
pub const COMPLETED_BOOKING: &str = "completed_booking";

/// Diesel model for the analytics_events table
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::analytics_events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AnalyticsEvent {
    pub id: Uuid,
    pub kind: String,
    pub target_user_id: String,
    pub actor_user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Insert model for new analytics events
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::analytics_events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewAnalyticsEvent {
    pub kind: String,
    pub target_user_id: String,
    pub actor_user_id: Option<String>,
}
