use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;

pub mod bookings;
pub mod status;
pub mod webhook_deliveries;
pub mod webhooks;

pub use bookings::*;
pub use status::*;
pub use webhook_deliveries::*;
pub use webhooks::*;

/// Standard envelope for single-object responses
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// Standard envelope for list responses
#[derive(Debug, Serialize)]
pub struct DataListResponse<T: Serialize> {
    pub data: Vec<T>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// JSON error body with the given status
pub fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}
