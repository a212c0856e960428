use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use bytes::Bytes;
use serde::Serialize;
use tracing::{error, warn};

use crate::web::AppState;
use crate::webhook_dispatcher::DispatchOutcome;

use super::{BookingView, json_error};

/// Header carrying the hex HMAC-SHA-256 digest of the raw request body.
pub const SIGNATURE_HEADER: &str = "X-Cal-Signature-256";

/// Body of the default acknowledgement response
#[derive(Debug, Serialize)]
pub struct ReceivedResponse {
    pub received: bool,
}

/// POST /webhooks/cal
/// Receive a signed event delivery from the scheduling provider
pub async fn receive_cal_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    metrics::counter!("webhooks.received").increment(1);
    let start = std::time::Instant::now();

    let provided_signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());

    let result = state
        .dispatcher
        .handle_delivery(provided_signature, &body)
        .await;

    let duration_ms = start.elapsed().as_millis() as f64;
    metrics::histogram!("webhooks.processing_ms").record(duration_ms);

    match result {
        Ok(DispatchOutcome::Received) => {
            Json(ReceivedResponse { received: true }).into_response()
        }
        Ok(DispatchOutcome::BookingStored(booking)) => {
            (StatusCode::CREATED, Json(BookingView::from(booking))).into_response()
        }
        Err(e) => {
            let status = e.status_code();
            if status.is_server_error() {
                metrics::counter!("webhooks.failed").increment(1);
                error!(error = %e, "Webhook delivery failed downstream");
            } else {
                metrics::counter!("webhooks.rejected").increment(1);
                warn!(error = %e, "Rejected webhook delivery");
            }
            json_error(status, &e.to_string()).into_response()
        }
    }
}
