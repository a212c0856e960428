//! Status endpoint for build information and uptime

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::sync::OnceLock;
use std::time::Instant;

use super::DataResponse;

/// Server start time - initialized on first status request
static SERVER_START_TIME: OnceLock<Instant> = OnceLock::new();

/// Initialize the server start time (call this when the server starts)
pub fn init_server_start_time() {
    SERVER_START_TIME.get_or_init(Instant::now);
}

/// Status response with build and runtime information
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusInfo {
    pub service: &'static str,
    pub version: &'static str,
    /// Binary modification time (ISO 8601), if available
    pub binary_modified: Option<String>,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Human-readable uptime
    pub uptime_human: String,
}

/// Format seconds into a human-readable duration string
fn format_duration(seconds: u64) -> String {
    let days = seconds / 86400;
    let hours = (seconds % 86400) / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if days > 0 {
        format!("{}d {}h {}m {}s", days, hours, minutes, secs)
    } else if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Get binary modification time as ISO 8601 string
fn get_binary_modified_time() -> Option<String> {
    let exe_path = std::env::current_exe().ok()?;
    let metadata = std::fs::metadata(&exe_path).ok()?;
    let modified = metadata.modified().ok()?;

    let duration = modified.duration_since(std::time::UNIX_EPOCH).ok()?;
    chrono::DateTime::from_timestamp(duration.as_secs() as i64, duration.subsec_nanos())
        .map(|dt| dt.to_rfc3339())
}

/// GET /status
/// Returns build information and server uptime
pub async fn get_status() -> impl IntoResponse {
    let start_time = SERVER_START_TIME.get_or_init(Instant::now);
    let uptime_seconds = start_time.elapsed().as_secs();

    let status = StatusInfo {
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        binary_modified: get_binary_modified_time(),
        uptime_seconds,
        uptime_human: format_duration(uptime_seconds),
    };

    (StatusCode::OK, Json(DataResponse { data: status }))
}
