use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::web::AppState;
use crate::webhook_deliveries::WebhookDelivery;
use crate::webhook_deliveries_repo::WebhookDeliveriesRepository;

use super::{DataListResponse, json_error};

const DEFAULT_LIST_LIMIT: i64 = 50;
const MAX_LIST_LIMIT: i64 = 500;

/// View model for journal entries (API response)
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookDeliveryView {
    pub id: String,
    pub trigger_event: String,
    pub payload: serde_json::Value,
    pub processed: bool,
    pub processing_error: Option<String>,
    pub created_at: String,
}

impl From<WebhookDelivery> for WebhookDeliveryView {
    fn from(d: WebhookDelivery) -> Self {
        Self {
            id: d.id.to_string(),
            trigger_event: d.trigger_event,
            payload: d.payload,
            processed: d.processed,
            processing_error: d.processing_error,
            created_at: d.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListDeliveriesQuery {
    pub limit: Option<i64>,
}

/// GET /webhook-deliveries
/// List journaled deliveries, most recent first
pub async fn list_webhook_deliveries(
    State(state): State<AppState>,
    Query(query): Query<ListDeliveriesQuery>,
) -> impl IntoResponse {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);

    let repo = WebhookDeliveriesRepository::new(state.pool.clone());

    match repo.list_recent(limit).await {
        Ok(deliveries) => {
            let views: Vec<WebhookDeliveryView> = deliveries
                .into_iter()
                .map(WebhookDeliveryView::from)
                .collect();
            Json(DataListResponse { data: views }).into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to list webhook deliveries");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to list webhook deliveries",
            )
            .into_response()
        }
    }
}
