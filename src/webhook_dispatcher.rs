//! Webhook intake and dispatch.
//!
//! A delivery moves through three steps: signature verification over the raw
//! body, JSON parsing, and a dispatch on the event kind. Verification always
//! runs first, on the exact bytes received. The dispatcher owns no transport
//! concerns; the HTTP handler in `actions::webhooks` maps its result onto
//! status codes.
//!
//! All side effects go through injected collaborators (`BookingStore`,
//! `RefundIssuer`, `AnalyticsSink`, `DeliveryJournal`), so tests drive the
//! full flow with in-memory fakes and production wires in the diesel
//! repositories plus the Stripe refund client.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::http::StatusCode;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::analytics_events::{COMPLETED_BOOKING, NewAnalyticsEvent};
use crate::bookings::{Booking, NewBooking};
use crate::cal_events::{BookingMetadata, BookingPayload, TriggerEvent, WebhookEnvelope};
use crate::signature;
use crate::webhook_deliveries::{NewWebhookDelivery, WebhookDelivery};

/// Persists bookings derived from BOOKING_CREATED deliveries.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn create_booking(&self, new_booking: NewBooking) -> Result<Booking>;
}

/// Issues refunds for no-show bookings through the payment provider.
#[async_trait]
pub trait RefundIssuer: Send + Sync {
    async fn issue_refund(&self, payment_id: &str) -> Result<()>;
}

/// Records analytics events. Failures are logged, never surfaced.
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn emit(&self, new_event: NewAnalyticsEvent) -> Result<()>;
}

/// Audit journal for authenticated, parseable deliveries. All journal calls
/// are best-effort: an error here never changes the HTTP response.
#[async_trait]
pub trait DeliveryJournal: Send + Sync {
    async fn record(&self, new_delivery: NewWebhookDelivery) -> Result<WebhookDelivery>;
    async fn mark_processed(&self, delivery_id: Uuid) -> Result<()>;
    async fn mark_failed(&self, delivery_id: Uuid, error: &str) -> Result<()>;
}

/// Errors a delivery can fail with, mapped onto HTTP statuses by the handler.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("invalid webhook signature")]
    InvalidSignature,
    #[error("request body is not valid JSON")]
    MalformedPayload(#[source] serde_json::Error),
    #[error("booking payload failed validation: {0}")]
    SchemaValidation(String),
    #[error("no-show event has no payment id in metadata")]
    MissingPaymentId,
    #[error("failed to store booking")]
    BookingStorage(#[source] anyhow::Error),
    #[error("failed to issue refund")]
    RefundFailed(#[source] anyhow::Error),
}

impl WebhookError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::InvalidSignature
            | WebhookError::MalformedPayload(_)
            | WebhookError::SchemaValidation(_)
            | WebhookError::MissingPaymentId => StatusCode::BAD_REQUEST,
            WebhookError::BookingStorage(_) | WebhookError::RefundFailed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// What a successful delivery produced.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Acknowledged; no record to return (log-only kinds, refunds, analytics).
    Received,
    /// A BOOKING_CREATED delivery was stored (or was already stored and the
    /// existing record was returned on redelivery).
    BookingStored(Booking),
}

pub struct WebhookDispatcher {
    webhook_secret: String,
    bookings: Arc<dyn BookingStore>,
    refunds: Arc<dyn RefundIssuer>,
    analytics: Arc<dyn AnalyticsSink>,
    journal: Arc<dyn DeliveryJournal>,
}

impl WebhookDispatcher {
    pub fn new(
        webhook_secret: String,
        bookings: Arc<dyn BookingStore>,
        refunds: Arc<dyn RefundIssuer>,
        analytics: Arc<dyn AnalyticsSink>,
        journal: Arc<dyn DeliveryJournal>,
    ) -> Self {
        Self {
            webhook_secret,
            bookings,
            refunds,
            analytics,
            journal,
        }
    }

    /// Process one delivery: authenticate, parse, journal, dispatch.
    pub async fn handle_delivery(
        &self,
        provided_signature: Option<&str>,
        body: &[u8],
    ) -> Result<DispatchOutcome, WebhookError> {
        // Authenticate over the raw bytes before touching the JSON
        let authentic = provided_signature
            .is_some_and(|sig| signature::verify(&self.webhook_secret, body, sig));
        if !authentic {
            metrics::counter!("webhooks.signature_invalid").increment(1);
            return Err(WebhookError::InvalidSignature);
        }

        let envelope: WebhookEnvelope =
            serde_json::from_slice(body).map_err(WebhookError::MalformedPayload)?;

        let journal_id = match self
            .journal
            .record(NewWebhookDelivery {
                trigger_event: envelope.trigger_event.clone(),
                payload: envelope.payload.clone(),
            })
            .await
        {
            Ok(delivery) => Some(delivery.id),
            Err(e) => {
                warn!(error = %e, "Failed to journal webhook delivery");
                None
            }
        };

        let result = self.dispatch(&envelope).await;

        if let Some(delivery_id) = journal_id {
            let journal_result = match &result {
                Ok(_) => self.journal.mark_processed(delivery_id).await,
                Err(e) => self.journal.mark_failed(delivery_id, &e.to_string()).await,
            };
            if let Err(e) = journal_result {
                warn!(error = %e, delivery_id = %delivery_id, "Failed to update delivery journal");
            }
        }

        result
    }

    async fn dispatch(
        &self,
        envelope: &WebhookEnvelope,
    ) -> Result<DispatchOutcome, WebhookError> {
        match TriggerEvent::parse(&envelope.trigger_event) {
            TriggerEvent::BookingCreated => self.handle_booking_created(envelope).await,
            TriggerEvent::NoShowAfterHosts => self.handle_no_show(envelope).await,
            TriggerEvent::MeetingEnded => self.handle_meeting_ended(envelope).await,
            TriggerEvent::TranscriptionGenerated
            | TriggerEvent::RecordingReady
            | TriggerEvent::MeetingStarted
            | TriggerEvent::BookingCancelled => {
                info!(trigger_event = %envelope.trigger_event, "Acknowledged webhook event, no action");
                Ok(DispatchOutcome::Received)
            }
            TriggerEvent::Unrecognized => {
                info!(trigger_event = %envelope.trigger_event, "Unhandled webhook event kind");
                Ok(DispatchOutcome::Received)
            }
        }
    }

    async fn handle_booking_created(
        &self,
        envelope: &WebhookEnvelope,
    ) -> Result<DispatchOutcome, WebhookError> {
        let payload: BookingPayload = serde_json::from_value(envelope.payload.clone())
            .map_err(|e| WebhookError::SchemaValidation(e.to_string()))?;
        payload.validate().map_err(WebhookError::SchemaValidation)?;

        let new_booking = NewBooking::from_payload(&payload, envelope.payload.clone());
        let booking = self
            .bookings
            .create_booking(new_booking)
            .await
            .map_err(|e| {
                // Raw payload goes to the log for postmortem; the insert is gone
                error!(error = %e, payload = %envelope.payload, "Failed to store booking");
                metrics::counter!("bookings.store_failed").increment(1);
                WebhookError::BookingStorage(e)
            })?;

        metrics::counter!("bookings.stored").increment(1);
        info!(uid = %booking.uid, booking_id = booking.booking_id, "Stored booking");
        Ok(DispatchOutcome::BookingStored(booking))
    }

    async fn handle_no_show(
        &self,
        envelope: &WebhookEnvelope,
    ) -> Result<DispatchOutcome, WebhookError> {
        let metadata = BookingMetadata::from_payload(&envelope.payload);
        let payment_id = metadata.payment_id.ok_or(WebhookError::MissingPaymentId)?;

        self.refunds.issue_refund(&payment_id).await.map_err(|e| {
            error!(error = %e, payment_id = %payment_id, "Failed to issue no-show refund");
            metrics::counter!("refunds.failed").increment(1);
            WebhookError::RefundFailed(e)
        })?;

        metrics::counter!("refunds.issued").increment(1);
        info!(payment_id = %payment_id, "Issued refund for no-show booking");
        Ok(DispatchOutcome::Received)
    }

    async fn handle_meeting_ended(
        &self,
        envelope: &WebhookEnvelope,
    ) -> Result<DispatchOutcome, WebhookError> {
        let metadata = BookingMetadata::from_payload(&envelope.payload);
        let Some(mentor_user_id) = metadata.mentor_user_id else {
            return Ok(DispatchOutcome::Received);
        };

        let event = NewAnalyticsEvent {
            kind: COMPLETED_BOOKING.to_string(),
            target_user_id: mentor_user_id.clone(),
            actor_user_id: metadata.actor_user_id,
        };
        // Fire-and-forget: analytics never fails a delivery
        match self.analytics.emit(event).await {
            Ok(()) => {
                metrics::counter!("analytics.events_emitted").increment(1);
                info!(mentor_user_id = %mentor_user_id, "Recorded completed booking event");
            }
            Err(e) => {
                warn!(error = %e, mentor_user_id = %mentor_user_id, "Failed to record analytics event");
            }
        }
        Ok(DispatchOutcome::Received)
    }
}
