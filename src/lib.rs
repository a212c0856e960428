//! calbridge - webhook intake and booking store for the mentorship platform
//!
//! Receives signed event deliveries from the scheduling provider, verifies
//! them with HMAC-SHA-256 over the raw body, and dispatches each event kind
//! to its side effect: persist a booking, refund a no-show, record an
//! analytics event, or acknowledge and log.

pub mod actions;
pub mod analytics_events;
pub mod analytics_events_repo;
pub mod bookings;
pub mod bookings_repo;
pub mod cal_events;
pub mod commands;
pub mod db;
pub mod metrics;
pub mod schema;
pub mod signature;
pub mod stripe_refunds;
pub mod web;
pub mod webhook_deliveries;
pub mod webhook_deliveries_repo;
pub mod webhook_dispatcher;

pub use web::{AppState, PgPool, build_router};
pub use webhook_dispatcher::{DispatchOutcome, WebhookDispatcher, WebhookError};
