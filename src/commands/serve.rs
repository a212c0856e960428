use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{Instrument, info, warn};

use crate::actions;
use crate::analytics_events_repo::AnalyticsEventsRepository;
use crate::bookings_repo::BookingsRepository;
use crate::db;
use crate::stripe_refunds::{RefundsDisabled, StripeRefunds};
use crate::web::{AppState, PgPool, start_web_server};
use crate::webhook_deliveries_repo::WebhookDeliveriesRepository;
use crate::webhook_dispatcher::{RefundIssuer, WebhookDispatcher};

/// Environment-derived settings for the serve command. Everything the
/// dispatcher needs is resolved here once, so handlers never read ambient
/// process state.
#[derive(Debug)]
pub struct ServeConfig {
    pub webhook_secret: String,
    pub stripe_secret_key: Option<String>,
    pub metrics_port: Option<u16>,
}

impl ServeConfig {
    pub fn from_env() -> Result<Self> {
        let webhook_secret =
            env::var("CAL_WEBHOOK_SECRET").context("CAL_WEBHOOK_SECRET must be set")?;

        let stripe_secret_key = env::var("STRIPE_SECRET_KEY").ok();

        let metrics_port = match env::var("METRICS_PORT") {
            Ok(value) => Some(
                value
                    .parse::<u16>()
                    .context("METRICS_PORT must be a valid port number")?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            webhook_secret,
            stripe_secret_key,
            metrics_port,
        })
    }
}

/// Run migrations, wire up the dispatcher, and start the HTTP server
pub async fn handle_serve(interface: String, port: u16, pool: PgPool) -> Result<()> {
    sentry::configure_scope(|scope| {
        scope.set_tag("operation", "serve");
    });

    let config = ServeConfig::from_env()?;

    db::run_migrations(&pool)?;

    let refunds: Arc<dyn RefundIssuer> = match config.stripe_secret_key {
        Some(secret_key) => Arc::new(StripeRefunds::new(secret_key)),
        None => {
            warn!("STRIPE_SECRET_KEY is not set; no-show refunds are disabled");
            Arc::new(RefundsDisabled)
        }
    };

    let dispatcher = Arc::new(WebhookDispatcher::new(
        config.webhook_secret,
        Arc::new(BookingsRepository::new(pool.clone())),
        refunds,
        Arc::new(AnalyticsEventsRepository::new(pool.clone())),
        Arc::new(WebhookDeliveriesRepository::new(pool.clone())),
    ));

    // Metrics must be initialized before the scrape server starts
    if let Some(metrics_port) = config.metrics_port {
        crate::metrics::initialize_webhook_metrics();
        info!("Starting metrics server on port {}", metrics_port);
        tokio::spawn(
            async move {
                crate::metrics::start_metrics_server(metrics_port).await;
            }
            .instrument(tracing::info_span!("metrics_server")),
        );
    }

    actions::init_server_start_time();

    let state = AppState { pool, dispatcher };
    start_web_server(&interface, port, state).await
}
