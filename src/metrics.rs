use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize Prometheus metrics exporter
/// Returns a handle that can be used to render metrics for scraping
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        // Webhook processing duration buckets, in milliseconds
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Full("webhooks.processing_ms".to_string()),
            &[
                1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0,
            ],
        )
        .expect("failed to set buckets for webhooks.processing_ms")
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Initialize webhook intake metrics to zero so they appear in Prometheus
/// queries even before the first delivery arrives. Must run before the
/// metrics server starts to avoid scraping a partial set.
pub fn initialize_webhook_metrics() {
    metrics::counter!("webhooks.received").absolute(0);
    metrics::counter!("webhooks.signature_invalid").absolute(0);
    metrics::counter!("webhooks.rejected").absolute(0);
    metrics::counter!("webhooks.failed").absolute(0);

    metrics::counter!("bookings.stored").absolute(0);
    metrics::counter!("bookings.store_failed").absolute(0);

    metrics::counter!("refunds.issued").absolute(0);
    metrics::counter!("refunds.failed").absolute(0);

    metrics::counter!("analytics.events_emitted").absolute(0);
}

/// Background task updating process-level gauges every 5 seconds
pub async fn process_metrics_task() {
    let start_time = Instant::now();

    loop {
        metrics::gauge!("process.uptime.seconds").set(start_time.elapsed().as_secs() as f64);
        metrics::gauge!("process.is_up").set(1.0);

        tokio::time::sleep(Duration::from_secs(5)).await;
    }
}

/// Start a standalone metrics server on the specified port, exposing the
/// Prometheus scrape endpoint independently of the main HTTP listener.
pub async fn start_metrics_server(port: u16) {
    let handle = init_metrics();
    METRICS_HANDLE
        .set(handle)
        .expect("Metrics handle already initialized");

    tokio::spawn(process_metrics_task());

    let app = Router::new().route(
        "/metrics",
        get(|| async {
            let handle = METRICS_HANDLE
                .get()
                .expect("Metrics handle not initialized");
            handle.render()
        }),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting metrics server on http://{}/metrics", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind metrics server");

    axum::serve(listener, app)
        .await
        .expect("Metrics server failed");
}
