//! Customer Sync upstream source.
//!
//! Serves the bundled customer dataset on port 5000 for the pipeline to
//! ingest.

#![cfg_attr(not(test), forbid(unsafe_code))]

use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use customer_sync_upstream::config::UpstreamConfig;
use customer_sync_upstream::{Dataset, routes};

#[tokio::main]
async fn main() {
    let config = UpstreamConfig::from_env().expect("Failed to load configuration");

    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "customer_sync_upstream=info,tower_http=debug".into());

    let json_layer = config
        .json_logs
        .then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!config.json_logs).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();

    let dataset = Dataset::load_or_empty(&config.data_path);

    let app = routes::router()
        .layer(TraceLayer::new_for_http())
        .with_state(dataset);

    let addr = config.socket_addr();
    tracing::info!("upstream listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app).await.expect("Server error");
}

