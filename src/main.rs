//! Interest Feed Service — Binary Entrypoint
//! Boots the Axum HTTP server, wiring routes, shared state, and middleware.

use std::path::PathBuf;
use std::sync::Arc;

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use interest_feed::api::{self, AppState};
use interest_feed::config::{
    start_hot_reload_thread, ConfigHandle, FeedConfig, DEFAULT_FEED_CONFIG_PATH,
    ENV_FEED_CONFIG_PATH,
};
use interest_feed::metrics::Metrics;
use interest_feed::store::MemoryStore;

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - FEED_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("FEED_DEV_LOG").ok().is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("interest_feed=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    // Initialize dev tracing early (no-op in production).
    enable_dev_tracing();

    let config = FeedConfig::load();
    let metrics = Metrics::init(config.interest_increment);

    let handle = ConfigHandle::new(config);

    // If hot reload is enabled, spawn the background watcher.
    let path = std::env::var(ENV_FEED_CONFIG_PATH)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_FEED_CONFIG_PATH));
    start_hot_reload_thread(handle.clone(), path);

    let state = AppState::new(Arc::new(MemoryStore::new()), handle);
    let router = api::create_router(state).merge(metrics.router());

    Ok(router.into())
}
