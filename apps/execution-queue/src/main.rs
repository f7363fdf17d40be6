//! Execution Queue Binary
//!
//! Starts the order-execution work queue worker.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin execution-queue
//! ```
//!
//! # Environment Variables
//!
//! - `QUEUE_POLL_INTERVAL_MS`: Worker polling interval (default: 5000)
//! - `QUEUE_DRAIN_TIMEOUT_SECS`: Drain ceiling on shutdown (default: 30)
//! - `QUEUE_MAX_ATTEMPTS`: Default attempt ceiling (default: 3)
//! - `METRICS_ENABLED`: Start the Prometheus exporter (default: true)
//! - `METRICS_PORT`: Prometheus scrape port (default: 9464)
//! - `RUST_LOG`: Log level (default: info)

use std::net::SocketAddr;
use std::sync::Arc;

use execution_queue::application::services::{Worker, WorkQueueEngine};
use execution_queue::application::use_cases::Handlers;
use execution_queue::config::QueueConfig;
use execution_queue::infrastructure::broker::MockBrokerGateway;
use execution_queue::infrastructure::decision::NoOpDecisionEngine;
use execution_queue::infrastructure::enforcement::PermissiveEnforcement;
use execution_queue::infrastructure::persistence::{
    InMemoryAgentStatusStore, InMemoryOrderStore, InMemoryWorkItemRepository,
};
use execution_queue::infrastructure::router::PassthroughOrderRouter;
use execution_queue::observability;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    observability::init_tracing();

    tracing::info!("Starting execution queue");

    let config = parse_config();
    log_config(&config);

    if config.observability.metrics_enabled {
        let addr: SocketAddr = ([0, 0, 0, 0], config.observability.metrics_port).into();
        match observability::metrics::init_metrics(addr) {
            Ok(()) => tracing::info!(%addr, "Prometheus exporter listening"),
            Err(e) => tracing::warn!(error = %e, "Metrics exporter failed to start; continuing"),
        }
    }

    // Explicit construction: the queue, its repository, and every collaborator
    // are wired here and owned by this entry point, not by module state.
    let repository = Arc::new(InMemoryWorkItemRepository::new());
    let gateway = Arc::new(MockBrokerGateway::new());
    let enforcement = Arc::new(PermissiveEnforcement::new());
    let router = Arc::new(PassthroughOrderRouter::new());
    let status = Arc::new(InMemoryAgentStatusStore::new());
    let orders = Arc::new(InMemoryOrderStore::new());
    let decisions = Arc::new(NoOpDecisionEngine);

    let engine = Arc::new(
        WorkQueueEngine::new(Arc::clone(&repository))
            .with_default_max_attempts(config.retry.max_attempts),
    );
    let handlers = Arc::new(Handlers::new(
        gateway,
        Arc::clone(&enforcement),
        enforcement,
        router,
        status,
        orders,
        decisions,
    ));

    let worker = Worker::spawn(Arc::clone(&engine), handlers, &config.worker);
    tracing::info!("Execution queue ready");

    wait_for_shutdown().await;

    let outcome = worker.drain().await;
    tracing::info!(?outcome, "Execution queue stopped");
    Ok(())
}

/// Load .env file from the current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Parse configuration from environment variables over the defaults.
fn parse_config() -> QueueConfig {
    let mut config = QueueConfig::default();

    if let Some(value) = env_parse("QUEUE_POLL_INTERVAL_MS") {
        config.worker.poll_interval_ms = value;
    }
    if let Some(value) = env_parse("QUEUE_DRAIN_TIMEOUT_SECS") {
        config.worker.drain_timeout_secs = value;
    }
    if let Some(value) = env_parse("QUEUE_MAX_ATTEMPTS") {
        config.retry.max_attempts = value;
    }
    if let Ok(value) = std::env::var("METRICS_ENABLED") {
        config.observability.metrics_enabled = value.to_lowercase() != "false" && value != "0";
    }
    if let Some(value) = env_parse("METRICS_PORT") {
        config.observability.metrics_port = value;
    }

    config
}

/// Parse one environment variable, ignoring unset or malformed values.
fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Log the effective configuration.
fn log_config(config: &QueueConfig) {
    tracing::info!(
        poll_interval_ms = config.worker.poll_interval_ms,
        drain_timeout_secs = config.worker.drain_timeout_secs,
        max_attempts = config.retry.max_attempts,
        metrics_enabled = config.observability.metrics_enabled,
        "Configuration loaded"
    );
}

/// Wait for SIGTERM or SIGINT.
///
/// # Panics
///
/// Panics if signal handlers cannot be installed: a process that cannot
/// respond to termination signals is worse than one that fails at startup.
#[allow(clippy::expect_used)]
async fn wait_for_shutdown() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
