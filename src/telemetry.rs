//! Logging and metrics setup.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::TelemetryConfig;
use crate::{Error, Result};

const DEFAULT_FILTER: &str = "voicebot=info";

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the default filter. JSON output is meant for
/// container log collectors.
pub fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true).json())
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(false).compact())
            .init();
    }
}

/// Serve Prometheus metrics on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| Error::Config(format!("Failed to start metrics exporter on {}: {}", addr, e)))?;

    tracing::info!(%addr, "Metrics exporter listening");
    Ok(())
}

/// Set up logging and, when configured, the metrics exporter.
pub fn init(cfg: &TelemetryConfig) -> Result<()> {
    init_logging(cfg.json_logs);
    if let Some(addr) = cfg.metrics_addr {
        init_metrics(addr)?;
    }
    Ok(())
}
