//! HTTP server exposing vnstat reports and Prometheus metrics.
//!
//! Routes:
//! - `/health`: liveness JSON, never token-gated
//! - `/metrics`: Prometheus exposition text
//! - `/json`: raw `vnstat --json`
//! - `/summary`, `/daily`, `/hourly`, `/weekly`, `/yearly`, `/top`, `/oneline`:
//!   vnstat text reports
//! - `/` and anything else: the monthly report

pub mod config;
pub mod handlers;
pub mod router;

// Re-export commonly used items
pub use config::WebConfig;
pub use router::create_app;

use crate::error::{ExporterError, Result};
use crate::metrics::SnapshotSource;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

/// Shared, read-only handler state.
pub struct AppState<S> {
    pub source: Arc<S>,
}

impl<S> AppState<S> {
    pub fn new(source: S) -> Self {
        Self {
            source: Arc::new(source),
        }
    }
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
        }
    }
}

/// Serve until `shutdown` resolves.
pub async fn start_web_server<S, F>(config: WebConfig, source: S, shutdown: F) -> Result<()>
where
    S: SnapshotSource + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_app(&config, source);

    // Parse the bind address
    let addr = config
        .bind_address()
        .parse::<SocketAddr>()
        .map_err(|e| ExporterError::config_error(format!("Invalid bind address: {}", e)))?;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ExporterError::web_server_error(format!("Failed to bind to address: {}", e)))?;

    info!("vnstat-http listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);
    info!(
        "Available endpoints: /json, /metrics, /summary, /daily, /hourly, /weekly, /monthly(/), /yearly, /top, /oneline"
    );
    if config.token.is_some() {
        info!("Token authentication: enabled");
    } else {
        info!("Token authentication: disabled (recommended to enable in production)");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ExporterError::web_server_error(format!("Server error: {}", e)))?;

    info!("Web server stopped");
    Ok(())
}
