//! Background push of traffic metrics to a Prometheus remote-write endpoint.

pub mod config;
pub mod scheduler;
pub mod transport;

// Re-export commonly used items
pub use config::{PushConfig, ScheduleSettings};
pub use scheduler::{CycleOutcome, PushScheduler};
pub use transport::{PushTransport, RemoteWriteClient};

use crate::error::Result;
use crate::metrics::SnapshotSource;
use sysinfo::System;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Hostname attached to pushed series.
pub fn local_hostname() -> String {
    System::host_name().unwrap_or_else(|| {
        warn!("Push: failed to get hostname, using 'unknown'");
        "unknown".to_string()
    })
}

/// Spawn the push scheduler on the current runtime.
pub fn start_push<S>(
    config: &PushConfig,
    source: S,
    shutdown: watch::Receiver<bool>,
) -> Result<JoinHandle<()>>
where
    S: SnapshotSource + 'static,
{
    let transport = RemoteWriteClient::new(config)?;
    let scheduler = PushScheduler::new(source, transport, local_hostname(), config.schedule.clone());

    info!(
        "Remote write push: enabled (interval: {:?}, host: {})",
        config.schedule.interval,
        scheduler.hostname()
    );
    Ok(tokio::spawn(scheduler.run(shutdown)))
}
