//! # vnstat-http - Traffic statistics over HTTP
//!
//! Exposes the counters collected by [vnstat](https://humdi.net/vnstat/) over
//! HTTP as raw reports and as Prometheus metrics, and optionally pushes them
//! to a Prometheus remote-write endpoint such as Grafana Cloud.
//!
//! ## Features
//!
//! - **Report passthrough**: `vnstat --json` and the text views over HTTP
//! - **Prometheus exposition**: total, monthly and daily byte counters per interface
//! - **Remote write**: snappy-compressed protobuf batches pushed on an interval
//! - **Library + Binary**: Use as a crate or standalone application
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vnstat_http::{parse_snapshot, render, SnapshotSource, VnstatCommand};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = VnstatCommand::new();
//!     let raw = source.fetch_json().await?;
//!     print!("{}", render(&parse_snapshot(&raw)?));
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod metrics;
pub mod push;
pub mod web;

// Re-export public API
pub use error::{ExporterError, Result};
pub use metrics::{
    data::{parse_snapshot, InterfaceTraffic, TrafficCounters, TrafficSnapshot},
    exposition::render,
    remote_write::encode,
    source::{ReportView, SnapshotSource, VnstatCommand},
};
pub use push::{start_push, PushConfig, PushScheduler, ScheduleSettings};
pub use web::{start_web_server, WebConfig};

/// The default interval between remote-write pushes in seconds
pub const DEFAULT_PUSH_INTERVAL_SECS: u64 = 30;

/// The default web server port
pub const DEFAULT_WEB_PORT: u16 = 8080;
