//! Traffic snapshot parsing and metric encoding.
//!
//! This module turns the JSON report produced by vnstat into Prometheus
//! exposition text for scraping and into compressed remote-write batches for
//! pushing.

pub mod data;
pub mod exposition;
pub mod remote_write;
pub mod samples;
pub mod source;

// Re-export commonly used items
pub use data::{parse_snapshot, InterfaceTraffic, TrafficCounters, TrafficSnapshot};
pub use exposition::render;
pub use remote_write::encode;
pub use samples::{extract_samples, Direction, MetricFamily, MetricSample};
pub use source::{ReportView, SnapshotSource, VnstatCommand};
