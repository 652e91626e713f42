//! Mapping from a traffic snapshot to metric samples.
//!
//! Both the exposition renderer and the remote-write encoder walk the same
//! list produced by [`extract_samples`], so the two outputs always agree on
//! which (family, interface, direction) tuples exist.

use crate::metrics::data::{TrafficCounters, TrafficSnapshot};
use serde::Serialize;
use std::collections::BTreeMap;

/// The fixed set of exported metric families, in exposition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MetricFamily {
    Total,
    Month,
    Today,
}

impl MetricFamily {
    pub const ALL: [MetricFamily; 3] = [Self::Total, Self::Month, Self::Today];

    /// Fully qualified metric name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Total => "vnstat_traffic_total_bytes",
            Self::Month => "vnstat_traffic_month_bytes",
            Self::Today => "vnstat_traffic_today_bytes",
        }
    }

    pub fn help(self) -> &'static str {
        match self {
            Self::Total => "Total traffic in bytes",
            Self::Month => "Monthly traffic in bytes",
            Self::Today => "Today's traffic in bytes",
        }
    }

    /// Prometheus metric type.
    pub fn kind(self) -> &'static str {
        "counter"
    }
}

/// Traffic direction label value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Direction {
    Rx,
    Tx,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rx => "rx",
            Self::Tx => "tx",
        }
    }
}

/// One available value for a (family, interface, direction) tuple.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficSample<'a> {
    pub family: MetricFamily,
    pub interface: &'a str,
    pub direction: Direction,
    pub value: f64,
}

/// A labeled, timestamped observation ready for remote write.
///
/// `labels` never contains `__name__`; the metric name travels separately and
/// takes precedence when the series is encoded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSample {
    pub metric_name: String,
    pub labels: BTreeMap<String, String>,
    pub value: f64,
    pub timestamp_millis: i64,
}

impl TrafficSample<'_> {
    /// Attach push labels and a timestamp.
    pub fn to_metric_sample(&self, hostname: &str, timestamp_millis: i64) -> MetricSample {
        let labels = BTreeMap::from([
            ("hostname".to_string(), hostname.to_string()),
            ("interface".to_string(), self.interface.to_string()),
            ("direction".to_string(), self.direction.as_str().to_string()),
        ]);

        MetricSample {
            metric_name: self.family.name().to_string(),
            labels,
            value: self.value,
            timestamp_millis,
        }
    }
}

/// Collect every available sample, in interface order, then family, then direction.
pub fn extract_samples(snapshot: &TrafficSnapshot) -> Vec<TrafficSample<'_>> {
    let mut samples = Vec::new();

    for interface in snapshot.interfaces() {
        let buckets = [
            (MetricFamily::Total, interface.total),
            (MetricFamily::Month, interface.month),
            (MetricFamily::Today, interface.today),
        ];

        for (family, counters) in buckets {
            let Some(TrafficCounters { rx, tx }) = counters else {
                continue;
            };
            for (direction, value) in [(Direction::Rx, rx), (Direction::Tx, tx)] {
                if let Some(value) = value {
                    samples.push(TrafficSample {
                        family,
                        interface: &interface.name,
                        direction,
                        value,
                    });
                }
            }
        }
    }

    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::data::InterfaceTraffic;

    #[test]
    fn test_extract_order_and_partial_buckets() {
        let snapshot = TrafficSnapshot::new(vec![
            InterfaceTraffic::new("eth0")
                .with_total(TrafficCounters::new(100.0, 50.0))
                .with_today(TrafficCounters {
                    rx: None,
                    tx: Some(2.0),
                }),
            InterfaceTraffic::new("wlan0").with_month(TrafficCounters::new(10.0, 5.0)),
        ]);

        let tuples: Vec<_> = extract_samples(&snapshot)
            .iter()
            .map(|s| (s.family, s.interface, s.direction, s.value))
            .collect();

        assert_eq!(
            tuples,
            vec![
                (MetricFamily::Total, "eth0", Direction::Rx, 100.0),
                (MetricFamily::Total, "eth0", Direction::Tx, 50.0),
                (MetricFamily::Today, "eth0", Direction::Tx, 2.0),
                (MetricFamily::Month, "wlan0", Direction::Rx, 10.0),
                (MetricFamily::Month, "wlan0", Direction::Tx, 5.0),
            ]
        );
    }

    #[test]
    fn test_metric_sample_labels() {
        let sample = TrafficSample {
            family: MetricFamily::Month,
            interface: "eth0",
            direction: Direction::Tx,
            value: 5.0,
        };
        let metric = sample.to_metric_sample("router", 1_700_000_000_000);

        assert_eq!(metric.metric_name, "vnstat_traffic_month_bytes");
        assert_eq!(metric.labels["hostname"], "router");
        assert_eq!(metric.labels["interface"], "eth0");
        assert_eq!(metric.labels["direction"], "tx");
        assert!(!metric.labels.contains_key("__name__"));
        assert_eq!(metric.timestamp_millis, 1_700_000_000_000);
    }
}
