//! Prometheus remote-write encoding.
//!
//! Builds a `WriteRequest` with one single-sample series per available
//! (family, interface, direction) tuple, serializes it as protobuf and
//! compresses it with the snappy block format.

use crate::error::{ExporterError, Result};
use crate::metrics::data::TrafficSnapshot;
use crate::metrics::samples::{extract_samples, MetricSample};
use prost::Message;

/// Reserved label carrying the metric name.
pub const METRIC_NAME_LABEL: &str = "__name__";

/// `prometheus.WriteRequest`
#[derive(Clone, PartialEq, Message)]
pub struct WriteRequest {
    #[prost(message, repeated, tag = "1")]
    pub timeseries: Vec<TimeSeries>,
}

/// `prometheus.TimeSeries`
#[derive(Clone, PartialEq, Message)]
pub struct TimeSeries {
    #[prost(message, repeated, tag = "1")]
    pub labels: Vec<Label>,
    #[prost(message, repeated, tag = "2")]
    pub samples: Vec<Sample>,
}

/// `prometheus.Label`
#[derive(Clone, PartialEq, Message)]
pub struct Label {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub value: String,
}

/// `prometheus.Sample`
#[derive(Clone, PartialEq, Message)]
pub struct Sample {
    #[prost(double, tag = "1")]
    pub value: f64,
    #[prost(int64, tag = "2")]
    pub timestamp: i64,
}

impl From<&MetricSample> for TimeSeries {
    fn from(sample: &MetricSample) -> Self {
        let mut labels = Vec::with_capacity(sample.labels.len() + 1);
        labels.push(Label {
            name: METRIC_NAME_LABEL.to_string(),
            value: sample.metric_name.clone(),
        });
        labels.extend(
            sample
                .labels
                .iter()
                .filter(|(name, _)| name.as_str() != METRIC_NAME_LABEL)
                .map(|(name, value)| Label {
                    name: name.clone(),
                    value: value.clone(),
                }),
        );
        labels.sort_by(|a, b| a.name.cmp(&b.name));

        TimeSeries {
            labels,
            samples: vec![Sample {
                value: sample.value,
                timestamp: sample.timestamp_millis,
            }],
        }
    }
}

/// Collect the labeled samples a push cycle would send.
///
/// Returns `None` when the snapshot had no interface list at all.
pub fn metric_samples(
    snapshot: &TrafficSnapshot,
    hostname: &str,
    timestamp_millis: i64,
) -> Option<Vec<MetricSample>> {
    if !snapshot.has_interface_list() {
        return None;
    }

    Some(
        extract_samples(snapshot)
            .iter()
            .map(|sample| sample.to_metric_sample(hostname, timestamp_millis))
            .collect(),
    )
}

/// Build the uncompressed write request.
pub fn build_write_request(
    snapshot: &TrafficSnapshot,
    hostname: &str,
    timestamp_millis: i64,
) -> Option<WriteRequest> {
    let samples = metric_samples(snapshot, hostname, timestamp_millis)?;
    Some(WriteRequest {
        timeseries: samples.iter().map(TimeSeries::from).collect(),
    })
}

/// Encode a snapshot into a snappy-compressed protobuf body.
///
/// `Ok(None)` means there is nothing to send; an interface list whose entries
/// carried no traffic still yields an (empty) body.
pub fn encode(
    snapshot: &TrafficSnapshot,
    hostname: &str,
    timestamp_millis: i64,
) -> Result<Option<Vec<u8>>> {
    let Some(request) = build_write_request(snapshot, hostname, timestamp_millis) else {
        return Ok(None);
    };

    let compressed = snap::raw::Encoder::new()
        .compress_vec(&request.encode_to_vec())
        .map_err(|e| ExporterError::encoding_error(e.to_string()))?;
    Ok(Some(compressed))
}

/// Reverse of [`encode`], used by receivers and tests.
pub fn decode(body: &[u8]) -> Result<WriteRequest> {
    let raw = snap::raw::Decoder::new()
        .decompress_vec(body)
        .map_err(|e| ExporterError::encoding_error(e.to_string()))?;
    WriteRequest::decode(raw.as_slice()).map_err(|e| ExporterError::encoding_error(e.to_string()))
}
