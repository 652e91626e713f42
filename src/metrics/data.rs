//! Data structures for vnstat traffic snapshots.
//!
//! vnstat's JSON schema differs between releases and output modes, so decoding
//! is deliberately tolerant: a field that is missing or has the wrong JSON
//! type becomes `None` for that field only, and interface entries that cannot
//! be identified are skipped instead of failing the whole document.

use crate::error::{ExporterError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Receive/transmit byte counters for one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrafficCounters {
    /// Bytes received
    #[serde(default, deserialize_with = "lenient")]
    pub rx: Option<f64>,
    /// Bytes transmitted
    #[serde(default, deserialize_with = "lenient")]
    pub tx: Option<f64>,
}

impl TrafficCounters {
    pub fn new(rx: f64, tx: f64) -> Self {
        Self {
            rx: Some(rx),
            tx: Some(tx),
        }
    }
}

/// Traffic totals for a single network interface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterfaceTraffic {
    /// Interface name (e.g., "eth0")
    pub name: String,
    /// Cumulative counters since accounting began
    pub total: Option<TrafficCounters>,
    /// The first monthly bucket (the current month)
    pub month: Option<TrafficCounters>,
    /// The last daily bucket (today, by vnstat convention)
    pub today: Option<TrafficCounters>,
}

impl InterfaceTraffic {
    /// Create an interface entry with no traffic data.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            total: None,
            month: None,
            today: None,
        }
    }

    pub fn with_total(mut self, counters: TrafficCounters) -> Self {
        self.total = Some(counters);
        self
    }

    pub fn with_month(mut self, counters: TrafficCounters) -> Self {
        self.month = Some(counters);
        self
    }

    pub fn with_today(mut self, counters: TrafficCounters) -> Self {
        self.today = Some(counters);
        self
    }
}

/// One point-in-time read of vnstat counters.
///
/// `interfaces` is `None` when the document had no `interfaces` array at all,
/// which is distinct from an array whose entries were all unusable.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrafficSnapshot {
    interfaces: Option<Vec<InterfaceTraffic>>,
}

impl TrafficSnapshot {
    /// Create a snapshot from an interface list.
    pub fn new(interfaces: Vec<InterfaceTraffic>) -> Self {
        Self {
            interfaces: Some(interfaces),
        }
    }

    /// A snapshot from a document without an `interfaces` array.
    pub fn absent() -> Self {
        Self { interfaces: None }
    }

    /// Whether the source document carried an interface list.
    pub fn has_interface_list(&self) -> bool {
        self.interfaces.is_some()
    }

    /// Interfaces in source order.
    pub fn interfaces(&self) -> &[InterfaceTraffic] {
        self.interfaces.as_deref().unwrap_or_default()
    }

    /// Look up an interface by name.
    pub fn interface(&self, name: &str) -> Option<&InterfaceTraffic> {
        self.interfaces().iter().find(|iface| iface.name == name)
    }

    pub fn len(&self) -> usize {
        self.interfaces().len()
    }

    pub fn is_empty(&self) -> bool {
        self.interfaces().is_empty()
    }
}

#[derive(Deserialize)]
struct RawInterface {
    #[serde(default, deserialize_with = "lenient")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient_object")]
    traffic: Option<RawTraffic>,
}

#[derive(Deserialize)]
struct RawTraffic {
    #[serde(default, deserialize_with = "lenient_object")]
    total: Option<TrafficCounters>,
    #[serde(default, deserialize_with = "lenient")]
    month: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "lenient")]
    day: Option<Vec<Value>>,
}

/// Parse raw `vnstat --json` output into a [`TrafficSnapshot`].
///
/// Only syntactically invalid JSON is an error.
pub fn parse_snapshot(raw: &[u8]) -> Result<TrafficSnapshot> {
    let document: Value =
        serde_json::from_slice(raw).map_err(|e| ExporterError::malformed_output(e.to_string()))?;

    let entries = match document.get("interfaces") {
        Some(Value::Array(entries)) => entries,
        _ => return Ok(TrafficSnapshot::absent()),
    };

    let interfaces = entries.iter().filter_map(decode_interface).collect();
    Ok(TrafficSnapshot::new(interfaces))
}

fn decode_interface(entry: &Value) -> Option<InterfaceTraffic> {
    let raw: RawInterface = decode_object(entry)?;
    let name = raw.name.filter(|name| !name.is_empty())?;

    let mut interface = InterfaceTraffic::new(name);
    if let Some(traffic) = raw.traffic {
        interface.total = traffic.total;
        // vnstat lists months newest first and days oldest first
        interface.month = traffic.month.as_deref().and_then(<[Value]>::first).and_then(decode_object);
        interface.today = traffic.day.as_deref().and_then(<[Value]>::last).and_then(decode_object);
    }
    Some(interface)
}

/// Decode a struct only from a JSON object; serde would otherwise accept arrays positionally.
fn decode_object<T: DeserializeOwned>(value: &Value) -> Option<T> {
    if value.is_object() {
        T::deserialize(value).ok()
    } else {
        None
    }
}

fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn lenient_object<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(decode_object(&value))
}
