//! Per-cycle statistics snapshot model.
//!
//! A snapshot is built fresh from the [`StatsSource`] at the start of every
//! reporting cycle and dropped when the cycle ends. Nothing here is shared
//! across cycles.

use crate::errors::ReporterError;
use crate::observability::metrics;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::Path;
use tracing::warn;

/// Identifier of a single media stream.
///
/// Either a numeric synchronization-source key or an opaque name. An empty
/// name is malformed and is skipped during a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreamKey {
    Numeric(u64),
    Named(String),
}

impl StreamKey {
    /// Whether this key can be mapped to a report.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match self {
            StreamKey::Numeric(_) => true,
            StreamKey::Named(name) => !name.is_empty(),
        }
    }
}

impl fmt::Display for StreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKey::Numeric(key) => write!(f, "{key}"),
            StreamKey::Named(name) => f.write_str(name),
        }
    }
}

impl From<u64> for StreamKey {
    fn from(key: u64) -> Self {
        StreamKey::Numeric(key)
    }
}

impl From<&str> for StreamKey {
    fn from(name: &str) -> Self {
        StreamKey::Named(name.to_string())
    }
}

/// Statistics of one stream for one cycle.
///
/// `bytes` and `packets` are received counts for receive streams and sent
/// counts for send streams. `packets_lost` is only meaningful on receive
/// streams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamStats {
    pub stream_id: StreamKey,
    pub bytes: u64,
    pub packets: u64,
    #[serde(default)]
    pub packets_lost: u64,
    #[serde(default)]
    pub fractional_loss: f64,
    #[serde(default)]
    pub jitter_ms: Option<f64>,
    #[serde(default)]
    pub rtt_ms: Option<i32>,
}

/// Statistics of one remote endpoint for one cycle.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EndpointSnapshot {
    pub endpoint_id: String,
    #[serde(default)]
    pub receive_streams: Vec<StreamStats>,
    #[serde(default)]
    pub send_streams: Vec<StreamStats>,
}

/// Caller-supplied provider of per-endpoint stream statistics.
///
/// Both maps are keyed by remote endpoint id and are read once per cycle.
pub trait StatsSource: Send + Sync {
    /// Receive-direction statistics grouped by endpoint.
    fn receive_stats_by_endpoint(&self) -> HashMap<String, Vec<StreamStats>>;

    /// Send-direction statistics grouped by endpoint.
    fn send_stats_by_endpoint(&self) -> HashMap<String, Vec<StreamStats>>;

    /// Endpoints that currently have any statistics, in sorted order.
    fn active_endpoints(&self) -> BTreeSet<String> {
        self.receive_stats_by_endpoint()
            .into_keys()
            .chain(self.send_stats_by_endpoint().into_keys())
            .collect()
    }
}

/// Read both maps from `source` and merge them into per-endpoint snapshots.
///
/// Endpoints appear once, sorted by id. An endpoint present in only one map
/// gets an empty list for the other direction. Entries with an empty
/// endpoint id are skipped.
pub fn collect_endpoint_snapshots(source: &dyn StatsSource) -> Vec<EndpointSnapshot> {
    let mut merged: BTreeMap<String, EndpointSnapshot> = BTreeMap::new();

    for (endpoint_id, streams) in source.receive_stats_by_endpoint() {
        if reject_empty_endpoint(&endpoint_id) {
            continue;
        }
        merged
            .entry(endpoint_id.clone())
            .or_insert_with(|| EndpointSnapshot {
                endpoint_id,
                ..EndpointSnapshot::default()
            })
            .receive_streams = streams;
    }

    for (endpoint_id, streams) in source.send_stats_by_endpoint() {
        if reject_empty_endpoint(&endpoint_id) {
            continue;
        }
        merged
            .entry(endpoint_id.clone())
            .or_insert_with(|| EndpointSnapshot {
                endpoint_id,
                ..EndpointSnapshot::default()
            })
            .send_streams = streams;
    }

    merged.into_values().collect()
}

fn reject_empty_endpoint(endpoint_id: &str) -> bool {
    if !endpoint_id.is_empty() {
        return false;
    }
    let err = ReporterError::MalformedSnapshotEntry("empty endpoint id".to_string());
    warn!(target: "sr.engine", error = %err, "Skipping snapshot entry");
    metrics::record_malformed_entry("endpoint");
    true
}

/// Stats source serving a fixed list of endpoint snapshots.
///
/// Used by the dry-run binary to replay a snapshot file every cycle.
#[derive(Debug, Clone, Default)]
pub struct StaticStatsSource {
    endpoints: Vec<EndpointSnapshot>,
}

impl StaticStatsSource {
    #[must_use]
    pub fn new(endpoints: Vec<EndpointSnapshot>) -> Self {
        Self { endpoints }
    }

    /// Parse a JSON array of endpoint snapshots.
    ///
    /// # Errors
    ///
    /// Returns `ReporterError::SnapshotDecode` if the JSON is invalid.
    pub fn from_json(json: &str) -> Result<Self, ReporterError> {
        let endpoints: Vec<EndpointSnapshot> =
            serde_json::from_str(json).map_err(|e| ReporterError::SnapshotDecode(e.to_string()))?;
        Ok(Self::new(endpoints))
    }

    /// Read and parse a snapshot file.
    ///
    /// # Errors
    ///
    /// Returns `ReporterError::SnapshotDecode` if the file cannot be read or
    /// parsed.
    pub fn from_file(path: &Path) -> Result<Self, ReporterError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            ReporterError::SnapshotDecode(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    #[must_use]
    pub fn endpoints(&self) -> &[EndpointSnapshot] {
        &self.endpoints
    }
}

impl StatsSource for StaticStatsSource {
    fn receive_stats_by_endpoint(&self) -> HashMap<String, Vec<StreamStats>> {
        self.endpoints
            .iter()
            .map(|ep| (ep.endpoint_id.clone(), ep.receive_streams.clone()))
            .collect()
    }

    fn send_stats_by_endpoint(&self) -> HashMap<String, Vec<StreamStats>> {
        self.endpoints
            .iter()
            .map(|ep| (ep.endpoint_id.clone(), ep.send_streams.clone()))
            .collect()
    }
}
