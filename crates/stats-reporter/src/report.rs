//! Backend-shaped per-stream reports.
//!
//! [`build_report`] is a pure, total mapping from one stream's statistics to
//! one [`ConferenceStatsReport`]. Values pass through unmodified apart from
//! the two filters below:
//!
//! - jitter is included only when measured (never forwarded as zero)
//! - RTT is included only when measured and non-negative; zero is valid

use crate::snapshot::StreamStats;
use serde::{Deserialize, Serialize};

/// Direction of a stream relative to the local participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamDirection {
    Inbound,
    Outbound,
}

impl StreamDirection {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            StreamDirection::Inbound => "inbound",
            StreamDirection::Outbound => "outbound",
        }
    }
}

/// Identity shared by every report of one endpoint batch.
#[derive(Debug, Clone, Copy)]
pub struct ReportScope<'a> {
    pub conference_id: &'a str,
    pub local_user_id: &'a str,
    pub remote_user_id: &'a str,
    pub session_id: &'a str,
}

/// One stream's report for one cycle.
///
/// Byte and packet counts are named after the direction: `bytesReceived` /
/// `packetsReceived` / `packetsLost` on inbound reports, `bytesSent` /
/// `packetsSent` on outbound reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceStatsReport {
    pub conference_id: String,
    pub local_user_id: String,
    pub remote_user_id: String,
    pub session_id: String,
    pub direction: StreamDirection,
    pub stream_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes_received: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packets_received: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packets_lost: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes_sent: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packets_sent: Option<u64>,
    pub fractional_packet_loss: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jitter: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtt: Option<u32>,
}

/// Map one stream's statistics to a report.
#[must_use]
pub fn build_report(
    scope: ReportScope<'_>,
    direction: StreamDirection,
    stats: &StreamStats,
) -> ConferenceStatsReport {
    let (bytes_received, packets_received, packets_lost, bytes_sent, packets_sent) =
        match direction {
            StreamDirection::Inbound => (
                Some(stats.bytes),
                Some(stats.packets),
                Some(stats.packets_lost),
                None,
                None,
            ),
            StreamDirection::Outbound => (None, None, None, Some(stats.bytes), Some(stats.packets)),
        };

    ConferenceStatsReport {
        conference_id: scope.conference_id.to_string(),
        local_user_id: scope.local_user_id.to_string(),
        remote_user_id: scope.remote_user_id.to_string(),
        session_id: scope.session_id.to_string(),
        direction,
        stream_id: stats.stream_id.to_string(),
        bytes_received,
        packets_received,
        packets_lost,
        bytes_sent,
        packets_sent,
        fractional_packet_loss: stats.fractional_loss,
        jitter: stats.jitter_ms,
        rtt: stats.rtt_ms.and_then(|rtt| u32::try_from(rtt).ok()),
    }
}
