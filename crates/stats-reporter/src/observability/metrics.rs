//! Metrics definitions for the stats reporter.
//!
//! All metrics follow Prometheus naming conventions:
//! - `sr_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `outcome`: completed, session_pending, backend_not_initialized, stopped
//! - `direction`: inbound, outbound
//! - `kind`: setup, terminated (events); endpoint, stream (malformed entries)
//! - `reason`: bounded by `BackendErrorReason`
//! - `status`: sent, skipped

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the Prometheus metrics recorder and return its handle.
///
/// Must be called before any metrics are recorded. Cycle duration buckets
/// cover a cycle of a few streams (sub-millisecond) up to a large
/// conference with a slow backend client.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("sr_reporting_cycle".to_string()),
            &[
                0.0005, 0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set reporting cycle buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus metrics recorder: {e}"))
}

// ============================================================================
// Reporting Engine
// ============================================================================

/// Record the outcome of one reporting cycle.
///
/// Metric: `sr_reporting_cycles_total`
/// Labels: `outcome`
pub fn record_reporting_cycle(outcome: &str) {
    counter!("sr_reporting_cycles_total", "outcome" => outcome.to_string()).increment(1);
}

/// Record how long a completed cycle took.
///
/// Metric: `sr_reporting_cycle_duration_seconds`
pub fn record_reporting_cycle_duration(duration: Duration) {
    histogram!("sr_reporting_cycle_duration_seconds").record(duration.as_secs_f64());
}

/// Record one report handed to the backend.
///
/// Metric: `sr_reports_submitted_total`
/// Labels: `direction`
pub fn record_report_submitted(direction: &str) {
    counter!("sr_reports_submitted_total", "direction" => direction.to_string()).increment(1);
}

/// Record a snapshot entry skipped as malformed.
///
/// Metric: `sr_malformed_snapshot_entries_total`
/// Labels: `kind` (endpoint, stream)
pub fn record_malformed_entry(kind: &str) {
    counter!("sr_malformed_snapshot_entries_total", "kind" => kind.to_string()).increment(1);
}

// ============================================================================
// Conference Lifecycle
// ============================================================================

/// Record a conference lifecycle event sent to the backend.
///
/// Metric: `sr_conference_events_total`
/// Labels: `kind` (setup, terminated)
pub fn record_conference_event(kind: &str) {
    counter!("sr_conference_events_total", "kind" => kind.to_string()).increment(1);
}

/// Record a conference setup rejected by the backend.
///
/// Metric: `sr_conference_setup_failures_total`
/// Labels: `reason`
pub fn record_setup_failure(reason: &str) {
    counter!("sr_conference_setup_failures_total", "reason" => reason.to_string()).increment(1);
}

// ============================================================================
// Backend Sessions
// ============================================================================

/// Set the number of registered backend sessions.
///
/// Metric: `sr_backend_sessions`
pub fn set_backend_sessions(count: usize) {
    // usize to f64 conversion is safe for realistic session counts (< 2^53)
    #[allow(clippy::cast_precision_loss)]
    gauge!("sr_backend_sessions").set(count as f64);
}

/// Record a fleet status update attempt.
///
/// Metric: `sr_fleet_status_updates_total`
/// Labels: `status` (sent, skipped)
pub fn record_fleet_status_update(status: &str) {
    counter!("sr_fleet_status_updates_total", "status" => status.to_string()).increment(1);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};
    use metrics_util::MetricKind;

    // Without an installed recorder these calls go to the no-op recorder.
    #[test]
    fn test_recording_functions_without_recorder() {
        record_reporting_cycle("completed");
        record_reporting_cycle_duration(Duration::from_millis(3));
        record_report_submitted("inbound");
        record_malformed_entry("stream");
        record_conference_event("setup");
        record_setup_failure("authentication");
        set_backend_sessions(3);
        record_fleet_status_update("skipped");
    }

    #[test]
    fn test_metric_names_and_labels() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            record_reporting_cycle("completed");
            record_reporting_cycle("session_pending");
            record_reporting_cycle_duration(Duration::from_millis(2));
            record_report_submitted("inbound");
            record_report_submitted("inbound");
            record_report_submitted("outbound");
            record_malformed_entry("endpoint");
            record_conference_event("setup");
            record_setup_failure("protocol");
            set_backend_sessions(2);
            record_fleet_status_update("sent");
        });

        let entries = snapshotter.snapshot().into_vec();

        let counter_value = |name: &str, label: (&str, &str)| -> Option<u64> {
            entries.iter().find_map(|(key, _, _, value)| {
                let key = key.key();
                let matches = key.name() == name
                    && key
                        .labels()
                        .any(|l| l.key() == label.0 && l.value() == label.1);
                match (matches, value) {
                    (true, DebugValue::Counter(v)) => Some(*v),
                    _ => None,
                }
            })
        };

        assert_eq!(
            counter_value("sr_reports_submitted_total", ("direction", "inbound")),
            Some(2)
        );
        assert_eq!(
            counter_value("sr_reports_submitted_total", ("direction", "outbound")),
            Some(1)
        );
        assert_eq!(
            counter_value("sr_reporting_cycles_total", ("outcome", "session_pending")),
            Some(1)
        );
        assert_eq!(
            counter_value("sr_conference_setup_failures_total", ("reason", "protocol")),
            Some(1)
        );

        let has_gauge = entries.iter().any(|(key, _, _, value)| {
            key.kind() == MetricKind::Gauge
                && key.key().name() == "sr_backend_sessions"
                && matches!(value, DebugValue::Gauge(v) if v.into_inner() == 2.0)
        });
        assert!(has_gauge);

        let has_histogram = entries.iter().any(|(key, _, _, value)| {
            key.key().name() == "sr_reporting_cycle_duration_seconds"
                && matches!(value, DebugValue::Histogram(samples) if samples.len() == 1)
        });
        assert!(has_histogram);
    }
}
