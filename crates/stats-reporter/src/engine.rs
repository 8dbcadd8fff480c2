//! Periodic reporting engine.
//!
//! One cycle pulls a fresh snapshot from the [`StatsSource`] and hands one
//! report per stream to the [`BackendClient`], bracketed per remote
//! endpoint:
//!
//! ```text
//! begin_endpoint_batch(ep1, conference)
//!   submit_report(ep1, inbound ...)   -- receive streams first
//!   submit_report(ep1, outbound ...)  -- then send streams
//! end_endpoint_batch(ep1, conference)
//! begin_endpoint_batch(ep2, conference)
//! ...
//! ```
//!
//! A cycle is gated: until the conference has a backend session id and the
//! client is initialized, nothing is pulled and nothing is sent. Skipped
//! cycles are not buffered.

use crate::backend::BackendClient;
use crate::context::ConferenceContext;
use crate::errors::ReporterError;
use crate::observability::metrics;
use crate::report::{build_report, ReportScope, StreamDirection};
use crate::snapshot::{collect_endpoint_snapshots, StatsSource, StreamStats};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Why a cycle did not report anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The backend has not assigned a session id yet.
    SessionPending,
    /// The backend client is not initialized.
    BackendNotInitialized,
    /// The conference has been stopped.
    Stopped,
}

impl SkipReason {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            SkipReason::SessionPending => "session_pending",
            SkipReason::BackendNotInitialized => "backend_not_initialized",
            SkipReason::Stopped => "stopped",
        }
    }
}

/// Result of one reporting cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Gate closed; no source reads, no backend calls.
    Skipped(SkipReason),
    /// Every endpoint was bracketed and `reports` reports were submitted.
    Completed { endpoints: usize, reports: usize },
}

impl CycleOutcome {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            CycleOutcome::Skipped(reason) => reason.as_str(),
            CycleOutcome::Completed { .. } => "completed",
        }
    }
}

/// Turns stats snapshots into backend report batches.
pub struct PeriodicReportingEngine {
    source: Arc<dyn StatsSource>,
    client: Arc<dyn BackendClient>,
}

impl PeriodicReportingEngine {
    #[must_use]
    pub fn new(source: Arc<dyn StatsSource>, client: Arc<dyn BackendClient>) -> Self {
        Self { source, client }
    }

    /// Backend client reports are submitted to.
    #[must_use]
    pub fn client(&self) -> &Arc<dyn BackendClient> {
        &self.client
    }

    /// Run one cycle for `context`.
    pub fn run_cycle(&self, context: &ConferenceContext) -> CycleOutcome {
        let Some(session_id) = context.session_id() else {
            return skip(context, SkipReason::SessionPending);
        };
        if !self.client.is_initialized() {
            return skip(context, SkipReason::BackendNotInitialized);
        }

        let started = Instant::now();
        let local_user_id = context.local_user_id();
        let conference_id = context.conference_id().as_str();

        let endpoints = collect_endpoint_snapshots(self.source.as_ref());
        let mut reports = 0;

        for endpoint in &endpoints {
            let scope = ReportScope {
                conference_id,
                local_user_id,
                remote_user_id: &endpoint.endpoint_id,
                session_id,
            };

            self.client
                .begin_endpoint_batch(&endpoint.endpoint_id, conference_id);
            reports += self.submit_streams(scope, StreamDirection::Inbound, &endpoint.receive_streams);
            reports += self.submit_streams(scope, StreamDirection::Outbound, &endpoint.send_streams);
            self.client
                .end_endpoint_batch(&endpoint.endpoint_id, conference_id);
        }

        metrics::record_reporting_cycle("completed");
        metrics::record_reporting_cycle_duration(started.elapsed());

        CycleOutcome::Completed {
            endpoints: endpoints.len(),
            reports,
        }
    }

    fn submit_streams(
        &self,
        scope: ReportScope<'_>,
        direction: StreamDirection,
        streams: &[StreamStats],
    ) -> usize {
        let mut submitted = 0;
        for stats in streams {
            if !stats.stream_id.is_valid() {
                let err = ReporterError::MalformedSnapshotEntry(format!(
                    "empty stream id for endpoint {}",
                    scope.remote_user_id
                ));
                warn!(
                    target: "sr.engine",
                    direction = direction.as_str(),
                    error = %err,
                    "Skipping snapshot entry"
                );
                metrics::record_malformed_entry("stream");
                continue;
            }

            match direction {
                StreamDirection::Inbound => debug!(
                    target: "sr.engine",
                    local_user_id = scope.local_user_id,
                    endpoint_id = scope.remote_user_id,
                    stream_id = %stats.stream_id,
                    bytes = stats.bytes,
                    packets = stats.packets,
                    packets_lost = stats.packets_lost,
                    fractional_loss = stats.fractional_loss,
                    jitter_ms = ?stats.jitter_ms,
                    rtt_ms = ?stats.rtt_ms,
                    "Receive stats"
                ),
                StreamDirection::Outbound => debug!(
                    target: "sr.engine",
                    local_user_id = scope.local_user_id,
                    endpoint_id = scope.remote_user_id,
                    stream_id = %stats.stream_id,
                    bytes = stats.bytes,
                    packets = stats.packets,
                    fractional_loss = stats.fractional_loss,
                    jitter_ms = ?stats.jitter_ms,
                    rtt_ms = ?stats.rtt_ms,
                    "Send stats"
                ),
            }

            self.client
                .submit_report(scope.remote_user_id, build_report(scope, direction, stats));
            metrics::record_report_submitted(direction.as_str());
            submitted += 1;
        }
        submitted
    }
}

pub(crate) fn skip(context: &ConferenceContext, reason: SkipReason) -> CycleOutcome {
    debug!(
        target: "sr.engine",
        conference_id = %context.conference_id(),
        reason = reason.as_str(),
        "Skipping reporting cycle"
    );
    metrics::record_reporting_cycle(reason.as_str());
    CycleOutcome::Skipped(reason)
}

/// Drive `tick` every `period` until cancelled.
///
/// The first tick fires one period after start. Missed ticks are skipped,
/// not bursted. The loop also exits when `tick` returns `false`.
#[instrument(skip_all, name = "sr.engine.loop")]
pub async fn run_reporting_loop<F>(period: Duration, cancel_token: CancellationToken, mut tick: F)
where
    F: FnMut() -> bool + Send,
{
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            () = cancel_token.cancelled() => {
                debug!(target: "sr.engine", "Reporting loop cancelled");
                break;
            }
            _ = interval.tick() => {
                if !tick() {
                    info!(target: "sr.engine", "Reporting target gone, exiting loop");
                    break;
                }
            }
        }
    }
}
