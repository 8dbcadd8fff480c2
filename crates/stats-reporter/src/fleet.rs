//! Fleet status updates.
//!
//! A media server periodically tells the backend how loaded it is: host CPU
//! and memory plus the number of conferences and participants it carries.
//! Updates go through the same backend session as conference reports and
//! are only sent while that session is initialized; the backend does not
//! queue them.
//!
//! # Graceful Shutdown
//!
//! [`run_fleet_status_loop`] exits when its cancellation token is
//! triggered.

use crate::registry::StatsService;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use sysinfo::System;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// Conference and participant counts carried by this process.
///
/// Shared between whoever owns conferences (increments/decrements) and the
/// fleet status loop (snapshots).
#[derive(Debug, Default)]
pub struct FleetLoad {
    conferences: AtomicU32,
    participants: AtomicU32,
}

/// Point-in-time copy of [`FleetLoad`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FleetLoadSnapshot {
    pub conferences: u32,
    pub participants: u32,
}

impl FleetLoad {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_conferences(&self, count: u32) {
        self.conferences.store(count, Ordering::SeqCst);
    }

    pub fn set_participants(&self, count: u32) {
        self.participants.store(count, Ordering::SeqCst);
    }

    pub fn increment_conferences(&self) {
        self.conferences.fetch_add(1, Ordering::SeqCst);
    }

    /// Saturates at zero.
    pub fn decrement_conferences(&self) {
        let _ = self
            .conferences
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    pub fn increment_participants(&self) {
        self.participants.fetch_add(1, Ordering::SeqCst);
    }

    /// Saturates at zero.
    pub fn decrement_participants(&self) {
        let _ = self
            .participants
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    #[must_use]
    pub fn snapshot(&self) -> FleetLoadSnapshot {
        FleetLoadSnapshot {
            conferences: self.conferences.load(Ordering::SeqCst),
            participants: self.participants.load(Ordering::SeqCst),
        }
    }
}

/// One fleet status record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetStatus {
    /// Global CPU usage, 0-100.
    pub cpu_usage: f32,
    /// Used memory in bytes.
    pub memory_used: u64,
    /// Total memory in bytes.
    pub total_memory: u64,
    /// Used memory as a percentage of total, 0-100.
    pub memory_utilization: f64,
    pub conference_count: u32,
    pub participant_count: u32,
    pub timestamp: DateTime<Utc>,
}

/// Host resource sampler kept across fleet status updates.
///
/// CPU usage is the delta between two refreshes, so the same sampler has
/// to be reused. The first sample is taken on construction; updates read
/// usage since the previous one.
pub struct HostSampler {
    sys: System,
}

impl HostSampler {
    #[must_use]
    pub fn new() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu();
        Self { sys }
    }

    /// Number of CPUs tracked between samples.
    #[must_use]
    pub fn cpu_count(&self) -> usize {
        self.sys.cpus().len()
    }
}

impl Default for HostSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HostSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostSampler")
            .field("cpus", &self.cpu_count())
            .finish()
    }
}

impl FleetStatus {
    /// Refresh host resource usage through `sampler` and combine it with
    /// the current load.
    ///
    /// CPU usage covers the time since the sampler's previous refresh and
    /// reads 0 if that was less than `sysinfo::MINIMUM_CPU_UPDATE_INTERVAL`
    /// ago.
    #[must_use]
    pub fn gather(sampler: &mut HostSampler, load: &FleetLoad) -> Self {
        let sys = &mut sampler.sys;
        sys.refresh_cpu();
        sys.refresh_memory();

        let total_memory = sys.total_memory();
        let memory_used = sys.used_memory();
        let snapshot = load.snapshot();

        Self {
            cpu_usage: sys.global_cpu_info().cpu_usage().clamp(0.0, 100.0),
            memory_used,
            total_memory,
            memory_utilization: memory_utilization(memory_used, total_memory),
            conference_count: snapshot.conferences,
            participant_count: snapshot.participants,
            timestamp: Utc::now(),
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn memory_utilization(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    ((used as f64 / total as f64) * 100.0).min(100.0)
}

/// Periodically send fleet status updates through `service`.
///
/// The first update is sent one `period` after start. Updates are skipped
/// (and counted) while the backend session is not initialized.
#[instrument(skip_all, name = "sr.fleet", fields(app_id = %service.id()))]
pub async fn run_fleet_status_loop(
    service: Arc<StatsService>,
    load: Arc<FleetLoad>,
    period: Duration,
    cancel_token: CancellationToken,
) {
    info!(
        target: "sr.fleet",
        period_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX),
        "Starting fleet status task"
    );

    let mut sampler = HostSampler::new();
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            () = cancel_token.cancelled() => {
                info!(target: "sr.fleet", "Fleet status task received shutdown signal, exiting");
                break;
            }
            _ = interval.tick() => {
                let status = FleetStatus::gather(&mut sampler, &load);
                let sent = service.send_fleet_status_update(status);
                debug!(target: "sr.fleet", sent, "Fleet status tick");
            }
        }
    }

    info!(target: "sr.fleet", "Fleet status task stopped");
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_fleet_load_counters() {
        let load = FleetLoad::new();
        load.increment_conferences();
        load.increment_conferences();
        load.increment_participants();
        load.decrement_conferences();

        assert_eq!(
            load.snapshot(),
            FleetLoadSnapshot {
                conferences: 1,
                participants: 1
            }
        );
    }

    #[test]
    fn test_fleet_load_decrement_saturates() {
        let load = FleetLoad::new();
        load.decrement_participants();
        load.decrement_conferences();

        assert_eq!(load.snapshot().participants, 0);
        assert_eq!(load.snapshot().conferences, 0);
    }

    #[test]
    fn test_gather_uses_current_load() {
        let load = FleetLoad::new();
        load.set_conferences(3);
        load.set_participants(17);

        let status = FleetStatus::gather(&mut HostSampler::new(), &load);
        assert_eq!(status.conference_count, 3);
        assert_eq!(status.participant_count, 17);
        assert!((0.0..=100.0).contains(&status.cpu_usage));
        assert!((0.0..=100.0).contains(&status.memory_utilization));
    }

    #[test]
    fn test_sampler_keeps_cpu_state_between_gathers() {
        let load = FleetLoad::new();
        let mut sampler = HostSampler::new();
        let cpus = sampler.cpu_count();
        assert!(cpus > 0);

        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        let first = FleetStatus::gather(&mut sampler, &load);
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        let second = FleetStatus::gather(&mut sampler, &load);

        assert_eq!(sampler.cpu_count(), cpus);
        assert!((0.0..=100.0).contains(&first.cpu_usage));
        assert!((0.0..=100.0).contains(&second.cpu_usage));
        assert!(second.timestamp >= first.timestamp);
    }

    #[test]
    fn test_memory_utilization_bounds() {
        assert!(memory_utilization(0, 0).abs() < f64::EPSILON);
        assert!((memory_utilization(50, 200) - 25.0).abs() < f64::EPSILON);
        assert!((memory_utilization(300, 200) - 100.0).abs() < f64::EPSILON);
    }
}
