//! Observability for the stats reporter.
//!
//! All instrumentation uses `#[instrument(skip_all)]` and explicit field
//! allow-listing. The shared application secret is never recorded.
//!
//! # Metrics
//!
//! | Metric | Type | Labels | Purpose |
//! |--------|------|--------|---------|
//! | `sr_reporting_cycles_total` | Counter | `outcome` | Completed and skipped cycles |
//! | `sr_reporting_cycle_duration_seconds` | Histogram | none | Time spent in one completed cycle |
//! | `sr_reports_submitted_total` | Counter | `direction` | Stream reports handed to the backend |
//! | `sr_malformed_snapshot_entries_total` | Counter | `kind` | Snapshot entries skipped |
//! | `sr_conference_events_total` | Counter | `kind` | Setup/terminated events sent |
//! | `sr_conference_setup_failures_total` | Counter | `reason` | Setup rejections by backend reason |
//! | `sr_backend_sessions` | Gauge | none | Registered backend sessions |
//! | `sr_fleet_status_updates_total` | Counter | `status` | Fleet status updates sent or skipped |

pub mod metrics;

pub use metrics::init_metrics_recorder;
