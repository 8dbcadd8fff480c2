//! Stats Reporter Library
//!
//! Periodically harvests per-stream network quality statistics for active
//! media conferences and forwards them, batched per remote participant, to
//! an external monitoring backend, together with conference setup and
//! termination events.
//!
//! # Architecture
//!
//! ```text
//! BackendSessionRegistry (one StatsService per application id)
//! └── StatsService (backend client + initialized flag)
//!     └── ConferenceReporter (one per conference)
//!         ├── setup / active / terminated lifecycle
//!         └── timer task -> PeriodicReportingEngine::run_cycle
//!             ├── StatsSource snapshot
//!             └── ReportBuilder -> BackendClient
//! ```
//!
//! # Modules
//!
//! - [`snapshot`] - Per-cycle stats model and the `StatsSource` trait
//! - [`report`] - Backend-shaped report mapping
//! - [`engine`] - Gated reporting cycle and timer loop
//! - [`lifecycle`] - Conference setup/termination state machine
//! - [`registry`] - One backend session per application id
//! - [`backend`] - Backend client traits and a logging backend
//! - [`fleet`] - Server load status updates
//! - [`sdk_config`] - Backend SDK config file discovery
//! - [`config`] - Configuration from environment
//! - [`errors`] - Error types

#![warn(clippy::pedantic)]

pub mod backend;
pub mod config;
pub mod context;
pub mod credentials;
pub mod engine;
pub mod errors;
pub mod fleet;
pub mod lifecycle;
pub mod observability;
pub mod registry;
pub mod report;
pub mod sdk_config;
pub mod server_info;
pub mod snapshot;

pub use engine::{CycleOutcome, PeriodicReportingEngine, SkipReason};
pub use errors::ReporterError;
pub use lifecycle::{ConferencePhase, ConferenceReporter, ConferenceReporterParams};
pub use registry::{BackendSessionRegistry, InitCallback, SessionRequest, StatsService};
