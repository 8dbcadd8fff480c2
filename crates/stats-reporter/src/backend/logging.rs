//! Backend that writes every call to the log.
//!
//! Used by the dry-run binary. Initialization succeeds immediately and
//! every conference setup is confirmed with a fresh UUID session id.

use super::{
    BackendClient, BackendConnector, ConferenceDescriptor, ConferenceEventKind, InitParams,
    InitializationListener, SetupListener,
};
use crate::fleet::FleetStatus;
use crate::report::ConferenceStatsReport;
use common::types::ApplicationId;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Connector producing [`LoggingBackendClient`]s.
#[derive(Debug, Default)]
pub struct LoggingConnector;

impl BackendConnector for LoggingConnector {
    fn create_client(&self, app_id: ApplicationId) -> Arc<dyn BackendClient> {
        Arc::new(LoggingBackendClient::new(app_id))
    }
}

/// Client that logs instead of transmitting.
#[derive(Debug)]
pub struct LoggingBackendClient {
    app_id: ApplicationId,
    initialized: AtomicBool,
    reports: AtomicU64,
}

impl LoggingBackendClient {
    #[must_use]
    pub fn new(app_id: ApplicationId) -> Self {
        Self {
            app_id,
            initialized: AtomicBool::new(false),
            reports: AtomicU64::new(0),
        }
    }

    /// Number of reports logged so far.
    #[must_use]
    pub fn reports_logged(&self) -> u64 {
        self.reports.load(Ordering::Relaxed)
    }
}

impl BackendClient for LoggingBackendClient {
    fn initialize(&self, params: InitParams, listener: Box<dyn InitializationListener>) {
        info!(
            target: "sr.backend.logging",
            app_id = %self.app_id,
            initiator_id = %params.initiator_id,
            credentials = params.credentials.kind(),
            os = %params.server_info.os,
            name = %params.server_info.name,
            version = %params.server_info.version,
            endpoint_type = params.server_info.endpoint_type.as_str(),
            sdk_config_file = ?params.sdk_config_file,
            "Backend initialize"
        );
        self.initialized.store(true, Ordering::SeqCst);
        listener.on_initialized("logging backend ready");
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    fn begin_endpoint_batch(&self, endpoint_id: &str, conference_id: &str) {
        debug!(target: "sr.backend.logging", endpoint_id, conference_id, "Begin endpoint batch");
    }

    fn end_endpoint_batch(&self, endpoint_id: &str, conference_id: &str) {
        debug!(target: "sr.backend.logging", endpoint_id, conference_id, "End endpoint batch");
    }

    fn submit_report(&self, remote_user_id: &str, report: ConferenceStatsReport) {
        self.reports.fetch_add(1, Ordering::Relaxed);
        match serde_json::to_string(&report) {
            Ok(json) => info!(target: "sr.backend.logging", remote_user_id, report = %json, "Stats report"),
            Err(e) => warn!(target: "sr.backend.logging", remote_user_id, error = %e, "Failed to encode report"),
        }
    }

    fn send_conference_event(
        &self,
        kind: ConferenceEventKind,
        descriptor: ConferenceDescriptor,
        listener: Option<Box<dyn SetupListener>>,
    ) {
        info!(
            target: "sr.backend.logging",
            kind = kind.as_str(),
            conference_id = %descriptor.conference_id,
            local_user_id = %descriptor.local_user_id,
            session_id = ?descriptor.session_id,
            "Conference event"
        );

        if let (ConferenceEventKind::Setup, Some(listener)) = (kind, listener) {
            listener.on_response(Uuid::new_v4().to_string());
        }
    }

    fn send_fleet_status_update(&self, status: FleetStatus) {
        info!(
            target: "sr.backend.logging",
            cpu_usage = status.cpu_usage,
            memory_utilization = status.memory_utilization,
            conferences = status.conference_count,
            participants = status.participant_count,
            "Fleet status update"
        );
    }
}
