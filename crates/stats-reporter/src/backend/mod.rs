//! Monitoring backend collaborator interfaces.
//!
//! The reporter never talks to the network itself. A [`BackendConnector`]
//! creates one [`BackendClient`] per application id, and every report,
//! lifecycle event and fleet status update goes through that client.
//!
//! Client calls are fire-and-forget from the reporter's point of view.
//! Asynchronous outcomes (initialization, conference setup) come back
//! through the listener traits defined here, possibly on another thread.

pub mod logging;

use crate::credentials::ResolvedCredentials;
use crate::fleet::FleetStatus;
use crate::report::ConferenceStatsReport;
use crate::server_info::ServerInfo;
use common::types::ApplicationId;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

pub use logging::{LoggingBackendClient, LoggingConnector};

/// Reason attached to a backend failure callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendErrorReason {
    /// Credentials were rejected.
    Authentication,
    /// The backend could not be reached.
    Connectivity,
    /// The backend answered with something unexpected.
    Protocol,
    /// The request carried invalid parameters.
    InvalidParameters,
    /// Any other backend-reported failure.
    Other,
}

impl BackendErrorReason {
    /// Bounded label for logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            BackendErrorReason::Authentication => "authentication",
            BackendErrorReason::Connectivity => "connectivity",
            BackendErrorReason::Protocol => "protocol",
            BackendErrorReason::InvalidParameters => "invalid_parameters",
            BackendErrorReason::Other => "other",
        }
    }
}

impl fmt::Display for BackendErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conference lifecycle event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConferenceEventKind {
    Setup,
    Terminated,
}

impl ConferenceEventKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConferenceEventKind::Setup => "setup",
            ConferenceEventKind::Terminated => "terminated",
        }
    }
}

/// Identity of the conference a lifecycle event refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConferenceDescriptor {
    pub conference_id: String,
    pub local_user_id: String,
    /// Backend-assigned session id; absent on setup.
    pub session_id: Option<String>,
}

/// Parameters handed to [`BackendClient::initialize`].
#[derive(Debug, Clone)]
pub struct InitParams {
    pub app_id: ApplicationId,
    pub credentials: ResolvedCredentials,
    pub initiator_id: String,
    pub server_info: ServerInfo,
    /// SDK configuration file the client should load, if one was found.
    pub sdk_config_file: Option<PathBuf>,
}

/// One-shot receiver of a conference setup outcome.
pub trait SetupListener: Send + Sync {
    /// The backend accepted the setup and assigned `session_id`.
    fn on_response(&self, session_id: String);

    /// The backend rejected the setup.
    fn on_error(&self, reason: BackendErrorReason, message: String);
}

/// Receiver of backend initialization outcomes.
///
/// The backend may announce success more than once.
pub trait InitializationListener: Send + Sync {
    fn on_initialized(&self, message: &str);

    fn on_error(&self, reason: BackendErrorReason, message: String);
}

/// Client of the external monitoring backend for one application id.
pub trait BackendClient: Send + Sync {
    /// Start asynchronous initialization. The outcome is delivered to
    /// `listener`.
    fn initialize(&self, params: InitParams, listener: Box<dyn InitializationListener>);

    /// Whether the client reports itself initialized.
    fn is_initialized(&self) -> bool;

    /// Open the report batch for one remote endpoint of one conference.
    ///
    /// A client is shared by every conference of its application id, so
    /// batches are keyed by both ids.
    fn begin_endpoint_batch(&self, endpoint_id: &str, conference_id: &str);

    /// Close the report batch opened by `begin_endpoint_batch`.
    fn end_endpoint_batch(&self, endpoint_id: &str, conference_id: &str);

    /// Submit one stream report inside the current batch.
    fn submit_report(&self, remote_user_id: &str, report: ConferenceStatsReport);

    /// Send a conference lifecycle event. Setup events carry a listener.
    fn send_conference_event(
        &self,
        kind: ConferenceEventKind,
        descriptor: ConferenceDescriptor,
        listener: Option<Box<dyn SetupListener>>,
    );

    /// Send a fleet (server load) status record.
    fn send_fleet_status_update(&self, status: FleetStatus);
}

/// Factory for backend clients.
pub trait BackendConnector: Send + Sync {
    fn create_client(&self, app_id: ApplicationId) -> Arc<dyn BackendClient>;
}
