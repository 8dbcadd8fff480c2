//! Backend session registry.
//!
//! Holds exactly one [`StatsService`] per application id for the life of
//! the process. The first request for an id creates the backend client,
//! registers the session and starts initialization; later requests get the
//! same session back without touching the backend.
//!
//! Initialization completes asynchronously. The backend may announce
//! "initialized" more than once; the registry marks the session
//! initialized and notifies the caller only the first time.

use crate::backend::{
    BackendClient, BackendConnector, BackendErrorReason, InitParams, InitializationListener,
};
use crate::credentials::CredentialConfig;
use crate::errors::ReporterError;
use crate::fleet::FleetStatus;
use crate::observability::metrics;
use crate::server_info::ServerInfo;
use common::types::ApplicationId;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{debug, error, info};

/// Receiver of session initialization outcomes.
pub trait InitCallback: Send + Sync {
    /// The session is ready. Called at most once per session.
    fn on_initialized(&self, service: &Arc<StatsService>, message: &str);

    /// Session creation or initialization failed.
    fn on_error(&self, error: &ReporterError);
}

/// Handle to one backend session.
pub struct StatsService {
    id: ApplicationId,
    client: Arc<dyn BackendClient>,
    initialized: AtomicBool,
    is_client: bool,
}

impl StatsService {
    fn new(id: ApplicationId, client: Arc<dyn BackendClient>, is_client: bool) -> Self {
        Self {
            id,
            client,
            initialized: AtomicBool::new(false),
            is_client,
        }
    }

    #[must_use]
    pub fn id(&self) -> ApplicationId {
        self.id
    }

    #[must_use]
    pub fn client(&self) -> &Arc<dyn BackendClient> {
        &self.client
    }

    /// Whether the backend has confirmed initialization of this session.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_client(&self) -> bool {
        self.is_client
    }

    /// Returns `true` only for the call that flipped the flag.
    pub(crate) fn mark_initialized(&self) -> bool {
        self.initialized
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Send a fleet status record if the backend client is initialized.
    ///
    /// Returns whether the update was handed to the client. The backend
    /// does not queue updates, so a skipped one is dropped.
    pub fn send_fleet_status_update(&self, status: FleetStatus) -> bool {
        if !self.client.is_initialized() {
            debug!(
                target: "sr.fleet",
                app_id = %self.id,
                "Backend not initialized, skipping fleet status update"
            );
            metrics::record_fleet_status_update("skipped");
            return false;
        }

        self.client.send_fleet_status_update(status);
        metrics::record_fleet_status_update("sent");
        true
    }
}

impl std::fmt::Debug for StatsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsService")
            .field("id", &self.id)
            .field("initialized", &self.is_initialized())
            .field("is_client", &self.is_client)
            .finish_non_exhaustive()
    }
}

/// Application name and version announced at initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub name: String,
    pub version: String,
}

/// Request for a backend session.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub app_id: ApplicationId,
    pub credentials: CredentialConfig,
    /// Initiator id announced to the backend.
    pub initiator_id: String,
    pub is_client: bool,
    /// Defaults to this crate's name and version.
    pub version: Option<VersionInfo>,
    /// Resolved SDK configuration file handed to the client.
    pub sdk_config_file: Option<PathBuf>,
}

impl SessionRequest {
    fn server_info(&self) -> ServerInfo {
        match &self.version {
            Some(v) => ServerInfo::current(&v.name, &v.version, self.is_client),
            None => ServerInfo::for_this_crate(self.is_client),
        }
    }
}

struct RegistryInner {
    sessions: Mutex<HashMap<ApplicationId, Arc<StatsService>>>,
    connector: Arc<dyn BackendConnector>,
}

impl RegistryInner {
    fn lock_sessions(&self) -> MutexGuard<'_, HashMap<ApplicationId, Arc<StatsService>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Registry of backend sessions keyed by application id.
///
/// Cheap to clone; clones share the same sessions.
#[derive(Clone)]
pub struct BackendSessionRegistry {
    inner: Arc<RegistryInner>,
}

impl BackendSessionRegistry {
    #[must_use]
    pub fn new(connector: Arc<dyn BackendConnector>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                sessions: Mutex::new(HashMap::new()),
                connector,
            }),
        }
    }

    /// Return the session for `request.app_id`, creating and initializing
    /// it on first use.
    ///
    /// An existing session is returned as is: no re-initialization and no
    /// callbacks. A new session is registered before initialization starts,
    /// so concurrent callers share it.
    ///
    /// # Errors
    ///
    /// Returns `ReporterError::MissingCredentials` when neither a key pair
    /// nor a shared secret is configured. `callback.on_error` receives the
    /// same error and nothing is registered.
    pub fn get_or_create(
        &self,
        request: SessionRequest,
        callback: Arc<dyn InitCallback>,
    ) -> Result<Arc<StatsService>, ReporterError> {
        let mut sessions = self.inner.lock_sessions();
        if let Some(existing) = sessions.get(&request.app_id) {
            debug!(target: "sr.registry", app_id = %request.app_id, "Reusing backend session");
            return Ok(Arc::clone(existing));
        }

        let credentials = match request.credentials.resolve() {
            Ok(credentials) => credentials,
            Err(err) => {
                drop(sessions);
                error!(
                    target: "sr.registry",
                    app_id = %request.app_id,
                    error = %err,
                    "Cannot create backend session"
                );
                callback.on_error(&err);
                return Err(err);
            }
        };

        let client = self.inner.connector.create_client(request.app_id);
        let service = Arc::new(StatsService::new(
            request.app_id,
            Arc::clone(&client),
            request.is_client,
        ));
        sessions.insert(request.app_id, Arc::clone(&service));
        metrics::set_backend_sessions(sessions.len());
        drop(sessions);

        info!(
            target: "sr.registry",
            app_id = %request.app_id,
            credentials = credentials.kind(),
            is_client = request.is_client,
            "Initializing backend session"
        );

        let params = InitParams {
            app_id: request.app_id,
            credentials,
            initiator_id: request.initiator_id.clone(),
            server_info: request.server_info(),
            sdk_config_file: request.sdk_config_file.clone(),
        };
        let listener = InitListener {
            registry: Arc::downgrade(&self.inner),
            app_id: request.app_id,
            callback,
        };
        client.initialize(params, Box::new(listener));

        Ok(service)
    }

    #[must_use]
    pub fn get(&self, app_id: ApplicationId) -> Option<Arc<StatsService>> {
        self.inner.lock_sessions().get(&app_id).cloned()
    }

    /// Forget the session for `app_id`. Late initialization callbacks for
    /// it are ignored.
    pub fn remove(&self, app_id: ApplicationId) -> Option<Arc<StatsService>> {
        let mut sessions = self.inner.lock_sessions();
        let removed = sessions.remove(&app_id);
        metrics::set_backend_sessions(sessions.len());
        removed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock_sessions().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock_sessions().is_empty()
    }
}

/// Initialization listener for one session.
#[derive(Clone)]
struct InitListener {
    registry: Weak<RegistryInner>,
    app_id: ApplicationId,
    callback: Arc<dyn InitCallback>,
}

impl InitializationListener for InitListener {
    fn on_initialized(&self, message: &str) {
        let Some(registry) = self.registry.upgrade() else {
            debug!(target: "sr.registry", app_id = %self.app_id, "Registry gone, ignoring initialization");
            return;
        };

        let service = {
            let sessions = registry.lock_sessions();
            match sessions.get(&self.app_id) {
                Some(service) if service.mark_initialized() => Arc::clone(service),
                Some(_) => {
                    debug!(
                        target: "sr.registry",
                        app_id = %self.app_id,
                        "Backend session already initialized"
                    );
                    return;
                }
                None => {
                    debug!(
                        target: "sr.registry",
                        app_id = %self.app_id,
                        "Initialization for unregistered session ignored"
                    );
                    return;
                }
            }
        };

        info!(target: "sr.registry", app_id = %self.app_id, detail = message, "Backend session initialized");
        self.callback.on_initialized(&service, message);
    }

    fn on_error(&self, reason: BackendErrorReason, message: String) {
        error!(
            target: "sr.registry",
            app_id = %self.app_id,
            reason = reason.as_str(),
            detail = %message,
            "Backend session initialization failed"
        );
        self.callback
            .on_error(&ReporterError::InitializationFailed { reason, message });
    }
}
