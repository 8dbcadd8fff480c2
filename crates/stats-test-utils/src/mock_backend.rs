//! Recording mock backend.
//!
//! [`MockBackend`] records every client call in order and lets a test
//! script the asynchronous outcomes: initialization and conference setup
//! can succeed immediately, fail immediately, or be held until the test
//! triggers them.
//!
//! # Example
//!
//! ```rust,ignore
//! use stats_test_utils::{MockBackend, InitBehavior, SetupBehavior};
//!
//! let backend = MockBackend::new(ApplicationId(42))
//!     .with_init(InitBehavior::Hold)
//!     .with_setup(SetupBehavior::Hold)
//!     .into_arc();
//!
//! // ... code under test calls initialize / send_conference_event ...
//!
//! backend.trigger_initialized("ready");
//! backend.confirm_setup("S1");
//! assert_eq!(backend.reports().len(), 0);
//! ```

use common::types::ApplicationId;
use stats_reporter::backend::{
    BackendClient, BackendConnector, BackendErrorReason, ConferenceDescriptor,
    ConferenceEventKind, InitParams, InitializationListener, SetupListener,
};
use stats_reporter::fleet::FleetStatus;
use stats_reporter::report::ConferenceStatsReport;
use stats_reporter::server_info::EndpointType;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Initialize {
        app_id: ApplicationId,
        initiator_id: String,
        credentials: &'static str,
        endpoint_type: EndpointType,
        sdk_config_file: Option<PathBuf>,
    },
    BeginBatch {
        endpoint_id: String,
        conference_id: String,
    },
    EndBatch {
        endpoint_id: String,
        conference_id: String,
    },
    Report {
        remote_user_id: String,
        report: ConferenceStatsReport,
    },
    ConferenceEvent {
        kind: ConferenceEventKind,
        descriptor: ConferenceDescriptor,
    },
    FleetStatus {
        conference_count: u32,
        participant_count: u32,
    },
}

/// Scripted initialization outcome.
#[derive(Debug, Clone)]
pub enum InitBehavior {
    /// Mark the client initialized and notify the listener immediately.
    Succeed,
    /// Notify the listener of a failure immediately.
    Fail(BackendErrorReason, String),
    /// Keep the listener until the test triggers an outcome.
    Hold,
}

/// Scripted conference setup outcome.
#[derive(Debug, Clone)]
pub enum SetupBehavior {
    /// Confirm immediately with this session id.
    Confirm(String),
    /// Reject immediately.
    Fail(BackendErrorReason, String),
    /// Keep the listener until the test confirms or fails it.
    Hold,
}

#[derive(Default)]
struct MockBackendInner {
    calls: Vec<BackendCall>,
    init_listener: Option<Arc<dyn InitializationListener>>,
    pending_setups: Vec<Box<dyn SetupListener>>,
}

/// Recording backend client.
pub struct MockBackend {
    app_id: ApplicationId,
    init_behavior: InitBehavior,
    setup_behavior: SetupBehavior,
    initialized: AtomicBool,
    inner: Mutex<MockBackendInner>,
}

impl MockBackend {
    /// Backend that initializes immediately and holds setup.
    pub fn new(app_id: ApplicationId) -> Self {
        Self {
            app_id,
            init_behavior: InitBehavior::Succeed,
            setup_behavior: SetupBehavior::Hold,
            initialized: AtomicBool::new(false),
            inner: Mutex::new(MockBackendInner::default()),
        }
    }

    pub fn with_init(mut self, behavior: InitBehavior) -> Self {
        self.init_behavior = behavior;
        self
    }

    pub fn with_setup(mut self, behavior: SetupBehavior) -> Self {
        self.setup_behavior = behavior;
        self
    }

    /// Start with `is_initialized()` already true, without any
    /// `initialize` call.
    pub fn initialized(self) -> Self {
        self.initialized.store(true, Ordering::SeqCst);
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn app_id(&self) -> ApplicationId {
        self.app_id
    }

    /// Override what `is_initialized()` reports.
    pub fn set_initialized(&self, initialized: bool) {
        self.initialized.store(initialized, Ordering::SeqCst);
    }

    /// Deliver "initialized" to the stored listener. May be called
    /// repeatedly to simulate re-announcement.
    pub fn trigger_initialized(&self, message: &str) {
        self.initialized.store(true, Ordering::SeqCst);
        let listener = self.inner.lock().unwrap().init_listener.clone();
        if let Some(listener) = listener {
            listener.on_initialized(message);
        }
    }

    /// Deliver an initialization failure to the stored listener.
    pub fn trigger_init_error(&self, reason: BackendErrorReason, message: &str) {
        let listener = self.inner.lock().unwrap().init_listener.clone();
        if let Some(listener) = listener {
            listener.on_error(reason, message.to_string());
        }
    }

    /// Confirm every held setup with `session_id`. Returns how many were
    /// confirmed.
    pub fn confirm_setup(&self, session_id: &str) -> usize {
        let pending = std::mem::take(&mut self.inner.lock().unwrap().pending_setups);
        for listener in &pending {
            listener.on_response(session_id.to_string());
        }
        pending.len()
    }

    /// Reject every held setup. Returns how many were rejected.
    pub fn fail_setup(&self, reason: BackendErrorReason, message: &str) -> usize {
        let pending = std::mem::take(&mut self.inner.lock().unwrap().pending_setups);
        for listener in &pending {
            listener.on_error(reason.clone(), message.to_string());
        }
        pending.len()
    }

    /// Number of setups waiting for an outcome.
    pub fn pending_setups(&self) -> usize {
        self.inner.lock().unwrap().pending_setups.len()
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().unwrap().calls.clear();
    }

    /// Recorded reports, in order.
    pub fn reports(&self) -> Vec<ConferenceStatsReport> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                BackendCall::Report { report, .. } => Some(report),
                _ => None,
            })
            .collect()
    }

    /// Recorded conference events, in order.
    pub fn conference_events(&self) -> Vec<(ConferenceEventKind, ConferenceDescriptor)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                BackendCall::ConferenceEvent { kind, descriptor } => Some((kind, descriptor)),
                _ => None,
            })
            .collect()
    }

    /// Number of `initialize` calls received.
    pub fn initialize_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, BackendCall::Initialize { .. }))
            .count()
    }

    fn record(&self, call: BackendCall) {
        self.inner.lock().unwrap().calls.push(call);
    }
}

impl BackendClient for MockBackend {
    fn initialize(&self, params: InitParams, listener: Box<dyn InitializationListener>) {
        self.record(BackendCall::Initialize {
            app_id: params.app_id,
            initiator_id: params.initiator_id.clone(),
            credentials: params.credentials.kind(),
            endpoint_type: params.server_info.endpoint_type,
            sdk_config_file: params.sdk_config_file.clone(),
        });

        let listener: Arc<dyn InitializationListener> = Arc::from(listener);
        self.inner.lock().unwrap().init_listener = Some(Arc::clone(&listener));

        match &self.init_behavior {
            InitBehavior::Succeed => {
                self.initialized.store(true, Ordering::SeqCst);
                listener.on_initialized("mock backend ready");
            }
            InitBehavior::Fail(reason, message) => listener.on_error(reason.clone(), message.clone()),
            InitBehavior::Hold => {}
        }
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    fn begin_endpoint_batch(&self, endpoint_id: &str, conference_id: &str) {
        self.record(BackendCall::BeginBatch {
            endpoint_id: endpoint_id.to_string(),
            conference_id: conference_id.to_string(),
        });
    }

    fn end_endpoint_batch(&self, endpoint_id: &str, conference_id: &str) {
        self.record(BackendCall::EndBatch {
            endpoint_id: endpoint_id.to_string(),
            conference_id: conference_id.to_string(),
        });
    }

    fn submit_report(&self, remote_user_id: &str, report: ConferenceStatsReport) {
        self.record(BackendCall::Report {
            remote_user_id: remote_user_id.to_string(),
            report,
        });
    }

    fn send_conference_event(
        &self,
        kind: ConferenceEventKind,
        descriptor: ConferenceDescriptor,
        listener: Option<Box<dyn SetupListener>>,
    ) {
        self.record(BackendCall::ConferenceEvent { kind, descriptor });

        let Some(listener) = listener else {
            return;
        };
        match &self.setup_behavior {
            SetupBehavior::Confirm(session_id) => listener.on_response(session_id.clone()),
            SetupBehavior::Fail(reason, message) => listener.on_error(reason.clone(), message.clone()),
            SetupBehavior::Hold => self.inner.lock().unwrap().pending_setups.push(listener),
        }
    }

    fn send_fleet_status_update(&self, status: FleetStatus) {
        self.record(BackendCall::FleetStatus {
            conference_count: status.conference_count,
            participant_count: status.participant_count,
        });
    }
}

/// Connector creating [`MockBackend`]s with shared scripted behavior.
pub struct MockConnector {
    init_behavior: InitBehavior,
    setup_behavior: SetupBehavior,
    creations: AtomicUsize,
    clients: Mutex<HashMap<ApplicationId, Arc<MockBackend>>>,
}

impl MockConnector {
    pub fn new(init_behavior: InitBehavior, setup_behavior: SetupBehavior) -> Arc<Self> {
        Arc::new(Self {
            init_behavior,
            setup_behavior,
            creations: AtomicUsize::new(0),
            clients: Mutex::new(HashMap::new()),
        })
    }

    /// Number of `create_client` calls.
    pub fn creations(&self) -> usize {
        self.creations.load(Ordering::SeqCst)
    }

    /// Most recently created client for `app_id`.
    pub fn client(&self, app_id: ApplicationId) -> Option<Arc<MockBackend>> {
        self.clients.lock().unwrap().get(&app_id).cloned()
    }
}

impl BackendConnector for MockConnector {
    fn create_client(&self, app_id: ApplicationId) -> Arc<dyn BackendClient> {
        self.creations.fetch_add(1, Ordering::SeqCst);
        let client = MockBackend::new(app_id)
            .with_init(self.init_behavior.clone())
            .with_setup(self.setup_behavior.clone())
            .into_arc();
        self.clients
            .lock()
            .unwrap()
            .insert(app_id, Arc::clone(&client));
        client
    }
}
