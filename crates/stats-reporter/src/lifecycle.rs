//! Conference reporting lifecycle.
//!
//! ```text
//!   Created --start()--> SetupPending --setup response--> Active
//!      |                      |                             |
//!      +------stop()----------+-----------stop()------------+--> Terminated
//! ```
//!
//! `start()` announces the conference to the backend and starts the
//! reporting timer. Reports only flow once the backend has answered the
//! setup with a session id. `stop()` cancels the timer and, if setup had
//! completed, announces termination exactly once.
//!
//! The setup listener and the timer task only hold weak references to the
//! conference, so dropping the [`ConferenceReporter`] is enough to end
//! reporting even if the backend never answers.

use crate::backend::{
    BackendErrorReason, ConferenceDescriptor, ConferenceEventKind, SetupListener,
};
use crate::context::ConferenceContext;
use crate::engine::{self, run_reporting_loop, CycleOutcome, PeriodicReportingEngine, SkipReason};
use crate::errors::ReporterError;
use crate::observability::metrics;
use crate::registry::StatsService;
use crate::snapshot::StatsSource;
use common::types::ConferenceId;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Lifecycle phase of a reported conference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConferencePhase {
    Created,
    SetupPending,
    Active,
    Terminated,
}

impl ConferencePhase {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConferencePhase::Created => "created",
            ConferencePhase::SetupPending => "setup_pending",
            ConferencePhase::Active => "active",
            ConferencePhase::Terminated => "terminated",
        }
    }
}

/// Callback invoked when the backend rejects conference setup.
pub type SetupErrorHandler = Arc<dyn Fn(&ReporterError) + Send + Sync>;

/// Everything needed to report one conference.
pub struct ConferenceReporterParams {
    /// Per-endpoint stream statistics for this conference.
    pub source: Arc<dyn StatsSource>,
    /// Backend session reports are sent through.
    pub service: Arc<StatsService>,
    /// Period between reporting cycles.
    pub period: Duration,
    pub conference_name: String,
    pub conference_id_prefix: Option<String>,
    pub local_user_id: String,
    pub setup_error_handler: Option<SetupErrorHandler>,
}

impl ConferenceReporterParams {
    /// Install a handler for setup rejections.
    #[must_use]
    pub fn on_setup_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ReporterError) + Send + Sync + 'static,
    {
        self.setup_error_handler = Some(Arc::new(handler));
        self
    }
}

struct ConferenceShared {
    context: ConferenceContext,
    engine: PeriodicReportingEngine,
    /// Reporting cycles run while holding this lock so that no cycle can
    /// start after `stop()` has released it.
    phase: Mutex<ConferencePhase>,
    setup_error_handler: Option<SetupErrorHandler>,
}

impl ConferenceShared {
    fn lock_phase(&self) -> MutexGuard<'_, ConferencePhase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn report(&self) -> CycleOutcome {
        let phase = self.lock_phase();
        if *phase == ConferencePhase::Terminated {
            return engine::skip(&self.context, SkipReason::Stopped);
        }
        self.engine.run_cycle(&self.context)
    }

    fn complete_setup(&self, session_id: String) {
        let mut phase = self.lock_phase();
        if *phase != ConferencePhase::SetupPending {
            warn!(
                target: "sr.lifecycle",
                conference_id = %self.context.conference_id(),
                phase = phase.as_str(),
                "Ignoring setup response outside of setup"
            );
            return;
        }

        self.context.assign_session_id(session_id);
        *phase = ConferencePhase::Active;
        drop(phase);

        info!(
            target: "sr.lifecycle",
            conference_id = %self.context.conference_id(),
            session_id = self.context.session_id().unwrap_or_default(),
            "Conference setup completed"
        );
    }

    fn fail_setup(&self, reason: BackendErrorReason, message: String) {
        error!(
            target: "sr.lifecycle",
            conference_id = %self.context.conference_id(),
            reason = reason.as_str(),
            detail = %message,
            "Conference setup failed"
        );
        metrics::record_setup_failure(reason.as_str());

        if let Some(handler) = &self.setup_error_handler {
            handler(&ReporterError::SetupFailed { reason, message });
        }
    }

    fn descriptor(&self) -> ConferenceDescriptor {
        ConferenceDescriptor {
            conference_id: self.context.conference_id().to_string(),
            local_user_id: self.context.local_user_id().to_string(),
            session_id: self.context.session_id().map(str::to_string),
        }
    }
}

struct SetupResponseListener {
    conference: Weak<ConferenceShared>,
}

impl SetupListener for SetupResponseListener {
    fn on_response(&self, session_id: String) {
        match self.conference.upgrade() {
            Some(conference) => conference.complete_setup(session_id),
            None => debug!(target: "sr.lifecycle", "Setup response for dropped conference"),
        }
    }

    fn on_error(&self, reason: BackendErrorReason, message: String) {
        match self.conference.upgrade() {
            Some(conference) => conference.fail_setup(reason, message),
            None => debug!(
                target: "sr.lifecycle",
                reason = reason.as_str(),
                "Setup error for dropped conference"
            ),
        }
    }
}

/// Reports one conference to the backend from setup to termination.
pub struct ConferenceReporter {
    shared: Arc<ConferenceShared>,
    period: Duration,
    cancel_token: CancellationToken,
}

impl ConferenceReporter {
    /// Build a reporter in the `Created` phase.
    ///
    /// The conference id is derived from the prefix and name here and never
    /// changes afterwards.
    #[must_use]
    pub fn new(params: ConferenceReporterParams) -> Self {
        let conference_id = ConferenceId::new(
            params.conference_id_prefix.as_deref(),
            &params.conference_name,
        );
        let engine = PeriodicReportingEngine::new(params.source, Arc::clone(params.service.client()));

        Self {
            shared: Arc::new(ConferenceShared {
                context: ConferenceContext::new(conference_id, params.local_user_id),
                engine,
                phase: Mutex::new(ConferencePhase::Created),
                setup_error_handler: params.setup_error_handler,
            }),
            period: params.period,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Announce the conference and start the reporting timer.
    ///
    /// Calling `start()` again, or after `stop()`, logs and does nothing.
    ///
    /// # Errors
    ///
    /// Returns `ReporterError::Internal` when called outside a Tokio
    /// runtime and `ReporterError::Config` for a zero period. The reporter
    /// stays in `Created` in both cases.
    pub fn start(&self) -> Result<(), ReporterError> {
        if self.period.is_zero() {
            return Err(ReporterError::Config(
                "reporting period must be greater than zero".to_string(),
            ));
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ReporterError::Internal(format!("no tokio runtime: {e}")))?;

        {
            let mut phase = self.shared.lock_phase();
            if *phase != ConferencePhase::Created {
                warn!(
                    target: "sr.lifecycle",
                    conference_id = %self.shared.context.conference_id(),
                    phase = phase.as_str(),
                    "Conference reporter already started"
                );
                return Ok(());
            }
            *phase = ConferencePhase::SetupPending;
        }

        info!(
            target: "sr.lifecycle",
            conference_id = %self.shared.context.conference_id(),
            local_user_id = self.shared.context.local_user_id(),
            period_ms = u64::try_from(self.period.as_millis()).unwrap_or(u64::MAX),
            "Starting conference reporting"
        );

        let listener = SetupResponseListener {
            conference: Arc::downgrade(&self.shared),
        };
        self.shared.engine.client().send_conference_event(
            ConferenceEventKind::Setup,
            self.shared.descriptor(),
            Some(Box::new(listener)),
        );
        metrics::record_conference_event(ConferenceEventKind::Setup.as_str());

        let conference = Arc::downgrade(&self.shared);
        runtime.spawn(run_reporting_loop(
            self.period,
            self.cancel_token.clone(),
            move || match conference.upgrade() {
                Some(conference) => {
                    conference.report();
                    true
                }
                None => false,
            },
        ));

        Ok(())
    }

    /// Stop reporting. Idempotent.
    ///
    /// Once this returns no further cycle starts. The termination event is
    /// sent only if setup had completed, and only on the first call.
    pub fn stop(&self) {
        let previous = {
            let mut phase = self.shared.lock_phase();
            std::mem::replace(&mut *phase, ConferencePhase::Terminated)
        };
        self.cancel_token.cancel();

        match previous {
            ConferencePhase::Terminated => {
                debug!(
                    target: "sr.lifecycle",
                    conference_id = %self.shared.context.conference_id(),
                    "Conference reporter already stopped"
                );
            }
            ConferencePhase::Active => {
                self.shared.engine.client().send_conference_event(
                    ConferenceEventKind::Terminated,
                    self.shared.descriptor(),
                    None,
                );
                metrics::record_conference_event(ConferenceEventKind::Terminated.as_str());
                info!(
                    target: "sr.lifecycle",
                    conference_id = %self.shared.context.conference_id(),
                    "Conference reporting stopped"
                );
            }
            ConferencePhase::Created | ConferencePhase::SetupPending => {
                info!(
                    target: "sr.lifecycle",
                    conference_id = %self.shared.context.conference_id(),
                    phase = previous.as_str(),
                    "Conference reporting stopped before setup completed"
                );
            }
        }
    }

    /// Run one cycle now, through the same gate as the timer.
    pub fn report_now(&self) -> CycleOutcome {
        self.shared.report()
    }

    #[must_use]
    pub fn phase(&self) -> ConferencePhase {
        *self.shared.lock_phase()
    }

    #[must_use]
    pub fn conference_id(&self) -> &ConferenceId {
        self.shared.context.conference_id()
    }

    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.shared.context.session_id()
    }
}

impl Drop for ConferenceReporter {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}
