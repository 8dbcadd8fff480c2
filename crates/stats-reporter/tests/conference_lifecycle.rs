//! Tests for the conference reporting lifecycle.
//!
//! Uses tokio's paused clock to drive the reporting timer and a held-setup
//! `MockBackend` to control when the backend answers.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::types::ApplicationId;
use stats_reporter::backend::{BackendErrorReason, ConferenceEventKind};
use stats_reporter::credentials::CredentialConfig;
use stats_reporter::registry::InitCallback;
use stats_reporter::{
    BackendSessionRegistry, ConferencePhase, ConferenceReporter, ConferenceReporterParams,
    CycleOutcome, ReporterError, SessionRequest, SkipReason, StatsService,
};
use stats_test_utils::{
    BackendCall, InitBehavior, MockBackend, MockConnector, MockStatsSource, SetupBehavior,
    TestStream,
};

const PERIOD: Duration = Duration::from_secs(5);

struct IgnoreInit;

impl InitCallback for IgnoreInit {
    fn on_initialized(&self, _service: &Arc<StatsService>, _message: &str) {}

    fn on_error(&self, _error: &ReporterError) {}
}

struct Harness {
    service: Arc<StatsService>,
    backend: Arc<MockBackend>,
    source: Arc<MockStatsSource>,
}

fn harness(setup: SetupBehavior) -> Harness {
    let connector = MockConnector::new(InitBehavior::Succeed, setup);
    let registry = BackendSessionRegistry::new(connector.clone());
    let service = registry
        .get_or_create(
            SessionRequest {
                app_id: ApplicationId(42),
                credentials: CredentialConfig {
                    app_secret: Some("secret".to_string().into()),
                    ..CredentialConfig::default()
                },
                initiator_id: "bridge-1".to_string(),
                is_client: false,
                version: None,
                sdk_config_file: None,
            },
            Arc::new(IgnoreInit),
        )
        .unwrap();
    let backend = connector.client(ApplicationId(42)).unwrap();
    backend.clear_calls();

    let source = Arc::new(MockStatsSource::new());
    source.set_receive("ep1", vec![TestStream::new(111_u64).build()]);

    Harness {
        service,
        backend,
        source,
    }
}

fn params(h: &Harness) -> ConferenceReporterParams {
    ConferenceReporterParams {
        source: h.source.clone(),
        service: Arc::clone(&h.service),
        period: PERIOD,
        conference_name: "room1".to_string(),
        conference_id_prefix: Some("conf".to_string()),
        local_user_id: "bridge-1".to_string(),
        setup_error_handler: None,
    }
}

async fn advance_one_period() {
    tokio::time::advance(PERIOD).await;
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
}

fn events(backend: &MockBackend) -> Vec<ConferenceEventKind> {
    backend
        .conference_events()
        .into_iter()
        .map(|(kind, _)| kind)
        .collect()
}

// ============================================================================
// Start and setup
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_start_sends_setup_and_waits_for_session() {
    let h = harness(SetupBehavior::Hold);
    let reporter = ConferenceReporter::new(params(&h));
    assert_eq!(reporter.phase(), ConferencePhase::Created);
    assert_eq!(reporter.conference_id().as_str(), "conf/room1");

    reporter.start().unwrap();
    assert_eq!(reporter.phase(), ConferencePhase::SetupPending);

    let sent = h.backend.conference_events();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, ConferenceEventKind::Setup);
    assert_eq!(sent[0].1.conference_id, "conf/room1");
    assert_eq!(sent[0].1.local_user_id, "bridge-1");
    assert_eq!(sent[0].1.session_id, None);

    // Ticks while setup is pending report nothing
    advance_one_period().await;
    advance_one_period().await;
    assert!(h.backend.reports().is_empty());
    assert_eq!(h.source.reads(), 0);

    reporter.stop();
}

#[tokio::test(start_paused = true)]
async fn test_second_start_is_noop() {
    let h = harness(SetupBehavior::Hold);
    let reporter = ConferenceReporter::new(params(&h));

    reporter.start().unwrap();
    reporter.start().unwrap();

    assert_eq!(events(&h.backend), vec![ConferenceEventKind::Setup]);
    assert_eq!(h.backend.pending_setups(), 1);
    reporter.stop();
}

#[tokio::test(start_paused = true)]
async fn test_reports_flow_after_setup_confirmed() {
    let h = harness(SetupBehavior::Hold);
    let reporter = ConferenceReporter::new(params(&h));
    reporter.start().unwrap();

    assert_eq!(h.backend.confirm_setup("S1"), 1);
    assert_eq!(reporter.phase(), ConferencePhase::Active);
    assert_eq!(reporter.session_id(), Some("S1"));

    advance_one_period().await;
    let reports = h.backend.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].session_id, "S1");
    assert_eq!(reports[0].conference_id, "conf/room1");
    assert_eq!(reports[0].remote_user_id, "ep1");

    advance_one_period().await;
    assert_eq!(h.backend.reports().len(), 2);

    reporter.stop();
}

#[tokio::test]
async fn test_immediate_setup_confirmation() {
    let h = harness(SetupBehavior::Confirm("S9".to_string()));
    let reporter = ConferenceReporter::new(params(&h));

    reporter.start().unwrap();

    assert_eq!(reporter.phase(), ConferencePhase::Active);
    assert_eq!(reporter.session_id(), Some("S9"));
    assert!(matches!(
        reporter.report_now(),
        CycleOutcome::Completed { endpoints: 1, reports: 1 }
    ));
    reporter.stop();
}

#[tokio::test(start_paused = true)]
async fn test_setup_failure_invokes_handler_and_stays_pending() {
    let h = harness(SetupBehavior::Hold);
    let failures: Arc<Mutex<Vec<(String, Option<BackendErrorReason>)>>> =
        Arc::new(Mutex::new(Vec::new()));
    let failures_clone = Arc::clone(&failures);

    let reporter = ConferenceReporter::new(params(&h).on_setup_error(move |err| {
        failures_clone
            .lock()
            .unwrap()
            .push((err.reason_code().to_string(), err.backend_reason().cloned()));
    }));
    reporter.start().unwrap();

    assert_eq!(
        h.backend
            .fail_setup(BackendErrorReason::Authentication, "token rejected"),
        1
    );

    assert_eq!(reporter.phase(), ConferencePhase::SetupPending);
    assert_eq!(reporter.session_id(), None);
    assert_eq!(
        *failures.lock().unwrap(),
        vec![(
            "setup_failed".to_string(),
            Some(BackendErrorReason::Authentication)
        )]
    );

    advance_one_period().await;
    assert!(h.backend.reports().is_empty());

    // Never activated, so no termination event
    reporter.stop();
    assert_eq!(events(&h.backend), vec![ConferenceEventKind::Setup]);
}

#[test]
fn test_start_outside_runtime_fails() {
    let h = harness(SetupBehavior::Hold);
    let reporter = ConferenceReporter::new(params(&h));
    let result = reporter.start();

    assert!(matches!(result, Err(ReporterError::Internal(_))));
    assert_eq!(reporter.phase(), ConferencePhase::Created);
    assert!(h.backend.conference_events().is_empty());
}

#[tokio::test]
async fn test_zero_period_rejected() {
    let h = harness(SetupBehavior::Hold);
    let mut p = params(&h);
    p.period = Duration::ZERO;
    let reporter = ConferenceReporter::new(p);

    assert!(matches!(reporter.start(), Err(ReporterError::Config(_))));
    assert_eq!(reporter.phase(), ConferencePhase::Created);
}

// ============================================================================
// Stop
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_stop_before_setup_sends_no_termination() {
    let h = harness(SetupBehavior::Hold);
    let reporter = ConferenceReporter::new(params(&h));
    reporter.start().unwrap();

    reporter.stop();
    assert_eq!(reporter.phase(), ConferencePhase::Terminated);

    // Late confirmation is ignored
    h.backend.confirm_setup("S-late");
    assert_eq!(reporter.phase(), ConferencePhase::Terminated);
    assert_eq!(reporter.session_id(), None);

    advance_one_period().await;
    assert!(h.backend.reports().is_empty());
    assert_eq!(events(&h.backend), vec![ConferenceEventKind::Setup]);
}

#[tokio::test]
async fn test_stop_without_start_sends_nothing() {
    let h = harness(SetupBehavior::Hold);
    let reporter = ConferenceReporter::new(params(&h));

    reporter.stop();

    assert_eq!(reporter.phase(), ConferencePhase::Terminated);
    assert!(h.backend.calls().is_empty());

    // A stopped reporter cannot be started again
    reporter.start().unwrap();
    assert!(h.backend.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_double_stop_after_setup_sends_one_termination() {
    let h = harness(SetupBehavior::Hold);
    let reporter = ConferenceReporter::new(params(&h));
    reporter.start().unwrap();
    h.backend.confirm_setup("S1");

    reporter.stop();
    reporter.stop();

    let sent = h.backend.conference_events();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].0, ConferenceEventKind::Terminated);
    assert_eq!(sent[1].1.conference_id, "conf/room1");
    assert_eq!(sent[1].1.session_id.as_deref(), Some("S1"));
}

#[tokio::test(start_paused = true)]
async fn test_no_cycles_after_stop() {
    let h = harness(SetupBehavior::Hold);
    let reporter = ConferenceReporter::new(params(&h));
    reporter.start().unwrap();
    h.backend.confirm_setup("S1");

    advance_one_period().await;
    assert_eq!(h.backend.reports().len(), 1);

    reporter.stop();
    advance_one_period().await;
    advance_one_period().await;

    assert_eq!(h.backend.reports().len(), 1);
    assert_eq!(
        reporter.report_now(),
        CycleOutcome::Skipped(SkipReason::Stopped)
    );
}

#[tokio::test(start_paused = true)]
async fn test_drop_ends_reporting() {
    let h = harness(SetupBehavior::Hold);
    let reporter = ConferenceReporter::new(params(&h));
    reporter.start().unwrap();
    h.backend.confirm_setup("S1");

    advance_one_period().await;
    let reads_before_drop = h.source.reads();
    assert!(reads_before_drop > 0);

    drop(reporter);
    advance_one_period().await;
    advance_one_period().await;

    assert_eq!(h.source.reads(), reads_before_drop);
}

#[tokio::test(start_paused = true)]
async fn test_setup_response_after_drop_is_harmless() {
    let h = harness(SetupBehavior::Hold);
    let reporter = ConferenceReporter::new(params(&h));
    reporter.start().unwrap();
    drop(reporter);

    assert_eq!(h.backend.confirm_setup("S1"), 1);
    advance_one_period().await;

    assert!(h.backend.reports().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_uninitialized_backend_gates_active_conference() {
    let h = harness(SetupBehavior::Confirm("S1".to_string()));
    let reporter = ConferenceReporter::new(params(&h));
    reporter.start().unwrap();
    h.backend.set_initialized(false);

    advance_one_period().await;
    assert!(h.backend.reports().is_empty());

    h.backend.set_initialized(true);
    advance_one_period().await;
    assert_eq!(h.backend.reports().len(), 1);

    reporter.stop();
}

#[tokio::test]
async fn test_conferences_sharing_a_session_bracket_with_their_own_id() {
    let h = harness(SetupBehavior::Hold);
    let mut params_a = params(&h);
    params_a.conference_name = "roomA".to_string();
    let mut params_b = params(&h);
    params_b.conference_name = "roomB".to_string();
    let room_a = ConferenceReporter::new(params_a);
    let room_b = ConferenceReporter::new(params_b);

    room_a.start().unwrap();
    room_b.start().unwrap();
    assert_eq!(h.backend.confirm_setup("S1"), 2);
    h.backend.clear_calls();

    room_a.report_now();
    room_b.report_now();

    let brackets: Vec<BackendCall> = h
        .backend
        .calls()
        .into_iter()
        .filter(|c| matches!(c, BackendCall::BeginBatch { .. } | BackendCall::EndBatch { .. }))
        .collect();
    assert_eq!(
        brackets,
        vec![
            BackendCall::BeginBatch {
                endpoint_id: "ep1".to_string(),
                conference_id: "conf/roomA".to_string(),
            },
            BackendCall::EndBatch {
                endpoint_id: "ep1".to_string(),
                conference_id: "conf/roomA".to_string(),
            },
            BackendCall::BeginBatch {
                endpoint_id: "ep1".to_string(),
                conference_id: "conf/roomB".to_string(),
            },
            BackendCall::EndBatch {
                endpoint_id: "ep1".to_string(),
                conference_id: "conf/roomB".to_string(),
            },
        ]
    );

    room_a.stop();
    room_b.stop();
}
