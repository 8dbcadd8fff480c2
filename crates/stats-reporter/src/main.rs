//! Stats Reporter (dry run)
//!
//! Wires the reporter to a logging backend and replays a snapshot file
//! every reporting period, so the full pipeline can be observed without a
//! monitoring backend.
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment
//! 2. Initialize Prometheus metrics recorder
//! 3. Resolve the backend SDK config file
//! 4. Create the backend session through the registry
//! 5. Start conference reporting and the fleet status task
//! 6. Wait for shutdown signal, then stop reporting

#![warn(clippy::pedantic)]

use std::sync::Arc;

use stats_reporter::backend::LoggingConnector;
use stats_reporter::config::Config;
use stats_reporter::fleet::{run_fleet_status_loop, FleetLoad};
use stats_reporter::observability::init_metrics_recorder;
use stats_reporter::sdk_config::{resolve_sdk_config, SdkConfigSearch};
use stats_reporter::snapshot::StaticStatsSource;
use stats_reporter::{
    BackendSessionRegistry, ConferenceReporter, ConferenceReporterParams, InitCallback,
    ReporterError, SessionRequest, StatsService,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

struct LogInitCallback;

impl InitCallback for LogInitCallback {
    fn on_initialized(&self, service: &Arc<StatsService>, message: &str) {
        info!(app_id = %service.id(), detail = message, "Backend session ready");
    }

    fn on_error(&self, error: &ReporterError) {
        error!(error = %error, reason = error.reason_code(), "Backend session failed");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stats_reporter=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Stats Reporter (dry run)");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        app_id = %config.app_id,
        initiator_id = %config.initiator_id,
        reporting_interval_ms = u64::try_from(config.reporting_interval.as_millis()).unwrap_or(u64::MAX),
        fleet_status_interval_ms = u64::try_from(config.fleet_status_interval.as_millis()).unwrap_or(u64::MAX),
        is_client = config.is_client,
        "Configuration loaded successfully"
    );

    info!("Initializing Prometheus metrics recorder...");
    let prometheus_handle = init_metrics_recorder().map_err(|e| {
        error!(error = %e, "Failed to install Prometheus metrics recorder");
        e
    })?;
    info!("Prometheus metrics recorder initialized");

    let search =
        SdkConfigSearch::from_current_dir(config.home_location.clone(), config.home_name.clone())?;
    let sdk_config_file = resolve_sdk_config(config.sdk_config_file.as_deref(), &search);
    match &sdk_config_file {
        Some(path) => info!(path = %path.display(), "Using SDK config file"),
        None => warn!("No SDK config file, backend SDK defaults apply"),
    }

    let source = match &config.snapshot_file {
        Some(path) => StaticStatsSource::from_file(path).map_err(|e| {
            error!(error = %e, path = %path.display(), "Failed to load snapshot file");
            e
        })?,
        None => {
            warn!("STATS_SNAPSHOT_FILE not set, reporting empty snapshots");
            StaticStatsSource::default()
        }
    };
    let participants = u32::try_from(source.endpoints().len()).unwrap_or(u32::MAX);

    let registry = BackendSessionRegistry::new(Arc::new(LoggingConnector));
    let service = registry.get_or_create(
        SessionRequest {
            app_id: config.app_id,
            credentials: config.credentials(),
            initiator_id: config.initiator_id.clone(),
            is_client: config.is_client,
            version: None,
            sdk_config_file,
        },
        Arc::new(LogInitCallback),
    )?;

    let load = FleetLoad::new();
    load.set_participants(participants);

    let reporter = ConferenceReporter::new(
        ConferenceReporterParams {
            source: Arc::new(source),
            service: Arc::clone(&service),
            period: config.reporting_interval,
            conference_name: config.conference_name.clone(),
            conference_id_prefix: config.conference_id_prefix.clone(),
            local_user_id: config.initiator_id.clone(),
            setup_error_handler: None,
        }
        .on_setup_error(|e| error!(error = %e, "Conference setup rejected")),
    );
    reporter.start()?;
    load.increment_conferences();

    let cancel_token = CancellationToken::new();
    let fleet_task = tokio::spawn(run_fleet_status_loop(
        Arc::clone(&service),
        Arc::clone(&load),
        config.fleet_status_interval,
        cancel_token.clone(),
    ));

    info!(conference_id = %reporter.conference_id(), "Stats Reporter running");

    signal::ctrl_c().await?;
    info!("Shutdown signal received");

    reporter.stop();
    load.decrement_conferences();
    cancel_token.cancel();
    if let Err(e) = fleet_task.await {
        warn!(error = %e, "Fleet status task ended abnormally");
    }

    info!(metrics = %prometheus_handle.render(), "Final metrics");
    info!("Stats Reporter shutdown complete");

    Ok(())
}
