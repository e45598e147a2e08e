//! Process entry point: loads configuration, wires the services together,
//! spawns the three pipeline worker threads (C8/C9/C10), and serves the
//! gateway until interrupted.

use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::bounded;

use options_exchange::config::AppConfig;
use options_exchange::coordinator::ResponseCoordinator;
use options_exchange::fee::FeeService;
use options_exchange::gateway;
use options_exchange::gateway::state::AppState;
use options_exchange::logging;
use options_exchange::messages::{IntakeMessage, MatchJob, SettleJob};
use options_exchange::models::Instrument;
use options_exchange::phase::PhaseManager;
use options_exchange::position::PositionService;
use options_exchange::publisher::EventPublisher;
use options_exchange::rate_limiter::RateLimiter;
use options_exchange::team_directory::TeamDirectory;
use options_exchange::validator::ConstraintValidator;
use options_exchange::venue::ExchangeVenue;
use options_exchange::workers::{run_matching_worker, run_trade_processor, run_validation_worker, Services};

const INTAKE_QUEUE_CAPACITY: usize = 4096;
const MATCH_QUEUE_CAPACITY: usize = 4096;
const SETTLE_QUEUE_CAPACITY: usize = 4096;
const PHASE_POLL_INTERVAL: Duration = Duration::from_millis(50);

fn main() {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.yaml".to_string());
    let config = AppConfig::from_file(&config_path).unwrap_or_else(|e| {
        eprintln!("failed to load configuration from {config_path}: {e}");
        std::process::exit(1);
    });

    let _logging_guard = logging::init_logging(&config);
    tracing::info!(path = %config_path, "configuration loaded");

    let phase_manager = PhaseManager::from_config(&config.phases).unwrap_or_else(|e| {
        tracing::error!(%e, "invalid phase configuration");
        std::process::exit(1);
    });

    let instruments: Vec<Instrument> = config
        .instruments
        .iter()
        .map(|i| Instrument {
            instrument_id: i.instrument_id,
            symbol: i.symbol.clone(),
            underlying: i.underlying.clone(),
            strike: i.strike,
            expiry: i.expiry.clone(),
            option_type: i.option_type.clone(),
        })
        .collect();

    let venue = Arc::new(ExchangeVenue::new(instruments, phase_manager));
    let validator = Arc::new(ConstraintValidator::from_roles(&config.roles.0));
    let positions = Arc::new(PositionService::new());
    let fees = Arc::new(FeeService::from_roles(&config.fee_schedules()));
    let rate_limiter = Arc::new(RateLimiter::new());
    let directory = Arc::new(TeamDirectory::new());
    let coordinator = ResponseCoordinator::new(
        config.coordinator.max_pending_requests,
        config.coordinator.completed_grace_seconds as i64,
        config.coordinator.cleanup_interval_seconds,
    );
    let publisher = Arc::new(EventPublisher::new());

    let (intake_tx, intake_rx) = bounded::<IntakeMessage>(INTAKE_QUEUE_CAPACITY);
    let (match_tx, match_rx) = bounded::<MatchJob>(MATCH_QUEUE_CAPACITY);
    let (settle_tx, settle_rx) = bounded::<SettleJob>(SETTLE_QUEUE_CAPACITY);

    let services = Services {
        venue: venue.clone(),
        validator,
        positions: positions.clone(),
        fees,
        rate_limiter,
        directory,
        coordinator: coordinator.clone(),
        publisher: publisher.clone(),
    };

    let validation_services = services.clone();
    let validation_handle = std::thread::Builder::new()
        .name("validation-worker".into())
        .spawn(move || run_validation_worker(validation_services, intake_rx, match_tx))
        .expect("failed to spawn validation worker");

    let matching_services = services.clone();
    let matching_handle = std::thread::Builder::new()
        .name("matching-worker".into())
        .spawn(move || run_matching_worker(matching_services, match_rx, settle_tx, PHASE_POLL_INTERVAL))
        .expect("failed to spawn matching worker");

    let settlement_services = services;
    let settlement_handle = std::thread::Builder::new()
        .name("trade-processor".into())
        .spawn(move || run_trade_processor(settlement_services, settle_rx))
        .expect("failed to spawn trade processor");

    let state = Arc::new(AppState::new(venue, coordinator.clone(), publisher, positions, intake_tx, &config));
    let port = config.server.port;

    let runtime = tokio::runtime::Runtime::new().expect("failed to build tokio runtime");
    runtime.block_on(async move {
        tokio::select! {
            _ = gateway::run_server(port, state) => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown signal received");
            }
        }
    });

    coordinator.shutdown();
    drop(runtime);

    for handle in [validation_handle, matching_handle, settlement_handle] {
        let _ = handle.join();
    }
}
