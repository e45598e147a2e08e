//! Gateway application state (shared, `Arc`-wrapped service handles).

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crossbeam::channel::Sender;

use crate::config::AppConfig;
use crate::coordinator::ResponseCoordinator;
use crate::messages::IntakeMessage;
use crate::position::PositionService;
use crate::publisher::EventPublisher;
use crate::venue::ExchangeVenue;

#[derive(Clone)]
pub struct AppState {
    pub venue: Arc<ExchangeVenue>,
    pub coordinator: Arc<ResponseCoordinator>,
    pub publisher: Arc<EventPublisher>,
    pub positions: Arc<PositionService>,
    /// C8's intake queue. The gateway is the only producer; the validation
    /// worker is the only consumer (spec.md §5 "bounded, multi-producer,
    /// single-consumer FIFO").
    pub intake_tx: Sender<IntakeMessage>,
    order_id_gen: Arc<AtomicU64>,
    pub default_timeout: Duration,
}

impl AppState {
    pub fn new(
        venue: Arc<ExchangeVenue>,
        coordinator: Arc<ResponseCoordinator>,
        publisher: Arc<EventPublisher>,
        positions: Arc<PositionService>,
        intake_tx: Sender<IntakeMessage>,
        config: &AppConfig,
    ) -> Self {
        Self {
            venue,
            coordinator,
            publisher,
            positions,
            intake_tx,
            order_id_gen: Arc::new(AtomicU64::new(1)),
            default_timeout: Duration::from_secs(config.coordinator.default_timeout_seconds),
        }
    }

    pub fn next_order_id(&self) -> u64 {
        self.order_id_gen.fetch_add(1, Ordering::SeqCst)
    }

    fn wall_clock_now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }

    /// Registers a new request with C13, returning the registration or the
    /// stable `SERVICE_OVERLOADED` failure if the coordinator is at
    /// capacity (spec.md §7 "Capacity errors").
    pub fn register_request(&self, team_id: crate::core_types::TeamId) -> Result<crate::coordinator::Registration, ()> {
        self.coordinator
            .register(team_id, self.default_timeout.as_secs(), self.wall_clock_now())
            .map_err(|_| ())
    }
}
