//! options_exchange — a simulated options exchange.
//!
//! Order intake, validation, continuous and batch/auction matching, trade
//! processing, phase management, and a synchronous response coordinator
//! bridging the async pipeline back to blocking callers.
//!
//! # Modules
//!
//! - [`core_types`] - shared identifier type aliases
//! - [`models`] - order/trade/phase data model
//! - [`error`] - config and core fault types
//! - [`config`] - load-time YAML configuration surface
//! - [`orderbook`] - price-time-priority order book (C1/C2)
//! - [`engine`] - continuous matching engine (C2)
//! - [`batch_engine`] - batch/auction matching engine (C3)
//! - [`phase`] - phase schedule and capability lookup (C4)
//! - [`phase_transition`] - idempotent phase-edge action dispatch (C5)
//! - [`venue`] - exchange venue: instruments, books, phase wiring (C6)
//! - [`validator`] - pre-trade constraint chain (C7)
//! - [`fee`] - role/liquidity fee schedule (C12)
//! - [`position`] - per-team per-instrument position ledger (C11)
//! - [`rate_limiter`] - per-team submission rate window (C15)
//! - [`team_directory`] - team id -> role lookup
//! - [`messages`] - inter-service message and event types
//! - [`workers`] - the validation/matching/trade-processor pipeline threads (C8-C10)
//! - [`coordinator`] - synchronous response coordinator (C13)
//! - [`publisher`] - per-team event stream publisher (C14)
//! - [`logging`] - structured logging setup
//! - [`gateway`] - HTTP/WebSocket transport

pub mod core_types;

pub mod error;
pub mod models;

pub mod config;

pub mod batch_engine;
pub mod engine;
pub mod orderbook;
pub mod phase;
pub mod phase_transition;
pub mod venue;

pub mod fee;
pub mod position;
pub mod rate_limiter;
pub mod team_directory;
pub mod validator;

pub mod coordinator;
pub mod messages;
pub mod publisher;
pub mod workers;

pub mod logging;

pub mod gateway;
pub mod websocket;

pub use config::AppConfig;
pub use coordinator::{ApiOutcome, RequestStatus, ResponseCoordinator};
pub use core_types::{InstrumentId, OrderId, RequestId, SeqNum, TeamId, TradeId};
pub use models::{Order, OrderResult, OrderStatus, OrderType, Side, Trade};
pub use orderbook::OrderBook;
pub use venue::ExchangeVenue;
