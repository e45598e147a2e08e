//! Core identifier types used throughout the system.
//!
//! These are fundamental type aliases shared by every component. All
//! identifiers are process-local monotonic counters; none are ever derived
//! from a collection's current size (see `coordinator.rs`).

/// Team ID - globally unique, immutable after assignment.
pub type TeamId = u64;

/// Instrument ID - globally unique identifier for a listed instrument.
///
/// Small, sequential values so the venue can index instrument state
/// directly where convenient.
pub type InstrumentId = u32;

/// Order ID - unique for the lifetime of the process.
pub type OrderId = u64;

/// Trade ID - unique for the lifetime of the process.
pub type TradeId = u64;

/// Request ID - unique for the lifetime of the process. Assigned only by
/// the response coordinator's monotonic counter; never reused.
pub type RequestId = u64;

/// Sequence number for per-team ordered event delivery.
pub type SeqNum = u64;
