//! Event publisher (C14): fire-and-forget, per-team ordered push. Grounded
//! in the teacher's `websocket/connection.rs` `ConnectionManager`, narrowed
//! to exactly one live consumer per team (a new connection supersedes and
//! closes the prior one) and a monotonically increasing per-team sequence
//! number the teacher's `WsMessage` never had.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::core_types::{SeqNum, TeamId};
use crate::messages::{Event, EventData};

pub type EventSender = mpsc::UnboundedSender<Event>;
pub type EventReceiver = mpsc::UnboundedReceiver<Event>;
pub type ConnectionId = u64;

struct Slot {
    connection_id: ConnectionId,
    sender: EventSender,
}

pub struct EventPublisher {
    connections: DashMap<TeamId, Mutex<Option<Slot>>>,
    seq_counters: DashMap<TeamId, AtomicU64>,
    next_connection_id: AtomicU64,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            seq_counters: DashMap::new(),
            next_connection_id: AtomicU64::new(1),
        }
    }

    /// Registers a new consumer for `team_id`, closing and superseding any
    /// prior live connection for the same team (spec.md §4.14: "Only one
    /// live consumer per team").
    pub fn connect(&self, team_id: TeamId) -> EventReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        let connection_id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);
        let slot_lock = self.connections.entry(team_id).or_insert_with(|| Mutex::new(None));
        let mut slot = slot_lock.lock().unwrap();
        *slot = Some(Slot { connection_id, sender: tx });
        tracing::info!(team_id, connection_id, "event stream connected");
        rx
    }

    fn next_seq(&self, team_id: TeamId) -> SeqNum {
        self.seq_counters.entry(team_id).or_insert_with(|| AtomicU64::new(1)).fetch_add(1, Ordering::SeqCst)
    }

    /// Stamps `data` with the next sequence number and timestamp and pushes
    /// it to the team's live connection, if any. On send failure the
    /// consumer is disconnected; no retries (spec.md §4.14).
    pub fn publish(&self, team_id: TeamId, data: EventData, now: i64) {
        let Some(slot_lock) = self.connections.get(&team_id) else { return };
        let seq = self.next_seq(team_id);
        let event = Event { seq, timestamp: now, data };

        let mut slot = slot_lock.lock().unwrap();
        let disconnect = match slot.as_ref() {
            Some(s) => s.sender.send(event).is_err(),
            None => false,
        };
        if disconnect {
            tracing::warn!(team_id, "event stream send failed, disconnecting");
            *slot = None;
        }
    }

    /// Pushes the same event to every currently connected team (spec.md
    /// §4.14 "tick/phase notifications"). Each recipient still gets its own
    /// monotonically increasing sequence number.
    pub fn broadcast_all(&self, data: EventData, now: i64) {
        let team_ids: Vec<TeamId> = self.connections.iter().map(|e| *e.key()).collect();
        for team_id in team_ids {
            self.publish(team_id, data.clone(), now);
        }
    }

    /// True when a connection exists and the given id is still the live one
    /// (used by the websocket read loop to know when it has been
    /// superseded and should stop forwarding).
    pub fn is_current(&self, team_id: TeamId, connection_id: ConnectionId) -> bool {
        self.connections
            .get(&team_id)
            .map(|slot_lock| slot_lock.lock().unwrap().as_ref().map(|s| s.connection_id) == Some(connection_id))
            .unwrap_or(false)
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_are_strictly_increasing_and_gap_free() {
        let publisher = EventPublisher::new();
        let mut rx = publisher.connect(1);
        for _ in 0..5 {
            publisher.publish(1, EventData::CancelAck { order_id: 1 }, 0);
        }
        let mut last = 0;
        for _ in 0..5 {
            let ev = rx.try_recv().unwrap();
            assert_eq!(ev.seq, last + 1);
            last = ev.seq;
        }
    }

    #[test]
    fn a_new_connection_supersedes_the_prior_one() {
        let publisher = EventPublisher::new();
        let mut first = publisher.connect(1);
        let mut second = publisher.connect(1);
        publisher.publish(1, EventData::CancelAck { order_id: 1 }, 0);
        assert!(second.try_recv().is_ok());
        // The first receiver's sender was replaced; nothing more arrives on it.
        assert!(first.try_recv().is_err());
    }

    #[test]
    fn publish_to_unconnected_team_is_a_silent_no_op() {
        let publisher = EventPublisher::new();
        publisher.publish(42, EventData::CancelAck { order_id: 1 }, 0);
    }
}
