//! Rate limiter (C15): per-team, per-second submission counter.

use std::sync::Mutex;

use rustc_hash::FxHashMap;

use crate::core_types::TeamId;

#[derive(Clone, Copy, Default)]
struct Window {
    start_second: i64,
    count: u32,
}

#[derive(Default)]
pub struct RateLimiter {
    windows: Mutex<FxHashMap<TeamId, Window>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    fn reset_if_needed(window: &mut Window, second: i64) {
        if window.start_second != second {
            window.start_second = second;
            window.count = 0;
        }
    }

    /// Resets the window if `t`'s second has rolled over, then adds one.
    pub fn increment(&self, team_id: TeamId, t: i64) -> u32 {
        let mut guard = self.windows.lock().unwrap();
        let window = guard.entry(team_id).or_default();
        Self::reset_if_needed(window, t);
        window.count += 1;
        window.count
    }

    /// Resets the window if stale, then returns the count without
    /// incrementing. A prior window's count is never preserved — the first
    /// read of a new second ends, and begins, at zero.
    pub fn get_count(&self, team_id: TeamId, t: i64) -> u32 {
        let mut guard = self.windows.lock().unwrap();
        let window = guard.entry(team_id).or_default();
        Self::reset_if_needed(window, t);
        window.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_reflects_increments_within_the_same_second() {
        let rl = RateLimiter::new();
        rl.increment(1, 100);
        rl.increment(1, 100);
        assert_eq!(rl.get_count(1, 100), 2);
    }

    #[test]
    fn new_second_resets_the_window() {
        let rl = RateLimiter::new();
        rl.increment(1, 100);
        rl.increment(1, 100);
        assert_eq!(rl.get_count(1, 101), 0);
    }

    #[test]
    fn teams_have_independent_windows() {
        let rl = RateLimiter::new();
        rl.increment(1, 100);
        assert_eq!(rl.get_count(2, 100), 0);
    }
}
