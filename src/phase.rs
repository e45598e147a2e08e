//! Phase manager (C4): a pure function of wall time and configuration.
//!
//! Never calls the system clock itself — every entry point takes an
//! injected `now`, so phase behavior is deterministically testable. Callers
//! that want the real clock fetch it once per outer operation and pass it
//! in.

use chrono::{DateTime, Datelike, FixedOffset, Timelike, Weekday};
use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::models::{ExecutionStyle, PhaseState, PhaseType};

#[derive(Debug, Clone, Deserialize)]
pub struct TimeOfDay {
    pub hour: u32,
    pub minute: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleWindow {
    pub phase: String,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    /// ISO weekday numbers, 1 (Monday) through 7 (Sunday).
    pub weekdays: Vec<u8>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhaseConfig {
    pub timezone_offset_minutes: i32,
    pub schedule: Vec<ScheduleWindow>,
    pub capabilities: FxHashMap<String, PhaseCapabilities>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PhaseCapabilities {
    pub submission_allowed: bool,
    pub cancellation_allowed: bool,
    pub matching_enabled: bool,
    pub execution_style: ExecutionStyleConfig,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStyleConfig {
    None,
    Batch,
    Continuous,
}

impl From<ExecutionStyleConfig> for ExecutionStyle {
    fn from(c: ExecutionStyleConfig) -> Self {
        match c {
            ExecutionStyleConfig::None => ExecutionStyle::None,
            ExecutionStyleConfig::Batch => ExecutionStyle::Batch,
            ExecutionStyleConfig::Continuous => ExecutionStyle::Continuous,
        }
    }
}

fn parse_phase_name(name: &str) -> Result<PhaseType, ConfigError> {
    match name {
        "closed" => Ok(PhaseType::Closed),
        "pre_open" => Ok(PhaseType::PreOpen),
        "opening_auction" => Ok(PhaseType::OpeningAuction),
        "continuous" => Ok(PhaseType::Continuous),
        other => Err(ConfigError::UnknownPhase(other.to_string())),
    }
}

pub struct PhaseManager {
    offset: FixedOffset,
    schedule: Vec<(PhaseType, TimeOfDay, TimeOfDay, Vec<u8>)>,
    capabilities: FxHashMap<PhaseType, PhaseState>,
}

impl PhaseManager {
    pub fn from_config(config: &PhaseConfig) -> Result<Self, ConfigError> {
        let offset = FixedOffset::east_opt(config.timezone_offset_minutes * 60).ok_or_else(|| {
            ConfigError::InvalidValue {
                field: "timezone_offset_minutes".into(),
                reason: "out of range".into(),
            }
        })?;

        let mut schedule = Vec::with_capacity(config.schedule.len());
        for window in &config.schedule {
            let phase = parse_phase_name(&window.phase)?;
            schedule.push((phase, window.start.clone(), window.end.clone(), window.weekdays.clone()));
        }

        let mut capabilities = FxHashMap::default();
        for (name, caps) in &config.capabilities {
            let phase = parse_phase_name(name)?;
            capabilities.insert(
                phase,
                PhaseState {
                    phase_type: phase,
                    submission_allowed: caps.submission_allowed,
                    cancellation_allowed: caps.cancellation_allowed,
                    matching_enabled: caps.matching_enabled,
                    execution_style: caps.execution_style.into(),
                },
            );
        }
        // Any phase type missing from `capabilities` falls back to fully
        // closed — a fatal load error would be stricter, but spec.md only
        // mandates the four phase *names* be recognized, not that every one
        // of them appear in the capability table.
        for phase in [PhaseType::Closed, PhaseType::PreOpen, PhaseType::OpeningAuction, PhaseType::Continuous] {
            capabilities.entry(phase).or_insert(PhaseState {
                phase_type: phase,
                submission_allowed: false,
                cancellation_allowed: false,
                matching_enabled: false,
                execution_style: ExecutionStyle::None,
            });
        }

        Ok(Self { offset, schedule, capabilities })
    }

    fn matches_window(&self, now: DateTime<FixedOffset>, start: &TimeOfDay, end: &TimeOfDay, weekdays: &[u8]) -> bool {
        let weekday_iso = isoweekday(now.weekday());
        if !weekdays.contains(&weekday_iso) {
            return false;
        }
        let minutes_now = now.hour() * 60 + now.minute();
        let minutes_start = start.hour * 60 + start.minute;
        let minutes_end = end.hour * 60 + end.minute;
        minutes_now >= minutes_start && minutes_now < minutes_end
    }

    /// Returns the phase whose schedule window matches `now`, or `closed`
    /// when none does. The first matching window wins when windows overlap.
    pub fn current_phase(&self, now: i64) -> PhaseType {
        let dt = DateTime::from_timestamp(now, 0)
            .unwrap_or_default()
            .with_timezone(&self.offset);
        for (phase, start, end, weekdays) in &self.schedule {
            if self.matches_window(dt, start, end, weekdays) {
                return *phase;
            }
        }
        PhaseType::Closed
    }

    pub fn current_state(&self, now: i64) -> PhaseState {
        let phase = self.current_phase(now);
        self.capabilities[&phase]
    }
}

fn isoweekday(w: Weekday) -> u8 {
    w.number_from_monday() as u8
}
