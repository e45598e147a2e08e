//! Load-time configuration surface (spec.md §6 "Configuration surface").
//!
//! Everything here is read once at startup from a YAML file and treated as
//! read-only thereafter — no hot reload, matching spec.md's "read-only
//! thereafter" requirement (the teacher's `config_watcher.rs` hot-reload
//! pattern does not apply to a surface this spec declares static).

use std::collections::HashMap;

use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::core_types::InstrumentId;
use crate::error::ConfigError;
use crate::fee::FeeSchedule;
use crate::phase::PhaseConfig;
use crate::validator::RoleConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentConfig {
    pub instrument_id: InstrumentId,
    pub symbol: String,
    pub underlying: String,
    pub strike: rust_decimal::Decimal,
    pub expiry: String,
    pub option_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoordinatorConfig {
    pub default_timeout_seconds: u64,
    pub max_pending_requests: usize,
    pub cleanup_interval_seconds: u64,
    /// Grace window a completed/timed-out request is kept around before the
    /// cleanup sweep reclaims its slot (spec.md §4.13 "Lifecycle").
    pub completed_grace_seconds: u64,
    pub request_id_prefix: String,
    pub enable_metrics: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub log_dir: String,
    pub log_file: String,
    /// "hourly" | "daily" | anything else means never-rotate.
    pub rotation: String,
    pub log_level: String,
    pub enable_tracing: bool,
    pub use_json: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

/// Roles section: ordered constraint chain + fee schedule per role
/// (spec.md §6 "Roles"). Parsed as a flat map keyed by role name.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct RolesConfig(pub FxHashMap<String, RoleConfig>);

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub phases: PhaseConfig,
    pub roles: RolesConfig,
    pub coordinator: CoordinatorConfig,
    pub instruments: Vec<InstrumentConfig>,
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let config: AppConfig = serde_yaml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Fails fast on the load-time errors spec.md §6 calls out by name:
    /// unknown phase names (checked inside `PhaseManager::from_config`) and
    /// a declared role with no fee schedule. The latter is `RoleConfig`'s
    /// non-`Option` `fee_schedule` field, so serde itself rejects a role
    /// with a missing schedule at parse time, before `validate` even runs.
    fn validate(&self) -> Result<(), ConfigError> {
        crate::phase::PhaseManager::from_config(&self.phases)?;
        if self.coordinator.default_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "coordinator.default_timeout_seconds".into(),
                reason: "must be positive".into(),
            });
        }
        if self.coordinator.max_pending_requests == 0 {
            return Err(ConfigError::InvalidValue {
                field: "coordinator.max_pending_requests".into(),
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }

    pub fn fee_schedules(&self) -> FxHashMap<String, FeeSchedule> {
        self.roles.0.iter().map(|(k, v)| (k.clone(), v.fee_schedule)).collect()
    }

    pub fn instruments_by_id(&self) -> HashMap<InstrumentId, InstrumentConfig> {
        self.instruments.iter().map(|i| (i.instrument_id, i.clone())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
server:
  port: 8080
logging:
  log_dir: "./logs"
  log_file: "exchange.log"
  rotation: "daily"
  log_level: "info"
  enable_tracing: true
  use_json: false
phases:
  timezone_offset_minutes: 0
  schedule:
    - phase: continuous
      start: { hour: 0, minute: 0 }
      end: { hour: 23, minute: 59 }
      weekdays: [1,2,3,4,5,6,7]
  capabilities:
    continuous:
      submission_allowed: true
      cancellation_allowed: true
      matching_enabled: true
      execution_style: continuous
roles:
  retail:
    constraints: []
    fee_schedule: { maker_rebate: "0.0", taker_fee: "0.01" }
coordinator:
  default_timeout_seconds: 5
  max_pending_requests: 1000
  cleanup_interval_seconds: 30
  completed_grace_seconds: 60
  request_id_prefix: "req"
  enable_metrics: true
instruments:
  - instrument_id: 1
    symbol: "XYZ-100C"
    underlying: "XYZ"
    strike: "100"
    expiry: "2026-12-18"
    option_type: "call"
"#;

    #[test]
    fn sample_config_loads_and_validates() {
        let cfg: AppConfig = serde_yaml::from_str(SAMPLE).unwrap();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.instruments.len(), 1);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut cfg: AppConfig = serde_yaml::from_str(SAMPLE).unwrap();
        cfg.coordinator.default_timeout_seconds = 0;
        assert!(cfg.validate().is_err());
    }
}
