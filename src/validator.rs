//! Constraint validator (C7): a pluggable, role-parameterized pre-trade
//! constraint chain. Evaluated in configuration order; short-circuits on
//! the first failure.

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::core_types::{InstrumentId, TeamId};
use crate::models::{Order, OrderType};

pub struct ValidationContext<'a> {
    pub order: &'a Order,
    pub team_id: TeamId,
    pub role: &'a str,
    /// Current signed position for the order's instrument.
    pub current_position: i64,
    /// Current signed positions across all instruments, for portfolio_limit.
    pub all_positions: &'a [(InstrumentId, i64)],
    /// Count of submissions already observed in the current one-second
    /// window (before this order).
    pub window_count: u32,
}

#[derive(Debug, Clone)]
pub struct Rejection {
    pub error_code: String,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstraintKind {
    PositionLimit {
        max: i64,
        symmetric: bool,
        error_code: String,
        message: String,
    },
    PortfolioLimit {
        max_total: i64,
        error_code: String,
        message: String,
    },
    OrderSize {
        min: u64,
        max: u64,
        error_code: String,
        message: String,
    },
    OrderRate {
        max_per_second: u32,
        error_code: String,
        message: String,
    },
    OrderTypeAllowed {
        allowed: Vec<OrderType>,
        error_code: String,
        message: String,
    },
    PriceRange {
        min: Decimal,
        max: Decimal,
        error_code: String,
        message: String,
    },
    InstrumentAllowed {
        allowed: Vec<InstrumentId>,
        error_code: String,
        message: String,
    },
}

impl ConstraintKind {
    pub fn check(&self, ctx: &ValidationContext) -> Result<(), Rejection> {
        match self {
            ConstraintKind::PositionLimit { max, symmetric, error_code, message } => {
                let delta = ctx.order.remaining_quantity as i64 * ctx.order.side.sign();
                let projected = ctx.current_position + delta;
                let breached = if *symmetric {
                    projected.unsigned_abs() > *max as u64
                } else {
                    projected > *max
                };
                if breached {
                    Err(Rejection {
                        error_code: error_code.clone(),
                        message: format!("{message} ({projected} vs {max})"),
                    })
                } else {
                    Ok(())
                }
            }
            ConstraintKind::PortfolioLimit { max_total, error_code, message } => {
                let delta = ctx.order.remaining_quantity as i64 * ctx.order.side.sign();
                let total: i64 = ctx
                    .all_positions
                    .iter()
                    .map(|(instrument, qty)| {
                        if *instrument == ctx.order.instrument_id {
                            (qty + delta).abs()
                        } else {
                            qty.abs()
                        }
                    })
                    .sum();
                // Reductions (|after| <= |before|) are always allowed even
                // if the raw total would otherwise read as breaching.
                let before: i64 = ctx.all_positions.iter().map(|(_, q)| q.abs()).sum();
                if total > *max_total && total > before {
                    Err(Rejection { error_code: error_code.clone(), message: message.clone() })
                } else {
                    Ok(())
                }
            }
            ConstraintKind::OrderSize { min, max, error_code, message } => {
                let qty = ctx.order.quantity;
                if qty < *min || qty > *max {
                    Err(Rejection { error_code: error_code.clone(), message: message.clone() })
                } else {
                    Ok(())
                }
            }
            ConstraintKind::OrderRate { max_per_second, error_code, message } => {
                if ctx.window_count >= *max_per_second {
                    Err(Rejection { error_code: error_code.clone(), message: message.clone() })
                } else {
                    Ok(())
                }
            }
            ConstraintKind::OrderTypeAllowed { allowed, error_code, message } => {
                if allowed.contains(&ctx.order.order_type) {
                    Ok(())
                } else {
                    Err(Rejection { error_code: error_code.clone(), message: message.clone() })
                }
            }
            ConstraintKind::PriceRange { min, max, error_code, message } => {
                match (ctx.order.order_type, ctx.order.price) {
                    (OrderType::Limit, Some(price)) if price < *min || price > *max => {
                        Err(Rejection { error_code: error_code.clone(), message: message.clone() })
                    }
                    _ => Ok(()),
                }
            }
            ConstraintKind::InstrumentAllowed { allowed, error_code, message } => {
                if allowed.contains(&ctx.order.instrument_id) {
                    Ok(())
                } else {
                    Err(Rejection { error_code: error_code.clone(), message: message.clone() })
                }
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleConfig {
    pub constraints: Vec<ConstraintKind>,
    pub fee_schedule: crate::fee::FeeSchedule,
}

#[derive(Default)]
pub struct ConstraintValidator {
    roles: FxHashMap<String, Vec<ConstraintKind>>,
}

impl ConstraintValidator {
    pub fn from_roles(roles: &FxHashMap<String, RoleConfig>) -> Self {
        Self {
            roles: roles.iter().map(|(k, v)| (k.clone(), v.constraints.clone())).collect(),
        }
    }

    /// Runs the role's constraint chain in order, short-circuiting on the
    /// first failure. An unconfigured role has no constraints — callers are
    /// expected to reject unknown roles earlier, at team registration.
    pub fn validate(&self, ctx: &ValidationContext) -> Result<(), Rejection> {
        let Some(chain) = self.roles.get(ctx.role) else {
            return Ok(());
        };
        for constraint in chain {
            constraint.check(ctx)?;
        }
        Ok(())
    }
}
