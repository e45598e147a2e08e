//! Fee service (C12): role × liquidity-type → signed fee amount.
//!
//! Unlike a single basis-point rate applied to notional, each role carries
//! a currency-per-contract pair. Positive means the team receives money,
//! negative means the team pays — the opposite sign convention from a
//! typical "fee owed" ledger line, chosen because a maker rebate and a
//! taker fee otherwise need two different formulas at every call site.

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::error::CoreFault;
use crate::models::LiquidityType;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FeeSchedule {
    /// Currency received per contract when the team is the maker. Usually
    /// positive (a rebate) but configuration may set it to zero or negative.
    pub maker_rebate: Decimal,
    /// Currency paid per contract when the team is the taker, stored as a
    /// positive magnitude; applied with a negative sign.
    pub taker_fee: Decimal,
}

#[derive(Default)]
pub struct FeeService {
    schedules: FxHashMap<String, FeeSchedule>,
}

impl FeeService {
    pub fn from_roles(roles: &FxHashMap<String, FeeSchedule>) -> Self {
        Self { schedules: roles.clone() }
    }

    /// `quantity * role[liquidity_type]`, signed per the convention above.
    /// `LiquidityType::Mixed` is not a valid lookup key — callers must
    /// compute mixed fills as the sum of per-fill maker/taker fees.
    pub fn fee_for(
        &self,
        role: &str,
        liquidity: LiquidityType,
        quantity: u64,
    ) -> Result<Decimal, CoreFault> {
        let schedule = self
            .schedules
            .get(role)
            .ok_or_else(|| CoreFault::UnknownRole(role.to_string()))?;
        let qty = Decimal::from(quantity);
        Ok(match liquidity {
            LiquidityType::Maker => schedule.maker_rebate * qty,
            LiquidityType::Taker => -schedule.taker_fee * qty,
            LiquidityType::Mixed => unreachable!("mixed fills are summed by the caller, not looked up"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn roles() -> FxHashMap<String, FeeSchedule> {
        let mut m = FxHashMap::default();
        m.insert(
            "market_maker".to_string(),
            FeeSchedule { maker_rebate: dec!(0.01), taker_fee: dec!(0.02) },
        );
        m
    }

    #[test]
    fn maker_fill_is_a_positive_rebate() {
        let svc = FeeService::from_roles(&roles());
        let fee = svc.fee_for("market_maker", LiquidityType::Maker, 100).unwrap();
        assert_eq!(fee, dec!(1.00));
    }

    #[test]
    fn taker_fill_is_negative() {
        let svc = FeeService::from_roles(&roles());
        let fee = svc.fee_for("market_maker", LiquidityType::Taker, 100).unwrap();
        assert_eq!(fee, dec!(-2.00));
    }

    #[test]
    fn unknown_role_is_rejected() {
        let svc = FeeService::from_roles(&roles());
        assert!(svc.fee_for("ghost", LiquidityType::Maker, 1).is_err());
    }
}
