use crate::conditions::WeightedCondition;
use crate::legs::{create_leg_builder, LegBuilder, LegShape};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyKind {
    CoveredCall,
    CashSecuredPut,
    BullCallSpread,
    BearCallSpread,
    IronCondor,
    ProtectivePut,
    LongStraddle,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 7] = [
        StrategyKind::CoveredCall,
        StrategyKind::CashSecuredPut,
        StrategyKind::BullCallSpread,
        StrategyKind::BearCallSpread,
        StrategyKind::IronCondor,
        StrategyKind::ProtectivePut,
        StrategyKind::LongStraddle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::CoveredCall => "COVERED_CALL",
            StrategyKind::CashSecuredPut => "CASH_SECURED_PUT",
            StrategyKind::BullCallSpread => "BULL_CALL_SPREAD",
            StrategyKind::BearCallSpread => "BEAR_CALL_SPREAD",
            StrategyKind::IronCondor => "IRON_CONDOR",
            StrategyKind::ProtectivePut => "PROTECTIVE_PUT",
            StrategyKind::LongStraddle => "LONG_STRADDLE",
        }
    }

    pub fn definition(&self) -> &'static StrategyDefinition {
        match self {
            StrategyKind::CoveredCall => &covered_call::DEFINITION,
            StrategyKind::CashSecuredPut => &cash_secured_put::DEFINITION,
            StrategyKind::BullCallSpread => &bull_call_spread::DEFINITION,
            StrategyKind::BearCallSpread => &bear_call_spread::DEFINITION,
            StrategyKind::IronCondor => &iron_condor::DEFINITION,
            StrategyKind::ProtectivePut => &protective_put::DEFINITION,
            StrategyKind::LongStraddle => &long_straddle::DEFINITION,
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        let normalized = raw.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        StrategyKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| anyhow!("Unknown strategy: {}", raw))
    }
}

/// Early-exit trigger checked by the walk-forward simulator while a
/// position is open.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExitRule {
    HoldToExpiry,
    RsiAbove(f64),
    RsiBelow(f64),
}

impl ExitRule {
    pub fn triggered(&self, rsi: Option<f64>) -> bool {
        match (*self, rsi) {
            (ExitRule::RsiAbove(threshold), Some(rsi)) => rsi > threshold,
            (ExitRule::RsiBelow(threshold), Some(rsi)) => rsi < threshold,
            _ => false,
        }
    }
}

#[derive(Debug)]
pub struct StrategyDefinition {
    pub kind: StrategyKind,
    pub description: &'static str,
    pub market_view: &'static str,
    pub conditions: &'static [WeightedCondition],
    pub shape: LegShape,
    pub exit_rule: ExitRule,
    /// The position includes one contract's worth of the underlying shares.
    pub holds_shares: bool,
}

impl StrategyDefinition {
    pub fn leg_builder(&self) -> Box<dyn LegBuilder + Send + Sync> {
        create_leg_builder(self.shape)
    }

    pub fn total_weight(&self) -> f64 {
        self.conditions.iter().map(|c| c.weight).sum()
    }
}

#[path = "strategies/covered_call.rs"]
pub mod covered_call;

#[path = "strategies/cash_secured_put.rs"]
pub mod cash_secured_put;

#[path = "strategies/bull_call_spread.rs"]
pub mod bull_call_spread;

#[path = "strategies/bear_call_spread.rs"]
pub mod bear_call_spread;

#[path = "strategies/iron_condor.rs"]
pub mod iron_condor;

#[path = "strategies/protective_put.rs"]
pub mod protective_put;

#[path = "strategies/long_straddle.rs"]
pub mod long_straddle;

/// All definitions in catalog order.
pub fn catalog() -> impl Iterator<Item = &'static StrategyDefinition> {
    StrategyKind::ALL.into_iter().map(|kind| kind.definition())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_sum_to_one() {
        for definition in catalog() {
            assert!(
                (definition.total_weight() - 1.0).abs() < 1e-9,
                "{} weights sum to {}",
                definition.kind,
                definition.total_weight()
            );
            assert!(definition
                .conditions
                .iter()
                .all(|c| c.weight > 0.0 && c.weight <= 1.0));
        }
    }

    #[test]
    fn definitions_match_their_kind() {
        for kind in StrategyKind::ALL {
            assert_eq!(kind.definition().kind, kind);
        }
        assert_eq!(catalog().count(), 7);
    }

    #[test]
    fn parses_names_loosely() {
        assert_eq!(
            "iron-condor".parse::<StrategyKind>().unwrap(),
            StrategyKind::IronCondor
        );
        assert_eq!(
            "BULL_CALL_SPREAD".parse::<StrategyKind>().unwrap(),
            StrategyKind::BullCallSpread
        );
        assert!("butterfly".parse::<StrategyKind>().is_err());
    }

    #[test]
    fn exit_rules_need_rsi() {
        assert!(ExitRule::RsiAbove(70.0).triggered(Some(71.0)));
        assert!(!ExitRule::RsiAbove(70.0).triggered(None));
        assert!(ExitRule::RsiBelow(35.0).triggered(Some(30.0)));
        assert!(!ExitRule::HoldToExpiry.triggered(Some(99.0)));
    }

    #[test]
    fn kind_serializes_as_screaming_snake() {
        let json = serde_json::to_string(&StrategyKind::CashSecuredPut).unwrap();
        assert_eq!(json, "\"CASH_SECURED_PUT\"");
    }
}
