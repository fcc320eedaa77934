use crate::conditions::{Condition, WeightedCondition};
use crate::legs::{LegShape, StrikeTarget};
use crate::models::OptionRight;
use crate::strategy::{ExitRule, StrategyDefinition, StrategyKind};

pub static DEFINITION: StrategyDefinition = StrategyDefinition {
    kind: StrategyKind::CoveredCall,
    description: "Sell an OTM call against 100 shares held to collect premium",
    market_view: "neutral-bullish income",
    conditions: &[
        WeightedCondition {
            condition: Condition::PriceAboveSma50,
            weight: 0.25,
            label: "Price > SMA50",
        },
        WeightedCondition {
            condition: Condition::AtmIvBetween {
                min: 0.25,
                max: 0.45,
            },
            weight: 0.25,
            label: "IV 25-45%",
        },
        WeightedCondition {
            condition: Condition::RsiBetween {
                min: 40.0,
                max: 60.0,
            },
            weight: 0.20,
            label: "RSI 40-60",
        },
        WeightedCondition {
            condition: Condition::RealizedVolBelow(0.30),
            weight: 0.15,
            label: "Realized vol < 30%",
        },
        WeightedCondition {
            condition: Condition::NoEarningsWithinDte,
            weight: 0.15,
            label: "No earnings within DTE",
        },
    ],
    shape: LegShape::SingleShort {
        right: OptionRight::Call,
        target: StrikeTarget::CoveredCallOtm,
    },
    exit_rule: ExitRule::RsiAbove(70.0),
    holds_shares: true,
};
