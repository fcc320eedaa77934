use crate::conditions::{Condition, WeightedCondition};
use crate::legs::LegShape;
use crate::strategy::{ExitRule, StrategyDefinition, StrategyKind};

pub static DEFINITION: StrategyDefinition = StrategyDefinition {
    kind: StrategyKind::IronCondor,
    description: "Sell an OTM put and call, buy further OTM wings for protection",
    market_view: "range-bound",
    conditions: &[
        WeightedCondition {
            condition: Condition::BollingerWidthBelow(0.06),
            weight: 0.30,
            label: "BB width < 0.06",
        },
        WeightedCondition {
            condition: Condition::AtmIvBetween {
                min: 0.40,
                max: 0.70,
            },
            weight: 0.25,
            label: "IV 40-70%",
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
            condition: Condition::UnusualActivityBelow(2),
            weight: 0.15,
            label: "Low unusual activity",
        },
        WeightedCondition {
            condition: Condition::NoEarningsWithinDte,
            weight: 0.10,
            label: "No earnings within DTE",
        },
    ],
    shape: LegShape::IronCondor,
    exit_rule: ExitRule::HoldToExpiry,
    holds_shares: false,
};
