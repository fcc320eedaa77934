use crate::conditions::{Condition, WeightedCondition};
use crate::legs::LegShape;
use crate::strategy::{ExitRule, StrategyDefinition, StrategyKind};

pub static DEFINITION: StrategyDefinition = StrategyDefinition {
    kind: StrategyKind::LongStraddle,
    description: "Buy an ATM call and put at the same strike to profit from a large move",
    market_view: "big move expected",
    conditions: &[
        WeightedCondition {
            condition: Condition::EarningsWithinDays { min: 5, max: 15 },
            weight: 0.30,
            label: "Earnings within 5-15 days",
        },
        WeightedCondition {
            condition: Condition::UnusualActivityAtLeast(2),
            weight: 0.25,
            label: "Unusual options activity",
        },
        WeightedCondition {
            condition: Condition::AtmIvBelow(0.50),
            weight: 0.20,
            label: "IV < 50% (not already priced in)",
        },
        WeightedCondition {
            condition: Condition::BollingerWidthBelow(0.06),
            weight: 0.15,
            label: "BB squeeze (volatility expansion due)",
        },
        WeightedCondition {
            condition: Condition::AdequateLiquidity {
                min_open_interest: 100.0,
            },
            weight: 0.10,
            label: "ATM open interest >= 100",
        },
    ],
    shape: LegShape::Straddle,
    exit_rule: ExitRule::HoldToExpiry,
    holds_shares: false,
};
