use crate::conditions::{Condition, WeightedCondition};
use crate::legs::{LegShape, PremiumFlow, StrikeTarget};
use crate::models::OptionRight;
use crate::strategy::{ExitRule, StrategyDefinition, StrategyKind};

pub static DEFINITION: StrategyDefinition = StrategyDefinition {
    kind: StrategyKind::BearCallSpread,
    description: "Sell a call at or above spot and buy a higher strike call as a cap",
    market_view: "directional down",
    conditions: &[
        WeightedCondition {
            condition: Condition::EmaFastBelowSlow,
            weight: 0.25,
            label: "EMA9 < EMA20",
        },
        WeightedCondition {
            condition: Condition::RsiAbove(65.0),
            weight: 0.25,
            label: "RSI > 65",
        },
        WeightedCondition {
            condition: Condition::AtmIvAbove(0.40),
            weight: 0.20,
            label: "IV > 40%",
        },
        WeightedCondition {
            condition: Condition::PriceBelowResistance,
            weight: 0.15,
            label: "Price below resistance",
        },
        WeightedCondition {
            condition: Condition::BearishCatalyst {
                put_call_ratio: 1.0,
            },
            weight: 0.15,
            label: "MACD histogram < 0 or put/call > 1",
        },
    ],
    shape: LegShape::Vertical {
        right: OptionRight::Call,
        flow: PremiumFlow::Credit,
        anchor: StrikeTarget::AtOrAboveSpot,
    },
    exit_rule: ExitRule::RsiBelow(35.0),
    holds_shares: false,
};
