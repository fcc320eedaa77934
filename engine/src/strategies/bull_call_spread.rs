use crate::conditions::{Condition, WeightedCondition};
use crate::legs::{LegShape, PremiumFlow, StrikeTarget};
use crate::models::OptionRight;
use crate::strategy::{ExitRule, StrategyDefinition, StrategyKind};

pub static DEFINITION: StrategyDefinition = StrategyDefinition {
    kind: StrategyKind::BullCallSpread,
    description: "Buy an ATM call and sell a higher strike call to cap cost",
    market_view: "directional up",
    conditions: &[
        WeightedCondition {
            condition: Condition::EmaFastAboveSlow,
            weight: 0.25,
            label: "EMA9 > EMA20",
        },
        WeightedCondition {
            condition: Condition::PriceAboveVwap,
            weight: 0.20,
            label: "Price > VWAP",
        },
        WeightedCondition {
            condition: Condition::AtmIvBetween {
                min: 0.20,
                max: 0.50,
            },
            weight: 0.20,
            label: "IV moderate (20-50%)",
        },
        WeightedCondition {
            condition: Condition::MacdHistogramPositive,
            weight: 0.15,
            label: "MACD histogram > 0",
        },
        WeightedCondition {
            condition: Condition::RoomToResistance { min_pct: 0.03 },
            weight: 0.20,
            label: "Resistance >= 3% above price",
        },
    ],
    shape: LegShape::Vertical {
        right: OptionRight::Call,
        flow: PremiumFlow::Debit,
        anchor: StrikeTarget::AtTheMoney,
    },
    exit_rule: ExitRule::RsiAbove(70.0),
    holds_shares: false,
};
