use crate::conditions::{Condition, WeightedCondition};
use crate::legs::{LegShape, StrikeTarget};
use crate::models::OptionRight;
use crate::strategy::{ExitRule, StrategyDefinition, StrategyKind};

pub static DEFINITION: StrategyDefinition = StrategyDefinition {
    kind: StrategyKind::CashSecuredPut,
    description: "Sell an ATM put with cash reserved to buy the shares at the strike",
    market_view: "bullish dip-buy",
    conditions: &[
        WeightedCondition {
            condition: Condition::PriceNearSupport { max_position: 0.3 },
            weight: 0.25,
            label: "Price near support",
        },
        WeightedCondition {
            condition: Condition::AtmIvAbove(0.30),
            weight: 0.25,
            label: "IV > 30%",
        },
        WeightedCondition {
            condition: Condition::RsiBelow(40.0),
            weight: 0.20,
            label: "RSI < 40",
        },
        WeightedCondition {
            condition: Condition::BullishTilt,
            weight: 0.15,
            label: "Bullish tilt (analyst buy or price > SMA200)",
        },
        WeightedCondition {
            condition: Condition::AdequateLiquidity {
                min_open_interest: 100.0,
            },
            weight: 0.15,
            label: "ATM open interest >= 100",
        },
    ],
    shape: LegShape::SingleShort {
        right: OptionRight::Put,
        target: StrikeTarget::AtTheMoney,
    },
    exit_rule: ExitRule::RsiAbove(70.0),
    holds_shares: false,
};
