use crate::conditions::{Condition, WeightedCondition};
use crate::legs::{LegShape, PremiumFlow, StrikeTarget};
use crate::models::OptionRight;
use crate::strategy::{ExitRule, StrategyDefinition, StrategyKind};

pub static DEFINITION: StrategyDefinition = StrategyDefinition {
    kind: StrategyKind::ProtectivePut,
    description: "Buy an OTM put below spot to hedge shares held, financed by a lower put",
    market_view: "hedge",
    conditions: &[
        WeightedCondition {
            condition: Condition::PriceNearResistance { min_position: 0.7 },
            weight: 0.25,
            label: "Price near resistance",
        },
        WeightedCondition {
            condition: Condition::EarningsWithinDte,
            weight: 0.25,
            label: "Earnings within DTE",
        },
        WeightedCondition {
            condition: Condition::SkewAbove(0.02),
            weight: 0.20,
            label: "Put skew > 2 vol points",
        },
        WeightedCondition {
            condition: Condition::PriceAboveSma50,
            weight: 0.15,
            label: "Price > SMA50 (worth protecting)",
        },
        WeightedCondition {
            condition: Condition::AdequateLiquidity {
                min_open_interest: 100.0,
            },
            weight: 0.15,
            label: "ATM open interest >= 100",
        },
    ],
    shape: LegShape::Vertical {
        right: OptionRight::Put,
        flow: PremiumFlow::Debit,
        anchor: StrikeTarget::ProtectivePutOtm,
    },
    exit_rule: ExitRule::HoldToExpiry,
    holds_shares: true,
};
