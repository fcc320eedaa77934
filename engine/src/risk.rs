//! Expiry risk arithmetic per leg shape. All amounts are per share; use
//! `RiskProfile::max_profit_per_contract` for contract dollars.

use crate::error::ChainError;
use crate::legs::{LegShape, PremiumFlow};
use crate::models::{
    Bound, LegAction, OptionLeg, OptionRight, RiskProfile, RiskReward,
    DEFAULT_CONTRACT_MULTIPLIER,
};

pub fn profile(shape: LegShape, legs: &[OptionLeg], spot: f64) -> Result<RiskProfile, ChainError> {
    match shape {
        LegShape::SingleShort {
            right: OptionRight::Call,
            ..
        } => covered_call(single(legs)?, spot),
        LegShape::SingleShort {
            right: OptionRight::Put,
            ..
        } => cash_secured_put(single(legs)?),
        LegShape::Vertical { flow, .. } => {
            let (long, short) = split_vertical(legs)?;
            vertical_spread(long, short, flow)
        }
        LegShape::IronCondor => iron_condor(legs),
        LegShape::Straddle => long_straddle(legs, spot),
    }
}

fn single(legs: &[OptionLeg]) -> Result<&OptionLeg, ChainError> {
    match legs {
        [leg] => Ok(leg),
        _ => Err(ChainError::UnexpectedLegCount {
            expected: 1,
            actual: legs.len(),
        }),
    }
}

fn split_vertical(legs: &[OptionLeg]) -> Result<(&OptionLeg, &OptionLeg), ChainError> {
    let long = legs.iter().find(|leg| leg.action == LegAction::Buy);
    let short = legs.iter().find(|leg| leg.action == LegAction::Sell);
    match (legs.len(), long, short) {
        (2, Some(long), Some(short)) => Ok((long, short)),
        _ => Err(ChainError::UnexpectedLegCount {
            expected: 2,
            actual: legs.len(),
        }),
    }
}

fn multiplier(legs: &[&OptionLeg]) -> u32 {
    legs.first()
        .map(|leg| leg.multiplier)
        .unwrap_or(DEFAULT_CONTRACT_MULTIPLIER)
}

fn build(
    max_profit: Bound,
    max_loss: Bound,
    breakevens: Vec<f64>,
    net_premium: f64,
    multiplier: u32,
) -> RiskProfile {
    RiskProfile {
        max_profit,
        max_loss,
        breakevens,
        risk_reward: RiskReward::from_bounds(max_profit, max_loss),
        net_premium,
        multiplier,
        move_needed_pct: None,
    }
}

/// Short call against shares bought at `cost_basis`. Loss on the stock
/// side is not bounded by the option, so max loss is reported unbounded.
pub fn covered_call(leg: &OptionLeg, cost_basis: f64) -> Result<RiskProfile, ChainError> {
    if leg.premium <= 0.0 {
        return Err(ChainError::NonPositiveNetPremium { net: leg.premium });
    }
    let upside = (leg.strike - cost_basis).max(0.0);
    Ok(build(
        Bound::Finite(leg.premium + upside),
        Bound::Unbounded,
        vec![cost_basis - leg.premium],
        leg.premium,
        leg.multiplier,
    ))
}

pub fn cash_secured_put(leg: &OptionLeg) -> Result<RiskProfile, ChainError> {
    if leg.premium <= 0.0 {
        return Err(ChainError::NonPositiveNetPremium { net: leg.premium });
    }
    Ok(build(
        Bound::Finite(leg.premium),
        Bound::Finite(leg.strike - leg.premium),
        vec![leg.strike - leg.premium],
        leg.premium,
        leg.multiplier,
    ))
}

pub fn vertical_spread(
    long: &OptionLeg,
    short: &OptionLeg,
    flow: PremiumFlow,
) -> Result<RiskProfile, ChainError> {
    let width = (long.strike - short.strike).abs();
    let multiplier = multiplier(&[long, short]);
    match flow {
        PremiumFlow::Debit => {
            let debit = long.premium - short.premium;
            if debit <= 0.0 {
                return Err(ChainError::NonPositiveNetPremium { net: debit });
            }
            let breakeven = match long.right {
                OptionRight::Call => long.strike + debit,
                OptionRight::Put => long.strike - debit,
            };
            Ok(build(
                Bound::Finite(width - debit),
                Bound::Finite(debit),
                vec![breakeven],
                -debit,
                multiplier,
            ))
        }
        PremiumFlow::Credit => {
            let credit = short.premium - long.premium;
            if credit <= 0.0 {
                return Err(ChainError::NonPositiveNetPremium { net: credit });
            }
            let breakeven = match short.right {
                OptionRight::Call => short.strike + credit,
                OptionRight::Put => short.strike - credit,
            };
            Ok(build(
                Bound::Finite(credit),
                Bound::Finite(width - credit),
                vec![breakeven],
                credit,
                multiplier,
            ))
        }
    }
}

pub fn iron_condor(legs: &[OptionLeg]) -> Result<RiskProfile, ChainError> {
    let find = |action: LegAction, right: OptionRight| {
        legs.iter()
            .find(|leg| leg.action == action && leg.right == right)
    };
    let (Some(short_put), Some(long_put), Some(short_call), Some(long_call)) = (
        find(LegAction::Sell, OptionRight::Put),
        find(LegAction::Buy, OptionRight::Put),
        find(LegAction::Sell, OptionRight::Call),
        find(LegAction::Buy, OptionRight::Call),
    ) else {
        return Err(ChainError::UnexpectedLegCount {
            expected: 4,
            actual: legs.len(),
        });
    };
    if legs.len() != 4 {
        return Err(ChainError::UnexpectedLegCount {
            expected: 4,
            actual: legs.len(),
        });
    }

    let credit = -legs.iter().map(OptionLeg::signed_premium).sum::<f64>();
    if credit <= 0.0 {
        return Err(ChainError::NonPositiveNetPremium { net: credit });
    }
    let wing_width = (short_put.strike - long_put.strike)
        .abs()
        .max((long_call.strike - short_call.strike).abs());

    Ok(build(
        Bound::Finite(credit),
        Bound::Finite(wing_width - credit),
        vec![short_put.strike - credit, short_call.strike + credit],
        credit,
        multiplier(&[short_put]),
    ))
}

pub fn long_straddle(legs: &[OptionLeg], spot: f64) -> Result<RiskProfile, ChainError> {
    let (call, put) = match legs {
        [a, b] if a.right == OptionRight::Call && b.right == OptionRight::Put => (a, b),
        [a, b] if a.right == OptionRight::Put && b.right == OptionRight::Call => (b, a),
        _ => {
            return Err(ChainError::UnexpectedLegCount {
                expected: 2,
                actual: legs.len(),
            })
        }
    };
    let total = call.premium + put.premium;
    if total <= 0.0 {
        return Err(ChainError::NonPositiveNetPremium { net: -total });
    }

    let mut profile = build(
        Bound::Unbounded,
        Bound::Finite(total),
        vec![call.strike - total, call.strike + total],
        -total,
        multiplier(&[call]),
    );
    if spot > 0.0 {
        profile.move_needed_pct = Some(total / spot);
    }
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leg(action: LegAction, right: OptionRight, strike: f64, premium: f64) -> OptionLeg {
        OptionLeg::new(action, right, strike, premium)
    }

    #[test]
    fn bull_call_spread_profile() {
        let long = leg(LegAction::Buy, OptionRight::Call, 100.0, 5.0);
        let short = leg(LegAction::Sell, OptionRight::Call, 110.0, 2.0);
        let profile = vertical_spread(&long, &short, PremiumFlow::Debit).unwrap();
        assert_eq!(profile.max_profit, Bound::Finite(7.0));
        assert_eq!(profile.max_loss, Bound::Finite(3.0));
        assert_eq!(profile.breakevens, vec![103.0]);
        match profile.risk_reward {
            RiskReward::Ratio(ratio) => assert!((ratio - 7.0 / 3.0).abs() < 1e-12),
            RiskReward::Undefined => panic!("ratio should be defined"),
        }
        assert_eq!(profile.max_loss_per_contract(), Bound::Finite(300.0));
    }

    #[test]
    fn bear_call_credit_spread_profile() {
        let short = leg(LegAction::Sell, OptionRight::Call, 100.0, 4.0);
        let long = leg(LegAction::Buy, OptionRight::Call, 105.0, 1.5);
        let profile = vertical_spread(&long, &short, PremiumFlow::Credit).unwrap();
        assert_eq!(profile.max_profit, Bound::Finite(2.5));
        assert_eq!(profile.max_loss, Bound::Finite(2.5));
        assert_eq!(profile.breakevens, vec![102.5]);
    }

    #[test]
    fn put_debit_spread_breakeven_is_below_long_strike() {
        let long = leg(LegAction::Buy, OptionRight::Put, 95.0, 3.0);
        let short = leg(LegAction::Sell, OptionRight::Put, 90.0, 1.0);
        let profile = vertical_spread(&long, &short, PremiumFlow::Debit).unwrap();
        assert_eq!(profile.max_profit, Bound::Finite(3.0));
        assert_eq!(profile.breakevens, vec![93.0]);
    }

    #[test]
    fn inverted_debit_is_rejected() {
        let long = leg(LegAction::Buy, OptionRight::Call, 100.0, 1.0);
        let short = leg(LegAction::Sell, OptionRight::Call, 105.0, 1.5);
        assert!(matches!(
            vertical_spread(&long, &short, PremiumFlow::Debit),
            Err(ChainError::NonPositiveNetPremium { .. })
        ));
    }

    #[test]
    fn naked_exposures_have_undefined_ratio() {
        let call = leg(LegAction::Sell, OptionRight::Call, 105.0, 2.0);
        let profile = covered_call(&call, 100.0).unwrap();
        assert_eq!(profile.max_profit, Bound::Finite(7.0));
        assert_eq!(profile.max_loss, Bound::Unbounded);
        assert_eq!(profile.risk_reward, RiskReward::Undefined);
        assert_eq!(profile.breakevens, vec![98.0]);

        let put = leg(LegAction::Sell, OptionRight::Put, 100.0, 2.0);
        let profile = cash_secured_put(&put).unwrap();
        assert_eq!(profile.max_loss, Bound::Finite(98.0));
        assert_eq!(profile.breakevens, vec![98.0]);
    }

    #[test]
    fn iron_condor_profile() {
        let legs = vec![
            leg(LegAction::Sell, OptionRight::Put, 95.0, 2.0),
            leg(LegAction::Buy, OptionRight::Put, 90.0, 0.75),
            leg(LegAction::Sell, OptionRight::Call, 105.0, 2.25),
            leg(LegAction::Buy, OptionRight::Call, 110.0, 1.0),
        ];
        let profile = iron_condor(&legs).unwrap();
        assert_eq!(profile.max_profit, Bound::Finite(2.5));
        assert_eq!(profile.max_loss, Bound::Finite(2.5));
        assert_eq!(profile.breakevens, vec![92.5, 107.5]);
    }

    #[test]
    fn straddle_profile_reports_move_needed() {
        let legs = vec![
            leg(LegAction::Buy, OptionRight::Call, 100.0, 3.0),
            leg(LegAction::Buy, OptionRight::Put, 100.0, 2.0),
        ];
        let profile = long_straddle(&legs, 100.0).unwrap();
        assert_eq!(profile.max_profit, Bound::Unbounded);
        assert_eq!(profile.max_loss, Bound::Finite(5.0));
        assert_eq!(profile.breakevens, vec![95.0, 105.0]);
        assert_eq!(profile.risk_reward, RiskReward::Undefined);
        assert_eq!(profile.move_needed_pct, Some(0.05));
    }

    #[test]
    fn shape_dispatch_checks_leg_count() {
        let legs = vec![leg(LegAction::Sell, OptionRight::Call, 105.0, 2.0)];
        let err = profile(LegShape::IronCondor, &legs, 100.0).unwrap_err();
        assert_eq!(
            err,
            ChainError::UnexpectedLegCount {
                expected: 4,
                actual: 1
            }
        );
    }
}
