use crate::conditions::{self, ConditionEvaluation};
use crate::config::LegSelectionConfig;
use crate::error::ChainError;
use crate::models::{MarketState, OptionLeg, Recommendation, RecommendationStatus, RiskProfile};
use crate::risk;
use crate::strategy::{catalog, StrategyDefinition};
use log::{debug, info};
use std::cmp::Ordering;

/// Scores every catalog strategy against `state` and returns all seven,
/// best first. Ties on score fall back to conditions met, then catalog order.
pub fn recommend(state: &MarketState, config: &LegSelectionConfig) -> Vec<Recommendation> {
    let mut state = state.clone();
    state.chain = std::mem::take(&mut state.chain).normalized();

    let mut recommendations: Vec<Recommendation> = catalog()
        .map(|definition| evaluate_strategy(definition, &state, config))
        .collect();
    recommendations.sort_by(compare_recommendations);

    let recommended = recommendations
        .iter()
        .filter(|rec| rec.status == RecommendationStatus::Recommended)
        .count();
    info!(
        "{}: {} recommended, top {} ({:.2})",
        display_ticker(&state),
        recommended,
        recommendations[0].strategy,
        recommendations[0].score
    );
    recommendations
}

fn display_ticker(state: &MarketState) -> &str {
    if state.ticker.is_empty() {
        "<unnamed>"
    } else {
        &state.ticker
    }
}

/// Scores are sums of fixed weights, so compare them on a fixed grid to keep
/// accumulation order from breaking ties.
fn score_key(score: f64) -> i64 {
    (score * 1e6).round() as i64
}

fn compare_recommendations(a: &Recommendation, b: &Recommendation) -> Ordering {
    score_key(b.score)
        .cmp(&score_key(a.score))
        .then(b.conditions_met.cmp(&a.conditions_met))
}

pub fn evaluate_strategy(
    definition: &StrategyDefinition,
    state: &MarketState,
    config: &LegSelectionConfig,
) -> Recommendation {
    let evaluation = conditions::evaluate(definition, state);
    let mut status = evaluation.status;
    let mut legs = Vec::new();
    let mut risk_profile = None;
    let mut flags = Vec::new();

    if status != RecommendationStatus::Avoid {
        match build_position(definition, state, config) {
            Ok((built_legs, profile)) => {
                legs = built_legs;
                risk_profile = Some(profile);
            }
            Err(err) => {
                debug!(
                    "{} {}: forcing avoid, {}",
                    display_ticker(state),
                    definition.kind,
                    err
                );
                flags.push(format!("Insufficient chain data: {}", err));
                status = RecommendationStatus::Avoid;
            }
        }
    }

    assemble(definition, evaluation, status, legs, risk_profile, flags)
}

pub fn build_position(
    definition: &StrategyDefinition,
    state: &MarketState,
    config: &LegSelectionConfig,
) -> Result<(Vec<OptionLeg>, RiskProfile), ChainError> {
    let spot = state.price.ok_or(ChainError::MissingSpot)?;
    let legs = definition.leg_builder().build(spot, &state.chain, config)?;
    let profile = risk::profile(definition.shape, &legs, spot)?;
    Ok((legs, profile))
}

fn assemble(
    definition: &StrategyDefinition,
    evaluation: ConditionEvaluation,
    status: RecommendationStatus,
    legs: Vec<OptionLeg>,
    risk_profile: Option<RiskProfile>,
    flags: Vec<String>,
) -> Recommendation {
    Recommendation {
        strategy: definition.kind,
        description: definition.description,
        market_view: definition.market_view,
        score: evaluation.score,
        conditions_met: evaluation.conditions_met,
        conditions_total: evaluation.conditions_total,
        conditions_summary: format!(
            "{}/{}",
            evaluation.conditions_met, evaluation.conditions_total
        ),
        met_labels: evaluation.met_labels,
        status,
        legs,
        risk_profile,
        flags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChainRow, OptionChain};
    use crate::strategy::StrategyKind;

    fn quoted(strike: f64, premium: f64, oi: f64) -> ChainRow {
        ChainRow {
            strike,
            bid: Some(premium * 0.95),
            ask: Some(premium * 1.05),
            implied_volatility: Some(0.35),
            open_interest: Some(oi),
            volume: Some(10.0),
            ..ChainRow::default()
        }
    }

    fn uptrend_state() -> MarketState {
        let calls = vec![
            quoted(95.0, 7.0, 500.0),
            quoted(100.0, 4.0, 900.0),
            quoted(105.0, 2.0, 700.0),
            quoted(110.0, 0.8, 300.0),
        ];
        let puts = vec![
            quoted(110.0, 10.5, 100.0),
            quoted(90.0, 0.7, 200.0),
            quoted(95.0, 1.6, 400.0),
            quoted(100.0, 3.5, 800.0),
            quoted(105.0, 6.5, 100.0),
        ];
        MarketState {
            ticker: "UPTR".to_string(),
            price: Some(100.0),
            rsi: Some(55.0),
            ema_9: Some(99.0),
            ema_20: Some(97.0),
            sma_50: Some(95.0),
            sma_200: Some(90.0),
            macd_histogram: Some(0.4),
            bb_width: Some(0.08),
            vwap: Some(98.5),
            support: Some(92.0),
            resistance: Some(106.0),
            historical_volatility: Some(0.22),
            atm_iv: Some(0.35),
            dte: Some(30),
            chain: OptionChain { calls, puts },
            ..MarketState::default()
        }
    }

    #[test]
    fn returns_every_strategy_sorted() {
        let recs = recommend(&uptrend_state(), &LegSelectionConfig::default());
        assert_eq!(recs.len(), 7);
        for pair in recs.windows(2) {
            assert!(score_key(pair[0].score) >= score_key(pair[1].score));
        }
        assert_eq!(recs[0].strategy, StrategyKind::BullCallSpread);
        assert_eq!(recs[0].status, RecommendationStatus::Recommended);
        assert_eq!(recs[0].conditions_summary, "5/5");
    }

    #[test]
    fn bull_call_legs_and_profile_are_consistent() {
        let recs = recommend(&uptrend_state(), &LegSelectionConfig::default());
        let bull = &recs[0];
        assert_eq!(bull.legs.len(), 2);
        assert_eq!(bull.legs[0].strike, 100.0);
        assert_eq!(bull.legs[1].strike, 105.0);
        let profile = bull.risk_profile.as_ref().unwrap();
        let debit = bull.legs[0].premium - bull.legs[1].premium;
        assert_eq!(profile.max_loss, crate::models::Bound::Finite(debit));
        assert_eq!(profile.max_profit, crate::models::Bound::Finite(5.0 - debit));
    }

    #[test]
    fn ties_keep_catalog_order() {
        let recs = recommend(&MarketState::default(), &LegSelectionConfig::default());
        let order: Vec<StrategyKind> = recs.iter().map(|r| r.strategy).collect();
        assert_eq!(order, StrategyKind::ALL.to_vec());
        assert!(recs.iter().all(|r| r.status == RecommendationStatus::Avoid));
        assert!(recs.iter().all(|r| r.legs.is_empty() && r.risk_profile.is_none()));
    }

    #[test]
    fn empty_chain_forces_avoid_with_flag() {
        let mut state = uptrend_state();
        state.chain = OptionChain::default();
        let recs = recommend(&state, &LegSelectionConfig::default());
        let bull = recs
            .iter()
            .find(|r| r.strategy == StrategyKind::BullCallSpread)
            .unwrap();
        assert_eq!(bull.status, RecommendationStatus::Avoid);
        assert!(bull.score >= 0.6);
        assert_eq!(bull.flags.len(), 1);
        assert!(bull.flags[0].contains("no call rows"));
    }
}
