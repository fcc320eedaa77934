use crate::legs::atm_row;
use crate::models::{MarketState, RecommendationStatus};
use crate::strategy::StrategyDefinition;
use crate::strategy_utils::meets_threshold;
use serde::Serialize;

pub const RECOMMENDED_MIN_SCORE: f64 = 0.60;
pub const RECOMMENDED_MIN_MET: usize = 3;
pub const MONITOR_MIN_SCORE: f64 = 0.40;

/// Used when a state carries no days-to-expiry.
pub const FALLBACK_DTE: i64 = 30;

/// A predicate over a MarketState. Any field it needs that is absent makes
/// it evaluate to false.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Condition {
    PriceAboveSma50,
    PriceAboveSma200,
    PriceAboveVwap,
    AtmIvBetween { min: f64, max: f64 },
    AtmIvAbove(f64),
    AtmIvBelow(f64),
    RsiBetween { min: f64, max: f64 },
    RsiAbove(f64),
    RsiBelow(f64),
    RealizedVolBelow(f64),
    EmaFastAboveSlow,
    EmaFastBelowSlow,
    MacdHistogramPositive,
    /// Position within the support/resistance range is below `max_position`.
    PriceNearSupport { max_position: f64 },
    /// Position within the support/resistance range is above `min_position`.
    PriceNearResistance { min_position: f64 },
    PriceBelowResistance,
    RoomToResistance { min_pct: f64 },
    BollingerWidthBelow(f64),
    /// Analyst recommendation is a buy, or price is above SMA200.
    BullishTilt,
    /// MACD histogram negative or put/call volume ratio above the threshold.
    BearishCatalyst { put_call_ratio: f64 },
    /// Combined open interest at the ATM call and put strikes.
    AdequateLiquidity { min_open_interest: f64 },
    NoEarningsWithinDte,
    EarningsWithinDte,
    EarningsWithinDays { min: i64, max: i64 },
    UnusualActivityBelow(usize),
    UnusualActivityAtLeast(usize),
    SkewAbove(f64),
}

impl Condition {
    pub fn evaluate(&self, state: &MarketState) -> bool {
        self.check(state).unwrap_or(false)
    }

    /// Whether a daily OHLCV history alone can answer this condition.
    /// Earnings dates, open interest, skew and option flow only exist on
    /// live snapshots.
    pub fn observable_in_history(&self) -> bool {
        !matches!(
            self,
            Condition::AdequateLiquidity { .. }
                | Condition::NoEarningsWithinDte
                | Condition::EarningsWithinDte
                | Condition::EarningsWithinDays { .. }
                | Condition::UnusualActivityBelow(_)
                | Condition::UnusualActivityAtLeast(_)
                | Condition::SkewAbove(_)
        )
    }

    fn check(&self, state: &MarketState) -> Option<bool> {
        let met = match *self {
            Condition::PriceAboveSma50 => state.price? > state.sma_50?,
            Condition::PriceAboveSma200 => state.price? > state.sma_200?,
            Condition::PriceAboveVwap => state.price? > state.vwap?,
            Condition::AtmIvBetween { min, max } => {
                let iv = state.atm_iv?;
                iv >= min && iv <= max
            }
            Condition::AtmIvAbove(threshold) => state.atm_iv? > threshold,
            Condition::AtmIvBelow(threshold) => state.atm_iv? < threshold,
            Condition::RsiBetween { min, max } => {
                let rsi = state.rsi?;
                rsi >= min && rsi <= max
            }
            Condition::RsiAbove(threshold) => state.rsi? > threshold,
            Condition::RsiBelow(threshold) => state.rsi? < threshold,
            Condition::RealizedVolBelow(threshold) => state.historical_volatility? < threshold,
            Condition::EmaFastAboveSlow => state.ema_9? > state.ema_20?,
            Condition::EmaFastBelowSlow => state.ema_9? < state.ema_20?,
            Condition::MacdHistogramPositive => state.macd_histogram? > 0.0,
            Condition::PriceNearSupport { max_position } => {
                range_position(state)? < max_position
            }
            Condition::PriceNearResistance { min_position } => {
                range_position(state)? > min_position
            }
            Condition::PriceBelowResistance => state.price? < state.resistance?,
            Condition::RoomToResistance { min_pct } => {
                let price = state.price?;
                if price <= 0.0 {
                    return None;
                }
                (state.resistance? - price) / price >= min_pct
            }
            Condition::BollingerWidthBelow(threshold) => state.bb_width? < threshold,
            Condition::BullishTilt => {
                let analyst_buy = state
                    .recommendation
                    .as_deref()
                    .map(|rec| {
                        let rec = rec.to_ascii_lowercase();
                        rec == "buy" || rec == "strong_buy" || rec == "strong buy"
                    })
                    .unwrap_or(false);
                let above_long_trend = matches!(
                    (state.price, state.sma_200),
                    (Some(price), Some(sma)) if price > sma
                );
                analyst_buy || above_long_trend
            }
            Condition::BearishCatalyst { put_call_ratio } => {
                let macd_negative = state.macd_histogram.map(|h| h < 0.0).unwrap_or(false);
                let put_heavy = state
                    .put_call_ratio
                    .map(|ratio| ratio > put_call_ratio)
                    .unwrap_or(false);
                macd_negative || put_heavy
            }
            Condition::AdequateLiquidity { min_open_interest } => {
                let price = state.price?;
                let call_oi = atm_row(&state.chain.calls, price).and_then(|row| row.open_interest);
                let put_oi = atm_row(&state.chain.puts, price).and_then(|row| row.open_interest);
                if call_oi.is_none() && put_oi.is_none() {
                    return None;
                }
                call_oi.unwrap_or(0.0) + put_oi.unwrap_or(0.0) >= min_open_interest
            }
            Condition::NoEarningsWithinDte => {
                let days = state.days_to_earnings?;
                days < 0 || days > state.dte.unwrap_or(FALLBACK_DTE)
            }
            Condition::EarningsWithinDte => {
                let days = state.days_to_earnings?;
                days > 0 && days <= state.dte.unwrap_or(FALLBACK_DTE)
            }
            Condition::EarningsWithinDays { min, max } => {
                let days = state.days_to_earnings?;
                days >= min && days <= max
            }
            Condition::UnusualActivityBelow(limit) => state.unusual_activity.as_ref()?.len() < limit,
            Condition::UnusualActivityAtLeast(limit) => {
                state.unusual_activity.as_ref()?.len() >= limit
            }
            Condition::SkewAbove(threshold) => state.iv_skew? > threshold,
        };
        Some(met)
    }
}

/// Where price sits between 20-day support (0.0) and resistance (1.0).
fn range_position(state: &MarketState) -> Option<f64> {
    let price = state.price?;
    let support = state.support?;
    let resistance = state.resistance?;
    let range = resistance - support;
    if range <= 0.0 {
        return None;
    }
    Some((price - support) / range)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedCondition {
    pub condition: Condition,
    pub weight: f64,
    pub label: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConditionEvaluation {
    pub score: f64,
    pub conditions_met: usize,
    pub conditions_total: usize,
    pub met_labels: Vec<&'static str>,
    pub status: RecommendationStatus,
}

/// Status is a pure function of score and met count.
pub fn classify(score: f64, conditions_met: usize) -> RecommendationStatus {
    classify_with_min_met(score, conditions_met, RECOMMENDED_MIN_MET)
}

fn classify_with_min_met(score: f64, conditions_met: usize, min_met: usize) -> RecommendationStatus {
    if meets_threshold(score, RECOMMENDED_MIN_SCORE) && conditions_met >= min_met {
        RecommendationStatus::Recommended
    } else if meets_threshold(score, MONITOR_MIN_SCORE) {
        RecommendationStatus::Monitor
    } else {
        RecommendationStatus::Avoid
    }
}

pub fn evaluate(definition: &StrategyDefinition, state: &MarketState) -> ConditionEvaluation {
    let mut score = 0.0;
    let mut met_labels = Vec::new();
    for weighted in definition.conditions {
        if weighted.condition.evaluate(state) {
            score += weighted.weight;
            met_labels.push(weighted.label);
        }
    }

    let conditions_met = met_labels.len();
    ConditionEvaluation {
        score,
        conditions_met,
        conditions_total: definition.conditions.len(),
        met_labels,
        status: classify(score, conditions_met),
    }
}

/// Scores a historical bar on the conditions a price history can answer,
/// with their weights rescaled to sum to one. When a strategy has fewer such
/// conditions than the recommended met-count floor, all of them must hold.
pub fn evaluate_from_history(
    definition: &StrategyDefinition,
    state: &MarketState,
) -> ConditionEvaluation {
    let mut observable_weight = 0.0;
    let mut conditions_total = 0;
    let mut met_weight = 0.0;
    let mut met_labels = Vec::new();
    for weighted in definition
        .conditions
        .iter()
        .filter(|w| w.condition.observable_in_history())
    {
        observable_weight += weighted.weight;
        conditions_total += 1;
        if weighted.condition.evaluate(state) {
            met_weight += weighted.weight;
            met_labels.push(weighted.label);
        }
    }

    let score = if observable_weight > 0.0 {
        met_weight / observable_weight
    } else {
        0.0
    };
    let conditions_met = met_labels.len();
    let min_met = RECOMMENDED_MIN_MET.min(conditions_total).max(1);
    ConditionEvaluation {
        score,
        conditions_met,
        conditions_total,
        met_labels,
        status: classify_with_min_met(score, conditions_met, min_met),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChainRow, OptionChain, OptionRight, UnusualActivity};

    #[test]
    fn classification_thresholds() {
        assert_eq!(classify(0.60, 3), RecommendationStatus::Recommended);
        assert_eq!(classify(0.59, 5), RecommendationStatus::Monitor);
        assert_eq!(classify(0.39, 0), RecommendationStatus::Avoid);
        assert_eq!(classify(0.95, 2), RecommendationStatus::Monitor);
        assert_eq!(classify(0.40, 0), RecommendationStatus::Monitor);
    }

    #[test]
    fn threshold_tolerates_float_accumulation() {
        assert_eq!(classify(0.6 - 1e-9, 3), RecommendationStatus::Recommended);
        assert_eq!(classify(0.4 - 1e-9, 0), RecommendationStatus::Monitor);
        assert_eq!(classify(0.6 - 1e-3, 3), RecommendationStatus::Monitor);
    }

    #[test]
    fn missing_fields_fail_closed() {
        let state = MarketState::default();
        let conditions = [
            Condition::PriceAboveSma50,
            Condition::AtmIvBetween { min: 0.2, max: 0.5 },
            Condition::RsiBelow(40.0),
            Condition::PriceNearSupport { max_position: 0.3 },
            Condition::BullishTilt,
            Condition::BearishCatalyst { put_call_ratio: 1.0 },
            Condition::AdequateLiquidity { min_open_interest: 100.0 },
            Condition::NoEarningsWithinDte,
            Condition::EarningsWithinDays { min: 5, max: 15 },
            Condition::UnusualActivityBelow(2),
            Condition::SkewAbove(0.02),
        ];
        for condition in conditions {
            assert!(!condition.evaluate(&state), "{condition:?}");
        }
    }

    #[test]
    fn support_position_uses_range() {
        let state = MarketState {
            price: Some(102.0),
            support: Some(100.0),
            resistance: Some(110.0),
            ..MarketState::default()
        };
        assert!(Condition::PriceNearSupport { max_position: 0.3 }.evaluate(&state));
        assert!(!Condition::PriceNearResistance { min_position: 0.7 }.evaluate(&state));
        assert!(Condition::RoomToResistance { min_pct: 0.03 }.evaluate(&state));
    }

    #[test]
    fn earnings_windows() {
        let mut state = MarketState {
            days_to_earnings: Some(10),
            dte: Some(30),
            ..MarketState::default()
        };
        assert!(Condition::EarningsWithinDte.evaluate(&state));
        assert!(!Condition::NoEarningsWithinDte.evaluate(&state));
        assert!(Condition::EarningsWithinDays { min: 5, max: 15 }.evaluate(&state));

        state.days_to_earnings = Some(45);
        assert!(Condition::NoEarningsWithinDte.evaluate(&state));
        assert!(!Condition::EarningsWithinDays { min: 5, max: 15 }.evaluate(&state));
    }

    #[test]
    fn unusual_activity_requires_snapshot() {
        let flag = UnusualActivity {
            right: OptionRight::Call,
            strike: 100.0,
            volume: 900.0,
            open_interest: 100.0,
            ratio: 9.0,
        };
        let mut state = MarketState::default();
        assert!(!Condition::UnusualActivityBelow(2).evaluate(&state));
        state.unusual_activity = Some(vec![flag.clone()]);
        assert!(Condition::UnusualActivityBelow(2).evaluate(&state));
        state.unusual_activity = Some(vec![flag.clone(), flag]);
        assert!(Condition::UnusualActivityAtLeast(2).evaluate(&state));
    }

    #[test]
    fn liquidity_reads_atm_open_interest() {
        let row = |strike: f64, oi: f64| ChainRow {
            strike,
            open_interest: Some(oi),
            ..ChainRow::default()
        };
        let state = MarketState {
            price: Some(101.0),
            chain: OptionChain::new(
                vec![row(95.0, 5000.0), row(100.0, 60.0)],
                vec![row(100.0, 50.0), row(105.0, 0.0)],
            ),
            ..MarketState::default()
        };
        assert!(Condition::AdequateLiquidity { min_open_interest: 100.0 }.evaluate(&state));
        assert!(!Condition::AdequateLiquidity { min_open_interest: 200.0 }.evaluate(&state));
    }

    #[test]
    fn history_scoring_rescales_observable_weights() {
        use crate::strategy::StrategyKind;

        // Calm tape near the top of its range, no earnings or chain data.
        let state = MarketState {
            price: Some(101.0),
            atm_iv: Some(0.26),
            bb_width: Some(0.04),
            support: Some(96.0),
            resistance: Some(102.0),
            sma_50: Some(97.0),
            ..MarketState::default()
        };

        let straddle = StrategyKind::LongStraddle.definition();
        assert_eq!(evaluate(straddle, &state).status, RecommendationStatus::Avoid);
        let replayed = evaluate_from_history(straddle, &state);
        assert_eq!(replayed.conditions_total, 2);
        assert_eq!(replayed.conditions_met, 2);
        assert!((replayed.score - 1.0).abs() < 1e-12);
        assert_eq!(replayed.status, RecommendationStatus::Recommended);

        let hedge = StrategyKind::ProtectivePut.definition();
        assert_eq!(evaluate(hedge, &state).status, RecommendationStatus::Monitor);
        assert_eq!(
            evaluate_from_history(hedge, &state).status,
            RecommendationStatus::Recommended
        );

        let mut no_squeeze = state.clone();
        no_squeeze.bb_width = Some(0.09);
        let partial = evaluate_from_history(straddle, &no_squeeze);
        assert_eq!(partial.conditions_met, 1);
        assert_eq!(partial.status, RecommendationStatus::Monitor);
    }

    #[test]
    fn every_strategy_keeps_observable_conditions() {
        for definition in crate::strategy::catalog() {
            let observable = definition
                .conditions
                .iter()
                .filter(|w| w.condition.observable_in_history())
                .count();
            assert!(observable >= 2, "{}", definition.kind);
        }
        assert!(!Condition::EarningsWithinDte.observable_in_history());
        assert!(!Condition::AdequateLiquidity { min_open_interest: 1.0 }.observable_in_history());
        assert!(Condition::BearishCatalyst { put_call_ratio: 1.0 }.observable_in_history());
    }
}
