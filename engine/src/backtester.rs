//! Walk-forward simulation of one catalog strategy over a daily OHLCV history.
//!
//! No historical chains are available, so every entry prices its legs off a
//! synthetic chain built with Black-Scholes from trailing realized volatility.
//! Entries are scored with `conditions::evaluate_from_history`, since earnings,
//! open interest, skew and option flow have no history to replay.

use crate::conditions;
use crate::config::WalkForwardConfig;
use crate::models::{
    BacktestResult, BacktestStatus, BacktestSubject, Candle, ChainRow, ExitReason, OptionChain,
    OptionLeg, OptionRight, PricedLeg, RecommendationStatus, SimulatedTrade,
};
use crate::performance::PerformanceCalculator;
use crate::pricing::{option_price, years_from_days};
use crate::snapshot::IndicatorSeries;
use crate::strategy::{StrategyDefinition, StrategyKind};
use crate::strategy_utils::calendar_days_between;
use chrono::{DateTime, Utc};
use log::{debug, info};

pub const SIMULATION_NOTE: &str = "Simulated via Black-Scholes (estimated premiums)";

/// Synthetic strikes span this fraction of spot on either side.
const SYNTHETIC_STRIKE_RANGE: f64 = 0.25;
/// Smallest capital at risk per share used as a return denominator.
const MIN_ENTRY_COST_PER_SHARE: f64 = 0.01;

/// Listed-style strike spacing for a given underlying price.
pub fn strike_step(spot: f64) -> f64 {
    if spot < 25.0 {
        0.5
    } else if spot < 100.0 {
        1.0
    } else if spot < 200.0 {
        2.5
    } else {
        5.0
    }
}

/// Estimated single-expiry chain around `spot`, every row priced with the
/// same volatility. Only `last_price` and `implied_volatility` are set.
pub fn synthetic_chain(spot: f64, volatility: f64, time_years: f64, rate: f64) -> OptionChain {
    if !(spot.is_finite() && spot > 0.0) {
        return OptionChain::default();
    }

    let step = strike_step(spot);
    let first = (spot * (1.0 - SYNTHETIC_STRIKE_RANGE) / step).floor() as i64;
    let last = (spot * (1.0 + SYNTHETIC_STRIKE_RANGE) / step).ceil() as i64;

    let mut calls = Vec::new();
    let mut puts = Vec::new();
    for k in first.max(1)..=last {
        let strike = k as f64 * step;
        for (right, rows) in [(OptionRight::Call, &mut calls), (OptionRight::Put, &mut puts)] {
            rows.push(ChainRow {
                strike,
                last_price: Some(option_price(right, spot, strike, time_years, volatility, rate)),
                implied_volatility: Some(volatility),
                ..ChainRow::default()
            });
        }
    }

    OptionChain { calls, puts }
}

/// Signed value of a set of legs: long premium counts positive, short negative.
fn position_value(legs: &[OptionLeg]) -> f64 {
    legs.iter()
        .map(|leg| leg.signed_premium() * leg.multiplier as f64)
        .sum()
}

struct OpenPosition {
    entry_index: usize,
    entry_date: DateTime<Utc>,
    entry_price: f64,
    entry_volatility: f64,
    legs: Vec<OptionLeg>,
}

pub struct WalkForwardSimulator {
    config: WalkForwardConfig,
}

impl WalkForwardSimulator {
    pub fn new(config: WalkForwardConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WalkForwardConfig {
        &self.config
    }

    pub fn run(&self, ticker: &str, candles: &[Candle], kind: StrategyKind) -> BacktestResult {
        let subject = BacktestSubject::Strategy(kind);
        let lookback = self.config.lookback_days;
        if candles.len() <= lookback {
            return insufficient_data_result(
                ticker,
                subject,
                candles,
                format!(
                    "Insufficient data: {} bars, walk-forward needs more than {}",
                    candles.len(),
                    lookback
                ),
            );
        }

        let definition = kind.definition();
        let series =
            IndicatorSeries::compute_with_volatility_window(candles, self.config.volatility_window);

        let mut trades = Vec::new();
        let mut total_signals = 0;
        let mut position: Option<OpenPosition> = None;

        for idx in lookback..candles.len() {
            let candle = &candles[idx];

            if let Some(open) = position.take() {
                let elapsed = calendar_days_between(&open.entry_date, &candle.date);
                let remaining = self.config.target_dte - elapsed;
                let exit_reason = if remaining <= 0 {
                    Some(ExitReason::Expiry)
                } else if definition.exit_rule.triggered(series.rsi_at(idx)) {
                    Some(ExitReason::ExitSignal)
                } else {
                    None
                };

                match exit_reason {
                    Some(reason) => {
                        trades.push(self.close_position(kind, open, &series, candle, idx, reason));
                    }
                    None => position = Some(open),
                }
                // Positions never close and reopen on the same bar.
                continue;
            }

            if let Some(opened) = self.try_open(definition, &series, candle, idx) {
                total_signals += 1;
                position = opened;
            }
        }

        if let Some(open) = position {
            if let Some(last) = candles.last() {
                let idx = candles.len() - 1;
                trades.push(self.close_position(kind, open, &series, last, idx, ExitReason::Open));
            }
        }

        let result = completed_result(
            ticker,
            subject,
            candles,
            total_signals,
            trades,
            SIMULATION_NOTE.to_string(),
        );
        info!(
            "{} {}: {} signals, {} trades, win rate {:.1}%, total P&L {:.2}",
            ticker,
            kind,
            result.total_signals,
            result.statistics.completed_trades,
            result.statistics.win_rate * 100.0,
            result.statistics.total_pnl
        );
        result
    }

    /// Evaluates the strategy at bar `idx` on its price-history conditions.
    /// Returns `None` when the strategy is not recommended, and `Some(None)`
    /// when it is but no position could be built.
    fn try_open(
        &self,
        definition: &StrategyDefinition,
        series: &IndicatorSeries,
        candle: &Candle,
        idx: usize,
    ) -> Option<Option<OpenPosition>> {
        let volatility = series.realized_vol_at(idx);
        let mut state = series.market_state_at(idx);
        state.atm_iv = volatility;
        state.dte = Some(self.config.target_dte);

        if conditions::evaluate_from_history(definition, &state).status
            != RecommendationStatus::Recommended
        {
            return None;
        }

        let spot = state.price?;
        let volatility = match volatility {
            Some(vol) if vol > self.config.min_volatility => vol,
            _ => {
                debug!(
                    "{} {} {}: volatility below entry minimum, skipping",
                    series.ticker,
                    definition.kind,
                    candle.date.date_naive()
                );
                return Some(None);
            }
        };

        let time_years = years_from_days(self.config.target_dte as f64);
        state.chain = synthetic_chain(spot, volatility, time_years, self.config.risk_free_rate);

        match definition
            .leg_builder()
            .build(spot, &state.chain, &self.config.legs)
        {
            Ok(legs) => Some(Some(OpenPosition {
                entry_index: idx,
                entry_date: candle.date,
                entry_price: spot,
                entry_volatility: volatility,
                legs,
            })),
            Err(err) => {
                debug!(
                    "{} {} {}: no position, {}",
                    series.ticker,
                    definition.kind,
                    candle.date.date_naive(),
                    err
                );
                Some(None)
            }
        }
    }

    /// Reprices the open legs at bar `idx` with the time left to the
    /// simulated expiry. Share-holding strategies also carry the stock move.
    fn close_position(
        &self,
        kind: StrategyKind,
        open: OpenPosition,
        series: &IndicatorSeries,
        candle: &Candle,
        idx: usize,
        exit_reason: ExitReason,
    ) -> SimulatedTrade {
        let spot = candle.close;
        let holding_days = calendar_days_between(&open.entry_date, &candle.date);
        let remaining_days = self.config.target_dte - holding_days;
        let volatility = series
            .realized_vol_at(idx)
            .unwrap_or(open.entry_volatility);
        let time_years = years_from_days(remaining_days.max(0) as f64);

        let legs: Vec<PricedLeg> = open
            .legs
            .iter()
            .map(|leg| PricedLeg {
                action: leg.action,
                right: leg.right,
                strike: leg.strike,
                multiplier: leg.multiplier,
                entry_premium: leg.premium,
                exit_premium: option_price(
                    leg.right,
                    spot,
                    leg.strike,
                    time_years,
                    volatility,
                    self.config.risk_free_rate,
                ),
            })
            .collect();

        let multiplier = open.legs.first().map_or(1, |leg| leg.multiplier) as f64;
        let shares = if kind.definition().holds_shares {
            multiplier
        } else {
            0.0
        };
        let stock_pnl = (spot - open.entry_price) * shares;
        let entry_cost = (position_value(&open.legs) + open.entry_price * shares)
            .abs()
            .max(MIN_ENTRY_COST_PER_SHARE * multiplier);
        let pnl = legs.iter().map(PricedLeg::pnl).sum::<f64>() + stock_pnl;

        debug!(
            "{} {}: closed bar {} -> {} ({:?}), P&L {:.2}",
            series.ticker, kind, open.entry_index, idx, exit_reason, pnl
        );

        SimulatedTrade {
            subject: BacktestSubject::Strategy(kind),
            entry_date: open.entry_date,
            entry_price: open.entry_price,
            exit_date: candle.date,
            exit_price: spot,
            legs,
            stock_pnl,
            entry_cost,
            pnl,
            return_ratio: pnl / entry_cost,
            holding_days,
            exit_reason,
        }
    }
}

fn period_bounds(candles: &[Candle]) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    (
        candles.first().map(|c| c.date),
        candles.last().map(|c| c.date),
    )
}

/// Zero-trade result for a series too short to simulate.
pub fn insufficient_data_result(
    ticker: &str,
    subject: BacktestSubject,
    candles: &[Candle],
    note: String,
) -> BacktestResult {
    info!("{} {}: {}", ticker, subject, note);
    let (period_start, period_end) = period_bounds(candles);
    BacktestResult {
        ticker: ticker.to_string(),
        subject,
        status: BacktestStatus::InsufficientData,
        period_start,
        period_end,
        total_signals: 0,
        trades: Vec::new(),
        statistics: PerformanceCalculator::summarize(&[]),
        note,
    }
}

pub fn completed_result(
    ticker: &str,
    subject: BacktestSubject,
    candles: &[Candle],
    total_signals: usize,
    trades: Vec<SimulatedTrade>,
    note: String,
) -> BacktestResult {
    let (period_start, period_end) = period_bounds(candles);
    BacktestResult {
        ticker: ticker.to_string(),
        subject,
        status: BacktestStatus::Completed,
        period_start,
        period_end,
        total_signals,
        statistics: PerformanceCalculator::summarize(&trades),
        trades,
        note,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LegAction;
    use chrono::{Duration, TimeZone};
    use std::collections::HashMap;

    fn candles_from(closes: &[f64]) -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                ticker: "SIM".to_string(),
                date: start + Duration::days(i as i64),
                open: close,
                high: close * 1.005,
                low: close * 0.995,
                close,
                volume_shares: 2_000_000,
            })
            .collect()
    }

    #[test]
    fn strike_grid_follows_price_level() {
        assert_eq!(strike_step(12.0), 0.5);
        assert_eq!(strike_step(50.0), 1.0);
        assert_eq!(strike_step(100.0), 2.5);
        assert_eq!(strike_step(450.0), 5.0);

        let chain = synthetic_chain(100.0, 0.3, 30.0 / 365.0, 0.05);
        let strikes: Vec<f64> = chain.calls.iter().map(|row| row.strike).collect();
        assert_eq!(strikes.first(), Some(&75.0));
        assert_eq!(strikes.last(), Some(&125.0));
        assert!(strikes.contains(&100.0) && strikes.contains(&105.0));
        assert_eq!(chain.calls.len(), chain.puts.len());
    }

    #[test]
    fn synthetic_premiums_decrease_away_from_the_money() {
        let chain = synthetic_chain(100.0, 0.3, 30.0 / 365.0, 0.05);
        for pair in chain.calls.windows(2) {
            assert!(pair[0].premium().unwrap() >= pair[1].premium().unwrap());
        }
        for pair in chain.puts.windows(2) {
            assert!(pair[0].premium().unwrap() <= pair[1].premium().unwrap());
        }
        assert!(synthetic_chain(f64::NAN, 0.3, 0.1, 0.05).is_empty());
    }

    #[test]
    fn short_history_is_insufficient() {
        let candles = candles_from(&[100.0; 30]);
        let simulator = WalkForwardSimulator::new(WalkForwardConfig::default());
        let result = simulator.run("SIM", &candles, StrategyKind::IronCondor);
        assert_eq!(result.status, BacktestStatus::InsufficientData);
        assert!(result.trades.is_empty());
        assert_eq!(result.statistics.completed_trades, 0);
        assert_eq!(result.period_start, Some(candles[0].date));
    }

    #[test]
    fn trade_pnl_is_sum_of_leg_pnl() {
        let simulator = WalkForwardSimulator::new(WalkForwardConfig::default());
        let candles = candles_from(&[100.0; 60]);
        let series = IndicatorSeries::compute(&candles);
        let open = OpenPosition {
            entry_index: 50,
            entry_date: candles[50].date,
            entry_price: 100.0,
            entry_volatility: 0.3,
            legs: vec![
                OptionLeg::new(LegAction::Buy, OptionRight::Call, 100.0, 3.5),
                OptionLeg::new(LegAction::Sell, OptionRight::Call, 105.0, 1.5),
            ],
        };
        let trade = simulator.close_position(
            StrategyKind::BullCallSpread,
            open,
            &series,
            &candles[59],
            59,
            ExitReason::Expiry,
        );
        // Flat at 100 into expiry: both legs expire worthless.
        assert_eq!(trade.legs[0].exit_premium, 0.0);
        assert_eq!(trade.legs[1].exit_premium, 0.0);
        assert!((trade.pnl + 200.0).abs() < 1e-9);
        assert!((trade.entry_cost - 200.0).abs() < 1e-9);
        assert!((trade.return_ratio + 1.0).abs() < 1e-12);
        assert_eq!(trade.holding_days, 9);
        assert_eq!(trade.stock_pnl, 0.0);
    }

    #[test]
    fn covered_call_carries_the_shares() {
        let config = WalkForwardConfig {
            target_dte: 9,
            ..WalkForwardConfig::default()
        };
        let simulator = WalkForwardSimulator::new(config);
        let mut closes = vec![100.0; 59];
        closes.push(110.0);
        let candles = candles_from(&closes);
        let series = IndicatorSeries::compute(&candles);
        let open = OpenPosition {
            entry_index: 50,
            entry_date: candles[50].date,
            entry_price: 100.0,
            entry_volatility: 0.3,
            legs: vec![OptionLeg::new(LegAction::Sell, OptionRight::Call, 105.0, 2.0)],
        };
        let trade = simulator.close_position(
            StrategyKind::CoveredCall,
            open,
            &series,
            &candles[59],
            59,
            ExitReason::Expiry,
        );
        // Called away at 105: option loses 300, shares gain 1000.
        assert_eq!(trade.legs[0].exit_premium, 5.0);
        assert!((trade.stock_pnl - 1000.0).abs() < 1e-9);
        assert!((trade.pnl - 700.0).abs() < 1e-9);
        assert!((trade.entry_cost - 9800.0).abs() < 1e-9);
    }

    /// Uptrend with an alternating 0.8% zigzag: about 26% realized vol,
    /// Bollinger width near 0.04, and every other close near the 20-day high.
    fn zigzag_closes(len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| {
                let swing = if i % 2 == 0 { 0.008 } else { -0.008 };
                100.0 * (0.001 * i as f64).exp() * (1.0 + swing)
            })
            .collect()
    }

    #[test]
    fn trades_never_overlap_and_respect_expiry() {
        let candles = candles_from(&zigzag_closes(200));
        let simulator = WalkForwardSimulator::new(WalkForwardConfig::default());
        for kind in StrategyKind::ALL {
            let result = simulator.run("SIM", &candles, kind);
            assert_eq!(result.status, BacktestStatus::Completed);
            assert_eq!(result.note, SIMULATION_NOTE);
            for pair in result.trades.windows(2) {
                assert!(pair[0].exit_date < pair[1].entry_date);
            }
            for trade in &result.trades {
                assert!(trade.holding_days <= simulator.config().target_dte);
                let leg_pnl: f64 = trade.legs.iter().map(PricedLeg::pnl).sum();
                assert!((trade.pnl - leg_pnl - trade.stock_pnl).abs() < 1e-9);
                assert!(trade.entry_cost > 0.0);
            }
            assert!(result.trades.len() <= result.total_signals);
        }
    }

    #[test]
    fn calm_uptrend_trades_hedges_straddles_and_covered_calls() {
        let candles = candles_from(&zigzag_closes(200));
        let simulator = WalkForwardSimulator::new(WalkForwardConfig::default());
        for kind in [
            StrategyKind::LongStraddle,
            StrategyKind::ProtectivePut,
            StrategyKind::CoveredCall,
        ] {
            let result = simulator.run("SIM", &candles, kind);
            assert!(!result.trades.is_empty(), "{} never traded", kind);
            // The first bar with a full lookback already qualifies.
            assert_eq!(result.trades[0].entry_date, candles[50].date);
            let shares = kind.definition().holds_shares;
            assert!(result
                .trades
                .iter()
                .all(|t| (t.stock_pnl != 0.0) == (shares && t.exit_price != t.entry_price)));
        }
    }

    #[test]
    fn shorter_dte_is_read_from_parameters() {
        let mut parameters = HashMap::new();
        parameters.insert("targetDte".to_string(), 10.0);
        let config =
            WalkForwardConfig::from_parameters(&parameters, &crate::config::EngineSettings::default());
        assert_eq!(WalkForwardSimulator::new(config).config().target_dte, 10);
    }
}
