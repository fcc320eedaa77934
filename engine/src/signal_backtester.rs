use crate::backtester::{completed_result, insufficient_data_result};
use crate::config::SignalBacktestConfig;
use crate::models::{BacktestResult, BacktestSubject, Candle, ExitReason, SimulatedTrade};
use crate::signals::clauses_at;
use crate::snapshot::IndicatorSeries;
use crate::strategy_utils::calendar_days_between;
use log::{debug, info};

pub const SIGNAL_NOTE: &str = "Underlying price returns on entry/exit signals";

/// Replays the entry/exit signal rules over a daily series, holding the
/// underlying from an entry signal to the next exit signal.
pub struct SignalBacktester {
    config: SignalBacktestConfig,
}

impl SignalBacktester {
    pub fn new(config: SignalBacktestConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, ticker: &str, candles: &[Candle]) -> BacktestResult {
        let subject = BacktestSubject::EntryExitSignals;
        if candles.len() < self.config.min_history {
            return insufficient_data_result(
                ticker,
                subject,
                candles,
                format!(
                    "Insufficient data: {} bars, signal backtest needs at least {}",
                    candles.len(),
                    self.config.min_history
                ),
            );
        }

        let series = IndicatorSeries::compute(candles);
        let mut trades = Vec::new();
        let mut total_signals = 0;
        let mut entry_index: Option<usize> = None;

        for t in 0..candles.len() {
            let clauses = clauses_at(&series, t);
            let entry_signal = clauses.is_some_and(|c| c.entry());
            if entry_signal {
                total_signals += 1;
            }

            match entry_index {
                None => {
                    if entry_signal {
                        debug!("{}: entry at bar {}", ticker, t);
                        entry_index = Some(t);
                    }
                }
                Some(entry) => {
                    let exit_reason = if clauses.is_some_and(|c| c.exit()) {
                        Some(ExitReason::ExitSignal)
                    } else if self
                        .config
                        .max_hold_days
                        .is_some_and(|max_hold| t - entry >= max_hold)
                    {
                        Some(ExitReason::MaxHold)
                    } else {
                        None
                    };

                    if let Some(reason) = exit_reason {
                        trades.push(price_trade(candles, entry, t, reason));
                        entry_index = None;
                    }
                }
            }
        }

        if let Some(entry) = entry_index {
            trades.push(price_trade(
                candles,
                entry,
                candles.len() - 1,
                ExitReason::Open,
            ));
        }

        let result = completed_result(
            ticker,
            subject,
            candles,
            total_signals,
            trades,
            SIGNAL_NOTE.to_string(),
        );
        info!(
            "{} signals: {} entries seen, {} completed trades, win rate {:.1}%, avg return {:.2}%",
            ticker,
            result.total_signals,
            result.statistics.completed_trades,
            result.statistics.win_rate * 100.0,
            result.statistics.average_return * 100.0
        );
        result
    }
}

/// One share of the underlying from `entry` to `exit`.
fn price_trade(
    candles: &[Candle],
    entry: usize,
    exit: usize,
    exit_reason: ExitReason,
) -> SimulatedTrade {
    let entry_candle = &candles[entry];
    let exit_candle = &candles[exit];
    let pnl = exit_candle.close - entry_candle.close;
    let return_ratio = if entry_candle.close > 0.0 {
        pnl / entry_candle.close
    } else {
        0.0
    };

    SimulatedTrade {
        subject: BacktestSubject::EntryExitSignals,
        entry_date: entry_candle.date,
        entry_price: entry_candle.close,
        exit_date: exit_candle.date,
        exit_price: exit_candle.close,
        legs: Vec::new(),
        stock_pnl: pnl,
        entry_cost: entry_candle.close,
        pnl,
        return_ratio,
        holding_days: calendar_days_between(&entry_candle.date, &exit_candle.date),
        exit_reason,
    }
}
