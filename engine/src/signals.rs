use crate::models::Candle;
use crate::snapshot::IndicatorSeries;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const ENTRY_RSI_MAX: f64 = 35.0;
pub const EXIT_RSI_MIN: f64 = 65.0;

/// EMA9 moved from below EMA20 on the prior bar to above it on this bar.
pub fn crossed_above(previous_spread: f64, spread: f64) -> bool {
    previous_spread < 0.0 && spread > 0.0
}

/// EMA9 moved from above EMA20 on the prior bar to below it on this bar.
pub fn crossed_below(previous_spread: f64, spread: f64) -> bool {
    previous_spread > 0.0 && spread < 0.0
}

/// Each clause of the entry and exit rules at one bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SignalClauses {
    pub rsi_oversold: bool,
    pub price_below_vwap: bool,
    pub ema_cross_up: bool,
    pub rsi_overbought: bool,
    pub price_above_vwap: bool,
    pub ema_cross_down: bool,
}

impl SignalClauses {
    pub fn entry(&self) -> bool {
        self.rsi_oversold && self.price_below_vwap && self.ema_cross_up
    }

    pub fn exit(&self) -> bool {
        self.rsi_overbought && self.price_above_vwap && self.ema_cross_down
    }

    pub fn entry_reasons(&self) -> Vec<&'static str> {
        let mut reasons = Vec::new();
        if self.rsi_oversold {
            reasons.push("RSI < 35");
        }
        if self.price_below_vwap {
            reasons.push("Price < VWAP");
        }
        if self.ema_cross_up {
            reasons.push("EMA9 crossed above EMA20");
        }
        reasons
    }

    pub fn exit_reasons(&self) -> Vec<&'static str> {
        let mut reasons = Vec::new();
        if self.rsi_overbought {
            reasons.push("RSI > 65");
        }
        if self.price_above_vwap {
            reasons.push("Price > VWAP");
        }
        if self.ema_cross_down {
            reasons.push("EMA9 crossed below EMA20");
        }
        reasons
    }
}

/// Clauses at bar `t`, or `None` while RSI, VWAP or either EMA spread is
/// still warming up.
pub fn clauses_at(series: &IndicatorSeries, t: usize) -> Option<SignalClauses> {
    if t == 0 {
        return None;
    }
    let price = series.close_at(t)?;
    let rsi = series.rsi_at(t)?;
    let vwap = series.vwap_at(t)?;
    let spread = series.ema_spread_at(t)?;
    let previous_spread = series.ema_spread_at(t - 1)?;

    Some(SignalClauses {
        rsi_oversold: rsi < ENTRY_RSI_MAX,
        price_below_vwap: price < vwap,
        ema_cross_up: crossed_above(previous_spread, spread),
        rsi_overbought: rsi > EXIT_RSI_MIN,
        price_above_vwap: price > vwap,
        ema_cross_down: crossed_below(previous_spread, spread),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct EntryExitEvaluation {
    pub ticker: String,
    pub date: DateTime<Utc>,
    pub price: f64,
    pub entry_signal: bool,
    pub exit_signal: bool,
    pub entry_reasons: Vec<&'static str>,
    pub exit_reasons: Vec<&'static str>,
    pub rsi: f64,
    pub vwap: f64,
    pub ema_9: Option<f64>,
    pub ema_20: Option<f64>,
    pub atr_14: Option<f64>,
}

/// Entry/exit evaluation at the latest bar of `candles`.
pub fn evaluate_entry_exit(candles: &[Candle]) -> Option<EntryExitEvaluation> {
    let series = IndicatorSeries::compute(candles);
    let last = series.len().checked_sub(1)?;
    evaluate_at(&series, last)
}

pub fn evaluate_at(series: &IndicatorSeries, t: usize) -> Option<EntryExitEvaluation> {
    let clauses = clauses_at(series, t)?;
    let state = series.market_state_at(t);
    Some(EntryExitEvaluation {
        ticker: series.ticker.clone(),
        date: *series.dates.get(t)?,
        price: state.price?,
        entry_signal: clauses.entry(),
        exit_signal: clauses.exit(),
        entry_reasons: clauses.entry_reasons(),
        exit_reasons: clauses.exit_reasons(),
        rsi: state.rsi?,
        vwap: state.vwap?,
        ema_9: state.ema_9,
        ema_20: state.ema_20,
        atr_14: series.atr_at(t),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn crossovers_need_strict_sign_change() {
        assert!(crossed_above(-0.1, 0.2));
        assert!(!crossed_above(0.0, 0.2));
        assert!(!crossed_above(-0.1, 0.0));
        assert!(crossed_below(0.3, -0.01));
        assert!(!crossed_below(-0.3, -0.01));
    }

    #[test]
    fn entry_requires_every_clause() {
        let mut clauses = SignalClauses {
            rsi_oversold: true,
            price_below_vwap: true,
            ema_cross_up: false,
            ..SignalClauses::default()
        };
        assert!(!clauses.entry());
        assert_eq!(clauses.entry_reasons(), vec!["RSI < 35", "Price < VWAP"]);
        clauses.ema_cross_up = true;
        assert!(clauses.entry());
        assert!(!clauses.exit());
    }

    #[test]
    fn short_history_has_no_evaluation() {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let candles: Vec<Candle> = (0..10)
            .map(|i| Candle {
                ticker: "T".to_string(),
                date: start + Duration::days(i),
                open: 10.0,
                high: 10.5,
                low: 9.5,
                close: 10.0,
                volume_shares: 1000,
            })
            .collect();
        assert!(evaluate_entry_exit(&candles).is_none());
        assert!(evaluate_entry_exit(&[]).is_none());
    }

    #[test]
    fn uptrend_reports_latest_values() {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let candles: Vec<Candle> = (0..40)
            .map(|i| {
                let close = 50.0 + i as f64;
                Candle {
                    ticker: "UP".to_string(),
                    date: start + Duration::days(i),
                    open: close - 0.5,
                    high: close + 0.5,
                    low: close - 1.0,
                    close,
                    volume_shares: 10_000,
                }
            })
            .collect();
        let evaluation = evaluate_entry_exit(&candles).unwrap();
        assert_eq!(evaluation.ticker, "UP");
        assert_eq!(evaluation.price, 89.0);
        assert_eq!(evaluation.rsi, 100.0);
        assert!(!evaluation.entry_signal);
        assert!(!evaluation.exit_signal);
        assert_eq!(evaluation.exit_reasons, vec!["RSI > 65", "Price > VWAP"]);
        assert!(evaluation.atr_14.is_some());
    }
}
