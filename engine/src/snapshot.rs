use crate::indicators::{
    calculate_atr, calculate_bollinger_bands, calculate_ema, calculate_macd,
    calculate_realized_volatility, calculate_rolling_vwap, calculate_rsi, calculate_sma,
    calculate_volume_ratio, rolling_max, rolling_min,
};
use crate::chain_analytics::OptionsSnapshot;
use crate::models::{Candle, Fundamentals, MarketState, OptionChain};
use chrono::{DateTime, Utc};

pub const EMA_FAST_PERIOD: usize = 9;
pub const EMA_SLOW_PERIOD: usize = 20;
pub const RSI_PERIOD: usize = 14;
pub const MACD_FAST_PERIOD: usize = 12;
pub const MACD_SLOW_PERIOD: usize = 26;
pub const MACD_SIGNAL_PERIOD: usize = 9;
pub const BOLLINGER_PERIOD: usize = 20;
pub const BOLLINGER_STD_DEV: f64 = 2.0;
pub const VWAP_WINDOW: usize = 20;
pub const RANGE_WINDOW: usize = 20;
pub const YEAR_WINDOW: usize = 252;
pub const ATR_PERIOD: usize = 14;
pub const DEFAULT_VOLATILITY_WINDOW: usize = 20;

/// Indicator series precomputed once for a ticker's candles. Element `t` of
/// every series only uses candles `0..=t`.
#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub ticker: String,
    pub dates: Vec<DateTime<Utc>>,
    pub closes: Vec<f64>,
    pub ema_9: Vec<f64>,
    pub ema_20: Vec<f64>,
    pub sma_20: Vec<f64>,
    pub sma_50: Vec<f64>,
    pub sma_200: Vec<f64>,
    pub rsi_14: Vec<f64>,
    pub macd_histogram: Vec<f64>,
    pub bb_upper: Vec<f64>,
    pub bb_lower: Vec<f64>,
    pub bb_width: Vec<f64>,
    pub vwap_20: Vec<f64>,
    pub volume_ratio: Vec<f64>,
    pub support_20: Vec<f64>,
    pub resistance_20: Vec<f64>,
    pub high_252: Vec<f64>,
    pub low_252: Vec<f64>,
    pub realized_vol: Vec<f64>,
    pub atr_14: Vec<f64>,
}

impl IndicatorSeries {
    pub fn compute(candles: &[Candle]) -> Self {
        Self::compute_with_volatility_window(candles, DEFAULT_VOLATILITY_WINDOW)
    }

    pub fn compute_with_volatility_window(candles: &[Candle], volatility_window: usize) -> Self {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let highs: Vec<f64> = candles.iter().map(|c| c.high).collect();
        let lows: Vec<f64> = candles.iter().map(|c| c.low).collect();
        let volumes: Vec<f64> = candles.iter().map(|c| c.volume_shares as f64).collect();

        let mut ema_9 = calculate_ema(&closes, EMA_FAST_PERIOD);
        let mut ema_20 = calculate_ema(&closes, EMA_SLOW_PERIOD);
        mask_warmup(&mut ema_9, EMA_FAST_PERIOD - 1);
        mask_warmup(&mut ema_20, EMA_SLOW_PERIOD - 1);

        let (_, _, mut macd_histogram) = calculate_macd(
            &closes,
            MACD_FAST_PERIOD,
            MACD_SLOW_PERIOD,
            MACD_SIGNAL_PERIOD,
        );
        mask_warmup(&mut macd_histogram, MACD_SLOW_PERIOD - 1);

        let bands = calculate_bollinger_bands(&closes, BOLLINGER_PERIOD, BOLLINGER_STD_DEV);

        Self {
            ticker: candles.first().map(|c| c.ticker.clone()).unwrap_or_default(),
            dates: candles.iter().map(|c| c.date).collect(),
            ema_9,
            ema_20,
            sma_20: bands.middle,
            sma_50: calculate_sma(&closes, 50),
            sma_200: calculate_sma(&closes, 200),
            rsi_14: calculate_rsi(&closes, RSI_PERIOD),
            macd_histogram,
            bb_upper: bands.upper,
            bb_lower: bands.lower,
            bb_width: bands.width,
            vwap_20: calculate_rolling_vwap(&highs, &lows, &closes, &volumes, VWAP_WINDOW),
            volume_ratio: calculate_volume_ratio(&volumes, RANGE_WINDOW),
            support_20: rolling_min(&lows, RANGE_WINDOW),
            resistance_20: rolling_max(&highs, RANGE_WINDOW),
            high_252: rolling_max(&highs, YEAR_WINDOW),
            low_252: rolling_min(&lows, YEAR_WINDOW),
            realized_vol: calculate_realized_volatility(&closes, volatility_window),
            atr_14: calculate_atr(&highs, &lows, &closes, ATR_PERIOD),
            closes,
        }
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }

    pub fn close_at(&self, t: usize) -> Option<f64> {
        value_at(&self.closes, t)
    }

    pub fn rsi_at(&self, t: usize) -> Option<f64> {
        value_at(&self.rsi_14, t)
    }

    pub fn vwap_at(&self, t: usize) -> Option<f64> {
        value_at(&self.vwap_20, t)
    }

    pub fn realized_vol_at(&self, t: usize) -> Option<f64> {
        value_at(&self.realized_vol, t)
    }

    pub fn atr_at(&self, t: usize) -> Option<f64> {
        value_at(&self.atr_14, t)
    }

    /// EMA9 minus EMA20 at bar `t`.
    pub fn ema_spread_at(&self, t: usize) -> Option<f64> {
        Some(value_at(&self.ema_9, t)? - value_at(&self.ema_20, t)?)
    }

    /// Technical block of a MarketState as of bar `t`.
    ///
    /// Candles carry no fundamentals or option data, so `sector`,
    /// `days_to_earnings`, `short_interest`, `recommendation`, `atm_iv`,
    /// `iv_skew`, `put_call_ratio`, `max_pain`, `unusual_activity`, `dte` and
    /// the chain are left empty. Conditions reading them fail closed; the
    /// walk-forward simulator fills `atm_iv` and `dte` itself and scores the
    /// rest with `conditions::evaluate_from_history`.
    pub fn market_state_at(&self, t: usize) -> MarketState {
        MarketState {
            ticker: self.ticker.clone(),
            price: self.close_at(t),
            rsi: self.rsi_at(t),
            ema_9: value_at(&self.ema_9, t),
            ema_20: value_at(&self.ema_20, t),
            sma_50: value_at(&self.sma_50, t),
            sma_200: value_at(&self.sma_200, t),
            macd_histogram: value_at(&self.macd_histogram, t),
            bb_width: value_at(&self.bb_width, t),
            bb_upper: value_at(&self.bb_upper, t),
            bb_lower: value_at(&self.bb_lower, t),
            vwap: self.vwap_at(t),
            volume_ratio: value_at(&self.volume_ratio, t),
            support: value_at(&self.support_20, t),
            resistance: value_at(&self.resistance_20, t),
            high_52w: value_at(&self.high_252, t),
            low_52w: value_at(&self.low_252, t),
            historical_volatility: self.realized_vol_at(t),
            ..MarketState::default()
        }
    }

    pub fn latest_market_state(&self) -> Option<MarketState> {
        let last = self.len().checked_sub(1)?;
        Some(self.market_state_at(last))
    }
}

/// Live analysis state: technicals at the last bar, the options snapshot of
/// `chain` at that bar's close, and optional fundamentals.
pub fn live_market_state(
    candles: &[Candle],
    chain: OptionChain,
    dte: Option<i64>,
    fundamentals: Option<&Fundamentals>,
) -> Option<MarketState> {
    let mut state = IndicatorSeries::compute(candles).latest_market_state()?;
    let chain = chain.normalized();
    if let Some(spot) = state.price {
        OptionsSnapshot::from_chain(&chain, spot, dte).apply_to(&mut state);
    }
    state.chain = chain;
    if let Some(fundamentals) = fundamentals {
        fundamentals.apply_to(&mut state);
    }
    Some(state)
}

fn mask_warmup(values: &mut [f64], first_valid: usize) {
    for value in values.iter_mut().take(first_valid) {
        *value = f64::NAN;
    }
}

fn value_at(values: &[f64], t: usize) -> Option<f64> {
    values.get(t).copied().filter(|v| v.is_finite())
}
