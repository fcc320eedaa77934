//! Causal technical indicators over daily price arrays.
//!
//! Every series is aligned with its input: element `i` only depends on
//! inputs `0..=i`, and entries whose lookback window is not yet full are NaN.

use statrs::statistics::Statistics;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

pub fn calculate_sma(prices: &[f64], period: usize) -> Vec<f64> {
    let mut sma_values = vec![f64::NAN; prices.len()];
    if period == 0 || prices.len() < period {
        return sma_values;
    }

    let mut window_sum: f64 = prices[..period].iter().sum();
    sma_values[period - 1] = window_sum / period as f64;
    for i in period..prices.len() {
        window_sum += prices[i] - prices[i - period];
        sma_values[i] = window_sum / period as f64;
    }

    sma_values
}

/// Exponential moving average seeded with the first price.
pub fn calculate_ema(prices: &[f64], period: usize) -> Vec<f64> {
    if prices.is_empty() {
        return Vec::new();
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut ema_values = Vec::with_capacity(prices.len());
    ema_values.push(prices[0]);

    for i in 1..prices.len() {
        let ema = (prices[i] * multiplier) + (ema_values[i - 1] * (1.0 - multiplier));
        ema_values.push(ema);
    }

    ema_values
}

pub fn calculate_macd(
    prices: &[f64],
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let fast_ema = calculate_ema(prices, fast_period);
    let slow_ema = calculate_ema(prices, slow_period);

    let macd_line: Vec<f64> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(fast, slow)| fast - slow)
        .collect();
    let signal_line = calculate_ema(&macd_line, signal_period);
    let histogram = macd_line
        .iter()
        .zip(&signal_line)
        .map(|(macd, signal)| macd - signal)
        .collect();

    (macd_line, signal_line, histogram)
}

/// RSI from mean gain and mean loss over one window. Undefined when the
/// window saw no movement at all.
fn rsi_from_means(mean_gain: f64, mean_loss: f64) -> f64 {
    if mean_loss == 0.0 {
        if mean_gain > 0.0 {
            100.0
        } else {
            f64::NAN
        }
    } else {
        let rs = mean_gain / mean_loss;
        100.0 - 100.0 / (1.0 + rs)
    }
}

/// RSI over a simple rolling mean of the last `period` gains and losses.
/// The first value is available at index `period`.
pub fn calculate_rsi(prices: &[f64], period: usize) -> Vec<f64> {
    let mut rsi_values = vec![f64::NAN; prices.len()];
    if period == 0 || prices.len() < period + 1 {
        return rsi_values;
    }

    for i in period..prices.len() {
        let mut sum_gain = 0.0f64;
        let mut sum_loss = 0.0f64;
        for k in (i + 1 - period)..=i {
            let delta = prices[k] - prices[k - 1];
            if delta > 0.0 {
                sum_gain += delta;
            } else if delta < 0.0 {
                sum_loss += -delta;
            }
        }
        rsi_values[i] = rsi_from_means(sum_gain / period as f64, sum_loss / period as f64);
    }

    rsi_values
}

#[derive(Clone, Debug)]
pub struct BollingerOutput {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
    /// (upper - lower) / middle
    pub width: Vec<f64>,
}

pub fn calculate_bollinger_bands(prices: &[f64], period: usize, std_dev: f64) -> BollingerOutput {
    let middle = calculate_sma(prices, period);
    let mut upper = vec![f64::NAN; prices.len()];
    let mut lower = vec![f64::NAN; prices.len()];
    let mut width = vec![f64::NAN; prices.len()];

    if period > 0 && prices.len() >= period {
        for i in (period - 1)..prices.len() {
            let slice = &prices[i + 1 - period..=i];
            let mean = middle[i];
            let variance =
                slice.iter().map(|&val| (val - mean).powi(2)).sum::<f64>() / period as f64;
            let band = std_dev * variance.sqrt();

            upper[i] = mean + band;
            lower[i] = mean - band;
            if mean != 0.0 {
                width[i] = (upper[i] - lower[i]) / mean;
            }
        }
    }

    BollingerOutput {
        upper,
        middle,
        lower,
        width,
    }
}

/// Volume-weighted typical price over the trailing `window` bars.
pub fn calculate_rolling_vwap(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    volumes: &[f64],
    window: usize,
) -> Vec<f64> {
    let mut vwap_values = vec![f64::NAN; closes.len()];
    if window == 0 || closes.len() < window {
        return vwap_values;
    }

    let pv: Vec<f64> = (0..closes.len())
        .map(|i| (highs[i] + lows[i] + closes[i]) / 3.0 * volumes[i])
        .collect();

    let mut window_pv: f64 = pv[..window].iter().sum();
    let mut window_volume: f64 = volumes[..window].iter().sum();
    for i in (window - 1)..closes.len() {
        if i >= window {
            window_pv += pv[i] - pv[i - window];
            window_volume += volumes[i] - volumes[i - window];
        }
        if window_volume > 0.0 {
            vwap_values[i] = window_pv / window_volume;
        }
    }

    vwap_values
}

/// Average true range as a simple mean of the trailing `period` true ranges.
pub fn calculate_atr(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Vec<f64> {
    let mut atr_values = vec![f64::NAN; closes.len()];
    if period == 0 || closes.len() < period + 1 {
        return atr_values;
    }

    let mut tr_values = vec![0.0; closes.len()];
    for i in 1..closes.len() {
        tr_values[i] = (highs[i] - lows[i])
            .max((highs[i] - closes[i - 1]).abs())
            .max((lows[i] - closes[i - 1]).abs());
    }

    for i in period..closes.len() {
        let window = &tr_values[i + 1 - period..=i];
        atr_values[i] = window.iter().sum::<f64>() / period as f64;
    }

    atr_values
}

pub fn rolling_min(values: &[f64], window: usize) -> Vec<f64> {
    rolling_extreme(values, window, f64::min)
}

pub fn rolling_max(values: &[f64], window: usize) -> Vec<f64> {
    rolling_extreme(values, window, f64::max)
}

fn rolling_extreme(values: &[f64], window: usize, pick: fn(f64, f64) -> f64) -> Vec<f64> {
    let mut output = vec![f64::NAN; values.len()];
    if window == 0 {
        return output;
    }
    for i in window.saturating_sub(1)..values.len() {
        output[i] = values[i + 1 - window..=i]
            .iter()
            .copied()
            .fold(values[i], pick);
    }
    output
}

/// Annualized sample standard deviation of the trailing `window` daily log
/// returns. The first value is available at index `window`.
pub fn calculate_realized_volatility(closes: &[f64], window: usize) -> Vec<f64> {
    let mut vol_values = vec![f64::NAN; closes.len()];
    if window < 2 || closes.len() < window + 1 {
        return vol_values;
    }

    let log_returns: Vec<f64> = closes
        .windows(2)
        .map(|pair| {
            if pair[0] > 0.0 && pair[1] > 0.0 {
                (pair[1] / pair[0]).ln()
            } else {
                f64::NAN
            }
        })
        .collect();

    // log_returns[i - 1] is the return into bar i.
    for i in window..closes.len() {
        let daily_std_dev = log_returns[i - window..i].iter().std_dev();
        vol_values[i] = daily_std_dev * TRADING_DAYS_PER_YEAR.sqrt();
    }

    vol_values
}

/// Volume divided by the trailing `window`-bar mean volume.
pub fn calculate_volume_ratio(volumes: &[f64], window: usize) -> Vec<f64> {
    let average = calculate_sma(volumes, window);
    volumes
        .iter()
        .zip(&average)
        .map(|(volume, mean)| if *mean > 0.0 { volume / mean } else { f64::NAN })
        .collect()
}
