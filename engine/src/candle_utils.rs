use crate::models::Candle;
use log::warn;
use std::collections::{BTreeMap, HashSet};

/// Groups candles into per-ticker daily series, optionally restricted to a
/// known set of tickers. Candles without a ticker are keyed by `fallback`.
/// Each series is sorted by date with unusable bars and repeated dates removed.
pub fn group_candles_by_ticker(
    candles: &[Candle],
    tickers: Option<&[String]>,
    fallback: &str,
) -> BTreeMap<String, Vec<Candle>> {
    let known: Option<HashSet<String>> = tickers.map(|list| {
        list.iter()
            .filter_map(|ticker| normalize_ticker_symbol(ticker))
            .collect()
    });

    let mut grouped: BTreeMap<String, Vec<Candle>> = BTreeMap::new();
    for candle in candles {
        let key = normalize_ticker_symbol(&candle.ticker)
            .or_else(|| normalize_ticker_symbol(fallback))
            .unwrap_or_default();
        if let Some(known) = &known {
            if !known.contains(&key) {
                continue;
            }
        }
        if !is_usable(candle) {
            warn!(
                "Skipping unusable candle for {} on {}",
                key,
                candle.date.date_naive()
            );
            continue;
        }

        let mut owned = candle.clone();
        owned.ticker = key.clone();
        grouped.entry(key).or_default().push(owned);
    }

    for (ticker, series) in grouped.iter_mut() {
        series.sort_by(|a, b| a.date.cmp(&b.date));
        let before = series.len();
        dedup_dates(series);
        if series.len() < before {
            warn!(
                "{}: dropped {} candles with repeated dates",
                ticker,
                before - series.len()
            );
        }
    }

    grouped
}

fn is_usable(candle: &Candle) -> bool {
    [candle.open, candle.high, candle.low, candle.close]
        .iter()
        .all(|value| value.is_finite())
        && candle.close > 0.0
        && candle.volume_shares >= 0
}

/// Keeps the last candle of each calendar date in a date-sorted series.
fn dedup_dates(series: &mut Vec<Candle>) {
    let mut deduped: Vec<Candle> = Vec::with_capacity(series.len());
    for candle in series.drain(..) {
        match deduped.last_mut() {
            Some(last) if last.date.date_naive() == candle.date.date_naive() => *last = candle,
            _ => deduped.push(candle),
        }
    }
    *series = deduped;
}

/// Normalizes a ticker string by trimming whitespace and uppercasing.
pub fn normalize_ticker_symbol(value: &str) -> Option<String> {
    let normalized = value.trim().to_uppercase();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}
