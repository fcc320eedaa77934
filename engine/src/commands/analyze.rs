use crate::candle_utils::{group_candles_by_ticker, normalize_ticker_symbol};
use crate::chain_analytics::{select_expiry, ExpiryChain};
use crate::commands::{read_json, write_json};
use crate::config::{EngineSettings, LegSelectionConfig};
use crate::models::{Candle, Fundamentals, MarketState, OptionChain, Recommendation};
use crate::ranker;
use crate::snapshot::live_market_state;
use anyhow::{anyhow, Result};
use chrono::{NaiveDate, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// A chain file holds either a single expiry or every listed expiry.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChainFile {
    Expiries(Vec<ExpiryChain>),
    Single(OptionChain),
}

#[derive(Debug, Serialize)]
struct AnalysisReport {
    ticker: String,
    expiry: Option<NaiveDate>,
    dte: Option<i64>,
    state: MarketState,
    recommendations: Vec<Recommendation>,
}

pub struct AnalyzeArgs<'a> {
    pub candles: &'a Path,
    pub chain: &'a Path,
    pub fundamentals: Option<&'a Path>,
    pub ticker: Option<&'a str>,
    pub as_of: Option<NaiveDate>,
}

pub fn run(
    settings: &EngineSettings,
    args: AnalyzeArgs<'_>,
    parameters: &HashMap<String, f64>,
    output: Option<&Path>,
) -> Result<()> {
    let candles: Vec<Candle> = read_json(args.candles)?;
    let fallback = args.ticker.unwrap_or("UNKNOWN");
    let mut grouped = group_candles_by_ticker(&candles, None, fallback);
    let ticker = match args.ticker.and_then(normalize_ticker_symbol) {
        Some(ticker) => ticker,
        None if grouped.len() == 1 => grouped.keys().next().cloned().unwrap_or_default(),
        None => {
            return Err(anyhow!(
                "{} holds {} tickers; pass --ticker to choose one",
                args.candles.display(),
                grouped.len()
            ))
        }
    };
    let series = grouped
        .remove(&ticker)
        .ok_or_else(|| anyhow!("No usable candles for {}", ticker))?;

    let today = args
        .as_of
        .or_else(|| series.last().map(|c| c.date.date_naive()))
        .unwrap_or_else(|| Utc::now().date_naive());
    let (chain, expiry, dte) = match read_json::<ChainFile>(args.chain)? {
        ChainFile::Single(chain) => (chain, None, None),
        ChainFile::Expiries(mut expiries) => {
            let dates: Vec<NaiveDate> = expiries.iter().map(|e| e.expiry).collect();
            let (expiry, dte) = select_expiry(&dates, today)
                .ok_or_else(|| anyhow!("{} lists no expiries", args.chain.display()))?;
            let position = dates.iter().position(|date| *date == expiry).unwrap_or(0);
            (expiries.swap_remove(position).chain, Some(expiry), Some(dte))
        }
    };
    let fundamentals = match args.fundamentals {
        Some(path) => Some(read_json::<Fundamentals>(path)?),
        None => None,
    };

    let state = live_market_state(&series, chain, dte, fundamentals.as_ref())
        .ok_or_else(|| anyhow!("No usable candles for {}", ticker))?;
    info!(
        "{}: analyzing {} bars, expiry {}",
        ticker,
        series.len(),
        expiry.map_or_else(|| "n/a".to_string(), |e| e.to_string())
    );

    let config = LegSelectionConfig::from_parameters(parameters, settings);
    let recommendations = ranker::recommend(&state, &config);
    write_json(
        &AnalysisReport {
            ticker,
            expiry,
            dte,
            state,
            recommendations,
        },
        output,
    )
}
