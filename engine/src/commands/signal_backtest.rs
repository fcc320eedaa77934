use crate::candle_utils::group_candles_by_ticker;
use crate::commands::{progress_bar, read_json, write_json};
use crate::config::{EngineSettings, SignalBacktestConfig};
use crate::models::{BacktestResult, Candle};
use crate::signal_backtester::SignalBacktester;
use anyhow::Result;
use log::info;
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::Path;

pub fn run(
    settings: &EngineSettings,
    candles_path: &Path,
    tickers: Option<&[String]>,
    parameters: &HashMap<String, f64>,
    output: Option<&Path>,
) -> Result<()> {
    let candles: Vec<Candle> = read_json(candles_path)?;
    let grouped = group_candles_by_ticker(&candles, tickers, "UNKNOWN");
    let config = SignalBacktestConfig::from_parameters(parameters, settings);
    info!(
        "Signal backtest on {} ticker(s), max hold {}",
        grouped.len(),
        config
            .max_hold_days
            .map_or_else(|| "none".to_string(), |days| format!("{} bars", days))
    );

    let backtester = SignalBacktester::new(config);
    let pb = progress_bar(grouped.len())?;
    let results: Vec<BacktestResult> = grouped
        .par_iter()
        .map(|(ticker, series)| {
            let result = backtester.run(ticker, series);
            pb.inc(1);
            result
        })
        .collect();
    pb.finish_and_clear();

    write_json(&results, output)
}
