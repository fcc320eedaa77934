use crate::backtester::WalkForwardSimulator;
use crate::candle_utils::group_candles_by_ticker;
use crate::commands::{progress_bar, read_json, write_json};
use crate::config::{EngineSettings, WalkForwardConfig};
use crate::models::{BacktestResult, Candle};
use crate::strategy::StrategyKind;
use anyhow::Result;
use log::info;
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::Path;

/// Walk-forward simulation of `strategies` on every ticker in the candle file.
pub fn run(
    settings: &EngineSettings,
    candles_path: &Path,
    tickers: Option<&[String]>,
    strategies: &[StrategyKind],
    parameters: &HashMap<String, f64>,
    output: Option<&Path>,
) -> Result<()> {
    let candles: Vec<Candle> = read_json(candles_path)?;
    let grouped = group_candles_by_ticker(&candles, tickers, "UNKNOWN");
    let config = WalkForwardConfig::from_parameters(parameters, settings);
    info!(
        "Walk-forward backtest of {} strateg(ies) on {} ticker(s), target DTE {}, lookback {}",
        strategies.len(),
        grouped.len(),
        config.target_dte,
        config.lookback_days
    );

    let simulator = WalkForwardSimulator::new(config);
    let jobs: Vec<(&String, &Vec<Candle>, StrategyKind)> = grouped
        .iter()
        .flat_map(|(ticker, series)| strategies.iter().map(move |kind| (ticker, series, *kind)))
        .collect();

    let pb = progress_bar(jobs.len())?;
    let results: Vec<BacktestResult> = jobs
        .par_iter()
        .map(|(ticker, series, kind)| {
            let result = simulator.run(ticker, series, *kind);
            pb.inc(1);
            result
        })
        .collect();
    pb.finish_and_clear();

    info!("Completed {} backtest(s)", results.len());
    write_json(&results, output)
}
