use crate::candle_utils::group_candles_by_ticker;
use crate::commands::{read_json, write_json};
use crate::models::Candle;
use crate::signals::{evaluate_entry_exit, EntryExitEvaluation};
use anyhow::Result;
use log::{info, warn};
use std::path::Path;

/// Latest entry/exit evaluation for every ticker in the candle file.
pub fn run(candles_path: &Path, tickers: Option<&[String]>, output: Option<&Path>) -> Result<()> {
    let candles: Vec<Candle> = read_json(candles_path)?;
    let grouped = group_candles_by_ticker(&candles, tickers, "UNKNOWN");

    let mut evaluations: Vec<EntryExitEvaluation> = Vec::with_capacity(grouped.len());
    for (ticker, series) in &grouped {
        match evaluate_entry_exit(series) {
            Some(evaluation) => evaluations.push(evaluation),
            None => warn!("{}: not enough history for entry/exit signals", ticker),
        }
    }

    let entries = evaluations.iter().filter(|e| e.entry_signal).count();
    let exits = evaluations.iter().filter(|e| e.exit_signal).count();
    info!(
        "Evaluated {} ticker(s): {} entry signal(s), {} exit signal(s)",
        evaluations.len(),
        entries,
        exits
    );
    write_json(&evaluations, output)
}
