use crate::commands::{read_json, write_json};
use crate::config::{EngineSettings, LegSelectionConfig};
use crate::models::{MarketState, Recommendation};
use crate::ranker;
use anyhow::Result;
use log::{info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
pub struct TickerRecommendations {
    pub ticker: String,
    pub source: String,
    pub recommendations: Vec<Recommendation>,
}

/// Ranks the catalog for every MarketState file. Unreadable files are
/// skipped with a warning.
pub fn run(
    settings: &EngineSettings,
    state_files: &[PathBuf],
    parameters: &HashMap<String, f64>,
    output: Option<&Path>,
) -> Result<()> {
    let config = LegSelectionConfig::from_parameters(parameters, settings);
    info!("Ranking strategies for {} market state file(s)", state_files.len());

    let results: Vec<TickerRecommendations> = state_files
        .par_iter()
        .filter_map(|path| match read_json::<MarketState>(path) {
            Ok(state) => Some(TickerRecommendations {
                ticker: state.ticker.clone(),
                source: path.display().to_string(),
                recommendations: ranker::recommend(&state, &config),
            }),
            Err(err) => {
                warn!("Skipping {}: {:#}", path.display(), err);
                None
            }
        })
        .collect();

    info!("Ranked {} of {} input(s)", results.len(), state_files.len());
    write_json(&results, output)
}
