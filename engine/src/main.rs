use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use log::info;
use options_engine::{
    commands::{analyze, backtest, recommend, signal_backtest, signals},
    config::EngineSettings,
    param_utils::parse_param_assignments,
    strategy::StrategyKind,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "options-engine")]
#[command(about = "Options strategy scoring, selection and backtesting")]
struct Cli {
    /// Write JSON output to this file instead of stdout
    #[arg(short, long, global = true, value_name = "PATH")]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank every catalog strategy for prepared MarketState files
    Recommend {
        /// MarketState JSON files, one per ticker
        #[arg(long = "state", value_name = "PATH", required = true, num_args = 1..)]
        states: Vec<PathBuf>,
        /// Parameter overrides as key=value
        #[arg(long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
    },
    /// Build a MarketState from candles and an option chain, then rank
    Analyze {
        /// Daily candles JSON
        #[arg(long, value_name = "PATH")]
        candles: PathBuf,
        /// Option chain JSON (one expiry, or a list of expiries)
        #[arg(long, value_name = "PATH")]
        chain: PathBuf,
        /// Fundamentals JSON
        #[arg(long, value_name = "PATH")]
        fundamentals: Option<PathBuf>,
        /// Ticker to analyze when the candle file holds several
        #[arg(long)]
        ticker: Option<String>,
        /// Date used for expiry selection (defaults to the last candle)
        #[arg(long, value_name = "YYYY-MM-DD")]
        as_of: Option<NaiveDate>,
        #[arg(long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
    },
    /// Walk-forward Black-Scholes backtest of catalog strategies
    Backtest {
        #[arg(long, value_name = "PATH")]
        candles: PathBuf,
        /// Strategy names; every strategy when omitted
        #[arg(long = "strategy", value_delimiter = ',')]
        strategies: Vec<StrategyKind>,
        /// Restrict to these tickers
        #[arg(long, value_delimiter = ',')]
        tickers: Vec<String>,
        #[arg(long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
    },
    /// Backtest the RSI/VWAP/EMA entry and exit signals on the underlying
    SignalBacktest {
        #[arg(long, value_name = "PATH")]
        candles: PathBuf,
        #[arg(long, value_delimiter = ',')]
        tickers: Vec<String>,
        #[arg(long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
    },
    /// Latest entry/exit signal evaluation per ticker
    Signals {
        #[arg(long, value_name = "PATH")]
        candles: PathBuf,
        #[arg(long, value_delimiter = ',')]
        tickers: Vec<String>,
    },
}

fn main() -> Result<()> {
    let Cli { output, command } = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Starting options engine. Not financial advice.");
    let settings = EngineSettings::from_env()?;
    let output = output.as_deref();

    match command {
        Commands::Recommend { states, params } => {
            let parameters = parse_param_assignments(&params)?;
            recommend::run(&settings, &states, &parameters, output)?;
        }
        Commands::Analyze {
            candles,
            chain,
            fundamentals,
            ticker,
            as_of,
            params,
        } => {
            let parameters = parse_param_assignments(&params)?;
            let args = analyze::AnalyzeArgs {
                candles: &candles,
                chain: &chain,
                fundamentals: fundamentals.as_deref(),
                ticker: ticker.as_deref(),
                as_of,
            };
            analyze::run(&settings, args, &parameters, output)?;
        }
        Commands::Backtest {
            candles,
            strategies,
            tickers,
            params,
        } => {
            let parameters = parse_param_assignments(&params)?;
            let strategies = if strategies.is_empty() {
                StrategyKind::ALL.to_vec()
            } else {
                strategies
            };
            backtest::run(
                &settings,
                &candles,
                ticker_filter(&tickers),
                &strategies,
                &parameters,
                output,
            )?;
        }
        Commands::SignalBacktest {
            candles,
            tickers,
            params,
        } => {
            let parameters = parse_param_assignments(&params)?;
            signal_backtest::run(
                &settings,
                &candles,
                ticker_filter(&tickers),
                &parameters,
                output,
            )?;
        }
        Commands::Signals { candles, tickers } => {
            signals::run(&candles, ticker_filter(&tickers), output)?;
        }
    }

    Ok(())
}

fn ticker_filter(tickers: &[String]) -> Option<&[String]> {
    (!tickers.is_empty()).then_some(tickers)
}
