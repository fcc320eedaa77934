use chrono::{Duration, TimeZone, Utc};
use options_engine::backtester::{WalkForwardSimulator, SIMULATION_NOTE};
use options_engine::commands::backtest;
use options_engine::config::{EngineSettings, SignalBacktestConfig, WalkForwardConfig};
use options_engine::models::{BacktestResult, BacktestStatus, Candle, ExitReason};
use options_engine::signal_backtester::SignalBacktester;
use options_engine::strategy::StrategyKind;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::fs;
use std::sync::Once;

fn ensure_test_env() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

fn candles_from(ticker: &str, closes: &[f64], wick_up: f64, wick_down: f64) -> Vec<Candle> {
    let start = Utc.with_ymd_and_hms(2022, 1, 3, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Candle {
            ticker: ticker.to_string(),
            date: start + Duration::days(i as i64),
            open: close,
            high: close + wick_up,
            low: close - wick_down,
            close,
            volume_shares: 1_000_000,
        })
        .collect()
}

/// Seeded geometric random walk with a mild drift.
fn noisy_closes(seed: u64, len: usize) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut price = 100.0;
    (0..len)
        .map(|_| {
            let shock: f64 = rng.gen_range(-0.025..0.025);
            price *= (0.0004 + shock).exp();
            price
        })
        .collect()
}

#[test]
fn walk_forward_is_deterministic() {
    ensure_test_env();
    let candles = candles_from("NOISE", &noisy_closes(7, 320), 0.6, 0.6);
    let simulator = WalkForwardSimulator::new(WalkForwardConfig::default());

    for kind in StrategyKind::ALL {
        let first = serde_json::to_string(&simulator.run("NOISE", &candles, kind)).unwrap();
        let second = serde_json::to_string(&simulator.run("NOISE", &candles, kind)).unwrap();
        assert_eq!(first, second, "{} differs between runs", kind);
    }
}

#[test]
fn walk_forward_statistics_match_trades() {
    let candles = candles_from("NOISE", &noisy_closes(11, 320), 0.6, 0.6);
    let simulator = WalkForwardSimulator::new(WalkForwardConfig::default());

    for kind in StrategyKind::ALL {
        let result = simulator.run("NOISE", &candles, kind);
        assert_eq!(result.status, BacktestStatus::Completed);
        assert_eq!(result.note, SIMULATION_NOTE);

        let completed: Vec<_> = result.trades.iter().filter(|t| !t.is_open()).collect();
        let open = result.trades.len() - completed.len();
        assert!(open <= 1);
        if open == 1 {
            assert!(result.trades.last().unwrap().is_open());
        }
        assert_eq!(result.statistics.completed_trades, completed.len());
        let wins = completed.iter().filter(|t| t.pnl > 0.0).count();
        assert_eq!(result.statistics.wins, wins);
        let total: f64 = completed.iter().map(|t| t.pnl).sum();
        assert!((result.statistics.total_pnl - total).abs() < 1e-6);
        assert!(result.statistics.max_drawdown >= 0.0);
        for trade in &result.trades {
            assert!(trade.holding_days <= 30);
            assert!(trade.legs.iter().all(|leg| leg.exit_premium >= 0.0));
        }
    }
}

#[test]
fn oversold_rebound_produces_one_winning_signal_trade() {
    ensure_test_env();
    // A gap up fades back to the base; once the gap leaves the RSI window
    // EMA9 turns above EMA20 with RSI still under 35 and price under VWAP.
    let closes: Vec<f64> = (0..252)
        .map(|i| match i {
            0..=39 => 100.0,
            40..=48 => 130.0 - 3.75 * (i - 40) as f64,
            49 => 100.5,
            _ => 100.5 + (i - 49) as f64,
        })
        .collect();
    let candles = candles_from("RBND", &closes, 1.0, 0.5);

    let result = SignalBacktester::new(SignalBacktestConfig::default()).run("RBND", &candles);
    assert_eq!(result.status, BacktestStatus::Completed);
    assert_eq!(result.statistics.completed_trades, 1);
    assert_eq!(result.statistics.open_trades, 0);

    let trade = &result.trades[0];
    assert_eq!(trade.entry_date, candles[57].date);
    assert_eq!(trade.exit_date, candles[87].date);
    assert!(trade.return_ratio > 0.0);
    assert_eq!(trade.exit_reason, ExitReason::MaxHold);
    assert_eq!(result.statistics.win_rate, 1.0);
}

#[test]
fn short_series_reports_insufficient_data() {
    let candles = candles_from("TINY", &noisy_closes(3, 20), 0.5, 0.5);
    let walk_forward =
        WalkForwardSimulator::new(WalkForwardConfig::default()).run("TINY", &candles, StrategyKind::CoveredCall);
    let signals = SignalBacktester::new(SignalBacktestConfig::default()).run("TINY", &candles);

    for result in [walk_forward, signals] {
        assert_eq!(result.status, BacktestStatus::InsufficientData);
        assert!(result.trades.is_empty());
        assert_eq!(result.total_signals, 0);
        assert!(result.note.starts_with("Insufficient data"));
    }
}

#[test]
fn backtest_command_covers_every_ticker() {
    ensure_test_env();
    let dir = std::env::temp_dir().join(format!("options-engine-backtest-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();

    let mut candles = candles_from("AAA", &noisy_closes(21, 120), 0.5, 0.5);
    candles.extend(candles_from("BBB", &noisy_closes(22, 120), 0.5, 0.5));
    let candles_path = dir.join("candles.json");
    let output_path = dir.join("results.json");
    fs::write(&candles_path, serde_json::to_string(&candles).unwrap()).unwrap();

    let mut parameters = HashMap::new();
    parameters.insert("targetDte".to_string(), 21.0);
    backtest::run(
        &EngineSettings::default(),
        &candles_path,
        None,
        &[StrategyKind::IronCondor, StrategyKind::LongStraddle],
        &parameters,
        Some(&output_path),
    )
    .unwrap();

    let results: Vec<BacktestResult> =
        serde_json::from_str(&fs::read_to_string(&output_path).unwrap()).unwrap();
    assert_eq!(results.len(), 4);
    let tickers: Vec<&str> = results.iter().map(|r| r.ticker.as_str()).collect();
    assert_eq!(tickers, vec!["AAA", "AAA", "BBB", "BBB"]);
    for result in &results {
        assert_eq!(result.status, BacktestStatus::Completed);
        assert!(result.trades.iter().all(|t| t.holding_days <= 21));
    }

    let _ = fs::remove_dir_all(&dir);
}
