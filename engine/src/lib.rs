pub mod backtester;
pub mod candle_utils;
pub mod chain_analytics;
pub mod commands;
pub mod conditions;
pub mod config;
pub mod error;
pub mod indicators;
pub mod legs;
pub mod models;
pub mod param_utils;
pub mod performance;
pub mod pricing;
pub mod ranker;
pub mod risk;
pub mod signal_backtester;
pub mod signals;
pub mod snapshot;
pub mod strategy;
pub mod strategy_utils;
