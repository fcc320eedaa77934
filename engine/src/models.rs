use crate::strategy::StrategyKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_CONTRACT_MULTIPLIER: u32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    #[serde(default)]
    pub ticker: String,
    pub date: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(alias = "volume")]
    pub volume_shares: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionRight {
    Call,
    Put,
}

impl fmt::Display for OptionRight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionRight::Call => write!(f, "call"),
            OptionRight::Put => write!(f, "put"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LegAction {
    Buy,
    Sell,
}

impl LegAction {
    /// +1 for long exposure, -1 for short exposure.
    pub fn sign(self) -> f64 {
        match self {
            LegAction::Buy => 1.0,
            LegAction::Sell => -1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionLeg {
    pub action: LegAction,
    pub right: OptionRight,
    pub strike: f64,
    /// Per-share premium.
    pub premium: f64,
    pub multiplier: u32,
}

impl OptionLeg {
    pub fn new(action: LegAction, right: OptionRight, strike: f64, premium: f64) -> Self {
        Self {
            action,
            right,
            strike,
            premium,
            multiplier: DEFAULT_CONTRACT_MULTIPLIER,
        }
    }

    pub fn with_multiplier(mut self, multiplier: u32) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Premium paid (positive) or received (negative) per share.
    pub fn signed_premium(&self) -> f64 {
        self.action.sign() * self.premium
    }
}

/// One row of an option chain for a single expiry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainRow {
    pub strike: f64,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    #[serde(alias = "lastPrice")]
    pub last_price: Option<f64>,
    #[serde(alias = "impliedVolatility")]
    pub implied_volatility: Option<f64>,
    #[serde(alias = "openInterest")]
    pub open_interest: Option<f64>,
    pub volume: Option<f64>,
}

impl ChainRow {
    /// Mid price when both sides are quoted, otherwise the last trade.
    pub fn premium(&self) -> Option<f64> {
        if let (Some(bid), Some(ask)) = (self.bid, self.ask) {
            if bid > 0.0 && ask > 0.0 && bid.is_finite() && ask.is_finite() {
                return Some((bid + ask) / 2.0);
            }
        }
        self.last_price
            .filter(|price| price.is_finite() && *price > 0.0)
    }
}

/// Calls and puts for one expiry, each ascending by strike with unique strikes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionChain {
    pub calls: Vec<ChainRow>,
    pub puts: Vec<ChainRow>,
}

impl OptionChain {
    pub fn new(calls: Vec<ChainRow>, puts: Vec<ChainRow>) -> Self {
        Self {
            calls: normalize_rows(calls),
            puts: normalize_rows(puts),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty() && self.puts.is_empty()
    }

    pub fn side(&self, right: OptionRight) -> &[ChainRow] {
        match right {
            OptionRight::Call => &self.calls,
            OptionRight::Put => &self.puts,
        }
    }

    /// Sorts both sides and drops duplicate or non-finite strikes.
    pub fn normalized(self) -> Self {
        Self::new(self.calls, self.puts)
    }
}

fn normalize_rows(mut rows: Vec<ChainRow>) -> Vec<ChainRow> {
    rows.retain(|row| row.strike.is_finite() && row.strike > 0.0);
    rows.sort_by(|a, b| a.strike.total_cmp(&b.strike));
    let before = rows.len();
    rows.dedup_by(|later, earlier| later.strike == earlier.strike);
    if rows.len() != before {
        log::warn!(
            "Dropped {} duplicate strike row(s) from option chain",
            before - rows.len()
        );
    }
    rows
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnusualActivity {
    pub right: OptionRight,
    pub strike: f64,
    pub volume: f64,
    pub open_interest: f64,
    pub ratio: f64,
}

/// Point-in-time inputs for one ticker. Every indicator is optional; conditions
/// that need an absent field evaluate to false.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketState {
    pub ticker: String,
    #[serde(alias = "latest_price", alias = "stock_price")]
    pub price: Option<f64>,

    // Technicals
    #[serde(alias = "RSI")]
    pub rsi: Option<f64>,
    #[serde(alias = "EMA_9")]
    pub ema_9: Option<f64>,
    #[serde(alias = "EMA_20")]
    pub ema_20: Option<f64>,
    #[serde(alias = "SMA_50")]
    pub sma_50: Option<f64>,
    #[serde(alias = "SMA_200")]
    pub sma_200: Option<f64>,
    #[serde(alias = "MACD_histogram")]
    pub macd_histogram: Option<f64>,
    #[serde(alias = "BB_width")]
    pub bb_width: Option<f64>,
    #[serde(alias = "BB_upper")]
    pub bb_upper: Option<f64>,
    #[serde(alias = "BB_lower")]
    pub bb_lower: Option<f64>,
    #[serde(alias = "VWAP")]
    pub vwap: Option<f64>,
    pub volume_ratio: Option<f64>,
    #[serde(alias = "support_20d")]
    pub support: Option<f64>,
    #[serde(alias = "resistance_20d")]
    pub resistance: Option<f64>,
    pub high_52w: Option<f64>,
    pub low_52w: Option<f64>,
    #[serde(alias = "HVol")]
    pub historical_volatility: Option<f64>,

    // Fundamentals
    pub sector: Option<String>,
    pub days_to_earnings: Option<i64>,
    pub short_interest: Option<f64>,
    pub recommendation: Option<String>,

    // Options snapshot
    pub atm_iv: Option<f64>,
    #[serde(alias = "skew")]
    pub iv_skew: Option<f64>,
    #[serde(alias = "pc_ratio_volume")]
    pub put_call_ratio: Option<f64>,
    pub max_pain: Option<f64>,
    pub unusual_activity: Option<Vec<UnusualActivity>>,
    pub dte: Option<i64>,

    #[serde(flatten)]
    pub chain: OptionChain,
}

/// Fundamentals supplied by an external collaborator and merged into a state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Fundamentals {
    pub sector: Option<String>,
    pub days_to_earnings: Option<i64>,
    pub short_interest: Option<f64>,
    pub recommendation: Option<String>,
}

impl Fundamentals {
    pub fn apply_to(&self, state: &mut MarketState) {
        state.sector = self.sector.clone();
        state.days_to_earnings = self.days_to_earnings;
        state.short_interest = self.short_interest;
        state.recommendation = self.recommendation.clone();
    }
}

/// Either a finite dollar amount or an open-ended exposure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bound {
    Finite(f64),
    Unbounded,
}

impl Bound {
    pub fn finite(self) -> Option<f64> {
        match self {
            Bound::Finite(value) => Some(value),
            Bound::Unbounded => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskReward {
    Ratio(f64),
    Undefined,
}

impl RiskReward {
    pub fn from_bounds(max_profit: Bound, max_loss: Bound) -> Self {
        match (max_profit, max_loss) {
            (Bound::Finite(profit), Bound::Finite(loss)) if loss > 0.0 => {
                RiskReward::Ratio(profit / loss)
            }
            _ => RiskReward::Undefined,
        }
    }
}

/// Expiry risk of a leg set, in per-share premium units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskProfile {
    pub max_profit: Bound,
    pub max_loss: Bound,
    pub breakevens: Vec<f64>,
    pub risk_reward: RiskReward,
    /// Positive for a net credit, negative for a net debit.
    pub net_premium: f64,
    pub multiplier: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub move_needed_pct: Option<f64>,
}

impl RiskProfile {
    pub fn max_profit_per_contract(&self) -> Bound {
        scale_bound(self.max_profit, self.multiplier)
    }

    pub fn max_loss_per_contract(&self) -> Bound {
        scale_bound(self.max_loss, self.multiplier)
    }
}

fn scale_bound(bound: Bound, multiplier: u32) -> Bound {
    match bound {
        Bound::Finite(value) => Bound::Finite(value * multiplier as f64),
        Bound::Unbounded => Bound::Unbounded,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationStatus {
    Recommended,
    Monitor,
    Avoid,
}

impl RecommendationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationStatus::Recommended => "recommended",
            RecommendationStatus::Monitor => "monitor",
            RecommendationStatus::Avoid => "avoid",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub strategy: StrategyKind,
    pub description: &'static str,
    pub market_view: &'static str,
    pub score: f64,
    pub conditions_met: usize,
    pub conditions_total: usize,
    pub conditions_summary: String,
    pub met_labels: Vec<&'static str>,
    pub status: RecommendationStatus,
    pub legs: Vec<OptionLeg>,
    pub risk_profile: Option<RiskProfile>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BacktestSubject {
    Strategy(StrategyKind),
    EntryExitSignals,
}

impl fmt::Display for BacktestSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BacktestSubject::Strategy(kind) => write!(f, "{}", kind.as_str()),
            BacktestSubject::EntryExitSignals => write!(f, "ENTRY_EXIT_SIGNALS"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    Expiry,
    ExitSignal,
    MaxHold,
    Open,
}

/// An option leg priced when the position opened and when it closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedLeg {
    pub action: LegAction,
    pub right: OptionRight,
    pub strike: f64,
    pub multiplier: u32,
    pub entry_premium: f64,
    pub exit_premium: f64,
}

impl PricedLeg {
    pub fn pnl(&self) -> f64 {
        self.action.sign() * (self.exit_premium - self.entry_premium) * self.multiplier as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedTrade {
    pub subject: BacktestSubject,
    pub entry_date: DateTime<Utc>,
    pub entry_price: f64,
    pub exit_date: DateTime<Utc>,
    pub exit_price: f64,
    pub legs: Vec<PricedLeg>,
    /// P&L of shares held with the legs. For signal trades the shares are
    /// the whole position.
    #[serde(default)]
    pub stock_pnl: f64,
    /// Capital at risk used as the denominator of `return_ratio`.
    pub entry_cost: f64,
    /// Realized P&L, or mark-to-market P&L when `exit_reason` is `Open`.
    pub pnl: f64,
    pub return_ratio: f64,
    pub holding_days: i64,
    pub exit_reason: ExitReason,
}

impl SimulatedTrade {
    pub fn is_open(&self) -> bool {
        self.exit_reason == ExitReason::Open
    }
}

/// Profit factor sentinel: no trades is undefined, no losing trades is infinite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfitFactor {
    Ratio(f64),
    Infinite,
    Undefined,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeStatistics {
    pub completed_trades: usize,
    pub open_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: f64,
    pub average_return: f64,
    pub total_pnl: f64,
    pub max_drawdown: f64,
    pub profit_factor: ProfitFactor,
    pub avg_holding_days: f64,
    pub signal_exits: usize,
    pub expiry_exits: usize,
    pub max_hold_exits: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BacktestStatus {
    Completed,
    InsufficientData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub ticker: String,
    pub subject: BacktestSubject,
    pub status: BacktestStatus,
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
    pub total_signals: usize,
    pub trades: Vec<SimulatedTrade>,
    pub statistics: TradeStatistics,
    pub note: String,
}
