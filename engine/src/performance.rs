use crate::models::{ExitReason, ProfitFactor, SimulatedTrade, TradeStatistics};
use statrs::statistics::Statistics;

pub struct PerformanceCalculator;

impl PerformanceCalculator {
    /// Aggregates completed trades in order. Open trades are counted but
    /// contribute to no statistic.
    pub fn summarize(trades: &[SimulatedTrade]) -> TradeStatistics {
        let completed: Vec<&SimulatedTrade> = trades.iter().filter(|t| !t.is_open()).collect();
        let open_trades = trades.len() - completed.len();

        let pnls: Vec<f64> = completed.iter().map(|t| t.pnl).collect();
        let returns: Vec<f64> = completed
            .iter()
            .map(|t| t.return_ratio)
            .filter(|r| r.is_finite())
            .collect();
        let holding_days: Vec<f64> = completed.iter().map(|t| t.holding_days as f64).collect();

        let wins = pnls.iter().filter(|pnl| **pnl > 0.0).count();
        let losses = completed.len() - wins;
        let win_rate = if completed.is_empty() {
            0.0
        } else {
            wins as f64 / completed.len() as f64
        };

        let count_exits =
            |reason: ExitReason| completed.iter().filter(|t| t.exit_reason == reason).count();

        TradeStatistics {
            completed_trades: completed.len(),
            open_trades,
            wins,
            losses,
            win_rate,
            average_return: Self::average(&returns),
            total_pnl: pnls.iter().sum(),
            max_drawdown: Self::calculate_max_drawdown(&pnls),
            profit_factor: Self::calculate_profit_factor(&pnls),
            avg_holding_days: Self::average(&holding_days),
            signal_exits: count_exits(ExitReason::ExitSignal),
            expiry_exits: count_exits(ExitReason::Expiry),
            max_hold_exits: count_exits(ExitReason::MaxHold),
        }
    }

    fn average(values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        values.mean()
    }

    /// Largest peak-to-trough decline of cumulative P&L, starting flat at zero.
    pub fn calculate_max_drawdown(pnls: &[f64]) -> f64 {
        let mut cumulative = 0.0;
        let mut peak = 0.0f64;
        let mut max_drawdown = 0.0f64;

        for pnl in pnls {
            cumulative += pnl;
            peak = peak.max(cumulative);
            max_drawdown = max_drawdown.max(peak - cumulative);
        }

        max_drawdown
    }

    pub fn calculate_profit_factor(pnls: &[f64]) -> ProfitFactor {
        if pnls.is_empty() {
            return ProfitFactor::Undefined;
        }
        let gross_gain: f64 = pnls.iter().filter(|p| **p > 0.0).sum();
        let gross_loss: f64 = pnls.iter().filter(|p| **p < 0.0).map(|p| -p).sum();

        if gross_loss > 0.0 {
            ProfitFactor::Ratio(gross_gain / gross_loss)
        } else if gross_gain > 0.0 {
            ProfitFactor::Infinite
        } else {
            ProfitFactor::Undefined
        }
    }
}
