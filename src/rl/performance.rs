//! Trade performance tracker
//!
//! Keeps the chronological trade history and equity curve and derives
//! win rate, average profit, Sharpe-like ratio, and max drawdown.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Nominal starting balance of the equity curve (account currency)
pub const INITIAL_BALANCE: f64 = 10_000.0;

/// Trading periods per year used to annualize the Sharpe-like ratio
pub const ANNUALIZATION_PERIODS: f64 = 252.0;

/// A single closed trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub profit: f64,
    pub timestamp: DateTime<Utc>,
}

/// Point-in-time performance metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub total_trades: u64,
    pub winning_trades: u64,
    pub losing_trades: u64,
    pub total_profit: f64,
    /// Fraction of trades with profit > 0
    pub win_rate: f64,
    pub avg_profit: f64,
    /// Annualized mean/stddev of per-trade returns
    pub sharpe_ratio: f64,
    /// Largest peak-to-trough equity decline as a fraction of the peak
    pub max_drawdown: f64,
    pub current_equity: f64,
    pub peak_equity: f64,
    pub last_trade_at: Option<DateTime<Utc>>,
}

impl Default for PerformanceSnapshot {
    fn default() -> Self {
        Self {
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            total_profit: 0.0,
            win_rate: 0.0,
            avg_profit: 0.0,
            sharpe_ratio: 0.0,
            max_drawdown: 0.0,
            current_equity: INITIAL_BALANCE,
            peak_equity: INITIAL_BALANCE,
            last_trade_at: None,
        }
    }
}

/// Tracks trade outcomes and derived metrics
#[derive(Debug, Clone)]
pub struct PerformanceTracker {
    trades: Vec<TradeRecord>,
    /// Cumulative balance, starting at [`INITIAL_BALANCE`]
    equity_curve: Vec<f64>,
    metrics: PerformanceSnapshot,
}

impl PerformanceTracker {
    pub fn new() -> Self {
        Self {
            trades: Vec::new(),
            equity_curve: vec![INITIAL_BALANCE],
            metrics: PerformanceSnapshot::default(),
        }
    }

    /// Rebuild a tracker from a persisted trade history
    pub fn from_history(trades: Vec<TradeRecord>) -> Self {
        let mut equity_curve = Vec::with_capacity(trades.len() + 1);
        equity_curve.push(INITIAL_BALANCE);
        let mut balance = INITIAL_BALANCE;
        for trade in &trades {
            balance += trade.profit;
            equity_curve.push(balance);
        }

        let mut tracker = Self {
            trades,
            equity_curve,
            metrics: PerformanceSnapshot::default(),
        };
        tracker.metrics = tracker.compute();
        tracker
    }

    /// Record a trade closed now
    pub fn record(&mut self, profit: f64) -> &PerformanceSnapshot {
        self.record_at(profit, Utc::now())
    }

    /// Record a trade closed at `timestamp`
    pub fn record_at(&mut self, profit: f64, timestamp: DateTime<Utc>) -> &PerformanceSnapshot {
        let balance = self.current_equity() + profit;
        self.trades.push(TradeRecord { profit, timestamp });
        self.equity_curve.push(balance);
        self.metrics = self.compute();
        &self.metrics
    }

    /// Snapshot of the current metrics
    pub fn metrics(&self) -> PerformanceSnapshot {
        self.metrics.clone()
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    pub fn equity_curve(&self) -> &[f64] {
        &self.equity_curve
    }

    pub fn current_equity(&self) -> f64 {
        self.equity_curve.last().copied().unwrap_or(INITIAL_BALANCE)
    }

    fn compute(&self) -> PerformanceSnapshot {
        let total_trades = self.trades.len() as u64;
        let winning_trades = self.trades.iter().filter(|t| t.profit > 0.0).count() as u64;
        let losing_trades = self.trades.iter().filter(|t| t.profit < 0.0).count() as u64;
        let total_profit: f64 = self.trades.iter().map(|t| t.profit).sum();

        let (win_rate, avg_profit) = if total_trades == 0 {
            (0.0, 0.0)
        } else {
            (
                winning_trades as f64 / total_trades as f64,
                total_profit / total_trades as f64,
            )
        };

        PerformanceSnapshot {
            total_trades,
            winning_trades,
            losing_trades,
            total_profit,
            win_rate,
            avg_profit,
            sharpe_ratio: sharpe_ratio(&self.trades),
            max_drawdown: max_drawdown(&self.equity_curve),
            current_equity: self.current_equity(),
            peak_equity: self
                .equity_curve
                .iter()
                .copied()
                .fold(f64::NEG_INFINITY, f64::max),
            last_trade_at: self.trades.last().map(|t| t.timestamp),
        }
    }
}

impl Default for PerformanceTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Sharpe-like ratio of per-trade returns normalized by the nominal balance.
///
/// Uses the population standard deviation; zero when fewer than two trades
/// or when every return is identical.
fn sharpe_ratio(trades: &[TradeRecord]) -> f64 {
    if trades.len() < 2 {
        return 0.0;
    }

    let returns: Vec<f64> = trades.iter().map(|t| t.profit / INITIAL_BALANCE).collect();
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    if std_dev > 0.0 {
        (mean / std_dev) * ANNUALIZATION_PERIODS.sqrt()
    } else {
        0.0
    }
}

/// Max over the curve of `(peak_so_far - current) / peak_so_far`.
fn max_drawdown(equity_curve: &[f64]) -> f64 {
    if equity_curve.len() < 2 {
        return 0.0;
    }

    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0f64;
    for &equity in equity_curve {
        if equity > peak {
            peak = equity;
        }
        // Only meaningful while the peak is positive
        if peak > 0.0 {
            let dd = (peak - equity) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}
