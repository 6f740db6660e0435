//! Output formatting for `ploy-learn` commands.
//!
//! Supports two modes: human-readable tables (default) and JSON (--json).

use serde::Serialize;
use tabled::{Table, Tabled};

use crate::rl::adaptive::ControllerState;
use crate::rl::performance::PerformanceSnapshot;

/// Output mode for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Table,
    Json,
}

impl OutputMode {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputMode::Json
        } else {
            OutputMode::Table
        }
    }
}

/// One labelled value in a key/value table
#[derive(Debug, Serialize, Tabled)]
pub struct KvRow {
    pub field: String,
    pub value: String,
}

impl KvRow {
    fn new(field: &str, value: impl ToString) -> Self {
        Self {
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}

/// Print a vec of Tabled + Serialize items in the chosen mode.
pub fn print_items<T: Tabled + Serialize>(items: &[T], mode: OutputMode) -> anyhow::Result<()> {
    match mode {
        OutputMode::Table => {
            if items.is_empty() {
                println!("(no results)");
            } else {
                let table = Table::new(items).to_string();
                println!("{table}");
            }
        }
        OutputMode::Json => {
            let json = serde_json::to_string_pretty(items)?;
            println!("{json}");
        }
    }
    Ok(())
}

/// Print a single Serialize item as pretty JSON.
pub fn print_item<T: Serialize>(item: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(item)?);
    Ok(())
}

/// Table rows for a metrics snapshot
pub fn metric_rows(metrics: &PerformanceSnapshot) -> Vec<KvRow> {
    vec![
        KvRow::new("total_trades", metrics.total_trades),
        KvRow::new("winning_trades", metrics.winning_trades),
        KvRow::new("losing_trades", metrics.losing_trades),
        KvRow::new("win_rate", format!("{:.2}%", metrics.win_rate * 100.0)),
        KvRow::new("total_profit", format!("{:.2}", metrics.total_profit)),
        KvRow::new("avg_profit", format!("{:.4}", metrics.avg_profit)),
        KvRow::new("sharpe_ratio", format!("{:.4}", metrics.sharpe_ratio)),
        KvRow::new("max_drawdown", format!("{:.2}%", metrics.max_drawdown * 100.0)),
        KvRow::new("current_equity", format!("{:.2}", metrics.current_equity)),
        KvRow::new("peak_equity", format!("{:.2}", metrics.peak_equity)),
        KvRow::new(
            "last_trade_at",
            metrics
                .last_trade_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "-".to_string()),
        ),
    ]
}

/// Table rows for the controller state
pub fn controller_rows(state: &ControllerState) -> Vec<KvRow> {
    vec![
        KvRow::new("exploration_rate", format!("{:.4}", state.exploration_rate)),
        KvRow::new("learning_rate", format!("{:.6e}", state.learning_rate)),
        KvRow::new("train_steps", state.train_steps),
    ]
}

/// Print a success message.
pub fn print_success(msg: &str) {
    println!("\x1b[32m{msg}\x1b[0m");
}

/// Print a warning message.
pub fn print_warn(msg: &str) {
    println!("\x1b[33m{msg}\x1b[0m");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_rows_cover_snapshot() {
        let rows = metric_rows(&PerformanceSnapshot::default());
        assert_eq!(rows.len(), 11);
        assert_eq!(rows[0].value, "0");
        assert_eq!(rows[10].value, "-");
    }

    #[test]
    fn test_output_mode_flag() {
        assert_eq!(OutputMode::from_json_flag(true), OutputMode::Json);
        assert_eq!(OutputMode::from_json_flag(false), OutputMode::Table);
    }
}
