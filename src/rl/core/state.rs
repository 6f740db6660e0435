//! State Representation
//!
//! Market/portfolio feature vectors and the closed-trade record that the
//! trade-outcome source hands to the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::action::TradeAction;
use crate::error::{LearnError, Result};

/// Check that `state` has exactly `expected` finite features.
pub fn validate_state(state: &[f64], expected: usize, context: &str) -> Result<()> {
    if state.len() != expected {
        return Err(LearnError::shape(context, expected, state.len()));
    }
    if let Some(idx) = state.iter().position(|v| !v.is_finite()) {
        return Err(LearnError::Validation(format!(
            "{context} feature[{idx}] is not finite"
        )));
    }
    Ok(())
}

/// A closed trade as reported by the trade-outcome source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeOutcome {
    /// Features observed when the trade was opened
    pub state_before: Vec<f64>,
    /// Action the policy took
    pub action: TradeAction,
    /// Realized profit in account currency (signed)
    pub profit: f64,
    /// Features observed when the trade closed
    pub state_after: Vec<f64>,
    /// Close time
    pub closed_at: DateTime<Utc>,
}

impl TradeOutcome {
    /// Create an outcome closed now
    pub fn new(
        state_before: Vec<f64>,
        action: TradeAction,
        profit: f64,
        state_after: Vec<f64>,
    ) -> Self {
        Self {
            state_before,
            action,
            profit,
            state_after,
            closed_at: Utc::now(),
        }
    }

    /// Override the close timestamp
    pub fn with_closed_at(mut self, closed_at: DateTime<Utc>) -> Self {
        self.closed_at = closed_at;
        self
    }

    /// Validate both state vectors and the profit value
    pub fn validate(&self, state_size: usize) -> Result<()> {
        validate_state(&self.state_before, state_size, "trade state_before")?;
        validate_state(&self.state_after, state_size, "trade state_after")?;
        if !self.profit.is_finite() {
            return Err(LearnError::Validation(format!(
                "trade profit is not finite: {}",
                self.profit
            )));
        }
        Ok(())
    }
}
