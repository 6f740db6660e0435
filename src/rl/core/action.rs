//! Action Space
//!
//! Discrete trading actions emitted by the policy.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{LearnError, Result};

/// Number of discrete actions
pub const NUM_ACTIONS: usize = 3;

/// Discrete action space for the Q-network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TradeAction {
    /// Do nothing
    Hold = 0,
    /// Open or add to a long position
    Buy = 1,
    /// Close or reduce a position
    Sell = 2,
}

impl TradeAction {
    /// Convert from action index
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Hold),
            1 => Some(Self::Buy),
            2 => Some(Self::Sell),
            _ => None,
        }
    }

    /// Convert from action index, failing on out-of-range values
    pub fn try_from_index(index: usize) -> Result<Self> {
        Self::from_index(index).ok_or(LearnError::InvalidAction(index))
    }

    /// Convert to action index
    pub fn to_index(self) -> usize {
        self as usize
    }

    /// Get all possible actions
    pub fn all() -> &'static [TradeAction] {
        &[Self::Hold, Self::Buy, Self::Sell]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hold => "HOLD",
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

impl Default for TradeAction {
    fn default() -> Self {
        Self::Hold
    }
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Index of the largest value; ties resolve to the lowest index.
///
/// Returns `None` for an empty slice or when any value is NaN.
pub fn argmax(values: &[f64]) -> Option<usize> {
    if values.iter().any(|v| v.is_nan()) {
        return None;
    }
    let mut best: Option<(usize, f64)> = None;
    for (idx, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((idx, v)),
        }
    }
    best.map(|(idx, _)| idx)
}
