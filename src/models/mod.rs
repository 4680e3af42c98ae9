use serde::{Deserialize, Serialize};
use std::fmt;

pub mod target;
pub mod target_state;

// Re-exports for convenience
pub use target::*;
pub use target_state::*;

/// Classified stock state of a target page.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StockState {
    #[default]
    Unknown,
    InStock,
    OutOfStock,
}

impl StockState {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockState::Unknown => "unknown",
            StockState::InStock => "in_stock",
            StockState::OutOfStock => "out_of_stock",
        }
    }

    /// Human readable label used in email subjects.
    pub fn label(&self) -> &'static str {
        match self {
            StockState::Unknown => "UNKNOWN",
            StockState::InStock => "IN STOCK",
            StockState::OutOfStock => "OUT OF STOCK",
        }
    }

    /// `Unknown` never equals anything, itself included, so the first
    /// successful check always counts as a transition.
    pub fn is_transition_to(&self, new_state: StockState) -> bool {
        *self == StockState::Unknown || *self != new_state
    }
}

impl fmt::Display for StockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
