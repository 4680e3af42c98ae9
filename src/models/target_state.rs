use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::StockState;

/// Persisted result of the last successful check of one target.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TargetState {
    #[serde(default)]
    pub last_state: StockState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_matched_term: Option<String>,
}

/// Outcome of recording a check against the stored state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckRecord {
    pub previous_state: StockState,
    pub transitioned: bool,
}

/// Whole state file: per-target states keyed by url.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StateDocument {
    #[serde(default)]
    pub targets: BTreeMap<String, TargetState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl StateDocument {
    pub fn get(&self, url: &str) -> Option<&TargetState> {
        self.targets.get(url)
    }

    pub fn last_checked_at(&self, url: &str) -> Option<DateTime<Utc>> {
        self.get(url).and_then(|state| state.last_checked_at)
    }

    /// Record a successful classification, creating the entry on first check.
    pub fn record_check(
        &mut self,
        url: &str,
        new_state: StockState,
        matched_term: Option<String>,
        checked_at: DateTime<Utc>,
    ) -> CheckRecord {
        let entry = self.targets.entry(url.to_string()).or_default();
        let previous_state = entry.last_state;

        entry.last_state = new_state;
        entry.last_matched_term = matched_term;
        // last_checked_at never moves backwards
        entry.last_checked_at = Some(match entry.last_checked_at {
            Some(existing) if existing > checked_at => existing,
            _ => checked_at,
        });

        if self.updated_at.is_none_or(|at| at < checked_at) {
            self.updated_at = Some(checked_at);
        }

        CheckRecord {
            previous_state,
            transitioned: previous_state.is_transition_to(new_state),
        }
    }
}
