use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Default cadence for targets that omit a schedule.
pub const DEFAULT_INTERVAL_SECONDS: u64 = 3600;

/// How often a target is checked.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Schedule {
    /// Check whenever at least `interval_seconds` have elapsed since the last check.
    Hourly { interval_seconds: u64 },
    /// Check once per calendar day, at or after `time` in the monitor timezone.
    Daily {
        #[serde(with = "hh_mm")]
        time: NaiveTime,
    },
}

impl Default for Schedule {
    fn default() -> Self {
        Schedule::Hourly {
            interval_seconds: DEFAULT_INTERVAL_SECONDS,
        }
    }
}

/// One monitored product page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Target {
    pub url: String,
    pub name: Option<String>,
    pub out_of_stock_terms: Vec<String>,
    pub schedule: Schedule,
    pub emails_on_out_of_stock: Vec<String>,
    pub emails_on_in_stock: Vec<String>,
    pub notify_on_same_state: bool,
}

impl Target {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.url)
    }
}

mod hh_mm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, "%H:%M").map_err(serde::de::Error::custom)
    }
}
