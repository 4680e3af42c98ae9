//! Loads the list of monitored targets from a JSON document.
//!
//! The document is an object with a non-empty `targets` array. Every entry is
//! validated into a [`Target`]; any problem aborts the whole load with
//! [`AppError::Config`].

use chrono::NaiveTime;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use url::Url;

use crate::models::{Schedule, Target, DEFAULT_INTERVAL_SECONDS};
use crate::utils::error::{AppError, Result};

#[derive(Debug, Deserialize)]
struct RawDocument {
    targets: Option<Vec<RawTarget>>,
}

#[derive(Debug, Deserialize)]
struct RawTarget {
    url: Option<String>,
    name: Option<String>,
    out_of_stock_terms: Option<StringList>,
    schedule: Option<RawSchedule>,
    emails_on_out_of_stock: Option<StringList>,
    emails_on_in_stock: Option<StringList>,
    #[serde(default)]
    notify_on_same_state: bool,
}

#[derive(Debug, Deserialize)]
struct RawSchedule {
    mode: Option<String>,
    interval_seconds: Option<i64>,
    time: Option<String>,
}

/// A list field given either as an array or as one comma-separated string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StringList {
    Many(Vec<String>),
    Joined(String),
}

impl StringList {
    fn into_values(self) -> Vec<String> {
        let values = match self {
            StringList::Many(values) => values,
            StringList::Joined(joined) => joined.split(',').map(str::to_string).collect(),
        };
        values
            .into_iter()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .collect()
    }
}

/// Read and validate the targets file.
pub fn load_targets(path: &Path) -> Result<Vec<Target>> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        AppError::Config(format!("cannot read targets file {}: {}", path.display(), e))
    })?;
    parse_targets(&raw)
}

/// Validate a targets document already held in memory.
pub fn parse_targets(raw: &str) -> Result<Vec<Target>> {
    let document: RawDocument = serde_json::from_str(raw)
        .map_err(|e| AppError::Config(format!("invalid targets document: {}", e)))?;

    let raw_targets = match document.targets {
        Some(targets) if !targets.is_empty() => targets,
        _ => {
            return Err(AppError::Config(
                "the document must contain a non-empty 'targets' list".to_string(),
            ));
        }
    };

    let mut seen = HashSet::new();
    let mut targets = Vec::with_capacity(raw_targets.len());

    for (index, raw_target) in raw_targets.into_iter().enumerate() {
        let target = validate_target(index + 1, raw_target)?;
        if !seen.insert(target.url.clone()) {
            return Err(AppError::Config(format!(
                "target #{}: url '{}' is listed more than once",
                index + 1,
                target.url
            )));
        }
        targets.push(target);
    }

    Ok(targets)
}

fn validate_target(position: usize, raw: RawTarget) -> Result<Target> {
    let name = raw
        .name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());
    let label = name.clone().unwrap_or_else(|| format!("target #{}", position));

    let url = raw.url.map(|url| url.trim().to_string()).unwrap_or_default();
    if url.is_empty() {
        return Err(AppError::Config(format!("{}: 'url' is required", label)));
    }
    match Url::parse(&url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
        Ok(parsed) => {
            return Err(AppError::Config(format!(
                "{}: unsupported url scheme '{}'",
                label,
                parsed.scheme()
            )));
        }
        Err(e) => {
            return Err(AppError::Config(format!("{}: invalid url '{}': {}", label, url, e)));
        }
    }

    let out_of_stock_terms = raw
        .out_of_stock_terms
        .map(StringList::into_values)
        .unwrap_or_default();
    if out_of_stock_terms.is_empty() {
        return Err(AppError::Config(format!(
            "{}: 'out_of_stock_terms' must contain at least one value",
            label
        )));
    }

    let schedule = match raw.schedule {
        Some(schedule) => validate_schedule(&label, schedule)?,
        None => Schedule::default(),
    };

    Ok(Target {
        url,
        name,
        out_of_stock_terms,
        schedule,
        emails_on_out_of_stock: raw
            .emails_on_out_of_stock
            .map(StringList::into_values)
            .unwrap_or_default(),
        emails_on_in_stock: raw
            .emails_on_in_stock
            .map(StringList::into_values)
            .unwrap_or_default(),
        notify_on_same_state: raw.notify_on_same_state,
    })
}

fn validate_schedule(label: &str, raw: RawSchedule) -> Result<Schedule> {
    let mode = raw
        .mode
        .map(|mode| mode.trim().to_lowercase())
        .unwrap_or_else(|| "hourly".to_string());

    match mode.as_str() {
        "hourly" => {
            let interval = raw
                .interval_seconds
                .unwrap_or(DEFAULT_INTERVAL_SECONDS as i64);
            if interval <= 0 {
                return Err(AppError::Config(format!(
                    "{}: 'interval_seconds' must be greater than 0",
                    label
                )));
            }
            Ok(Schedule::Hourly {
                interval_seconds: interval as u64,
            })
        }
        "daily" => {
            let time = raw.time.as_deref().map(str::trim).unwrap_or_default();
            Ok(Schedule::Daily {
                time: parse_daily_time(time).ok_or_else(|| {
                    AppError::Config(format!(
                        "{}: invalid daily time '{}', expected HH:MM",
                        label, time
                    ))
                })?,
            })
        }
        other => Err(AppError::Config(format!(
            "{}: unknown schedule mode '{}', expected 'hourly' or 'daily'",
            label, other
        ))),
    }
}

/// Strict `HH:MM`, two digits each.
fn parse_daily_time(raw: &str) -> Option<NaiveTime> {
    let bytes = raw.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return None;
    }
    NaiveTime::parse_from_str(raw, "%H:%M").ok()
}
