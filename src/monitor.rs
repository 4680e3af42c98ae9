use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tokio::time::Instant;

use crate::config::AppConfig;
use crate::models::{StateDocument, Target};
use crate::notification::{Notifier, NotifyOutcome, StockChange};
use crate::plugins::notifiers::SmtpMailer;
use crate::scheduler::is_due;
use crate::scraper::{fetch_and_classify, HttpFetcher, PageFetcher};
use crate::state_store::{JsonFileStore, StateStore};
use crate::utils::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Only check targets whose schedule says they are due.
    Scheduled,
    /// Check every target regardless of schedule.
    Forced,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub checked: usize,
    pub skipped: usize,
    pub failed: usize,
    pub transitions: usize,
    pub emails_sent: usize,
    pub delivery_failures: usize,
}

/// Ties fetching, state tracking and notification together for one invocation.
pub struct Monitor {
    fetcher: Arc<dyn PageFetcher>,
    store: Box<dyn StateStore>,
    notifier: Notifier,
    timezone: Tz,
}

impl Monitor {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        store: Box<dyn StateStore>,
        notifier: Notifier,
        timezone: Tz,
    ) -> Self {
        Self {
            fetcher,
            store,
            notifier,
            timezone,
        }
    }

    /// Production wiring: HTTP fetcher, JSON state file and SMTP delivery.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let timezone = config.timezone()?;
        let fetcher = Arc::new(HttpFetcher::new(&config.http)?);
        let store = JsonFileStore::new(&config.monitor.state_file);
        let notifier = Notifier::new(
            Box::new(SmtpMailer::new(config.smtp.clone())),
            config.smtp.sender().unwrap_or_default(),
            timezone,
        );

        Ok(Self::new(fetcher, Box::new(store), notifier, timezone))
    }

    /// Run one cycle over `targets` in order.
    ///
    /// Only an unreadable state store or a failure to persist state aborts the
    /// run; fetch, classification and delivery problems are logged per target.
    pub async fn run(&self, targets: &[Target], mode: RunMode, now: DateTime<Utc>) -> Result<RunSummary> {
        let start_time = Instant::now();
        let mut state = self.store.load().await?;
        let mut summary = RunSummary::default();

        for target in targets {
            if mode == RunMode::Scheduled
                && !is_due(&target.schedule, state.last_checked_at(&target.url), now, self.timezone)
            {
                summary.skipped += 1;
                continue;
            }

            summary.checked += 1;
            self.check_target(target, &mut state, now, &mut summary).await?;
        }

        tracing::info!(
            checked = summary.checked,
            skipped = summary.skipped,
            failed = summary.failed,
            transitions = summary.transitions,
            emails_sent = summary.emails_sent,
            delivery_failures = summary.delivery_failures,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Cycle finished"
        );

        Ok(summary)
    }

    async fn check_target(
        &self,
        target: &Target,
        state: &mut StateDocument,
        now: DateTime<Utc>,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let url = target.url.as_str();
        tracing::info!(url = %url, "Checking {}", target.display_name());

        let classification = match fetch_and_classify(self.fetcher.as_ref(), target).await {
            Ok(classification) => classification,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::warn!(url = %url, "Check failed, state left unchanged: {}", e);
                summary.failed += 1;
                return Ok(());
            }
        };

        match classification.matched_term.as_deref() {
            Some(term) => tracing::info!(url = %url, "Out of stock, matched term '{}'", term),
            None => tracing::info!(url = %url, "In stock, no out-of-stock term found"),
        }

        let record = state.record_check(
            url,
            classification.state,
            classification.matched_term.clone(),
            now,
        );
        // State is on disk before any delivery attempt.
        self.store.save(state).await?;

        if record.transitioned {
            summary.transitions += 1;
            tracing::info!(
                url = %url,
                "State changed: {} -> {}",
                record.previous_state,
                classification.state
            );
        }

        let change = StockChange {
            target,
            previous_state: record.previous_state,
            new_state: classification.state,
            transitioned: record.transitioned,
            matched_term: classification.matched_term.as_deref(),
            checked_at: now,
        };

        match self.notifier.notify(&change).await {
            Ok(NotifyOutcome::Sent { recipients }) => {
                summary.emails_sent += 1;
                tracing::info!(url = %url, "Notification sent to {} recipient(s)", recipients);
            }
            Ok(NotifyOutcome::Suppressed) => {
                tracing::info!(url = %url, "State unchanged ({}), no notification", classification.state);
            }
            Ok(NotifyOutcome::NoRecipients) => {
                tracing::info!(url = %url, "No recipients configured for state {}", classification.state);
            }
            Err(e) => {
                summary.delivery_failures += 1;
                tracing::error!(url = %url, "Notification failed: {}", e);
            }
        }

        Ok(())
    }
}
