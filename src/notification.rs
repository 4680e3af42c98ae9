use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::models::{StockState, Target};
use crate::plugins::traits::{MailTransport, OutgoingEmail};
use crate::utils::error::Result;

/// A recorded check, as seen by the notifier.
#[derive(Debug, Clone)]
pub struct StockChange<'a> {
    pub target: &'a Target,
    pub previous_state: StockState,
    pub new_state: StockState,
    pub transitioned: bool,
    pub matched_term: Option<&'a str>,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    Sent { recipients: usize },
    /// Same state as before and the target does not ask for repeats.
    Suppressed,
    /// The applicable recipient list is empty.
    NoRecipients,
}

/// Recipient list to email for a check, or `None` when the notification is suppressed.
pub fn recipients_for(target: &Target, new_state: StockState, transitioned: bool) -> Option<&[String]> {
    if !transitioned && !target.notify_on_same_state {
        return None;
    }
    match new_state {
        StockState::OutOfStock => Some(&target.emails_on_out_of_stock),
        StockState::InStock => Some(&target.emails_on_in_stock),
        StockState::Unknown => None,
    }
}

pub struct Notifier {
    transport: Box<dyn MailTransport>,
    sender: String,
    timezone: Tz,
}

impl Notifier {
    pub fn new(transport: Box<dyn MailTransport>, sender: impl Into<String>, timezone: Tz) -> Self {
        tracing::debug!("Notifications go through the {} transport", transport.name());
        Self {
            transport,
            sender: sender.into(),
            timezone,
        }
    }

    /// Email the interested parties about a recorded check, if the policy asks for it.
    pub async fn notify(&self, change: &StockChange<'_>) -> Result<NotifyOutcome> {
        let Some(recipients) = recipients_for(change.target, change.new_state, change.transitioned) else {
            return Ok(NotifyOutcome::Suppressed);
        };
        if recipients.is_empty() {
            return Ok(NotifyOutcome::NoRecipients);
        }

        let email = self.compose(change, recipients);
        self.transport.send(&email).await?;

        Ok(NotifyOutcome::Sent {
            recipients: recipients.len(),
        })
    }

    fn compose(&self, change: &StockChange<'_>, recipients: &[String]) -> OutgoingEmail {
        let target = change.target;
        let subject = format!("[Stock Watcher] {} - {}", change.new_state.label(), target.url);

        let mut body = String::new();
        if let Some(name) = &target.name {
            body.push_str(&format!("Target: {}\n", name));
        }
        body.push_str(&format!("URL: {}\n", target.url));
        body.push_str(&format!("Previous state: {}\n", change.previous_state));
        body.push_str(&format!("New state: {}\n", change.new_state));
        body.push_str(&format!("Matched term: {}\n", change.matched_term.unwrap_or("none")));
        body.push_str(&format!(
            "Checked at: {}\n",
            change.checked_at.with_timezone(&self.timezone).to_rfc3339()
        ));

        OutgoingEmail {
            from: self.sender.clone(),
            to: recipients.to_vec(),
            subject,
            body,
        }
    }
}
