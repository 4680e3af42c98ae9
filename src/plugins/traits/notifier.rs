use async_trait::async_trait;

use crate::utils::error::Result;

/// A fully composed plain-text email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

/// Delivers composed emails (SMTP in production, recorders in tests).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &'static str;

    /// Send one email to all of its recipients. Must not block indefinitely.
    async fn send(&self, email: &OutgoingEmail) -> Result<()>;
}
