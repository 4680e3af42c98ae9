use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;

use crate::config::SmtpConfig;
use crate::plugins::traits::{MailTransport, OutgoingEmail};
use crate::utils::error::{AppError, Result};

/// SMTP delivery through lettre's tokio transport.
pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Self {
        SmtpMailer { config }
    }

    /// Names of the settings that must be filled before anything can be sent.
    pub fn missing_settings(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.config.host.as_deref().is_none_or(|host| host.trim().is_empty()) {
            missing.push("SMTP_HOST");
        }
        if self.config.sender().is_none() {
            missing.push("EMAIL_FROM");
        }
        if self.config.username.is_some() != self.config.password.is_some() {
            missing.push(if self.config.username.is_some() { "SMTP_PASS" } else { "SMTP_USER" });
        }
        missing
    }

    fn build_transport(&self, host: &str) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let mut builder = if self.config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .map_err(|e| AppError::Notify(format!("invalid SMTP relay {}: {}", host, e)))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        }
        .port(self.config.port)
        .timeout(Some(Duration::from_secs(self.config.timeout_seconds)));

        if let (Some(username), Some(password)) = (&self.config.username, &self.config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(builder.build())
    }
}

/// Turn an [`OutgoingEmail`] into a lettre message.
pub fn build_message(email: &OutgoingEmail) -> Result<Message> {
    let parse = |address: &str| {
        address
            .parse::<Mailbox>()
            .map_err(|e| AppError::Notify(format!("invalid address '{}': {}", address, e)))
    };

    let mut builder = Message::builder()
        .from(parse(&email.from)?)
        .subject(email.subject.clone())
        .header(ContentType::TEXT_PLAIN);
    for recipient in &email.to {
        builder = builder.to(parse(recipient)?);
    }

    builder
        .body(email.body.clone())
        .map_err(|e| AppError::Notify(format!("failed to build email: {}", e)))
}

#[async_trait]
impl MailTransport for SmtpMailer {
    fn name(&self) -> &'static str {
        "smtp"
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        let missing = self.missing_settings();
        if !missing.is_empty() {
            return Err(AppError::Notify(format!(
                "incomplete SMTP configuration: {}",
                missing.join(", ")
            )));
        }
        let host = self.config.host.as_deref().unwrap_or_default();

        let message = build_message(email)?;
        let mailer = self.build_transport(host)?;

        mailer
            .send(message)
            .await
            .map_err(|e| AppError::Notify(format!("SMTP delivery via {} failed: {}", host, e)))?;

        tracing::info!("Email sent to {}", email.to.join(", "));
        Ok(())
    }
}
