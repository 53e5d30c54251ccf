//! Outbound notification transports
//!
//! The reminder dispatcher hands each message to a [`NotificationTransport`]
//! and only cares whether the hand-off succeeded.
//!
//! # Architecture
//!
//! - `NotificationTransport` trait: the send interface
//! - `Notifier` enum: concrete wrapper selected at startup
//! - Transports: `SmtpTransport` (lettre), `LogTransport`, `MockTransport`
//!
//! # Configuration
//!
//! Environment variables:
//! - `SUBHUB_NOTIFIER`: smtp, log or mock. Default: smtp when `SMTP_HOST` is set, else log
//! - `SMTP_HOST`, `SMTP_PORT` (default 2525), `SMTP_USER`, `SMTP_PASSWORD`
//! - `SMTP_FROM`: sender mailbox. Default: `SubHub Team <no-reply@subhub.local>`
//! - `SMTP_TLS`: starttls (default) or none

mod mock;
mod smtp;

use async_trait::async_trait;
use tracing::info;

use crate::error::{Error, Result};

pub use mock::{MockTransport, SentMessage};
pub use smtp::{SmtpConfig, SmtpTransport};

/// Delivers a plain-text message to one recipient
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Writes messages to the log instead of delivering them
///
/// Used when no mail server is configured, so reminder runs still mark
/// subscriptions as notified and the output can be inspected.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransport;

#[async_trait]
impl NotificationTransport for LogTransport {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        info!(
            to = %recipient,
            subject = %subject,
            body_len = body.len(),
            "[LOG] Reminder would be sent"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Transport selected at startup
#[derive(Clone)]
pub enum Notifier {
    Smtp(SmtpTransport),
    Log(LogTransport),
    Mock(MockTransport),
}

impl Notifier {
    /// Create a notifier from environment variables
    pub fn from_env() -> Result<Self> {
        let backend = std::env::var("SUBHUB_NOTIFIER").unwrap_or_else(|_| {
            if std::env::var("SMTP_HOST").is_ok() {
                "smtp".to_string()
            } else {
                "log".to_string()
            }
        });

        match backend.to_lowercase().as_str() {
            "smtp" => SmtpTransport::from_env()?.map(Notifier::Smtp).ok_or_else(|| {
                Error::Notification("SMTP_HOST must be set for the smtp notifier".to_string())
            }),
            "log" => Ok(Notifier::Log(LogTransport)),
            "mock" => Ok(Notifier::Mock(MockTransport::new())),
            _ => {
                tracing::warn!(backend = %backend, "Unknown SUBHUB_NOTIFIER, falling back to log");
                Ok(Notifier::Log(LogTransport))
            }
        }
    }

    /// Create a mock notifier for testing
    pub fn mock() -> Self {
        Notifier::Mock(MockTransport::new())
    }

    /// The mock transport, if this is one
    pub fn as_mock(&self) -> Option<&MockTransport> {
        match self {
            Notifier::Mock(m) => Some(m),
            _ => None,
        }
    }
}

#[async_trait]
impl NotificationTransport for Notifier {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        match self {
            Notifier::Smtp(t) => t.send(recipient, subject, body).await,
            Notifier::Log(t) => t.send(recipient, subject, body).await,
            Notifier::Mock(t) => t.send(recipient, subject, body).await,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Notifier::Smtp(t) => t.name(),
            Notifier::Log(t) => t.name(),
            Notifier::Mock(t) => t.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_transport_always_succeeds() {
        let transport = LogTransport;
        transport
            .send("a@example.com", "Subject", "Body")
            .await
            .unwrap();
        assert_eq!(transport.name(), "log");
    }

    #[tokio::test]
    async fn test_notifier_delegates_to_mock() {
        let notifier = Notifier::mock();
        notifier
            .send("a@example.com", "Hello", "World")
            .await
            .unwrap();

        let mock = notifier.as_mock().unwrap();
        assert_eq!(mock.send_count(), 1);
        assert_eq!(mock.sent()[0].subject, "Hello");
        assert_eq!(notifier.name(), "mock");
    }
}
