//! SMTP transport (lettre)

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

use super::NotificationTransport;
use crate::error::{Error, Result};

/// Default sender mailbox
pub const DEFAULT_FROM: &str = "SubHub Team <no-reply@subhub.local>";

/// Default SMTP port (common for dev relays)
pub const DEFAULT_PORT: u16 = 2525;

/// SMTP connection settings
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub from: String,
    /// Upgrade the connection with STARTTLS
    pub starttls: bool,
}

impl SmtpConfig {
    /// Read settings from the environment; None when `SMTP_HOST` is unset
    pub fn from_env() -> Result<Option<Self>> {
        let Ok(host) = std::env::var("SMTP_HOST") else {
            return Ok(None);
        };
        let port = match std::env::var("SMTP_PORT") {
            Ok(p) => p
                .parse()
                .map_err(|_| Error::Notification(format!("Invalid SMTP_PORT: {}", p)))?,
            Err(_) => DEFAULT_PORT,
        };
        let starttls = !std::env::var("SMTP_TLS")
            .map(|v| v.eq_ignore_ascii_case("none"))
            .unwrap_or(false);

        Ok(Some(Self {
            host,
            port,
            user: std::env::var("SMTP_USER").ok(),
            password: std::env::var("SMTP_PASSWORD").ok(),
            from: std::env::var("SMTP_FROM").unwrap_or_else(|_| DEFAULT_FROM.to_string()),
            starttls,
        }))
    }
}

/// Delivers reminders through an SMTP relay
#[derive(Clone)]
pub struct SmtpTransport {
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpTransport {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| Error::Notification(format!("Invalid from address: {}", e)))?;

        let builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host).map_err(|e| {
                Error::Notification(format!("Failed to create SMTP relay: {}", e))
            })?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };
        let builder = builder.port(config.port);
        let builder = match (&config.user, &config.password) {
            (Some(user), Some(password)) => {
                builder.credentials(Credentials::new(user.clone(), password.clone()))
            }
            _ => builder,
        };

        info!(host = %config.host, port = config.port, "SMTP transport configured");
        Ok(Self {
            from,
            transport: builder.build(),
        })
    }

    pub fn from_env() -> Result<Option<Self>> {
        SmtpConfig::from_env()?.map(|c| Self::new(&c)).transpose()
    }
}

#[async_trait]
impl NotificationTransport for SmtpTransport {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        let to: Mailbox = recipient
            .parse()
            .map_err(|e| Error::Notification(format!("Invalid recipient: {}", e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| Error::Notification(format!("Failed to build message: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| Error::Notification(format!("Failed to send email: {}", e)))?;

        info!(to = %recipient, subject = %subject, "Email sent");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}
