use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

use crate::config::SmtpSettings;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail to {to} failed: {reason}")]
    Delivery { to: String, reason: String },

    #[error("mail relay misconfigured: {reason}")]
    Config { reason: String },
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Mail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: Mail) -> Result<(), MailError>;
}

/// Sends mail through an SMTP relay. The lettre transport is blocking, so each
/// send runs on the blocking pool.
pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings, from: &str) -> Result<Self, MailError> {
        let from = from.parse::<Mailbox>().map_err(|err| MailError::Config {
            reason: format!("invalid sender address {from}: {err}"),
        })?;

        let mut builder = if settings.starttls {
            SmtpTransport::starttls_relay(&settings.host).map_err(|err| MailError::Config {
                reason: format!("SMTP relay {}: {err}", settings.host),
            })?
        } else {
            SmtpTransport::builder_dangerous(&settings.host)
        }
        .port(settings.port);

        if let Some(username) = &settings.username {
            let password = settings.password.clone().unwrap_or_default();
            builder = builder.credentials(Credentials::new(username.clone(), password));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn compose(&self, mail: Mail) -> Result<Message, MailError> {
        let to = mail.to.parse::<Mailbox>().map_err(|err| MailError::Delivery {
            to: mail.to.clone(),
            reason: format!("invalid recipient address: {err}"),
        })?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body)
            .map_err(|err| MailError::Delivery {
                to: mail.to,
                reason: format!("failed to build message: {err}"),
            })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: Mail) -> Result<(), MailError> {
        let to = mail.to.clone();
        let message = self.compose(mail)?;

        let transport = self.transport.clone();
        let response = tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|err| MailError::Delivery {
                to: to.clone(),
                reason: format!("mail task failed: {err}"),
            })?
            .map_err(|err| MailError::Delivery {
                to: to.clone(),
                reason: err.to_string(),
            })?;

        info!(to = %to, code = %response.code(), "mail accepted by relay");
        Ok(())
    }
}

/// Writes outgoing mail to the log instead of an SMTP relay.
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: Mail) -> Result<(), MailError> {
        info!(
            from = %self.from,
            to = %mail.to,
            subject = %mail.subject,
            body_len = mail.body.len(),
            "mail dispatched"
        );
        Ok(())
    }
}

/// Keeps sent mail in memory. Used by tests and local runs.
#[derive(Default)]
pub struct MemoryMailer {
    outbox: Mutex<Vec<Mail>>,
    reject_all: bool,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose relay is down: every send fails.
    pub fn unavailable() -> Self {
        Self {
            outbox: Mutex::new(Vec::new()),
            reject_all: true,
        }
    }

    pub async fn sent(&self) -> Vec<Mail> {
        self.outbox.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, mail: Mail) -> Result<(), MailError> {
        if self.reject_all {
            return Err(MailError::Delivery {
                to: mail.to,
                reason: "relay unavailable".to_string(),
            });
        }

        self.outbox.lock().await.push(mail);
        Ok(())
    }
}
