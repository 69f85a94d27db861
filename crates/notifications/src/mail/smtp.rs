//! SMTP delivery via `lettre`.

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{ConfirmationMessage, DEFAULT_SENDER, Mailer};
use crate::error::MailError;

/// Default SMTP port (STARTTLS).
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// SMTP server settings.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    /// RFC 5322 "From" mailbox, e.g. `Name <addr@host>`.
    pub from: String,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl SmtpConfig {
    /// Creates settings for `host` with the default port and sender.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_SMTP_PORT,
            from: DEFAULT_SENDER.to_string(),
            user: None,
            password: None,
        }
    }
}

/// Sends confirmation messages through an SMTP relay.
///
/// The transport is built once and keeps its own connection pool.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let from: Mailbox = config.from.parse()?;
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port);

        if let (Some(user), Some(pass)) = (&config.user, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn build_message(&self, message: &ConfirmationMessage) -> Result<Message, MailError> {
        Message::builder()
            .from(self.from.clone())
            .to(message.to.parse()?)
            .subject(message.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                message.text_body.clone(),
                message.html_body.clone(),
            ))
            .map_err(|e| MailError::Build(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &ConfirmationMessage) -> Result<(), MailError> {
        let email = self.build_message(message)?;
        self.transport.send(email).await?;

        tracing::info!(to = %message.to, subject = %message.subject, "confirmation email sent");
        Ok(())
    }
}
