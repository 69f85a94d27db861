//! Console mailer for development.

use async_trait::async_trait;

use super::{ConfirmationMessage, Mailer};
use crate::error::MailError;

/// Logs messages instead of sending them.
///
/// Used when no SMTP server is configured so the pipeline still runs end to
/// end.
#[derive(Debug, Clone, Default)]
pub struct ConsoleMailer;

impl ConsoleMailer {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn send(&self, message: &ConfirmationMessage) -> Result<(), MailError> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            "confirmation email (console mailer, not sent)"
        );
        tracing::debug!(body = %message.text_body, "confirmation email body");
        Ok(())
    }
}
