//! Confirmation messages and the mail transports that deliver them.

use async_trait::async_trait;

use crate::error::MailError;

pub mod console;
pub mod memory;
pub mod render;
pub mod smtp;

pub use console::ConsoleMailer;
pub use memory::InMemoryMailer;
pub use render::render_confirmation;
pub use smtp::{SmtpConfig, SmtpMailer};

/// Sender used when none is configured.
pub const DEFAULT_SENDER: &str = "Golden Seat Cinema <noreply@goldenseat.com>";

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationMessage {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

/// Outbound mail transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Delivers one message. An `Ok` means the transport accepted it.
    async fn send(&self, message: &ConfirmationMessage) -> Result<(), MailError>;
}
