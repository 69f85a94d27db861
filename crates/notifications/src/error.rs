//! Notification error types.

use booking_store::StoreError;
use thiserror::Error;

/// Errors raised by a notification queue.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The broker could not be reached.
    #[error("Queue unavailable: {0}")]
    Unavailable(String),

    /// Any other broker error.
    #[error("Redis error: {0}")]
    Redis(redis::RedisError),

    /// An event could not be encoded for the queue.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<redis::RedisError> for QueueError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error() || err.is_connection_refusal() || err.is_connection_dropped() {
            QueueError::Unavailable(err.to_string())
        } else {
            QueueError::Redis(err)
        }
    }
}

/// Errors raised while delivering a confirmation message.
#[derive(Debug, Error)]
pub enum MailError {
    /// SMTP transport failure (connection, authentication, rejection).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// A sender or recipient address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),

    /// Delivery was refused by a test or development mailer.
    #[error("Delivery rejected: {0}")]
    Rejected(String),
}

impl MailError {
    /// Returns true if sending the same message again cannot succeed.
    pub fn is_permanent(&self) -> bool {
        matches!(self, MailError::Address(_) | MailError::Build(_))
    }
}

/// Errors that stop a worker or relay iteration.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
