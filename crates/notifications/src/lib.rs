//! Booking confirmation pipeline: queue contract, mail delivery, the
//! notification worker, and the outbox relay.

pub mod error;
pub mod event;
pub mod mail;
pub mod queue;
pub mod relay;
pub mod retry;
pub mod worker;

pub use error::{MailError, QueueError, WorkerError};
pub use event::{BookingConfirmed, NotificationEvent};
pub use mail::{
    ConfirmationMessage, ConsoleMailer, InMemoryMailer, Mailer, SmtpConfig, SmtpMailer,
    render_confirmation,
};
pub use queue::{
    DEFAULT_QUEUE_NAME, DeadLetter, Delivery, InMemoryQueue, NotificationQueue, RedisQueue,
};
pub use relay::OutboxRelay;
pub use retry::RetryPolicy;
pub use worker::{NotificationWorker, Outcome};
