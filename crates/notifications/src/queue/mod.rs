//! Notification queue trait and implementations.
//!
//! A queue holds raw JSON messages. A received message is in flight until it
//! is acknowledged, scheduled for retry, or dead-lettered.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::QueueError;
use crate::event::NotificationEvent;

pub mod memory;
pub mod redis;

pub use self::memory::InMemoryQueue;
pub use self::redis::RedisQueue;

/// Queue name used when none is configured.
pub const DEFAULT_QUEUE_NAME: &str = "notifications";

/// A message handed to a consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// The message body exactly as published.
    pub raw: String,
    /// How many times this message has been received, starting at 1.
    pub attempt: u32,
}

/// A message that will not be retried again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetter {
    pub payload: String,
    pub reason: String,
    pub attempts: u32,
    pub failed_at: chrono::DateTime<chrono::Utc>,
}

impl DeadLetter {
    pub fn new(delivery: &Delivery, reason: &str) -> Self {
        Self {
            payload: delivery.raw.clone(),
            reason: reason.to_string(),
            attempts: delivery.attempt,
            failed_at: chrono::Utc::now(),
        }
    }
}

/// Durable, named queue of notification messages.
#[async_trait]
pub trait NotificationQueue: Send + Sync {
    /// Appends an already serialized message.
    async fn publish_raw(&self, payload: &str) -> Result<(), QueueError>;

    /// Serializes and appends an event.
    async fn publish(&self, event: &NotificationEvent) -> Result<(), QueueError> {
        let payload = serde_json::to_string(event)?;
        self.publish_raw(&payload).await
    }

    /// Takes the next ready message, if any, and marks it in flight.
    async fn receive(&self) -> Result<Option<Delivery>, QueueError>;

    /// Removes an in-flight message for good.
    async fn ack(&self, delivery: &Delivery) -> Result<(), QueueError>;

    /// Returns an in-flight message to the queue after `delay`.
    async fn retry(&self, delivery: &Delivery, delay: Duration) -> Result<(), QueueError>;

    /// Moves an in-flight message to the dead-letter queue.
    async fn dead_letter(&self, delivery: &Delivery, reason: &str) -> Result<(), QueueError>;

    /// Requeues messages left in flight by a consumer that stopped without
    /// settling them. Returns how many were requeued.
    async fn recover(&self) -> Result<usize, QueueError>;
}
