//! Standing consumer that turns booking events into confirmation emails.

use std::time::Duration;

use common::OrderId;
use tokio_util::sync::CancellationToken;

use crate::error::WorkerError;
use crate::event::NotificationEvent;
use crate::mail::{Mailer, render_confirmation};
use crate::queue::{Delivery, NotificationQueue};
use crate::retry::RetryPolicy;

/// How long the worker waits before polling an empty queue again.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// What happened to a single received message.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The confirmation was sent and the message acknowledged.
    Delivered { order_id: OrderId },
    /// Delivery failed; the message comes back after `delay`.
    Retrying {
        order_id: OrderId,
        attempt: u32,
        delay: Duration,
    },
    /// The message will not be tried again.
    DeadLettered { reason: String },
}

/// Consumes the notification queue one message at a time.
///
/// A message is acknowledged only after the mailer accepted it. Failed
/// deliveries are retried with backoff and dead-lettered once the retry
/// policy gives up.
pub struct NotificationWorker<Q, M> {
    queue: Q,
    mailer: M,
    policy: RetryPolicy,
    poll_interval: Duration,
}

impl<Q: NotificationQueue, M: Mailer> NotificationWorker<Q, M> {
    pub fn new(queue: Q, mailer: M, policy: RetryPolicy) -> Self {
        Self {
            queue,
            mailer,
            policy,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Receives and settles the next message.
    ///
    /// Returns `Ok(None)` when the queue is empty. Errors are queue errors
    /// only; delivery failures are settled through retry or dead-letter.
    pub async fn process_next(&self) -> Result<Option<Outcome>, WorkerError> {
        let Some(delivery) = self.queue.receive().await? else {
            return Ok(None);
        };

        let event: NotificationEvent = match serde_json::from_str(&delivery.raw) {
            Ok(event) => event,
            Err(e) => {
                let reason = format!("undecodable message: {e}");
                tracing::warn!(error = %e, "dead-lettering undecodable message");
                return self.dead_letter(&delivery, reason).await.map(Some);
            }
        };

        let NotificationEvent::BookingConfirmed(confirmed) = &event;
        let order_id = confirmed.order_id;
        let message = render_confirmation(confirmed);

        let send_start = std::time::Instant::now();
        let sent = self.mailer.send(&message).await;
        metrics::histogram!("notification_send_duration_seconds")
            .record(send_start.elapsed().as_secs_f64());

        let outcome = match sent {
            Ok(()) => {
                self.queue.ack(&delivery).await?;
                metrics::counter!("notifications_delivered_total").increment(1);
                tracing::info!(
                    %order_id,
                    to = %message.to,
                    attempt = delivery.attempt,
                    "confirmation delivered"
                );
                Outcome::Delivered { order_id }
            }
            Err(e) if !e.is_permanent() && self.policy.should_retry(delivery.attempt) => {
                let delay = self.policy.delay_after(delivery.attempt);
                self.queue.retry(&delivery, delay).await?;
                metrics::counter!("notifications_retried_total").increment(1);
                tracing::warn!(
                    %order_id,
                    attempt = delivery.attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "delivery failed, retry scheduled"
                );
                Outcome::Retrying {
                    order_id,
                    attempt: delivery.attempt,
                    delay,
                }
            }
            Err(e) => {
                tracing::error!(
                    %order_id,
                    attempt = delivery.attempt,
                    error = %e,
                    "delivery failed, giving up"
                );
                let reason = if e.is_permanent() {
                    format!("undeliverable message: {e}")
                } else {
                    format!("delivery failed after {} attempts: {e}", delivery.attempt)
                };
                self.dead_letter(&delivery, reason).await?
            }
        };

        Ok(Some(outcome))
    }

    async fn dead_letter(
        &self,
        delivery: &Delivery,
        reason: String,
    ) -> Result<Outcome, WorkerError> {
        self.queue.dead_letter(delivery, &reason).await?;
        metrics::counter!("notifications_dead_lettered_total").increment(1);
        Ok(Outcome::DeadLettered { reason })
    }

    /// Runs until `cancel` fires.
    ///
    /// Messages stranded in flight by a previous run are requeued first. A
    /// message already being processed is settled before the loop exits.
    pub async fn run(&self, cancel: CancellationToken) {
        match self.queue.recover().await {
            Ok(0) => {}
            Ok(count) => tracing::info!(count, "requeued in-flight messages"),
            Err(e) => tracing::warn!(error = %e, "could not recover in-flight messages"),
        }

        tracing::info!("notification worker started");
        loop {
            if cancel.is_cancelled() {
                break;
            }

            match self.process_next().await {
                Ok(Some(_)) => continue,
                Ok(None) => {}
                Err(e) => tracing::error!(error = %e, "failed to poll notification queue"),
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
        tracing::info!("notification worker stopped");
    }
}
