//! Republishes outbox entries that never reached the queue.

use std::time::Duration;

use booking_store::BookingStore;
use tokio_util::sync::CancellationToken;

use crate::error::WorkerError;
use crate::queue::NotificationQueue;

/// Default age an outbox entry must reach before the relay picks it up.
///
/// Gives the booking path's direct publish time to mark the entry itself.
pub const DEFAULT_MIN_AGE: Duration = Duration::from_secs(10);

/// Default number of entries relayed per tick.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Shortest tick the relay will run with.
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Moves pending outbox entries onto the notification queue.
pub struct OutboxRelay<S, Q> {
    store: S,
    queue: Q,
    min_age: Duration,
    batch_size: usize,
}

impl<S: BookingStore, Q: NotificationQueue> OutboxRelay<S, Q> {
    pub fn new(store: S, queue: Q) -> Self {
        Self {
            store,
            queue,
            min_age: DEFAULT_MIN_AGE,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_min_age(mut self, min_age: Duration) -> Self {
        self.min_age = min_age;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Publishes one batch of pending entries. Returns how many were relayed.
    ///
    /// The first queue failure is recorded on its entry and ends the batch;
    /// the remaining entries wait for the next call.
    pub async fn relay_pending(&self) -> Result<usize, WorkerError> {
        let pending = self
            .store
            .pending_outbox(self.min_age, self.batch_size)
            .await?;

        let mut relayed = 0;
        for entry in pending {
            match self.queue.publish_raw(&entry.payload.to_string()).await {
                Ok(()) => {
                    self.store.mark_outbox_published(entry.id).await?;
                    metrics::counter!("outbox_relayed_total").increment(1);
                    tracing::info!(
                        outbox_id = entry.id,
                        order_id = %entry.order_id,
                        attempts = entry.attempts,
                        "relayed pending notification"
                    );
                    relayed += 1;
                }
                Err(e) => {
                    tracing::warn!(outbox_id = entry.id, error = %e, "outbox relay publish failed");
                    self.store
                        .record_outbox_failure(entry.id, &e.to_string())
                        .await?;
                    break;
                }
            }
        }

        Ok(relayed)
    }

    /// Relays every `interval` until `cancel` fires. Intervals below
    /// [`MIN_INTERVAL`] are raised to it.
    pub async fn run(&self, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval.max(MIN_INTERVAL));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("outbox relay stopped");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.relay_pending().await {
                        tracing::error!(error = %e, "outbox relay iteration failed");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use booking_store::{InMemoryBookingStore, NewBooking, OrderId, Purchaser, Screening, SeatId};

    use crate::event::{BookingConfirmed, NotificationEvent};
    use crate::queue::InMemoryQueue;

    async fn book(store: &InMemoryBookingStore, order: i64) {
        let purchaser = Purchaser::new("alice", "alice@x.com");
        let screening = Screening::new("Inception", "1:15 PM");
        let seats = vec![SeatId::new(0, order as u16)];
        let event: NotificationEvent =
            BookingConfirmed::new(&purchaser, &screening, seats.clone(), OrderId::new(order))
                .into();

        store
            .book(NewBooking {
                purchaser,
                screening,
                seats,
                order_id: OrderId::new(order),
                event_type: event.event_type().to_string(),
                outbox_payload: serde_json::to_value(&event).unwrap(),
            })
            .await
            .unwrap();
    }

    fn relay(
        store: &InMemoryBookingStore,
        queue: &InMemoryQueue,
    ) -> OutboxRelay<InMemoryBookingStore, InMemoryQueue> {
        OutboxRelay::new(store.clone(), queue.clone()).with_min_age(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_relays_pending_entries() {
        let store = InMemoryBookingStore::new();
        let queue = InMemoryQueue::new();
        book(&store, 1).await;
        book(&store, 2).await;

        let relayed = relay(&store, &queue).relay_pending().await.unwrap();

        assert_eq!(relayed, 2);
        let ready = queue.ready_messages().await;
        assert_eq!(ready.len(), 2);
        let first: NotificationEvent = serde_json::from_str(&ready[0]).unwrap();
        assert_eq!(first.order_id(), OrderId::new(1));
        assert!(store.outbox_entries().await.iter().all(|e| !e.is_pending()));

        // Nothing left on the next tick
        assert_eq!(relay(&store, &queue).relay_pending().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_queue_outage_records_failure_and_stops_batch() {
        let store = InMemoryBookingStore::new();
        let queue = InMemoryQueue::new();
        book(&store, 1).await;
        book(&store, 2).await;
        queue.set_unavailable(true).await;

        let relayed = relay(&store, &queue).relay_pending().await.unwrap();

        assert_eq!(relayed, 0);
        let entries = store.outbox_entries().await;
        assert_eq!(entries[0].attempts, 1);
        assert!(entries[0].last_error.is_some());
        assert_eq!(entries[1].attempts, 0);

        queue.set_unavailable(false).await;
        assert_eq!(relay(&store, &queue).relay_pending().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_respects_min_age() {
        let store = InMemoryBookingStore::new();
        let queue = InMemoryQueue::new();
        book(&store, 1).await;

        let relay = OutboxRelay::new(store.clone(), queue.clone())
            .with_min_age(Duration::from_secs(3600));
        assert_eq!(relay.relay_pending().await.unwrap(), 0);
        assert!(queue.ready_messages().await.is_empty());
    }

    #[tokio::test]
    async fn test_batch_size_limits_each_tick() {
        let store = InMemoryBookingStore::new();
        let queue = InMemoryQueue::new();
        for order in 1..=3 {
            book(&store, order).await;
        }

        let relay = relay(&store, &queue).with_batch_size(2);
        assert_eq!(relay.relay_pending().await.unwrap(), 2);
        assert_eq!(relay.relay_pending().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_run_with_zero_interval_keeps_relaying() {
        let store = InMemoryBookingStore::new();
        let queue = InMemoryQueue::new();
        book(&store, 1).await;

        let relay = relay(&store, &queue);
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move { relay.run(Duration::ZERO, token).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(queue.ready_messages().await.len(), 1);
        assert!(!task.is_finished());

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_store_outage_is_an_error() {
        let store = InMemoryBookingStore::new();
        let queue = InMemoryQueue::new();
        store.set_unavailable(true).await;

        let result = relay(&store, &queue).relay_pending().await;
        assert!(matches!(result, Err(WorkerError::Store(_))));
    }
}
