//! In-memory notification queue.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::{DeadLetter, Delivery, NotificationQueue};
use crate::error::QueueError;

#[derive(Debug, Default)]
struct State {
    ready: VecDeque<String>,
    in_flight: Vec<String>,
    delayed: Vec<(Instant, String)>,
    dead: Vec<DeadLetter>,
    attempts: HashMap<String, u32>,
    unavailable: bool,
}

impl State {
    fn check_available(&self) -> Result<(), QueueError> {
        if self.unavailable {
            return Err(QueueError::Unavailable(
                "in-memory queue marked unavailable".to_string(),
            ));
        }
        Ok(())
    }

    fn take_in_flight(&mut self, raw: &str) {
        if let Some(pos) = self.in_flight.iter().position(|m| m == raw) {
            self.in_flight.remove(pos);
        }
    }

    fn promote_due(&mut self) {
        let now = Instant::now();
        let (due, waiting): (Vec<_>, Vec<_>) =
            self.delayed.drain(..).partition(|(at, _)| *at <= now);
        self.delayed = waiting;
        self.ready.extend(due.into_iter().map(|(_, raw)| raw));
    }
}

/// In-memory queue for tests and local runs.
///
/// Follows the same in-flight, retry, and dead-letter rules as the Redis
/// queue. Delayed retries become ready once their delay has elapsed.
#[derive(Debug, Clone, Default)]
pub struct InMemoryQueue {
    state: Arc<Mutex<State>>,
}

impl InMemoryQueue {
    /// Creates a new empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates the broker going down (or coming back).
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().await.unavailable = unavailable;
    }

    /// Returns the messages waiting to be received, oldest first.
    pub async fn ready_messages(&self) -> Vec<String> {
        self.state.lock().await.ready.iter().cloned().collect()
    }

    /// Returns the number of messages scheduled for a later retry.
    pub async fn delayed_count(&self) -> usize {
        self.state.lock().await.delayed.len()
    }

    /// Returns the number of messages currently in flight.
    pub async fn in_flight_count(&self) -> usize {
        self.state.lock().await.in_flight.len()
    }

    /// Returns every dead-lettered message.
    pub async fn dead_letters(&self) -> Vec<DeadLetter> {
        self.state.lock().await.dead.clone()
    }
}

#[async_trait]
impl NotificationQueue for InMemoryQueue {
    async fn publish_raw(&self, payload: &str) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        state.check_available()?;
        state.ready.push_back(payload.to_string());
        Ok(())
    }

    async fn receive(&self) -> Result<Option<Delivery>, QueueError> {
        let mut state = self.state.lock().await;
        state.check_available()?;
        state.promote_due();

        let Some(raw) = state.ready.pop_front() else {
            return Ok(None);
        };
        let attempt = {
            let count = state.attempts.entry(raw.clone()).or_insert(0);
            *count += 1;
            *count
        };
        state.in_flight.push(raw.clone());
        Ok(Some(Delivery { raw, attempt }))
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        state.check_available()?;
        state.take_in_flight(&delivery.raw);
        state.attempts.remove(&delivery.raw);
        Ok(())
    }

    async fn retry(&self, delivery: &Delivery, delay: Duration) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        state.check_available()?;
        state.take_in_flight(&delivery.raw);
        state
            .delayed
            .push((Instant::now() + delay, delivery.raw.clone()));
        Ok(())
    }

    async fn dead_letter(&self, delivery: &Delivery, reason: &str) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        state.check_available()?;
        state.take_in_flight(&delivery.raw);
        state.attempts.remove(&delivery.raw);
        state.dead.push(DeadLetter::new(delivery, reason));
        Ok(())
    }

    async fn recover(&self) -> Result<usize, QueueError> {
        let mut state = self.state.lock().await;
        state.check_available()?;
        let stranded: Vec<String> = state.in_flight.drain(..).collect();
        let count = stranded.len();
        state.ready.extend(stranded);
        Ok(count)
    }
}
