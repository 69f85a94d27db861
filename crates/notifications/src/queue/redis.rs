//! Redis-backed notification queue.
//!
//! Layout for a queue named `q`:
//!
//! - `q` list of ready messages (LPUSH in, RPOPLPUSH out)
//! - `q:processing` list of in-flight messages
//! - `q:retry` sorted set of delayed messages scored by due time in ms
//! - `q:dead` list of [`DeadLetter`] records
//! - `q:attempts` hash of receive counts keyed by message body

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::Client;
use tokio::sync::OnceCell;

use super::{DeadLetter, Delivery, NotificationQueue};
use crate::error::QueueError;

/// How many due retries are moved back to the ready list per receive.
const PROMOTE_BATCH: usize = 100;

/// Durable queue on Redis lists.
///
/// The connection is opened on first use and re-established by the
/// connection manager after failures, so constructing a queue never touches
/// the network.
#[derive(Clone)]
pub struct RedisQueue {
    client: Client,
    conn: std::sync::Arc<OnceCell<ConnectionManager>>,
    ready: String,
    processing: String,
    retry: String,
    dead: String,
    attempts: String,
}

impl RedisQueue {
    /// Creates a queue handle for `name` on the server at `redis_url`.
    pub fn new(redis_url: &str, name: &str) -> Result<Self, QueueError> {
        let client = Client::open(redis_url)?;
        Ok(Self {
            client,
            conn: std::sync::Arc::new(OnceCell::new()),
            ready: name.to_string(),
            processing: format!("{name}:processing"),
            retry: format!("{name}:retry"),
            dead: format!("{name}:dead"),
            attempts: format!("{name}:attempts"),
        })
    }

    /// Returns the queue name.
    pub fn name(&self) -> &str {
        &self.ready
    }

    async fn connection(&self) -> Result<ConnectionManager, QueueError> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                let manager = ConnectionManager::new(self.client.clone()).await?;
                tracing::info!(queue = %self.ready, "connected to redis");
                Ok::<_, QueueError>(manager)
            })
            .await?;
        Ok(conn.clone())
    }

    /// Returns the number of messages waiting to be received.
    pub async fn ready_len(&self) -> Result<usize, QueueError> {
        let mut conn = self.connection().await?;
        let len: usize = redis::cmd("LLEN")
            .arg(&self.ready)
            .query_async(&mut conn)
            .await?;
        Ok(len)
    }

    /// Returns every dead-lettered message, newest first.
    pub async fn dead_letters(&self) -> Result<Vec<DeadLetter>, QueueError> {
        let mut conn = self.connection().await?;
        let raw: Vec<String> = redis::cmd("LRANGE")
            .arg(&self.dead)
            .arg(0)
            .arg(-1)
            .query_async(&mut conn)
            .await?;
        raw.iter()
            .map(|r| serde_json::from_str(r).map_err(QueueError::from))
            .collect()
    }

    async fn promote_due_retries(&self, conn: &mut ConnectionManager) -> Result<(), QueueError> {
        let now = chrono::Utc::now().timestamp_millis();
        let due: Vec<String> = redis::cmd("ZRANGEBYSCORE")
            .arg(&self.retry)
            .arg("-inf")
            .arg(now)
            .arg("LIMIT")
            .arg(0)
            .arg(PROMOTE_BATCH)
            .query_async(conn)
            .await?;

        for raw in due {
            // Only the consumer that wins the ZREM requeues the message
            let removed: i64 = redis::cmd("ZREM")
                .arg(&self.retry)
                .arg(&raw)
                .query_async(conn)
                .await?;
            if removed == 1 {
                let _: i64 = redis::cmd("LPUSH")
                    .arg(&self.ready)
                    .arg(&raw)
                    .query_async(conn)
                    .await?;
            }
        }
        Ok(())
    }

    async fn remove_in_flight(
        &self,
        conn: &mut ConnectionManager,
        raw: &str,
    ) -> Result<(), QueueError> {
        let _: i64 = redis::cmd("LREM")
            .arg(&self.processing)
            .arg(1)
            .arg(raw)
            .query_async(conn)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl NotificationQueue for RedisQueue {
    async fn publish_raw(&self, payload: &str) -> Result<(), QueueError> {
        let mut conn = self.connection().await?;
        let _: i64 = redis::cmd("LPUSH")
            .arg(&self.ready)
            .arg(payload)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn receive(&self) -> Result<Option<Delivery>, QueueError> {
        let mut conn = self.connection().await?;
        self.promote_due_retries(&mut conn).await?;

        let raw: Option<String> = redis::cmd("RPOPLPUSH")
            .arg(&self.ready)
            .arg(&self.processing)
            .query_async(&mut conn)
            .await?;
        let Some(raw) = raw else {
            return Ok(None);
        };

        let attempt: u32 = redis::cmd("HINCRBY")
            .arg(&self.attempts)
            .arg(&raw)
            .arg(1)
            .query_async(&mut conn)
            .await?;
        Ok(Some(Delivery { raw, attempt }))
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), QueueError> {
        let mut conn = self.connection().await?;
        self.remove_in_flight(&mut conn, &delivery.raw).await?;
        let _: i64 = redis::cmd("HDEL")
            .arg(&self.attempts)
            .arg(&delivery.raw)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn retry(&self, delivery: &Delivery, delay: Duration) -> Result<(), QueueError> {
        let mut conn = self.connection().await?;
        let due = chrono::Utc::now().timestamp_millis() + delay.as_millis() as i64;
        let _: i64 = redis::cmd("ZADD")
            .arg(&self.retry)
            .arg(due)
            .arg(&delivery.raw)
            .query_async(&mut conn)
            .await?;
        self.remove_in_flight(&mut conn, &delivery.raw).await
    }

    async fn dead_letter(&self, delivery: &Delivery, reason: &str) -> Result<(), QueueError> {
        let mut conn = self.connection().await?;
        let record = serde_json::to_string(&DeadLetter::new(delivery, reason))?;
        let _: i64 = redis::cmd("LPUSH")
            .arg(&self.dead)
            .arg(record)
            .query_async(&mut conn)
            .await?;
        self.remove_in_flight(&mut conn, &delivery.raw).await?;
        let _: i64 = redis::cmd("HDEL")
            .arg(&self.attempts)
            .arg(&delivery.raw)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn recover(&self) -> Result<usize, QueueError> {
        let mut conn = self.connection().await?;
        let mut count = 0;
        loop {
            let moved: Option<String> = redis::cmd("RPOPLPUSH")
                .arg(&self.processing)
                .arg(&self.ready)
                .query_async(&mut conn)
                .await?;
            if moved.is_none() {
                break;
            }
            count += 1;
        }
        Ok(count)
    }
}
