use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    BookingReceipt, BookingRecord, NewBooking, OrderId, OutboxEntry, Result, Screening, SeatId,
    StoreError, store::BookingStore,
};

/// First order id handed out, matching the Postgres sequence.
const FIRST_ORDER_ID: i64 = 10_000;

#[derive(Debug)]
struct State {
    records: Vec<BookingRecord>,
    outbox: Vec<OutboxEntry>,
    next_row_id: i64,
    next_outbox_id: i64,
    next_order_id: i64,
    unavailable: bool,
}

impl Default for State {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            outbox: Vec::new(),
            next_row_id: 1,
            next_outbox_id: 1,
            next_order_id: FIRST_ORDER_ID,
            unavailable: false,
        }
    }
}

impl State {
    fn check_available(&self) -> Result<()> {
        if self.unavailable {
            return Err(StoreError::Unavailable(
                "in-memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

/// In-memory booking store for tests and local runs.
///
/// Holds the same guarantees as the PostgreSQL implementation: a booking is
/// applied under one write lock, so it is all-or-nothing and a seat can be
/// held by at most one record per screening.
#[derive(Clone, Default)]
pub struct InMemoryBookingStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryBookingStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates the store going down (or coming back).
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.write().await.unavailable = unavailable;
    }

    /// Returns the total number of booking records stored.
    pub async fn record_count(&self) -> usize {
        self.state.read().await.records.len()
    }

    /// Returns a copy of every outbox entry, published or not.
    pub async fn outbox_entries(&self) -> Vec<OutboxEntry> {
        self.state.read().await.outbox.clone()
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn ping(&self) -> Result<()> {
        self.state.read().await.check_available()
    }

    async fn occupied_seats(&self, screening: Option<&Screening>) -> Result<Vec<SeatId>> {
        let state = self.state.read().await;
        state.check_available()?;

        Ok(state
            .records
            .iter()
            .filter(|r| screening.is_none_or(|s| r.is_for(s)))
            .map(|r| r.seat)
            .collect())
    }

    async fn next_order_id(&self) -> Result<OrderId> {
        let mut state = self.state.write().await;
        state.check_available()?;

        let id = state.next_order_id;
        state.next_order_id += 1;
        Ok(OrderId::new(id))
    }

    async fn book(&self, booking: NewBooking) -> Result<BookingReceipt> {
        let mut state = self.state.write().await;
        state.check_available()?;

        let taken: HashSet<SeatId> = state
            .records
            .iter()
            .filter(|r| r.is_for(&booking.screening))
            .map(|r| r.seat)
            .collect();

        // Checked up front so a conflict leaves nothing behind
        let mut requested = HashSet::new();
        for seat in &booking.seats {
            if taken.contains(seat) || !requested.insert(*seat) {
                return Err(StoreError::SeatConflict {
                    screening: booking.screening.clone(),
                    seat: *seat,
                });
            }
        }

        let now = Utc::now();
        let mut records = Vec::with_capacity(booking.seats.len());
        for seat in &booking.seats {
            let record = BookingRecord {
                id: state.next_row_id,
                user_name: booking.purchaser.name.clone(),
                email: booking.purchaser.email.clone(),
                movie_title: booking.screening.movie.clone(),
                show_time: booking.screening.show_time.clone(),
                seat: *seat,
                order_id: booking.order_id,
                created_at: now,
            };
            state.next_row_id += 1;
            records.push(record);
        }
        state.records.extend(records.iter().cloned());

        let outbox_id = state.next_outbox_id;
        state.next_outbox_id += 1;
        state.outbox.push(OutboxEntry {
            id: outbox_id,
            order_id: booking.order_id,
            event_type: booking.event_type,
            payload: booking.outbox_payload,
            created_at: now,
            published_at: None,
            attempts: 0,
            last_error: None,
        });

        Ok(BookingReceipt { records, outbox_id })
    }

    async fn cancel(&self, screening: Option<&Screening>, seats: &[SeatId]) -> Result<u64> {
        let mut state = self.state.write().await;
        state.check_available()?;

        let before = state.records.len();
        state.records.retain(|r| {
            let matches = seats.contains(&r.seat) && screening.is_none_or(|s| r.is_for(s));
            !matches
        });
        Ok((before - state.records.len()) as u64)
    }

    async fn bookings_for_purchaser(&self, user_name: &str) -> Result<Vec<BookingRecord>> {
        let state = self.state.read().await;
        state.check_available()?;

        let mut records: Vec<_> = state
            .records
            .iter()
            .filter(|r| r.user_name == user_name)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(records)
    }

    async fn pending_outbox(&self, min_age: Duration, limit: usize) -> Result<Vec<OutboxEntry>> {
        let state = self.state.read().await;
        state.check_available()?;

        let min_age = chrono::Duration::from_std(min_age).unwrap_or(chrono::Duration::zero());
        let cutoff = Utc::now() - min_age;
        Ok(state
            .outbox
            .iter()
            .filter(|e| e.is_pending() && e.created_at <= cutoff)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn mark_outbox_published(&self, id: i64) -> Result<()> {
        let mut state = self.state.write().await;
        state.check_available()?;

        if let Some(entry) = state.outbox.iter_mut().find(|e| e.id == id) {
            entry.published_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn record_outbox_failure(&self, id: i64, error: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.check_available()?;

        if let Some(entry) = state.outbox.iter_mut().find(|e| e.id == id) {
            entry.attempts += 1;
            entry.last_error = Some(error.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Purchaser;

    fn inception() -> Screening {
        Screening::new("Inception", "1:15 PM")
    }

    fn seats(raw: &[&str]) -> Vec<SeatId> {
        raw.iter().map(|s| s.parse().unwrap()).collect()
    }

    fn new_booking(screening: Screening, seat_ids: &[&str], order_id: i64) -> NewBooking {
        NewBooking {
            purchaser: Purchaser::new("alice", "alice@x.com"),
            screening,
            seats: seats(seat_ids),
            order_id: OrderId::new(order_id),
            event_type: "BOOKING_CONFIRMED".to_string(),
            outbox_payload: serde_json::json!({"orderId": order_id}),
        }
    }

    #[tokio::test]
    async fn book_records_every_seat_with_one_order_id() {
        let store = InMemoryBookingStore::new();

        let receipt = store
            .book(new_booking(inception(), &["0-0", "0-1"], 1))
            .await
            .unwrap();

        assert_eq!(receipt.records.len(), 2);
        assert!(receipt.records.iter().all(|r| r.order_id == OrderId::new(1)));
        let occupied = store.occupied_seats(Some(&inception())).await.unwrap();
        assert_eq!(occupied, seats(&["0-0", "0-1"]));
    }

    #[tokio::test]
    async fn conflicting_booking_writes_nothing() {
        let store = InMemoryBookingStore::new();
        store
            .book(new_booking(inception(), &["0-1"], 1))
            .await
            .unwrap();

        let result = store
            .book(new_booking(inception(), &["0-0", "0-1", "0-2"], 2))
            .await;

        assert!(matches!(
            result,
            Err(StoreError::SeatConflict { seat, .. }) if seat == SeatId::new(0, 1)
        ));
        assert_eq!(store.record_count().await, 1);
        assert_eq!(store.outbox_entries().await.len(), 1);
    }

    #[tokio::test]
    async fn same_seat_in_other_screening_is_free() {
        let store = InMemoryBookingStore::new();
        store
            .book(new_booking(inception(), &["0-0"], 1))
            .await
            .unwrap();

        let other = Screening::new("Inception", "4:00 PM");
        store.book(new_booking(other.clone(), &["0-0"], 2)).await.unwrap();

        assert_eq!(store.occupied_seats(None).await.unwrap().len(), 2);
        assert_eq!(store.occupied_seats(Some(&other)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn next_order_id_is_monotonic() {
        let store = InMemoryBookingStore::new();
        let first = store.next_order_id().await.unwrap();
        let second = store.next_order_id().await.unwrap();
        assert_eq!(first, OrderId::new(FIRST_ORDER_ID));
        assert!(second > first);
    }

    #[tokio::test]
    async fn scoped_cancel_leaves_other_screenings_alone() {
        let store = InMemoryBookingStore::new();
        let other = Screening::new("Dune", "9:00 PM");
        store.book(new_booking(inception(), &["0-0"], 1)).await.unwrap();
        store.book(new_booking(other.clone(), &["0-0"], 2)).await.unwrap();

        let removed = store
            .cancel(Some(&inception()), &seats(&["0-0"]))
            .await
            .unwrap();

        assert_eq!(removed, 1);
        assert!(store.occupied_seats(Some(&inception())).await.unwrap().is_empty());
        assert_eq!(store.occupied_seats(Some(&other)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unscoped_cancel_matches_every_screening() {
        let store = InMemoryBookingStore::new();
        store.book(new_booking(inception(), &["0-0"], 1)).await.unwrap();
        store
            .book(new_booking(Screening::new("Dune", "9:00 PM"), &["0-0"], 2))
            .await
            .unwrap();

        let removed = store.cancel(None, &seats(&["0-0"])).await.unwrap();
        assert_eq!(removed, 2);
    }

    #[tokio::test]
    async fn cancel_of_free_seat_is_noop() {
        let store = InMemoryBookingStore::new();
        let removed = store
            .cancel(Some(&inception()), &seats(&["5-5"]))
            .await
            .unwrap();
        assert_eq!(removed, 0);
    }

    #[tokio::test]
    async fn history_is_most_recent_first() {
        let store = InMemoryBookingStore::new();
        store.book(new_booking(inception(), &["0-0"], 1)).await.unwrap();
        store.book(new_booking(inception(), &["1-0"], 2)).await.unwrap();

        let history = store.bookings_for_purchaser("alice").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].order_id, OrderId::new(2));
        assert_eq!(history[1].order_id, OrderId::new(1));
        assert!(store.bookings_for_purchaser("bob").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn outbox_lifecycle() {
        let store = InMemoryBookingStore::new();
        let receipt = store.book(new_booking(inception(), &["0-0"], 1)).await.unwrap();

        let pending = store.pending_outbox(Duration::ZERO, 10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, receipt.outbox_id);

        // Too young for the relay yet
        let young = store
            .pending_outbox(Duration::from_secs(60), 10)
            .await
            .unwrap();
        assert!(young.is_empty());

        store
            .record_outbox_failure(receipt.outbox_id, "broker down")
            .await
            .unwrap();
        let entry = &store.outbox_entries().await[0];
        assert_eq!(entry.attempts, 1);
        assert_eq!(entry.last_error.as_deref(), Some("broker down"));

        store.mark_outbox_published(receipt.outbox_id).await.unwrap();
        assert!(store.pending_outbox(Duration::ZERO, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let store = InMemoryBookingStore::new();
        store.set_unavailable(true).await;

        let err = store.occupied_seats(None).await.unwrap_err();
        assert!(err.is_unavailable());
        assert!(store.book(new_booking(inception(), &["0-0"], 1)).await.is_err());
        assert!(store.ping().await.is_err());

        store.set_unavailable(false).await;
        assert!(store.occupied_seats(None).await.is_ok());
        assert!(store.ping().await.is_ok());
    }
}
