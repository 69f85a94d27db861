use std::time::Duration;

use async_trait::async_trait;

use crate::{
    BookingReceipt, BookingRecord, NewBooking, OrderId, OutboxEntry, Result, Screening, SeatId,
};

/// Core trait for booking persistence.
///
/// Implementations must enforce seat uniqueness per screening themselves;
/// callers never coordinate in-process.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Checks that the store is reachable.
    async fn ping(&self) -> Result<()>;

    /// Returns the occupied seats of a screening, or of every screening when
    /// `screening` is `None`.
    async fn occupied_seats(&self, screening: Option<&Screening>) -> Result<Vec<SeatId>>;

    /// Allocates a fresh order identifier.
    async fn next_order_id(&self) -> Result<OrderId>;

    /// Records every seat of the booking and its outbox event atomically.
    ///
    /// Fails with `SeatConflict` if any seat is already occupied for the
    /// screening; nothing is written in that case.
    async fn book(&self, booking: NewBooking) -> Result<BookingReceipt>;

    /// Deletes the bookings holding the given seats.
    ///
    /// With a screening, only that screening's seats are released. Without
    /// one, a seat id matches across all screenings. Returns the number of
    /// records removed; zero is not an error.
    async fn cancel(&self, screening: Option<&Screening>, seats: &[SeatId]) -> Result<u64>;

    /// Returns all records of a purchaser, most recent first.
    async fn bookings_for_purchaser(&self, user_name: &str) -> Result<Vec<BookingRecord>>;

    /// Returns unpublished outbox entries created at least `min_age` ago,
    /// oldest first.
    async fn pending_outbox(&self, min_age: Duration, limit: usize) -> Result<Vec<OutboxEntry>>;

    /// Marks an outbox entry as published.
    async fn mark_outbox_published(&self, id: i64) -> Result<()>;

    /// Records a failed relay attempt for an outbox entry.
    async fn record_outbox_failure(&self, id: i64, error: &str) -> Result<()>;
}
