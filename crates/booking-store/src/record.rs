use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{OrderId, Purchaser, Screening, SeatId};

/// One persisted seat-occupancy fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRecord {
    /// Internal row id.
    pub id: i64,
    pub user_name: String,
    pub email: String,
    pub movie_title: String,
    pub show_time: String,
    pub seat: SeatId,
    pub order_id: OrderId,
    pub created_at: DateTime<Utc>,
}

impl BookingRecord {
    /// Returns the screening this record occupies a seat in.
    pub fn screening(&self) -> Screening {
        Screening::new(self.movie_title.as_str(), self.show_time.as_str())
    }

    /// Returns true if this record belongs to the given screening.
    pub fn is_for(&self, screening: &Screening) -> bool {
        self.movie_title == screening.movie && self.show_time == screening.show_time
    }
}

/// A booking to be written in a single transaction.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub purchaser: Purchaser,
    pub screening: Screening,
    pub seats: Vec<SeatId>,
    pub order_id: OrderId,
    /// Event type stored alongside the outbox payload.
    pub event_type: String,
    /// Serialized event written to the outbox in the same transaction.
    pub outbox_payload: serde_json::Value,
}

/// What a committed booking produced.
#[derive(Debug, Clone)]
pub struct BookingReceipt {
    /// Records in seat order as supplied.
    pub records: Vec<BookingRecord>,
    /// Row id of the outbox entry written with the booking.
    pub outbox_id: i64,
}

/// A pending or published event in the outbox.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxEntry {
    pub id: i64,
    pub order_id: OrderId,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    pub attempts: i32,
    pub last_error: Option<String>,
}

impl OutboxEntry {
    pub fn is_pending(&self) -> bool {
        self.published_at.is_none()
    }
}
