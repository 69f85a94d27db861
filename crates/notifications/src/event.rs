//! Events carried on the notification queue.

use chrono::{DateTime, Utc};
use common::{OrderId, Purchaser, Screening, SeatId};
use serde::{Deserialize, Serialize};

/// Payload of a confirmed booking: everything needed to notify the purchaser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingConfirmed {
    pub user: String,
    pub email: String,
    pub movie: String,
    pub seats: Vec<SeatId>,
    pub time: String,
    pub order_id: OrderId,
    pub timestamp: DateTime<Utc>,
}

impl BookingConfirmed {
    /// Creates the event for a committed order, stamped now.
    pub fn new(
        purchaser: &Purchaser,
        screening: &Screening,
        seats: Vec<SeatId>,
        order_id: OrderId,
    ) -> Self {
        Self {
            user: purchaser.name.clone(),
            email: purchaser.email.clone(),
            movie: screening.movie.clone(),
            seats,
            time: screening.show_time.clone(),
            order_id,
            timestamp: Utc::now(),
        }
    }
}

/// Messages published to the notification queue.
///
/// Serialized with an `event` tag, e.g. `{"event":"BOOKING_CONFIRMED", ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum NotificationEvent {
    #[serde(rename = "BOOKING_CONFIRMED")]
    BookingConfirmed(BookingConfirmed),
}

impl NotificationEvent {
    /// Returns the event type name as written on the wire.
    pub fn event_type(&self) -> &'static str {
        match self {
            NotificationEvent::BookingConfirmed(_) => "BOOKING_CONFIRMED",
        }
    }

    pub fn order_id(&self) -> OrderId {
        match self {
            NotificationEvent::BookingConfirmed(e) => e.order_id,
        }
    }
}

impl From<BookingConfirmed> for NotificationEvent {
    fn from(event: BookingConfirmed) -> Self {
        NotificationEvent::BookingConfirmed(event)
    }
}
