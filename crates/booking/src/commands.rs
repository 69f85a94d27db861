//! Booking commands.

use common::{Purchaser, Screening, SeatId};

use crate::error::BookingError;
use crate::hall::HallLayout;

/// Command to book one or more seats of a screening as a single order.
#[derive(Debug, Clone)]
pub struct BookSeats {
    pub purchaser: Purchaser,
    pub screening: Screening,
    pub seats: Vec<SeatId>,
}

impl BookSeats {
    pub fn new(purchaser: Purchaser, screening: Screening, seats: Vec<SeatId>) -> Self {
        Self {
            purchaser,
            screening,
            seats,
        }
    }

    /// Rejects incomplete requests and seats the hall does not have.
    pub fn validate(&self, layout: &HallLayout) -> Result<(), BookingError> {
        if self.purchaser.name.trim().is_empty() {
            return Err(BookingError::validation("user is required"));
        }
        if !self.purchaser.email.contains('@') {
            return Err(BookingError::validation("a valid email is required"));
        }
        if self.screening.movie.trim().is_empty() || self.screening.show_time.trim().is_empty() {
            return Err(BookingError::validation("movie and time are required"));
        }
        layout.validate(&self.seats)
    }
}

/// Command to release seats.
///
/// Without a screening every booking holding one of the seat ids is
/// released, whatever screening it belongs to.
#[derive(Debug, Clone)]
pub struct CancelSeats {
    pub screening: Option<Screening>,
    pub seats: Vec<SeatId>,
}

impl CancelSeats {
    /// Releases seats of one screening.
    pub fn for_screening(screening: Screening, seats: Vec<SeatId>) -> Self {
        Self {
            screening: Some(screening),
            seats,
        }
    }

    /// Releases seats across all screenings.
    pub fn everywhere(seats: Vec<SeatId>) -> Self {
        Self {
            screening: None,
            seats,
        }
    }
}
