//! Booking error types.

use booking_store::StoreError;
use common::{Screening, SeatId};
use thiserror::Error;

/// Errors that can occur during booking operations.
#[derive(Debug, Error)]
pub enum BookingError {
    /// The request was rejected before reaching the store.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A requested seat is already occupied. Nothing was booked.
    #[error("Seat {seat} is already taken for {screening}")]
    SeatConflict { screening: Screening, seat: SeatId },

    /// The store could not be reached.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Any other store failure.
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl BookingError {
    pub fn validation(msg: impl Into<String>) -> Self {
        BookingError::Validation(msg.into())
    }
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::SeatConflict { screening, seat } => {
                BookingError::SeatConflict { screening, seat }
            }
            StoreError::Unavailable(msg) => BookingError::StorageUnavailable(msg),
            other => BookingError::Store(other),
        }
    }
}
