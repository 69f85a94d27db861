use thiserror::Error;

use crate::{Screening, SeatId};

/// Errors that can occur when interacting with the booking store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The seat is already occupied for this screening.
    /// Raised from the uniqueness constraint, the whole booking is rolled back.
    #[error("Seat {seat} is already taken for {screening}")]
    SeatConflict { screening: Screening, seat: SeatId },

    /// The store could not be reached (connection refused, pool exhausted, ...).
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// A stored row could not be mapped back to a domain value.
    #[error("Invalid stored record: {0}")]
    InvalidRecord(String),

    /// Any other database error.
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed => StoreError::Unavailable(err.to_string()),
            other => StoreError::Database(other),
        }
    }
}

impl StoreError {
    /// Returns true if the error means the store could not be reached at all.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Result type for booking store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
