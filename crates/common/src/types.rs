use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier shared by every booking record of one purchase.
///
/// Order ids are assigned by the store, never by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(i64);

impl OrderId {
    /// Creates an order ID from a raw value.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for OrderId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<OrderId> for i64 {
    fn from(id: OrderId) -> Self {
        id.0
    }
}

/// Error returned when a seat identifier is not of the form `"row-col"`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid seat identifier '{0}': expected \"row-col\"")]
pub struct ParseSeatError(pub String);

/// A seat within a screening, addressed by zero-based row and column.
///
/// The wire and storage form is `"row-col"`, e.g. `"0-3"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SeatId {
    row: u16,
    col: u16,
}

impl SeatId {
    /// Creates a seat ID from a row and column.
    pub fn new(row: u16, col: u16) -> Self {
        Self { row, col }
    }

    pub fn row(&self) -> u16 {
        self.row
    }

    pub fn col(&self) -> u16 {
        self.col
    }
}

impl std::fmt::Display for SeatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.row, self.col)
    }
}

impl FromStr for SeatId {
    type Err = ParseSeatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseSeatError(s.to_string());
        let (row, col) = s.trim().split_once('-').ok_or_else(invalid)?;
        let row = row.parse::<u16>().map_err(|_| invalid())?;
        let col = col.parse::<u16>().map_err(|_| invalid())?;
        Ok(Self { row, col })
    }
}

impl TryFrom<String> for SeatId {
    type Error = ParseSeatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SeatId> for String {
    fn from(seat: SeatId) -> Self {
        seat.to_string()
    }
}

/// A specific showing of a movie. Seat occupancy is partitioned by screening.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Screening {
    pub movie: String,
    pub show_time: String,
}

impl Screening {
    pub fn new(movie: impl Into<String>, show_time: impl Into<String>) -> Self {
        Self {
            movie: movie.into(),
            show_time: show_time.into(),
        }
    }
}

impl std::fmt::Display for Screening {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} @ {}", self.movie, self.show_time)
    }
}

/// Caller identity as handed over by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchaser {
    pub name: String,
    pub email: String,
}

impl Purchaser {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}
