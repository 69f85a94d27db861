//! Auditorium seat grid.

use std::collections::HashSet;

use common::SeatId;

use crate::error::BookingError;

pub const DEFAULT_ROWS: u16 = 8;
pub const DEFAULT_COLS: u16 = 8;

/// Dimensions of the seat grid shared by every screening.
///
/// Seats are addressed by zero-based row and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HallLayout {
    rows: u16,
    cols: u16,
}

impl Default for HallLayout {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
        }
    }
}

impl HallLayout {
    /// Creates a layout; zero dimensions are raised to one.
    pub fn new(rows: u16, cols: u16) -> Self {
        Self {
            rows: rows.max(1),
            cols: cols.max(1),
        }
    }

    pub fn rows(&self) -> u16 {
        self.rows
    }

    pub fn cols(&self) -> u16 {
        self.cols
    }

    pub fn capacity(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    pub fn contains(&self, seat: SeatId) -> bool {
        seat.row() < self.rows && seat.col() < self.cols
    }

    /// Checks a requested seat set: non-empty, inside the hall, no repeats.
    pub fn validate(&self, seats: &[SeatId]) -> Result<(), BookingError> {
        if seats.is_empty() {
            return Err(BookingError::validation("at least one seat is required"));
        }

        let mut seen = HashSet::with_capacity(seats.len());
        for seat in seats {
            if !self.contains(*seat) {
                return Err(BookingError::validation(format!(
                    "seat {seat} is outside the {}x{} hall",
                    self.rows, self.cols
                )));
            }
            if !seen.insert(*seat) {
                return Err(BookingError::validation(format!(
                    "seat {seat} is requested more than once"
                )));
            }
        }
        Ok(())
    }
}

/// Parses `"row-col"` seat strings, rejecting the first malformed one.
pub fn parse_seats<S: AsRef<str>>(raw: &[S]) -> Result<Vec<SeatId>, BookingError> {
    raw.iter()
        .map(|s| {
            s.as_ref()
                .parse()
                .map_err(|e: common::ParseSeatError| BookingError::validation(e.to_string()))
        })
        .collect()
}
