//! Value types shared by the booking store, the booking service and the
//! notification pipeline.

pub mod types;

pub use types::{OrderId, ParseSeatError, Purchaser, Screening, SeatId};
