pub mod error;
pub mod memory;
pub mod postgres;
pub mod record;
pub mod store;

pub use common::{OrderId, Purchaser, Screening, SeatId};
pub use error::{Result, StoreError};
pub use memory::InMemoryBookingStore;
pub use postgres::PostgresBookingStore;
pub use record::{BookingReceipt, BookingRecord, NewBooking, OutboxEntry};
pub use store::BookingStore;
