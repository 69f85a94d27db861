//! Seat booking for cinema screenings.
//!
//! This crate provides:
//! - [`BookingService`] for inventory, booking, cancellation and history
//! - [`HallLayout`] seat grid validation
//! - flat per-seat pricing via [`Money`]
//! - orders derived from booking records

pub mod commands;
pub mod error;
pub mod hall;
pub mod money;
pub mod order;
pub mod service;

pub use booking_store::{BookingRecord, OrderId, Purchaser, Screening, SeatId};
pub use commands::{BookSeats, CancelSeats};
pub use error::BookingError;
pub use hall::{HallLayout, parse_seats};
pub use money::Money;
pub use order::{Order, group_orders};
pub use service::{BookingConfirmation, BookingService};
