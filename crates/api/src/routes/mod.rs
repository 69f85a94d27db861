//! HTTP route handlers.

pub mod bookings;
pub mod history;
pub mod system;
