//! Turns a booking event into a confirmation message.

use crate::event::BookingConfirmed;

use super::ConfirmationMessage;

/// Renders the confirmation for a booked order.
///
/// The subject names the movie and order; the body lists the purchaser,
/// order id, showtime and every seat in booking order.
pub fn render_confirmation(event: &BookingConfirmed) -> ConfirmationMessage {
    let seats = event
        .seats
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");

    let subject = format!(
        "🎟️ Booking Confirmed: {} (Order #{})",
        event.movie, event.order_id
    );

    let html_body = format!(
        concat!(
            "<h1>Booking Confirmed!</h1>",
            "<p>Hi <b>{user}</b>,</p>",
            "<p>Your tickets for <b>{movie}</b> are booked.</p>",
            "<ul>",
            "<li>Order ID: <b>{order}</b></li>",
            "<li>Time: {time}</li>",
            "<li>Seats: {seats}</li>",
            "</ul>",
            "<p>Enjoy the show!</p>",
        ),
        user = escape_html(&event.user),
        movie = escape_html(&event.movie),
        order = event.order_id,
        time = escape_html(&event.time),
        seats = escape_html(&seats),
    );

    let text_body = format!(
        "Booking Confirmed!\n\nHi {},\n\nYour tickets for {} are booked.\n\nOrder ID: {}\nTime: {}\nSeats: {}\n\nEnjoy the show!\n",
        event.user, event.movie, event.order_id, event.time, seats
    );

    ConfirmationMessage {
        to: event.email.clone(),
        subject,
        html_body,
        text_body,
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::{OrderId, SeatId};

    fn event() -> BookingConfirmed {
        BookingConfirmed {
            user: "alice".to_string(),
            email: "alice@x.com".to_string(),
            movie: "Inception".to_string(),
            seats: vec![SeatId::new(0, 0), SeatId::new(0, 1)],
            time: "1:15 PM".to_string(),
            order_id: OrderId::new(10_000),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_subject_names_movie_and_order() {
        let message = render_confirmation(&event());
        assert_eq!(
            message.subject,
            "🎟️ Booking Confirmed: Inception (Order #10000)"
        );
        assert_eq!(message.to, "alice@x.com");
    }

    #[test]
    fn test_body_reproduces_seats_and_order() {
        let message = render_confirmation(&event());
        for body in [&message.html_body, &message.text_body] {
            assert!(body.contains("alice"));
            assert!(body.contains("10000"));
            assert!(body.contains("1:15 PM"));
            assert!(body.contains("0-0, 0-1"));
        }
    }

    #[test]
    fn test_html_escapes_user_input() {
        let mut event = event();
        event.user = "<script>".to_string();
        event.movie = "Tom & Jerry".to_string();

        let message = render_confirmation(&event);
        assert!(message.html_body.contains("&lt;script&gt;"));
        assert!(message.html_body.contains("Tom &amp; Jerry"));
        assert!(!message.html_body.contains("<script>"));
    }
}
