//! Orders derived from booking records.

use booking_store::BookingRecord;
use chrono::{DateTime, Utc};
use common::{OrderId, Screening, SeatId};

use crate::money::Money;

/// All seats bought together in one screening.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub order_id: OrderId,
    pub screening: Screening,
    pub user_name: String,
    pub email: String,
    /// Seats in the order they were booked.
    pub seats: Vec<SeatId>,
    pub created_at: DateTime<Utc>,
    pub total: Money,
}

/// Groups records by screening and order id.
///
/// Orders keep the position of their first record, so most-recent-first
/// input yields most-recent-first orders.
pub fn group_orders(records: &[BookingRecord], seat_price: Money) -> Vec<Order> {
    let mut orders: Vec<(Order, Vec<(i64, SeatId)>)> = Vec::new();

    for record in records {
        let existing = orders.iter_mut().find(|(order, _)| {
            order.order_id == record.order_id && record.is_for(&order.screening)
        });

        match existing {
            Some((_, seats)) => seats.push((record.id, record.seat)),
            None => orders.push((
                Order {
                    order_id: record.order_id,
                    screening: record.screening(),
                    user_name: record.user_name.clone(),
                    email: record.email.clone(),
                    seats: Vec::new(),
                    created_at: record.created_at,
                    total: Money::zero(),
                },
                vec![(record.id, record.seat)],
            )),
        }
    }

    orders
        .into_iter()
        .map(|(mut order, mut seats)| {
            seats.sort_by_key(|(id, _)| *id);
            order.seats = seats.into_iter().map(|(_, seat)| seat).collect();
            order.total = seat_price.times(order.seats.len());
            order
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(id: i64, movie: &str, seat: &str, order: i64, minute: u32) -> BookingRecord {
        BookingRecord {
            id,
            user_name: "alice".into(),
            email: "alice@x.com".into(),
            movie_title: movie.into(),
            show_time: "1:15 PM".into(),
            seat: seat.parse().unwrap(),
            order_id: OrderId::new(order),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap(),
        }
    }

    #[test]
    fn test_groups_by_order_preserving_recency() {
        // Most recent first, as history returns them
        let records = vec![
            record(4, "Dune", "2-2", 11, 30),
            record(3, "Dune", "2-1", 11, 30),
            record(2, "Inception", "0-1", 10, 10),
            record(1, "Inception", "0-0", 10, 10),
        ];

        let orders = group_orders(&records, Money::from_cents(1200));

        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].order_id, OrderId::new(11));
        assert_eq!(orders[0].screening.movie, "Dune");
        assert_eq!(
            orders[0].seats,
            vec![SeatId::new(2, 1), SeatId::new(2, 2)]
        );
        assert_eq!(orders[0].total.cents(), 2400);
        assert_eq!(orders[1].order_id, OrderId::new(10));
        assert_eq!(orders[1].seats.len(), 2);
    }

    #[test]
    fn test_same_order_id_in_other_screening_is_separate() {
        let records = vec![
            record(2, "Dune", "0-0", 10, 10),
            record(1, "Inception", "0-0", 10, 10),
        ];

        let orders = group_orders(&records, Money::from_cents(1200));
        assert_eq!(orders.len(), 2);
    }

    #[test]
    fn test_empty_history_has_no_orders() {
        assert!(group_orders(&[], Money::from_cents(1200)).is_empty());
    }
}
