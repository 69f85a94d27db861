//! End-to-end booking scenarios against the in-memory store and queue.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use booking::{
    BookSeats, BookingError, BookingService, CancelSeats, Purchaser, Screening, SeatId,
    parse_seats,
};
use booking_store::InMemoryBookingStore;
use notifications::{
    InMemoryMailer, InMemoryQueue, NotificationWorker, OutboxRelay, Outcome, RetryPolicy,
};

type Service = BookingService<InMemoryBookingStore, InMemoryQueue>;

fn inception() -> Screening {
    Screening::new("Inception", "1:15 PM")
}

fn alice() -> Purchaser {
    Purchaser::new("alice", "alice@x.com")
}

fn setup() -> (Service, InMemoryBookingStore, InMemoryQueue) {
    let store = InMemoryBookingStore::new();
    let queue = InMemoryQueue::new();
    (
        BookingService::new(store.clone(), queue.clone()),
        store,
        queue,
    )
}

fn seat_set(seats: &[SeatId]) -> HashSet<SeatId> {
    seats.iter().copied().collect()
}

#[tokio::test]
async fn book_then_query_then_cancel() {
    let (service, _, _) = setup();
    assert!(service.occupied_seats(Some(&inception())).await.unwrap().is_empty());

    let seats = parse_seats(&["0-0", "0-1"]).unwrap();
    let confirmation = service
        .book(BookSeats::new(alice(), inception(), seats.clone()))
        .await
        .unwrap();

    let occupied = service.occupied_seats(Some(&inception())).await.unwrap();
    assert_eq!(seat_set(&occupied), seat_set(&seats));

    let history = service.history("alice").await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|r| r.order_id == confirmation.order_id));

    let released = service
        .cancel(CancelSeats::for_screening(
            inception(),
            vec![SeatId::new(0, 0)],
        ))
        .await
        .unwrap();
    assert_eq!(released, 1);

    let occupied = service.occupied_seats(Some(&inception())).await.unwrap();
    assert_eq!(occupied, vec![SeatId::new(0, 1)]);
    assert_eq!(service.history("alice").await.unwrap().len(), 1);
}

#[tokio::test]
async fn disjoint_bookings_accumulate() {
    let (service, _, _) = setup();
    service
        .book(BookSeats::new(alice(), inception(), vec![SeatId::new(1, 1)]))
        .await
        .unwrap();
    service
        .book(BookSeats::new(
            Purchaser::new("bob", "bob@x.com"),
            inception(),
            vec![SeatId::new(2, 2), SeatId::new(2, 3)],
        ))
        .await
        .unwrap();

    let occupied = service.occupied_seats(Some(&inception())).await.unwrap();
    assert_eq!(
        seat_set(&occupied),
        seat_set(&[SeatId::new(1, 1), SeatId::new(2, 2), SeatId::new(2, 3)])
    );
    assert_eq!(service.occupied_seats(None).await.unwrap().len(), 3);
}

#[tokio::test]
async fn overlapping_booking_is_rejected_whole() {
    let (service, store, _) = setup();
    service
        .book(BookSeats::new(alice(), inception(), vec![SeatId::new(3, 3)]))
        .await
        .unwrap();

    let result = service
        .book(BookSeats::new(
            Purchaser::new("bob", "bob@x.com"),
            inception(),
            vec![SeatId::new(3, 2), SeatId::new(3, 3)],
        ))
        .await;

    assert!(matches!(
        result,
        Err(BookingError::SeatConflict { seat, .. }) if seat == SeatId::new(3, 3)
    ));
    assert_eq!(store.record_count().await, 1);
    assert!(service.history("bob").await.unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_bookings_of_one_seat() {
    let (service, _, _) = setup();
    let service = Arc::new(service);

    let mut handles = Vec::new();
    for user in ["alice", "bob"] {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service
                .book(BookSeats::new(
                    Purchaser::new(user, format!("{user}@x.com")),
                    inception(),
                    vec![SeatId::new(5, 5)],
                ))
                .await
        }));
    }

    let mut successes = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(BookingError::SeatConflict { .. }) => conflicts += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!((successes, conflicts), (1, 1));
    assert_eq!(
        service.occupied_seats(Some(&inception())).await.unwrap(),
        vec![SeatId::new(5, 5)]
    );
}

#[tokio::test]
async fn same_seat_in_another_screening_is_free() {
    let (service, _, _) = setup();
    let late_show = Screening::new("Inception", "9:00 PM");
    service
        .book(BookSeats::new(alice(), inception(), vec![SeatId::new(0, 0)]))
        .await
        .unwrap();
    service
        .book(BookSeats::new(alice(), late_show.clone(), vec![SeatId::new(0, 0)]))
        .await
        .unwrap();

    // Scoped cancel leaves the other screening alone
    service
        .cancel(CancelSeats::for_screening(late_show.clone(), vec![SeatId::new(0, 0)]))
        .await
        .unwrap();
    assert_eq!(service.occupied_seats(Some(&inception())).await.unwrap().len(), 1);
    assert!(service.occupied_seats(Some(&late_show)).await.unwrap().is_empty());
}

#[tokio::test]
async fn unscoped_cancel_matches_every_screening() {
    let (service, _, _) = setup();
    let dune = Screening::new("Dune", "9:00 PM");
    service
        .book(BookSeats::new(alice(), inception(), vec![SeatId::new(0, 0)]))
        .await
        .unwrap();
    service
        .book(BookSeats::new(alice(), dune, vec![SeatId::new(0, 0)]))
        .await
        .unwrap();

    let released = service
        .cancel(CancelSeats::everywhere(vec![SeatId::new(0, 0)]))
        .await
        .unwrap();
    assert_eq!(released, 2);
}

#[tokio::test]
async fn cancelling_unbooked_seat_is_a_noop() {
    let (service, _, _) = setup();
    let released = service
        .cancel(CancelSeats::for_screening(inception(), vec![SeatId::new(7, 7)]))
        .await
        .unwrap();
    assert_eq!(released, 0);
}

#[tokio::test]
async fn storage_outage_surfaces_on_reads_and_writes() {
    let (service, store, _) = setup();
    store.set_unavailable(true).await;

    assert!(matches!(
        service.occupied_seats(Some(&inception())).await,
        Err(BookingError::StorageUnavailable(_))
    ));
    assert!(matches!(
        service
            .book(BookSeats::new(alice(), inception(), vec![SeatId::new(0, 0)]))
            .await,
        Err(BookingError::StorageUnavailable(_))
    ));
}

#[tokio::test]
async fn orders_group_history() {
    let (service, _, _) = setup();
    let first = service
        .book(BookSeats::new(
            alice(),
            inception(),
            vec![SeatId::new(0, 0), SeatId::new(0, 1)],
        ))
        .await
        .unwrap();
    let second = service
        .book(BookSeats::new(
            alice(),
            Screening::new("Dune", "9:00 PM"),
            vec![SeatId::new(4, 4)],
        ))
        .await
        .unwrap();

    let orders = service.orders_for("alice").await.unwrap();
    assert_eq!(orders.len(), 2);
    let ids: HashSet<_> = orders.iter().map(|o| o.order_id).collect();
    assert!(ids.contains(&first.order_id));
    assert!(ids.contains(&second.order_id));
    let inception_order = orders
        .iter()
        .find(|o| o.order_id == first.order_id)
        .unwrap();
    assert_eq!(inception_order.seats, vec![SeatId::new(0, 0), SeatId::new(0, 1)]);
    assert_eq!(inception_order.total.cents(), 2400);
}

#[tokio::test]
async fn confirmation_reaches_the_mailer() {
    let (service, _, queue) = setup();
    let mailer = InMemoryMailer::new();
    let confirmation = service
        .book(BookSeats::new(
            alice(),
            inception(),
            vec![SeatId::new(0, 0), SeatId::new(0, 1)],
        ))
        .await
        .unwrap();

    let worker = NotificationWorker::new(queue, mailer.clone(), RetryPolicy::default());
    let outcome = worker.process_next().await.unwrap();
    assert_eq!(
        outcome,
        Some(Outcome::Delivered {
            order_id: confirmation.order_id
        })
    );

    let sent = mailer.sent().await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].subject.contains("Inception"));
    assert!(sent[0].subject.contains(&confirmation.order_id.to_string()));
    assert!(sent[0].text_body.contains("0-0, 0-1"));
    assert!(sent[0].text_body.contains("1:15 PM"));
}

#[tokio::test]
async fn queue_outage_without_relay_never_delivers() {
    let (service, _, queue) = setup();
    let mailer = InMemoryMailer::new();
    queue.set_unavailable(true).await;

    let confirmation = service
        .book(BookSeats::new(alice(), inception(), vec![SeatId::new(6, 6)]))
        .await
        .unwrap();
    assert!(!confirmation.notification_queued);

    queue.set_unavailable(false).await;
    let worker = NotificationWorker::new(queue, mailer.clone(), RetryPolicy::default());
    assert!(worker.process_next().await.unwrap().is_none());
    assert!(mailer.sent().await.is_empty());
}

#[tokio::test]
async fn queue_outage_with_relay_delivers_later() {
    let (service, store, queue) = setup();
    let mailer = InMemoryMailer::new();
    queue.set_unavailable(true).await;

    let confirmation = service
        .book(BookSeats::new(alice(), inception(), vec![SeatId::new(6, 6)]))
        .await
        .unwrap();

    queue.set_unavailable(false).await;
    let relay = OutboxRelay::new(store, queue.clone()).with_min_age(Duration::ZERO);
    assert_eq!(relay.relay_pending().await.unwrap(), 1);

    let worker = NotificationWorker::new(queue, mailer.clone(), RetryPolicy::default());
    assert_eq!(
        worker.process_next().await.unwrap(),
        Some(Outcome::Delivered {
            order_id: confirmation.order_id
        })
    );
    assert_eq!(mailer.sent().await.len(), 1);
}
