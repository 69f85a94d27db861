//! Booking service: inventory, booking, cancellation, and history.

use booking_store::{BookingRecord, BookingStore, NewBooking, StoreError};
use common::{OrderId, Screening, SeatId};
use notifications::{BookingConfirmed, NotificationEvent, NotificationQueue};

use crate::commands::{BookSeats, CancelSeats};
use crate::error::BookingError;
use crate::hall::HallLayout;
use crate::money::{DEFAULT_SEAT_PRICE_CENTS, Money};
use crate::order::{Order, group_orders};

/// An accepted booking.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingConfirmation {
    pub order_id: OrderId,
    pub screening: Screening,
    pub seats: Vec<SeatId>,
    pub total: Money,
    /// False when the queue was unreachable and the confirmation waits in
    /// the outbox.
    pub notification_queued: bool,
}

/// Service for seat bookings.
///
/// Seat uniqueness is enforced by the store; the service never locks.
pub struct BookingService<S, Q> {
    store: S,
    queue: Q,
    layout: HallLayout,
    seat_price: Money,
}

impl<S: BookingStore, Q: NotificationQueue> BookingService<S, Q> {
    /// Creates a service with the default 8x8 hall and flat seat price.
    pub fn new(store: S, queue: Q) -> Self {
        Self {
            store,
            queue,
            layout: HallLayout::default(),
            seat_price: Money::from_cents(DEFAULT_SEAT_PRICE_CENTS),
        }
    }

    pub fn with_layout(mut self, layout: HallLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_seat_price(mut self, seat_price: Money) -> Self {
        self.seat_price = seat_price;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn layout(&self) -> HallLayout {
        self.layout
    }

    pub fn seat_price(&self) -> Money {
        self.seat_price
    }

    /// Checks that the booking store is reachable.
    pub async fn ping(&self) -> Result<(), BookingError> {
        Ok(self.store.ping().await?)
    }

    /// Returns occupied seats of a screening, or of all screenings.
    #[tracing::instrument(skip(self))]
    pub async fn occupied_seats(
        &self,
        screening: Option<&Screening>,
    ) -> Result<Vec<SeatId>, BookingError> {
        Ok(self.store.occupied_seats(screening).await?)
    }

    /// Books every requested seat as one order, or none of them.
    ///
    /// After the commit the confirmation event is published directly. If the
    /// queue cannot take it the booking still succeeds and the event stays
    /// in the outbox for the relay.
    #[tracing::instrument(
        skip(self, cmd),
        fields(
            user = %cmd.purchaser.name,
            screening = %cmd.screening,
            seats = cmd.seats.len(),
        )
    )]
    pub async fn book(&self, cmd: BookSeats) -> Result<BookingConfirmation, BookingError> {
        cmd.validate(&self.layout)?;
        let start = std::time::Instant::now();

        let order_id = self.store.next_order_id().await?;
        let event: NotificationEvent =
            BookingConfirmed::new(&cmd.purchaser, &cmd.screening, cmd.seats.clone(), order_id)
                .into();

        let receipt = self
            .store
            .book(NewBooking {
                purchaser: cmd.purchaser,
                screening: cmd.screening.clone(),
                seats: cmd.seats.clone(),
                order_id,
                event_type: event.event_type().to_string(),
                outbox_payload: serde_json::to_value(&event).map_err(StoreError::from)?,
            })
            .await
            .inspect_err(|e| {
                if let StoreError::SeatConflict { seat, .. } = e {
                    metrics::counter!("booking_seat_conflicts_total").increment(1);
                    tracing::info!(%seat, "seat conflict, booking rejected");
                }
            })?;

        let duration = start.elapsed().as_secs_f64();
        metrics::histogram!("booking_duration_seconds").record(duration);
        metrics::counter!("bookings_created_total").increment(1);
        tracing::info!(%order_id, duration, "booking committed");

        let notification_queued = self.publish(&event, receipt.outbox_id).await;

        Ok(BookingConfirmation {
            order_id,
            screening: cmd.screening,
            total: self.seat_price.times(cmd.seats.len()),
            seats: cmd.seats,
            notification_queued,
        })
    }

    async fn publish(&self, event: &NotificationEvent, outbox_id: i64) -> bool {
        if let Err(e) = self.queue.publish(event).await {
            metrics::counter!("booking_publish_skipped_total").increment(1);
            tracing::warn!(
                order_id = %event.order_id(),
                error = %e,
                "notification queue unavailable, confirmation left in outbox"
            );
            return false;
        }

        if let Err(e) = self.store.mark_outbox_published(outbox_id).await {
            // The relay may publish it a second time
            tracing::warn!(outbox_id, error = %e, "failed to mark outbox entry published");
        }
        true
    }

    /// Releases seats. Matching nothing is not an error.
    #[tracing::instrument(skip(self, cmd), fields(seats = cmd.seats.len()))]
    pub async fn cancel(&self, cmd: CancelSeats) -> Result<u64, BookingError> {
        if cmd.screening.is_none() {
            tracing::warn!("cancelling without a screening, seats match across all screenings");
        }

        let released = self
            .store
            .cancel(cmd.screening.as_ref(), &cmd.seats)
            .await?;
        tracing::info!(released, "seats released");
        Ok(released)
    }

    /// Returns every booking record of a purchaser, most recent first.
    #[tracing::instrument(skip(self))]
    pub async fn history(&self, user_name: &str) -> Result<Vec<BookingRecord>, BookingError> {
        if user_name.trim().is_empty() {
            return Err(BookingError::validation("user is required"));
        }
        Ok(self.store.bookings_for_purchaser(user_name).await?)
    }

    /// Returns a purchaser's history grouped into orders, most recent first.
    #[tracing::instrument(skip(self))]
    pub async fn orders_for(&self, user_name: &str) -> Result<Vec<Order>, BookingError> {
        let records = self.history(user_name).await?;
        Ok(group_orders(&records, self.seat_price))
    }
}
