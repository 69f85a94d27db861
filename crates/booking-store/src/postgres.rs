use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    BookingReceipt, BookingRecord, NewBooking, OrderId, OutboxEntry, Result, Screening, SeatId,
    StoreError, store::BookingStore,
};

/// Name of the (screening, seat) uniqueness constraint in the bookings table.
const SEAT_CONSTRAINT: &str = "unique_screening_seat";

/// PostgreSQL-backed booking store.
#[derive(Clone)]
pub struct PostgresBookingStore {
    pool: PgPool,
}

impl PostgresBookingStore {
    /// Creates a new PostgreSQL booking store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("booking migrations applied");
        Ok(())
    }

    fn parse_seat(raw: &str) -> Result<SeatId> {
        raw.parse()
            .map_err(|e: common::ParseSeatError| StoreError::InvalidRecord(e.to_string()))
    }

    fn row_to_record(row: PgRow) -> Result<BookingRecord> {
        let seat: String = row.try_get("seat_number")?;
        Ok(BookingRecord {
            id: row.try_get("id")?,
            user_name: row.try_get("user_name")?,
            email: row.try_get("email")?,
            movie_title: row.try_get("movie_title")?,
            show_time: row.try_get("show_time")?,
            seat: Self::parse_seat(&seat)?,
            order_id: OrderId::new(row.try_get("order_id")?),
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        })
    }

    fn row_to_outbox(row: PgRow) -> Result<OutboxEntry> {
        Ok(OutboxEntry {
            id: row.try_get("id")?,
            order_id: OrderId::new(row.try_get("order_id")?),
            event_type: row.try_get("event_type")?,
            payload: row.try_get("payload")?,
            created_at: row.try_get("created_at")?,
            published_at: row.try_get("published_at")?,
            attempts: row.try_get("attempts")?,
            last_error: row.try_get("last_error")?,
        })
    }
}

#[async_trait]
impl BookingStore for PostgresBookingStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn occupied_seats(&self, screening: Option<&Screening>) -> Result<Vec<SeatId>> {
        let rows: Vec<String> = match screening {
            Some(screening) => {
                sqlx::query_scalar(
                    r#"
                    SELECT seat_number FROM bookings
                    WHERE movie_title = $1 AND show_time = $2
                    ORDER BY id ASC
                    "#,
                )
                .bind(&screening.movie)
                .bind(&screening.show_time)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_scalar("SELECT seat_number FROM bookings ORDER BY id ASC")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.iter().map(|raw| Self::parse_seat(raw)).collect()
    }

    async fn next_order_id(&self) -> Result<OrderId> {
        let id: i64 = sqlx::query_scalar("SELECT nextval('booking_order_seq')")
            .fetch_one(&self.pool)
            .await?;
        Ok(OrderId::new(id))
    }

    #[tracing::instrument(
        skip(self, booking),
        fields(order_id = %booking.order_id, seats = booking.seats.len())
    )]
    async fn book(&self, booking: NewBooking) -> Result<BookingReceipt> {
        let mut tx = self.pool.begin().await?;

        let mut records = Vec::with_capacity(booking.seats.len());
        for seat in &booking.seats {
            let row = sqlx::query(
                r#"
                INSERT INTO bookings (user_name, email, movie_title, seat_number, show_time, order_id)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id, user_name, email, movie_title, seat_number, show_time, order_id, created_at
                "#,
            )
            .bind(&booking.purchaser.name)
            .bind(&booking.purchaser.email)
            .bind(&booking.screening.movie)
            .bind(seat.to_string())
            .bind(&booking.screening.show_time)
            .bind(booking.order_id.as_i64())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                // The transaction is dropped on return, rolling back earlier seats
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.constraint() == Some(SEAT_CONSTRAINT)
                {
                    tracing::debug!(%seat, "seat already taken, rolling back");
                    return StoreError::SeatConflict {
                        screening: booking.screening.clone(),
                        seat: *seat,
                    };
                }
                StoreError::from(e)
            })?;

            records.push(Self::row_to_record(row)?);
        }

        let outbox_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO booking_outbox (order_id, event_type, payload)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(booking.order_id.as_i64())
        .bind(&booking.event_type)
        .bind(&booking.outbox_payload)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(BookingReceipt { records, outbox_id })
    }

    async fn cancel(&self, screening: Option<&Screening>, seats: &[SeatId]) -> Result<u64> {
        if seats.is_empty() {
            return Ok(0);
        }
        let seat_numbers: Vec<String> = seats.iter().map(ToString::to_string).collect();

        let result = match screening {
            Some(screening) => {
                sqlx::query(
                    r#"
                    DELETE FROM bookings
                    WHERE seat_number = ANY($1) AND movie_title = $2 AND show_time = $3
                    "#,
                )
                .bind(&seat_numbers)
                .bind(&screening.movie)
                .bind(&screening.show_time)
                .execute(&self.pool)
                .await?
            }
            None => {
                sqlx::query("DELETE FROM bookings WHERE seat_number = ANY($1)")
                    .bind(&seat_numbers)
                    .execute(&self.pool)
                    .await?
            }
        };

        Ok(result.rows_affected())
    }

    async fn bookings_for_purchaser(&self, user_name: &str) -> Result<Vec<BookingRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_name, email, movie_title, seat_number, show_time, order_id, created_at
            FROM bookings
            WHERE user_name = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_name)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_record).collect()
    }

    async fn pending_outbox(&self, min_age: Duration, limit: usize) -> Result<Vec<OutboxEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, event_type, payload, created_at, published_at, attempts, last_error
            FROM booking_outbox
            WHERE published_at IS NULL
              AND created_at <= NOW() - make_interval(secs => $1)
            ORDER BY created_at ASC, id ASC
            LIMIT $2
            "#,
        )
        .bind(min_age.as_secs_f64())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_outbox).collect()
    }

    async fn mark_outbox_published(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE booking_outbox SET published_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn record_outbox_failure(&self, id: i64, error: &str) -> Result<()> {
        sqlx::query(
            "UPDATE booking_outbox SET attempts = attempts + 1, last_error = $2 WHERE id = $1",
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
