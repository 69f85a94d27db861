//! Purchase history endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use booking::{BookingRecord, Order};
use booking_store::BookingStore;
use chrono::{DateTime, Utc};
use notifications::NotificationQueue;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub user: String,
}

/// One booked seat, in the storage row shape.
#[derive(Debug, Serialize)]
pub struct BookingRecordResponse {
    pub id: i64,
    pub user_name: String,
    pub email: String,
    pub movie_title: String,
    pub seat_number: String,
    pub show_time: String,
    pub order_id: i64,
    pub created_at: DateTime<Utc>,
}

impl From<BookingRecord> for BookingRecordResponse {
    fn from(record: BookingRecord) -> Self {
        Self {
            id: record.id,
            seat_number: record.seat.to_string(),
            order_id: record.order_id.as_i64(),
            user_name: record.user_name,
            email: record.email,
            movie_title: record.movie_title,
            show_time: record.show_time,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub order_id: i64,
    pub movie: String,
    pub time: String,
    pub user: String,
    pub email: String,
    pub seats: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub total_cents: i64,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            order_id: order.order_id.as_i64(),
            movie: order.screening.movie,
            time: order.screening.show_time,
            user: order.user_name,
            email: order.email,
            seats: order.seats.iter().map(ToString::to_string).collect(),
            created_at: order.created_at,
            total_cents: order.total.cents(),
        }
    }
}

/// GET /my-bookings — every booked seat of a user, most recent first.
#[tracing::instrument(skip_all)]
pub async fn my_bookings<S, Q>(
    State(state): State<Arc<AppState<S, Q>>>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<Vec<BookingRecordResponse>>, ApiError>
where
    S: BookingStore + 'static,
    Q: NotificationQueue + 'static,
{
    let Query(query) = query?;
    let records = state.bookings.history(&query.user).await?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}

/// GET /my-orders — a user's bookings grouped into orders.
#[tracing::instrument(skip_all)]
pub async fn my_orders<S, Q>(
    State(state): State<Arc<AppState<S, Q>>>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<Vec<OrderResponse>>, ApiError>
where
    S: BookingStore + 'static,
    Q: NotificationQueue + 'static,
{
    let Query(query) = query?;
    let orders = state.bookings.orders_for(&query.user).await?;
    Ok(Json(orders.into_iter().map(Into::into).collect()))
}
