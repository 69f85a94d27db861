//! Seat inventory, booking, and cancellation endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use booking::{BookSeats, CancelSeats, Purchaser, Screening, parse_seats};
use booking_store::BookingStore;
use notifications::NotificationQueue;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct InventoryQuery {
    pub movie: Option<String>,
    pub time: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateBookingRequest {
    #[validate(length(min = 1, message = "user is required"))]
    pub user: String,
    #[validate(email(message = "a valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "movie is required"))]
    pub movie: String,
    #[validate(length(min = 1, message = "time is required"))]
    pub time: String,
    #[validate(length(min = 1, message = "at least one seat is required"))]
    pub seats: Vec<String>,
    /// Sent by older clients. Ignored; the server assigns order ids.
    pub order_id: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct CancelBookingRequest {
    #[validate(length(min = 1, message = "at least one seat is required"))]
    pub seats: Vec<String>,
    pub movie: Option<String>,
    pub time: Option<String>,
}

// -- Response types --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingCreatedResponse {
    pub success: bool,
    pub order_id: i64,
    pub seats: Vec<String>,
    pub total_cents: i64,
    pub notification_queued: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub success: bool,
    pub released: u64,
}

/// Both or neither of movie and time; one alone is ambiguous. Blank values
/// count as absent.
fn screening_filter(
    movie: Option<String>,
    time: Option<String>,
) -> Result<Option<Screening>, ApiError> {
    let present = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
    match (present(movie), present(time)) {
        (Some(movie), Some(time)) => Ok(Some(Screening::new(movie, time))),
        (None, None) => Ok(None),
        _ => Err(ApiError::BadRequest(
            "movie and time must be given together".to_string(),
        )),
    }
}

// -- Handlers --

/// GET /bookings — occupied seats of a screening, or of all screenings.
#[tracing::instrument(skip_all)]
pub async fn inventory<S, Q>(
    State(state): State<Arc<AppState<S, Q>>>,
    query: Result<Query<InventoryQuery>, QueryRejection>,
) -> Result<Json<Vec<String>>, ApiError>
where
    S: BookingStore + 'static,
    Q: NotificationQueue + 'static,
{
    let Query(query) = query?;
    let screening = screening_filter(query.movie, query.time)?;

    let seats = state.bookings.occupied_seats(screening.as_ref()).await?;
    Ok(Json(seats.iter().map(ToString::to_string).collect()))
}

/// POST /bookings — book seats as one order.
#[tracing::instrument(skip_all)]
pub async fn create<S, Q>(
    State(state): State<Arc<AppState<S, Q>>>,
    payload: Result<Json<CreateBookingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BookingCreatedResponse>), ApiError>
where
    S: BookingStore + 'static,
    Q: NotificationQueue + 'static,
{
    let Json(req) = payload?;
    req.validate()?;
    if let Some(client_id) = &req.order_id {
        tracing::debug!(%client_id, "ignoring client-supplied order id");
    }

    let cmd = BookSeats::new(
        Purchaser::new(req.user, req.email),
        Screening::new(req.movie, req.time),
        parse_seats(&req.seats)?,
    );
    let confirmation = state.bookings.book(cmd).await?;

    let message = if confirmation.notification_queued {
        "Booking confirmed! A confirmation email is on its way."
    } else {
        "Booking confirmed! Your confirmation email may be delayed."
    };

    Ok((
        StatusCode::CREATED,
        Json(BookingCreatedResponse {
            success: true,
            order_id: confirmation.order_id.as_i64(),
            seats: confirmation.seats.iter().map(ToString::to_string).collect(),
            total_cents: confirmation.total.cents(),
            notification_queued: confirmation.notification_queued,
            message: message.to_string(),
        }),
    ))
}

/// DELETE /bookings — release seats.
#[tracing::instrument(skip_all)]
pub async fn cancel<S, Q>(
    State(state): State<Arc<AppState<S, Q>>>,
    payload: Result<Json<CancelBookingRequest>, JsonRejection>,
) -> Result<Json<CancelResponse>, ApiError>
where
    S: BookingStore + 'static,
    Q: NotificationQueue + 'static,
{
    let Json(req) = payload?;
    req.validate()?;

    let seats = parse_seats(&req.seats)?;
    let cmd = match screening_filter(req.movie, req.time)? {
        Some(screening) => CancelSeats::for_screening(screening, seats),
        None => CancelSeats::everywhere(seats),
    };
    let released = state.bookings.cancel(cmd).await?;

    Ok(Json(CancelResponse {
        success: true,
        released,
    }))
}
