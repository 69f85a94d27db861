//! HTTP API server for seat booking.
//!
//! Provides REST endpoints for seat inventory, booking, cancellation and
//! purchase history, with structured logging (tracing) and Prometheus
//! metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use booking::BookingService;
use booking_store::BookingStore;
use metrics_exporter_prometheus::PrometheusHandle;
use notifications::NotificationQueue;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S, Q> {
    pub bookings: BookingService<S, Q>,
}

impl<S: BookingStore, Q: NotificationQueue> AppState<S, Q> {
    pub fn new(bookings: BookingService<S, Q>) -> Arc<Self> {
        Arc::new(Self { bookings })
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, Q>(state: Arc<AppState<S, Q>>, metrics_handle: PrometheusHandle) -> Router
where
    S: BookingStore + 'static,
    Q: NotificationQueue + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::system::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::system::health::<S, Q>))
        .route(
            "/bookings",
            get(routes::bookings::inventory::<S, Q>)
                .post(routes::bookings::create::<S, Q>)
                .delete(routes::bookings::cancel::<S, Q>),
        )
        .route("/my-bookings", get(routes::history::my_bookings::<S, Q>))
        .route("/my-orders", get(routes::history::my_orders::<S, Q>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
