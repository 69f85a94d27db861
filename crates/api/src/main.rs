//! API server entry point.

use anyhow::Context;
use api::{AppState, config::Config};
use booking::{BookingService, HallLayout, Money};
use booking_store::PostgresBookingStore;
use notifications::{OutboxRelay, RedisQueue};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if config.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    // 1. Initialize tracing
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;

    // 3. Connect the booking store and apply migrations
    let pool = PgPoolOptions::new()
        .max_connections(config.db_pool_size)
        .connect(&config.database_url)
        .await
        .context("failed to connect to PostgreSQL")?;
    let store = PostgresBookingStore::new(pool);
    store
        .run_migrations()
        .await
        .context("failed to run migrations")?;

    // 4. Notification queue; connects lazily on first publish
    let queue = RedisQueue::new(&config.redis_url, &config.notification_queue)
        .context("invalid REDIS_URL")?;

    // 5. Outbox relay
    let cancel = CancellationToken::new();
    let relay_task = if config.outbox_relay_enabled {
        let relay = OutboxRelay::new(store.clone(), queue.clone())
            .with_min_age(config.outbox_relay_min_age)
            .with_batch_size(config.outbox_relay_batch);
        let interval = config.outbox_relay_interval;
        let token = cancel.clone();
        tracing::info!(interval_secs = interval.as_secs(), "starting outbox relay");
        Some(tokio::spawn(async move { relay.run(interval, token).await }))
    } else {
        tracing::warn!("outbox relay disabled, notifications missed during queue outages are lost");
        None
    };

    // 6. Build the application
    let bookings = BookingService::new(store, queue)
        .with_layout(HallLayout::new(config.hall_rows, config.hall_cols))
        .with_seat_price(Money::from_cents(config.seat_price_cents));
    let app = api::create_app(AppState::new(bookings), metrics_handle);

    // 7. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    cancel.cancel();
    if let Some(task) = relay_task
        && let Err(e) = task.await
    {
        tracing::error!(error = %e, "outbox relay task failed");
    }

    tracing::info!("server shut down gracefully");
    Ok(())
}
