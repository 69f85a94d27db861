//! Notification worker entry point.
//!
//! Consumes booking confirmation events from the queue and emails the
//! purchaser, retrying with backoff and dead-lettering what cannot be sent.

mod config;

use anyhow::Context;
use notifications::{ConsoleMailer, Mailer, NotificationWorker, RedisQueue, SmtpMailer};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::Config;

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
            tracing::info!("received SIGINT, stopping worker");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, stopping worker");
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

async fn run<M: Mailer>(config: &Config, queue: RedisQueue, mailer: M) {
    let worker = NotificationWorker::new(queue, mailer, config.retry.clone())
        .with_poll_interval(config.poll_interval);

    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        token.cancel();
    });

    worker.run(cancel).await;
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    // 1. Initialize tracing
    init_tracing(&config);

    // 2. Serve Prometheus metrics on their own port
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(config.metrics_addr())
        .install()
        .context("failed to install Prometheus exporter")?;

    // 3. Notification queue
    let queue = RedisQueue::new(&config.redis_url, &config.notification_queue)
        .context("invalid REDIS_URL")?;

    tracing::info!(
        queue = %config.notification_queue,
        max_attempts = config.retry.max_attempts,
        "starting notification worker"
    );

    // 4. Mail transport
    match &config.smtp {
        Some(smtp) => {
            let mailer = SmtpMailer::new(smtp).context("invalid SMTP settings")?;
            tracing::info!(host = %smtp.host, port = smtp.port, "sending mail via SMTP");
            run(&config, queue, mailer).await;
        }
        None => {
            tracing::warn!("SMTP_HOST not set, confirmation emails will only be logged");
            run(&config, queue, ConsoleMailer::new()).await;
        }
    }

    tracing::info!("worker shut down gracefully");
    Ok(())
}
