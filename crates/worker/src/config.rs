//! Worker configuration loaded from environment variables.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use notifications::{RetryPolicy, SmtpConfig};

/// Worker configuration.
///
/// Reads from environment variables:
/// - `REDIS_URL` — notification broker (default: `redis://127.0.0.1:6379`)
/// - `NOTIFICATION_QUEUE` — queue name (default: `notifications`)
/// - `SMTP_HOST` — SMTP relay; when unset, emails are logged instead of sent
/// - `SMTP_PORT`, `SMTP_USER`, `SMTP_PASSWORD`, `SMTP_FROM`
/// - `NOTIFY_MAX_ATTEMPTS` — deliveries before dead-lettering (default: `5`)
/// - `NOTIFY_INITIAL_BACKOFF_MS`, `NOTIFY_MAX_BACKOFF_MS` — retry delays
/// - `NOTIFY_POLL_INTERVAL_MS` — idle poll interval (default: `1000`)
/// - `METRICS_PORT` — Prometheus scrape port (default: `9100`)
/// - `RUST_LOG`, `LOG_FORMAT` — as for the API server
#[derive(Debug, Clone)]
pub struct Config {
    pub redis_url: String,
    pub notification_queue: String,
    pub smtp: Option<SmtpConfig>,
    pub retry: RetryPolicy,
    pub poll_interval: Duration,
    pub metrics_port: u16,
    pub log_level: String,
    pub log_json: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from any key lookup. Unparseable values fall back
    /// to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let smtp = lookup("SMTP_HOST")
            .filter(|host| !host.trim().is_empty())
            .map(|host| {
                let base = SmtpConfig::new(host);
                SmtpConfig {
                    port: parse_or(lookup("SMTP_PORT"), base.port),
                    from: lookup("SMTP_FROM").unwrap_or(base.from),
                    user: lookup("SMTP_USER"),
                    password: lookup("SMTP_PASSWORD"),
                    host: base.host,
                }
            });

        let retry = RetryPolicy::builder()
            .max_attempts(parse_or(
                lookup("NOTIFY_MAX_ATTEMPTS"),
                defaults.retry.max_attempts,
            ))
            .initial_delay(millis_or(
                lookup("NOTIFY_INITIAL_BACKOFF_MS"),
                defaults.retry.initial_delay,
            ))
            .max_delay(millis_or(
                lookup("NOTIFY_MAX_BACKOFF_MS"),
                defaults.retry.max_delay,
            ))
            .build();

        Self {
            redis_url: lookup("REDIS_URL").unwrap_or(defaults.redis_url),
            notification_queue: lookup("NOTIFICATION_QUEUE").unwrap_or(defaults.notification_queue),
            smtp,
            retry,
            poll_interval: millis_or(lookup("NOTIFY_POLL_INTERVAL_MS"), defaults.poll_interval),
            metrics_port: parse_or(lookup("METRICS_PORT"), defaults.metrics_port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_json: lookup("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),
        }
    }

    /// Address the Prometheus exporter listens on.
    pub fn metrics_addr(&self) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), self.metrics_port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".to_string(),
            notification_queue: notifications::DEFAULT_QUEUE_NAME.to_string(),
            smtp: None,
            retry: RetryPolicy::default(),
            poll_interval: notifications::worker::DEFAULT_POLL_INTERVAL,
            metrics_port: 9100,
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn millis_or(raw: Option<String>, default: Duration) -> Duration {
    raw.and_then(|v| v.trim().parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_use_console_mailer() {
        let config = from_pairs(&[]);
        assert!(config.smtp.is_none());
        assert_eq!(config.notification_queue, "notifications");
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.metrics_addr().port(), 9100);
    }

    #[test]
    fn test_smtp_settings() {
        let config = from_pairs(&[
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_PORT", "2525"),
            ("SMTP_USER", "mailer"),
            ("SMTP_PASSWORD", "secret"),
        ]);
        let smtp = config.smtp.unwrap();
        assert_eq!(smtp.host, "smtp.example.com");
        assert_eq!(smtp.port, 2525);
        assert_eq!(smtp.user.as_deref(), Some("mailer"));
        assert_eq!(smtp.password.as_deref(), Some("secret"));
        assert_eq!(smtp.from, notifications::mail::DEFAULT_SENDER);
    }

    #[test]
    fn test_blank_smtp_host_is_ignored() {
        let config = from_pairs(&[("SMTP_HOST", "  ")]);
        assert!(config.smtp.is_none());
    }

    #[test]
    fn test_retry_overrides() {
        let config = from_pairs(&[
            ("NOTIFY_MAX_ATTEMPTS", "3"),
            ("NOTIFY_INITIAL_BACKOFF_MS", "250"),
            ("NOTIFY_MAX_BACKOFF_MS", "not-a-number"),
            ("NOTIFY_POLL_INTERVAL_MS", "50"),
        ]);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.initial_delay, Duration::from_millis(250));
        assert_eq!(config.retry.max_delay, Duration::from_secs(300));
        assert_eq!(config.poll_interval, Duration::from_millis(50));
    }

    #[test]
    fn test_zero_attempts_still_delivers_once() {
        let config = from_pairs(&[("NOTIFY_MAX_ATTEMPTS", "0")]);
        assert_eq!(config.retry.max_attempts, 1);
    }
}
