use std::{net::SocketAddr, time::Duration};

use anyhow::Context;
use labdash_core::live::LiveConfig;

pub struct Config {
    pub listen_addr: SocketAddr,
    pub db_path: String,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
    /// First delay before reopening a failed change channel.
    pub reconnect_initial_delay: Duration,
    /// Upper bound for the reconnect backoff.
    pub reconnect_max_delay: Duration,
    /// Events a change channel may fall behind before it is resynced.
    pub change_channel_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        let live = LiveConfig::default();
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            db_path: "./db/labdash.db".to_string(),
            cors_allow: vec!["*".to_string()],
            request_timeout: Duration::from_millis(30_000),
            reconnect_initial_delay: live.reconnect_initial_delay,
            reconnect_max_delay: live.reconnect_max_delay,
            change_channel_capacity: 256,
        }
    }
}

impl Config {
    /// Reads `LABDASH_*` variables (and a `.env` file if present) over the defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let listen_addr = match std::env::var("LABDASH_LISTEN_ADDR") {
            Ok(raw) => raw
                .parse()
                .with_context(|| format!("Invalid LABDASH_LISTEN_ADDR '{}'", raw))?,
            Err(_) => defaults.listen_addr,
        };
        let db_path = std::env::var("LABDASH_DB_PATH").unwrap_or(defaults.db_path);
        let cors_allow = std::env::var("LABDASH_CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|_| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            listen_addr,
            db_path,
            cors_allow,
            request_timeout: env_millis("LABDASH_REQUEST_TIMEOUT_MS", defaults.request_timeout),
            reconnect_initial_delay: env_millis(
                "LABDASH_FEED_RECONNECT_MS",
                defaults.reconnect_initial_delay,
            ),
            reconnect_max_delay: env_millis(
                "LABDASH_FEED_RECONNECT_MAX_MS",
                defaults.reconnect_max_delay,
            ),
            change_channel_capacity: std::env::var("LABDASH_CHANGE_CHANNEL_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.change_channel_capacity),
        })
    }

    pub fn live_config(&self) -> LiveConfig {
        LiveConfig::default()
            .with_reconnect_delays(self.reconnect_initial_delay, self.reconnect_max_delay)
    }
}

fn env_millis(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}
