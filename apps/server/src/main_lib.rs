use std::sync::Arc;

use labdash_core::live::RefreshCoordinator;
use labdash_core::records::RecordStoreTrait;
use labdash_storage_sqlite::{open_record_store, SqliteRecordStore};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;

pub struct AppState {
    /// Concrete store, used for writes.
    pub store: Arc<SqliteRecordStore>,
    /// Mounts live views over the same store.
    pub coordinator: Arc<RefreshCoordinator>,
}

/// Installs the global subscriber. `LABDASH_LOG_FORMAT=json` switches to
/// JSON lines; `RUST_LOG` sets the filter (default `info`). Library crates
/// log through `log` and are bridged in.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LABDASH_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let store = Arc::new(open_record_store(
        &config.db_path,
        config.change_channel_capacity,
    )?);
    tracing::info!("Database path in use: {}", config.db_path);

    let record_store: Arc<dyn RecordStoreTrait> = store.clone();
    let coordinator = Arc::new(RefreshCoordinator::new(record_store, config.live_config()));

    Ok(Arc::new(AppState { store, coordinator }))
}
