pub mod bridge;
pub mod config;
pub mod db;
pub mod error;
pub mod fetch;
pub mod models;
pub mod session;
pub mod settings;
pub mod skip;
mod utils;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use anyhow::Context;
use log::{info, warn};

use bridge::BridgeHost;
use config::RuntimeConfig;
use db::Database;
use fetch::{CachedIntervalSource, HttpIntervalSource};
use session::SessionManager;
use settings::SettingsStore;

pub use config::SkipperConfig;
pub use error::{FetchError, SkipError};
pub use models::{IntervalKey, SkipInterval, UserPreferences, VideoId};
pub use session::{PlaybackHost, SkipperHandle, UiEvent};

/// Run the skipper as a native-messaging host on stdin/stdout until stdin closes.
pub fn run() -> anyhow::Result<()> {
    let config = RuntimeConfig::from_env();

    // stdout carries the host protocol, so logs go to stderr.
    let default_level = if config.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Stderr)
        .init();

    info!("Skipper starting up (backend {})", config.backend_url);

    std::fs::create_dir_all(&config.data_dir).with_context(|| {
        format!("failed to create data directory {}", config.data_dir.display())
    })?;

    let settings = Arc::new(SettingsStore::new(config.settings_path())?);

    let database = match Database::new(config.database_path()) {
        Ok(database) => database,
        Err(err) => {
            warn!("interval cache unavailable, continuing without persistence: {err:#}");
            Database::in_memory()?
        }
    };

    let source = CachedIntervalSource::new(
        HttpIntervalSource::new(&config.backend_url, config.fetch_timeout)?,
        database,
        config.cache_ttl,
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    runtime.block_on(async move {
        match source.prune().await {
            Ok(0) => {}
            Ok(removed) => info!("pruned {removed} expired cache entries"),
            Err(err) => warn!("failed to prune interval cache: {err:#}"),
        }

        let (host, outbound) = BridgeHost::new();
        let host = Arc::new(host);
        let (handle, commands) = session::channel();

        let manager = SessionManager::new(host.clone(), Arc::new(source), settings, handle.clone());
        let manager_task = tokio::spawn(manager.run(commands));

        let result = bridge::serve(
            tokio::io::stdin(),
            tokio::io::stdout(),
            handle,
            &host,
            outbound,
        )
        .await;

        if let Err(err) = manager_task.await {
            warn!("skip manager task ended abnormally: {err}");
        }
        result
    })
}
