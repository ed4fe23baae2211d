mod app;

use anyhow::Result;
use std::fs::{self, OpenOptions};

use gametrack_core::{
    cache::{CutoverClock, FileCacheStore, WindowedCache},
    catalog::CatalogFetcher,
    config::{self, AppConfig},
    curation::{CurationStore, FileKeyValueStore},
    refresh::{CatalogRefresher, RefreshHandle},
};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let config_path = config::ensure_default_config()?;
    let config = AppConfig::load()?;
    info!(path = %config_path.display(), data_dir = %config.data_dir.display(), "configuration loaded");

    let curation = CurationStore::load(FileKeyValueStore::new(config.curation_dir()));

    let (refresh_tx, refresh_rx) = mpsc::channel(8);
    let worker_config = config.clone();
    let refresh = RefreshHandle::spawn(
        move || {
            CatalogRefresher::new(
                CatalogFetcher::from_config(&worker_config.source),
                WindowedCache::new(
                    CutoverClock::new(worker_config.cache.cutover_hour),
                    FileCacheStore::new(worker_config.cache_dir()),
                ),
            )
        },
        refresh_tx,
    );

    let mut app = app::GametrackApp::new(&config, curation, refresh);
    app.attach_refresh(refresh_rx);
    app.run().await
}

fn init_logging() -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("gametrack.log");

    let env_filter = EnvFilter::from_default_env();

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(std::io::stdout);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .compact()
        .with_writer(move || {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
                .expect("failed to open log file")
        });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    Ok(())
}
