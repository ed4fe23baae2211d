use std::thread;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::{CatalogRefresher, LoadOutcome};
use crate::cache::CacheStore;

/// Events emitted by the refresh worker.
#[derive(Debug)]
pub enum RefreshEvent {
    /// A load cycle finished.
    Loaded {
        /// Catalog and provenance.
        outcome: LoadOutcome,
        /// The cycle bypassed the cache.
        forced: bool,
    },
}

#[derive(Debug, Clone, Copy)]
enum RefreshCommand {
    Load,
    Force,
}

/// Handle to a worker thread that owns a [`CatalogRefresher`].
///
/// Fetches run on a dedicated OS thread so blocking HTTP never stalls an async
/// frontend. Dropping every handle stops the worker.
#[derive(Debug, Clone)]
pub struct RefreshHandle {
    commands: mpsc::Sender<RefreshCommand>,
}

impl RefreshHandle {
    /// Spawn the worker. `build` runs on the worker thread.
    pub fn spawn<S, F>(build: F, events: mpsc::Sender<RefreshEvent>) -> Self
    where
        S: CacheStore + 'static,
        F: FnOnce() -> CatalogRefresher<S> + Send + 'static,
    {
        Self::spawn_with_clock(build, events, Utc::now)
    }

    /// Spawn the worker with an injected clock.
    pub fn spawn_with_clock<S, F, C>(build: F, events: mpsc::Sender<RefreshEvent>, clock: C) -> Self
    where
        S: CacheStore + 'static,
        F: FnOnce() -> CatalogRefresher<S> + Send + 'static,
        C: Fn() -> DateTime<Utc> + Send + 'static,
    {
        let (commands, mut receiver) = mpsc::channel::<RefreshCommand>(8);
        thread::spawn(move || {
            let refresher = build();
            while let Some(command) = receiver.blocking_recv() {
                let now = clock();
                let forced = matches!(command, RefreshCommand::Force);
                debug!(?command, %now, "refresh requested");
                let outcome = if forced {
                    refresher.fetch(now)
                } else {
                    refresher.load(now)
                };
                if events
                    .blocking_send(RefreshEvent::Loaded { outcome, forced })
                    .is_err()
                {
                    break;
                }
            }
            info!("refresh worker stopped");
        });
        Self { commands }
    }

    /// Ask for a cache-aware load. Returns false when the worker is gone or busy.
    pub fn request(&self) -> bool {
        self.commands.try_send(RefreshCommand::Load).is_ok()
    }

    /// Ask for a fetch that bypasses the current window.
    pub fn force(&self) -> bool {
        self.commands.try_send(RefreshCommand::Force).is_ok()
    }
}
