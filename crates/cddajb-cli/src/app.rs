//! Application state management.

use cddajb_core::{BlobStore, BoundedCache, Config, RebuildSummary};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Cached HTTP response payloads, keyed by request path and query.
pub type ResponseCache = BoundedCache<String, Arc<Value>>;

/// Shared application state.
pub struct App {
    /// Configuration
    pub config: Config,

    /// The blob store
    pub store: BlobStore,

    /// Read-through cache in front of the store, cleared on every rebuild
    pub cache: Arc<ResponseCache>,
}

impl App {
    /// Create a new application instance. No data is loaded yet.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        config.validate()?;

        let store = BlobStore::new(&config);
        let cache = Arc::new(ResponseCache::from_config(&config.cache));
        store.add_listener(cache.clone());

        info!(
            root = %config.data.root.display(),
            cache_capacity = config.cache.capacity,
            "Application initialized"
        );

        Ok(App {
            config,
            store,
            cache,
        })
    }

    /// Create an instance and build the index, waiting at most `timeout`.
    pub fn loaded(config: Config, timeout: Duration) -> anyhow::Result<Self> {
        let app = Self::new(config)?;
        app.rebuild_blocking(None, timeout)?;
        Ok(app)
    }

    /// Rebuild the index and wait for it to finish.
    pub fn rebuild_blocking(
        &self,
        note: Option<String>,
        timeout: Duration,
    ) -> anyhow::Result<RebuildSummary> {
        let handle = self
            .store
            .start_rebuild(note)
            .ok_or_else(|| anyhow::anyhow!("a rebuild is already in progress"))?;

        let summary = handle
            .wait_timeout(timeout)
            .ok_or_else(|| anyhow::anyhow!("index not ready after {}s", timeout.as_secs()))?;

        if summary.aborted {
            anyhow::bail!("rebuild aborted, see the rebuild report");
        }
        Ok(summary)
    }
}
