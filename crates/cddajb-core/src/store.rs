//! The blob store: directory scan, background rebuilds and gated reads.
//!
//! The store owns the current [`Snapshot`] behind an `ArcSwap`. Readers load
//! the pointer without taking a lock and keep that snapshot for the whole
//! call. A rebuild runs on its own thread, builds a fresh snapshot off to the
//! side and publishes it with a single pointer swap.
//!
//! ## Readiness
//!
//! The store is ready except while a rebuild is in flight. Content reads
//! ([`get`](BlobStore::get), [`search`](BlobStore::search),
//! [`types_for`](BlobStore::types_for), [`other_for`](BlobStore::other_for),
//! [`list_other`](BlobStore::list_other)) fail fast with
//! [`StoreError::NotReady`] during a rebuild. [`types`](BlobStore::types) is
//! always answered from whatever snapshot is current.
//!
//! ## Rebuild lifecycle
//!
//! ```text
//! Ready --rebuild()--> Building --(done | fault)--> Ready
//! ```
//!
//! Only one rebuild runs at a time; a second trigger is a no-op. Per-file
//! failures are written to the rebuild report and never abort the rebuild.
//! A fault in the rebuild body is caught, reported, and readiness is
//! restored, so the store never stays in `Building`.

use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::indexer::{Indexer, ID_KEYS};
use crate::report::RebuildLog;
use crate::scan::{self, DataFile};
use crate::search::SearchQuery;
use crate::snapshot::{Snapshot, SnapshotBuilder};
use crate::types::{Blob, CrossRefs, RebuildSummary, SearchHit, TypeSet};
use arc_swap::ArcSwap;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::RwLock;
use rayon::prelude::*;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

/// Observer of rebuild progress.
///
/// Listeners are called on the rebuild thread. `on_rebuilt` runs exactly
/// once per completed rebuild, after the new snapshot is installed and
/// before the store reports ready again. A panic in `on_rebuild_started`
/// aborts the rebuild; a panic in `on_rebuilt` is logged and the remaining
/// listeners still run.
pub trait RebuildListener: Send + Sync {
    /// Called when a rebuild begins, before any file is read.
    fn on_rebuild_started(&self) {}

    /// Called when a new snapshot has been installed.
    fn on_rebuilt(&self, summary: &RebuildSummary);
}

/// Completion signal of a background rebuild.
#[derive(Debug)]
pub struct RebuildHandle {
    done: Receiver<RebuildSummary>,
}

impl RebuildHandle {
    /// Block until the rebuild finishes.
    pub fn wait(self) -> Option<RebuildSummary> {
        self.done.recv().ok()
    }

    /// Block for at most `timeout`. Returns `None` if the rebuild is still
    /// running when the timeout expires.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<RebuildSummary> {
        match self.done.recv_timeout(timeout) {
            Ok(summary) => Some(summary),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

struct StoreInner {
    root: PathBuf,
    sources: Vec<String>,
    excluded_files: Vec<String>,
    indexer: Indexer,
    snapshot: ArcSwap<Snapshot>,
    building: AtomicBool,
    log: RebuildLog,
    listeners: RwLock<Vec<Arc<dyn RebuildListener>>>,
}

/// In-memory index of every blob under the data root.
///
/// Cloning a `BlobStore` is cheap and yields a handle to the same store.
///
/// ## Example
///
/// ```rust,no_run
/// use cddajb_core::{BlobStore, Config};
///
/// let store = BlobStore::new(&Config::for_root("/srv/cdda"));
/// if let Some(handle) = store.start_rebuild(Some("initial load".to_string())) {
///     handle.wait();
/// }
/// for hit in store.search("bow").unwrap() {
///     println!("{} {:?}", hit.id, hit.types);
/// }
/// ```
#[derive(Clone)]
pub struct BlobStore {
    inner: Arc<StoreInner>,
}

impl BlobStore {
    /// Create an empty, ready store for the configured data root.
    ///
    /// No files are read until the first rebuild.
    pub fn new(config: &Config) -> Self {
        BlobStore {
            inner: Arc::new(StoreInner {
                root: config.data.root.clone(),
                sources: config.data.sources.clone(),
                excluded_files: config.data.excluded_files.clone(),
                indexer: Indexer::new(config.data.other_keys.clone()),
                snapshot: ArcSwap::from_pointee(Snapshot::empty()),
                building: AtomicBool::new(false),
                log: RebuildLog::new(),
                listeners: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Register a listener for rebuild events.
    pub fn add_listener(&self, listener: Arc<dyn RebuildListener>) {
        self.inner.listeners.write().push(listener);
    }

    /// The data root this store scans.
    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Whether content reads are currently accepted.
    pub fn is_ready(&self) -> bool {
        !self.inner.building.load(Ordering::Acquire)
    }

    /// Id keys in order of preference.
    pub fn id_keys(&self) -> &'static [&'static str] {
        &ID_KEYS
    }

    /// Configured cross-reference keys.
    pub fn other_keys(&self) -> &[String] {
        self.inner.indexer.other_keys()
    }

    /// All types of the current snapshot. Answered even during a rebuild.
    pub fn types(&self) -> Vec<String> {
        self.inner.snapshot.load().types()
    }

    /// The current snapshot, for callers that need several consistent reads.
    pub fn snapshot(&self) -> Result<Arc<Snapshot>> {
        self.ensure_ready()?;
        Ok(self.inner.snapshot.load_full())
    }

    /// Every blob stored under `type_name`/`id`.
    pub fn get(&self, type_name: &str, id: &str) -> Result<Vec<Arc<Blob>>> {
        let snapshot = self.snapshot()?;
        let blobs = snapshot.get(type_name, id)?;
        Ok(blobs.to_vec())
    }

    /// Types an id appears under, or `None` for an unknown id.
    pub fn types_for(&self, id: &str) -> Result<Option<TypeSet>> {
        let snapshot = self.snapshot()?;
        Ok(snapshot.types_for(id).cloned())
    }

    /// Blobs referencing `id`, grouped by cross-reference key, or `None`.
    pub fn other_for(&self, id: &str) -> Result<Option<CrossRefs>> {
        let snapshot = self.snapshot()?;
        Ok(snapshot.other_for(id).cloned())
    }

    /// Blobs referencing `id` through the cross-reference key `key`.
    pub fn list_other(&self, key: &str, id: &str) -> Result<Vec<SearchHit>> {
        let snapshot = self.snapshot()?;
        let refs = snapshot
            .other_for(id)
            .ok_or_else(|| StoreError::ReferenceNotFound { id: id.to_string() })?;

        Ok(refs
            .get(key)
            .map(|users| {
                users
                    .iter()
                    .map(|(user, types)| SearchHit::new(user.as_str(), types))
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Ids matching a case-insensitive regular expression.
    pub fn search(&self, pattern: &str) -> Result<Vec<SearchHit>> {
        let snapshot = self.snapshot()?;
        let query = SearchQuery::regex(pattern)?;
        Ok(query.run(&snapshot))
    }

    /// Rebuild reports, most recent first.
    pub fn logs(&self) -> Vec<String> {
        self.inner.log.reports()
    }

    /// Trigger a background rebuild.
    ///
    /// Returns `false` without doing anything if a rebuild is already in
    /// flight. Otherwise returns `true` immediately; poll
    /// [`is_ready`](Self::is_ready) to learn when it completes.
    pub fn rebuild(&self, note: Option<&str>) -> bool {
        self.start_rebuild(note.map(str::to_string)).is_some()
    }

    /// Trigger a background rebuild and get a handle to its completion.
    pub fn start_rebuild(&self, note: Option<String>) -> Option<RebuildHandle> {
        if self
            .inner
            .building
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Rebuild already in progress, ignoring trigger");
            return None;
        }

        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        let inner = Arc::clone(&self.inner);

        let spawned = thread::Builder::new()
            .name("blobstore-rebuild".to_string())
            .spawn(move || inner.rebuild_guarded(note, done_tx));

        match spawned {
            Ok(_) => Some(RebuildHandle { done: done_rx }),
            Err(e) => {
                error!(error = %e, "Failed to spawn rebuild thread");
                self.inner.building.store(false, Ordering::Release);
                None
            }
        }
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(StoreError::NotReady)
        }
    }
}

impl StoreInner {
    /// Run a rebuild and always restore readiness, even if it faults.
    fn rebuild_guarded(&self, note: Option<String>, done: Sender<RebuildSummary>) {
        let started = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.rebuild(note.as_deref())));

        let summary = match outcome {
            Ok(summary) => summary,
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                error!(reason = %reason, "BlobStore update aborted");
                self.log.line(format!("Rebuild aborted: {reason}"));
                self.log.finish();
                RebuildSummary {
                    aborted: true,
                    elapsed: started.elapsed(),
                    ..Default::default()
                }
            }
        };

        self.building.store(false, Ordering::Release);
        let _ = done.send(summary);
    }

    #[instrument(skip(self), fields(root = %self.root.display()))]
    fn rebuild(&self, note: Option<&str>) -> RebuildSummary {
        let started = Instant::now();
        info!("BlobStore update initiated");

        self.log.start();
        if let Some(note) = note {
            self.log.line(format!("Update info: {note}"));
        }
        self.log
            .line(format!("ID keys considered: {}\n", ID_KEYS.join(", ")));
        if !self.indexer.other_keys().is_empty() {
            self.log.line(format!(
                "Other keys considered: {}\n",
                self.indexer.other_keys().join(", ")
            ));
        }

        for listener in self.listeners.read().iter() {
            listener.on_rebuild_started();
        }

        let mut summary = RebuildSummary::default();

        let scan = scan::collect_files(&self.root, &self.sources, &self.excluded_files);
        for err in &scan.errors {
            warn!(error = %err, "Scan error");
            self.log.line(err);
        }
        summary.failed_files += scan.errors.len();

        let parsed: Vec<(&DataFile, Result<_>)> = scan
            .files
            .par_iter()
            .map(|file| (file, self.indexer.index_file(&file.path, &file.source)))
            .collect();

        let mut builder = SnapshotBuilder::new();
        for (file, result) in parsed {
            match result {
                Ok(index) => {
                    if index.has_skips() {
                        self.log.line(format!(
                            "{} - Blobs without reasonable type, id: {}, {}",
                            file.source, index.skipped_no_type, index.skipped_no_id
                        ));
                    }
                    summary.skipped_no_type += index.skipped_no_type;
                    summary.skipped_no_id += index.skipped_no_id;
                    builder.extend(index.entries);
                }
                Err(e) => {
                    warn!(file = %file.source, error = %e, "Failed to index file");
                    self.log.line(e.to_string());
                    summary.failed_files += 1;
                }
            }
        }

        let snapshot = builder.build();
        summary.blobs = snapshot.blob_count();
        summary.types = snapshot.type_count();
        summary.other_keys = snapshot.other_count();
        summary.search_strings = snapshot.id_count();
        self.snapshot.store(Arc::new(snapshot));

        summary.elapsed = started.elapsed();
        self.log.line(format!("\n{summary}"));
        self.notify_rebuilt(&summary);
        self.log.finish();

        info!(
            files = scan.files.len(),
            blobs = summary.blobs,
            types = summary.types,
            failed = summary.failed_files,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "BlobStore update finished"
        );

        summary
    }

    /// Tell every listener about the installed snapshot. A failing listener
    /// is reported and does not keep the others from running.
    fn notify_rebuilt(&self, summary: &RebuildSummary) {
        for listener in self.listeners.read().iter() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener.on_rebuilt(summary)));
            if let Err(payload) = outcome {
                let reason = panic_message(payload.as_ref());
                error!(reason = %reason, "Rebuild listener failed");
                self.log.line(format!("Listener failed: {reason}"));
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown fault".to_string()
    }
}

impl std::fmt::Debug for BlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.inner.snapshot.load();
        f.debug_struct("BlobStore")
            .field("root", &self.inner.root)
            .field("ready", &self.is_ready())
            .field("blobs", &snapshot.blob_count())
            .finish()
    }
}
