//! # cddajb Core Library
//!
//! This crate provides the in-memory blob store behind the cddajb JSON
//! browser: it walks a tree of JSON data files, indexes every typed record,
//! and answers lookups, id searches and "what references this id" queries.
//!
//! ## Architecture
//!
//! - **Indexer** (`indexer`): Parses one file into typed, identified blobs
//! - **Snapshot** (`snapshot`): Immutable bundle of derived indices
//! - **Store** (`store`): Background rebuilds, atomic swap, readiness gating
//! - **Search** (`search`): Case-insensitive regex over known ids
//! - **Cache** (`cache`): Bounded LRU read-through cache with hit/miss stats
//! - **Scan** (`scan`): Deterministic discovery of data files
//! - **Report** (`report`): Rolling rebuild reports
//! - **Config** (`config`): Configuration management
//!
//! ## Example
//!
//! ```rust,ignore
//! use cddajb_core::{BlobStore, Config};
//!
//! let store = BlobStore::new(&Config::for_root("/srv/cdda"));
//! store.start_rebuild(None).map(|handle| handle.wait());
//!
//! for blob in store.get("GUN", "glock_19")? {
//!     println!("{} from {}", blob.data, blob.source);
//! }
//! ```

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod indexer;
pub mod report;
pub mod scan;
pub mod search;
pub mod snapshot;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use cache::BoundedCache;
pub use config::Config;
pub use error::{Result, StoreError};
pub use search::SearchQuery;
pub use snapshot::Snapshot;
pub use store::{BlobStore, RebuildHandle, RebuildListener};
pub use types::{Blob, CacheStats, CrossRefs, RebuildSummary, SearchHit, TypeSet};

/// Crate version, reported by the status endpoint.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
