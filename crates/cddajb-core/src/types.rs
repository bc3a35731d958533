//! Core data types for cddajb.
//!
//! This module defines the fundamental data structures shared by the
//! indexer, the snapshot and the store. These types are designed to be:
//!
//! - **Immutable**: A blob never changes after the indexer creates it
//! - **Cheap to share**: Readers hold `Arc`s into the current snapshot
//! - **Ordered**: Sets and maps keep scan order so output is reproducible

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Every type under which a single id appears, in scan order.
pub type TypeSet = IndexSet<String>;

/// Referencing blobs for one referenced value: key name -> (id -> types).
pub type CrossRefs = IndexMap<String, IndexMap<String, TypeSet>>;

/// One JSON record from the data tree.
///
/// `data` is the object exactly as it appeared in the file and `source` is
/// the path of that file relative to the store root.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Blob {
    /// The parsed JSON object
    #[serde(rename = "blob")]
    pub data: Value,

    /// File the blob came from, relative to the data root
    pub source: String,
}

impl Blob {
    /// Create a new blob
    pub fn new(data: Value, source: impl Into<String>) -> Self {
        Blob {
            data,
            source: source.into(),
        }
    }

    /// Look up a top-level field of the blob
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }
}

/// A search match: a known id and every type it appears under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub types: Vec<String>,
}

impl SearchHit {
    /// Create a new hit
    pub fn new(id: impl Into<String>, types: &TypeSet) -> Self {
        SearchHit {
            id: id.into(),
            types: types.iter().cloned().collect(),
        }
    }
}

/// Counters describing a bounded cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Outcome of one completed rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildSummary {
    /// Blobs indexed
    pub blobs: usize,

    /// Distinct types in the new snapshot
    pub types: usize,

    /// Distinct referenced values in the cross-reference index
    pub other_keys: usize,

    /// Distinct searchable ids
    pub search_strings: usize,

    /// Files that failed to read or parse
    pub failed_files: usize,

    /// Elements without a `type` field
    pub skipped_no_type: usize,

    /// Elements without a usable string id
    pub skipped_no_id: usize,

    /// True when the rebuild faulted before a new snapshot was installed
    pub aborted: bool,

    /// Wall-clock time of the rebuild
    pub elapsed: Duration,
}

impl fmt::Display for RebuildSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Loaded: {} blobs, {} types, {} other keys, {} unique search strings.",
            self.blobs, self.types, self.other_keys, self.search_strings
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_blob_serializes_as_blob_and_source() {
        let blob = Blob::new(json!({"type": "weapon", "id": "axe"}), "json/a.json");
        let value = serde_json::to_value(&blob).unwrap();
        assert_eq!(value["blob"]["id"], "axe");
        assert_eq!(value["source"], "json/a.json");
        assert_eq!(blob.field("type"), Some(&json!("weapon")));
    }

    #[test]
    fn test_search_hit_keeps_type_order() {
        let mut types = TypeSet::new();
        types.insert("weapon".to_string());
        types.insert("ammo".to_string());

        let hit = SearchHit::new("axe", &types);
        assert_eq!(hit.types, vec!["weapon", "ammo"]);
    }

    #[test]
    fn test_summary_display() {
        let summary = RebuildSummary {
            blobs: 2,
            types: 2,
            other_keys: 0,
            search_strings: 1,
            ..Default::default()
        };
        assert_eq!(
            summary.to_string(),
            "Loaded: 2 blobs, 2 types, 0 other keys, 1 unique search strings."
        );
    }
}
