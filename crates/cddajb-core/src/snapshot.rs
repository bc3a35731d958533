//! Immutable index snapshot.
//!
//! A snapshot bundles the derived indices built by one rebuild:
//!
//! - `by_type`: type -> id -> blobs (duplicates kept, scan order)
//! - `types_for_id`: id -> every type it appears under
//! - `cross_refs`: referenced value -> other key -> referencing id -> types
//!
//! Snapshots are assembled off to the side with a [`SnapshotBuilder`] and
//! then published by the store in a single pointer swap. Nothing mutates a
//! snapshot once built.

use crate::error::{Result, StoreError};
use crate::indexer::IndexedBlob;
use crate::types::{Blob, CrossRefs, TypeSet};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::sync::Arc;

/// One fully built set of indices.
#[derive(Debug, Clone)]
pub struct Snapshot {
    by_type: IndexMap<String, IndexMap<String, Vec<Arc<Blob>>>>,
    types_for_id: IndexMap<String, TypeSet>,
    cross_refs: IndexMap<String, CrossRefs>,
    blob_count: usize,
    built_at: DateTime<Utc>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl Snapshot {
    /// A snapshot with no data.
    pub fn empty() -> Self {
        Snapshot {
            by_type: IndexMap::new(),
            types_for_id: IndexMap::new(),
            cross_refs: IndexMap::new(),
            blob_count: 0,
            built_at: Utc::now(),
        }
    }

    /// All types, in the order they were first seen.
    pub fn types(&self) -> Vec<String> {
        self.by_type.keys().cloned().collect()
    }

    /// Blobs stored under `type_name`/`id`.
    pub fn get(&self, type_name: &str, id: &str) -> Result<&[Arc<Blob>]> {
        let ids = self
            .by_type
            .get(type_name)
            .ok_or_else(|| StoreError::TypeNotFound {
                type_name: type_name.to_string(),
            })?;

        ids.get(id)
            .map(Vec::as_slice)
            .ok_or_else(|| StoreError::IdNotFound {
                type_name: type_name.to_string(),
                id: id.to_string(),
            })
    }

    /// Types an id appears under.
    pub fn types_for(&self, id: &str) -> Option<&TypeSet> {
        self.types_for_id.get(id)
    }

    /// Blobs that reference `id` through a cross-reference key.
    pub fn other_for(&self, id: &str) -> Option<&CrossRefs> {
        self.cross_refs.get(id)
    }

    /// Every searchable id with its types, in scan order.
    pub fn ids(&self) -> impl Iterator<Item = (&String, &TypeSet)> {
        self.types_for_id.iter()
    }

    pub fn blob_count(&self) -> usize {
        self.blob_count
    }

    pub fn type_count(&self) -> usize {
        self.by_type.len()
    }

    /// Number of distinct referenced values.
    pub fn other_count(&self) -> usize {
        self.cross_refs.len()
    }

    /// Number of distinct searchable ids.
    pub fn id_count(&self) -> usize {
        self.types_for_id.len()
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }
}

/// Accumulates indexer output into fresh indices.
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    by_type: IndexMap<String, IndexMap<String, Vec<Arc<Blob>>>>,
    types_for_id: IndexMap<String, TypeSet>,
    cross_refs: IndexMap<String, CrossRefs>,
    blob_count: usize,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one indexed blob to every index.
    pub fn insert(&mut self, entry: IndexedBlob) {
        let IndexedBlob {
            type_name,
            id,
            blob,
            references,
        } = entry;

        for (key, value) in references {
            self.cross_refs
                .entry(value)
                .or_default()
                .entry(key)
                .or_default()
                .entry(id.clone())
                .or_default()
                .insert(type_name.clone());
        }

        self.types_for_id
            .entry(id.clone())
            .or_default()
            .insert(type_name.clone());

        self.by_type
            .entry(type_name)
            .or_default()
            .entry(id)
            .or_default()
            .push(blob);

        self.blob_count += 1;
    }

    /// Add every entry in order.
    pub fn extend(&mut self, entries: impl IntoIterator<Item = IndexedBlob>) {
        for entry in entries {
            self.insert(entry);
        }
    }

    /// Freeze the accumulated indices.
    pub fn build(self) -> Snapshot {
        Snapshot {
            by_type: self.by_type,
            types_for_id: self.types_for_id,
            cross_refs: self.cross_refs,
            blob_count: self.blob_count,
            built_at: Utc::now(),
        }
    }
}
