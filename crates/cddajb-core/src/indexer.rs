//! Record indexer: turns one JSON file into typed, identified blobs.
//!
//! A data file is a JSON array of objects. Each object is indexed under its
//! `type` field and the first id key present from [`ID_KEYS`]. Objects that
//! lack either are counted and skipped; they never abort the file.
//!
//! A file that is not valid JSON, or whose root is not an array, fails as a
//! whole with [`StoreError::PartialParseFailure`]. The store records that in
//! the rebuild report and moves on to the next file.

use crate::error::{Result, StoreError};
use crate::types::Blob;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Id keys in order of preference. The first one present wins.
pub const ID_KEYS: [&str; 5] = ["id", "ident", "result", "name", "description"];

/// One blob ready to be inserted into a snapshot.
#[derive(Debug, Clone)]
pub struct IndexedBlob {
    /// Value of the blob's `type` field
    pub type_name: String,

    /// Value of the resolved id key
    pub id: String,

    /// The blob itself
    pub blob: Arc<Blob>,

    /// (other key, referenced value) pairs, in other-key order
    pub references: Vec<(String, String)>,
}

/// Everything the indexer extracted from a single file.
#[derive(Debug, Clone, Default)]
pub struct FileIndex {
    pub entries: Vec<IndexedBlob>,
    pub skipped_no_type: usize,
    pub skipped_no_id: usize,
}

impl FileIndex {
    /// True if any element of the file was skipped
    pub fn has_skips(&self) -> bool {
        self.skipped_no_type > 0 || self.skipped_no_id > 0
    }
}

/// Why an element was not indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Skip {
    NoType,
    NoId,
}

/// Parses data files and resolves type, id and cross-references.
#[derive(Debug, Clone, Default)]
pub struct Indexer {
    other_keys: Vec<String>,
}

impl Indexer {
    /// Create an indexer that cross-references the given keys.
    pub fn new(other_keys: Vec<String>) -> Self {
        Indexer { other_keys }
    }

    /// The configured cross-reference keys.
    pub fn other_keys(&self) -> &[String] {
        &self.other_keys
    }

    /// Read and index a file. `source` is recorded on every blob.
    pub fn index_file(&self, path: &Path, source: &str) -> Result<FileIndex> {
        let bytes = fs::read(path).map_err(|e| StoreError::partial(source, e.to_string()))?;
        self.index_bytes(&bytes, source)
    }

    /// Index the raw contents of a file.
    pub fn index_bytes(&self, bytes: &[u8], source: &str) -> Result<FileIndex> {
        let root: Value =
            serde_json::from_slice(bytes).map_err(|e| StoreError::partial(source, e.to_string()))?;

        let elements = match root {
            Value::Array(elements) => elements,
            other => {
                return Err(StoreError::partial(
                    source,
                    format!("expected a JSON array, found {}", json_kind(&other)),
                ))
            }
        };

        let mut index = FileIndex::default();
        for element in elements {
            match self.index_element(element, source) {
                Ok(entry) => index.entries.push(entry),
                Err(Skip::NoType) => index.skipped_no_type += 1,
                Err(Skip::NoId) => index.skipped_no_id += 1,
            }
        }

        Ok(index)
    }

    fn index_element(&self, element: Value, source: &str) -> std::result::Result<IndexedBlob, Skip> {
        let obj = element.as_object().ok_or(Skip::NoType)?;

        let type_name = match obj.get("type") {
            Some(Value::String(t)) => t.clone(),
            _ => return Err(Skip::NoType),
        };

        let id = resolve_id(obj)?;
        let references = self.references(obj);

        Ok(IndexedBlob {
            type_name,
            id,
            blob: Arc::new(Blob::new(element, source)),
            references,
        })
    }

    fn references(&self, obj: &Map<String, Value>) -> Vec<(String, String)> {
        let mut out = Vec::new();
        for key in &self.other_keys {
            if let Some(value) = obj.get(key) {
                let mut leaves = Vec::new();
                flatten_strings(value, &mut leaves);
                out.extend(leaves.into_iter().map(|v| (key.clone(), v.to_string())));
            }
        }
        out
    }
}

/// Resolve the id of an object from the first id key present.
///
/// A present key with a non-string value is a miss; later keys are not
/// consulted.
fn resolve_id(obj: &Map<String, Value>) -> std::result::Result<String, Skip> {
    let key = ID_KEYS
        .iter()
        .find(|k| obj.contains_key(**k))
        .ok_or(Skip::NoId)?;

    match obj.get(*key) {
        Some(Value::String(id)) => Ok(id.clone()),
        _ => Err(Skip::NoId),
    }
}

/// Collect the string leaves of a (possibly nested) list, in order.
/// A scalar is treated as a one-element list.
fn flatten_strings<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::String(s) => out.push(s),
        Value::Array(items) => items.iter().for_each(|item| flatten_strings(item, out)),
        _ => {}
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
