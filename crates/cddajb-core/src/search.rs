//! Search over the known ids of a snapshot.
//!
//! Searches match a case-insensitive regular expression against the set of
//! ids (not blob contents). Every id containing a match is returned together
//! with the types it appears under, in scan order.
//!
//! ## Performance
//!
//! Large id sets are filtered with Rayon. The collect step preserves the
//! original order, so parallel and sequential searches return the same list.

use crate::error::{Result, StoreError};
use crate::snapshot::Snapshot;
use crate::types::SearchHit;
use rayon::prelude::*;
use regex::{Regex, RegexBuilder};

/// Id count above which searches run in parallel.
const PARALLEL_THRESHOLD: usize = 10_000;

/// A compiled search query ready for matching.
///
/// Queries are compiled once and can be reused for multiple searches.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pattern: String,
    regex: Regex,
}

impl SearchQuery {
    /// Compile `pattern` as a case-insensitive regular expression.
    ///
    /// # Example
    /// ```
    /// use cddajb_core::SearchQuery;
    /// let query = SearchQuery::regex(r"^bow_\w+").unwrap();
    /// assert!(query.matches("BOW_long"));
    /// ```
    pub fn regex(pattern: &str) -> Result<Self> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| StoreError::BadPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;

        Ok(SearchQuery {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// Match `text` literally (case-insensitive substring).
    pub fn literal(text: &str) -> Result<Self> {
        Self::regex(&regex::escape(text))
    }

    /// The pattern as compiled.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Check whether an id matches.
    pub fn matches(&self, id: &str) -> bool {
        self.regex.is_match(id)
    }

    /// Run the query against a snapshot.
    pub fn run(&self, snapshot: &Snapshot) -> Vec<SearchHit> {
        if snapshot.id_count() > PARALLEL_THRESHOLD {
            self.run_parallel(snapshot)
        } else {
            self.run_sequential(snapshot)
        }
    }

    fn run_sequential(&self, snapshot: &Snapshot) -> Vec<SearchHit> {
        snapshot
            .ids()
            .filter(|(id, _)| self.matches(id))
            .map(|(id, types)| SearchHit::new(id.as_str(), types))
            .collect()
    }

    fn run_parallel(&self, snapshot: &Snapshot) -> Vec<SearchHit> {
        let ids: Vec<_> = snapshot.ids().collect();
        ids.par_iter()
            .filter(|(id, _)| self.matches(id))
            .map(|(id, types)| SearchHit::new(id.as_str(), types))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::Indexer;
    use crate::snapshot::SnapshotBuilder;

    fn snapshot_with_ids(ids: &[&str]) -> Snapshot {
        let blobs: Vec<String> = ids
            .iter()
            .map(|id| format!(r#"{{"type":"item","id":"{}"}}"#, id))
            .collect();
        let json = format!("[{}]", blobs.join(","));
        let index = Indexer::default()
            .index_bytes(json.as_bytes(), "items.json")
            .unwrap();
        let mut builder = SnapshotBuilder::new();
        builder.extend(index.entries);
        builder.build()
    }

    #[test]
    fn test_substring_is_case_insensitive() {
        let query = SearchQuery::regex("abc").unwrap();

        assert!(query.matches("xxABCxx"));
        assert!(query.matches("abc"));
        assert!(!query.matches("ab_c"));
    }

    #[test]
    fn test_invalid_regex() {
        let err = SearchQuery::regex("[").unwrap_err();
        match err {
            StoreError::BadPattern { pattern, .. } => assert_eq!(pattern, "["),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_literal_escapes_metacharacters() {
        let query = SearchQuery::literal("a.b[").unwrap();
        assert!(query.matches("xA.B[x"));
        assert!(!query.matches("axb["));
    }

    #[test]
    fn test_run_keeps_scan_order() {
        let snapshot = snapshot_with_ids(&["long_bow", "arrow", "short_bow", "Bowie_knife"]);
        let hits = SearchQuery::regex("bow").unwrap().run(&snapshot);

        let ids: Vec<_> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["long_bow", "short_bow", "Bowie_knife"]);
        assert_eq!(hits[0].types, vec!["item"]);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let ids: Vec<String> = (0..PARALLEL_THRESHOLD + 50)
            .map(|i| format!("item_{i}"))
            .collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let snapshot = snapshot_with_ids(&refs);

        let query = SearchQuery::regex(r"_1\d$").unwrap();
        let parallel = query.run(&snapshot);
        let sequential = query.run_sequential(&snapshot);

        assert_eq!(parallel, sequential);
        assert_eq!(parallel.len(), 10);
    }
}
