//! Directory scan for data files.
//!
//! Collects every `*.json` file under the configured source directories of
//! the data root, drops excluded file names, and returns the list in
//! lexicographic order so that rebuild reports are reproducible.

use glob::Pattern;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A data file found by the scan.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DataFile {
    /// Absolute (or root-joined) path on disk
    pub path: PathBuf,

    /// Path relative to the data root, `/`-separated
    pub source: String,
}

/// Result of scanning the data root.
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub files: Vec<DataFile>,

    /// Entries that could not be read while walking
    pub errors: Vec<String>,
}

/// Scan `root` for data files.
///
/// Each entry of `sources` names a subdirectory of `root` that is searched
/// recursively. An empty `sources` list searches `root` itself. Missing
/// source directories contribute nothing.
pub fn collect_files(root: &Path, sources: &[String], excluded: &[String]) -> ScanOutcome {
    let mut outcome = ScanOutcome::default();

    if !root.is_dir() {
        outcome
            .errors
            .push(format!("{} - Error: data root is not a readable directory", root.display()));
        return outcome;
    }

    let bases: Vec<PathBuf> = if sources.is_empty() {
        vec![root.to_path_buf()]
    } else {
        sources.iter().map(|s| root.join(s)).collect()
    };

    for base in bases {
        if !base.is_dir() {
            debug!(path = %base.display(), "Source directory missing, skipping");
            continue;
        }

        let pattern = format!("{}/**/*.json", Pattern::escape(&base.to_string_lossy()));
        let entries = match glob::glob(&pattern) {
            Ok(entries) => entries,
            Err(e) => {
                outcome
                    .errors
                    .push(format!("{} - Error: {}", base.display(), e));
                continue;
            }
        };

        for entry in entries {
            match entry {
                Ok(path) => {
                    if !path.is_file() || is_excluded(&path, excluded) {
                        continue;
                    }
                    let source = relative_source(root, &path);
                    outcome.files.push(DataFile { path, source });
                }
                Err(e) => outcome
                    .errors
                    .push(format!("{} - Error: {}", e.path().display(), e.error())),
            }
        }
    }

    outcome.files.sort_by(|a, b| a.source.cmp(&b.source));
    outcome.files.dedup_by(|a, b| a.source == b.source);
    outcome
}

fn is_excluded(path: &Path, excluded: &[String]) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map_or(false, |name| excluded.iter().any(|e| e == name))
}

fn relative_source(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
