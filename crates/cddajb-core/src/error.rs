//! Error types for cddajb core operations.
//!
//! This module defines well-structured error types using `thiserror` for
//! library-level errors, while higher-level code can use `anyhow` for
//! convenient error handling.

use thiserror::Error;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Core error types for blob store operations.
///
/// Callers (the HTTP layer, the CLI) translate these into user-facing
/// responses; the core never assigns status codes or incident numbers.
#[derive(Error, Debug)]
pub enum StoreError {
    // === Readiness ===
    /// A content read was attempted while a rebuild is in flight
    #[error("database update in progress")]
    NotReady,

    // === Lookup Errors ===
    /// The requested type does not exist in the current snapshot
    #[error("type {type_name} not found")]
    TypeNotFound { type_name: String },

    /// The type exists but has no blob with the requested id
    #[error("path {type_name}/{id} not found")]
    IdNotFound { type_name: String, id: String },

    /// No blob references the requested id through any cross-reference key
    #[error("other {id} not found")]
    ReferenceNotFound { id: String },

    // === Search Errors ===
    /// The search expression is not a valid regular expression
    #[error("malformed pattern {pattern}: {reason}")]
    BadPattern { pattern: String, reason: String },

    // === Access ===
    /// The shared secret supplied with a rebuild trigger did not match
    #[error("forbidden")]
    Forbidden,

    // === Rebuild Errors ===
    /// A single file failed to read or parse during a rebuild.
    ///
    /// Recorded in the rebuild report; never returned from a read call.
    #[error("{path} - Error: {reason}")]
    PartialParseFailure { path: String, reason: String },

    // === Configuration Errors ===
    /// Configuration file parsing or validation failed
    #[error("configuration error: {reason}")]
    Config { reason: String },

    // === I/O Errors ===
    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Internal Errors ===
    /// Internal error that should not happen
    #[error("internal error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Returns true for lookup misses (type, id or cross-reference).
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::TypeNotFound { .. }
                | StoreError::IdNotFound { .. }
                | StoreError::ReferenceNotFound { .. }
        )
    }

    /// Stable short name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::NotReady => "NotReady",
            StoreError::TypeNotFound { .. } => "TypeNotFound",
            StoreError::IdNotFound { .. } => "IdNotFound",
            StoreError::ReferenceNotFound { .. } => "ReferenceNotFound",
            StoreError::BadPattern { .. } => "BadPattern",
            StoreError::Forbidden => "Forbidden",
            StoreError::PartialParseFailure { .. } => "PartialParseFailure",
            StoreError::Config { .. } => "ConfigError",
            StoreError::Io(_) => "IoError",
            StoreError::Internal(_) => "InternalError",
        }
    }

    /// Create a configuration error
    pub fn config(reason: impl Into<String>) -> Self {
        StoreError::Config {
            reason: reason.into(),
        }
    }

    /// Create a per-file parse failure
    pub fn partial(path: impl Into<String>, reason: impl Into<String>) -> Self {
        StoreError::PartialParseFailure {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
