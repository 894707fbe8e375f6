//! Error types for butterfly-segmap
//!
//! Only structural problems with persisted data and I/O failures are errors.
//! Querying an unknown node or feature id yields an empty result, and a
//! cancelled bulk query yields a partial result.

use thiserror::Error;

/// Errors surfaced by loading, mapping and saving segment indexes
#[derive(Debug, Error)]
pub enum Error {
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A named section is not present in the container
    #[error("Section '{0}' not found")]
    MissingSection(String),

    /// Persisted data violates its ordering, size or checksum invariants
    #[error("Corrupt index in section '{section}': {reason}")]
    CorruptIndex { section: String, reason: String },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn corrupt(section: &str, reason: impl Into<String>) -> Self {
        Error::CorruptIndex {
            section: section.to_string(),
            reason: reason.into(),
        }
    }

    /// True for errors that a rebuild of the index can recover from
    pub fn is_rebuildable(&self) -> bool {
        matches!(self, Error::MissingSection(_) | Error::CorruptIndex { .. })
    }
}

/// Convenience result type for butterfly-segmap operations
pub type Result<T> = std::result::Result<T, Error>;
