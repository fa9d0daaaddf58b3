//! Unified error type for the indexer and searcher.

use thiserror::Error;

/// All errors that can occur while building or searching a PATRICIA trie index.
#[derive(Error, Debug)]
pub enum SearchError {
    /// I/O error (file read/write, directory access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A corpus file could not be opened or read. Logged and skipped; the
    /// build continues without this file's tokens.
    #[error("could not read source file {path}: {source}")]
    UnreadableSource {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A stale staging directory exists and could not be removed before a
    /// build. Fatal: the caller must clear it manually.
    #[error("staging directory {path} already exists and could not be cleaned up: {source}")]
    StagingConflict {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A token cannot be safely embedded in the filesystem (e.g. a reserved
    /// device name that cannot be split further). Logged and skipped.
    #[error("token '{token}' cannot be represented as a safe path component")]
    UnsafePath { token: String },

    /// A worker thread in one of the build pools panicked. Fatal.
    #[error("worker pool failure: {0}")]
    PoolFailure(String),

    /// A tar archive (or nested member) could not be parsed during search.
    /// Logged; the affected subtree is treated as empty for the query.
    #[error("archive read error at {path}: {message}")]
    ArchiveReadError { path: String, message: String },

    /// The searcher factory was given a path that is neither a directory
    /// nor a recognized tar archive.
    #[error("unsupported index at {path}: not a directory or a tar archive")]
    MissingIndex { path: String },

    /// The corpus root directory does not exist.
    #[error("corpus directory does not exist: {0}")]
    DirNotFound(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsafe_path_display() {
        let err = SearchError::UnsafePath { token: "c".to_string() };
        assert!(err.to_string().contains("'c'"));
    }

    #[test]
    fn test_missing_index_display() {
        let err = SearchError::MissingIndex { path: "/tmp/nope".to_string() };
        let msg = err.to_string();
        assert!(msg.contains("/tmp/nope"));
        assert!(msg.contains("not a directory"));
    }

    #[test]
    fn test_io_error_from_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let search_err: SearchError = io_err.into();
        assert!(matches!(search_err, SearchError::Io(_)));
    }

    #[test]
    fn test_pool_failure_display() {
        let err = SearchError::PoolFailure("worker 3 panicked".to_string());
        assert!(err.to_string().contains("worker 3 panicked"));
    }

    #[test]
    fn test_staging_conflict_display() {
        let err = SearchError::StagingConflict {
            path: "/tmp/.stage".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("/tmp/.stage"));
    }
}
