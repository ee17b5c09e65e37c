//! Error types for autounpack
//!
//! This module provides the error handling for the library:
//! - Per-job extraction errors ([`ExtractError`])
//! - Per-directory watch errors ([`WatchError`])
//! - A top-level [`Error`] aggregating both plus I/O and configuration errors
//!
//! All of these are handled locally per job or per directory worker and
//! logged; none of them terminate the watch subsystem.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for autounpack operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for autounpack
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "watch_dirs")
        key: Option<String>,
    },

    /// Extraction job error
    #[error("extraction error: {0}")]
    Extract(#[from] ExtractError),

    /// Folder watching error
    #[error("folder watch error: {0}")]
    Watch(#[from] WatchError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors terminal to a single extraction job
///
/// A job that fails with any of these is dropped; there is no automatic
/// retry. On every variant except [`ExtractError::CleanupFailed`] the source
/// archive is left untouched on disk.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The file extension maps to no supported decoder; never attempted
    #[error("unsupported archive format: {path}")]
    UnsupportedFormat {
        /// The file whose extension was not recognized
        path: PathBuf,
    },

    /// The archive never became readable within the bounded polling window
    #[error("file {path} not ready for extraction after {timeout:?}")]
    NotReady {
        /// The archive that stayed locked or incomplete
        path: PathBuf,
        /// The configured readiness timeout that was exhausted
        timeout: Duration,
    },

    /// The decoder rejected the archive contents
    ///
    /// The destination may hold partial output; the source archive is never
    /// deleted on this variant.
    #[error("corrupt or unreadable archive {archive}: {reason}")]
    CorruptArchive {
        /// The archive the decoder rejected
        archive: PathBuf,
        /// The decoder's failure reason
        reason: String,
    },

    /// Extraction succeeded but the source archive could not be deleted
    #[error("extraction succeeded but deleting {archive} failed: {reason}")]
    CleanupFailed {
        /// The archive that remains on disk
        archive: PathBuf,
        /// Why deletion failed (e.g., permissions)
        reason: String,
    },
}

/// Errors from a per-directory watcher
#[derive(Debug, Error)]
pub enum WatchError {
    /// The OS-level subscription for a directory could not be established
    #[error("failed to watch {path}: {reason}")]
    SetupFailed {
        /// The directory that could not be watched
        path: PathBuf,
        /// Why the subscription failed (e.g., directory missing)
        reason: String,
    },

    /// The OS-level subscription was lost mid-run
    #[error("watch on {path} lost: {reason}")]
    Lost {
        /// The directory whose subscription was lost
        path: PathBuf,
        /// Why the subscription ended (e.g., directory deleted)
        reason: String,
    },
}
