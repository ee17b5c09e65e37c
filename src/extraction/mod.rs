//! Archive extraction dispatch
//!
//! This module owns the path from "an archive file appeared" to "its
//! contents sit in a sibling folder and the archive is gone". The dispatcher
//! selects a decoder by file extension (ZIP, 7z, or RAR; the formats are
//! free-standing decoder crates, not reimplemented here), waits for the file
//! to be fully written, extracts on a blocking worker thread, and deletes
//! the source archive only on confirmed success. Lifecycle signals bracket
//! every accepted job so observers can track busy/idle state.

mod rar;
mod sevenz;
mod zip;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

// Re-exports
pub use rar::RarExtractor;
pub use sevenz::SevenZipExtractor;
pub use zip::ZipExtractor;

use crate::config::ReadinessConfig;
use crate::error::{ExtractError, Result};
use crate::readiness;
use crate::signals::{LifecycleSignal, SignalBus};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::task::spawn_blocking;
use tracing::{debug, info, warn};

/// Supported archive formats
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveKind {
    /// `.zip`, decoded by the `zip` crate
    Zip,
    /// `.7z`, decoded by the `sevenz-rust` crate
    SevenZip,
    /// `.rar`, decoded by the `unrar` crate
    Rar,
}

impl ArchiveKind {
    /// Format name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            ArchiveKind::Zip => "ZIP",
            ArchiveKind::SevenZip => "7z",
            ArchiveKind::Rar => "RAR",
        }
    }
}

/// Detect the archive kind from a path's final extension
///
/// Case-insensitive: `zip` → ZIP, `7z` → 7z, `rar` → RAR; anything else
/// (including no extension at all) is unsupported and returns `None`.
///
/// Both the folder watcher (pre-filter) and the dispatcher (authoritative
/// check) go through this one function, so the two layers cannot disagree on
/// the supported set.
pub fn detect_archive_kind(path: &Path) -> Option<ArchiveKind> {
    let ext = path.extension()?.to_str()?.to_lowercase();

    match ext.as_str() {
        "zip" => Some(ArchiveKind::Zip),
        "7z" => Some(ArchiveKind::SevenZip),
        "rar" => Some(ArchiveKind::Rar),
        _ => None,
    }
}

/// One archive file, from detection through terminal success or failure
///
/// The destination is derived, never configured: the source path with its
/// final extension segment stripped (`/w/a.zip` → `/w/a`). Jobs are
/// ephemeral: nothing about them is persisted, and a failed job is simply
/// dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractionJob {
    /// Archive file being extracted
    pub source: PathBuf,
    /// Sibling folder receiving the archive contents
    pub destination: PathBuf,
    /// Decoder selected for the source
    pub kind: ArchiveKind,
}

impl ExtractionJob {
    /// Build a job for `path`, or `None` if its extension is unsupported
    pub fn for_path(path: &Path) -> Option<Self> {
        let kind = detect_archive_kind(path)?;
        Some(Self {
            source: path.to_path_buf(),
            destination: path.with_extension(""),
            kind,
        })
    }
}

/// Dispatches extraction jobs and reports lifecycle signals
///
/// Cheap to clone; clones share the signal bus. The dispatcher itself holds
/// no job state; each call to [`extract`](ArchiveDispatcher::extract) is an
/// independent job.
#[derive(Clone, Debug)]
pub struct ArchiveDispatcher {
    /// Readiness polling behavior applied before every extraction
    readiness: ReadinessConfig,
    /// Bus receiving Started/Finished for every accepted job
    signals: SignalBus,
}

impl ArchiveDispatcher {
    /// Create a dispatcher emitting on `signals`
    pub fn new(readiness: ReadinessConfig, signals: SignalBus) -> Self {
        Self { readiness, signals }
    }

    /// Extract `path` into its sibling folder and delete the archive
    ///
    /// The full job pipeline:
    /// 1. Select the decoder by extension; unsupported extensions fail with
    ///    [`ExtractError::UnsupportedFormat`] before any filesystem access
    ///    and without emitting signals.
    /// 2. Emit [`LifecycleSignal::Started`].
    /// 3. Poll readiness within the configured budget
    ///    ([`ExtractError::NotReady`] on expiry).
    /// 4. Extract everything into the destination, created if absent
    ///    ([`ExtractError::CorruptArchive`] if the decoder rejects any
    ///    entry; partial output is left as-is).
    /// 5. Delete the source archive
    ///    ([`ExtractError::CleanupFailed`] if deletion fails; the
    ///    extraction itself still succeeded and the archive stays on disk).
    /// 6. Emit [`LifecycleSignal::Finished`] on every path after step 2,
    ///    success or failure, so observers never see a stuck busy state.
    ///
    /// Returns the destination folder on success. Failed jobs are dropped;
    /// the same archive re-appearing as a new creation event starts a fresh
    /// job.
    pub async fn extract(&self, path: &Path) -> Result<PathBuf> {
        let Some(job) = ExtractionJob::for_path(path) else {
            return Err(ExtractError::UnsupportedFormat {
                path: path.to_path_buf(),
            }
            .into());
        };

        info!(
            source = ?job.source,
            destination = ?job.destination,
            kind = job.kind.name(),
            "extraction job accepted"
        );
        self.signals.emit(LifecycleSignal::Started);

        let result = self.run(&job).await;

        // Observers must always see the busy state clear
        self.signals.emit(LifecycleSignal::Finished);

        match &result {
            Ok(()) => info!(source = ?job.source, "extraction job succeeded"),
            Err(e) => warn!(source = ?job.source, error = %e, "extraction job failed"),
        }

        result.map(|()| job.destination)
    }

    /// Run the fallible part of a job: probe, extract, clean up
    async fn run(&self, job: &ExtractionJob) -> Result<()> {
        debug!(source = ?job.source, "probing readiness");
        readiness::wait_until_ready(&job.source, &self.readiness).await?;

        debug!(source = ?job.source, destination = ?job.destination, "extracting");

        // Decoders are synchronous; keep them off the async runtime
        let source = job.source.clone();
        let destination = job.destination.clone();
        let kind = job.kind;
        let extracted = spawn_blocking(move || match kind {
            ArchiveKind::Zip => ZipExtractor::extract(&source, &destination),
            ArchiveKind::SevenZip => SevenZipExtractor::extract(&source, &destination),
            ArchiveKind::Rar => RarExtractor::extract(&source, &destination),
        })
        .await
        .map_err(|e| ExtractError::CorruptArchive {
            archive: job.source.clone(),
            reason: format!("extraction task panicked: {}", e),
        })??;

        debug!(
            source = ?job.source,
            extracted_count = extracted.len(),
            "extraction complete, removing source archive"
        );

        // Delete only on confirmed success; any failure above left the
        // archive untouched on disk
        tokio::fs::remove_file(&job.source)
            .await
            .map_err(|e| ExtractError::CleanupFailed {
                archive: job.source.clone(),
                reason: e.to_string(),
            })?;

        Ok(())
    }
}
