//! File readiness probing
//!
//! A filesystem creation event says a file exists, not that its producer has
//! finished writing it. Extracting a half-copied archive yields corrupt
//! reads, so before an extraction job touches an archive it probes whether
//! the file can be opened exclusively and polls until it can, within a
//! bounded window.

use crate::config::ReadinessConfig;
use crate::error::ExtractError;
use std::fs::OpenOptions;
use std::path::Path;
use tokio::time::{Instant, sleep};
use tracing::{debug, trace};

/// Check whether `path` is safe to open for extraction
///
/// Attempts to obtain an exclusive handle on the file (read + write access,
/// which a writer's open handle denies on platforms with mandatory sharing
/// semantics) and immediately releases it. Returns `false` while another
/// process still holds a write lock or the file does not exist yet.
///
/// This predicate has no knowledge of archive formats and no side effects
/// beyond the transient open/close.
pub fn is_ready(path: &Path) -> bool {
    OpenOptions::new().read(true).write(true).open(path).is_ok()
}

/// Poll [`is_ready`] until it succeeds or the configured budget is exhausted
///
/// Probes immediately, then sleeps `config.poll_interval` between attempts.
/// The total wait is capped by `config.timeout`; on expiry the job fails
/// with [`ExtractError::NotReady`] rather than spinning forever on a file
/// whose producer may have crashed mid-write.
pub async fn wait_until_ready(
    path: &Path,
    config: &ReadinessConfig,
) -> std::result::Result<(), ExtractError> {
    let started = Instant::now();

    loop {
        if is_ready(path) {
            debug!(
                ?path,
                waited_ms = started.elapsed().as_millis() as u64,
                "file ready for extraction"
            );
            return Ok(());
        }

        // Stop polling once another full interval would overrun the budget
        if started.elapsed() + config.poll_interval > config.timeout {
            return Err(ExtractError::NotReady {
                path: path.to_path_buf(),
                timeout: config.timeout,
            });
        }

        trace!(?path, "file not ready, polling again");
        sleep(config.poll_interval).await;
    }
}
