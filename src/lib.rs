//! # autounpack
//!
//! Library for watching folders and automatically extracting archives
//! dropped into them. Point it at one or more directories and every `.zip`,
//! `.7z`, or `.rar` file that appears is unpacked into a sibling folder
//! (named after the archive) and then deleted.
//!
//! ## Design Philosophy
//!
//! autounpack is designed to be:
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - Consumers subscribe to lifecycle signals, no polling
//! - **Presentation-agnostic** - A tray icon, a logger, and a metrics
//!   exporter all observe the same two signals
//! - **Careful with data** - An archive is deleted only after its extraction
//!   confirmably succeeded; on any failure the file stays on disk
//!
//! ## Quick Start
//!
//! ```no_run
//! use autounpack::{Config, LifecycleSignal, WatchSet, run_with_shutdown};
//!
//! #[tokio::main]
//! async fn main() -> autounpack::Result<()> {
//!     let config = Config {
//!         watch_dirs: vec!["/home/user/Downloads".into()],
//!         ..Default::default()
//!     };
//!
//!     let watch_set = WatchSet::start(config)?;
//!
//!     // Subscribe to busy/idle signals
//!     let mut signals = watch_set.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(signal) = signals.recv().await {
//!             match signal {
//!                 LifecycleSignal::Started => println!("extracting..."),
//!                 LifecycleSignal::Finished => println!("idle"),
//!             }
//!         }
//!     });
//!
//!     // Run until SIGTERM/SIGINT
//!     run_with_shutdown(watch_set).await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Archive extraction dispatch
pub mod extraction;
/// Folder watching and the per-directory worker supervisor
pub mod folder_watcher;
/// File readiness probing
pub mod readiness;
/// Lifecycle signal broadcasting
pub mod signals;

// Re-export commonly used types
pub use config::{Config, ReadinessConfig};
pub use error::{Error, ExtractError, Result, WatchError};
pub use extraction::{ArchiveDispatcher, ArchiveKind, ExtractionJob, detect_archive_kind};
pub use folder_watcher::{FolderWatcher, WatchSet};
pub use signals::{LifecycleSignal, SignalBus};

/// Helper function to run the watch set with graceful signal handling.
///
/// Waits for a termination signal and then calls the watch set's
/// `shutdown()` method, letting in-flight extraction jobs settle.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use autounpack::{Config, WatchSet, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> autounpack::Result<()> {
///     let watch_set = WatchSet::start(Config::default())?;
///     run_with_shutdown(watch_set).await;
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(watch_set: WatchSet) {
    wait_for_signal().await;
    watch_set.shutdown().await;
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
