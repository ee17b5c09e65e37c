//! Folder watching for automatic archive extraction
//!
//! This module provides the filesystem-watching half of the pipeline:
//! - One independent worker per watched directory, driven by OS-level
//!   change notifications
//! - Non-recursive watching (only the directory itself, not subdirectories)
//! - Per-directory serialization: a worker finishes one extraction job
//!   before looking at the next event, so two jobs can never collide on the
//!   same destination folder, while separate directories extract fully in
//!   parallel
//! - A [`WatchSet`] supervisor that owns every worker and can stop them all
//!   on shutdown
//!
//! # Example
//!
//! ```no_run
//! use autounpack::{Config, WatchSet};
//!
//! # async fn example() -> autounpack::Result<()> {
//! let config = Config {
//!     watch_dirs: vec!["/home/user/Downloads".into()],
//!     ..Default::default()
//! };
//!
//! let watch_set = WatchSet::start(config)?;
//!
//! let mut signals = watch_set.subscribe();
//! tokio::spawn(async move {
//!     while let Ok(signal) = signals.recv().await {
//!         tracing::info!(?signal, "extraction lifecycle");
//!     }
//! });
//!
//! watch_set.shutdown().await;
//! # Ok(())
//! # }
//! ```

use crate::config::Config;
use crate::error::{Error, Result, WatchError};
use crate::extraction::{ArchiveDispatcher, detect_archive_kind};
use crate::signals::{LifecycleSignal, SignalBus};
use notify::event::{ModifyKind, RenameMode};
use notify::{
    Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Watches a single directory for newly-created archive files
///
/// Qualifying creation events become extraction jobs handed to the
/// [`ArchiveDispatcher`] one at a time, in arrival order.
pub struct FolderWatcher {
    /// Filesystem watcher instance
    watcher: RecommendedWatcher,

    /// Channel for receiving filesystem events
    rx: mpsc::UnboundedReceiver<notify::Result<Event>>,

    /// Dispatcher handling accepted archive events
    dispatcher: Arc<ArchiveDispatcher>,

    /// Directory under observation
    path: PathBuf,
}

impl FolderWatcher {
    /// Create a watcher for one directory
    ///
    /// The OS-level subscription is not registered until
    /// [`start`](FolderWatcher::start) is called.
    ///
    /// # Errors
    /// Returns [`WatchError::SetupFailed`] if the filesystem watcher cannot
    /// be initialized.
    pub fn new(path: impl Into<PathBuf>, dispatcher: Arc<ArchiveDispatcher>) -> Result<Self> {
        let path = path.into();
        let (tx, rx) = mpsc::unbounded_channel();

        let watcher = RecommendedWatcher::new(
            move |res| {
                if let Err(e) = tx.send(res) {
                    error!("failed to forward filesystem event: {}", e);
                }
            },
            NotifyConfig::default(),
        )
        .map_err(|e| WatchError::SetupFailed {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            watcher,
            rx,
            dispatcher,
            path,
        })
    }

    /// Register the OS-level subscription, non-recursive
    ///
    /// # Errors
    /// Returns [`WatchError::SetupFailed`] if the directory cannot be
    /// watched (e.g., it does not exist or is inaccessible).
    pub fn start(&mut self) -> Result<()> {
        self.watcher
            .watch(&self.path, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::SetupFailed {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        info!(path = %self.path.display(), "watching folder");
        Ok(())
    }

    /// Run the event loop until cancelled or the subscription is lost
    ///
    /// Extraction is awaited inline, so this directory's events are
    /// processed strictly one at a time, in arrival order. Cancellation is
    /// only observed between jobs; an in-flight job runs to its terminal
    /// state.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(path = %self.path.display(), "folder watcher started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(path = %self.path.display(), "folder watcher cancelled");
                    break;
                }
                maybe_event = self.rx.recv() => {
                    match maybe_event {
                        Some(Ok(event)) => self.handle_event(event).await,
                        Some(Err(e)) => {
                            if self.path.is_dir() {
                                // Transient backend error; keep the subscription
                                warn!(path = %self.path.display(), error = %e, "filesystem watcher error");
                            } else {
                                let lost = WatchError::Lost {
                                    path: self.path.clone(),
                                    reason: e.to_string(),
                                };
                                error!(error = %lost, "stopping folder watcher");
                                break;
                            }
                        }
                        None => {
                            warn!(path = %self.path.display(), "filesystem event channel closed");
                            break;
                        }
                    }
                }
            }
        }

        // Dropping the watcher releases the OS-level subscription
        info!(path = %self.path.display(), "folder watcher stopped");
    }

    /// Handle a filesystem event
    ///
    /// Only files *appearing* in the directory qualify: plain creations and
    /// renames into the directory (downloaders and editors commonly write
    /// to a temporary name, then rename). Directories are ignored, as are
    /// files without a supported archive extension. Events whose path
    /// cannot be inspected are logged and dropped; they never crash the
    /// watcher.
    async fn handle_event(&self, event: Event) {
        let created = matches!(
            event.kind,
            EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(RenameMode::To))
        );
        if !created {
            return;
        }

        for path in event.paths {
            match std::fs::metadata(&path) {
                Ok(meta) if meta.is_dir() => {
                    debug!(?path, "ignoring new directory");
                    continue;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(?path, error = %e, "dropping event for uninspectable path");
                    continue;
                }
            }

            if !is_supported_archive(&path) {
                debug!(?path, "ignoring non-archive file");
                continue;
            }

            // Awaited inline: one job at a time per directory
            if let Err(e) = self.dispatcher.extract(&path).await {
                error!(?path, error = %e, "extraction job failed");
            }
        }
    }
}

/// Check whether `path` carries a supported archive extension
///
/// Delegates to the dispatcher's own kind detection so the watcher's
/// pre-filter and the dispatcher's authoritative check always agree.
fn is_supported_archive(path: &Path) -> bool {
    detect_archive_kind(path).is_some()
}

/// Supervises one [`FolderWatcher`] worker per watched directory
///
/// Created from a snapshot of [`Config::watch_dirs`]; the set of watched
/// directories is fixed for the lifetime of the `WatchSet` (adding a folder
/// requires starting a new set, a known limitation). All workers share one
/// [`SignalBus`] and one cancellation token.
#[derive(Debug)]
pub struct WatchSet {
    /// Running per-directory workers
    workers: Vec<(PathBuf, JoinHandle<()>)>,

    /// Directories that could not be watched at start time
    failures: Vec<(PathBuf, Error)>,

    /// Cancels every worker on shutdown
    cancel: CancellationToken,

    /// Bus receiving Started/Finished from every worker's jobs
    signals: SignalBus,
}

impl WatchSet {
    /// Validate `config` and start a worker for every watch directory
    ///
    /// A directory that cannot be watched is logged, recorded (see
    /// [`setup_failures`](WatchSet::setup_failures)), and skipped; it never
    /// prevents the remaining directories from being watched.
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Errors
    /// Returns [`Error::Config`] only for an invalid configuration;
    /// per-directory setup failures do not fail the whole set.
    pub fn start(config: Config) -> Result<Self> {
        config.validate()?;

        let signals = SignalBus::new(config.signal_capacity);
        let dispatcher = Arc::new(ArchiveDispatcher::new(
            config.readiness.clone(),
            signals.clone(),
        ));
        let cancel = CancellationToken::new();

        let mut workers = Vec::new();
        let mut failures = Vec::new();

        for dir in &config.watch_dirs {
            match Self::spawn_worker(dir, Arc::clone(&dispatcher), cancel.clone()) {
                Ok(handle) => workers.push((dir.clone(), handle)),
                Err(e) => {
                    error!(path = %dir.display(), error = %e, "failed to set up folder watch");
                    failures.push((dir.clone(), e));
                }
            }
        }

        info!(
            watching = workers.len(),
            failed = failures.len(),
            "watch set started"
        );

        Ok(Self {
            workers,
            failures,
            cancel,
            signals,
        })
    }

    /// Create, register, and spawn one directory worker
    fn spawn_worker(
        dir: &Path,
        dispatcher: Arc<ArchiveDispatcher>,
        cancel: CancellationToken,
    ) -> Result<JoinHandle<()>> {
        let mut watcher = FolderWatcher::new(dir, dispatcher)?;
        watcher.start()?;
        Ok(tokio::spawn(watcher.run(cancel)))
    }

    /// Subscribe to the lifecycle signals of every worker's jobs
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleSignal> {
        self.signals.subscribe()
    }

    /// The signal bus shared by all workers
    pub fn signals(&self) -> &SignalBus {
        &self.signals
    }

    /// Directories with a live worker
    pub fn watched_dirs(&self) -> Vec<&Path> {
        self.workers.iter().map(|(path, _)| path.as_path()).collect()
    }

    /// Directories that could not be watched at start time, with the reason
    pub fn setup_failures(&self) -> &[(PathBuf, Error)] {
        &self.failures
    }

    /// Stop every worker and wait for in-flight jobs to settle
    ///
    /// Each worker observes cancellation between jobs, so a running
    /// extraction reaches its terminal state (and emits `Finished`) before
    /// its worker exits. Dropping the workers releases all OS-level watch
    /// subscriptions.
    pub async fn shutdown(self) {
        info!("shutting down watch set");
        self.cancel.cancel();

        for (path, handle) in self.workers {
            if let Err(e) = handle.await {
                error!(path = %path.display(), error = %e, "worker task panicked");
            }
        }

        info!("watch set stopped");
    }
}
