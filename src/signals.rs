//! Lifecycle signal broadcasting
//!
//! Extraction jobs report a busy/idle state to any number of process-local
//! observers (a GUI flipping a tray icon, a logger, metrics). The bus is a
//! broadcast point: every subscriber receives every signal in emission
//! order, and a slow subscriber lags rather than blocking the emitter. The
//! core has zero compile-time dependency on any presentation layer.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Stateless event marking the start or end of an extraction job
///
/// Emitted with no payload. Exactly one `Finished` follows every `Started`,
/// whether the job succeeded or failed, so observers never see a stuck busy
/// state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleSignal {
    /// An extraction job has been accepted and is now running
    Started,
    /// The extraction job reached a terminal state (success or failure)
    Finished,
}

/// Broadcast point for [`LifecycleSignal`]s
///
/// Cloning the bus is cheap and every clone emits into the same channel.
/// Subscribing and unsubscribing (dropping the receiver) are safe at any
/// time, concurrently with emission.
#[derive(Clone, Debug)]
pub struct SignalBus {
    tx: broadcast::Sender<LifecycleSignal>,
}

impl SignalBus {
    /// Create a bus whose subscribers may buffer up to `capacity` signals
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all signals emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleSignal> {
        self.tx.subscribe()
    }

    /// Emit a signal to all current subscribers
    ///
    /// Never blocks. With no subscribers the signal is silently dropped
    /// (send returns Err, which is fine; extraction continues whether or
    /// not anyone is listening).
    pub fn emit(&self, signal: LifecycleSignal) {
        self.tx.send(signal).ok();
    }

    /// Number of currently attached subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new(100)
    }
}
