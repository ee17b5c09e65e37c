//! Configuration types for autounpack

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Readiness probing behavior (poll interval, total wait budget)
///
/// Filesystem creation events fire at file-creation time, which may precede
/// write completion by an unbounded interval. These settings bound how long a
/// job waits for the writer to let go of the file before giving up with
/// [`ExtractError::NotReady`](crate::error::ExtractError::NotReady).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReadinessConfig {
    /// Delay between readiness probes (default: 100ms)
    #[serde(default = "default_poll_interval", with = "duration_ms_serde")]
    pub poll_interval: Duration,

    /// Total time to wait for a file to become ready (default: 30s)
    #[serde(default = "default_ready_timeout", with = "duration_ms_serde")]
    pub timeout: Duration,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            timeout: default_ready_timeout(),
        }
    }
}

/// Top-level configuration
///
/// `watch_dirs` is consumed as a snapshot when the watch subsystem starts;
/// changing the set of watched directories requires a restart (known
/// limitation, not a core responsibility).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Absolute paths of the directories to watch (non-recursive)
    #[serde(default)]
    pub watch_dirs: Vec<PathBuf>,

    /// Readiness probing behavior
    #[serde(default)]
    pub readiness: ReadinessConfig,

    /// Capacity of the lifecycle signal broadcast channel (default: 100)
    ///
    /// Subscribers that fall further behind than this observe a lag error
    /// instead of blocking emission.
    #[serde(default = "default_signal_capacity")]
    pub signal_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            watch_dirs: Vec::new(),
            readiness: ReadinessConfig::default(),
            signal_capacity: default_signal_capacity(),
        }
    }
}

impl Config {
    /// Validate the configuration
    ///
    /// # Errors
    /// Returns [`Error::Config`] if a watch directory is not an absolute
    /// path, the signal channel capacity is zero, or the readiness poll
    /// interval is zero (which would degenerate into a busy spin).
    pub fn validate(&self) -> Result<()> {
        for dir in &self.watch_dirs {
            if !dir.is_absolute() {
                return Err(Error::Config {
                    message: format!(
                        "watch directory must be an absolute path: {}",
                        dir.display()
                    ),
                    key: Some("watch_dirs".to_string()),
                });
            }
        }

        if self.signal_capacity == 0 {
            return Err(Error::Config {
                message: "signal channel capacity must be at least 1".to_string(),
                key: Some("signal_capacity".to_string()),
            });
        }

        if self.readiness.poll_interval.is_zero() {
            return Err(Error::Config {
                message: "readiness poll interval must be non-zero".to_string(),
                key: Some("readiness.poll_interval".to_string()),
            });
        }

        Ok(())
    }
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(100)
}

fn default_ready_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_signal_capacity() -> usize {
    100
}

mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
