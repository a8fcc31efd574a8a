use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::{HostManagerError, Result};

/// Static tuning for the node lifecycle controller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Cadence of the watchdog sweep over pending scans (ms)
    pub pending_check_interval_ms: u64,
    /// Age after which an unanswered scan is failed as timed out (ms)
    pub host_detection_timeout_ms: u64,
    /// Number of event bus dispatch workers
    pub event_workers: usize,
    /// Retention for finished operation statuses; `None` keeps them until removed
    pub status_ttl_secs: Option<u64>,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            pending_check_interval_ms: 1_000,
            host_detection_timeout_ms: 120_000,
            event_workers: 4,
            status_ttl_secs: Some(3_600),
        }
    }
}

impl LifecycleConfig {
    pub fn timings(&self) -> LifecycleTimings {
        LifecycleTimings {
            pending_check_interval: Duration::from_millis(self.pending_check_interval_ms),
            host_detection_timeout: Duration::from_millis(self.host_detection_timeout_ms),
        }
    }

    pub fn status_ttl(&self) -> Option<Duration> {
        self.status_ttl_secs.map(Duration::from_secs)
    }

    /// Rejects zero durations. A zero status TTL would evict statuses that
    /// composite workflows still wait on.
    pub fn validate(&self) -> Result<()> {
        self.timings().validate()?;
        if self.status_ttl_secs == Some(0) {
            return Err(HostManagerError::InvalidOption(
                "status ttl must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Watchdog timings that can change while the controller runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LifecycleTimings {
    /// How often pending scans are swept
    pub pending_check_interval: Duration,
    /// Age at which a pending scan is failed as timed out
    pub host_detection_timeout: Duration,
}

impl LifecycleTimings {
    fn validate(&self) -> Result<()> {
        if self.pending_check_interval.is_zero() {
            return Err(HostManagerError::InvalidOption(
                "pending check interval must be greater than zero".into(),
            ));
        }
        if self.host_detection_timeout.is_zero() {
            return Err(HostManagerError::InvalidOption(
                "host detection timeout must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Runtime-adjustable timings with change notification.
///
/// Every accepted change is broadcast to subscribers; the watchdog listens
/// and restarts its timer with the new values.
pub struct LifecycleOptions {
    tx: watch::Sender<LifecycleTimings>,
}

impl fmt::Debug for LifecycleOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleOptions")
            .field("timings", &*self.tx.borrow())
            .field("subscribers", &self.tx.receiver_count())
            .finish()
    }
}

impl LifecycleOptions {
    pub fn new(timings: LifecycleTimings) -> Result<Self> {
        timings.validate()?;
        let (tx, _rx) = watch::channel(timings);
        Ok(Self { tx })
    }

    pub fn timings(&self) -> LifecycleTimings {
        *self.tx.borrow()
    }

    pub fn pending_check_interval(&self) -> Duration {
        self.tx.borrow().pending_check_interval
    }

    pub fn host_detection_timeout(&self) -> Duration {
        self.tx.borrow().host_detection_timeout
    }

    pub fn set_pending_check_interval(&self, interval: Duration) -> Result<()> {
        self.apply(LifecycleTimings {
            pending_check_interval: interval,
            ..self.timings()
        })
    }

    pub fn set_host_detection_timeout(&self, timeout: Duration) -> Result<()> {
        self.apply(LifecycleTimings {
            host_detection_timeout: timeout,
            ..self.timings()
        })
    }

    /// Validates and publishes both values at once. Unchanged values do not
    /// notify subscribers.
    pub fn apply(&self, timings: LifecycleTimings) -> Result<()> {
        timings.validate()?;
        self.tx.send_if_modified(|current| {
            if *current == timings {
                false
            } else {
                *current = timings;
                true
            }
        });
        Ok(())
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleTimings> {
        self.tx.subscribe()
    }
}
