use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::Mutex as TokioMutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::LifecycleOptions;
use super::event_bus::EventBus;
use super::events::{EventStatus, LifecycleEvent};
use super::messages::TIMED_OUT;
use super::pending::{PendingEntry, PendingOperationTable};
use super::registry::OperationRegistry;
use super::status::OperationStatus;

/// Periodic reaper for scans whose detector never reported back.
///
/// One timer task runs at a time. Changing the lifecycle timings cancels it
/// and starts a fresh one; the sweep gate keeps ticks from overlapping even
/// while an old timer is winding down.
pub struct Watchdog {
    pending: Arc<PendingOperationTable>,
    registry: Arc<OperationRegistry>,
    events: Arc<EventBus>,
    options: Arc<LifecycleOptions>,
    status_ttl: Option<Duration>,
    sweep_gate: TokioMutex<()>,
    current: Mutex<Option<CancellationToken>>,
    shutdown: CancellationToken,
}

impl fmt::Debug for Watchdog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watchdog")
            .field("timings", &self.options.timings())
            .field("status_ttl", &self.status_ttl)
            .field("running", &self.current.lock().is_some())
            .field("shutdown", &self.shutdown.is_cancelled())
            .finish()
    }
}

impl Watchdog {
    pub fn new(
        pending: Arc<PendingOperationTable>,
        registry: Arc<OperationRegistry>,
        events: Arc<EventBus>,
        options: Arc<LifecycleOptions>,
        status_ttl: Option<Duration>,
    ) -> Self {
        Self {
            pending,
            registry,
            events,
            options,
            status_ttl,
            sweep_gate: TokioMutex::new(()),
            current: Mutex::new(None),
            shutdown: CancellationToken::new(),
        }
    }

    /// Starts the timer and a watcher that restarts it on option changes.
    pub fn start(self: &Arc<Self>) {
        self.restart();

        let mut changes = self.options.subscribe();
        let this = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = this.shutdown.cancelled() => break,
                    changed = changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let timings = *changes.borrow_and_update();
                        info!(
                            interval = ?timings.pending_check_interval,
                            timeout = ?timings.host_detection_timeout,
                            "lifecycle timings changed; restarting watchdog"
                        );
                        this.restart();
                    }
                }
            }
        });
    }

    /// Cancels the running timer, if any, and spawns a new one with the
    /// current interval.
    pub fn restart(self: &Arc<Self>) {
        if self.shutdown.is_cancelled() {
            return;
        }

        let token = self.shutdown.child_token();
        if let Some(previous) = self.current.lock().replace(token.clone()) {
            previous.cancel();
        }

        let interval = self.options.pending_check_interval();
        let this = Arc::clone(self);
        tokio::spawn(async move {
            debug!(?interval, "watchdog timer started");
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!("watchdog timer cancelled");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        this.tick().await;
                    }
                }
            }
        });
    }

    /// One sweep: fail every expired scan, then evict stale terminal statuses.
    pub async fn tick(&self) -> Vec<PendingEntry> {
        let _gate = self.sweep_gate.lock().await;
        let now = Utc::now();
        let reaped = self
            .pending
            .sweep(now, self.options.host_detection_timeout());

        for entry in &reaped {
            warn!(
                host = %entry.subject_name,
                handle = %entry.handle,
                key = %entry.correlation_key,
                "no data received from detector; failing operation"
            );
            let failed = OperationStatus::failed(TIMED_OUT, &entry.subject_name);
            if self.registry.update(entry.handle, failed) {
                let event = LifecycleEvent::new(
                    entry.kind(),
                    EventStatus::Failed,
                    &entry.subject_name,
                    TIMED_OUT,
                );
                self.events.publish(event.with_handle(entry.handle));
            }
        }

        if let Some(ttl) = self.status_ttl {
            let evicted = self.registry.evict_terminal(now, ttl);
            if evicted > 0 {
                debug!(evicted, "evicted expired operation statuses");
            }
        }

        reaped
    }

    pub fn stop(&self) {
        self.shutdown.cancel();
        if let Some(current) = self.current.lock().take() {
            current.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::config::LifecycleTimings;
    use crate::lifecycle::event_bus::ChannelListener;
    use crate::lifecycle::events::LifecycleEventKind;
    use crate::lifecycle::status::OperationState;
    use crate::types::{CorrelationKey, OperationHandle};

    type Fixture = (
        Arc<Watchdog>,
        Arc<OperationRegistry>,
        Arc<PendingOperationTable>,
        Arc<EventBus>,
    );

    fn fixture(timeout: Duration, interval: Duration) -> Fixture {
        let pending = Arc::new(PendingOperationTable::new());
        let registry = Arc::new(OperationRegistry::new());
        let events = Arc::new(EventBus::new(1).expect("bus"));
        let options = Arc::new(
            LifecycleOptions::new(LifecycleTimings {
                pending_check_interval: interval,
                host_detection_timeout: timeout,
            })
            .expect("options"),
        );
        let watchdog = Arc::new(Watchdog::new(
            Arc::clone(&pending),
            Arc::clone(&registry),
            Arc::clone(&events),
            options,
            None,
        ));
        (watchdog, registry, pending, events)
    }

    fn track(
        registry: &OperationRegistry,
        pending: &PendingOperationTable,
        subject: &str,
        is_refresh: bool,
    ) -> OperationHandle {
        let handle = registry.allocate();
        registry.insert(handle, OperationStatus::pending("waiting", subject));
        pending
            .register(PendingEntry {
                subject_name: subject.to_string(),
                correlation_key: CorrelationKey::for_handle(handle),
                started_at: Utc::now(),
                is_refresh,
                handle,
            })
            .expect("register");
        handle
    }

    #[tokio::test]
    async fn tick_fails_expired_entries_once() {
        let (watchdog, registry, pending, events) =
            fixture(Duration::from_millis(10), Duration::from_secs(60));
        let (listener, mut rx) = ChannelListener::new();
        events.register(Arc::new(listener));
        let handle = track(&registry, &pending, "slow", true);

        tokio::time::sleep(Duration::from_millis(30)).await;
        let reaped = watchdog.tick().await;
        assert_eq!(reaped.len(), 1);
        assert!(watchdog.tick().await.is_empty());

        let status = registry.get(handle).expect("status");
        assert_eq!(status.state, OperationState::Failed);
        assert_eq!(status.message, TIMED_OUT);

        let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("event")
            .expect("open");
        assert_eq!(event.kind, LifecycleEventKind::NodeRefresh);
        assert_eq!(event.status, EventStatus::Failed);
        assert_eq!(event.handle, Some(handle));
    }

    #[tokio::test]
    async fn timer_reaps_without_manual_ticks() {
        let (watchdog, registry, pending, _events) =
            fixture(Duration::from_millis(20), Duration::from_millis(5));
        let handle = track(&registry, &pending, "quiet", false);
        watchdog.start();

        tokio::time::sleep(Duration::from_millis(120)).await;
        let status = registry.get(handle).expect("status");
        assert_eq!(status.state, OperationState::Failed);
        assert!(pending.is_empty());
        watchdog.stop();
    }

    #[tokio::test]
    async fn stopped_watchdog_leaves_entries_alone() {
        let (watchdog, registry, pending, _events) =
            fixture(Duration::from_millis(5), Duration::from_millis(5));
        watchdog.start();
        watchdog.stop();
        let handle = track(&registry, &pending, "idle", false);

        tokio::time::sleep(Duration::from_millis(50)).await;
        let status = registry.get(handle).expect("status");
        assert_eq!(status.state, OperationState::Pending);
        assert_eq!(pending.len(), 1);
    }
}
