use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::ports::LoadMonitor;
use crate::types::OperationHandle;

use super::event_bus::EventBus;
use super::events::{EventStatus, LifecycleEvent, LifecycleEventKind, LifecycleListener};
use super::messages::{CONNECTED, ERROR_ACQUIRING_DATA, MONITOR_INIT_FAILED, SCAN_STATUS_LOST};
use super::registry::OperationRegistry;
use super::status::{OperationState, OperationStatus};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkflowStep {
    /// Waiting for the inner add or refresh to finish.
    AwaitingScan,
    InitializingMonitor,
    Done,
}

/// Chains a scan into load-monitor initialization for one connecting node.
///
/// Registered as a one-shot listener. It reacts only to the terminal event
/// of its inner operation, identified by handle, and the step lock makes the
/// transition out of `AwaitingScan` happen once even when the event and a
/// registry reconcile arrive together.
pub struct NodeConnectWorkflow {
    subject: String,
    inner: OperationHandle,
    outer: OperationHandle,
    step: Mutex<WorkflowStep>,
    registry: Arc<OperationRegistry>,
    monitor: Arc<dyn LoadMonitor>,
    events: Arc<EventBus>,
}

impl fmt::Debug for NodeConnectWorkflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeConnectWorkflow")
            .field("subject", &self.subject)
            .field("inner", &self.inner)
            .field("outer", &self.outer)
            .field("step", &*self.step.lock())
            .finish()
    }
}

impl NodeConnectWorkflow {
    pub fn new(
        subject: impl Into<String>,
        inner: OperationHandle,
        outer: OperationHandle,
        registry: Arc<OperationRegistry>,
        monitor: Arc<dyn LoadMonitor>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            subject: subject.into(),
            inner,
            outer,
            step: Mutex::new(WorkflowStep::AwaitingScan),
            registry,
            monitor,
            events,
        }
    }

    pub fn step(&self) -> WorkflowStep {
        *self.step.lock()
    }

    pub fn is_done(&self) -> bool {
        self.step() == WorkflowStep::Done
    }

    /// Advances from the registry in case the inner operation finished
    /// before this workflow was listening.
    pub async fn reconcile(&self) {
        match self.registry.get(self.inner) {
            Ok(status) if status.is_terminal() => self.advance(&status).await,
            Ok(_) => {}
            Err(_) => {
                {
                    let mut step = self.step.lock();
                    if *step != WorkflowStep::AwaitingScan {
                        return;
                    }
                    *step = WorkflowStep::Done;
                }
                warn!(
                    host = %self.subject,
                    inner = %self.inner,
                    "inner operation vanished before completion"
                );
                self.finish(OperationStatus::failed(
                    format!("{ERROR_ACQUIRING_DATA}{SCAN_STATUS_LOST}"),
                    &self.subject,
                ));
            }
        }
    }

    async fn advance(&self, inner: &OperationStatus) {
        {
            let mut step = self.step.lock();
            if *step != WorkflowStep::AwaitingScan {
                return;
            }
            *step = match inner.state {
                OperationState::Success => WorkflowStep::InitializingMonitor,
                OperationState::Failed => WorkflowStep::Done,
                OperationState::Unknown | OperationState::Pending => return,
            };
        }

        if inner.state == OperationState::Failed {
            self.finish(OperationStatus::failed(
                format!("{ERROR_ACQUIRING_DATA}{}", inner.message),
                &self.subject,
            ));
            return;
        }

        debug!(host = %self.subject, "scan finished; initializing load monitor");
        let outcome = match self.monitor.node_connected(&self.subject).await {
            Ok(()) => OperationStatus::success(CONNECTED, &self.subject),
            Err(err) => {
                OperationStatus::failed(format!("{MONITOR_INIT_FAILED}{err}"), &self.subject)
            }
        };
        self.finish(outcome);
    }

    fn finish(&self, outcome: OperationStatus) {
        *self.step.lock() = WorkflowStep::Done;

        let status = if outcome.state == OperationState::Success {
            EventStatus::Succeeded
        } else {
            EventStatus::Failed
        };
        let message = outcome.message.clone();
        if self.registry.update(self.outer, outcome) {
            info!(host = %self.subject, handle = %self.outer, ?status, "node connect finished");
            let event = LifecycleEvent::new(
                LifecycleEventKind::NodeConnected,
                status,
                &self.subject,
                message,
            );
            self.events.publish(event.with_handle(self.outer));
        }
        let _ = self.registry.remove(self.inner);
    }
}

#[async_trait]
impl LifecycleListener for NodeConnectWorkflow {
    async fn on_event(&self, event: &LifecycleEvent) {
        if event.handle != Some(self.inner) {
            return;
        }
        let inner = if event.succeeded() {
            OperationStatus::success(&event.message, &self.subject)
        } else {
            OperationStatus::failed(&event.message, &self.subject)
        };
        self.advance(&inner).await;
    }

    fn remove_me(&self) -> bool {
        self.is_done()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::CollaboratorError;

    #[derive(Default)]
    struct CountingMonitor {
        connected: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl LoadMonitor for CountingMonitor {
        async fn node_connected(&self, _name: &str) -> Result<(), CollaboratorError> {
            self.connected.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(CollaboratorError::Rejected("monitor offline".into()));
            }
            Ok(())
        }

        async fn node_disconnected(&self, _name: &str) -> Result<(), CollaboratorError> {
            Ok(())
        }
    }

    fn workflow(
        monitor: Arc<CountingMonitor>,
    ) -> (NodeConnectWorkflow, Arc<OperationRegistry>) {
        let registry = Arc::new(OperationRegistry::new());
        let events = Arc::new(EventBus::new(1).expect("bus"));
        let inner = registry.allocate();
        let outer = registry.allocate();
        registry.insert(inner, OperationStatus::pending("scan", "n1"));
        registry.insert(outer, OperationStatus::pending("connect", "n1"));
        let workflow =
            NodeConnectWorkflow::new("n1", inner, outer, Arc::clone(&registry), monitor, events);
        (workflow, registry)
    }

    fn terminal(
        workflow: &NodeConnectWorkflow,
        status: EventStatus,
        message: &str,
    ) -> LifecycleEvent {
        LifecycleEvent::new(LifecycleEventKind::NodeAdd, status, "n1", message)
            .with_handle(workflow.inner)
    }

    #[tokio::test]
    async fn success_initializes_monitor_once() {
        let monitor = Arc::new(CountingMonitor::default());
        let (workflow, registry) = workflow(Arc::clone(&monitor));

        let event = terminal(&workflow, EventStatus::Succeeded, "added");
        workflow.on_event(&event).await;
        workflow.on_event(&event).await;
        workflow.reconcile().await;

        assert_eq!(monitor.connected.load(Ordering::SeqCst), 1);
        let outer = registry.get(workflow.outer).expect("outer");
        assert_eq!(outer.state, OperationState::Success);
        assert_eq!(outer.message, CONNECTED);
        assert!(registry.get(workflow.inner).is_err());
        assert!(workflow.remove_me());
    }

    #[tokio::test]
    async fn inner_failure_is_propagated_with_prefix() {
        let monitor = Arc::new(CountingMonitor::default());
        let (workflow, registry) = workflow(Arc::clone(&monitor));

        workflow
            .on_event(&terminal(&workflow, EventStatus::Failed, "boom"))
            .await;

        let outer = registry.get(workflow.outer).expect("outer");
        assert_eq!(outer.state, OperationState::Failed);
        assert_eq!(outer.message, format!("{ERROR_ACQUIRING_DATA}boom"));
        assert_eq!(monitor.connected.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn monitor_failure_fails_outer() {
        let monitor = Arc::new(CountingMonitor {
            fail: true,
            ..Default::default()
        });
        let (workflow, registry) = workflow(monitor);

        workflow
            .on_event(&terminal(&workflow, EventStatus::Succeeded, "added"))
            .await;

        let outer = registry.get(workflow.outer).expect("outer");
        assert_eq!(outer.state, OperationState::Failed);
        assert!(outer.message.starts_with(MONITOR_INIT_FAILED));
        assert!(outer.message.contains("monitor offline"));
    }

    #[tokio::test]
    async fn missing_inner_status_fails_outer() {
        let monitor = Arc::new(CountingMonitor::default());
        let (workflow, registry) = workflow(Arc::clone(&monitor));
        registry.remove(workflow.inner).expect("inner present");

        workflow.reconcile().await;

        assert!(workflow.is_done());
        let outer = registry.get(workflow.outer).expect("outer");
        assert_eq!(outer.state, OperationState::Failed);
        assert_eq!(
            outer.message,
            format!("{ERROR_ACQUIRING_DATA}{SCAN_STATUS_LOST}")
        );
        assert_eq!(monitor.connected.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unrelated_events_are_ignored() {
        let monitor = Arc::new(CountingMonitor::default());
        let (workflow, _registry) = workflow(Arc::clone(&monitor));

        let other = LifecycleEvent::new(
            LifecycleEventKind::NodeAdd,
            EventStatus::Succeeded,
            "n1",
            "added",
        )
        .with_handle(OperationHandle(999));
        workflow.on_event(&other).await;

        assert_eq!(workflow.step(), WorkflowStep::AwaitingScan);
        assert!(!workflow.remove_me());
    }
}
