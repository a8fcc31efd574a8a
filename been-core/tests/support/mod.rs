#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use been_core::infra::{InMemoryHostDatabase, PassthroughResolver};
use been_core::lifecycle::detector::CORRELATION_PROPERTY;
use been_core::ports::{LoadMonitor, TaskDescriptor, TaskExecution};
use been_core::{
    CollaboratorError, CorrelationKey, LifecycleCollaborators, LifecycleConfig, LifecycleEvent,
    LifecycleListener, NodeLifecycleController, OperationHandle, OperationStatus,
};
use mockall::mock;
use parking_lot::Mutex;
use tokio::time::Instant;

mock! {
    pub Tasks {}

    #[async_trait]
    impl TaskExecution for Tasks {
        async fn submit(&self, task: TaskDescriptor) -> Result<(), CollaboratorError>;
        async fn registered_host_runtimes(&self) -> Result<Vec<String>, CollaboratorError>;
    }
}

mock! {
    pub Monitor {}

    #[async_trait]
    impl LoadMonitor for Monitor {
        async fn node_connected(&self, name: &str) -> Result<(), CollaboratorError>;
        async fn node_disconnected(&self, name: &str) -> Result<(), CollaboratorError>;
    }
}

/// Task service that accepts (or refuses) everything and remembers what it saw.
#[derive(Default)]
pub struct FakeTasks {
    submitted: Mutex<Vec<TaskDescriptor>>,
    refuse: AtomicBool,
}

impl FakeTasks {
    pub fn refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    pub fn submissions(&self) -> usize {
        self.submitted.lock().len()
    }

    pub fn key_for(&self, host: &str) -> Option<CorrelationKey> {
        self.submitted
            .lock()
            .iter()
            .rev()
            .find(|task| task.host_name == host)
            .and_then(|task| task.properties.get(CORRELATION_PROPERTY))
            .map(|key| CorrelationKey::from(key.as_str()))
    }
}

#[async_trait]
impl TaskExecution for FakeTasks {
    async fn submit(&self, task: TaskDescriptor) -> Result<(), CollaboratorError> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Rejected("host runtime unavailable".into()));
        }
        self.submitted.lock().push(task);
        Ok(())
    }

    async fn registered_host_runtimes(&self) -> Result<Vec<String>, CollaboratorError> {
        Ok(Vec::new())
    }
}

#[derive(Default)]
pub struct CountingMonitor {
    pub connected: AtomicUsize,
    pub disconnected: AtomicUsize,
}

impl CountingMonitor {
    pub fn connected(&self) -> usize {
        self.connected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LoadMonitor for CountingMonitor {
    async fn node_connected(&self, _name: &str) -> Result<(), CollaboratorError> {
        self.connected.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn node_disconnected(&self, _name: &str) -> Result<(), CollaboratorError> {
        self.disconnected.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Listener that keeps every event it receives.
#[derive(Default)]
pub struct EventLog {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl EventLog {
    pub fn snapshot(&self) -> Vec<LifecycleEvent> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl LifecycleListener for EventLog {
    async fn on_event(&self, event: &LifecycleEvent) {
        self.events.lock().push(event.clone());
    }
}

pub struct Harness {
    pub controller: Arc<NodeLifecycleController>,
    pub database: Arc<InMemoryHostDatabase>,
    pub tasks: Arc<FakeTasks>,
    pub monitor: Arc<CountingMonitor>,
}

pub fn config(timeout_ms: u64, interval_ms: u64) -> LifecycleConfig {
    LifecycleConfig {
        pending_check_interval_ms: interval_ms,
        host_detection_timeout_ms: timeout_ms,
        event_workers: 2,
        status_ttl_secs: None,
    }
}

pub fn harness(config: LifecycleConfig) -> Harness {
    let database = Arc::new(InMemoryHostDatabase::new());
    let tasks = Arc::new(FakeTasks::default());
    let monitor = Arc::new(CountingMonitor::default());
    let controller = NodeLifecycleController::start(
        &config,
        LifecycleCollaborators {
            database: database.clone(),
            tasks: tasks.clone(),
            monitor: monitor.clone(),
            resolver: Arc::new(PassthroughResolver),
        },
    )
    .expect("controller starts");
    Harness {
        controller,
        database,
        tasks,
        monitor,
    }
}

pub fn controller_with(
    config: LifecycleConfig,
    tasks: Arc<dyn TaskExecution>,
    monitor: Arc<dyn LoadMonitor>,
) -> (Arc<NodeLifecycleController>, Arc<InMemoryHostDatabase>) {
    let database = Arc::new(InMemoryHostDatabase::new());
    let controller = NodeLifecycleController::start(
        &config,
        LifecycleCollaborators {
            database: database.clone(),
            tasks,
            monitor,
            resolver: Arc::new(PassthroughResolver),
        },
    )
    .expect("controller starts");
    (controller, database)
}

pub async fn wait_for_terminal(
    controller: &NodeLifecycleController,
    handle: OperationHandle,
    limit: Duration,
) -> OperationStatus {
    let deadline = Instant::now() + limit;
    loop {
        let status = controller
            .get_operation_status(handle)
            .expect("status exists");
        if status.is_terminal() || Instant::now() >= deadline {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

pub async fn wait_for_key(tasks: &FakeTasks, host: &str) -> CorrelationKey {
    for _ in 0..200 {
        if let Some(key) = tasks.key_for(host) {
            return key;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("no detector submitted for {host}");
}
