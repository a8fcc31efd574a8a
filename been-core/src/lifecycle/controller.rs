use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::error::{CollaboratorError, HostManagerError, Result};
use crate::ports::{HostDatabase, HostResolver, LoadMonitor, TaskExecution, UserProperties};
use crate::types::{CorrelationKey, HostGroup, ListenerId, OperationHandle};

use super::config::{LifecycleConfig, LifecycleOptions};
use super::detector::DetectorScheduler;
use super::event_bus::EventBus;
use super::events::{EventStatus, LifecycleEvent, LifecycleEventKind, LifecycleListener};
use super::messages::*;
use super::pending::{PendingEntry, PendingOperationTable};
use super::registry::OperationRegistry;
use super::status::{OperationState, OperationStatus};
use super::watchdog::Watchdog;
use super::workflow::NodeConnectWorkflow;

/// External services the controller talks to.
#[derive(Clone)]
pub struct LifecycleCollaborators {
    pub database: Arc<dyn HostDatabase>,
    pub tasks: Arc<dyn TaskExecution>,
    pub monitor: Arc<dyn LoadMonitor>,
    pub resolver: Arc<dyn HostResolver>,
}

impl fmt::Debug for LifecycleCollaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleCollaborators").finish_non_exhaustive()
    }
}

/// Onboards, refreshes and connects cluster nodes.
///
/// Every public operation that involves a remote round trip returns an
/// [`OperationHandle`] right away; the outcome is observed by polling
/// [`NodeLifecycleController::get_operation_status`] or by listening for
/// [`LifecycleEvent`]s. Only requests that can be rejected up front fail
/// synchronously.
pub struct NodeLifecycleController {
    registry: Arc<OperationRegistry>,
    pending: Arc<PendingOperationTable>,
    events: Arc<EventBus>,
    options: Arc<LifecycleOptions>,
    scheduler: DetectorScheduler,
    watchdog: Arc<Watchdog>,
    database: Arc<dyn HostDatabase>,
    tasks: Arc<dyn TaskExecution>,
    monitor: Arc<dyn LoadMonitor>,
    resolver: Arc<dyn HostResolver>,
}

impl fmt::Debug for NodeLifecycleController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeLifecycleController")
            .field("registry", &self.registry)
            .field("pending", &self.pending)
            .field("events", &self.events)
            .field("watchdog", &self.watchdog)
            .finish_non_exhaustive()
    }
}

impl Drop for NodeLifecycleController {
    fn drop(&mut self) {
        self.watchdog.stop();
    }
}

impl NodeLifecycleController {
    /// Builds the controller and starts its watchdog. Must run inside a
    /// tokio runtime.
    pub fn start(
        config: &LifecycleConfig,
        collaborators: LifecycleCollaborators,
    ) -> Result<Arc<Self>> {
        config.validate()?;
        let registry = Arc::new(OperationRegistry::new());
        let pending = Arc::new(PendingOperationTable::new());
        let events = Arc::new(EventBus::new(config.event_workers)?);
        let options = Arc::new(LifecycleOptions::new(config.timings())?);
        let watchdog = Arc::new(Watchdog::new(
            Arc::clone(&pending),
            Arc::clone(&registry),
            Arc::clone(&events),
            Arc::clone(&options),
            config.status_ttl(),
        ));
        watchdog.start();

        info!(
            interval_ms = config.pending_check_interval_ms,
            timeout_ms = config.host_detection_timeout_ms,
            workers = config.event_workers,
            "node lifecycle controller started"
        );

        Ok(Arc::new(Self {
            registry,
            pending,
            events,
            options,
            scheduler: DetectorScheduler::new(Arc::clone(&collaborators.tasks)),
            watchdog,
            database: collaborators.database,
            tasks: collaborators.tasks,
            monitor: collaborators.monitor,
            resolver: collaborators.resolver,
        }))
    }

    /// Runtime-tunable watchdog timings. Changes restart the watchdog.
    pub fn options(&self) -> &LifecycleOptions {
        &self.options
    }

    /// Runs one watchdog sweep immediately.
    pub async fn sweep_now(&self) -> usize {
        self.watchdog.tick().await.len()
    }

    /// Stops the watchdog. Pending scans stay pending until the controller is dropped.
    pub fn shutdown(&self) {
        info!("node lifecycle controller shutting down");
        self.watchdog.stop();
    }

    /// Onboards a host by scheduling a detector on it.
    ///
    /// Fails synchronously only when the name does not resolve. A host that
    /// is already known gets a handle that is failed from the start.
    #[instrument(skip(self))]
    pub async fn add_host(&self, name: &str) -> Result<OperationHandle> {
        let canonical = self.resolve(name).await?;
        let known = self.database.is_known(&canonical).await?;
        Ok(self.start_scan(&canonical, false, known).await)
    }

    /// Re-scans a known host, keeping its user properties.
    #[instrument(skip(self))]
    pub async fn refresh_host(&self, name: &str) -> Result<OperationHandle> {
        let canonical = self.resolve(name).await?;
        let known = self.database.is_known(&canonical).await?;
        Ok(self.start_scan(&canonical, true, known).await)
    }

    /// Refreshes every known host. A host that cannot even be started gets
    /// its own failed status instead of aborting the batch.
    #[instrument(skip(self))]
    pub async fn refresh_all(&self) -> Result<BTreeMap<String, OperationHandle>> {
        let names = self.database.host_names().await?;
        let mut handles = BTreeMap::new();
        for name in names {
            let handle = match self.refresh_host(&name).await {
                Ok(handle) => handle,
                Err(err) => {
                    warn!(host = %name, error = %err, "refresh rejected");
                    let handle = self.registry.allocate();
                    self.registry.insert(handle, OperationStatus::unknown(&name));
                    self.conclude(
                        handle,
                        LifecycleEventKind::NodeRefresh,
                        OperationStatus::failed(format!("{REFRESH_REJECTED}{err}"), &name),
                    );
                    handle
                }
            };
            handles.insert(name, handle);
        }
        Ok(handles)
    }

    /// Scans the node (add or refresh depending on whether it is known) and
    /// then starts load monitoring. The returned handle covers both steps.
    #[instrument(skip(self))]
    pub async fn new_host_connected(&self, name: &str) -> Result<OperationHandle> {
        let canonical = self.resolve(name).await?;
        let outer = self.registry.allocate();
        self.registry
            .insert(outer, OperationStatus::pending(CONNECTING, &canonical));

        let known = match self.database.is_known(&canonical).await {
            Ok(known) => known,
            Err(err) => {
                self.conclude(
                    outer,
                    LifecycleEventKind::NodeConnected,
                    OperationStatus::failed(format!("{CONNECT_FAILED}{err}"), &canonical),
                );
                return Ok(outer);
            }
        };
        let inner = self.start_scan(&canonical, known, known).await;

        if let Ok(status) = self.registry.get(inner)
            && status.state == OperationState::Failed
        {
            self.conclude(
                outer,
                LifecycleEventKind::NodeConnected,
                OperationStatus::failed(status.message, &canonical),
            );
            let _ = self.registry.remove(inner);
            return Ok(outer);
        }

        let workflow = Arc::new(NodeConnectWorkflow::new(
            canonical.clone(),
            inner,
            outer,
            Arc::clone(&self.registry),
            Arc::clone(&self.monitor),
            Arc::clone(&self.events),
        ));
        let id = self.events.register(workflow.clone());
        workflow.reconcile().await;
        if workflow.is_done() {
            let _ = self.events.unregister(id);
        }
        debug!(host = %canonical, %inner, %outer, "node connect workflow armed");
        Ok(outer)
    }

    /// Detector callback. The correlation key, not the host name, selects the
    /// operation; an unknown or already consumed key is rejected without
    /// touching the database.
    #[instrument(skip(self, payload), fields(bytes = payload.len()))]
    pub async fn upload_host_data(
        &self,
        host_name: &str,
        key: &CorrelationKey,
        payload: &[u8],
        encoding: &str,
    ) -> Result<()> {
        let entry = self.pending.resolve(key)?;
        if entry.subject_name != host_name {
            warn!(
                expected = %entry.subject_name,
                reported = host_name,
                "detector reported under a different host name"
            );
        }

        let subject = entry.subject_name.as_str();
        let persisted = if entry.is_refresh {
            self.persist_refresh(subject, payload, encoding).await
        } else {
            self.database.insert(subject, payload, encoding).await
        };

        match persisted {
            Ok(()) => {
                let message = if entry.is_refresh {
                    REFRESH_SUCCEEDED
                } else {
                    HOST_ADDED
                };
                info!(host = subject, handle = %entry.handle, "host data stored");
                self.conclude(
                    entry.handle,
                    entry.kind(),
                    OperationStatus::success(message, subject),
                );
                Ok(())
            }
            Err(err) => {
                let prefix = if entry.is_refresh {
                    REFRESH_FAILED
                } else {
                    HOST_NOT_ADDED
                };
                warn!(
                    host = subject,
                    handle = %entry.handle,
                    error = %err,
                    "failed to store host data"
                );
                self.conclude(
                    entry.handle,
                    entry.kind(),
                    OperationStatus::failed(format!("{prefix}{err}"), subject),
                );
                Err(HostManagerError::Persistence(err.to_string()))
            }
        }
    }

    /// Latest status for `handle`, terminal or not.
    pub fn get_operation_status(&self, handle: OperationHandle) -> Result<OperationStatus> {
        self.registry.get(handle)
    }

    /// Forgets `handle` and returns its last status.
    pub fn remove_operation_status(&self, handle: OperationHandle) -> Result<OperationStatus> {
        self.registry.remove(handle)
    }

    /// Subscribes `listener` to every lifecycle event published from now on.
    pub fn register_event_listener(&self, listener: Arc<dyn LifecycleListener>) -> ListenerId {
        self.events.register(listener)
    }

    /// Unsubscribes a listener; [`HostManagerError::ListenerNotFound`] if it is gone.
    pub fn unregister_event_listener(&self, id: ListenerId) -> Result<()> {
        self.events.unregister(id)
    }

    /// Removes a host from the inventory and from every group holding it.
    #[instrument(skip(self))]
    pub async fn remove_host(&self, name: &str) -> Result<()> {
        let canonical = self.resolve(name).await?;
        if !self.database.remove(&canonical).await? {
            return Err(HostManagerError::HostNotFound(canonical));
        }
        info!(host = %canonical, "host removed");
        self.events.publish(LifecycleEvent::new(
            LifecycleEventKind::NodeRemove,
            EventStatus::Succeeded,
            canonical,
            HOST_REMOVED,
        ));
        Ok(())
    }

    /// Whether the canonical form of `name` is in the inventory.
    pub async fn is_host_known(&self, name: &str) -> Result<bool> {
        let canonical = self.resolve(name).await?;
        Ok(self.database.is_known(&canonical).await?)
    }

    /// Replaces the operator-set properties of a known host.
    #[instrument(skip(self, properties))]
    pub async fn update_user_properties(
        &self,
        name: &str,
        properties: &UserProperties,
    ) -> Result<()> {
        let canonical = self.resolve(name).await?;
        if !self
            .database
            .update_user_properties(&canonical, properties)
            .await?
        {
            return Err(HostManagerError::HostNotFound(canonical));
        }
        debug!(host = %canonical, count = properties.len(), "user properties replaced");
        Ok(())
    }

    /// Looks up a group by exact name.
    pub async fn group(&self, name: &str) -> Result<HostGroup> {
        self.database
            .find_group(name)
            .await?
            .ok_or_else(|| HostManagerError::GroupNotFound(name.to_string()))
    }

    /// Names of every group in the database.
    pub async fn group_names(&self) -> Result<Vec<String>> {
        Ok(self.database.group_names().await?)
    }

    /// Creates a group. Publishes a group-create event either way.
    #[instrument(skip(self, group), fields(group = %group.name))]
    pub async fn add_group(&self, group: &HostGroup) -> Result<()> {
        let outcome = self
            .database
            .add_group(group)
            .await
            .map_err(group_error);
        self.report_group(LifecycleEventKind::GroupCreate, &group.name, "", outcome)
    }

    /// Removes a group and returns what it held.
    #[instrument(skip(self))]
    pub async fn remove_group(&self, name: &str) -> Result<HostGroup> {
        let outcome = match self.database.remove_group(name).await {
            Ok(Some(group)) => Ok(group),
            Ok(None) => Err(HostManagerError::GroupNotFound(name.to_string())),
            Err(err) => Err(group_error(err)),
        };
        self.report_group(LifecycleEventKind::GroupRemove, name, "", outcome)
    }

    /// Replaces description and members of an existing group.
    #[instrument(skip(self, group), fields(group = %group.name))]
    pub async fn update_group(&self, group: &HostGroup) -> Result<()> {
        let outcome = match self.database.update_group(group).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(HostManagerError::GroupNotFound(group.name.clone())),
            Err(err) => Err(group_error(err)),
        };
        self.report_group(LifecycleEventKind::GroupChange, &group.name, "", outcome)
    }

    /// Moves a group to a new, unused name.
    #[instrument(skip(self))]
    pub async fn rename_group(&self, old_name: &str, new_name: &str) -> Result<()> {
        let outcome = match self.database.rename_group(old_name, new_name).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(HostManagerError::GroupNotFound(old_name.to_string())),
            Err(err) => Err(group_error(err)),
        };
        let renamed = format!("\"{old_name}\" renamed to \"{new_name}\".");
        self.report_group(LifecycleEventKind::GroupChange, old_name, &renamed, outcome)
    }

    /// Canonical names of every host in the inventory.
    pub async fn host_names(&self) -> Result<Vec<String>> {
        Ok(self.database.host_names().await?)
    }

    /// A host runtime came up; treat it as a connecting node.
    pub async fn host_runtime_registered(&self, name: &str) -> Result<OperationHandle> {
        self.new_host_connected(name).await
    }

    /// A host runtime went away; stop monitoring the node.
    #[instrument(skip(self))]
    pub async fn host_runtime_unregistered(&self, name: &str) -> Result<()> {
        match self.monitor.node_disconnected(name).await {
            Ok(()) => {
                info!(host = name, "host runtime disconnected");
                self.events.publish(LifecycleEvent::new(
                    LifecycleEventKind::NodeDisconnected,
                    EventStatus::Succeeded,
                    name,
                    HOST_DISCONNECTED,
                ));
                Ok(())
            }
            Err(err) => {
                warn!(host = name, error = %err, "load monitor refused disconnect");
                self.events.publish(LifecycleEvent::new(
                    LifecycleEventKind::NodeDisconnected,
                    EventStatus::Failed,
                    name,
                    format!("{DISCONNECT_FAILED}{err}"),
                ));
                Err(err.into())
            }
        }
    }

    /// Connects every host runtime the task service already knows about.
    #[instrument(skip(self))]
    pub async fn initialize_host_runtimes(&self) -> Result<BTreeMap<String, OperationHandle>> {
        let runtimes = self.tasks.registered_host_runtimes().await?;
        let mut handles = BTreeMap::new();
        for name in runtimes {
            match self.new_host_connected(&name).await {
                Ok(handle) => {
                    handles.insert(name, handle);
                }
                Err(err) => warn!(host = %name, error = %err, "skipping host runtime"),
            }
        }
        info!(count = handles.len(), "host runtimes initialized");
        Ok(handles)
    }

    async fn resolve(&self, name: &str) -> Result<String> {
        self.resolver
            .canonical_name(name)
            .await
            .ok_or_else(|| HostManagerError::UnresolvableHost(name.to_string()))
    }

    /// Allocates a handle and either fails it immediately or schedules a
    /// detector.
    async fn start_scan(&self, subject: &str, is_refresh: bool, known: bool) -> OperationHandle {
        let handle = self.registry.allocate();
        self.registry.insert(handle, OperationStatus::unknown(subject));
        let kind = scan_kind(is_refresh);

        if !is_refresh && known {
            let failed = OperationStatus::failed(HOST_ALREADY_KNOWN, subject);
            self.conclude(handle, kind, failed);
        } else if is_refresh && !known {
            let failed = OperationStatus::failed(HOST_NOT_IN_DATABASE, subject);
            self.conclude(handle, kind, failed);
        } else {
            self.begin_detection(subject, handle, is_refresh).await;
        }
        handle
    }

    async fn begin_detection(&self, subject: &str, handle: OperationHandle, is_refresh: bool) {
        let kind = scan_kind(is_refresh);
        let key = CorrelationKey::for_handle(handle);

        // The entry goes in before the detector is submitted so an early upload
        // always finds it.
        self.registry
            .update(handle, OperationStatus::pending(SCHEDULING_DETECTOR, subject));
        let entry = PendingEntry {
            subject_name: subject.to_string(),
            correlation_key: key.clone(),
            started_at: chrono::Utc::now(),
            is_refresh,
            handle,
        };
        if let Err(err) = self.pending.register(entry) {
            debug!(host = subject, error = %err, "scan not started");
            let failed = OperationStatus::failed(OPERATION_IN_PROGRESS, subject);
            self.conclude(handle, kind, failed);
            return;
        }

        match self.scheduler.schedule_on(subject, handle).await {
            Ok(_) => {
                self.registry
                    .update(handle, OperationStatus::pending(DETECTOR_SCHEDULED, subject));
            }
            Err(err) => {
                if self.pending.resolve(&key).is_ok() {
                    let message = format!("{SCHEDULING_FAILED}\"{err}\".");
                    self.conclude(handle, kind, OperationStatus::failed(message, subject));
                }
            }
        }
    }

    /// Refresh keeps operator-set properties: read them, replace the record,
    /// then put them back.
    async fn persist_refresh(
        &self,
        subject: &str,
        payload: &[u8],
        encoding: &str,
    ) -> std::result::Result<(), CollaboratorError> {
        let properties = self.database.find_user_properties(subject).await?;
        self.database.update(subject, payload, encoding).await?;
        self.database
            .apply_user_properties(subject, &properties)
            .await
    }

    /// Publishes the group event for `outcome` and hands the outcome back.
    fn report_group<T>(
        &self,
        kind: LifecycleEventKind,
        group: &str,
        success_message: &str,
        outcome: Result<T>,
    ) -> Result<T> {
        let event = match &outcome {
            Ok(_) => {
                info!(group, %kind, "group change applied");
                LifecycleEvent::new(kind, EventStatus::Succeeded, group, success_message)
            }
            Err(err) => {
                warn!(group, %kind, error = %err, "group change refused");
                LifecycleEvent::new(kind, EventStatus::Failed, group, err.to_string())
            }
        };
        self.events.publish(event);
        outcome
    }

    /// Moves `handle` to a terminal status and publishes the matching event.
    /// Does nothing if another path already concluded the operation.
    fn conclude(
        &self,
        handle: OperationHandle,
        kind: LifecycleEventKind,
        status: OperationStatus,
    ) {
        let event_status = if status.state == OperationState::Success {
            EventStatus::Succeeded
        } else {
            EventStatus::Failed
        };
        let subject = status.subject_name.clone();
        let message = status.message.clone();
        if self.registry.update(handle, status) {
            let event = LifecycleEvent::new(kind, event_status, subject, message);
            self.events.publish(event.with_handle(handle));
        }
    }
}

fn group_error(err: CollaboratorError) -> HostManagerError {
    match err {
        CollaboratorError::Rejected(msg) => HostManagerError::InvalidGroup(msg),
        other => other.into(),
    }
}

fn scan_kind(is_refresh: bool) -> LifecycleEventKind {
    if is_refresh {
        LifecycleEventKind::NodeRefresh
    } else {
        LifecycleEventKind::NodeAdd
    }
}
