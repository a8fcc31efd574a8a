use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::OperationHandle;

/// What changed. Node kinds carry a host name as subject, group kinds a group name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEventKind {
    NodeConnected,
    NodeDisconnected,
    NodeAdd,
    NodeRefresh,
    NodeRemove,
    GroupCreate,
    GroupRemove,
    GroupChange,
}

impl fmt::Display for LifecycleEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LifecycleEventKind::NodeConnected => "node_connected",
            LifecycleEventKind::NodeDisconnected => "node_disconnected",
            LifecycleEventKind::NodeAdd => "node_add",
            LifecycleEventKind::NodeRefresh => "node_refresh",
            LifecycleEventKind::NodeRemove => "node_remove",
            LifecycleEventKind::GroupCreate => "group_create",
            LifecycleEventKind::GroupRemove => "group_remove",
            LifecycleEventKind::GroupChange => "group_change",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Succeeded,
    Failed,
}

/// Immutable notification about a node lifecycle change.
///
/// `sequence` is stamped by the bus at publish time. Delivery order across
/// workers is not guaranteed, so consumers that care about order sort by it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub kind: LifecycleEventKind,
    pub status: EventStatus,
    pub subject_name: String,
    /// Failure reason or extra detail; often empty on success
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Publish order, starting at 1
    pub sequence: u64,
    /// Operation this event terminates, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<OperationHandle>,
}

impl LifecycleEvent {
    pub fn new(
        kind: LifecycleEventKind,
        status: EventStatus,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            status,
            subject_name: subject.into(),
            message: message.into(),
            timestamp: Utc::now(),
            sequence: 0,
            handle: None,
        }
    }

    pub fn with_handle(mut self, handle: OperationHandle) -> Self {
        self.handle = Some(handle);
        self
    }

    pub fn succeeded(&self) -> bool {
        self.status == EventStatus::Succeeded
    }
}

/// Receiver of lifecycle events.
///
/// `remove_me` is consulted right after every delivery to this listener; a
/// `true` answer unregisters it. One-shot listeners flip it once they have
/// seen the event they were waiting for.
#[async_trait]
pub trait LifecycleListener: Send + Sync {
    async fn on_event(&self, event: &LifecycleEvent);

    fn remove_me(&self) -> bool {
        false
    }
}
