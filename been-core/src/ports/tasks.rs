use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CollaboratorError;

/// Start-after condition: the task waits until `task_id` reports
/// `checkpoint == value`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDependency {
    pub task_id: String,
    pub checkpoint: String,
    pub value: String,
}

/// A task submission addressed to one host runtime.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    pub task_id: String,
    pub host_name: String,
    pub properties: BTreeMap<String, String>,
    pub dependencies: Vec<TaskDependency>,
}

/// Remote task execution service.
#[async_trait]
pub trait TaskExecution: Send + Sync {
    async fn submit(&self, task: TaskDescriptor) -> Result<(), CollaboratorError>;

    /// Names of hosts whose runtime is currently registered with the service.
    async fn registered_host_runtimes(&self) -> Result<Vec<String>, CollaboratorError>;
}
