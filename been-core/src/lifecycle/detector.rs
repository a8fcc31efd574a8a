use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tracing::{debug, warn};

use crate::error::SchedulingError;
use crate::ports::{TaskDependency, TaskDescriptor, TaskExecution};
use crate::types::{CorrelationKey, OperationHandle};

pub const DETECTOR_TASK_PREFIX: &str = "detector-";
/// Task property carrying the correlation key back to the upload callback.
pub const CORRELATION_PROPERTY: &str = "key";
pub const RUNTIME_TASK_ID: &str = "hostmanager-tid";
pub const RUNTIME_CHECKPOINT: &str = "status";
pub const RUNTIME_RUNNING: &str = "running";

/// Submits detectors to remote host runtimes.
pub struct DetectorScheduler {
    tasks: Arc<dyn TaskExecution>,
    counter: AtomicU64,
}

impl fmt::Debug for DetectorScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectorScheduler")
            .field("submitted", &self.counter.load(Ordering::Relaxed))
            .finish()
    }
}

impl DetectorScheduler {
    pub fn new(tasks: Arc<dyn TaskExecution>) -> Self {
        Self {
            tasks,
            counter: AtomicU64::new(0),
        }
    }

    /// Builds the detector descriptor for `handle` without submitting it.
    pub fn describe(
        &self,
        host: &str,
        handle: OperationHandle,
    ) -> (TaskDescriptor, CorrelationKey) {
        let sequence = self.counter.fetch_add(1, Ordering::Relaxed);
        let key = CorrelationKey::for_handle(handle);
        let task_id = format!(
            "{DETECTOR_TASK_PREFIX}{sequence}-{}",
            Utc::now().timestamp_millis()
        );

        let mut properties = BTreeMap::new();
        properties.insert(CORRELATION_PROPERTY.to_string(), key.as_str().to_string());

        let descriptor = TaskDescriptor {
            task_id,
            host_name: host.to_string(),
            properties,
            dependencies: vec![TaskDependency {
                task_id: RUNTIME_TASK_ID.to_string(),
                checkpoint: RUNTIME_CHECKPOINT.to_string(),
                value: RUNTIME_RUNNING.to_string(),
            }],
        };
        (descriptor, key)
    }

    /// Submits a detector to `host`. Any failure is returned synchronously.
    pub async fn schedule_on(
        &self,
        host: &str,
        handle: OperationHandle,
    ) -> Result<CorrelationKey, SchedulingError> {
        let (descriptor, key) = self.describe(host, handle);
        let task_id = descriptor.task_id.clone();

        match self.tasks.submit(descriptor).await {
            Ok(()) => {
                debug!(host, task = %task_id, key = %key, "detector submitted");
                Ok(key)
            }
            Err(err) => {
                warn!(host, task = %task_id, error = %err, "detector submission failed");
                Err(err.into())
            }
        }
    }
}
