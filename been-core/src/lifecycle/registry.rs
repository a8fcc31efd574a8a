use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::error::{HostManagerError, Result};
use crate::types::OperationHandle;

use super::status::OperationStatus;

#[derive(Debug, Clone)]
struct StatusSlot {
    status: OperationStatus,
    updated_at: DateTime<Utc>,
}

/// Allocates operation handles and stores the latest status of each.
///
/// All reads and writes go through one mutex, so a handle that has been
/// inserted is immediately visible to every other caller.
pub struct OperationRegistry {
    next: AtomicU64,
    slots: Mutex<HashMap<OperationHandle, StatusSlot>>,
}

impl fmt::Debug for OperationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationRegistry")
            .field("next", &self.next.load(Ordering::Relaxed))
            .field("len", &self.slots.lock().len())
            .finish()
    }
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn allocate(&self) -> OperationHandle {
        OperationHandle(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// Unconditional put. Callers use it for the initial status, before the
    /// handle is visible outside the controller.
    pub fn insert(&self, handle: OperationHandle, status: OperationStatus) {
        self.slots.lock().insert(
            handle,
            StatusSlot {
                status,
                updated_at: Utc::now(),
            },
        );
    }

    /// Replaces the status of a live, non-terminal handle.
    ///
    /// Returns `false` when the handle was removed or already terminal. The
    /// terminal transition therefore happens exactly once per handle.
    pub fn update(&self, handle: OperationHandle, status: OperationStatus) -> bool {
        let mut slots = self.slots.lock();
        match slots.get_mut(&handle) {
            Some(slot) if !slot.status.is_terminal() => {
                slot.status = status;
                slot.updated_at = Utc::now();
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, handle: OperationHandle) -> Result<OperationStatus> {
        self.slots
            .lock()
            .get(&handle)
            .map(|slot| slot.status.clone())
            .ok_or(HostManagerError::OperationNotFound(handle))
    }

    pub fn remove(&self, handle: OperationHandle) -> Result<OperationStatus> {
        self.slots
            .lock()
            .remove(&handle)
            .map(|slot| slot.status)
            .ok_or(HostManagerError::OperationNotFound(handle))
    }

    /// Drops terminal statuses whose last update is older than `ttl`.
    pub fn evict_terminal(&self, now: DateTime<Utc>, ttl: Duration) -> usize {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let mut slots = self.slots.lock();
        let before = slots.len();
        slots.retain(|_, slot| !(slot.status.is_terminal() && now - slot.updated_at > ttl));
        before - slots.len()
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
