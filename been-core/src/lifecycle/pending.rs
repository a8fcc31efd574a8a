use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::error::{HostManagerError, Result};
use crate::types::{CorrelationKey, OperationHandle};

use super::events::LifecycleEventKind;

/// One in-flight remote scan waiting for its detector to report back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingEntry {
    /// Canonical host name being scanned
    pub subject_name: String,
    /// Token the detector must echo back with its upload
    pub correlation_key: CorrelationKey,
    /// Timeout is measured from here
    pub started_at: DateTime<Utc>,
    /// Refresh of a known host rather than a first add
    pub is_refresh: bool,
    /// Operation that concludes when the scan does
    pub handle: OperationHandle,
}

impl PendingEntry {
    /// Event kind published when this scan concludes.
    pub fn kind(&self) -> LifecycleEventKind {
        if self.is_refresh {
            LifecycleEventKind::NodeRefresh
        } else {
            LifecycleEventKind::NodeAdd
        }
    }

    fn expired(&self, now: DateTime<Utc>, timeout: chrono::Duration) -> bool {
        now - self.started_at > timeout
    }
}

#[derive(Default)]
struct PendingState {
    by_key: HashMap<CorrelationKey, PendingEntry>,
    by_subject: HashMap<String, CorrelationKey>,
}

/// Correlation key to in-flight scan, with single-consumer resolution.
///
/// Every compound step (check then insert, check then remove) runs under the
/// same mutex, so `resolve` and `sweep` can never both consume one entry.
#[derive(Default)]
pub struct PendingOperationTable {
    state: Mutex<PendingState>,
}

impl fmt::Debug for PendingOperationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingOperationTable")
            .field("len", &self.len())
            .finish()
    }
}

impl PendingOperationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, entry: PendingEntry) -> Result<()> {
        let mut state = self.state.lock();
        if state.by_key.contains_key(&entry.correlation_key) {
            return Err(HostManagerError::DuplicateKey(entry.correlation_key));
        }
        if state.by_subject.contains_key(&entry.subject_name) {
            return Err(HostManagerError::SubjectBusy(entry.subject_name));
        }
        state
            .by_subject
            .insert(entry.subject_name.clone(), entry.correlation_key.clone());
        state.by_key.insert(entry.correlation_key.clone(), entry);
        Ok(())
    }

    /// Removes and returns the entry for `key`. A second call fails.
    pub fn resolve(&self, key: &CorrelationKey) -> Result<PendingEntry> {
        let mut state = self.state.lock();
        let entry = state
            .by_key
            .remove(key)
            .ok_or_else(|| HostManagerError::UnknownKey(key.clone()))?;
        state.by_subject.remove(&entry.subject_name);
        Ok(entry)
    }

    /// Removes and returns every entry older than `timeout`.
    pub fn sweep(&self, now: DateTime<Utc>, timeout: Duration) -> Vec<PendingEntry> {
        let timeout = chrono::Duration::from_std(timeout).unwrap_or(chrono::Duration::MAX);
        let mut state = self.state.lock();
        let expired: Vec<CorrelationKey> = state
            .by_key
            .values()
            .filter(|entry| entry.expired(now, timeout))
            .map(|entry| entry.correlation_key.clone())
            .collect();

        let mut reaped = Vec::with_capacity(expired.len());
        for key in expired {
            if let Some(entry) = state.by_key.remove(&key) {
                state.by_subject.remove(&entry.subject_name);
                reaped.push(entry);
            }
        }
        reaped
    }

    pub fn is_subject_pending(&self, subject: &str) -> bool {
        self.state.lock().by_subject.contains_key(subject)
    }

    pub fn len(&self) -> usize {
        self.state.lock().by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn entry(subject: &str, handle: u64, started_at: DateTime<Utc>) -> PendingEntry {
        let handle = OperationHandle(handle);
        PendingEntry {
            subject_name: subject.to_string(),
            correlation_key: CorrelationKey::for_handle(handle),
            started_at,
            is_refresh: false,
            handle,
        }
    }

    #[test]
    fn resolve_consumes_entry_once() {
        let table = PendingOperationTable::new();
        let pending = entry("alpha", 1, Utc::now());
        let key = pending.correlation_key.clone();
        table.register(pending.clone()).expect("register");

        assert_eq!(table.resolve(&key).expect("first resolve"), pending);
        assert!(matches!(
            table.resolve(&key),
            Err(HostManagerError::UnknownKey(k)) if k == key
        ));
        assert!(!table.is_subject_pending("alpha"));
    }

    #[test]
    fn duplicate_key_and_busy_subject_are_rejected() {
        let table = PendingOperationTable::new();
        let now = Utc::now();
        table.register(entry("alpha", 1, now)).expect("register");

        assert!(matches!(
            table.register(entry("beta", 1, now)),
            Err(HostManagerError::DuplicateKey(_))
        ));
        assert!(matches!(
            table.register(entry("alpha", 2, now)),
            Err(HostManagerError::SubjectBusy(name)) if name == "alpha"
        ));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn sweep_reaps_only_expired_and_is_idempotent() {
        let table = PendingOperationTable::new();
        let now = Utc::now();
        table
            .register(entry("old", 1, now - chrono::Duration::seconds(30)))
            .expect("register old");
        table.register(entry("fresh", 2, now)).expect("register fresh");

        let reaped = table.sweep(now, Duration::from_secs(10));
        assert_eq!(reaped.len(), 1);
        assert_eq!(reaped[0].subject_name, "old");
        assert!(table.sweep(now, Duration::from_secs(10)).is_empty());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn concurrent_resolve_and_sweep_consume_exactly_once() {
        for _ in 0..200 {
            let table = Arc::new(PendingOperationTable::new());
            let pending = entry("racer", 7, Utc::now() - chrono::Duration::seconds(5));
            let key = pending.correlation_key.clone();
            table.register(pending).expect("register");

            let sweeper = {
                let table = Arc::clone(&table);
                std::thread::spawn(move || table.sweep(Utc::now(), Duration::from_secs(1)).len())
            };
            let resolver = {
                let table = Arc::clone(&table);
                std::thread::spawn(move || table.resolve(&key).is_ok())
            };

            let swept = sweeper.join().expect("sweeper thread");
            let resolved = resolver.join().expect("resolver thread");
            assert_eq!(swept + usize::from(resolved), 1);
        }
    }
}
