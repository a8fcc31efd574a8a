use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::RwLock;
use tokio::runtime::Handle;
use tokio::sync::{Mutex as TokioMutex, mpsc};
use tracing::{debug, warn};

use crate::error::{HostManagerError, Result};
use crate::types::ListenerId;

use super::events::{LifecycleEvent, LifecycleListener};

type ListenerMap = Arc<RwLock<HashMap<ListenerId, Arc<dyn LifecycleListener>>>>;

/// In-process fan-out of lifecycle events to registered listeners.
///
/// Publishing pushes onto an unbounded channel and returns immediately. A
/// fixed pool of workers drains the channel; each worker snapshots the
/// listener set and delivers to every listener in turn. A panicking listener
/// is logged and skipped.
pub struct EventBus {
    listeners: ListenerMap,
    sender: mpsc::UnboundedSender<LifecycleEvent>,
    sequence: AtomicU64,
    workers: usize,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.read().len())
            .field("workers", &self.workers)
            .field("published", &self.sequence.load(Ordering::Relaxed))
            .finish()
    }
}

impl EventBus {
    /// Spawns `workers` dispatch tasks on the current tokio runtime.
    pub fn new(workers: usize) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|err| {
            HostManagerError::Internal(format!("event bus needs a tokio runtime: {err}"))
        })?;

        let workers = workers.max(1);
        let listeners: ListenerMap = Arc::new(RwLock::new(HashMap::new()));
        let (sender, receiver) = mpsc::unbounded_channel();
        let receiver = Arc::new(TokioMutex::new(receiver));

        for worker in 0..workers {
            let receiver = Arc::clone(&receiver);
            let listeners = Arc::clone(&listeners);
            runtime.spawn(async move {
                loop {
                    let next = receiver.lock().await.recv().await;
                    let Some(event) = next else {
                        debug!(worker, "event bus closed; dispatch worker exiting");
                        break;
                    };
                    dispatch(&listeners, &event).await;
                }
            });
        }

        Ok(Self {
            listeners,
            sender,
            sequence: AtomicU64::new(0),
            workers,
        })
    }

    pub fn register(&self, listener: Arc<dyn LifecycleListener>) -> ListenerId {
        let id = ListenerId::new();
        self.listeners.write().insert(id, listener);
        debug!(listener = %id, "registered lifecycle listener");
        id
    }

    pub fn unregister(&self, id: ListenerId) -> Result<()> {
        self.listeners
            .write()
            .remove(&id)
            .map(|_| ())
            .ok_or(HostManagerError::ListenerNotFound(id))
    }

    /// Stamps a sequence number and queues the event. Never blocks.
    pub fn publish(&self, mut event: LifecycleEvent) -> u64 {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        event.sequence = sequence;
        if self.sender.send(event).is_err() {
            warn!(sequence, "event bus has no dispatch workers; event dropped");
        }
        sequence
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }
}

async fn dispatch(listeners: &ListenerMap, event: &LifecycleEvent) {
    let snapshot: Vec<(ListenerId, Arc<dyn LifecycleListener>)> = listeners
        .read()
        .iter()
        .map(|(id, listener)| (*id, Arc::clone(listener)))
        .collect();

    for (id, listener) in snapshot {
        if let Err(panic) = AssertUnwindSafe(listener.on_event(event))
            .catch_unwind()
            .await
        {
            warn!(
                listener = %id,
                sequence = event.sequence,
                kind = %event.kind,
                "lifecycle listener panicked: {}",
                panic_message(panic.as_ref())
            );
        }

        let remove = std::panic::catch_unwind(AssertUnwindSafe(|| listener.remove_me()))
            .unwrap_or(true);
        if remove && listeners.write().remove(&id).is_some() {
            debug!(listener = %id, "listener asked to be removed");
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    }
}

/// Listener that forwards every event into a channel.
///
/// Removes itself once the receiving side is dropped, which makes it a fit
/// for per-connection subscribers such as streaming responses.
#[derive(Debug)]
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<LifecycleEvent>,
}

impl ChannelListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<LifecycleEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl LifecycleListener for ChannelListener {
    async fn on_event(&self, event: &LifecycleEvent) {
        let _ = self.tx.send(event.clone());
    }

    fn remove_me(&self) -> bool {
        self.tx.is_closed()
    }
}
