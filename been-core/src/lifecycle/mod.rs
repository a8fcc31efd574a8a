//! Node lifecycle: onboarding, refresh and connection of cluster nodes.

pub mod config;
pub mod controller;
pub mod detector;
pub mod event_bus;
pub mod events;
pub mod messages;
pub mod pending;
pub mod registry;
pub mod status;
pub mod watchdog;
pub mod workflow;

pub use config::{LifecycleConfig, LifecycleOptions, LifecycleTimings};
pub use controller::{LifecycleCollaborators, NodeLifecycleController};
pub use detector::DetectorScheduler;
pub use event_bus::{ChannelListener, EventBus};
pub use events::{EventStatus, LifecycleEvent, LifecycleEventKind, LifecycleListener};
pub use pending::{PendingEntry, PendingOperationTable};
pub use registry::OperationRegistry;
pub use status::{OperationState, OperationStatus};
pub use watchdog::Watchdog;
pub use workflow::{NodeConnectWorkflow, WorkflowStep};
