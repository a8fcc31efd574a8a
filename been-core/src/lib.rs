//! Node lifecycle controller for the BEEN Host Manager.
//!
//! The [`lifecycle`] module holds the controller and the pieces it is built
//! from. [`ports`] names the external services it needs, and [`infra`]
//! provides in-process adapters for some of them.

#![allow(missing_docs)]

pub mod error;
pub mod infra;
pub mod lifecycle;
pub mod ports;
pub mod types;

pub use error::{CollaboratorError, ErrorClass, HostManagerError, Result, SchedulingError};
pub use lifecycle::{
    LifecycleCollaborators, LifecycleConfig, LifecycleEvent, LifecycleEventKind,
    LifecycleListener, NodeLifecycleController, OperationState, OperationStatus,
};
pub use types::{CorrelationKey, HostGroup, ListenerId, OperationHandle};
