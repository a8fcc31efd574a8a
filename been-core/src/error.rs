use thiserror::Error;

use crate::types::{CorrelationKey, ListenerId, OperationHandle};

/// Failure reported by a remote collaborator (database, task manager, load monitor).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    /// The collaborator could not be reached or the call broke mid-flight.
    #[error("transport error: {0}")]
    Transport(String),

    /// The collaborator answered and refused the request.
    #[error("{0}")]
    Rejected(String),
}

/// A detector could not be submitted to the target node.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct SchedulingError {
    /// Collaborator's explanation, shown to the operator verbatim.
    pub reason: String,
}

impl From<CollaboratorError> for SchedulingError {
    fn from(err: CollaboratorError) -> Self {
        Self {
            reason: err.to_string(),
        }
    }
}

/// Coarse classification used by outer surfaces to map errors onto responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The request itself was refused; retrying unchanged will not help.
    Rejected,
    /// A collaborator was unreachable.
    Transport,
    /// Something failed inside the host manager or its storage.
    Internal,
}

/// Synchronous failure of a host manager operation.
///
/// Asynchronous outcomes never surface here; they arrive through operation
/// statuses and lifecycle events.
#[derive(Error, Debug)]
pub enum HostManagerError {
    /// The resolver produced no canonical name.
    #[error("Unable to resolve host name: {0}")]
    UnresolvableHost(String),

    #[error("Host not found: {0}")]
    HostNotFound(String),

    #[error("Group not found: {0}")]
    GroupNotFound(String),

    /// The database refused a group change (duplicate name, unknown member, ...).
    #[error("Invalid group: {0}")]
    InvalidGroup(String),

    #[error("Operation not found: {0}")]
    OperationNotFound(OperationHandle),

    /// No pending scan holds this correlation key, or it was already consumed.
    #[error("No pending operation for key {0}")]
    UnknownKey(CorrelationKey),

    #[error("Correlation key already pending: {0}")]
    DuplicateKey(CorrelationKey),

    /// Another scan for the same host is still pending.
    #[error("Operation already in progress for host {0}")]
    SubjectBusy(String),

    #[error("Listener not found: {0}")]
    ListenerNotFound(ListenerId),

    /// A lifecycle option failed validation.
    #[error("Invalid option: {0}")]
    InvalidOption(String),

    #[error("Transport error: {0}")]
    Transport(String),

    /// Scan data could not be written to the host database.
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HostManagerError {
    /// Maps the error onto the coarse class used for responses.
    pub fn class(&self) -> ErrorClass {
        match self {
            HostManagerError::Transport(_) => ErrorClass::Transport,
            HostManagerError::Persistence(_) | HostManagerError::Internal(_) => {
                ErrorClass::Internal
            }
            _ => ErrorClass::Rejected,
        }
    }
}

impl From<CollaboratorError> for HostManagerError {
    fn from(err: CollaboratorError) -> Self {
        match err {
            CollaboratorError::Transport(msg) => HostManagerError::Transport(msg),
            CollaboratorError::Rejected(msg) => HostManagerError::Internal(msg),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, HostManagerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes_separate_transport_from_rejection() {
        assert_eq!(
            HostManagerError::UnresolvableHost("nope".into()).class(),
            ErrorClass::Rejected
        );
        assert_eq!(
            HostManagerError::UnknownKey("k".into()).class(),
            ErrorClass::Rejected
        );
        assert_eq!(
            HostManagerError::from(CollaboratorError::Transport("reset".into())).class(),
            ErrorClass::Transport
        );
        assert_eq!(
            HostManagerError::Persistence("disk full".into()).class(),
            ErrorClass::Internal
        );
    }
}
