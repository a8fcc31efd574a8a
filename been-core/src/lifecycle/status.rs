use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationState {
    Unknown,
    Pending,
    Success,
    Failed,
}

impl OperationState {
    /// Success and Failed are final; nothing may overwrite them.
    pub fn is_terminal(self) -> bool {
        matches!(self, OperationState::Success | OperationState::Failed)
    }
}

/// Current outcome of one operation as seen by a polling caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationStatus {
    pub state: OperationState,
    /// Human-readable progress or outcome
    pub message: String,
    /// Host (or group) the operation concerns
    pub subject_name: String,
}

impl OperationStatus {
    pub fn new(
        state: OperationState,
        message: impl Into<String>,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            state,
            message: message.into(),
            subject_name: subject.into(),
        }
    }

    pub fn unknown(subject: impl Into<String>) -> Self {
        Self::new(OperationState::Unknown, "", subject)
    }

    pub fn pending(message: impl Into<String>, subject: impl Into<String>) -> Self {
        Self::new(OperationState::Pending, message, subject)
    }

    pub fn success(message: impl Into<String>, subject: impl Into<String>) -> Self {
        Self::new(OperationState::Success, message, subject)
    }

    pub fn failed(message: impl Into<String>, subject: impl Into<String>) -> Self {
        Self::new(OperationState::Failed, message, subject)
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}
