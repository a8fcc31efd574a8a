use std::fmt;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use been_core::HostManagerError;
use serde_json::json;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "message": self.message,
                "status": self.status.as_u16(),
            }
        }));

        (self.status, body).into_response()
    }
}

impl From<HostManagerError> for AppError {
    fn from(err: HostManagerError) -> Self {
        let message = err.to_string();
        match err {
            HostManagerError::HostNotFound(_)
            | HostManagerError::OperationNotFound(_)
            | HostManagerError::UnknownKey(_)
            | HostManagerError::ListenerNotFound(_)
            | HostManagerError::GroupNotFound(_) => Self::not_found(message),
            HostManagerError::UnresolvableHost(_) | HostManagerError::InvalidGroup(_) => {
                Self::unprocessable(message)
            }
            HostManagerError::DuplicateKey(_) | HostManagerError::SubjectBusy(_) => {
                Self::conflict(message)
            }
            HostManagerError::InvalidOption(_) => Self::bad_request(message),
            HostManagerError::Transport(_) => {
                tracing::warn!(error = %message, "collaborator unreachable");
                Self::bad_gateway(message)
            }
            HostManagerError::Persistence(_) | HostManagerError::Internal(_) => {
                tracing::error!(error = %message, "host manager operation failed");
                Self::internal(message)
            }
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use been_core::{CorrelationKey, OperationHandle};

    use super::*;

    #[test]
    fn host_manager_errors_map_to_statuses() {
        let cases = [
            (
                HostManagerError::OperationNotFound(OperationHandle(3)),
                StatusCode::NOT_FOUND,
            ),
            (
                HostManagerError::UnknownKey(CorrelationKey::from("k")),
                StatusCode::NOT_FOUND,
            ),
            (
                HostManagerError::UnresolvableHost("x".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                HostManagerError::GroupNotFound("web".into()),
                StatusCode::NOT_FOUND,
            ),
            (
                HostManagerError::InvalidGroup("dup".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (HostManagerError::SubjectBusy("x".into()), StatusCode::CONFLICT),
            (HostManagerError::Transport("reset".into()), StatusCode::BAD_GATEWAY),
            (
                HostManagerError::Persistence("disk".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(AppError::from(err).status, expected);
        }
    }
}
