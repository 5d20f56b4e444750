use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wire-visible error codes. `StabilityTimeout` only ever appears as an
/// advisory attached to a successful click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    InvalidArgument,
    InvalidFinder,
    NotFound,
    Timeout,
    NotClickable,
    NodeAppeared,
    StabilityTimeout,
    Cancelled,
    SessionNotReady,
    AdapterUnavailable,
    Internal,
}

#[derive(Error, Debug)]
pub enum UiError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid finder: {reason}")]
    InvalidFinder {
        reason: String,
        finder: Option<String>,
    },

    #[error("Node not found: {finder}")]
    NotFound { finder: String },

    #[error("Timed out waiting for {condition} on {finder} (last observed {last_count} matches)")]
    Timeout {
        condition: &'static str,
        finder: String,
        last_count: usize,
    },

    #[error("Node is not clickable (zero-area bounds): {finder}")]
    NotClickable { finder: String },

    #[error("Node appeared while it was required to stay gone: {finder}")]
    NodeAppeared { finder: String },

    #[error("Operation cancelled")]
    Cancelled { finder: Option<String> },

    #[error("No active session")]
    SessionNotReady,

    #[error("Tree adapter unavailable: {reason}")]
    AdapterUnavailable {
        reason: String,
        finder: Option<String>,
    },

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl UiError {
    pub fn code(&self) -> ErrorCode {
        match self {
            UiError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            UiError::InvalidFinder { .. } => ErrorCode::InvalidFinder,
            UiError::NotFound { .. } => ErrorCode::NotFound,
            UiError::Timeout { .. } => ErrorCode::Timeout,
            UiError::NotClickable { .. } => ErrorCode::NotClickable,
            UiError::NodeAppeared { .. } => ErrorCode::NodeAppeared,
            UiError::Cancelled { .. } => ErrorCode::Cancelled,
            UiError::SessionNotReady => ErrorCode::SessionNotReady,
            UiError::AdapterUnavailable { .. } => ErrorCode::AdapterUnavailable,
            UiError::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Pretty form of the Finder involved in the failure, if any.
    pub fn finder(&self) -> Option<&str> {
        match self {
            UiError::NotFound { finder }
            | UiError::Timeout { finder, .. }
            | UiError::NotClickable { finder }
            | UiError::NodeAppeared { finder } => Some(finder),
            UiError::InvalidFinder { finder, .. }
            | UiError::Cancelled { finder }
            | UiError::AdapterUnavailable { finder, .. } => finder.as_deref(),
            UiError::InvalidArgument(_) | UiError::SessionNotReady | UiError::Internal(_) => None,
        }
    }

    pub fn invalid_finder(reason: impl Into<String>) -> Self {
        UiError::InvalidFinder {
            reason: reason.into(),
            finder: None,
        }
    }

    /// Attach a Finder's pretty form to variants that carry an optional one.
    pub fn with_finder(self, pretty: &str) -> Self {
        match self {
            UiError::InvalidFinder {
                reason,
                finder: None,
            } => UiError::InvalidFinder {
                reason,
                finder: Some(pretty.to_string()),
            },
            UiError::Cancelled { finder: None } => UiError::Cancelled {
                finder: Some(pretty.to_string()),
            },
            UiError::AdapterUnavailable {
                reason,
                finder: None,
            } => UiError::AdapterUnavailable {
                reason,
                finder: Some(pretty.to_string()),
            },
            other => other,
        }
    }

    fn status(&self) -> StatusCode {
        match self.code() {
            ErrorCode::InvalidArgument | ErrorCode::InvalidFinder => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Timeout | ErrorCode::StabilityTimeout => StatusCode::REQUEST_TIMEOUT,
            ErrorCode::NotClickable => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::NodeAppeared => StatusCode::CONFLICT,
            // Client Closed Request, as nginx spells it.
            ErrorCode::Cancelled => {
                StatusCode::from_u16(499).unwrap_or(StatusCode::REQUEST_TIMEOUT)
            }
            ErrorCode::SessionNotReady | ErrorCode::AdapterUnavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON body of every non-success RPC response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finder: Option<String>,
}

impl From<&UiError> for ErrorBody {
    fn from(err: &UiError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
            finder: err.finder().map(str::to_string),
        }
    }
}

impl IntoResponse for UiError {
    fn into_response(self) -> Response {
        if let UiError::Internal(cause) = &self {
            tracing::error!("Internal error serving request: {:?}", cause);
        }
        let status = self.status();
        (status, Json(ErrorBody::from(&self))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, UiError>;
