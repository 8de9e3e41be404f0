//! Error taxonomy for the lifecycle framework
//!
//! Two layers of errors exist:
//!
//! - [`SdkError`]: what a cloud SDK client reports (a modeled service error
//!   with `{code, message}`, or an unknown service name).
//! - [`LifecycleError`]: what a lifecycle operation reports back to the
//!   orchestrator. It has exactly two variants, the transient retry signal
//!   and the permanent non-recoverable signal.

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by a cloud SDK client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SdkError {
    /// The service rejected the call
    #[error("An error occurred ({code}) when calling the {operation} operation: {message}")]
    Service {
        operation: String,
        code: String,
        message: String,
    },

    /// No client exists for this service name
    #[error("Unknown service: '{name}'. Valid service names are: {known}")]
    UnknownService { name: String, known: String },

    /// The call never reached the service, or the response could not be read
    #[error("Transport error: {0}")]
    Transport(String),
}

impl SdkError {
    pub fn service(
        operation: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        SdkError::Service {
            operation: operation.into(),
            code: code.into(),
            message: message.into(),
        }
    }

    /// Error code for modeled service errors
    pub fn code(&self) -> Option<&str> {
        match self {
            SdkError::Service { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Whether this error is one of the given "not found" codes
    pub fn is_not_found(&self, codes: &[&str]) -> bool {
        self.code().is_some_and(|c| codes.contains(&c))
    }
}

/// Configuration errors raised while resolving a client configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Incomplete credentials in {layer} configuration: {missing} is missing")]
    IncompleteCredentials { layer: String, missing: String },
}

/// Outcome of a failed lifecycle operation, as seen by the orchestrator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// The resource is still converging; re-invoke the same operation later
    #[error("{message}")]
    Retry {
        message: String,
        retry_after: Option<Duration>,
    },

    /// Permanent failure requiring operator intervention
    #[error("{message}")]
    NonRecoverable { message: String },
}

impl LifecycleError {
    pub fn retry(message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        LifecycleError::Retry {
            message: message.into(),
            retry_after,
        }
    }

    pub fn non_recoverable(message: impl Into<String>) -> Self {
        LifecycleError::NonRecoverable {
            message: message.into(),
        }
    }

    pub fn is_retry(&self) -> bool {
        matches!(self, LifecycleError::Retry { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            LifecycleError::Retry { message, .. } => message,
            LifecycleError::NonRecoverable { message } => message,
        }
    }

    /// Wrap an SDK failure with the resource type and identifier it concerns
    pub fn from_sdk(resource_type: &str, resource_id: Option<&str>, err: &SdkError) -> Self {
        LifecycleError::non_recoverable(format!(
            "{} ID# \"{}\": {}",
            resource_type,
            resource_id.unwrap_or("<unknown>"),
            err
        ))
    }
}

impl From<ConfigError> for LifecycleError {
    fn from(err: ConfigError) -> Self {
        LifecycleError::non_recoverable(err.to_string())
    }
}

/// Errors from the file-backed runtime property store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("State file error: {0}")]
    State(String),

    #[error("Lock acquisition failed: {0}")]
    Lock(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LifecycleError>;
