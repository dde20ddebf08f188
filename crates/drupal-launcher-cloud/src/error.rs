//! Provisioning error types

use std::time::Duration;
use thiserror::Error;

/// Errors raised while provisioning or tearing down the stack
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Provisioning rejected for stack {stack}: {message}")]
    ProvisioningRejected { stack: String, message: String },

    #[error("Timed out after {waited:?} waiting for stack {stack}")]
    ProvisioningTimeout { stack: String, waited: Duration },

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Inconsistent key pair state: {0}")]
    InconsistentKeyState(String),

    #[error("Stack {stack} finished with status {status}")]
    StackFailed { stack: String, status: String },

    #[error("Stack {stack} has no output named {key}")]
    MissingOutput { stack: String, key: String },

    #[error("Stack not found: {0}")]
    StackNotFound(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// Network-level failure talking to the provider. Safe to retry.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Health check failed: {0}")]
    HealthCheck(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] drupal_launcher_config::ConfigError),
}

impl CloudError {
    /// Whether the operation that produced this error may simply be retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, CloudError::Transport(_))
    }
}

impl From<zip::result::ZipError> for CloudError {
    fn from(err: zip::result::ZipError) -> Self {
        CloudError::Archive(err.to_string())
    }
}

impl From<walkdir::Error> for CloudError {
    fn from(err: walkdir::Error) -> Self {
        CloudError::Archive(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(CloudError::Transport("connection reset".into()).is_transient());
        assert!(!CloudError::ApiError("throttled".into()).is_transient());
        assert!(
            !CloudError::ProvisioningRejected {
                stack: "drupal".into(),
                message: "bad template".into(),
            }
            .is_transient()
        );
    }
}
