//! AWS provider error types

use aws_sdk_cloudformation::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use drupal_launcher_cloud::CloudError;
use thiserror::Error;

/// Error codes AWS uses for request throttling.
const THROTTLING_CODES: [&str; 3] = ["Throttling", "ThrottlingException", "RequestLimitExceeded"];

#[derive(Error, Debug)]
pub enum AwsError {
    /// The request never produced a response (timeout, DNS, connection reset).
    #[error("{operation} failed to reach AWS: {message}")]
    Transport { operation: String, message: String },

    #[error("{operation} was throttled: {message}")]
    Throttled { operation: String, message: String },

    #[error("{operation} failed ({code}): {message}")]
    Service {
        operation: String,
        code: String,
        message: String,
    },

    #[error("{operation} returned no {field}")]
    MissingField {
        operation: String,
        field: &'static str,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl AwsError {
    /// Classify an SDK failure for `operation`.
    pub fn from_sdk<E, R>(operation: &str, err: SdkError<E, R>) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
        R: std::fmt::Debug,
    {
        let message = err
            .message()
            .map(str::to_string)
            .unwrap_or_else(|| DisplayErrorContext(&err).to_string());

        match &err {
            SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => AwsError::Transport {
                operation: operation.to_string(),
                message,
            },
            _ => {
                let code = err.code().unwrap_or("Unknown").to_string();
                if THROTTLING_CODES.contains(&code.as_str()) {
                    AwsError::Throttled {
                        operation: operation.to_string(),
                        message,
                    }
                } else {
                    AwsError::Service {
                        operation: operation.to_string(),
                        code,
                        message,
                    }
                }
            }
        }
    }

    pub fn missing(operation: &str, field: &'static str) -> Self {
        AwsError::MissingField {
            operation: operation.to_string(),
            field,
        }
    }

    /// Service error code, when AWS answered.
    pub fn code(&self) -> Option<&str> {
        match self {
            AwsError::Service { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AwsError::Transport { message, .. }
            | AwsError::Throttled { message, .. }
            | AwsError::Service { message, .. } => message,
            AwsError::MissingField { field, .. } => field,
            AwsError::InvalidRequest(message) => message,
        }
    }

    /// CloudFormation reports unknown stacks as a validation error.
    pub fn is_stack_missing(&self) -> bool {
        self.code() == Some("ValidationError") && self.message().contains("does not exist")
    }

    /// Update submitted for a stack that already matches.
    pub fn is_no_op_update(&self) -> bool {
        self.code() == Some("ValidationError")
            && self.message().contains("No updates are to be performed")
    }
}

impl From<AwsError> for CloudError {
    fn from(err: AwsError) -> Self {
        match err {
            AwsError::Transport { .. } | AwsError::Throttled { .. } => {
                CloudError::Transport(err.to_string())
            }
            _ => CloudError::ApiError(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, AwsError>;
