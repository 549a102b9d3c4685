//! Error classification for RDS snapshot operations
//!
//! Provider errors are classified by their error code through
//! `ProvideErrorMetadata`, so the creator's retry loop can tell the two
//! transient instance-state faults apart from everything else.

use aws_sdk_rds::error::{ProvideErrorMetadata, SdkError};
use thiserror::Error;

/// Error code RDS returns when the instance is not in the `available` state
pub const INSTANCE_UNAVAILABLE_CODE: &str = "InvalidDBInstanceStateFault";

/// Error code RDS returns while an earlier snapshot of the instance is running
pub const SNAPSHOT_IN_PROGRESS_CODE: &str = "InvalidDBInstanceState";

#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The instance is not in a state that accepts a snapshot (retryable)
    #[error("DB instance is not in available state: {message}")]
    InstanceUnavailable { message: String },

    /// An earlier snapshot for the instance is still running (retryable)
    #[error("Earlier snapshot for the DB instance is in progress: {message}")]
    SnapshotInProgress { message: String },

    /// Any other RDS error; always fatal
    #[error("RDS error ({}): {message}", .code.as_deref().unwrap_or("unknown"))]
    Rds {
        code: Option<String>,
        message: String,
    },

    /// Required environment variable is missing
    #[error("Missing environment variable {0}")]
    MissingConfig(&'static str),

    /// Environment variable is present but cannot be parsed
    #[error("Invalid value for environment variable {key}: {reason}")]
    InvalidConfig { key: &'static str, reason: String },

    /// Every targeted instance exhausted its retries
    #[error("All the snapshots failed after retrying {retry_limit} times. Exiting...")]
    AllSnapshotsFailed { retry_limit: u32 },
}

impl SnapshotError {
    /// Classify an SDK error by its RDS error code.
    pub fn from_sdk<E, R>(err: SdkError<E, R>) -> Self
    where
        E: ProvideErrorMetadata,
    {
        let code = err.code().map(str::to_string);
        let message = err
            .message()
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string());

        classify(code, message)
    }

    /// Whether the creator should swallow this error and try again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SnapshotError::InstanceUnavailable { .. } | SnapshotError::SnapshotInProgress { .. }
        )
    }

    /// The RDS error code behind this error, if it came from the provider
    pub fn code(&self) -> Option<&str> {
        match self {
            SnapshotError::InstanceUnavailable { .. } => Some(INSTANCE_UNAVAILABLE_CODE),
            SnapshotError::SnapshotInProgress { .. } => Some(SNAPSHOT_IN_PROGRESS_CODE),
            SnapshotError::Rds { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

/// Map an RDS error code and message onto the error taxonomy.
pub fn classify(code: Option<String>, message: String) -> SnapshotError {
    match code.as_deref() {
        Some(INSTANCE_UNAVAILABLE_CODE) => SnapshotError::InstanceUnavailable { message },
        Some(SNAPSHOT_IN_PROGRESS_CODE) => SnapshotError::SnapshotInProgress { message },
        _ => SnapshotError::Rds { code, message },
    }
}
