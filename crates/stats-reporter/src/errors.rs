//! Stats reporter error types.
//!
//! Errors from asynchronous backend operations are never raised across the
//! backend's callback boundary. They are delivered to caller-supplied
//! callbacks (`InitCallback::on_error`, the conference setup-error handler)
//! as values of this type.
//!
//! A closed reporting gate is not an error at all: it is reported as
//! `CycleOutcome::Skipped` by the engine.

use crate::backend::BackendErrorReason;
use thiserror::Error;

/// Stats reporter error type.
#[derive(Debug, Error)]
pub enum ReporterError {
    /// Neither a key pair nor a shared secret was supplied for a backend
    /// session. Fatal for that session only.
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    /// The backend rejected a conference setup request. The conference
    /// never becomes active; not retried automatically.
    #[error("Conference setup failed ({reason}): {message}")]
    SetupFailed {
        reason: BackendErrorReason,
        message: String,
    },

    /// The backend reported an initialization failure for a session.
    #[error("Backend initialization failed ({reason}): {message}")]
    InitializationFailed {
        reason: BackendErrorReason,
        message: String,
    },

    /// A snapshot entry could not be mapped to a report and was skipped.
    #[error("Malformed snapshot entry: {0}")]
    MalformedSnapshotEntry(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A snapshot file could not be read or decoded.
    #[error("Snapshot decode error: {0}")]
    SnapshotDecode(String),

    /// Internal error with context.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReporterError {
    /// Bounded reason label for logs and metrics.
    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            ReporterError::MissingCredentials(_) => "missing_credentials",
            ReporterError::SetupFailed { .. } => "setup_failed",
            ReporterError::InitializationFailed { .. } => "initialization_failed",
            ReporterError::MalformedSnapshotEntry(_) => "malformed_snapshot_entry",
            ReporterError::Config(_) => "config",
            ReporterError::SnapshotDecode(_) => "snapshot_decode",
            ReporterError::Internal(_) => "internal",
        }
    }

    /// Backend-supplied reason, when the error originated at the backend.
    #[must_use]
    pub fn backend_reason(&self) -> Option<&BackendErrorReason> {
        match self {
            ReporterError::SetupFailed { reason, .. }
            | ReporterError::InitializationFailed { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_code_mapping() {
        assert_eq!(
            ReporterError::MissingCredentials("appSecret missing".to_string()).reason_code(),
            "missing_credentials"
        );
        assert_eq!(
            ReporterError::SetupFailed {
                reason: BackendErrorReason::Authentication,
                message: "token rejected".to_string(),
            }
            .reason_code(),
            "setup_failed"
        );
        assert_eq!(
            ReporterError::InitializationFailed {
                reason: BackendErrorReason::Connectivity,
                message: "unreachable".to_string(),
            }
            .reason_code(),
            "initialization_failed"
        );
        assert_eq!(
            ReporterError::MalformedSnapshotEntry("empty endpoint id".to_string()).reason_code(),
            "malformed_snapshot_entry"
        );
        assert_eq!(ReporterError::Config("bad".to_string()).reason_code(), "config");
        assert_eq!(
            ReporterError::SnapshotDecode("eof".to_string()).reason_code(),
            "snapshot_decode"
        );
        assert_eq!(ReporterError::Internal("x".to_string()).reason_code(), "internal");
    }

    #[test]
    fn test_display_includes_backend_reason() {
        let err = ReporterError::SetupFailed {
            reason: BackendErrorReason::Protocol,
            message: "unexpected status".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Conference setup failed (protocol): unexpected status"
        );
    }

    #[test]
    fn test_backend_reason_only_for_backend_errors() {
        let err = ReporterError::InitializationFailed {
            reason: BackendErrorReason::Authentication,
            message: "bad key".to_string(),
        };
        assert_eq!(err.backend_reason(), Some(&BackendErrorReason::Authentication));
        assert!(ReporterError::Internal("x".to_string())
            .backend_reason()
            .is_none());
    }
}
