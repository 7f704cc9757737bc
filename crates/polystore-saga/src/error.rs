use polystore_core::CompensationKey;
use serde::Serialize;
use thiserror::Error;

/// A forward step that failed and triggered rollback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("step '{step}' failed: {message}")]
pub struct StepFailure {
    /// Name of the step that failed.
    pub step: String,
    /// The backend's error message.
    pub message: String,
}

/// Error from a failed compensation operation.
///
/// A failed compensation leaves the named backend holding data the saga meant
/// to remove; it needs manual reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("compensation failed for step '{step}': {message}")]
pub struct CompensationError {
    /// Name of the step whose compensation failed.
    pub step: String,
    /// Description of what the compensation was trying to do.
    pub description: String,
    /// The backend's error message.
    pub message: String,
}

/// Configuration or resolution failure, raised before any step executes.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SagaError {
    #[error("saga '{operation}' has no steps")]
    Empty { operation: String },

    #[error("no compensation registered for '{key}'")]
    CompensationNotRegistered { key: CompensationKey },

    #[error("failed to resolve step '{step}'")]
    StepResolution {
        step: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compensation_error_names_step_and_cause() {
        let err = CompensationError {
            step: "graph-create".to_string(),
            description: "delete created node".to_string(),
            message: "connection reset".to_string(),
        };

        let msg = err.to_string();

        assert!(msg.contains("graph-create"));
        assert!(msg.contains("connection reset"));
    }

    #[test]
    fn missing_compensation_names_key() {
        let err = SagaError::CompensationNotRegistered {
            key: CompensationKey::new("vector-create"),
        };

        assert_eq!(
            err.to_string(),
            "no compensation registered for 'vector-create'"
        );
    }

    #[test]
    fn step_resolution_keeps_source() {
        let source = std::io::Error::other("no adapter for backend-type 'nonexistent'");
        let err = SagaError::StepResolution {
            step: "file-create".to_string(),
            source: Box::new(source),
        };

        let cause = std::error::Error::source(&err).expect("has source");
        assert!(cause.to_string().contains("nonexistent"));
    }
}
