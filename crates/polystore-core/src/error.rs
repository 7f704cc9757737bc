use thiserror::Error;

/// Failure reported by a backend adapter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AdapterError {
    #[error("record '{id}' not found")]
    NotFound { id: String },

    #[error("record '{id}' already exists with different content")]
    Conflict { id: String },

    #[error("could not connect to {backend}: {message}")]
    Connection { backend: String, message: String },

    #[error("{backend} rejected the request: {message}")]
    Rejected { backend: String, message: String },

    #[error("{backend} does not support {operation}")]
    Unsupported {
        backend: String,
        operation: &'static str,
    },

    #[error("invalid record id '{id}': {reason}")]
    InvalidId { id: String, reason: &'static str },

    #[error("invalid configuration for {backend}: {message}")]
    Config { backend: String, message: String },

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("serialization error")]
    Serialization(#[from] serde_json::Error),
}

impl AdapterError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

pub type Result<T> = std::result::Result<T, AdapterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_includes_id() {
        let err = AdapterError::NotFound {
            id: "doc-42".to_string(),
        };

        assert!(err.to_string().contains("doc-42"));
        assert!(err.is_not_found());
        assert!(!err.is_conflict());
    }

    #[test]
    fn io_error_converts_via_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");

        let err: AdapterError = io_err.into();

        assert!(matches!(err, AdapterError::Io(_)));
    }
}
