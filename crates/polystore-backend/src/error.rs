use std::path::PathBuf;

use polystore_core::{AdapterError, BackendRole};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file '{path}'")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration")]
    Parse(#[source] toml::de::Error),

    #[error("failed to parse configuration file '{path}'")]
    ParseFile {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("unknown backend role '{role}' in configuration")]
    UnknownRole { role: String },

    #[error("'{field}' must be greater than zero")]
    InvalidBatchSize { field: &'static str },
}

/// Failure to bind a role to a concrete adapter.
///
/// These are deployment errors, raised before any backend is touched.
#[derive(Debug, Error)]
pub enum SelectorError {
    #[error("no adapter for backend-type '{backend_type}' (role {role}, available: {available})")]
    UnknownBackendType {
        role: BackendRole,
        backend_type: String,
        available: String,
    },

    #[error("role {role} is enabled but declares no backend-type")]
    MissingBackendType { role: BackendRole },

    #[error("role {role} is not configured")]
    RoleNotConfigured { role: BackendRole },

    #[error("role {role} is disabled")]
    RoleDisabled { role: BackendRole },

    #[error("failed to construct '{backend_type}' adapter for role {role}")]
    Construction {
        role: BackendRole,
        backend_type: String,
        #[source]
        source: AdapterError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_backend_type_lists_available_types() {
        let err = SelectorError::UnknownBackendType {
            role: BackendRole::File,
            backend_type: "nonexistent".to_string(),
            available: "filesystem, memory".to_string(),
        };

        let msg = err.to_string();

        assert!(msg.contains("nonexistent"));
        assert!(msg.contains("filesystem, memory"));
        assert!(msg.contains("file"));
    }

    #[test]
    fn read_error_includes_path() {
        let err = ConfigError::Read {
            path: PathBuf::from("/etc/polystore.toml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };

        assert!(err.to_string().contains("/etc/polystore.toml"));
    }
}
