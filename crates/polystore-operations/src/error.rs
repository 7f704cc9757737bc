use polystore_backend::{ConfigError, SelectorError};
use polystore_core::{BackendRole, OperationKind};
use polystore_saga::SagaError;
use thiserror::Error;

/// Failure to bind a step to a backend adapter.
#[derive(Debug, Error)]
pub enum StepBuildError {
    #[error(transparent)]
    Selector(#[from] SelectorError),

    #[error("{kind} step on role {role} requires a record id")]
    MissingRecordId {
        role: BackendRole,
        kind: OperationKind,
    },
}

#[derive(Debug, Error)]
pub enum OperationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Selector(#[from] SelectorError),

    #[error(transparent)]
    Saga(#[from] SagaError),

    #[error("role {role} is served by '{backend_type}', which has no bulk write support")]
    BulkUnsupported {
        role: BackendRole,
        backend_type: String,
    },
}

pub type Result<T> = std::result::Result<T, OperationError>;
