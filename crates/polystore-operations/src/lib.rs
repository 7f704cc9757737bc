//! Consistent writes of one logical document across vector, graph,
//! relational and file backends.
//!
//! [`Polystore`] wires the pieces together in a fixed order: adapter
//! factories are registered, the standard compensations are registered, and
//! only then is the saga orchestrator built. Each write becomes an ordered
//! list of [`StepSpec`](polystore_saga::StepSpec)s, bound to concrete adapters
//! by [`BackendStepBuilder`] at execution time.

mod builder;
mod compensations;
mod error;
mod plan;
mod store;

pub use builder::BackendStepBuilder;
pub use compensations::{register_compensations, standard_compensations};
pub use error::{OperationError, Result, StepBuildError};
pub use plan::DocumentWrite;
pub use store::Polystore;
