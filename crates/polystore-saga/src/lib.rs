//! Saga orchestration for writes that span several storage backends.
//!
//! A saga runs its steps in order. Each succeeded step is pushed on a
//! compensation stack; when a later step fails, the stack is unwound and every
//! succeeded step is compensated in reverse order, even if an earlier
//! compensation failed. Forward and compensation failures are reported in the
//! returned [`SagaResult`]; only configuration problems surface as
//! [`SagaError`], and always before any step has run.

mod audit;
mod error;
mod orchestrator;
mod registry;
mod report;
mod step;
mod transaction;

pub use audit::{SagaAuditLog, StepRecord};
pub use error::{CompensationError, SagaError, StepFailure};
pub use orchestrator::SagaOrchestrator;
pub use registry::{CompensationFn, CompensationRegistry, RegisteredCompensation};
pub use report::{SagaResult, StepReport};
pub use step::{ForwardAction, SagaStep, StepBuilder, StepSpec, StepStatus};
pub use transaction::{SagaStatus, SagaTransaction};
