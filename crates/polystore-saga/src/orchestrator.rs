use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::audit::SagaAuditLog;
use crate::error::{CompensationError, SagaError, StepFailure};
use crate::registry::{CompensationRegistry, RegisteredCompensation};
use crate::report::SagaResult;
use crate::step::{SagaStep, StepBuilder, StepSpec, StepStatus};
use crate::transaction::{SagaStatus, SagaTransaction};

/// Runs sagas built by `B` against compensations from a shared registry.
///
/// The orchestrator holds no per-saga state, so one instance may run many
/// sagas concurrently.
#[derive(Debug)]
pub struct SagaOrchestrator<B> {
    builder: B,
    compensations: Arc<CompensationRegistry>,
}

impl<B: StepBuilder> SagaOrchestrator<B> {
    #[must_use]
    pub fn new(builder: B, compensations: Arc<CompensationRegistry>) -> Self {
        Self {
            builder,
            compensations,
        }
    }

    #[must_use]
    pub fn builder(&self) -> &B {
        &self.builder
    }

    #[must_use]
    pub fn compensations(&self) -> &CompensationRegistry {
        &self.compensations
    }

    /// Resolves every step, then executes them in order.
    ///
    /// Backend failures during execution are reported in the returned
    /// [`SagaResult`], never as `Err`.
    ///
    /// # Errors
    ///
    /// Returns [`SagaError`] when `specs` is empty, a step cannot be bound to
    /// a backend, or a step has no registered compensation. No step has run
    /// when this happens.
    pub fn execute(
        &self,
        operation: &str,
        specs: Vec<StepSpec>,
    ) -> Result<SagaResult, SagaError> {
        let steps = specs
            .iter()
            .map(|spec| {
                self.builder
                    .build(spec)
                    .map_err(|source| SagaError::StepResolution {
                        step: spec.display_name(),
                        source: Box::new(source),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.execute_steps(operation, steps)
    }

    /// Executes already-bound steps.
    ///
    /// # Errors
    ///
    /// Same as [`execute`](Self::execute), minus step binding.
    pub fn execute_steps(
        &self,
        operation: &str,
        steps: Vec<SagaStep>,
    ) -> Result<SagaResult, SagaError> {
        if steps.is_empty() {
            return Err(SagaError::Empty {
                operation: operation.to_string(),
            });
        }
        let compensations = steps
            .iter()
            .map(|step| {
                if step.is_skipped() {
                    Ok(None)
                } else {
                    self.compensations
                        .resolve(step.compensation_key())
                        .map(|compensation| Some(compensation.clone()))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        let transaction = SagaTransaction::new(operation, steps);
        Ok(run(transaction, &compensations))
    }
}

fn run(
    mut transaction: SagaTransaction,
    compensations: &[Option<RegisteredCompensation>],
) -> SagaResult {
    let mut audit_log = SagaAuditLog::new();
    // (step index, audit index) of every succeeded step, in execution order
    let mut completed: Vec<(usize, usize)> = Vec::new();

    transaction.transition(SagaStatus::Running);
    info!(
        saga_id = %transaction.id(),
        operation = %transaction.operation(),
        steps = transaction.steps().len(),
        "starting saga"
    );

    for index in 0..transaction.steps().len() {
        let Some(step) = transaction.step_mut(index) else {
            break;
        };
        if step.is_skipped() {
            debug!(
                step = %step.name(),
                reason = step.skip_reason().unwrap_or("-"),
                "skipping step"
            );
            audit_log.record_skipped(step.name());
            continue;
        }

        let backend_type = step.adapter().map(|adapter| adapter.backend_type().to_string());
        let audit_index = audit_log.record_start(step.name(), backend_type.as_deref());
        debug!(step = %step.name(), backend_type = ?backend_type, "executing step");

        match step.run_forward() {
            Ok(()) => {
                let description = compensations
                    .get(index)
                    .and_then(Option::as_ref)
                    .map_or("", RegisteredCompensation::description);
                audit_log.record_success(audit_index, description);
                completed.push((index, audit_index));
            }
            Err(message) => {
                audit_log.record_failure(audit_index);
                warn!(step = %step.name(), error = %message, "saga step failed");
                let failure = StepFailure {
                    step: step.name().to_string(),
                    message,
                };
                transaction.record_forward_error(failure);

                if completed.is_empty() {
                    transaction.transition(SagaStatus::Failed);
                } else {
                    transaction.transition(SagaStatus::Compensating);
                    compensate(&mut transaction, compensations, completed, &mut audit_log);
                    transaction.transition(SagaStatus::Compensated);
                }
                return finish(transaction, audit_log);
            }
        }
    }

    transaction.transition(SagaStatus::Completed);
    finish(transaction, audit_log)
}

/// Undoes completed steps in reverse order, continuing past failures.
fn compensate(
    transaction: &mut SagaTransaction,
    compensations: &[Option<RegisteredCompensation>],
    mut completed: Vec<(usize, usize)>,
    audit_log: &mut SagaAuditLog,
) {
    info!(
        saga_id = %transaction.id(),
        count = completed.len(),
        "rolling back completed steps"
    );

    while let Some((index, audit_index)) = completed.pop() {
        let Some(step) = transaction.step_mut(index) else {
            continue;
        };
        let Some(compensation) = compensations.get(index).and_then(Option::as_ref) else {
            continue;
        };
        let outcome = match (step.adapter(), step.result()) {
            (Some(adapter), Some(result)) => compensation.run(&**adapter, result),
            _ => Ok(()),
        };

        match outcome {
            Ok(()) => {
                debug!(step = %step.name(), "compensated step");
                step.set_status(StepStatus::Compensated);
                audit_log.record_compensated(audit_index);
            }
            Err(err) => {
                error!(
                    step = %step.name(),
                    compensation = %compensation.description(),
                    error = %err,
                    "compensation failed, manual reconciliation required"
                );
                step.set_status(StepStatus::CompensationFailed);
                audit_log.record_compensation_failed(audit_index);
                let failure = CompensationError {
                    step: step.name().to_string(),
                    description: compensation.description().to_string(),
                    message: err.to_string(),
                };
                transaction.record_compensation_error(failure);
            }
        }
    }
}

fn finish(transaction: SagaTransaction, audit_log: SagaAuditLog) -> SagaResult {
    let result = SagaResult::from_transaction(transaction, audit_log);
    info!(
        saga_id = %result.saga_id,
        operation = %result.operation,
        status = ?result.status,
        forward_errors = result.forward_errors.len(),
        compensation_errors = result.compensation_errors.len(),
        "saga finished"
    );
    result
}
