use chrono::{DateTime, Utc};
use polystore_core::{BackendRole, OperationKind, StepResult};
use serde::Serialize;
use uuid::Uuid;

use crate::audit::SagaAuditLog;
use crate::error::{CompensationError, StepFailure};
use crate::step::{SagaStep, StepStatus};
use crate::transaction::{SagaStatus, SagaTransaction};

/// Final state of one step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    /// Name of the step.
    pub name: String,
    /// Role the step wrote to.
    pub role: BackendRole,
    /// Operation the step performed.
    pub kind: OperationKind,
    /// Status when the saga finished.
    pub status: StepStatus,
    /// What the forward action captured, if it succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<StepResult>,
    /// Why the step was skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
}

impl StepReport {
    fn from_step(mut step: SagaStep) -> Self {
        let result = step.take_result();
        Self {
            name: step.name().to_string(),
            role: step.role(),
            kind: step.kind(),
            status: step.status(),
            result,
            skip_reason: step.skip_reason().map(str::to_string),
        }
    }
}

/// Immutable outcome of a saga run.
///
/// Only `status` decides whether the write took effect. `compensation_errors`
/// lists backends that may still hold data from a rolled-back saga.
#[derive(Debug, Serialize)]
pub struct SagaResult {
    /// Identifier assigned when the saga was created.
    pub saga_id: Uuid,
    /// Caller-supplied label, e.g. `create document`.
    pub operation: String,
    /// Terminal status.
    pub status: SagaStatus,
    /// Every step in execution order, skipped ones included.
    pub steps: Vec<StepReport>,
    /// The forward failure that triggered rollback, if any.
    pub forward_errors: Vec<StepFailure>,
    /// Compensations that failed during rollback.
    pub compensation_errors: Vec<CompensationError>,
    pub created_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Per-step timings; not serialized because it holds `Instant`s.
    #[serde(skip)]
    pub audit_log: SagaAuditLog,
}

impl SagaResult {
    pub(crate) fn from_transaction(transaction: SagaTransaction, audit_log: SagaAuditLog) -> Self {
        Self {
            saga_id: transaction.id,
            operation: transaction.operation,
            status: transaction.status,
            steps: transaction
                .steps
                .into_iter()
                .map(StepReport::from_step)
                .collect(),
            forward_errors: transaction.forward_errors,
            compensation_errors: transaction.compensation_errors,
            created_at: transaction.created_at,
            finished_at: Utc::now(),
            audit_log,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == SagaStatus::Completed
    }

    /// True when a rollback left at least one backend unreconciled.
    #[must_use]
    pub fn needs_reconciliation(&self) -> bool {
        !self.compensation_errors.is_empty()
    }

    #[must_use]
    pub fn step(&self, name: &str) -> Option<&StepReport> {
        self.steps.iter().find(|step| step.name == name)
    }

    /// Record id produced by the first step that ran against `role`.
    #[must_use]
    pub fn record_id(&self, role: BackendRole) -> Option<&str> {
        self.steps
            .iter()
            .filter(|step| step.role == role)
            .find_map(|step| step.result.as_ref()?.record_id.as_deref())
    }

    #[must_use]
    pub fn statuses(&self) -> Vec<StepStatus> {
        self.steps.iter().map(|step| step.status).collect()
    }
}
