use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::{CompensationError, StepFailure};
use crate::step::SagaStep;

/// Overall state of a saga.
///
/// ```text
/// pending -> running -> completed
///                    -> failed
///                    -> compensating -> compensated
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SagaStatus {
    Pending,
    Running,
    Completed,
    Compensating,
    Compensated,
    /// The first executed step failed; nothing needed rolling back.
    Failed,
}

impl SagaStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Compensated | Self::Failed)
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Running, Self::Completed | Self::Compensating | Self::Failed)
                | (Self::Compensating, Self::Compensated)
        )
    }
}

/// Mutable state of one saga execution, owned by the orchestrator.
#[derive(Debug)]
pub struct SagaTransaction {
    pub(crate) id: Uuid,
    pub(crate) operation: String,
    pub(crate) steps: Vec<SagaStep>,
    pub(crate) status: SagaStatus,
    pub(crate) forward_errors: Vec<StepFailure>,
    pub(crate) compensation_errors: Vec<CompensationError>,
    pub(crate) created_at: DateTime<Utc>,
}

impl SagaTransaction {
    #[must_use]
    pub fn new(operation: impl Into<String>, steps: Vec<SagaStep>) -> Self {
        Self {
            id: Uuid::new_v4(),
            operation: operation.into(),
            steps,
            status: SagaStatus::Pending,
            forward_errors: Vec::new(),
            compensation_errors: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    #[must_use]
    pub fn status(&self) -> SagaStatus {
        self.status
    }

    #[must_use]
    pub fn steps(&self) -> &[SagaStep] {
        &self.steps
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn forward_errors(&self) -> &[StepFailure] {
        &self.forward_errors
    }

    #[must_use]
    pub fn compensation_errors(&self) -> &[CompensationError] {
        &self.compensation_errors
    }

    /// Moves to `next` if the state machine allows it.
    ///
    /// Returns whether the transition happened.
    pub(crate) fn transition(&mut self, next: SagaStatus) -> bool {
        if self.status.can_transition_to(next) {
            self.status = next;
            true
        } else {
            warn!(
                saga_id = %self.id,
                from = ?self.status,
                to = ?next,
                "ignoring invalid saga transition"
            );
            false
        }
    }

    pub(crate) fn step_mut(&mut self, index: usize) -> Option<&mut SagaStep> {
        self.steps.get_mut(index)
    }

    pub(crate) fn record_forward_error(&mut self, failure: StepFailure) {
        self.forward_errors.push(failure);
    }

    pub(crate) fn record_compensation_error(&mut self, error: CompensationError) {
        self.compensation_errors.push(error);
    }
}
