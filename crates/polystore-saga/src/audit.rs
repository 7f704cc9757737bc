use std::time::{Duration, Instant};

use crate::step::StepStatus;

/// Timing and outcome of one step in a saga run.
#[derive(Debug, Clone)]
pub struct StepRecord {
    /// Name of the step.
    pub name: String,
    /// `backend-type` the step was bound to; `None` for skipped steps.
    pub backend_type: Option<String>,
    /// Current status.
    pub status: StepStatus,
    /// When the step started executing.
    pub started_at: Instant,
    /// Set once the forward action (or, later, its compensation) finishes.
    pub completed_at: Option<Instant>,
    /// Description of the registered compensation, once the step succeeded.
    pub compensation_description: Option<String>,
}

impl StepRecord {
    /// Time from start to the last recorded transition, if the step finished.
    #[must_use]
    pub fn elapsed(&self) -> Option<Duration> {
        self.completed_at
            .map(|done| done.saturating_duration_since(self.started_at))
    }
}

/// Ordered log of every step visited during a saga run.
///
/// Records are indexed by step position, so steps sharing a name are tracked
/// separately.
#[derive(Debug, Clone, Default)]
pub struct SagaAuditLog {
    records: Vec<StepRecord>,
}

impl SagaAuditLog {
    /// Create a new empty audit log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a step starting and returns its index in the log.
    pub(crate) fn record_start(&mut self, name: &str, backend_type: Option<&str>) -> usize {
        self.records.push(StepRecord {
            name: name.to_string(),
            backend_type: backend_type.map(str::to_string),
            status: StepStatus::NotStarted,
            started_at: Instant::now(),
            completed_at: None,
            compensation_description: None,
        });
        self.records.len() - 1
    }

    pub(crate) fn record_skipped(&mut self, name: &str) {
        let now = Instant::now();
        self.records.push(StepRecord {
            name: name.to_string(),
            backend_type: None,
            status: StepStatus::Skipped,
            started_at: now,
            completed_at: Some(now),
            compensation_description: None,
        });
    }

    pub(crate) fn record_success(&mut self, index: usize, compensation_description: &str) {
        self.finish(index, StepStatus::Succeeded);
        if let Some(record) = self.records.get_mut(index) {
            record.compensation_description = Some(compensation_description.to_string());
        }
    }

    pub(crate) fn record_failure(&mut self, index: usize) {
        self.finish(index, StepStatus::Failed);
    }

    pub(crate) fn record_compensated(&mut self, index: usize) {
        self.finish(index, StepStatus::Compensated);
    }

    pub(crate) fn record_compensation_failed(&mut self, index: usize) {
        self.finish(index, StepStatus::CompensationFailed);
    }

    fn finish(&mut self, index: usize, status: StepStatus) {
        if let Some(record) = self.records.get_mut(index) {
            record.status = status;
            record.completed_at = Some(Instant::now());
        }
    }

    /// All records, in the order the steps were visited.
    #[must_use]
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// One line per step, prefixed with its status symbol.
    #[must_use]
    pub fn summary(&self) -> String {
        self.records
            .iter()
            .map(|record| match &record.backend_type {
                Some(backend) => format!("{} {} [{backend}]", record.status.symbol(), record.name),
                None => format!("{} {}", record.status.symbol(), record.name),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
