use std::fmt;
use std::sync::Arc;

use polystore_core::{
    AdapterError, BackendAdapter, BackendRole, CompensationKey, Document, OperationKind,
    StepResult,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Forward action of a step, run at most once.
pub type ForwardAction = Box<dyn FnOnce() -> Result<StepResult, AdapterError> + Send>;

/// Lifecycle of a single step within a saga.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    NotStarted,
    Succeeded,
    Failed,
    Compensated,
    CompensationFailed,
    /// The step's backend role is disabled or unconfigured and the step is optional.
    Skipped,
}

impl StepStatus {
    /// Symbol used in audit summaries.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::NotStarted => "·",
            Self::Succeeded => "✓",
            Self::Failed => "✗",
            Self::Compensated => "↩",
            Self::CompensationFailed => "⚠",
            Self::Skipped => "−",
        }
    }
}

/// Description of a step before it is bound to a backend adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSpec {
    pub name: Option<String>,
    pub role: BackendRole,
    pub kind: OperationKind,
    pub document: Document,
    /// Skip the step instead of failing when its role is disabled or unconfigured.
    #[serde(default)]
    pub optional: bool,
}

impl StepSpec {
    #[must_use]
    pub fn new(role: BackendRole, kind: OperationKind, document: Document) -> Self {
        Self {
            name: None,
            role,
            kind,
            document,
            optional: false,
        }
    }

    #[must_use]
    pub fn create(role: BackendRole, document: Document) -> Self {
        Self::new(role, OperationKind::Create, document)
    }

    #[must_use]
    pub fn read(role: BackendRole, id: impl Into<String>) -> Self {
        Self::new(
            role,
            OperationKind::Read,
            Document::with_id(id, Value::Null),
        )
    }

    #[must_use]
    pub fn update(role: BackendRole, id: impl Into<String>, body: Value) -> Self {
        Self::new(role, OperationKind::Update, Document::with_id(id, body))
    }

    #[must_use]
    pub fn delete(role: BackendRole, id: impl Into<String>) -> Self {
        Self::new(
            role,
            OperationKind::Delete,
            Document::with_id(id, Value::Null),
        )
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Explicit name, or `<role>-<kind>` when none was given.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{}-{}", self.role, self.kind))
    }
}

/// A step bound to its backend adapter and forward action.
pub struct SagaStep {
    name: String,
    role: BackendRole,
    kind: OperationKind,
    compensation_key: CompensationKey,
    adapter: Option<Arc<dyn BackendAdapter>>,
    forward: Option<ForwardAction>,
    status: StepStatus,
    result: Option<StepResult>,
    skip_reason: Option<String>,
}

impl SagaStep {
    pub fn new<F>(
        name: impl Into<String>,
        role: BackendRole,
        kind: OperationKind,
        adapter: Arc<dyn BackendAdapter>,
        forward: F,
    ) -> Self
    where
        F: FnOnce() -> Result<StepResult, AdapterError> + Send + 'static,
    {
        Self {
            name: name.into(),
            role,
            kind,
            compensation_key: CompensationKey::for_operation(role, kind),
            adapter: Some(adapter),
            forward: Some(Box::new(forward)),
            status: StepStatus::NotStarted,
            result: None,
            skip_reason: None,
        }
    }

    /// A step that will not execute and is never compensated.
    pub fn skipped(
        name: impl Into<String>,
        role: BackendRole,
        kind: OperationKind,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            role,
            kind,
            compensation_key: CompensationKey::for_operation(role, kind),
            adapter: None,
            forward: None,
            status: StepStatus::Skipped,
            result: None,
            skip_reason: Some(reason.into()),
        }
    }

    #[must_use]
    pub fn with_compensation_key(mut self, key: CompensationKey) -> Self {
        self.compensation_key = key;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn role(&self) -> BackendRole {
        self.role
    }

    #[must_use]
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    #[must_use]
    pub fn compensation_key(&self) -> &CompensationKey {
        &self.compensation_key
    }

    #[must_use]
    pub fn status(&self) -> StepStatus {
        self.status
    }

    #[must_use]
    pub fn result(&self) -> Option<&StepResult> {
        self.result.as_ref()
    }

    #[must_use]
    pub fn skip_reason(&self) -> Option<&str> {
        self.skip_reason.as_deref()
    }

    #[must_use]
    pub fn is_skipped(&self) -> bool {
        self.status == StepStatus::Skipped
    }

    pub(crate) fn adapter(&self) -> Option<&Arc<dyn BackendAdapter>> {
        self.adapter.as_ref()
    }

    pub(crate) fn run_forward(&mut self) -> Result<(), String> {
        let Some(forward) = self.forward.take() else {
            self.status = StepStatus::Failed;
            return Err("forward action already consumed".to_string());
        };
        match forward() {
            Ok(result) => {
                self.status = StepStatus::Succeeded;
                self.result = Some(result);
                Ok(())
            }
            Err(error) => {
                self.status = StepStatus::Failed;
                Err(error.to_string())
            }
        }
    }

    pub(crate) fn set_status(&mut self, status: StepStatus) {
        self.status = status;
    }

    pub(crate) fn take_result(&mut self) -> Option<StepResult> {
        self.result.take()
    }
}

impl fmt::Debug for SagaStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SagaStep")
            .field("name", &self.name)
            .field("role", &self.role)
            .field("kind", &self.kind)
            .field("compensation_key", &self.compensation_key)
            .field(
                "backend_type",
                &self.adapter.as_ref().map(|adapter| adapter.backend_type()),
            )
            .field("status", &self.status)
            .field("result", &self.result)
            .finish_non_exhaustive()
    }
}

/// Binds a [`StepSpec`] to a backend and produces its forward action.
///
/// The compensation for the step is looked up separately by its
/// [`CompensationKey`], so a builder only decides *where* a step runs and what
/// it does going forward.
pub trait StepBuilder: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// # Errors
    ///
    /// Returns an error when the step cannot be bound to a backend.
    fn build(&self, spec: &StepSpec) -> Result<SagaStep, Self::Error>;
}
