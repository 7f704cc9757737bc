use std::sync::Arc;

use polystore_backend::{BackendSelector, Resolution, SelectorError};
use polystore_core::{BackendAdapter, OperationKind, StepResult};
use polystore_saga::{ForwardAction, SagaStep, StepBuilder, StepSpec};
use tracing::debug;

use crate::error::StepBuildError;

/// Binds step specs to whichever adapter the selector currently serves for
/// the step's role.
///
/// Binding happens per saga, so a configuration reload takes effect for the
/// next saga without touching ones already running.
#[derive(Debug, Clone)]
pub struct BackendStepBuilder {
    selector: Arc<BackendSelector>,
}

impl BackendStepBuilder {
    #[must_use]
    pub fn new(selector: Arc<BackendSelector>) -> Self {
        Self { selector }
    }

    #[must_use]
    pub fn selector(&self) -> &Arc<BackendSelector> {
        &self.selector
    }

    fn bind(&self, spec: &StepSpec) -> Result<Option<Arc<dyn BackendAdapter>>, StepBuildError> {
        let role = spec.role;
        match self.selector.resolve(role)? {
            Resolution::Active(handle) => Ok(Some(Arc::clone(handle.adapter()))),
            Resolution::Disabled | Resolution::NotConfigured if spec.optional => Ok(None),
            Resolution::Disabled => Err(SelectorError::RoleDisabled { role }.into()),
            Resolution::NotConfigured => Err(SelectorError::RoleNotConfigured { role }.into()),
        }
    }
}

impl StepBuilder for BackendStepBuilder {
    type Error = StepBuildError;

    fn build(&self, spec: &StepSpec) -> Result<SagaStep, StepBuildError> {
        let name = spec.display_name();
        let Some(adapter) = self.bind(spec)? else {
            debug!(step = %name, role = %spec.role, "backend unavailable, skipping optional step");
            return Ok(SagaStep::skipped(
                name,
                spec.role,
                spec.kind,
                "backend role disabled or not configured",
            ));
        };
        let forward = forward_action(spec, Arc::clone(&adapter))?;
        Ok(SagaStep::new(name, spec.role, spec.kind, adapter, forward))
    }
}

/// Builds the forward action for `spec`.
///
/// Update and delete read the current record first so their compensations
/// can put it back without consulting any other step.
fn forward_action(
    spec: &StepSpec,
    adapter: Arc<dyn BackendAdapter>,
) -> Result<ForwardAction, StepBuildError> {
    let action: ForwardAction = match spec.kind {
        OperationKind::Create => {
            let document = spec.document.clone();
            Box::new(move || adapter.create(&document).map(StepResult::from))
        }
        OperationKind::Read => {
            let id = record_id(spec)?;
            Box::new(move || {
                let data = adapter.read(&id)?;
                Ok(StepResult::read(id, data))
            })
        }
        OperationKind::Update => {
            let id = record_id(spec)?;
            let body = spec.document.body.clone();
            Box::new(move || {
                let previous = adapter.read(&id)?;
                adapter.update(&id, &body)?;
                Ok(StepResult::replaced(id, previous))
            })
        }
        OperationKind::Delete => {
            let id = record_id(spec)?;
            Box::new(move || {
                let previous = adapter.read(&id)?;
                adapter.delete(&id)?;
                Ok(StepResult::replaced(id, previous))
            })
        }
    };
    Ok(action)
}

fn record_id(spec: &StepSpec) -> Result<String, StepBuildError> {
    spec.document
        .id
        .clone()
        .ok_or(StepBuildError::MissingRecordId {
            role: spec.role,
            kind: spec.kind,
        })
}
