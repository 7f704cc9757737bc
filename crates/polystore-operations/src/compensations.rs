use polystore_core::{
    AdapterError, BackendAdapter, BackendRole, CompensationKey, Document, OperationKind,
    StepResult,
};
use polystore_saga::CompensationRegistry;
use serde_json::Value;
use tracing::debug;

/// Registers the undo action for every role and operation kind.
///
/// Compensations depend only on the step's own [`StepResult`] and the adapter
/// the step ran against.
pub fn register_compensations(registry: &mut CompensationRegistry) {
    for role in BackendRole::ALL {
        registry.register(
            CompensationKey::for_operation(role, OperationKind::Create),
            format!("delete record created in {role} store"),
            undo_create,
        );
        registry.register(
            CompensationKey::for_operation(role, OperationKind::Read),
            "nothing to undo",
            |_: &dyn BackendAdapter, _: &StepResult| Ok(()),
        );
        registry.register(
            CompensationKey::for_operation(role, OperationKind::Update),
            format!("restore previous {role} record"),
            undo_update,
        );
        registry.register(
            CompensationKey::for_operation(role, OperationKind::Delete),
            format!("re-create deleted {role} record"),
            undo_delete,
        );
    }
}

#[must_use]
pub fn standard_compensations() -> CompensationRegistry {
    let mut registry = CompensationRegistry::new();
    register_compensations(&mut registry);
    registry
}

fn undo_create(adapter: &dyn BackendAdapter, result: &StepResult) -> Result<(), AdapterError> {
    let id = captured_id(result)?;
    if result.preexisting {
        debug!(
            id,
            backend_type = adapter.backend_type(),
            "record predates the saga, keeping it"
        );
        return Ok(());
    }
    match adapter.delete(id) {
        Err(err) if err.is_not_found() => {
            debug!(
                id,
                backend_type = adapter.backend_type(),
                "record already gone"
            );
            Ok(())
        }
        other => other,
    }
}

fn undo_update(adapter: &dyn BackendAdapter, result: &StepResult) -> Result<(), AdapterError> {
    let id = captured_id(result)?;
    adapter.update(id, captured_previous(result, id)?)
}

fn undo_delete(adapter: &dyn BackendAdapter, result: &StepResult) -> Result<(), AdapterError> {
    let id = captured_id(result)?;
    let previous = captured_previous(result, id)?;
    adapter
        .create(&Document::with_id(id, previous.clone()))
        .map(|_| ())
}

fn captured_id(result: &StepResult) -> Result<&str, AdapterError> {
    result
        .record_id
        .as_deref()
        .ok_or_else(|| AdapterError::InvalidId {
            id: String::new(),
            reason: "step result carries no record id",
        })
}

fn captured_previous<'a>(result: &'a StepResult, id: &str) -> Result<&'a Value, AdapterError> {
    result.previous.as_ref().ok_or_else(|| AdapterError::InvalidId {
        id: id.to_string(),
        reason: "step result carries no previous body",
    })
}
