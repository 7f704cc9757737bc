//! Document-level sagas run through the facade against scripted backends.

use std::sync::Arc;

use polystore_adapters::testing::{CallLog, Operation, ScriptedAdapter};
use polystore_backend::{BackendConfig, BackendRegistry, SelectorError, StoreConfig};
use polystore_core::{BackendAdapter, BackendRole, Document, OperationKind};
use polystore_operations::{DocumentWrite, OperationError, Polystore};
use polystore_saga::{SagaError, SagaStatus, StepSpec, StepStatus};
use serde_json::json;

struct Backends {
    log: CallLog,
    vector: Arc<ScriptedAdapter>,
    graph: Arc<ScriptedAdapter>,
    relational: Arc<ScriptedAdapter>,
    file: Arc<ScriptedAdapter>,
}

impl Backends {
    fn new() -> Self {
        let log = CallLog::new();
        Self {
            vector: ScriptedAdapter::shared("vector", &log),
            graph: ScriptedAdapter::shared("graph", &log),
            relational: ScriptedAdapter::shared("relational", &log),
            file: ScriptedAdapter::shared("file", &log),
            log,
        }
    }

    fn registry(&self) -> BackendRegistry {
        let mut registry = BackendRegistry::new();
        self.vector.register(&mut registry, "scripted-vector");
        self.graph.register(&mut registry, "scripted-graph");
        self.relational.register(&mut registry, "scripted-relational");
        self.file.register(&mut registry, "scripted-file");
        registry
    }

    fn config() -> StoreConfig {
        BackendRole::ALL
            .into_iter()
            .fold(StoreConfig::new(), |config, role| {
                config.with_backend(role, BackendConfig::new(format!("scripted-{role}")))
            })
    }

    fn store(&self, config: StoreConfig) -> Polystore {
        Polystore::with_registry(self.registry(), config)
    }
}

fn document(id: &str) -> DocumentWrite {
    DocumentWrite::new(id)
        .with_part(BackendRole::Vector, json!({ "embedding": [0.12, 0.5, 0.9] }))
        .with_part(BackendRole::Graph, json!({ "label": "Document" }))
        .with_part(BackendRole::Relational, json!({ "title": "Quarterly report" }))
        .with_part(BackendRole::File, json!({ "path": "reports/q3.pdf" }))
}

#[test]
fn file_failure_rolls_back_the_other_three_in_reverse() -> anyhow::Result<()> {
    let backends = Backends::new();
    backends.file.fail_on(Operation::Create);
    let store = backends.store(Backends::config());

    let result = store.create_document(&document("doc-1"))?;

    assert_eq!(result.status, SagaStatus::Compensated);
    assert_eq!(
        backends.log.entries_for(Operation::Delete),
        vec![
            "relational.delete doc-1",
            "graph.delete doc-1",
            "vector.delete doc-1",
        ]
    );
    assert_eq!(result.step("file-create").map(|s| s.status), Some(StepStatus::Failed));
    assert!(backends.vector.store().is_empty());
    assert!(backends.graph.store().is_empty());
    assert!(backends.relational.store().is_empty());
    assert!(result.compensation_errors.is_empty());
    Ok(())
}

#[test]
fn disabled_optional_file_backend_is_skipped() -> anyhow::Result<()> {
    let backends = Backends::new();
    let config = Backends::config().with_backend(BackendRole::File, BackendConfig::disabled());
    let store = backends.store(config);

    let result = store.create_document(&document("doc-2").optional_role(BackendRole::File))?;

    assert_eq!(result.status, SagaStatus::Completed);
    assert!(result.is_success());
    assert_eq!(
        result.statuses(),
        vec![
            StepStatus::Succeeded,
            StepStatus::Succeeded,
            StepStatus::Succeeded,
            StepStatus::Skipped,
        ]
    );
    assert!(backends.log.entries().iter().all(|e| !e.starts_with("file.")));
    Ok(())
}

#[test]
fn disabled_required_file_backend_stops_before_any_write() {
    let backends = Backends::new();
    let config = Backends::config().with_backend(BackendRole::File, BackendConfig::disabled());
    let store = backends.store(config);

    let err = store
        .create_document(&document("doc-3"))
        .expect_err("file role is required");

    assert!(matches!(
        err,
        OperationError::Saga(SagaError::StepResolution { .. })
    ));
    assert!(backends.log.entries().is_empty());
}

#[test]
fn nonexistent_backend_type_fails_fast() {
    let backends = Backends::new();
    let config = Backends::config()
        .with_backend(BackendRole::File, BackendConfig::new("nonexistent"));
    let store = backends.store(config);

    let err = store
        .create_document(&document("doc-4").optional_role(BackendRole::File))
        .expect_err("unknown backend type");

    let OperationError::Saga(SagaError::StepResolution { step, source }) = err else {
        panic!("expected a resolution error");
    };
    assert_eq!(step, "file-create");
    assert!(source.to_string().contains("nonexistent"));
    assert!(backends.log.entries().is_empty());
}

#[test]
fn unregistered_compensation_kind_runs_nothing() {
    let backends = Backends::new();
    let store = backends.store(Backends::config());
    let adapter: Arc<dyn BackendAdapter> = backends.vector.clone();
    let step = polystore_saga::SagaStep::new(
        "vector-reindex",
        BackendRole::Vector,
        OperationKind::Update,
        Arc::clone(&adapter),
        move || adapter.read("doc-5").map(|data| polystore_core::StepResult::read("doc-5", data)),
    )
    .with_compensation_key(polystore_core::CompensationKey::new("vector-reindex"));

    let err = store
        .orchestrator()
        .execute_steps("reindex", vec![step])
        .expect_err("no compensation for vector-reindex");

    assert!(matches!(err, SagaError::CompensationNotRegistered { .. }));
    assert!(backends.log.entries().is_empty());
}

#[test]
fn failed_update_restores_earlier_backends() -> anyhow::Result<()> {
    let backends = Backends::new();
    let store = backends.store(Backends::config());
    let original = document("doc-6");
    store.create_document(&original)?;
    backends.relational.fail_on(Operation::Update);

    let revised = DocumentWrite::new("doc-6")
        .with_part(BackendRole::Vector, json!({ "embedding": [0.0, 0.0, 1.0] }))
        .with_part(BackendRole::Graph, json!({ "label": "Archived" }))
        .with_part(BackendRole::Relational, json!({ "title": "Revised" }));
    let result = store.update_document(&revised)?;

    assert_eq!(result.status, SagaStatus::Compensated);
    assert_eq!(
        backends.vector.store().read("doc-6")?,
        original.parts[&BackendRole::Vector]
    );
    assert_eq!(
        backends.graph.store().read("doc-6")?,
        original.parts[&BackendRole::Graph]
    );
    Ok(())
}

#[test]
fn failed_delete_recreates_deleted_records() -> anyhow::Result<()> {
    let backends = Backends::new();
    let store = backends.store(Backends::config());
    let write = document("doc-7");
    store.create_document(&write)?;
    backends.file.fail_on(Operation::Read);

    let result = store.delete_document(&write)?;

    assert_eq!(result.status, SagaStatus::Compensated);
    for (adapter, role) in [
        (&backends.vector, BackendRole::Vector),
        (&backends.graph, BackendRole::Graph),
        (&backends.relational, BackendRole::Relational),
    ] {
        assert_eq!(adapter.store().read("doc-7")?, write.parts[&role]);
    }
    assert_eq!(backends.file.store().len(), 1);
    Ok(())
}

#[test]
fn rollback_keeps_records_committed_by_an_earlier_saga() -> anyhow::Result<()> {
    let backends = Backends::new();
    let store = backends.store(Backends::config());
    let committed = document("doc-10");
    store.create_document(&committed)?;

    let retry = DocumentWrite::new("doc-10")
        .with_part(BackendRole::Vector, committed.parts[&BackendRole::Vector].clone())
        .with_part(BackendRole::Relational, json!({ "title": "Someone else's report" }));
    let result = store.create_document(&retry)?;

    assert_eq!(result.status, SagaStatus::Compensated);
    assert_eq!(
        result.step("vector-create").map(|s| s.status),
        Some(StepStatus::Compensated)
    );
    assert_eq!(
        backends.vector.store().read("doc-10")?,
        committed.parts[&BackendRole::Vector]
    );
    assert!(backends.log.entries_for(Operation::Delete).is_empty());
    Ok(())
}

#[test]
fn compensation_failure_is_reported_not_raised() -> anyhow::Result<()> {
    let backends = Backends::new();
    backends.graph.fail_on(Operation::Delete);
    backends.file.fail_on(Operation::Create);
    let store = backends.store(Backends::config());

    let result = store.create_document(&document("doc-8"))?;

    assert_eq!(result.status, SagaStatus::Compensated);
    assert!(result.needs_reconciliation());
    assert_eq!(result.compensation_errors[0].step, "graph-create");
    assert_eq!(
        result.step("vector-create").map(|s| s.status),
        Some(StepStatus::Compensated)
    );
    assert!(backends.graph.store().contains("doc-8"));
    Ok(())
}

#[test]
fn explicit_steps_can_be_mixed_across_kinds() -> anyhow::Result<()> {
    let backends = Backends::new();
    let store = backends.store(Backends::config());
    backends
        .relational
        .store()
        .create(&Document::with_id("author-1", json!({ "name": "Ada" })))?;

    let result = store.execute(
        "link author",
        vec![
            StepSpec::read(BackendRole::Relational, "author-1"),
            StepSpec::create(
                BackendRole::Graph,
                Document::with_id("author-1", json!({ "label": "Person" })),
            ),
        ],
    )?;

    assert_eq!(result.status, SagaStatus::Completed);
    assert_eq!(
        result.steps[0].result.as_ref().and_then(|r| r.data.clone()),
        Some(json!({ "name": "Ada" }))
    );
    Ok(())
}

#[test]
fn missing_backend_type_is_never_defaulted() {
    let backends = Backends::new();
    let mut file = BackendConfig::new("scripted-file");
    file.backend_type = None;
    let store = backends.store(Backends::config().with_backend(BackendRole::File, file));

    let err = store
        .create_document(&document("doc-9"))
        .expect_err("file role has no backend-type");

    let OperationError::Saga(SagaError::StepResolution { source, .. }) = err else {
        panic!("expected a resolution error");
    };
    let cause = source
        .downcast_ref::<polystore_operations::StepBuildError>()
        .expect("step build error");
    assert!(matches!(
        cause,
        polystore_operations::StepBuildError::Selector(SelectorError::MissingBackendType { .. })
    ));
}
