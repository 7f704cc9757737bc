//! Configuration loading, hot reload and lazy connection through the facade.

use std::fs;

use polystore_backend::{BackendConfig, StoreConfig};
use polystore_core::BackendRole;
use polystore_operations::{DocumentWrite, Polystore};
use polystore_saga::{SagaStatus, StepStatus};
use serde_json::json;
use tempfile::TempDir;

fn config_with_file(file: BackendConfig) -> StoreConfig {
    StoreConfig::new()
        .with_backend(BackendRole::Relational, BackendConfig::new("memory"))
        .with_backend(BackendRole::File, file)
}

fn write(id: &str) -> DocumentWrite {
    DocumentWrite::new(id)
        .with_part(BackendRole::Relational, json!({ "title": "Invoice" }))
        .with_part(BackendRole::File, json!({ "bytes": 2048 }))
}

#[test]
fn loads_store_from_toml_file() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let files = dir.path().join("files");
    let config_path = dir.path().join("polystore.toml");
    fs::write(
        &config_path,
        format!(
            r#"
[batch]
relational-batch-size = 250

[backends.relational]
backend-type = "memory"

[backends.file]
backend-type = "filesystem"
path = "{}"
"#,
            files.display()
        ),
    )?;

    let store = Polystore::from_path(&config_path)?;
    let result = store.create_document(&write("inv-1"))?;

    assert_eq!(result.status, SagaStatus::Completed);
    assert!(files.join("inv-1.json").exists());
    assert_eq!(store.relational_batch()?.config().batch_size, 250);
    Ok(())
}

#[test]
fn missing_config_file_is_an_error() {
    let dir = TempDir::new().expect("tempdir");

    let outcome = Polystore::from_path(&dir.path().join("absent.toml"));

    assert!(outcome.is_err());
}

#[test]
fn reload_switches_the_file_backend_for_the_next_saga() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let store = Polystore::new(config_with_file(BackendConfig::new("memory")));

    store.create_document(&write("inv-1"))?;
    assert_eq!(
        store.selector().active_backend_type(BackendRole::File).as_deref(),
        Some("memory")
    );

    store.reload(config_with_file(
        BackendConfig::new("filesystem").with_path(dir.path()),
    ));
    let result = store.create_document(&write("inv-2"))?;

    assert_eq!(result.status, SagaStatus::Completed);
    assert_eq!(
        store.selector().active_backend_type(BackendRole::File).as_deref(),
        Some("filesystem")
    );
    assert!(dir.path().join("inv-2.json").exists());
    assert!(!dir.path().join("inv-1.json").exists());
    Ok(())
}

#[test]
fn reload_keeps_unchanged_roles_bound_to_the_same_adapter() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let store = Polystore::new(config_with_file(BackendConfig::new("memory")));
    store.create_document(&write("inv-1"))?;

    store.reload(config_with_file(
        BackendConfig::new("filesystem").with_path(dir.path()),
    ));
    // The relational memory adapter survived the reload, so the record is a
    // conflict with different content rather than a fresh insert.
    let again = DocumentWrite::new("inv-1")
        .with_part(BackendRole::Relational, json!({ "title": "Changed" }));
    let result = store.create_document(&again)?;

    assert_eq!(result.status, SagaStatus::Failed);
    Ok(())
}

#[test]
fn unreachable_backend_fails_at_its_step_not_at_construction() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, b"not a directory")?;
    let store = Polystore::new(config_with_file(
        BackendConfig::new("filesystem").with_path(blocker.join("files")),
    ));

    let result = store.create_document(&write("inv-3"))?;

    assert_eq!(result.status, SagaStatus::Compensated);
    assert_eq!(
        result.statuses(),
        vec![StepStatus::Compensated, StepStatus::Failed]
    );
    Ok(())
}
