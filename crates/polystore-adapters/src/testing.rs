//! Test doubles with a shared, ordered call log and switchable failures.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use polystore_backend::{AdapterHandle, BackendRegistry};
use polystore_core::{
    AdapterError, BackendAdapter, BulkAdapter, Created, Document, RecordOutcome, Result,
};
use serde_json::Value;

use crate::MemoryAdapter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    BulkWrite,
}

impl Operation {
    fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::BulkWrite => "bulk_write",
        }
    }
}

/// Ordered log shared by every adapter in a test, e.g. `vector.create doc-1`.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: String) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Entries for one operation, e.g. every `delete` across all adapters.
    #[must_use]
    pub fn entries_for(&self, operation: Operation) -> Vec<String> {
        let needle = format!(".{} ", operation.as_str());
        self.entries()
            .into_iter()
            .filter(|entry| entry.contains(&needle))
            .collect()
    }
}

/// Memory-backed adapter that logs every call and fails on demand.
#[derive(Debug)]
pub struct ScriptedAdapter {
    label: String,
    inner: MemoryAdapter,
    log: CallLog,
    failing_operations: Mutex<HashSet<Operation>>,
    failing_records: Mutex<HashSet<String>>,
    bulk_sizes: Mutex<Vec<usize>>,
}

impl ScriptedAdapter {
    #[must_use]
    pub fn new(label: impl Into<String>, log: &CallLog) -> Self {
        let label = label.into();
        Self {
            inner: MemoryAdapter::with_backend_type(label.clone()),
            label,
            log: log.clone(),
            failing_operations: Mutex::new(HashSet::new()),
            failing_records: Mutex::new(HashSet::new()),
            bulk_sizes: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn shared(label: impl Into<String>, log: &CallLog) -> Arc<Self> {
        Arc::new(Self::new(label, log))
    }

    /// Makes every call of `operation` fail until [`Self::recover`].
    pub fn fail_on(&self, operation: Operation) {
        self.failing_operations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(operation);
    }

    pub fn recover(&self, operation: Operation) {
        self.failing_operations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&operation);
    }

    /// Makes writes of the record with this id fail, in bulk and singly.
    pub fn fail_record(&self, id: impl Into<String>) {
        self.failing_records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.into());
    }

    #[must_use]
    pub fn store(&self) -> &MemoryAdapter {
        &self.inner
    }

    /// Sizes of every bulk call, including those that failed.
    #[must_use]
    pub fn bulk_sizes(&self) -> Vec<usize> {
        self.bulk_sizes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Registers this adapter under `backend_type`; every resolution shares it.
    pub fn register(self: &Arc<Self>, registry: &mut BackendRegistry, backend_type: &str) {
        let adapter = Arc::clone(self);
        registry.register(backend_type, move |_config| {
            Ok(AdapterHandle::bulk_from_arc(Arc::clone(&adapter)))
        });
    }

    fn record(&self, operation: Operation, subject: &str) -> Result<()> {
        self.log
            .push(format!("{}.{} {subject}", self.label, operation.as_str()));
        let failing = self
            .failing_operations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&operation);
        if failing {
            return Err(self.injected(operation.as_str()));
        }
        Ok(())
    }

    fn record_fails(&self, id: Option<&str>) -> bool {
        id.is_some_and(|id| {
            self.failing_records
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .contains(id)
        })
    }

    fn injected(&self, what: &str) -> AdapterError {
        AdapterError::Rejected {
            backend: self.label.clone(),
            message: format!("injected {what} failure"),
        }
    }
}

impl BackendAdapter for ScriptedAdapter {
    fn backend_type(&self) -> &str {
        &self.label
    }

    fn create(&self, document: &Document) -> Result<Created> {
        self.record(Operation::Create, document.id.as_deref().unwrap_or("-"))?;
        if self.record_fails(document.id.as_deref()) {
            return Err(self.injected("record"));
        }
        self.inner.create(document)
    }

    fn read(&self, id: &str) -> Result<Value> {
        self.record(Operation::Read, id)?;
        self.inner.read(id)
    }

    fn update(&self, id: &str, body: &Value) -> Result<()> {
        self.record(Operation::Update, id)?;
        self.inner.update(id, body)
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.record(Operation::Delete, id)?;
        self.inner.delete(id)
    }
}

impl BulkAdapter for ScriptedAdapter {
    fn bulk_write(&self, documents: &[Document]) -> Result<Vec<RecordOutcome>> {
        self.bulk_sizes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(documents.len());
        self.record(Operation::BulkWrite, &documents.len().to_string())?;

        let mut outcomes = Vec::with_capacity(documents.len());
        for document in documents {
            if self.record_fails(document.id.as_deref()) {
                outcomes.push(RecordOutcome::Failed {
                    error: self.injected("record"),
                });
                continue;
            }
            let mut written = self.inner.bulk_write(std::slice::from_ref(document))?;
            outcomes.append(&mut written);
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn calls_are_logged_in_order_across_adapters() -> anyhow::Result<()> {
        let log = CallLog::new();
        let vector = ScriptedAdapter::new("vector", &log);
        let graph = ScriptedAdapter::new("graph", &log);

        vector.create(&Document::with_id("d1", json!({})))?;
        graph.create(&Document::with_id("d1", json!({})))?;
        vector.delete("d1")?;

        assert_eq!(
            log.entries(),
            vec!["vector.create d1", "graph.create d1", "vector.delete d1"]
        );
        assert_eq!(log.entries_for(Operation::Delete), vec!["vector.delete d1"]);
        Ok(())
    }

    #[test]
    fn injected_failure_can_be_recovered() -> anyhow::Result<()> {
        let log = CallLog::new();
        let adapter = ScriptedAdapter::new("relational", &log);
        adapter.fail_on(Operation::Create);

        assert!(adapter.create(&Document::with_id("d1", json!({}))).is_err());
        assert!(!adapter.store().contains("d1"));

        adapter.recover(Operation::Create);
        adapter.create(&Document::with_id("d1", json!({})))?;
        assert!(adapter.store().contains("d1"));
        Ok(())
    }

    #[test]
    fn failing_record_is_reported_per_record_in_bulk() -> anyhow::Result<()> {
        let log = CallLog::new();
        let adapter = ScriptedAdapter::new("document", &log);
        adapter.fail_record("bad");

        let outcomes = adapter.bulk_write(&[
            Document::with_id("good", json!({})),
            Document::with_id("bad", json!({})),
        ])?;

        assert!(!outcomes[0].is_failed());
        assert!(outcomes[1].is_failed());
        assert_eq!(adapter.bulk_sizes(), vec![2]);
        Ok(())
    }
}
