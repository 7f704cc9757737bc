use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use polystore_core::{
    AdapterError, BackendAdapter, BulkAdapter, Created, Document, RecordOutcome, Result,
};
use serde_json::Value;
use uuid::Uuid;

/// In-process document store.
///
/// Creating a record whose id already holds identical content succeeds without
/// change; different content is a conflict. Records are lost when the adapter
/// is dropped.
#[derive(Debug)]
pub struct MemoryAdapter {
    backend_type: String,
    records: Mutex<BTreeMap<String, Value>>,
}

impl Default for MemoryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self::with_backend_type(crate::MEMORY_BACKEND)
    }

    #[must_use]
    pub fn with_backend_type(backend_type: impl Into<String>) -> Self {
        Self {
            backend_type: backend_type.into(),
            records: Mutex::new(BTreeMap::new()),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.records().clone()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.records().contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    fn records(&self) -> MutexGuard<'_, BTreeMap<String, Value>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(records: &mut BTreeMap<String, Value>, document: &Document) -> RecordOutcome {
        let id = document
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        match records.get(&id) {
            Some(existing) if *existing == document.body => RecordOutcome::Conflict { id },
            Some(_) => RecordOutcome::Failed {
                error: AdapterError::Conflict { id },
            },
            None => {
                records.insert(id.clone(), document.body.clone());
                RecordOutcome::Written { id }
            }
        }
    }
}

impl BackendAdapter for MemoryAdapter {
    fn backend_type(&self) -> &str {
        &self.backend_type
    }

    fn create(&self, document: &Document) -> Result<Created> {
        match Self::insert(&mut self.records(), document) {
            RecordOutcome::Written { id } => Ok(Created::Written(id)),
            RecordOutcome::Conflict { id } => Ok(Created::AlreadyPresent(id)),
            RecordOutcome::Failed { error } => Err(error),
        }
    }

    fn read(&self, id: &str) -> Result<Value> {
        self.records()
            .get(id)
            .cloned()
            .ok_or_else(|| AdapterError::NotFound { id: id.to_string() })
    }

    fn update(&self, id: &str, body: &Value) -> Result<()> {
        let mut records = self.records();
        let slot = records
            .get_mut(id)
            .ok_or_else(|| AdapterError::NotFound { id: id.to_string() })?;
        *slot = body.clone();
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.records()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| AdapterError::NotFound { id: id.to_string() })
    }
}

impl BulkAdapter for MemoryAdapter {
    fn bulk_write(&self, documents: &[Document]) -> Result<Vec<RecordOutcome>> {
        let mut records = self.records();
        Ok(documents
            .iter()
            .map(|document| Self::insert(&mut records, document))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_without_id_generates_one() -> anyhow::Result<()> {
        let adapter = MemoryAdapter::new();

        let id = adapter.create(&Document::new(json!({"a": 1})))?.into_id();

        assert!(!id.is_empty());
        assert_eq!(adapter.read(&id)?, json!({"a": 1}));
        Ok(())
    }

    #[test]
    fn create_is_idempotent_for_identical_content() -> anyhow::Result<()> {
        let adapter = MemoryAdapter::new();
        let doc = Document::with_id("doc-1", json!({"a": 1}));

        let first = adapter.create(&doc)?;
        let second = adapter.create(&doc)?;

        assert_eq!(first, Created::Written("doc-1".to_string()));
        assert_eq!(second, Created::AlreadyPresent("doc-1".to_string()));
        assert_eq!(adapter.len(), 1);
        Ok(())
    }

    #[test]
    fn create_with_different_content_conflicts() -> anyhow::Result<()> {
        let adapter = MemoryAdapter::new();
        adapter.create(&Document::with_id("doc-1", json!({"a": 1})))?;

        let err = adapter
            .create(&Document::with_id("doc-1", json!({"a": 2})))
            .expect_err("should conflict");

        assert!(err.is_conflict());
        assert_eq!(adapter.read("doc-1")?, json!({"a": 1}));
        Ok(())
    }

    #[test]
    fn delete_really_removes_the_record() -> anyhow::Result<()> {
        let adapter = MemoryAdapter::new();
        adapter.create(&Document::with_id("doc-1", json!({})))?;

        adapter.delete("doc-1")?;

        assert!(!adapter.contains("doc-1"));
        assert!(adapter.delete("doc-1").expect_err("gone").is_not_found());
        Ok(())
    }

    #[test]
    fn update_requires_existing_record() {
        let adapter = MemoryAdapter::new();

        let err = adapter
            .update("missing", &json!({}))
            .expect_err("should fail");

        assert!(err.is_not_found());
    }

    #[test]
    fn bulk_write_reports_conflicts_per_record() -> anyhow::Result<()> {
        let adapter = MemoryAdapter::new();
        adapter.create(&Document::with_id("dup", json!({"v": 1})))?;
        adapter.create(&Document::with_id("clash", json!({"v": 1})))?;

        let outcomes = adapter.bulk_write(&[
            Document::with_id("new", json!({"v": 1})),
            Document::with_id("dup", json!({"v": 1})),
            Document::with_id("clash", json!({"v": 2})),
        ])?;

        assert!(matches!(&outcomes[0], RecordOutcome::Written { id } if id == "new"));
        assert!(matches!(&outcomes[1], RecordOutcome::Conflict { id } if id == "dup"));
        assert!(outcomes[2].is_failed());
        assert_eq!(adapter.len(), 3);
        Ok(())
    }
}
