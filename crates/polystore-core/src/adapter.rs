use serde_json::Value;

use crate::Result;
use crate::error::AdapterError;
use crate::types::Document;

/// Uniform CRUD surface every storage engine exposes to the core.
///
/// Adapters own their connections and pooling; the core only calls these
/// methods and never reaches for an engine's client library directly.
pub trait BackendAdapter: Send + Sync {
    /// The `backend-type` string this adapter was registered under.
    fn backend_type(&self) -> &str;

    /// Writes a new record, or matches one that already holds identical
    /// content under the same id.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Conflict`] if the id holds different content,
    /// or another error if the record cannot be written.
    fn create(&self, document: &Document) -> Result<Created>;

    /// # Errors
    ///
    /// Returns [`AdapterError::NotFound`] if no record has this id.
    fn read(&self, id: &str) -> Result<Value>;

    /// # Errors
    ///
    /// Returns [`AdapterError::NotFound`] if no record has this id.
    fn update(&self, id: &str, body: &Value) -> Result<()>;

    /// # Errors
    ///
    /// Returns [`AdapterError::NotFound`] if no record has this id.
    fn delete(&self, id: &str) -> Result<()>;
}

/// What a single create did to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Created {
    /// A new record was written under this id.
    Written(String),
    /// The id already held identical content; nothing was written.
    AlreadyPresent(String),
}

impl Created {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Written(id) | Self::AlreadyPresent(id) => id,
        }
    }

    #[must_use]
    pub fn into_id(self) -> String {
        match self {
            Self::Written(id) | Self::AlreadyPresent(id) => id,
        }
    }

    #[must_use]
    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written(_))
    }
}

/// Per-record outcome of a bulk write.
#[derive(Debug)]
pub enum RecordOutcome {
    Written { id: String },
    /// The record already exists with the intended content.
    Conflict { id: String },
    Failed { error: AdapterError },
}

impl RecordOutcome {
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Adapters that can write many records in one round trip.
pub trait BulkAdapter: BackendAdapter {
    /// Writes all records and reports one outcome per record, in input order.
    ///
    /// # Errors
    ///
    /// Returns an error if the bulk call failed as a whole, in which case no
    /// per-record outcome is known.
    fn bulk_write(&self, documents: &[Document]) -> Result<Vec<RecordOutcome>>;
}

impl<T: BackendAdapter + ?Sized> BackendAdapter for std::sync::Arc<T> {
    fn backend_type(&self) -> &str {
        (**self).backend_type()
    }

    fn create(&self, document: &Document) -> Result<Created> {
        (**self).create(document)
    }

    fn read(&self, id: &str) -> Result<Value> {
        (**self).read(id)
    }

    fn update(&self, id: &str, body: &Value) -> Result<()> {
        (**self).update(id, body)
    }

    fn delete(&self, id: &str) -> Result<()> {
        (**self).delete(id)
    }
}

impl<T: BulkAdapter + ?Sized> BulkAdapter for std::sync::Arc<T> {
    fn bulk_write(&self, documents: &[Document]) -> Result<Vec<RecordOutcome>> {
        (**self).bulk_write(documents)
    }
}
