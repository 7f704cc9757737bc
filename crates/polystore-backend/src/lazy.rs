use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use polystore_core::{BackendAdapter, BulkAdapter, Created, Document, RecordOutcome, Result};
use serde_json::Value;
use tracing::debug;

type Connector<A> = Box<dyn Fn() -> Result<A> + Send + Sync>;

/// Defers connection establishment until the first CRUD call.
///
/// A failed connect is returned as that call's error and attempted again on
/// the next call, so an unreachable backend only fails the step that uses it.
pub struct LazyAdapter<A> {
    backend_type: String,
    connect: Connector<A>,
    connected: Mutex<Option<Arc<A>>>,
}

impl<A> LazyAdapter<A> {
    pub fn new<F>(backend_type: impl Into<String>, connect: F) -> Self
    where
        F: Fn() -> Result<A> + Send + Sync + 'static,
    {
        Self {
            backend_type: backend_type.into(),
            connect: Box::new(connect),
            connected: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn connection(&self) -> Result<Arc<A>> {
        let mut slot = self.connected.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(inner) = slot.as_ref() {
            return Ok(Arc::clone(inner));
        }
        debug!(backend_type = %self.backend_type, "connecting adapter on first use");
        let inner = Arc::new((self.connect)()?);
        *slot = Some(Arc::clone(&inner));
        Ok(inner)
    }
}

impl<A> fmt::Debug for LazyAdapter<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyAdapter")
            .field("backend_type", &self.backend_type)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl<A: BackendAdapter> BackendAdapter for LazyAdapter<A> {
    fn backend_type(&self) -> &str {
        &self.backend_type
    }

    fn create(&self, document: &Document) -> Result<Created> {
        self.connection()?.create(document)
    }

    fn read(&self, id: &str) -> Result<Value> {
        self.connection()?.read(id)
    }

    fn update(&self, id: &str, body: &Value) -> Result<()> {
        self.connection()?.update(id, body)
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.connection()?.delete(id)
    }
}

impl<A: BulkAdapter> BulkAdapter for LazyAdapter<A> {
    fn bulk_write(&self, documents: &[Document]) -> Result<Vec<RecordOutcome>> {
        self.connection()?.bulk_write(documents)
    }
}
