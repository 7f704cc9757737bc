use std::path::Path;
use std::sync::Arc;

use polystore_adapters::register_builtin;
use polystore_backend::{BackendRegistry, BackendSelector, StoreConfig, load_config};
use polystore_batch::BatchAccumulator;
use polystore_core::{BackendRole, BulkAdapter};
use polystore_saga::{SagaOrchestrator, SagaResult, StepSpec};
use tracing::{debug, info};

use crate::builder::BackendStepBuilder;
use crate::compensations::standard_compensations;
use crate::error::{OperationError, Result};
use crate::plan::DocumentWrite;

/// Entry point for consistent multi-backend writes.
///
/// Construction fixes the initialization order: adapter factories, then
/// compensations, then the orchestrator. Nothing connects to a backend until
/// a step first runs against it.
#[derive(Debug)]
pub struct Polystore {
    selector: Arc<BackendSelector>,
    orchestrator: SagaOrchestrator<BackendStepBuilder>,
}

impl Polystore {
    /// Uses the built-in `memory` and `filesystem` adapters.
    #[must_use]
    pub fn new(config: StoreConfig) -> Self {
        let mut registry = BackendRegistry::new();
        register_builtin(&mut registry);
        Self::with_registry(registry, config)
    }

    #[must_use]
    pub fn with_registry(registry: BackendRegistry, config: StoreConfig) -> Self {
        let backend_types = registry.backend_types().join(", ");
        let selector = Arc::new(BackendSelector::new(registry, config));
        let compensations = Arc::new(standard_compensations());
        info!(
            backend_types = %backend_types,
            compensations = compensations.len(),
            "initialized polystore"
        );
        let builder = BackendStepBuilder::new(Arc::clone(&selector));
        let orchestrator = SagaOrchestrator::new(builder, compensations);
        Self {
            selector,
            orchestrator,
        }
    }

    /// Loads the configuration file and uses the built-in adapters.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self> {
        Ok(Self::new(load_config(path)?))
    }

    #[must_use]
    pub fn selector(&self) -> &BackendSelector {
        &self.selector
    }

    #[must_use]
    pub fn orchestrator(&self) -> &SagaOrchestrator<BackendStepBuilder> {
        &self.orchestrator
    }

    /// Runs an arbitrary step list as one saga.
    ///
    /// # Errors
    ///
    /// Returns an error only for configuration problems found before any
    /// step runs. Backend failures are reported in the [`SagaResult`].
    pub fn execute(&self, operation: &str, steps: Vec<StepSpec>) -> Result<SagaResult> {
        Ok(self.orchestrator.execute(operation, steps)?)
    }

    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub fn create_document(&self, write: &DocumentWrite) -> Result<SagaResult> {
        self.execute("create document", write.create_steps())
    }

    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub fn update_document(&self, write: &DocumentWrite) -> Result<SagaResult> {
        self.execute("update document", write.update_steps())
    }

    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub fn delete_document(&self, write: &DocumentWrite) -> Result<SagaResult> {
        self.execute("delete document", write.delete_steps())
    }

    /// Swaps in a new configuration; running sagas keep the adapters they bound.
    pub fn reload(&self, config: StoreConfig) {
        self.selector.reload(config);
    }

    /// Accumulator for the relational role, sized from the batch settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the role cannot be resolved or its adapter has no
    /// bulk write support.
    pub fn relational_batch(&self) -> Result<BatchAccumulator> {
        let size = self.selector.config().batch().relational_batch_size;
        let adapter = self.bulk_adapter(BackendRole::Relational)?;
        Ok(BatchAccumulator::relational(adapter, size))
    }

    /// Accumulator with idempotent conflict handling for a document store
    /// serving `role`.
    ///
    /// # Errors
    ///
    /// Returns an error if the role cannot be resolved or its adapter has no
    /// bulk write support.
    pub fn document_batch(&self, role: BackendRole) -> Result<BatchAccumulator> {
        let size = self.selector.config().batch().document_batch_size;
        let adapter = self.bulk_adapter(role)?;
        Ok(BatchAccumulator::document(adapter, size))
    }

    fn bulk_adapter(&self, role: BackendRole) -> Result<Arc<dyn BulkAdapter>> {
        let handle = self.selector.resolve_required(role)?;
        debug!(role = %role, backend_type = %handle.backend_type(), "binding batch accumulator");
        handle
            .bulk()
            .cloned()
            .ok_or_else(|| OperationError::BulkUnsupported {
                role,
                backend_type: handle.backend_type().to_string(),
            })
    }
}
