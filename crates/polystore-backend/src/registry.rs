use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use polystore_core::{AdapterError, BackendAdapter, BackendRole, BulkAdapter};
use tracing::debug;

use crate::config::BackendConfig;
use crate::error::SelectorError;

/// A constructed adapter, with its bulk surface when the engine has one.
#[derive(Clone)]
pub struct AdapterHandle {
    adapter: Arc<dyn BackendAdapter>,
    bulk: Option<Arc<dyn BulkAdapter>>,
}

impl AdapterHandle {
    #[must_use]
    pub fn new<A: BackendAdapter + 'static>(adapter: A) -> Self {
        Self::from_arc(Arc::new(adapter))
    }

    #[must_use]
    pub fn from_arc<A: BackendAdapter + 'static>(adapter: Arc<A>) -> Self {
        Self {
            adapter,
            bulk: None,
        }
    }

    #[must_use]
    pub fn with_bulk<A: BulkAdapter + 'static>(adapter: A) -> Self {
        Self::bulk_from_arc(Arc::new(adapter))
    }

    #[must_use]
    pub fn bulk_from_arc<A: BulkAdapter + 'static>(adapter: Arc<A>) -> Self {
        Self {
            adapter: Arc::clone(&adapter) as Arc<dyn BackendAdapter>,
            bulk: Some(adapter),
        }
    }

    #[must_use]
    pub fn adapter(&self) -> &Arc<dyn BackendAdapter> {
        &self.adapter
    }

    #[must_use]
    pub fn bulk(&self) -> Option<&Arc<dyn BulkAdapter>> {
        self.bulk.as_ref()
    }

    #[must_use]
    pub fn backend_type(&self) -> &str {
        self.adapter.backend_type()
    }
}

impl fmt::Debug for AdapterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterHandle")
            .field("backend_type", &self.backend_type())
            .field("bulk", &self.bulk.is_some())
            .finish()
    }
}

pub type AdapterFactory =
    Arc<dyn Fn(&BackendConfig) -> Result<AdapterHandle, AdapterError> + Send + Sync>;

/// Static table from `backend-type` string to adapter constructor.
///
/// Populated once at startup. Re-registering a type replaces its factory.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    factories: BTreeMap<String, AdapterFactory>,
}

impl BackendRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, backend_type: impl Into<String>, factory: F)
    where
        F: Fn(&BackendConfig) -> Result<AdapterHandle, AdapterError> + Send + Sync + 'static,
    {
        let backend_type = backend_type.into();
        debug!(backend_type = %backend_type, "registered adapter factory");
        self.factories.insert(backend_type, Arc::new(factory));
    }

    #[must_use]
    pub fn contains(&self, backend_type: &str) -> bool {
        self.factories.contains_key(backend_type)
    }

    #[must_use]
    pub fn backend_types(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Looks up the factory for `backend_type` and builds an adapter.
    ///
    /// # Errors
    ///
    /// Returns [`SelectorError::UnknownBackendType`] if nothing is registered
    /// under `backend_type`, or [`SelectorError::Construction`] if the factory
    /// rejects the configuration.
    pub fn construct(
        &self,
        role: BackendRole,
        backend_type: &str,
        config: &BackendConfig,
    ) -> Result<AdapterHandle, SelectorError> {
        let factory =
            self.factories
                .get(backend_type)
                .ok_or_else(|| SelectorError::UnknownBackendType {
                    role,
                    backend_type: backend_type.to_string(),
                    available: self.backend_types().join(", "),
                })?;

        factory(config).map_err(|source| SelectorError::Construction {
            role,
            backend_type: backend_type.to_string(),
            source,
        })
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backend_types", &self.backend_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polystore_core::{Created, Document, RecordOutcome};
    use serde_json::Value;

    struct NullAdapter;

    impl BackendAdapter for NullAdapter {
        fn backend_type(&self) -> &str {
            "null"
        }

        fn create(&self, _document: &Document) -> polystore_core::Result<Created> {
            Ok(Created::Written("null-id".to_string()))
        }

        fn read(&self, id: &str) -> polystore_core::Result<Value> {
            Err(AdapterError::NotFound { id: id.to_string() })
        }

        fn update(&self, id: &str, _body: &Value) -> polystore_core::Result<()> {
            Err(AdapterError::NotFound { id: id.to_string() })
        }

        fn delete(&self, id: &str) -> polystore_core::Result<()> {
            Err(AdapterError::NotFound { id: id.to_string() })
        }
    }

    impl BulkAdapter for NullAdapter {
        fn bulk_write(&self, documents: &[Document]) -> polystore_core::Result<Vec<RecordOutcome>> {
            Ok(documents
                .iter()
                .map(|_| RecordOutcome::Written {
                    id: "null-id".to_string(),
                })
                .collect())
        }
    }

    #[test]
    fn construct_uses_registered_factory() -> anyhow::Result<()> {
        let mut registry = BackendRegistry::new();
        registry.register("null", |_config| Ok(AdapterHandle::new(NullAdapter)));

        let handle = registry.construct(BackendRole::Vector, "null", &BackendConfig::new("null"))?;

        assert_eq!(handle.backend_type(), "null");
        assert!(handle.bulk().is_none());
        Ok(())
    }

    #[test]
    fn bulk_handle_exposes_both_surfaces() {
        let handle = AdapterHandle::with_bulk(NullAdapter);

        assert!(handle.bulk().is_some());
        assert_eq!(handle.adapter().backend_type(), "null");
    }

    #[test]
    fn unknown_backend_type_fails_without_calling_any_factory() {
        let mut registry = BackendRegistry::new();
        registry.register("null", |_config| -> Result<AdapterHandle, AdapterError> {
            panic!("factory must not be called")
        });

        let err = registry
            .construct(
                BackendRole::File,
                "nonexistent",
                &BackendConfig::new("nonexistent"),
            )
            .expect_err("should fail");

        assert!(matches!(
            err,
            SelectorError::UnknownBackendType { ref backend_type, ref available, .. }
                if backend_type == "nonexistent" && available == "null"
        ));
    }

    #[test]
    fn factory_rejection_is_wrapped_with_role_and_type() {
        let mut registry = BackendRegistry::new();
        registry.register("null", |_config| {
            Err(AdapterError::Config {
                backend: "null".to_string(),
                message: "missing url".to_string(),
            })
        });

        let err = registry
            .construct(BackendRole::Graph, "null", &BackendConfig::new("null"))
            .expect_err("should fail");

        assert!(matches!(
            err,
            SelectorError::Construction { role: BackendRole::Graph, .. }
        ));
    }

    #[test]
    fn reregistering_replaces_factory() -> anyhow::Result<()> {
        let mut registry = BackendRegistry::new();
        registry.register("null", |_config| {
            Err(AdapterError::Config {
                backend: "null".to_string(),
                message: "old".to_string(),
            })
        });
        registry.register("null", |_config| Ok(AdapterHandle::new(NullAdapter)));

        let handle = registry.construct(BackendRole::Vector, "null", &BackendConfig::new("null"))?;

        assert_eq!(handle.backend_type(), "null");
        assert_eq!(registry.backend_types(), vec!["null"]);
        Ok(())
    }
}
