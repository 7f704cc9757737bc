use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use polystore_core::{AdapterError, BackendAdapter, CompensationKey, StepResult};

use crate::error::SagaError;

/// Undoes a succeeded step, given the adapter it ran against and its result.
pub type CompensationFn =
    Arc<dyn Fn(&dyn BackendAdapter, &StepResult) -> Result<(), AdapterError> + Send + Sync>;

/// A compensation together with a human-readable description for audit output.
#[derive(Clone)]
pub struct RegisteredCompensation {
    description: String,
    action: CompensationFn,
}

impl RegisteredCompensation {
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// # Errors
    ///
    /// Propagates the error returned by the compensation.
    pub fn run(
        &self,
        adapter: &dyn BackendAdapter,
        result: &StepResult,
    ) -> Result<(), AdapterError> {
        (self.action)(adapter, result)
    }
}

impl fmt::Debug for RegisteredCompensation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredCompensation")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Maps compensation keys to the action that undoes them.
///
/// Populated during initialization, then shared read-only behind an `Arc`.
#[derive(Clone, Default)]
pub struct CompensationRegistry {
    entries: HashMap<CompensationKey, RegisteredCompensation>,
}

impl CompensationRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a compensation, replacing any previous one for `key`.
    pub fn register<F>(&mut self, key: CompensationKey, description: impl Into<String>, action: F)
    where
        F: Fn(&dyn BackendAdapter, &StepResult) -> Result<(), AdapterError> + Send + Sync + 'static,
    {
        self.entries.insert(
            key,
            RegisteredCompensation {
                description: description.into(),
                action: Arc::new(action),
            },
        );
    }

    /// # Errors
    ///
    /// Returns [`SagaError::CompensationNotRegistered`] when nothing is registered for `key`.
    pub fn resolve(&self, key: &CompensationKey) -> Result<&RegisteredCompensation, SagaError> {
        self.entries
            .get(key)
            .ok_or_else(|| SagaError::CompensationNotRegistered { key: key.clone() })
    }

    #[must_use]
    pub fn contains(&self, key: &CompensationKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Registered keys in sorted order.
    #[must_use]
    pub fn keys(&self) -> Vec<&CompensationKey> {
        let mut keys: Vec<_> = self.entries.keys().collect();
        keys.sort();
        keys
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for CompensationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompensationRegistry")
            .field("keys", &self.keys())
            .finish()
    }
}
