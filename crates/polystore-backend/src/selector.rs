use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use polystore_core::BackendRole;
use tracing::{debug, info};

use crate::config::{BackendConfig, StoreConfig};
use crate::error::SelectorError;
use crate::registry::{AdapterHandle, BackendRegistry};

/// Outcome of resolving a role against the active configuration.
#[derive(Debug, Clone)]
pub enum Resolution {
    Active(AdapterHandle),
    /// The role is configured with `enabled = false`.
    Disabled,
    /// The role does not appear in the configuration at all.
    NotConfigured,
}

impl Resolution {
    #[must_use]
    pub fn into_active(self) -> Option<AdapterHandle> {
        match self {
            Self::Active(handle) => Some(handle),
            Self::Disabled | Self::NotConfigured => None,
        }
    }
}

struct CachedAdapter {
    backend_type: String,
    handle: AdapterHandle,
}

struct SelectorState {
    config: Arc<StoreConfig>,
    cache: HashMap<BackendRole, CachedAdapter>,
}

/// Resolves logical roles to concrete adapters.
///
/// Exactly one adapter is cached per role. Reloading the configuration evicts
/// the cached adapter of every role whose settings changed; the adapter itself
/// is never mutated in place.
pub struct BackendSelector {
    registry: BackendRegistry,
    state: Mutex<SelectorState>,
}

impl BackendSelector {
    #[must_use]
    pub fn new(registry: BackendRegistry, config: StoreConfig) -> Self {
        Self {
            registry,
            state: Mutex::new(SelectorState {
                config: Arc::new(config),
                cache: HashMap::new(),
            }),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    #[must_use]
    pub fn config(&self) -> Arc<StoreConfig> {
        Arc::clone(&self.lock_state().config)
    }

    /// Builds an adapter for an explicit backend type, bypassing the cache.
    ///
    /// # Errors
    ///
    /// Returns [`SelectorError::UnknownBackendType`] when `backend_type` has no
    /// registered factory. No factory runs and no connection is attempted in
    /// that case.
    pub fn resolve_with(
        &self,
        role: BackendRole,
        backend_type: &str,
        config: &BackendConfig,
    ) -> Result<AdapterHandle, SelectorError> {
        self.registry.construct(role, backend_type, config)
    }

    /// Resolves `role` using the active configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the role is enabled without a `backend-type`, or if
    /// the declared type has no registered factory or its factory fails.
    pub fn resolve(&self, role: BackendRole) -> Result<Resolution, SelectorError> {
        let mut state = self.lock_state();

        let Some(config) = state.config.backend(role).cloned() else {
            return Ok(Resolution::NotConfigured);
        };
        if !config.enabled {
            return Ok(Resolution::Disabled);
        }
        let backend_type = config
            .backend_type
            .clone()
            .ok_or(SelectorError::MissingBackendType { role })?;

        if let Some(cached) = state
            .cache
            .get(&role)
            .filter(|cached| cached.backend_type == backend_type)
        {
            return Ok(Resolution::Active(cached.handle.clone()));
        }

        let handle = self.registry.construct(role, &backend_type, &config)?;
        debug!(role = %role, backend_type = %backend_type, "resolved backend adapter");
        state.cache.insert(
            role,
            CachedAdapter {
                backend_type,
                handle: handle.clone(),
            },
        );
        Ok(Resolution::Active(handle))
    }

    /// Resolves `role`, treating a disabled or missing role as an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the role is disabled, not configured, or cannot be
    /// resolved.
    pub fn resolve_required(&self, role: BackendRole) -> Result<AdapterHandle, SelectorError> {
        match self.resolve(role)? {
            Resolution::Active(handle) => Ok(handle),
            Resolution::Disabled => Err(SelectorError::RoleDisabled { role }),
            Resolution::NotConfigured => Err(SelectorError::RoleNotConfigured { role }),
        }
    }

    /// Backend type of the adapter currently cached for `role`, if any.
    #[must_use]
    pub fn active_backend_type(&self, role: BackendRole) -> Option<String> {
        self.lock_state()
            .cache
            .get(&role)
            .map(|cached| cached.backend_type.clone())
    }

    /// Swaps in a new configuration.
    ///
    /// Roles whose settings are unchanged keep their cached adapter; every
    /// other role is re-resolved on next use.
    pub fn reload(&self, config: StoreConfig) {
        let mut state = self.lock_state();
        let previous = Arc::clone(&state.config);

        let cached = state.cache.len();
        state
            .cache
            .retain(|role, _| previous.backend(*role) == config.backend(*role));
        let evicted = cached - state.cache.len();

        state.config = Arc::new(config);
        info!(evicted, "reloaded backend configuration");
    }

    fn lock_state(&self) -> MutexGuard<'_, SelectorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for BackendSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendSelector")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
