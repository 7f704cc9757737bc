use std::path::{Path, PathBuf};
use std::time::Duration;

use indexmap::IndexMap;
use polystore_core::BackendRole;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_RELATIONAL_BATCH_SIZE: usize = 500;
pub const DEFAULT_DOCUMENT_BATCH_SIZE: usize = 100;

/// Connection settings for the engine behind one role.
///
/// `backend_type` may be absent in the file, but resolving an enabled role
/// without one is an error: there is no default engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BackendConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub backend_type: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Engine-specific keys not covered by the common fields, written inline
    /// in the role's table.
    #[serde(flatten)]
    pub options: toml::Table,
}

fn default_enabled() -> bool {
    true
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend_type: None,
            host: None,
            port: None,
            username: None,
            password: None,
            url: None,
            path: None,
            timeout_ms: None,
            options: toml::Table::new(),
        }
    }
}

impl BackendConfig {
    #[must_use]
    pub fn new(backend_type: impl Into<String>) -> Self {
        Self {
            backend_type: Some(backend_type.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<toml::Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    #[must_use]
    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(toml::Value::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BatchSettings {
    #[serde(default = "default_relational_batch_size")]
    pub relational_batch_size: usize,
    #[serde(default = "default_document_batch_size")]
    pub document_batch_size: usize,
}

fn default_relational_batch_size() -> usize {
    DEFAULT_RELATIONAL_BATCH_SIZE
}

fn default_document_batch_size() -> usize {
    DEFAULT_DOCUMENT_BATCH_SIZE
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            relational_batch_size: DEFAULT_RELATIONAL_BATCH_SIZE,
            document_batch_size: DEFAULT_DOCUMENT_BATCH_SIZE,
        }
    }
}

/// Declarative configuration for every role, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreConfig {
    backends: IndexMap<BackendRole, BackendConfig>,
    batch: BatchSettings,
}

impl StoreConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_backend(mut self, role: BackendRole, config: BackendConfig) -> Self {
        self.backends.insert(role, config);
        self
    }

    #[must_use]
    pub fn with_batch(mut self, batch: BatchSettings) -> Self {
        self.batch = batch;
        self
    }

    #[must_use]
    pub fn backend(&self, role: BackendRole) -> Option<&BackendConfig> {
        self.backends.get(&role)
    }

    pub fn roles(&self) -> impl Iterator<Item = BackendRole> + '_ {
        self.backends.keys().copied()
    }

    #[must_use]
    pub fn batch(&self) -> BatchSettings {
        self.batch
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawStoreConfig {
    #[serde(default)]
    backends: IndexMap<String, BackendConfig>,
    #[serde(default)]
    batch: BatchSettings,
}

fn build_store_config(raw: RawStoreConfig) -> Result<StoreConfig, ConfigError> {
    if raw.batch.relational_batch_size == 0 {
        return Err(ConfigError::InvalidBatchSize {
            field: "relational-batch-size",
        });
    }
    if raw.batch.document_batch_size == 0 {
        return Err(ConfigError::InvalidBatchSize {
            field: "document-batch-size",
        });
    }

    let mut backends = IndexMap::with_capacity(raw.backends.len());
    for (name, config) in raw.backends {
        let role = name
            .parse::<BackendRole>()
            .map_err(|_| ConfigError::UnknownRole { role: name.clone() })?;
        backends.insert(role, config);
    }

    Ok(StoreConfig {
        backends,
        batch: raw.batch,
    })
}

/// Parses a TOML configuration document.
///
/// # Errors
///
/// Returns an error if the TOML is malformed, names an unknown role, or sets a
/// batch size of zero.
pub fn parse_config(content: &str) -> Result<StoreConfig, ConfigError> {
    let raw: RawStoreConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
    build_store_config(raw)
}

/// Reads and parses a TOML configuration file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or its content is invalid.
pub fn load_config(path: &Path) -> Result<StoreConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw: RawStoreConfig =
        toml::from_str(&content).map_err(|source| ConfigError::ParseFile {
            path: path.to_path_buf(),
            source,
        })?;
    build_store_config(raw)
}
