use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use polystore_core::{AdapterError, BackendAdapter, Created, Document, Result};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

/// Blob store keeping one JSON file per record under `root`.
#[derive(Debug, Clone)]
pub struct FilesystemAdapter {
    root: PathBuf,
}

impl FilesystemAdapter {
    /// Opens the store, creating `root` if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)?;
        debug!(root = %root.display(), "opened filesystem store");
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &str) -> Result<PathBuf> {
        let reason = if id.is_empty() {
            Some("empty")
        } else if id.starts_with('.') {
            Some("leading dot")
        } else if id.contains(['/', '\\']) {
            Some("path separator")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(AdapterError::InvalidId {
                id: id.to_string(),
                reason,
            }),
            None => Ok(self.root.join(format!("{id}.json"))),
        }
    }

    fn load(path: &Path, id: &str) -> Result<Value> {
        match fs::read(path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(AdapterError::NotFound { id: id.to_string() })
            }
            Err(err) => Err(err.into()),
        }
    }

    fn store(path: &Path, body: &Value) -> Result<()> {
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, serde_json::to_vec_pretty(body)?)?;
        fs::rename(&staging, path)?;
        Ok(())
    }
}

impl BackendAdapter for FilesystemAdapter {
    fn backend_type(&self) -> &str {
        crate::FILESYSTEM_BACKEND
    }

    fn create(&self, document: &Document) -> Result<Created> {
        let id = document
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let path = self.path_for(&id)?;

        match Self::load(&path, &id) {
            Ok(existing) if existing == document.body => return Ok(Created::AlreadyPresent(id)),
            Ok(_) => return Err(AdapterError::Conflict { id }),
            Err(AdapterError::NotFound { .. }) => {}
            Err(err) => return Err(err),
        }

        Self::store(&path, &document.body)?;
        Ok(Created::Written(id))
    }

    fn read(&self, id: &str) -> Result<Value> {
        Self::load(&self.path_for(id)?, id)
    }

    fn update(&self, id: &str, body: &Value) -> Result<()> {
        let path = self.path_for(id)?;
        if !path.exists() {
            return Err(AdapterError::NotFound { id: id.to_string() });
        }
        Self::store(&path, body)
    }

    fn delete(&self, id: &str) -> Result<()> {
        match fs::remove_file(self.path_for(id)?) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(AdapterError::NotFound { id: id.to_string() })
            }
            Err(err) => Err(err.into()),
        }
    }
}
