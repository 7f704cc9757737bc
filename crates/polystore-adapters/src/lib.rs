//! Adapters that need no engine SDK.
//!
//! `memory` is a document store with revision-style conflict detection and a
//! bulk endpoint; `filesystem` stores one JSON file per record under a root
//! directory. Adapters for networked engines are registered by the embedding
//! application through the same [`BackendRegistry`].

mod filesystem;
mod memory;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

use polystore_backend::{AdapterHandle, BackendRegistry, LazyAdapter};
use polystore_core::AdapterError;

pub use filesystem::FilesystemAdapter;
pub use memory::MemoryAdapter;

pub const MEMORY_BACKEND: &str = "memory";
pub const FILESYSTEM_BACKEND: &str = "filesystem";

/// Registers the built-in adapter factories.
///
/// `filesystem` requires `path`; the directory is created on first use, not
/// here.
pub fn register_builtin(registry: &mut BackendRegistry) {
    registry.register(MEMORY_BACKEND, |_config| {
        Ok(AdapterHandle::with_bulk(MemoryAdapter::new()))
    });

    registry.register(FILESYSTEM_BACKEND, |config| {
        let root = config.path.clone().ok_or_else(|| AdapterError::Config {
            backend: FILESYSTEM_BACKEND.to_string(),
            message: "missing 'path'".to_string(),
        })?;
        Ok(AdapterHandle::new(LazyAdapter::new(
            FILESYSTEM_BACKEND,
            move || FilesystemAdapter::open(&root),
        )))
    });
}
