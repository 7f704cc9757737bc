//! Role-based backend selection.
//!
//! A logical role (vector, graph, relational, file) is bound to a concrete
//! adapter by reading the role's declared `backend-type` and looking it up in
//! a registration table. Nothing here opens a connection; adapters connect on
//! first use.

mod config;
mod error;
mod lazy;
mod registry;
mod selector;

pub use config::{
    BackendConfig, BatchSettings, DEFAULT_DOCUMENT_BATCH_SIZE, DEFAULT_RELATIONAL_BATCH_SIZE,
    StoreConfig, load_config, parse_config,
};
pub use error::{ConfigError, SelectorError};
pub use lazy::LazyAdapter;
pub use registry::{AdapterFactory, AdapterHandle, BackendRegistry};
pub use selector::{BackendSelector, Resolution};
