pub mod adapter;
pub mod error;
pub mod types;

pub use adapter::{BackendAdapter, BulkAdapter, Created, RecordOutcome};
pub use error::{AdapterError, Result};
pub use types::*;
