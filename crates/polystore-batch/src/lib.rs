//! Batch accumulation for bulk-capable backends.
//!
//! Records are buffered and written with one bulk call once the buffer is
//! full, when [`BatchAccumulator::flush`] is called, or when a [`BatchScope`]
//! ends. If the bulk call fails as a whole, the buffered records are replayed
//! one by one and individual failures are reported, never dropped.
//!
//! Buffered records live only in memory: records not yet flushed are lost if
//! the process dies.

mod accumulator;
mod result;
mod scope;

pub use accumulator::{BatchAccumulator, BatchConfig, ConflictPolicy};
pub use result::{BatchResult, BatchStats, FlushMode, RecordFailure};
pub use scope::BatchScope;
