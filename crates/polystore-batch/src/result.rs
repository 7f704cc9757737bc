use polystore_core::AdapterError;

/// How a flush reached the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushMode {
    /// Nothing was buffered.
    Empty,
    /// One bulk call covered the whole batch.
    Bulk,
    /// The bulk call failed and records were written one at a time.
    Fallback,
}

/// A record the backend refused.
#[derive(Debug)]
pub struct RecordFailure {
    /// Caller-supplied id; `None` when the backend was to assign one.
    pub id: Option<String>,
    /// Why the write failed.
    pub error: AdapterError,
}

/// Outcome of one flush.
#[derive(Debug)]
pub struct BatchResult {
    /// How the records reached the backend.
    pub mode: FlushMode,
    /// Ids of records written by this flush.
    pub written: Vec<String>,
    /// Records the backend already held with the intended content.
    pub conflicts: Vec<String>,
    /// Records that were not written, with the reason.
    pub failures: Vec<RecordFailure>,
}

impl BatchResult {
    pub(crate) fn new(mode: FlushMode) -> Self {
        Self {
            mode,
            written: Vec::new(),
            conflicts: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Result of flushing an empty buffer.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(FlushMode::Empty)
    }

    /// True when no record failed; conflicts count as success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Records that reached durable state in this flush.
    #[must_use]
    pub fn added(&self) -> usize {
        self.written.len() + self.conflicts.len()
    }

    /// Every record this flush handed to the backend.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.added() + self.failures.len()
    }
}

/// Cumulative counters for one accumulator.
///
/// `total_fallbacks` counts flushes that fell back to per-record writes, not
/// the records replayed. `total_added` includes conflicts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Records written or already present, across all flushes.
    pub total_added: u64,
    /// Non-empty flushes.
    pub total_batches: u64,
    /// Flushes whose bulk call failed and were replayed record by record.
    pub total_fallbacks: u64,
    /// Records already present with identical content and counted as added.
    pub total_conflicts: u64,
    /// Records that could not be written.
    pub total_failed: u64,
    /// Records buffered and not yet flushed.
    pub pending: usize,
}
