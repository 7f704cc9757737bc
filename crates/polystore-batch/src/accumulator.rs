use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use polystore_core::{AdapterError, BulkAdapter, Created, Document, RecordOutcome};
use tracing::{debug, warn};

use crate::result::{BatchResult, BatchStats, FlushMode, RecordFailure};
use crate::scope::BatchScope;

/// How a record already present with identical content is counted, whether
/// the bulk call reported it or a single-record replay did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// The record already holds the intended content: count it as added.
    Idempotent,
    /// Count it as a failed record.
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    /// Buffered records that trigger an implicit flush; at least 1.
    pub batch_size: usize,
    /// How a record already present with identical content is counted.
    pub conflict_policy: ConflictPolicy,
}

impl BatchConfig {
    /// Settings for a relational store, where a duplicate key is an error.
    #[must_use]
    pub fn relational(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            conflict_policy: ConflictPolicy::Failure,
        }
    }

    /// Settings for a document store with revision-based conflict detection.
    #[must_use]
    pub fn document(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            conflict_policy: ConflictPolicy::Idempotent,
        }
    }
}

#[derive(Default)]
struct BatchState {
    buffer: Vec<Document>,
    stats: BatchStats,
}

/// Buffers records and writes them through a bulk-capable adapter.
///
/// `add` and `flush` share one lock, so concurrent callers are serialized and
/// at most one flush runs at a time.
pub struct BatchAccumulator {
    adapter: Arc<dyn BulkAdapter>,
    config: BatchConfig,
    state: Mutex<BatchState>,
}

impl BatchAccumulator {
    #[must_use]
    pub fn new(adapter: Arc<dyn BulkAdapter>, config: BatchConfig) -> Self {
        Self {
            adapter,
            config,
            state: Mutex::new(BatchState {
                buffer: Vec::with_capacity(config.batch_size),
                stats: BatchStats::default(),
            }),
        }
    }

    #[must_use]
    pub fn relational(adapter: Arc<dyn BulkAdapter>, batch_size: usize) -> Self {
        Self::new(adapter, BatchConfig::relational(batch_size))
    }

    #[must_use]
    pub fn document(adapter: Arc<dyn BulkAdapter>, batch_size: usize) -> Self {
        Self::new(adapter, BatchConfig::document(batch_size))
    }

    #[must_use]
    pub fn config(&self) -> BatchConfig {
        self.config
    }

    /// Buffers a record and flushes once the buffer reaches `batch_size`.
    ///
    /// Returns the flush outcome when this call triggered one.
    pub fn add(&self, document: Document) -> Option<BatchResult> {
        let mut state = self.lock_state();
        state.buffer.push(document);
        if state.buffer.len() >= self.config.batch_size {
            debug!(
                count = state.buffer.len(),
                "batch size reached, flushing implicitly"
            );
            Some(self.flush_locked(&mut state))
        } else {
            None
        }
    }

    /// Buffers every record, returning the outcome of each implicit flush.
    pub fn add_all<I>(&self, documents: I) -> Vec<BatchResult>
    where
        I: IntoIterator<Item = Document>,
    {
        documents
            .into_iter()
            .filter_map(|document| self.add(document))
            .collect()
    }

    /// Writes everything buffered so far.
    pub fn flush(&self) -> BatchResult {
        let mut state = self.lock_state();
        self.flush_locked(&mut state)
    }

    #[must_use]
    pub fn stats(&self) -> BatchStats {
        let state = self.lock_state();
        BatchStats {
            pending: state.buffer.len(),
            ..state.stats
        }
    }

    /// Opens a scope that flushes on every exit path.
    #[must_use]
    pub fn scope(&self) -> BatchScope<'_> {
        BatchScope::new(self)
    }

    /// Runs `f` inside a scope and returns its value with the final flush.
    ///
    /// The final flush also runs if `f` panics.
    pub fn with_scope<R>(&self, f: impl FnOnce(&Self) -> R) -> (R, BatchResult) {
        let scope = self.scope();
        let value = f(scope.accumulator());
        (value, scope.finish())
    }

    fn lock_state(&self) -> MutexGuard<'_, BatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn flush_locked(&self, state: &mut BatchState) -> BatchResult {
        if state.buffer.is_empty() {
            return BatchResult::empty();
        }
        let documents = std::mem::replace(
            &mut state.buffer,
            Vec::with_capacity(self.config.batch_size),
        );

        let result = match self.adapter.bulk_write(&documents) {
            Ok(outcomes) if outcomes.len() == documents.len() => {
                state.stats.total_batches += 1;
                self.collect_bulk(&documents, outcomes)
            }
            Ok(outcomes) => {
                warn!(
                    backend_type = %self.adapter.backend_type(),
                    expected = documents.len(),
                    received = outcomes.len(),
                    "bulk write returned mismatched outcomes, falling back to single writes"
                );
                state.stats.total_fallbacks += 1;
                self.replay_singly(&documents)
            }
            Err(error) => {
                warn!(
                    backend_type = %self.adapter.backend_type(),
                    count = documents.len(),
                    error = %error,
                    "bulk write failed, falling back to single writes"
                );
                state.stats.total_fallbacks += 1;
                self.replay_singly(&documents)
            }
        };

        state.stats.total_added += result.added() as u64;
        state.stats.total_conflicts += result.conflicts.len() as u64;
        state.stats.total_failed += result.failures.len() as u64;
        debug!(
            backend_type = %self.adapter.backend_type(),
            mode = ?result.mode,
            written = result.written.len(),
            conflicts = result.conflicts.len(),
            failed = result.failures.len(),
            "flushed batch"
        );
        result
    }

    fn collect_bulk(&self, documents: &[Document], outcomes: Vec<RecordOutcome>) -> BatchResult {
        let mut result = BatchResult::new(FlushMode::Bulk);
        for (document, outcome) in documents.iter().zip(outcomes) {
            match outcome {
                RecordOutcome::Written { id } => result.written.push(id),
                RecordOutcome::Conflict { id } => self.record_conflict(&mut result, id),
                RecordOutcome::Failed { error } => result.failures.push(RecordFailure {
                    id: document.id.clone(),
                    error,
                }),
            }
        }
        result
    }

    fn replay_singly(&self, documents: &[Document]) -> BatchResult {
        let mut result = BatchResult::new(FlushMode::Fallback);
        for document in documents {
            match self.adapter.create(document) {
                Ok(Created::Written(id)) => result.written.push(id),
                Ok(Created::AlreadyPresent(id)) => self.record_conflict(&mut result, id),
                Err(error) => result.failures.push(RecordFailure {
                    id: document.id.clone(),
                    error,
                }),
            }
        }
        result
    }

    /// A record already present with identical content, on either path.
    fn record_conflict(&self, result: &mut BatchResult, id: String) {
        match self.config.conflict_policy {
            ConflictPolicy::Idempotent => result.conflicts.push(id),
            ConflictPolicy::Failure => result.failures.push(RecordFailure {
                id: Some(id.clone()),
                error: AdapterError::Conflict { id },
            }),
        }
    }
}

impl fmt::Debug for BatchAccumulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchAccumulator")
            .field("backend_type", &self.adapter.backend_type())
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}
