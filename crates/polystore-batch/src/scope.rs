use std::ops::Deref;

use tracing::{error, warn};

use crate::accumulator::BatchAccumulator;
use crate::result::BatchResult;

/// Guard that flushes its accumulator when it goes out of scope.
///
/// Prefer [`BatchScope::finish`] to receive the final outcome. When the guard
/// is simply dropped (early return, `?`, panic) the flush still happens and
/// any failed records are logged.
pub struct BatchScope<'a> {
    accumulator: &'a BatchAccumulator,
    finished: bool,
}

impl<'a> BatchScope<'a> {
    pub(crate) fn new(accumulator: &'a BatchAccumulator) -> Self {
        Self {
            accumulator,
            finished: false,
        }
    }

    #[must_use]
    pub fn accumulator(&self) -> &'a BatchAccumulator {
        self.accumulator
    }

    /// Flushes and closes the scope.
    pub fn finish(mut self) -> BatchResult {
        self.finished = true;
        self.accumulator.flush()
    }
}

impl Deref for BatchScope<'_> {
    type Target = BatchAccumulator;

    fn deref(&self) -> &Self::Target {
        self.accumulator
    }
}

impl Drop for BatchScope<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if std::thread::panicking() {
            warn!("batch scope unwinding, flushing buffered records");
        }
        let result = self.accumulator.flush();
        for failure in &result.failures {
            error!(
                id = failure.id.as_deref().unwrap_or("-"),
                error = %failure.error,
                "record failed during scope-exit flush"
            );
        }
    }
}
