/*!
 * Teardown Statistics
 */

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;

/// Outcome of a manager teardown
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeardownStats {
    /// Stragglers released by the manager (failed releases included)
    pub resources_disposed: usize,
    pub errors_encountered: usize,
    /// Region bytes handed back
    pub bytes_released: usize,
    pub duration_micros: u64,
    pub by_kind: HashMap<String, usize>,
}

impl TeardownStats {
    /// Run `f` and stamp the elapsed time on its stats
    #[inline]
    pub(crate) fn with_timing<F>(f: F) -> Self
    where
        F: FnOnce() -> Self,
    {
        let start = Instant::now();
        let mut stats = f();
        stats.duration_micros = start.elapsed().as_micros() as u64;
        stats
    }

    pub(crate) fn record(&mut self, kind: &str, failed: bool) {
        self.resources_disposed += 1;
        if failed {
            self.errors_encountered += 1;
        }
        *self.by_kind.entry(kind.to_string()).or_insert(0) += 1;
    }
}
