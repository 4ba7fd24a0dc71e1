//! Metrics collection for graph traversals.

#![allow(clippy::significant_drop_tightening)] // Guards must stay alive for their scope

use std::fmt::Write;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Metrics for a single traversal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunMetrics {
    /// Rows processed by each slot, indexed by slot id.
    pub rows_per_slot: Vec<u64>,
    /// Number of partitions handed out by the source.
    pub partitions: usize,
    /// Number of actions finalized.
    pub actions: usize,
    /// Wall-clock time of the traversal and merge.
    pub elapsed: Duration,
}

impl RunMetrics {
    /// Create empty metrics for `n_slots` slots.
    #[must_use]
    pub fn new(n_slots: usize) -> Self {
        Self {
            rows_per_slot: vec![0; n_slots],
            ..Self::default()
        }
    }

    /// Total rows processed across slots.
    pub fn rows_processed(&self) -> u64 {
        self.rows_per_slot.iter().sum()
    }

    /// Number of slots that processed at least one row.
    pub fn slots_used(&self) -> usize {
        self.rows_per_slot.iter().filter(|&&n| n > 0).count()
    }

    /// Rows per second.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.rows_processed() as f64 / secs
        }
    }
}

impl std::fmt::Display for RunMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "rows={}, slots={}/{}, partitions={}, actions={}, time={:?}",
            self.rows_processed(),
            self.slots_used(),
            self.rows_per_slot.len(),
            self.partitions,
            self.actions,
            self.elapsed
        )
    }
}

/// Sink collecting the metrics of every traversal an engine performs.
#[derive(Debug, Clone, Default)]
pub struct MetricsSink {
    runs: Arc<RwLock<Vec<RunMetrics>>>,
}

impl MetricsSink {
    /// Create a new metrics sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the metrics of a finished traversal.
    pub fn record(&self, metrics: RunMetrics) {
        self.runs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(metrics);
    }

    /// Number of traversals recorded.
    pub fn traversals(&self) -> usize {
        self.runs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Metrics of the most recent traversal.
    pub fn last(&self) -> Option<RunMetrics> {
        self.runs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// All recorded traversals, oldest first.
    pub fn all(&self) -> Vec<RunMetrics> {
        self.runs.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Clear all metrics.
    pub fn clear(&self) {
        self.runs.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Total rows processed across all traversals.
    pub fn total_rows(&self) -> u64 {
        self.runs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(RunMetrics::rows_processed)
            .sum()
    }

    /// Total time spent in traversals.
    pub fn total_time(&self) -> Duration {
        self.runs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|m| m.elapsed)
            .sum()
    }

    /// One line per traversal.
    pub fn format_summary(&self) -> String {
        let runs = self.runs.read().unwrap_or_else(PoisonError::into_inner);
        let mut output = String::new();

        for (i, m) in runs.iter().enumerate() {
            let _ = writeln!(output, "run {i}: {m}");
        }

        if output.is_empty() {
            output.push_str("No traversal recorded.\n");
        }

        output
    }
}

/// Timer for measuring traversal time.
#[derive(Debug)]
pub struct ExecutionTimer {
    start: Instant,
}

impl ExecutionTimer {
    /// Start a new timer.
    #[must_use]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed time without stopping.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop and return elapsed time.
    #[must_use]
    pub fn stop(self) -> Duration {
        self.start.elapsed()
    }
}

impl Default for ExecutionTimer {
    fn default() -> Self {
        Self::start()
    }
}
