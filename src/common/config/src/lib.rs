//! Configuration management for rowflow.
//!
//! Concurrency is configured explicitly: an engine receives an
//! [`ExecutionConfig`] at construction and never consults global state.

use common_error::{FlowError, FlowResult};
use serde::{Deserialize, Serialize};

/// Top-level rowflow configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowflowConfig {
    /// Execution configuration.
    pub execution: ExecutionConfig,
}

/// How rows are spread over worker slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PartitioningStrategy {
    /// Single sequential traversal on the calling thread (slot 0).
    #[default]
    Sequential,
    /// Worker pool of `n_slots` threads, each owning one slot.
    Threaded,
}

/// Execution configuration for a single engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Number of worker slots.
    pub n_slots: usize,
    /// Partitioning strategy.
    pub partitioning: PartitioningStrategy,
    /// Enable per-run metrics collection.
    pub collect_metrics: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            n_slots: 1,
            partitioning: PartitioningStrategy::Sequential,
            collect_metrics: true,
        }
    }
}

impl ExecutionConfig {
    /// Sequential configuration with a single slot.
    pub fn sequential() -> Self {
        Self::default()
    }

    /// Threaded configuration with `n_slots` worker slots.
    pub fn threaded(n_slots: usize) -> Self {
        Self {
            n_slots,
            partitioning: PartitioningStrategy::Threaded,
            ..Self::default()
        }
    }

    /// Set the number of slots.
    #[must_use]
    pub fn with_slots(mut self, n_slots: usize) -> Self {
        self.n_slots = n_slots;
        self
    }

    /// Set the partitioning strategy.
    #[must_use]
    pub fn with_partitioning(mut self, partitioning: PartitioningStrategy) -> Self {
        self.partitioning = partitioning;
        self
    }

    /// Enable or disable metrics collection.
    #[must_use]
    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.collect_metrics = enabled;
        self
    }

    /// Number of slots the engine actually allocates.
    ///
    /// A sequential traversal always uses exactly one slot.
    pub fn effective_slots(&self) -> usize {
        match self.partitioning {
            PartitioningStrategy::Sequential => 1,
            PartitioningStrategy::Threaded => self.n_slots,
        }
    }

    /// Whether the traversal runs on a worker pool.
    pub fn is_threaded(&self) -> bool {
        self.effective_slots() > 1
    }

    /// Validate the configuration.
    pub fn validate(&self) -> FlowResult<()> {
        if self.n_slots == 0 {
            return Err(FlowError::config("n_slots must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_slots() {
        assert_eq!(ExecutionConfig::sequential().effective_slots(), 1);
        assert_eq!(ExecutionConfig::threaded(4).effective_slots(), 4);
        assert_eq!(
            ExecutionConfig::threaded(4)
                .with_partitioning(PartitioningStrategy::Sequential)
                .effective_slots(),
            1
        );
    }

    #[test]
    fn test_validate_zero_slots() {
        let config = ExecutionConfig::threaded(0);
        assert!(matches!(config.validate(), Err(FlowError::ConfigError(_))));
        assert!(ExecutionConfig::threaded(2).validate().is_ok());
    }
}
