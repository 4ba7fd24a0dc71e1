//! Testing utilities for row sources.
//!
//! Wrappers that observe how the engine drives a source: how many
//! traversals it requested and what happens when reading fails midway.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common_error::{FlowError, FlowResult};
use rowflow_core::{RowIndex, Schema, Value};

use crate::traits::{FieldAccessor, RowCursor, RowSource};

/// Source wrapper counting `partition` calls and rows delivered.
#[derive(Debug)]
pub struct CountingSource<S> {
    inner: S,
    partitions: AtomicUsize,
    rows: Arc<AtomicUsize>,
}

impl<S: RowSource> CountingSource<S> {
    /// Wrap a source.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            partitions: AtomicUsize::new(0),
            rows: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of traversals requested so far.
    pub fn partition_calls(&self) -> usize {
        self.partitions.load(Ordering::SeqCst)
    }

    /// Number of rows delivered across all traversals.
    pub fn rows_delivered(&self) -> usize {
        self.rows.load(Ordering::SeqCst)
    }
}

impl<S: RowSource> RowSource for CountingSource<S> {
    fn schema(&self) -> &Schema {
        self.inner.schema()
    }

    fn partition(&self, n_slots: usize) -> FlowResult<Vec<Box<dyn RowCursor>>> {
        self.partitions.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .inner
            .partition(n_slots)?
            .into_iter()
            .map(|inner| {
                Box::new(CountingCursor {
                    inner,
                    rows: Arc::clone(&self.rows),
                }) as Box<dyn RowCursor>
            })
            .collect())
    }

    fn num_rows(&self) -> Option<u64> {
        self.inner.num_rows()
    }
}

struct CountingCursor {
    inner: Box<dyn RowCursor>,
    rows: Arc<AtomicUsize>,
}

impl FieldAccessor for CountingCursor {
    fn get(&self, field: usize) -> FlowResult<Value> {
        self.inner.get(field)
    }
}

impl RowCursor for CountingCursor {
    fn next_row(&mut self) -> FlowResult<Option<RowIndex>> {
        let next = self.inner.next_row()?;
        if next.is_some() {
            self.rows.fetch_add(1, Ordering::SeqCst);
        }
        Ok(next)
    }
}

/// Source wrapper whose cursors fail with `SourceReadFailure` when they
/// reach row `fail_at`.
///
/// By default every traversal fails; [`FailingSource::failing_times`]
/// limits the failure to the first `n` traversals, which models a transient
/// read error.
#[derive(Debug)]
pub struct FailingSource<S> {
    inner: S,
    fail_at: RowIndex,
    max_failures: Option<usize>,
    traversals: AtomicUsize,
}

impl<S: RowSource> FailingSource<S> {
    /// Wrap a source, failing at row index `fail_at`.
    pub fn new(inner: S, fail_at: RowIndex) -> Self {
        Self {
            inner,
            fail_at,
            max_failures: None,
            traversals: AtomicUsize::new(0),
        }
    }

    /// Only fail during the first `n` traversals.
    #[must_use]
    pub fn failing_times(mut self, n: usize) -> Self {
        self.max_failures = Some(n);
        self
    }
}

impl<S: RowSource> RowSource for FailingSource<S> {
    fn schema(&self) -> &Schema {
        self.inner.schema()
    }

    fn partition(&self, n_slots: usize) -> FlowResult<Vec<Box<dyn RowCursor>>> {
        let traversal = self.traversals.fetch_add(1, Ordering::SeqCst);
        let fail_at = match self.max_failures {
            Some(limit) if traversal >= limit => None,
            _ => Some(self.fail_at),
        };
        Ok(self
            .inner
            .partition(n_slots)?
            .into_iter()
            .map(|inner| Box::new(FailingCursor { inner, fail_at }) as Box<dyn RowCursor>)
            .collect())
    }
}

struct FailingCursor {
    inner: Box<dyn RowCursor>,
    fail_at: Option<RowIndex>,
}

impl FieldAccessor for FailingCursor {
    fn get(&self, field: usize) -> FlowResult<Value> {
        self.inner.get(field)
    }
}

impl RowCursor for FailingCursor {
    fn next_row(&mut self) -> FlowResult<Option<RowIndex>> {
        match self.inner.next_row()? {
            Some(idx) if Some(idx) == self.fail_at => Err(FlowError::source_read(format!(
                "simulated read failure at row {idx}"
            ))),
            other => Ok(other),
        }
    }
}
