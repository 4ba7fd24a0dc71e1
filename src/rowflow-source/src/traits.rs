//! Row source contract consumed by the engine.

use std::fmt::Debug;

use common_error::FlowResult;
use rowflow_core::{RowIndex, Schema, Value};

/// Read access to the fields of the current row.
pub trait FieldAccessor {
    /// Read the value of the field at `field` (schema position) for the
    /// current row.
    fn get(&self, field: usize) -> FlowResult<Value>;
}

/// A stream of rows from one partition of a source.
///
/// Rows are yielded in non-decreasing index order. Two cursors obtained from
/// the same `partition` call never yield the same row index.
pub trait RowCursor: FieldAccessor + Send {
    /// Advance to the next row, returning its index, or `None` once the
    /// partition is exhausted.
    fn next_row(&mut self) -> FlowResult<Option<RowIndex>>;
}

/// A source of rows the engine can traverse.
pub trait RowSource: Send + Sync + Debug {
    /// Schema of the branches physically present in the source.
    fn schema(&self) -> &Schema;

    /// Split the source into disjoint cursors for `n_slots` workers.
    ///
    /// With `n_slots == 1` a single cursor covering every row is returned.
    /// Otherwise the source may return any number of partitions (for
    /// example one per storage cluster); the engine distributes them over
    /// its workers.
    fn partition(&self, n_slots: usize) -> FlowResult<Vec<Box<dyn RowCursor>>>;

    /// Total number of rows, when known up front.
    fn num_rows(&self) -> Option<u64> {
        None
    }
}
