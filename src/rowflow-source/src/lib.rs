//! Row source adapters for rowflow.
//!
//! The engine consumes rows exclusively through the [`RowSource`] contract:
//! a source exposes a [`Schema`](rowflow_core::Schema) and splits itself
//! into one or more disjoint [`RowCursor`]s, one stream of rows each. Field
//! values are read through [`FieldAccessor`] by field index, which the
//! engine resolves from branch names once per traversal.
//!
//! Two reference sources are provided:
//!
//! - [`MemorySource`]: rows of [`Value`](rowflow_core::Value)s held in memory
//! - [`BatchSource`]: Arrow `RecordBatch`es, optionally read from an Arrow
//!   IPC file via [`BatchSource::open_ipc`]

mod batch;
mod memory;
pub mod testing;
mod traits;

pub use batch::BatchSource;
pub use memory::MemorySource;
pub use traits::{FieldAccessor, RowCursor, RowSource};
