//! Booked graph nodes.
//!
//! Nodes live in arenas owned by the engine and reference one another
//! through the typed ids defined here. Per-slot state (caches, counters) is
//! kept outside the nodes, in [`crate::graph::SlotState`], so that a node
//! itself is immutable once booked and can be shared by every slot.

pub mod column;
pub mod filter;

use std::fmt;

use common_error::FlowResult;
use rowflow_core::Value;

pub use column::ColumnNode;
pub use filter::{FilterCounters, FilterNode};

/// Identifier of a booked filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilterId(pub(crate) usize);

/// Identifier of a booked derived column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnId(pub(crate) usize);

impl FilterId {
    /// Position of the filter in booking order.
    pub fn index(self) -> usize {
        self.0
    }
}

impl ColumnId {
    /// Position of the column in booking order.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FilterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "filter#{}", self.0)
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "column#{}", self.0)
    }
}

/// Where a branch value comes from once names are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchRef {
    /// Field of the row source, by schema position.
    Field(usize),
    /// Booked derived column.
    Column(ColumnId),
}

/// Type-erased predicate of a filter.
pub(crate) type Predicate = Box<dyn Fn(&[String], &[Value]) -> FlowResult<bool> + Send + Sync>;

/// Type-erased computation of a derived column.
pub(crate) type Expression = Box<dyn Fn(&[String], &[Value]) -> FlowResult<Value> + Send + Sync>;
