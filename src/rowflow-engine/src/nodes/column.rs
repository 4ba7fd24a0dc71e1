//! Derived column nodes.

use std::fmt;

use common_error::FlowResult;
use rowflow_core::Value;

use super::Expression;
use crate::func::{CallbackOutput, RowFn};

/// A branch computed from other branches.
///
/// A derived column has no upstream filter: its value is computed whenever
/// a consumer asks for it, whatever that consumer's filters decide.
pub struct ColumnNode {
    name: String,
    branches: Vec<String>,
    expression: Expression,
}

impl ColumnNode {
    pub(crate) fn new<F, Args, Out>(name: String, expression: F, branches: Vec<String>) -> Self
    where
        F: RowFn<Args, Out>,
        Out: CallbackOutput<Value>,
    {
        Self {
            name,
            branches,
            expression: Box::new(move |names, values| expression.call(names, values)?.into_flow()),
        }
    }

    /// Branch name under which the column is visible.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Branches the computation reads.
    pub fn branches(&self) -> &[String] {
        &self.branches
    }

    pub(crate) fn compute(&self, values: &[Value]) -> FlowResult<Value> {
        (self.expression)(&self.branches, values)
    }
}

impl fmt::Debug for ColumnNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnNode")
            .field("name", &self.name)
            .field("branches", &self.branches)
            .finish_non_exhaustive()
    }
}
