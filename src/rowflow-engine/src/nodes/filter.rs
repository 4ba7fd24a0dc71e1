//! Filter nodes and their cutflow counters.

use std::fmt;

use common_error::FlowResult;
use rowflow_core::Value;
use serde::{Deserialize, Serialize};

use super::{FilterId, Predicate};
use crate::func::{CallbackOutput, RowFn};

/// A predicate over a list of branches, chained after an optional upstream
/// filter.
pub struct FilterNode {
    name: Option<String>,
    upstream: Option<FilterId>,
    branches: Vec<String>,
    predicate: Predicate,
}

impl FilterNode {
    pub(crate) fn new<F, Args, Out>(
        predicate: F,
        branches: Vec<String>,
        name: Option<String>,
        upstream: Option<FilterId>,
    ) -> Self
    where
        F: RowFn<Args, Out>,
        Out: CallbackOutput<bool>,
    {
        Self {
            name,
            upstream,
            branches,
            predicate: Box::new(move |names, values| predicate.call(names, values)?.into_flow()),
        }
    }

    /// Whether this filter takes part in cutflow reports.
    pub fn has_name(&self) -> bool {
        self.name.is_some()
    }

    /// Report name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Filter evaluated before this one.
    pub fn upstream(&self) -> Option<FilterId> {
        self.upstream
    }

    /// Branches read by the predicate.
    pub fn branches(&self) -> &[String] {
        &self.branches
    }

    pub(crate) fn invoke(&self, values: &[Value]) -> FlowResult<bool> {
        (self.predicate)(&self.branches, values)
    }
}

impl fmt::Debug for FilterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterNode")
            .field("name", &self.name)
            .field("upstream", &self.upstream)
            .field("branches", &self.branches)
            .finish_non_exhaustive()
    }
}

/// Accept/reject counts of a named filter.
///
/// Only rows that reached the filter are counted: rows rejected upstream
/// never show up in either counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCounters {
    /// Rows for which the predicate returned `true`.
    pub accepted: u64,
    /// Rows for which the predicate returned `false`.
    pub rejected: u64,
}

impl FilterCounters {
    /// Count one evaluation.
    pub fn record(&mut self, passed: bool) {
        if passed {
            self.accepted += 1;
        } else {
            self.rejected += 1;
        }
    }

    /// Add the counts of another slot.
    pub fn merge(&mut self, other: &Self) {
        self.accepted += other.accepted;
        self.rejected += other.rejected;
    }

    /// Rows that reached the filter.
    pub fn total(&self) -> u64 {
        self.accepted + self.rejected
    }
}
