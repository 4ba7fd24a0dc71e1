//! Terminal nodes of the graph.
//!
//! Every action folds the rows accepted by its filter chain into a per-slot
//! partial, an [`Accumulator`]. After the traversal the partials of all
//! slots are merged and the final value is published to the action's
//! [`LazyResult`](crate::LazyResult). Side-effecting actions (`foreach`)
//! use the same machinery with an accumulator whose fold invokes the user
//! callback and whose output is `()`.

pub mod builtin;
pub mod histogram;

use std::any::Any;
use std::fmt;
use std::sync::{Arc, OnceLock};

use common_error::{FlowError, FlowResult};
use rowflow_core::{SlotId, Value};

use crate::func::Row;
use crate::nodes::FilterId;

pub use builtin::{Count, Each, Histo, Max, Mean, Min, Numeric, Reduce, Sum, Take};
pub use histogram::{Histogram1D, HistogramModel};

/// Per-slot partial result of an action.
///
/// Each slot starts from its own fresh accumulator; once every slot has
/// finished, the partials are merged pairwise and `finish` produces the
/// value handed to the caller.
pub trait Accumulator: Send + 'static {
    /// Final result type.
    type Output: Send + Sync + 'static;

    /// Fold one accepted row.
    fn fold(&mut self, row: &Row<'_>) -> FlowResult<()>;

    /// Absorb the partial of another slot.
    fn merge(&mut self, other: Self) -> FlowResult<()>
    where
        Self: Sized;

    /// Produce the final value.
    fn finish(self) -> FlowResult<Self::Output>
    where
        Self: Sized;
}

/// Type-erased per-slot partial.
pub(crate) trait Partial: Send {
    fn fold(&mut self, row: &Row<'_>) -> FlowResult<()>;

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

impl<A: Accumulator> Partial for A {
    fn fold(&mut self, row: &Row<'_>) -> FlowResult<()> {
        Accumulator::fold(self, row)
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

/// Deferred publication of a merged result.
pub(crate) type Publish = Box<dyn FnOnce() + Send>;

/// Type-erased behaviour of a booked action.
pub(crate) trait ActionKind: Send + Sync {
    fn create_partial(&self, slot: SlotId) -> Box<dyn Partial>;

    fn finalize(&self, partials: Vec<Box<dyn Partial>>) -> FlowResult<Publish>;
}

/// An action whose partials are accumulators of type `A`, publishing into a
/// shared cell.
pub(crate) struct TypedAction<A: Accumulator> {
    factory: Box<dyn Fn(SlotId) -> A + Send + Sync>,
    cell: Arc<OnceLock<A::Output>>,
}

impl<A: Accumulator> TypedAction<A> {
    pub(crate) fn new<F>(factory: F) -> (Self, Arc<OnceLock<A::Output>>)
    where
        F: Fn(SlotId) -> A + Send + Sync + 'static,
    {
        let cell = Arc::new(OnceLock::new());
        let action = Self {
            factory: Box::new(factory),
            cell: Arc::clone(&cell),
        };
        (action, cell)
    }
}

fn downcast<A: Accumulator>(partial: Box<dyn Partial>) -> FlowResult<A> {
    partial
        .into_any()
        .downcast::<A>()
        .map(|boxed| *boxed)
        .map_err(|_| FlowError::internal("action partial has an unexpected type"))
}

impl<A: Accumulator> ActionKind for TypedAction<A> {
    fn create_partial(&self, slot: SlotId) -> Box<dyn Partial> {
        Box::new((self.factory)(slot))
    }

    fn finalize(&self, partials: Vec<Box<dyn Partial>>) -> FlowResult<Publish> {
        let mut partials = partials.into_iter();
        let mut merged = match partials.next() {
            Some(first) => downcast::<A>(first)?,
            None => (self.factory)(0),
        };
        for partial in partials {
            merged.merge(downcast::<A>(partial)?)?;
        }
        let output = merged.finish()?;
        let cell = Arc::clone(&self.cell);
        Ok(Box::new(move || {
            // A cell is only ever published by the run that finalized it.
            let _ = cell.set(output);
        }))
    }
}

/// A booked action.
pub(crate) struct ActionNode {
    label: &'static str,
    upstream: Option<FilterId>,
    branches: Vec<String>,
    kind: Box<dyn ActionKind>,
}

impl ActionNode {
    pub(crate) fn new(
        label: &'static str,
        upstream: Option<FilterId>,
        branches: Vec<String>,
        kind: Box<dyn ActionKind>,
    ) -> Self {
        Self {
            label,
            upstream,
            branches,
            kind,
        }
    }

    pub(crate) fn label(&self) -> &'static str {
        self.label
    }

    pub(crate) fn upstream(&self) -> Option<FilterId> {
        self.upstream
    }

    pub(crate) fn branches(&self) -> &[String] {
        &self.branches
    }

    pub(crate) fn create_partial(&self, slot: SlotId) -> Box<dyn Partial> {
        self.kind.create_partial(slot)
    }

    pub(crate) fn finalize(&self, partials: Vec<Box<dyn Partial>>) -> FlowResult<Publish> {
        self.kind.finalize(partials)
    }
}

impl fmt::Debug for ActionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionNode")
            .field("label", &self.label)
            .field("upstream", &self.upstream)
            .field("branches", &self.branches)
            .finish_non_exhaustive()
    }
}

/// Callback invoked inline by side-effecting actions.
pub(crate) type EachFn = Arc<dyn Fn(SlotId, &[String], &[Value]) -> FlowResult<()> + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    fn fold_all(partial: &mut dyn Partial, slot: SlotId, rows: &[(u64, i64)]) {
        let branches = vec!["x".to_string()];
        for &(index, x) in rows {
            let values = [Value::Int64(x)];
            partial
                .fold(&Row::new(slot, index, &branches, &values))
                .unwrap();
        }
    }

    #[test]
    fn test_typed_action_publishes_after_finalize() {
        let (action, cell) = TypedAction::new(|_| Sum::<i64>::default());
        let mut p0 = action.create_partial(0);
        let mut p1 = action.create_partial(1);
        fold_all(p0.as_mut(), 0, &[(0, 1), (1, 2)]);
        fold_all(p1.as_mut(), 1, &[(2, 10)]);

        let publish = action.finalize(vec![p0, p1]).unwrap();
        assert!(cell.get().is_none());
        publish();
        assert_eq!(cell.get(), Some(&13));
    }

    #[test]
    fn test_finalize_rejects_foreign_partial() {
        let (action, _cell) = TypedAction::new(|_| Sum::<i64>::default());
        let (other, _) = TypedAction::new(|_| Count::default());
        let err = action
            .finalize(vec![other.create_partial(0)])
            .err()
            .unwrap();
        assert!(matches!(err, FlowError::InternalError(_)));
    }
}
