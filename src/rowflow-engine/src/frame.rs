//! The chain-building interface.
//!
//! A [`Frame`] is a position in the graph: the root, or the last filter of a
//! chain. Booking a filter returns a new frame further down the chain;
//! booking an action returns a [`LazyResult`] bound to the frame's filters.
//! Nothing is evaluated until a result is read.

use std::sync::Arc;

use common_error::FlowResult;
use rowflow_core::{FromValue, SlotId, Value};

use crate::actions::{
    Accumulator, ActionNode, Count, Each, EachFn, Histo, HistogramModel, Max, Mean, Min, Numeric,
    Reduce, Sum, Take, TypedAction,
};
use crate::engine::EngineInner;
use crate::func::{CallbackOutput, RowFn, SlotRowFn};
use crate::nodes::FilterId;
use crate::report::CutflowReport;
use crate::result::LazyResult;

/// A position in the graph from which filters, columns and actions are
/// booked.
#[derive(Clone)]
pub struct Frame {
    engine: Arc<EngineInner>,
    upstream: Option<FilterId>,
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("upstream", &self.upstream)
            .finish_non_exhaustive()
    }
}

impl Frame {
    pub(crate) fn new(engine: Arc<EngineInner>, upstream: Option<FilterId>) -> Self {
        Self { engine, upstream }
    }

    /// Last filter of this chain, `None` at the root.
    pub fn upstream(&self) -> Option<FilterId> {
        self.upstream
    }

    // ========================================================================
    // Transformations
    // ========================================================================

    /// Keep the rows for which `predicate` returns `true`.
    ///
    /// An empty branch list uses the engine's default branches.
    pub fn filter<F, Args, Out>(&self, predicate: F, branches: &[&str]) -> FlowResult<Self>
    where
        F: RowFn<Args, Out>,
        Out: CallbackOutput<bool>,
    {
        self.filter_named(predicate, branches, "")
    }

    /// Like [`Frame::filter`], and report the filter's statistics under
    /// `name` (an empty name books an unnamed filter).
    pub fn filter_named<F, Args, Out>(&self, predicate: F, branches: &[&str], name: &str) -> FlowResult<Self>
    where
        F: RowFn<Args, Out>,
        Out: CallbackOutput<bool>,
    {
        let id = self
            .engine
            .book_filter(self.upstream, predicate, branches, name)?;
        Ok(Self::new(Arc::clone(&self.engine), Some(id)))
    }

    /// Book a derived column `name` computed by `expression`.
    ///
    /// The column is visible from every frame of the engine. Fails with
    /// `DuplicateBranchName` if a source field or another derived column
    /// already uses the name.
    pub fn define<F, Args, Out>(&self, name: &str, expression: F, branches: &[&str]) -> FlowResult<Self>
    where
        F: RowFn<Args, Out>,
        Out: CallbackOutput<Value>,
    {
        self.engine.book_column(name, expression, branches)?;
        Ok(self.clone())
    }

    // ========================================================================
    // Lazy actions
    // ========================================================================

    fn book<A, F>(&self, label: &'static str, branches: Vec<String>, factory: F) -> FlowResult<LazyResult<A::Output>>
    where
        A: Accumulator,
        F: Fn(SlotId) -> A + Send + Sync + 'static,
    {
        let (action, cell) = TypedAction::new(factory);
        self.engine
            .book_action(ActionNode::new(label, self.upstream, branches, Box::new(action)))?;
        Ok(LazyResult::new(Arc::clone(&self.engine), cell))
    }

    /// Number of rows accepted by the chain.
    pub fn count(&self) -> FlowResult<LazyResult<u64>> {
        self.book("count", Vec::new(), |_| Count::default())
    }

    /// Sum of a scalar branch over the accepted rows.
    pub fn sum<T: Numeric>(&self, branch: &str) -> FlowResult<LazyResult<T>> {
        let branch = self.engine.pick_branch(branch)?;
        self.book("sum", vec![branch], |_| Sum::<T>::default())
    }

    /// Minimum of a scalar branch; `None` if no row is accepted.
    pub fn min<T: Numeric>(&self, branch: &str) -> FlowResult<LazyResult<Option<T>>> {
        let branch = self.engine.pick_branch(branch)?;
        self.book("min", vec![branch], |_| Min::<T>::default())
    }

    /// Maximum of a scalar branch; `None` if no row is accepted.
    pub fn max<T: Numeric>(&self, branch: &str) -> FlowResult<LazyResult<Option<T>>> {
        let branch = self.engine.pick_branch(branch)?;
        self.book("max", vec![branch], |_| Max::<T>::default())
    }

    /// Mean of a numeric branch, read as `f64`; collection branches
    /// contribute every element.
    pub fn mean(&self, branch: &str) -> FlowResult<LazyResult<f64>> {
        let branch = self.engine.pick_branch(branch)?;
        self.book("mean", vec![branch], |_| Mean::default())
    }

    /// Values of a branch for every accepted row, in row order.
    pub fn take<T: FromValue + Sync>(&self, branch: &str) -> FlowResult<LazyResult<Vec<T>>> {
        let branch = self.engine.pick_branch(branch)?;
        self.book("take", vec![branch], |_| Take::<T>::default())
    }

    /// Fold a branch with `op`, starting every slot from `init`.
    pub fn reduce<T, F>(&self, op: F, branch: &str, init: T) -> FlowResult<LazyResult<T>>
    where
        T: FromValue + Clone + Sync,
        F: Fn(T, T) -> T + Send + Sync + 'static,
    {
        let branch = self.engine.pick_branch(branch)?;
        let op: Arc<dyn Fn(T, T) -> T + Send + Sync> = Arc::new(op);
        self.book("reduce", vec![branch], move |_| {
            Reduce::new(init.clone(), Arc::clone(&op))
        })
    }

    /// Fill a copy of `model` per slot with a numeric branch and merge the
    /// copies.
    pub fn histo1d<H: HistogramModel>(&self, model: H, branch: &str) -> FlowResult<LazyResult<H>> {
        let branch = self.engine.pick_branch(branch)?;
        self.book("histo1d", vec![branch], move |_| Histo::new(model.clone()))
    }

    /// Run a custom accumulator over `branches`; each slot starts from a
    /// clone of `accumulator`.
    ///
    /// An empty branch list uses all default branches.
    pub fn aggregate<A>(&self, accumulator: A, branches: &[&str]) -> FlowResult<LazyResult<A::Output>>
    where
        A: Accumulator + Clone + Sync,
    {
        let branches = if branches.is_empty() {
            self.engine.default_branches().to_vec()
        } else {
            branches.iter().map(|b| (*b).to_string()).collect()
        };
        self.book("aggregate", branches, move |_| accumulator.clone())
    }

    // ========================================================================
    // Eager actions
    // ========================================================================

    fn run_each(&self, label: &'static str, branches: Vec<String>, callback: EachFn) -> FlowResult<()> {
        self.book(label, branches, move |_| Each::new(Arc::clone(&callback)))?;
        self.engine.run()
    }

    /// Invoke `callback` for every accepted row, running the traversal
    /// immediately.
    ///
    /// With several slots the callback runs concurrently on the worker
    /// threads.
    pub fn foreach<F, Args, Out>(&self, callback: F, branches: &[&str]) -> FlowResult<()>
    where
        F: RowFn<Args, Out>,
        Out: CallbackOutput<()>,
    {
        let branches = self.engine.pick_branches(callback.arity(), branches)?;
        let each: EachFn = Arc::new(move |_slot: SlotId, names: &[String], values: &[Value]| {
            callback.call(names, values)?.into_flow()
        });
        self.run_each("foreach", branches, each)
    }

    /// Like [`Frame::foreach`], passing the slot id as first argument.
    pub fn foreach_slot<F, Args>(&self, callback: F, branches: &[&str]) -> FlowResult<()>
    where
        F: SlotRowFn<Args>,
    {
        let branches = self.engine.pick_branches(callback.arity(), branches)?;
        let each: EachFn = Arc::new(move |slot: SlotId, names: &[String], values: &[Value]| {
            callback.call(slot, names, values)
        });
        self.run_each("foreach_slot", branches, each)
    }

    // ========================================================================
    // Reporting
    // ========================================================================

    /// Statistics of the named filters between the root and this frame, in
    /// booking order; at the root, of every named filter.
    ///
    /// Triggers a traversal if none has run yet.
    pub fn report(&self) -> FlowResult<CutflowReport> {
        self.engine.report(self.upstream)
    }
}
