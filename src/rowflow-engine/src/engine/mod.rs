//! The graph engine: booking, the single traversal and result publication.
//!
//! An [`Engine`] owns a row source and every node booked through its
//! [`Frame`]s. Nothing is evaluated while nodes are booked. The first time a
//! result is requested (or an eager action is booked) the engine runs one
//! traversal of the source that computes every booked action together:
//!
//! ```text
//! NotRun ──run()──▶ Running ──ok──▶ HasRun ──book action──▶ run() again
//!                      │
//!                      └──error──▶ previous phase (actions stay booked)
//! ```
//!
//! Booked actions are dropped once their results are published; filters
//! and derived columns stay booked so that later chains can reuse them.

mod slots;
mod traversal;

use std::sync::{Arc, Mutex, MutexGuard};

use common_config::ExecutionConfig;
use common_error::{FlowError, FlowResult};
use log::{debug, warn};
use rowflow_core::Schema;
use rowflow_source::RowSource;
use serde::{Deserialize, Serialize};

use crate::actions::ActionNode;
use crate::frame::Frame;
use crate::func::{CallbackOutput, RowFn};
use crate::graph::{BoundGraph, Graph, Outcome};
use crate::metrics::{ExecutionTimer, MetricsSink, RunMetrics};
use crate::nodes::{ColumnNode, FilterCounters, FilterId, FilterNode};
use crate::report::{CutflowReport, FilterStats};

/// Lifecycle of an engine's traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunPhase {
    /// No traversal has completed yet.
    NotRun,
    /// A traversal is in progress.
    Running,
    /// At least one traversal completed.
    HasRun,
}

#[derive(Debug)]
struct GraphState {
    graph: Graph,
    phase: RunPhase,
    counters: Vec<FilterCounters>,
}

pub(crate) struct EngineInner {
    source: Arc<dyn RowSource>,
    config: ExecutionConfig,
    default_branches: Vec<String>,
    state: Mutex<GraphState>,
    metrics: MetricsSink,
}

impl std::fmt::Debug for EngineInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineInner")
            .field("source", &self.source)
            .field("config", &self.config)
            .field("default_branches", &self.default_branches)
            .finish_non_exhaustive()
    }
}

impl EngineInner {
    fn lock_state(&self) -> FlowResult<MutexGuard<'_, GraphState>> {
        self.state
            .lock()
            .map_err(|_| FlowError::internal("engine state lock poisoned"))
    }

    // ========================================================================
    // Booking
    // ========================================================================

    /// Branch list for a callback taking `arity` arguments.
    ///
    /// An explicit list must match the arity; an empty list falls back to
    /// the default branches when those match instead.
    pub(crate) fn pick_branches(&self, arity: usize, branches: &[&str]) -> FlowResult<Vec<String>> {
        if branches.len() == arity {
            return Ok(branches.iter().map(|b| (*b).to_string()).collect());
        }
        if branches.is_empty() && self.default_branches.len() == arity {
            return Ok(self.default_branches.clone());
        }
        let found = if branches.is_empty() {
            self.default_branches.len()
        } else {
            branches.len()
        };
        Err(FlowError::arity_mismatch(arity, found))
    }

    pub(crate) fn default_branches(&self) -> &[String] {
        &self.default_branches
    }

    /// Branch for a single-column action; empty means the first default.
    pub(crate) fn pick_branch(&self, branch: &str) -> FlowResult<String> {
        if !branch.is_empty() {
            return Ok(branch.to_string());
        }
        self.default_branches
            .first()
            .cloned()
            .ok_or_else(|| FlowError::arity_mismatch(1, 0))
    }

    pub(crate) fn book_filter<F, Args, Out>(
        &self,
        upstream: Option<FilterId>,
        predicate: F,
        branches: &[&str],
        name: &str,
    ) -> FlowResult<FilterId>
    where
        F: RowFn<Args, Out>,
        Out: CallbackOutput<bool>,
    {
        let branches = self.pick_branches(predicate.arity(), branches)?;
        let name = (!name.is_empty()).then(|| name.to_string());
        let node = FilterNode::new(predicate, branches, name, upstream);
        Ok(self.lock_state()?.graph.book_filter(node))
    }

    pub(crate) fn book_column<F, Args, Out>(&self, name: &str, expression: F, branches: &[&str]) -> FlowResult<()>
    where
        F: RowFn<Args, Out>,
        Out: CallbackOutput<rowflow_core::Value>,
    {
        let branches = self.pick_branches(expression.arity(), branches)?;
        let node = ColumnNode::new(name.to_string(), expression, branches);
        self.lock_state()?
            .graph
            .book_column(self.source.schema(), node)
            .map(|_| ())
    }

    pub(crate) fn book_action(&self, node: ActionNode) -> FlowResult<()> {
        self.lock_state()?.graph.book_action(node);
        Ok(())
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    /// Run one traversal computing every booked action.
    ///
    /// A no-op once the engine has run and nothing new was booked. On error
    /// the phase is restored and the booked actions are kept, so the call
    /// may be repeated.
    pub(crate) fn run(&self) -> FlowResult<()> {
        let mut state = self.lock_state()?;
        if state.phase == RunPhase::HasRun && state.graph.pending_actions() == 0 {
            debug!("no actions booked since the last traversal; skipping run");
            return Ok(());
        }

        let previous = state.phase;
        state.phase = RunPhase::Running;
        let actions = state.graph.pending_actions();
        let timer = ExecutionTimer::start();
        let result = self.traverse(&state.graph);

        match result {
            Ok((outcome, partitions)) => {
                let Outcome {
                    publishers,
                    counters,
                    rows_per_slot,
                } = outcome;
                for publish in publishers {
                    publish();
                }
                state.graph.clear_actions();
                // Statistics describe the latest traversal only.
                state.counters = counters;
                state.phase = RunPhase::HasRun;

                let metrics = RunMetrics {
                    rows_per_slot,
                    partitions,
                    actions,
                    elapsed: timer.stop(),
                };
                debug!("traversal finished: {metrics}");
                if self.config.collect_metrics {
                    self.metrics.record(metrics);
                }
                Ok(())
            }
            Err(e) => {
                state.phase = previous;
                warn!("traversal aborted, {actions} actions remain booked: {e}");
                Err(e)
            }
        }
    }

    fn traverse(&self, graph: &Graph) -> FlowResult<(Outcome, usize)> {
        let bound = BoundGraph::bind(graph, self.source.schema())?;
        let n_slots = self.config.effective_slots();
        let cursors = self.source.partition(n_slots)?;
        let partitions = cursors.len();
        debug!(
            "starting traversal of {:?}: {partitions} partitions, {n_slots} slots",
            self.source.schema().name
        );

        let slots = if n_slots > 1 {
            traversal::threaded(&bound, cursors, n_slots)?
        } else {
            traversal::sequential(&bound, cursors)?
        };
        Ok((bound.finalize(slots)?, partitions))
    }

    // ========================================================================
    // Reporting
    // ========================================================================

    /// Named-filter statistics for the chain ending at `tip`, or for every
    /// named filter when `tip` is the root.
    pub(crate) fn report(&self, tip: Option<FilterId>) -> FlowResult<CutflowReport> {
        if self.lock_state()?.phase == RunPhase::NotRun {
            self.run()?;
        }

        let state = self.lock_state()?;
        let ids: Vec<FilterId> = match tip {
            None => state.graph.named_filters().to_vec(),
            Some(_) => state.graph.chain(tip),
        };
        let entries = ids
            .into_iter()
            .filter_map(|id| {
                let node = state.graph.filter(id)?;
                let name = node.name()?;
                let counters = state.counters.get(id.0).copied().unwrap_or_default();
                Some(FilterStats {
                    name: name.to_string(),
                    passed: counters.accepted,
                    total: counters.total(),
                })
            })
            .collect();

        let report = CutflowReport::new(entries);
        report.log();
        Ok(report)
    }
}

// ============================================================================
// Public handle
// ============================================================================

/// Handle to a lazily evaluated dataflow graph over one row source.
///
/// Cloning is cheap; every clone refers to the same graph.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use rowflow_engine::{Engine, EngineConfig};
/// use rowflow_source::MemorySource;
///
/// # fn main() -> common_error::FlowResult<()> {
/// let source = MemorySource::from_i64("events", "x", vec![1, 5, 9, 2, 10]);
/// let engine = Engine::new(Arc::new(source), EngineConfig::default())?;
/// let count = engine.root().filter(|x: i64| x > 4, &["x"])?.count()?;
/// assert_eq!(*count.get()?, 3);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    /// Create an engine over `source`.
    pub fn new(source: Arc<dyn RowSource>, config: ExecutionConfig) -> FlowResult<Self> {
        Self::with_default_branches(source, config, &[])
    }

    /// Create an engine whose callbacks may omit their branch lists.
    pub fn with_default_branches(
        source: Arc<dyn RowSource>,
        config: ExecutionConfig,
        default_branches: &[&str],
    ) -> FlowResult<Self> {
        config.validate()?;
        debug!(
            "creating engine over {:?} with {} slots",
            source.schema().name,
            config.effective_slots()
        );
        Ok(Self {
            inner: Arc::new(EngineInner {
                source,
                config,
                default_branches: default_branches.iter().map(|b| (*b).to_string()).collect(),
                state: Mutex::new(GraphState {
                    graph: Graph::default(),
                    phase: RunPhase::NotRun,
                    counters: Vec::new(),
                }),
                metrics: MetricsSink::new(),
            }),
        })
    }

    /// The root of every chain: no filter applied.
    pub fn root(&self) -> Frame {
        Frame::new(Arc::clone(&self.inner), None)
    }

    /// Run the traversal now, computing every booked action.
    pub fn run(&self) -> FlowResult<()> {
        self.inner.run()
    }

    /// Statistics of every named filter, in booking order.
    ///
    /// Triggers a traversal if none has run yet.
    pub fn report(&self) -> FlowResult<CutflowReport> {
        self.inner.report(None)
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> FlowResult<RunPhase> {
        Ok(self.inner.lock_state()?.phase)
    }

    /// Whether at least one traversal completed.
    pub fn has_run(&self) -> bool {
        matches!(self.phase(), Ok(RunPhase::HasRun))
    }

    /// Number of actions waiting for the next traversal.
    pub fn pending_actions(&self) -> FlowResult<usize> {
        Ok(self.inner.lock_state()?.graph.pending_actions())
    }

    /// Number of booked filters, named or not.
    pub fn filter_count(&self) -> FlowResult<usize> {
        Ok(self.inner.lock_state()?.graph.filter_count())
    }

    /// Number of worker slots used by traversals.
    pub fn n_slots(&self) -> usize {
        self.inner.config.effective_slots()
    }

    /// Execution configuration.
    pub fn config(&self) -> &ExecutionConfig {
        &self.inner.config
    }

    /// Branches used by callbacks booked without an explicit list.
    pub fn default_branches(&self) -> &[String] {
        &self.inner.default_branches
    }

    /// Schema of the underlying source.
    pub fn schema(&self) -> &Schema {
        self.inner.source.schema()
    }

    /// Metrics of every traversal run so far.
    pub fn metrics(&self) -> &MetricsSink {
        &self.inner.metrics
    }
}
