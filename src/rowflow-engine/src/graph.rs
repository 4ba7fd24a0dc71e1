//! Node arena, branch binding and per-row evaluation.
//!
//! [`Graph`] owns every booked node. At the start of a traversal it is bound
//! against the source schema into a [`BoundGraph`], which resolves every
//! branch name once and then evaluates rows for one [`SlotState`] at a time.

use std::collections::HashMap;

use common_error::{FlowError, FlowResult};
use log::debug;
use rowflow_core::{RowIndex, Schema, SlotId, Value};
use rowflow_source::FieldAccessor;

use crate::actions::{ActionNode, Partial, Publish};
use crate::cache::SlotCache;
use crate::func::Row;
use crate::nodes::{BranchRef, ColumnId, ColumnNode, FilterCounters, FilterId, FilterNode};

// ============================================================================
// Node arena
// ============================================================================

/// Every node booked on an engine.
#[derive(Debug, Default)]
pub(crate) struct Graph {
    filters: Vec<FilterNode>,
    columns: Vec<ColumnNode>,
    actions: Vec<ActionNode>,
    column_names: HashMap<String, ColumnId>,
    named: Vec<FilterId>,
}

impl Graph {
    pub(crate) fn book_filter(&mut self, node: FilterNode) -> FilterId {
        let id = FilterId(self.filters.len());
        if node.has_name() {
            self.named.push(id);
        }
        debug!(
            "booked {id} ({}) on {:?}",
            node.name().unwrap_or("unnamed"),
            node.branches()
        );
        self.filters.push(node);
        id
    }

    pub(crate) fn book_column(&mut self, schema: &Schema, node: ColumnNode) -> FlowResult<ColumnId> {
        let name = node.name();
        if schema.contains(name) || self.column_names.contains_key(name) {
            return Err(FlowError::duplicate_branch(name));
        }
        let id = ColumnId(self.columns.len());
        debug!("booked {id} {name:?} on {:?}", node.branches());
        self.column_names.insert(name.to_string(), id);
        self.columns.push(node);
        Ok(id)
    }

    pub(crate) fn book_action(&mut self, node: ActionNode) {
        debug!(
            "booked action {} on {:?} after {:?}",
            node.label(),
            node.branches(),
            node.upstream()
        );
        self.actions.push(node);
    }

    pub(crate) fn filter(&self, id: FilterId) -> Option<&FilterNode> {
        self.filters.get(id.0)
    }

    pub(crate) fn filter_count(&self) -> usize {
        self.filters.len()
    }

    pub(crate) fn named_filters(&self) -> &[FilterId] {
        &self.named
    }

    pub(crate) fn pending_actions(&self) -> usize {
        self.actions.len()
    }

    pub(crate) fn clear_actions(&mut self) {
        self.actions.clear();
    }

    /// Filters on the path from `tip` back to the root, root first.
    pub(crate) fn chain(&self, tip: Option<FilterId>) -> Vec<FilterId> {
        let mut path = Vec::new();
        let mut cursor = tip;
        while let Some(id) = cursor {
            path.push(id);
            cursor = self.filters.get(id.0).and_then(FilterNode::upstream);
        }
        path.reverse();
        path
    }
}

// ============================================================================
// Per-slot state
// ============================================================================

#[derive(Debug, Default)]
pub(crate) struct FilterSlot {
    cache: SlotCache<bool>,
    counters: FilterCounters,
}

/// Everything one slot mutates during a traversal.
pub(crate) struct SlotState {
    slot: SlotId,
    filters: Vec<FilterSlot>,
    columns: Vec<SlotCache<Value>>,
    partials: Vec<Box<dyn Partial>>,
    rows: u64,
}

impl SlotState {
    pub(crate) fn rows(&self) -> u64 {
        self.rows
    }
}

impl std::fmt::Debug for SlotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotState")
            .field("slot", &self.slot)
            .field("rows", &self.rows)
            .finish_non_exhaustive()
    }
}

/// Merged outcome of a traversal, ready to be committed.
pub(crate) struct Outcome {
    pub publishers: Vec<Publish>,
    pub counters: Vec<FilterCounters>,
    pub rows_per_slot: Vec<u64>,
}

// ============================================================================
// Bound graph
// ============================================================================

/// A graph whose branch names are resolved against a schema.
pub(crate) struct BoundGraph<'g> {
    graph: &'g Graph,
    filter_inputs: Vec<Vec<BranchRef>>,
    column_inputs: Vec<Vec<BranchRef>>,
    action_inputs: Vec<Vec<BranchRef>>,
}

impl<'g> BoundGraph<'g> {
    /// Resolve every branch name of every booked node.
    ///
    /// A derived column may only read columns booked before it, which keeps
    /// the column graph acyclic.
    pub(crate) fn bind(graph: &'g Graph, schema: &Schema) -> FlowResult<Self> {
        let resolve = |names: &[String], limit: usize| -> FlowResult<Vec<BranchRef>> {
            names
                .iter()
                .map(|name| match graph.column_names.get(name) {
                    Some(&id) if id.0 < limit => Ok(BranchRef::Column(id)),
                    Some(_) => Err(FlowError::unknown_branch(name.as_str())),
                    None => schema
                        .index_of(name)
                        .map(BranchRef::Field)
                        .ok_or_else(|| FlowError::unknown_branch(name.as_str())),
                })
                .collect()
        };

        let all = graph.columns.len();
        let filter_inputs = graph
            .filters
            .iter()
            .map(|f| resolve(f.branches(), all))
            .collect::<FlowResult<_>>()?;
        let column_inputs = graph
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| resolve(c.branches(), i))
            .collect::<FlowResult<_>>()?;
        let action_inputs = graph
            .actions
            .iter()
            .map(|a| resolve(a.branches(), all))
            .collect::<FlowResult<_>>()?;

        Ok(Self {
            graph,
            filter_inputs,
            column_inputs,
            action_inputs,
        })
    }

    /// Allocate fresh caches, counters and partials for `slot`.
    pub(crate) fn create_slot(&self, slot: SlotId) -> SlotState {
        SlotState {
            slot,
            filters: self.graph.filters.iter().map(|_| FilterSlot::default()).collect(),
            columns: self.graph.columns.iter().map(|_| SlotCache::new()).collect(),
            partials: self
                .graph
                .actions
                .iter()
                .map(|a| a.create_partial(slot))
                .collect(),
            rows: 0,
        }
    }

    /// Process one row: run every action, then check every named filter so
    /// cutflow counters stay current even without attached actions.
    pub(crate) fn process_row<A>(&self, st: &mut SlotState, row: RowIndex, fields: &A) -> FlowResult<()>
    where
        A: FieldAccessor + ?Sized,
    {
        for action in 0..self.graph.actions.len() {
            self.run_action(st, action, row, fields)?;
        }
        for &id in &self.graph.named {
            self.check_filter(st, id, row, fields)?;
        }
        st.rows += 1;
        Ok(())
    }

    fn run_action<A>(&self, st: &mut SlotState, action: usize, row: RowIndex, fields: &A) -> FlowResult<()>
    where
        A: FieldAccessor + ?Sized,
    {
        let node = &self.graph.actions[action];
        if let Some(upstream) = node.upstream() {
            if !self.check_filter(st, upstream, row, fields)? {
                return Ok(());
            }
        }
        let values = self.read_inputs(st, &self.action_inputs[action], row, fields)?;
        let view = Row::new(st.slot, row, node.branches(), &values);
        st.partials[action].fold(&view)
    }

    /// Result of filter `id` for `row`, evaluated at most once per row.
    pub(crate) fn check_filter<A>(
        &self,
        st: &mut SlotState,
        id: FilterId,
        row: RowIndex,
        fields: &A,
    ) -> FlowResult<bool>
    where
        A: FieldAccessor + ?Sized,
    {
        let mut cache = std::mem::take(&mut st.filters[id.0].cache);
        let result = cache
            .get_or_compute(row, || self.evaluate_filter(st, id, row, fields))
            .copied();
        st.filters[id.0].cache = cache;
        result
    }

    fn evaluate_filter<A>(&self, st: &mut SlotState, id: FilterId, row: RowIndex, fields: &A) -> FlowResult<bool>
    where
        A: FieldAccessor + ?Sized,
    {
        let node = &self.graph.filters[id.0];
        if let Some(upstream) = node.upstream() {
            if !self.check_filter(st, upstream, row, fields)? {
                return Ok(false);
            }
        }
        let values = self.read_inputs(st, &self.filter_inputs[id.0], row, fields)?;
        let passed = node.invoke(&values)?;
        if node.has_name() {
            st.filters[id.0].counters.record(passed);
        }
        Ok(passed)
    }

    /// Value of derived column `id` for `row`, computed at most once per row.
    pub(crate) fn column_value<A>(
        &self,
        st: &mut SlotState,
        id: ColumnId,
        row: RowIndex,
        fields: &A,
    ) -> FlowResult<Value>
    where
        A: FieldAccessor + ?Sized,
    {
        let mut cache = std::mem::take(&mut st.columns[id.0]);
        let result = cache
            .get_or_compute(row, || {
                let values = self.read_inputs(st, &self.column_inputs[id.0], row, fields)?;
                self.graph.columns[id.0].compute(&values)
            })
            .cloned();
        st.columns[id.0] = cache;
        result
    }

    fn read_inputs<A>(
        &self,
        st: &mut SlotState,
        inputs: &[BranchRef],
        row: RowIndex,
        fields: &A,
    ) -> FlowResult<Vec<Value>>
    where
        A: FieldAccessor + ?Sized,
    {
        inputs
            .iter()
            .map(|input| match *input {
                BranchRef::Field(index) => fields.get(index),
                BranchRef::Column(id) => self.column_value(st, id, row, fields),
            })
            .collect()
    }

    /// Merge the states of all slots and finalize every action.
    ///
    /// Nothing is published here: the returned publishers are only invoked
    /// once every action has finalized successfully.
    pub(crate) fn finalize(&self, slots: Vec<SlotState>) -> FlowResult<Outcome> {
        let mut per_action: Vec<Vec<Box<dyn Partial>>> = self
            .graph
            .actions
            .iter()
            .map(|_| Vec::with_capacity(slots.len()))
            .collect();
        let mut counters = vec![FilterCounters::default(); self.graph.filters.len()];
        let mut rows_per_slot = Vec::with_capacity(slots.len());

        for state in slots {
            rows_per_slot.push(state.rows);
            for (merged, filter) in counters.iter_mut().zip(&state.filters) {
                merged.merge(&filter.counters);
            }
            for (bucket, partial) in per_action.iter_mut().zip(state.partials) {
                bucket.push(partial);
            }
        }

        let publishers = self
            .graph
            .actions
            .iter()
            .zip(per_action)
            .map(|(action, partials)| action.finalize(partials))
            .collect::<FlowResult<Vec<_>>>()?;

        Ok(Outcome {
            publishers,
            counters,
            rows_per_slot,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, OnceLock};

    use rowflow_core::{DataType, Field};

    use super::*;
    use crate::actions::{Count, TypedAction};

    struct Fields(Vec<Value>);

    impl FieldAccessor for Fields {
        fn get(&self, field: usize) -> FlowResult<Value> {
            Ok(self.0[field].clone())
        }
    }

    fn schema() -> Schema {
        Schema::new(
            "t",
            vec![
                Field::new("x", DataType::Int64),
                Field::new("y", DataType::Int64),
            ],
        )
    }

    fn names(n: &[&str]) -> Vec<String> {
        n.iter().map(|s| (*s).to_string()).collect()
    }

    fn count_after(graph: &mut Graph, upstream: Option<FilterId>) -> Arc<OnceLock<u64>> {
        let (action, cell) = TypedAction::new(|_| Count::default());
        graph.book_action(ActionNode::new("count", upstream, Vec::new(), Box::new(action)));
        cell
    }

    #[test]
    fn test_duplicate_column_name() {
        let mut graph = Graph::default();
        let s = schema();
        let err = graph
            .book_column(&s, ColumnNode::new("x".into(), |y: i64| y, names(&["y"])))
            .unwrap_err();
        assert!(matches!(err, FlowError::DuplicateBranchName(ref n) if n == "x"));

        graph
            .book_column(&s, ColumnNode::new("z".into(), |y: i64| y, names(&["y"])))
            .unwrap();
        assert!(graph
            .book_column(&s, ColumnNode::new("z".into(), |x: i64| x, names(&["x"])))
            .is_err());
    }

    #[test]
    fn test_bind_unknown_branch() {
        let mut graph = Graph::default();
        graph.book_filter(FilterNode::new(|w: i64| w > 0, names(&["w"]), None, None));
        let err = BoundGraph::bind(&graph, &schema()).err().unwrap();
        assert!(matches!(err, FlowError::UnknownBranch(ref n) if n == "w"));
    }

    #[test]
    fn test_column_cannot_read_later_column() {
        let mut graph = Graph::default();
        let s = schema();
        graph
            .book_column(&s, ColumnNode::new("a".into(), |b: i64| b, names(&["b"])))
            .unwrap();
        graph
            .book_column(&s, ColumnNode::new("b".into(), |a: i64| a, names(&["a"])))
            .unwrap();
        assert!(BoundGraph::bind(&graph, &s).is_err());
    }

    #[test]
    fn test_shared_filter_and_column_evaluated_once() {
        let predicate_calls = Arc::new(AtomicUsize::new(0));
        let column_calls = Arc::new(AtomicUsize::new(0));
        let mut graph = Graph::default();
        let s = schema();

        let cc = Arc::clone(&column_calls);
        graph
            .book_column(
                &s,
                ColumnNode::new(
                    "sum".into(),
                    move |x: i64, y: i64| {
                        cc.fetch_add(1, Ordering::SeqCst);
                        x + y
                    },
                    names(&["x", "y"]),
                ),
            )
            .unwrap();
        let pc = Arc::clone(&predicate_calls);
        let cut = graph.book_filter(FilterNode::new(
            move |sum: i64| {
                pc.fetch_add(1, Ordering::SeqCst);
                sum > 3
            },
            names(&["sum"]),
            Some("cut".into()),
            None,
        ));
        let a = count_after(&mut graph, Some(cut));
        let b = count_after(&mut graph, Some(cut));

        let bound = BoundGraph::bind(&graph, &s).unwrap();
        let mut st = bound.create_slot(0);
        for (row, (x, y)) in [(1, 1), (2, 2), (5, 0)].into_iter().enumerate() {
            let fields = Fields(vec![Value::Int64(x), Value::Int64(y)]);
            bound.process_row(&mut st, row as RowIndex, &fields).unwrap();
        }
        assert_eq!(predicate_calls.load(Ordering::SeqCst), 3);
        assert_eq!(column_calls.load(Ordering::SeqCst), 3);

        let outcome = bound.finalize(vec![st]).unwrap();
        assert_eq!(outcome.counters[cut.0].accepted, 2);
        assert_eq!(outcome.counters[cut.0].rejected, 1);
        assert_eq!(outcome.rows_per_slot, vec![3]);
        for publish in outcome.publishers {
            publish();
        }
        assert_eq!(a.get(), Some(&2));
        assert_eq!(b.get(), Some(&2));
    }

    #[test]
    fn test_upstream_rejection_short_circuits() {
        let downstream_calls = Arc::new(AtomicUsize::new(0));
        let mut graph = Graph::default();
        let first = graph.book_filter(FilterNode::new(|x: i64| x > 0, names(&["x"]), None, None));
        let dc = Arc::clone(&downstream_calls);
        let second = graph.book_filter(FilterNode::new(
            move |y: i64| {
                dc.fetch_add(1, Ordering::SeqCst);
                y > 0
            },
            names(&["y"]),
            Some("second".into()),
            Some(first),
        ));
        count_after(&mut graph, Some(second));

        let s = schema();
        let bound = BoundGraph::bind(&graph, &s).unwrap();
        let mut st = bound.create_slot(0);
        let fields = Fields(vec![Value::Int64(-1), Value::String("not an int".into())]);
        // `y` has the wrong type but is never read since `x` rejects the row.
        bound.process_row(&mut st, 0, &fields).unwrap();
        assert_eq!(downstream_calls.load(Ordering::SeqCst), 0);

        let outcome = bound.finalize(vec![st]).unwrap();
        assert_eq!(outcome.counters[second.0].total(), 0);
    }

    #[test]
    fn test_chain() {
        let mut graph = Graph::default();
        let a = graph.book_filter(FilterNode::new(|| true, Vec::new(), Some("a".into()), None));
        let b = graph.book_filter(FilterNode::new(|| true, Vec::new(), None, Some(a)));
        let c = graph.book_filter(FilterNode::new(|| true, Vec::new(), Some("c".into()), Some(b)));
        graph.book_filter(FilterNode::new(|| true, Vec::new(), Some("d".into()), None));
        assert_eq!(graph.chain(Some(c)), vec![a, b, c]);
        assert!(graph.chain(None).is_empty());
        assert_eq!(graph.named_filters().len(), 3);
    }
}
