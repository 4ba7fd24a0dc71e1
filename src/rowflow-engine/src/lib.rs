//! Lazy single-pass dataflow engine for rowflow.
//!
//! This crate executes a graph of filters, derived columns and actions over
//! the rows of a [`RowSource`](rowflow_source::RowSource) in one traversal,
//! optionally spread over several worker slots.

#![allow(clippy::missing_const_for_fn)] // Builder patterns often can't be const
#![allow(clippy::return_self_not_must_use)] // Builder patterns don't always need must_use
#![allow(clippy::doc_markdown)] // Documentation backticks are sometimes unnecessary
#![allow(
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation
)] // Some casts are intentional
#![allow(clippy::type_complexity)] // Type-erased callbacks have long signatures
#![allow(clippy::significant_drop_tightening)] // The engine lock is held for a whole traversal
#![allow(clippy::module_name_repetitions)] // Some type names repeat their module
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐ book  ┌──────────────┐ run() ┌──────────────┐
//! │    Frame     │ ────▶ │    Engine    │ ────▶ │  RowSource   │
//! │ filter/define│       │ node arena   │       │  partition() │
//! │ count/sum/.. │       │ per-slot     │ ◀──── │  RowCursors  │
//! └──────────────┘       │ state, merge │ rows  └──────────────┘
//!        │               └──────────────┘
//!        ▼                      │ publish
//!  LazyResult<V> ◀──────────────┘
//! ```
//!
//! # Key Components
//!
//! ## Booking ([`Frame`])
//!
//! - [`Frame::filter`], [`Frame::filter_named`]: predicates chained after the
//!   frame's last filter
//! - [`Frame::define`]: derived columns, visible from every frame
//! - Lazy actions: `count`, `sum`, `min`, `max`, `mean`, `take`, `reduce`,
//!   `histo1d`, `aggregate`, each returning a [`LazyResult`]
//! - Eager actions: `foreach`, `foreach_slot`, which run the traversal at once
//!
//! ## Evaluation
//!
//! Every filter and derived column keeps one row cache per slot, so it is
//! evaluated at most once per row and slot however many consumers read it.
//! A filter whose upstream filter rejects a row returns `false` without
//! reading its inputs or calling its predicate.
//!
//! ## Traversal ([`Engine`])
//!
//! For each row, every booked action runs, then every named filter is
//! checked so that cutflow counters stay current. Per-slot partials are
//! merged once all slots have finished, and only then are results
//! published.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use rowflow_engine::{Engine, EngineConfig};
//! use rowflow_source::MemorySource;
//!
//! # fn main() -> common_error::FlowResult<()> {
//! let source = MemorySource::from_i64("events", "x", 0..1000);
//! let engine = Engine::new(Arc::new(source), EngineConfig::threaded(4))?;
//!
//! let even = engine.root().filter_named(|x: i64| x % 2 == 0, &["x"], "even")?;
//! let count = even.count()?;
//! let total = even.sum::<i64>("x")?;
//!
//! assert_eq!(*count.get()?, 500);
//! assert_eq!(*total.get()?, 249_500);
//! print!("{}", engine.report()?);
//! # Ok(())
//! # }
//! ```

pub mod actions;
mod cache;
mod engine;
mod frame;
pub mod func;
mod graph;
pub mod metrics;
pub mod nodes;
pub mod report;
mod result;

pub use actions::{Accumulator, Histogram1D, HistogramModel, Numeric};
pub use common_config::ExecutionConfig as EngineConfig;
pub use engine::{Engine, RunPhase};
pub use frame::Frame;
pub use func::{CallbackOutput, Row, RowFn, SlotRowFn};
pub use metrics::{MetricsSink, RunMetrics};
pub use nodes::{ColumnId, FilterId};
pub use report::{CutflowReport, FilterStats};
pub use result::LazyResult;
