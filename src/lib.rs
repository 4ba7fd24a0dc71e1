//! rowflow - lazy single-pass dataflow over row sources
//!
//! rowflow lets an analysis book filters, derived columns and actions
//! against a row source, then computes every booked result in a single
//! traversal, sequentially or across worker slots.

#![forbid(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

// Re-export core crates
pub use common_config as config;
pub use common_error as error;
pub use rowflow_core as core;
pub use rowflow_engine as engine;
pub use rowflow_source as source;

pub use common_error::{FlowError, FlowResult};
pub use rowflow_engine::{Engine, EngineConfig, Frame, LazyResult};

/// rowflow version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
