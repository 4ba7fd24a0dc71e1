//! Error types and result aliases for rowflow.
//!
//! Every crate in the workspace reports failures through [`FlowError`] so
//! that booking-time and traversal-time errors reach the caller unchanged.

mod error;

pub use error::{FlowError, FlowResult, GenericError};
