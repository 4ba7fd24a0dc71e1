//! Core data model for rowflow.
//!
//! This crate provides the fundamental types shared by row sources and the
//! engine:
//! - `Value` and `DataType` for the runtime type system
//! - `FromValue` for decoding branch values into typed callback arguments
//! - `Schema` and `Field` describing the branches a source exposes
//! - `RowIndex` and `SlotId` identifiers

pub mod schema;
pub mod types;

pub use schema::{Field, Schema};
pub use types::{DataType, FromValue, Value};

/// Identifier of a row within one slot's traversal.
pub type RowIndex = u64;

/// Identifier of a worker slot, in `[0, n_slots)`.
pub type SlotId = usize;
