//! Type system for rowflow values.
//!
//! Rows carry dynamically typed [`Value`]s; callbacks receive statically
//! typed arguments decoded through [`FromValue`]. A failed decode is a
//! `TypeMismatch` reported at the moment the value is first read.

mod convert;
mod data_type;
mod value;

pub use convert::FromValue;
pub use data_type::DataType;
pub use value::Value;
