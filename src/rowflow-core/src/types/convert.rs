//! Decoding of branch values into typed callback arguments.

use common_error::{FlowError, FlowResult};

use super::{DataType, Value};

/// A type that can be read from a branch value.
///
/// Implementations are strict: an `Int64` branch is not silently read as
/// `f64`. Type-guessing actions that want numeric coercion go through
/// [`Value::numeric_elements`] instead.
pub trait FromValue: Sized + Send + 'static {
    /// The branch type this Rust type expects.
    fn data_type() -> DataType;

    /// Convert a value, returning `None` on a type mismatch.
    fn from_value(value: &Value) -> Option<Self>;

    /// Convert a value read from `branch`, failing with `TypeMismatch`.
    fn decode(branch: &str, value: &Value) -> FlowResult<Self> {
        Self::from_value(value).ok_or_else(|| {
            FlowError::type_mismatch(branch, Self::data_type().display_name(), value.type_name())
        })
    }
}

impl FromValue for Value {
    fn data_type() -> DataType {
        DataType::Any
    }

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromValue for bool {
    fn data_type() -> DataType {
        DataType::Bool
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FromValue for i64 {
    fn data_type() -> DataType {
        DataType::Int64
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_int64()
    }
}

impl FromValue for i32 {
    fn data_type() -> DataType {
        DataType::Int64
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_int64().and_then(|v| i32::try_from(v).ok())
    }
}

impl FromValue for u32 {
    fn data_type() -> DataType {
        DataType::Int64
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_int64().and_then(|v| u32::try_from(v).ok())
    }
}

impl FromValue for f64 {
    fn data_type() -> DataType {
        DataType::Float64
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float64(f) => Some(*f),
            _ => None,
        }
    }
}

impl FromValue for String {
    fn data_type() -> DataType {
        DataType::String
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn data_type() -> DataType {
        T::data_type()
    }

    fn from_value(value: &Value) -> Option<Self> {
        if value.is_null() {
            Some(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn data_type() -> DataType {
        DataType::Array(Box::new(T::data_type()))
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_array()?.iter().map(T::from_value).collect()
    }
}
