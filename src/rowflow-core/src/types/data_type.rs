//! Data type definitions for rowflow schemas.

use serde::{Deserialize, Serialize};

/// Data type of a branch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Null type (unknown or absent).
    Null,
    /// Boolean type.
    Bool,
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point.
    Float64,
    /// UTF-8 string.
    String,
    /// Variable-length collection of elements of the given type.
    Array(Box<Self>),
    /// Any type; used by callbacks that accept raw values.
    Any,
}

impl DataType {
    /// Check if this type is numeric.
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Int64 | Self::Float64)
    }

    /// Check if values of this type can be read as `f64` by type-guessing
    /// actions (numbers and collections of numbers).
    pub fn is_numeric_like(&self) -> bool {
        match self {
            Self::Int64 | Self::Float64 | Self::Bool => true,
            Self::Array(inner) => inner.is_numeric_like(),
            _ => false,
        }
    }

    /// Get the display name for this type.
    pub fn display_name(&self) -> String {
        match self {
            Self::Null => "Null".to_string(),
            Self::Bool => "Bool".to_string(),
            Self::Int64 => "Int64".to_string(),
            Self::Float64 => "Float64".to_string(),
            Self::String => "String".to_string(),
            Self::Array(inner) => format!("Array<{}>", inner.display_name()),
            Self::Any => "Any".to_string(),
        }
    }

    /// Check whether a value of this type satisfies `target`.
    pub fn is_compatible_with(&self, target: &Self) -> bool {
        if self == target {
            return true;
        }
        match (self, target) {
            (_, Self::Any) | (Self::Null, _) => true,
            (Self::Array(a), Self::Array(b)) => a.is_compatible_with(b),
            _ => false,
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compatibility() {
        assert!(DataType::Int64.is_compatible_with(&DataType::Any));
        assert!(DataType::Null.is_compatible_with(&DataType::String));
        assert!(!DataType::Int64.is_compatible_with(&DataType::Float64));
        assert!(DataType::Array(Box::new(DataType::Int64))
            .is_compatible_with(&DataType::Array(Box::new(DataType::Any))));
    }

    #[test]
    fn test_display_name() {
        let t = DataType::Array(Box::new(DataType::Float64));
        assert_eq!(t.to_string(), "Array<Float64>");
        assert!(t.is_numeric_like());
        assert!(!DataType::String.is_numeric_like());
    }
}
