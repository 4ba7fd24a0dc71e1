//! Schema definition for row sources.

use serde::{Deserialize, Serialize};

use crate::types::DataType;

/// A named branch physically present in a row source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Branch name.
    pub name: String,
    /// Declared (or guessed) data type.
    pub data_type: DataType,
    /// Whether this branch can contain nulls.
    pub nullable: bool,
}

impl Field {
    /// Create a new field.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
        }
    }

    /// Set nullable for this field.
    #[must_use]
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }
}

/// Ordered set of branches exposed by a row source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Name of the dataset (tree/table name).
    pub name: String,
    /// Fields in row order.
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create a new schema.
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Create an empty schema.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add a field to the schema.
    pub fn add_field(&mut self, field: Field) {
        self.fields.push(field);
    }

    /// Position of a field by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check whether a branch with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// All field names in order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the schema has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schema() -> Schema {
        Schema::new(
            "events",
            vec![
                Field::new("x", DataType::Int64),
                Field::new("met", DataType::Float64).with_nullable(false),
            ],
        )
    }

    #[test]
    fn test_lookup() {
        let schema = sample_schema();
        assert_eq!(schema.index_of("met"), Some(1));
        assert!(schema.contains("x"));
        assert!(!schema.contains("y"));
        assert_eq!(schema.field_names(), vec!["x", "met"]);
        assert!(!schema.field("met").unwrap().nullable);
    }

    #[test]
    fn test_schema_json() {
        let schema = sample_schema();
        let json = serde_json::to_string(&schema).unwrap();
        let back: Schema = serde_json::from_str(&json).unwrap();
        assert_eq!(back, schema);
    }
}
