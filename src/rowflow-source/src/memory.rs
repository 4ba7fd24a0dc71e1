//! In-memory row source.

use std::sync::Arc;

use common_error::{FlowError, FlowResult};
use rowflow_core::{DataType, Field, RowIndex, Schema, Value};

use crate::traits::{FieldAccessor, RowCursor, RowSource};

/// Rows of values held in memory.
///
/// Partitioning splits the rows into contiguous ranges. When a cluster size
/// is configured, ranges never exceed it, so a threaded traversal may see
/// more partitions than slots.
#[derive(Debug, Clone)]
pub struct MemorySource {
    schema: Schema,
    rows: Arc<Vec<Vec<Value>>>,
    cluster_size: Option<usize>,
}

impl MemorySource {
    /// Create a source from a schema and row-major values.
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> FlowResult<Self> {
        if let Some(pos) = rows.iter().position(|r| r.len() != schema.len()) {
            return Err(FlowError::value_error(format!(
                "row {pos} has {} values, schema has {} fields",
                rows[pos].len(),
                schema.len()
            )));
        }
        Ok(Self {
            schema,
            rows: Arc::new(rows),
            cluster_size: None,
        })
    }

    /// Create a source from named columns of equal length.
    ///
    /// Field types are guessed from the first non-null value of each column.
    pub fn from_columns<I, S>(name: &str, columns: I) -> FlowResult<Self>
    where
        I: IntoIterator<Item = (S, Vec<Value>)>,
        S: Into<String>,
    {
        let columns: Vec<(String, Vec<Value>)> =
            columns.into_iter().map(|(n, v)| (n.into(), v)).collect();
        let num_rows = columns.first().map_or(0, |(_, v)| v.len());
        if let Some((col, values)) = columns.iter().find(|(_, v)| v.len() != num_rows) {
            return Err(FlowError::value_error(format!(
                "column \"{col}\" has {} values, expected {num_rows}",
                values.len()
            )));
        }

        let fields = columns
            .iter()
            .map(|(n, values)| {
                let data_type = values
                    .iter()
                    .find(|v| !v.is_null())
                    .map_or(DataType::Null, Value::data_type);
                Field::new(n.clone(), data_type)
            })
            .collect();

        let rows = (0..num_rows)
            .map(|i| columns.iter().map(|(_, v)| v[i].clone()).collect())
            .collect();

        Self::new(Schema::new(name, fields), rows)
    }

    /// Single `Int64` column, handy for small analyses and tests.
    pub fn from_i64(name: &str, branch: &str, values: impl IntoIterator<Item = i64>) -> Self {
        let rows = values.into_iter().map(|v| vec![Value::Int64(v)]).collect();
        Self {
            schema: Schema::new(name, vec![Field::new(branch, DataType::Int64)]),
            rows: Arc::new(rows),
            cluster_size: None,
        }
    }

    /// Limit partitions to at most `cluster_size` rows.
    #[must_use]
    pub fn with_cluster_size(mut self, cluster_size: usize) -> Self {
        self.cluster_size = Some(cluster_size.max(1));
        self
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the source holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn ranges(&self, n_slots: usize) -> Vec<(usize, usize)> {
        let total = self.rows.len();
        if n_slots <= 1 {
            return vec![(0, total)];
        }
        let even = total.div_ceil(n_slots).max(1);
        let chunk = self.cluster_size.map_or(even, |c| c.min(even));
        (0..total)
            .step_by(chunk)
            .map(|start| (start, (start + chunk).min(total)))
            .collect()
    }
}

impl RowSource for MemorySource {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn partition(&self, n_slots: usize) -> FlowResult<Vec<Box<dyn RowCursor>>> {
        Ok(self
            .ranges(n_slots)
            .into_iter()
            .map(|(start, end)| {
                Box::new(MemoryCursor {
                    rows: Arc::clone(&self.rows),
                    next: start,
                    end,
                    current: None,
                }) as Box<dyn RowCursor>
            })
            .collect())
    }

    fn num_rows(&self) -> Option<u64> {
        Some(self.rows.len() as u64)
    }
}

/// Cursor over a contiguous range of in-memory rows.
struct MemoryCursor {
    rows: Arc<Vec<Vec<Value>>>,
    next: usize,
    end: usize,
    current: Option<usize>,
}

impl FieldAccessor for MemoryCursor {
    fn get(&self, field: usize) -> FlowResult<Value> {
        let row = self
            .current
            .ok_or_else(|| FlowError::source_read("cursor is not positioned on a row"))?;
        self.rows[row].get(field).cloned().ok_or_else(|| {
            FlowError::source_read(format!("field index {field} out of range at row {row}"))
        })
    }
}

impl RowCursor for MemoryCursor {
    fn next_row(&mut self) -> FlowResult<Option<RowIndex>> {
        if self.next >= self.end {
            self.current = None;
            return Ok(None);
        }
        let row = self.next;
        self.next += 1;
        self.current = Some(row);
        Ok(Some(row as RowIndex))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(cursor: &mut Box<dyn RowCursor>) -> Vec<(RowIndex, Value)> {
        let mut out = Vec::new();
        while let Some(idx) = cursor.next_row().unwrap() {
            out.push((idx, cursor.get(0).unwrap()));
        }
        out
    }

    #[test]
    fn test_single_partition() {
        let source = MemorySource::from_i64("t", "x", [1, 5, 9]);
        let mut parts = source.partition(1).unwrap();
        assert_eq!(parts.len(), 1);
        let rows = drain(&mut parts[0]);
        assert_eq!(
            rows,
            vec![
                (0, Value::Int64(1)),
                (1, Value::Int64(5)),
                (2, Value::Int64(9))
            ]
        );
    }

    #[test]
    fn test_partitions_are_disjoint() {
        let source = MemorySource::from_i64("t", "x", 0..10);
        let mut parts = source.partition(3).unwrap();
        assert_eq!(parts.len(), 3);

        let mut seen: Vec<RowIndex> = parts
            .iter_mut()
            .flat_map(|p| drain(p).into_iter().map(|(i, _)| i))
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_cluster_size_limits_partitions() {
        let source = MemorySource::from_i64("t", "x", 0..10).with_cluster_size(2);
        assert_eq!(source.partition(2).unwrap().len(), 5);
        assert_eq!(source.partition(1).unwrap().len(), 1);
    }

    #[test]
    fn test_empty_source() {
        let source = MemorySource::from_i64("t", "x", []);
        let mut parts = source.partition(4).unwrap();
        assert!(parts.iter_mut().all(|p| p.next_row().unwrap().is_none()));
    }

    #[test]
    fn test_from_columns_guesses_types() {
        let source = MemorySource::from_columns(
            "t",
            [
                ("a", vec![Value::Null, Value::Float64(1.5)]),
                ("b", vec![Value::from("x"), Value::from("y")]),
            ],
        )
        .unwrap();
        assert_eq!(
            source.schema().field("a").unwrap().data_type,
            DataType::Float64
        );
        assert_eq!(
            source.schema().field("b").unwrap().data_type,
            DataType::String
        );
    }

    #[test]
    fn test_ragged_columns_rejected() {
        let result = MemorySource::from_columns(
            "t",
            [
                ("a", vec![Value::Int64(1)]),
                ("b", vec![Value::Int64(1), Value::Int64(2)]),
            ],
        );
        assert!(matches!(result, Err(FlowError::ValueError(_))));
    }

    #[test]
    fn test_read_before_next_fails() {
        let source = MemorySource::from_i64("t", "x", [1]);
        let parts = source.partition(1).unwrap();
        assert!(matches!(
            parts[0].get(0),
            Err(FlowError::SourceReadFailure(_))
        ));
    }
}
