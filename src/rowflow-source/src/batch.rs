//! Arrow `RecordBatch` row source.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{
    DataType as ArrowType, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type,
    SchemaRef, UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};
use arrow::record_batch::RecordBatch;
use arrow_ipc::reader::FileReader;
use log::debug;

use common_error::{FlowError, FlowResult};
use rowflow_core::{DataType, Field, RowIndex, Schema, Value};

use crate::traits::{FieldAccessor, RowCursor, RowSource};

/// Row source over Arrow record batches.
///
/// Each batch is a cluster: a threaded traversal receives one partition per
/// batch, a sequential one a single cursor chaining every batch. Row indices
/// are global across batches.
#[derive(Debug, Clone)]
pub struct BatchSource {
    schema: Schema,
    arrow_schema: SchemaRef,
    batches: Arc<Vec<RecordBatch>>,
    offsets: Vec<u64>,
}

impl BatchSource {
    /// Create a source from batches sharing `arrow_schema`.
    pub fn new(
        name: impl Into<String>,
        arrow_schema: SchemaRef,
        batches: Vec<RecordBatch>,
    ) -> FlowResult<Self> {
        if let Some(pos) = batches.iter().position(|b| b.schema() != arrow_schema) {
            return Err(FlowError::value_error(format!(
                "batch {pos} does not match the source schema"
            )));
        }

        let fields = arrow_schema
            .fields()
            .iter()
            .map(|f| {
                Field::new(f.name().clone(), convert_type(f.data_type()))
                    .with_nullable(f.is_nullable())
            })
            .collect();

        let mut offsets = Vec::with_capacity(batches.len());
        let mut total = 0u64;
        for batch in &batches {
            offsets.push(total);
            total += batch.num_rows() as u64;
        }

        Ok(Self {
            schema: Schema::new(name, fields),
            arrow_schema,
            batches: Arc::new(batches),
            offsets,
        })
    }

    /// Open the dataset `schema_name` stored as an Arrow IPC file at `location`.
    pub fn open_ipc(schema_name: &str, location: impl AsRef<Path>) -> FlowResult<Self> {
        let location = location.as_ref();
        let file = File::open(location).map_err(|e| {
            FlowError::source_read(format!("failed to open {}: {e}", location.display()))
        })?;
        let reader = FileReader::try_new(file, None).map_err(|e| {
            FlowError::source_read(format!("failed to read {}: {e}", location.display()))
        })?;
        let arrow_schema = reader.schema();
        let batches = reader
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| FlowError::source_read(format!("failed to read batch: {e}")))?;

        debug!(
            "opened {} ({} batches) as \"{schema_name}\"",
            location.display(),
            batches.len()
        );
        Self::new(schema_name, arrow_schema, batches)
    }

    /// The Arrow schema of the batches.
    pub fn arrow_schema(&self) -> &SchemaRef {
        &self.arrow_schema
    }

    /// Number of batches (clusters).
    pub fn num_batches(&self) -> usize {
        self.batches.len()
    }

    fn cursor(&self, batches: Vec<usize>) -> Box<dyn RowCursor> {
        Box::new(BatchCursor {
            batches: Arc::clone(&self.batches),
            offsets: self.offsets.clone(),
            order: batches,
            pos: 0,
            row: None,
        })
    }
}

impl RowSource for BatchSource {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn partition(&self, n_slots: usize) -> FlowResult<Vec<Box<dyn RowCursor>>> {
        if n_slots <= 1 {
            return Ok(vec![self.cursor((0..self.batches.len()).collect())]);
        }
        Ok((0..self.batches.len())
            .map(|i| self.cursor(vec![i]))
            .collect())
    }

    fn num_rows(&self) -> Option<u64> {
        Some(self.batches.iter().map(|b| b.num_rows() as u64).sum())
    }
}

/// Cursor chaining a list of batches.
struct BatchCursor {
    batches: Arc<Vec<RecordBatch>>,
    offsets: Vec<u64>,
    order: Vec<usize>,
    pos: usize,
    /// (batch, row within batch) of the current row.
    row: Option<(usize, usize)>,
}

impl FieldAccessor for BatchCursor {
    fn get(&self, field: usize) -> FlowResult<Value> {
        let (batch, row) = self
            .row
            .ok_or_else(|| FlowError::source_read("cursor is not positioned on a row"))?;
        let batch = &self.batches[batch];
        if field >= batch.num_columns() {
            return Err(FlowError::source_read(format!(
                "field index {field} out of range"
            )));
        }
        value_at(batch.column(field), row)
    }
}

impl RowCursor for BatchCursor {
    fn next_row(&mut self) -> FlowResult<Option<RowIndex>> {
        loop {
            let Some(&batch) = self.order.get(self.pos) else {
                self.row = None;
                return Ok(None);
            };
            let next = self.row.filter(|(b, _)| *b == batch).map_or(0, |(_, r)| r + 1);
            if next < self.batches[batch].num_rows() {
                self.row = Some((batch, next));
                return Ok(Some(self.offsets[batch] + next as u64));
            }
            self.pos += 1;
            self.row = None;
        }
    }
}

fn convert_type(data_type: &ArrowType) -> DataType {
    match data_type {
        ArrowType::Boolean => DataType::Bool,
        ArrowType::Int8
        | ArrowType::Int16
        | ArrowType::Int32
        | ArrowType::Int64
        | ArrowType::UInt8
        | ArrowType::UInt16
        | ArrowType::UInt32
        | ArrowType::UInt64 => DataType::Int64,
        ArrowType::Float32 | ArrowType::Float64 => DataType::Float64,
        ArrowType::Utf8 | ArrowType::LargeUtf8 => DataType::String,
        ArrowType::List(inner) | ArrowType::LargeList(inner) => {
            DataType::Array(Box::new(convert_type(inner.data_type())))
        }
        ArrowType::Null => DataType::Null,
        _ => DataType::Any,
    }
}

/// Decode one Arrow cell into a [`Value`].
fn value_at(array: &ArrayRef, row: usize) -> FlowResult<Value> {
    if array.is_null(row) {
        return Ok(Value::Null);
    }
    let value = match array.data_type() {
        ArrowType::Boolean => Value::Bool(array.as_boolean().value(row)),
        ArrowType::Int8 => Value::from(i64::from(array.as_primitive::<Int8Type>().value(row))),
        ArrowType::Int16 => Value::from(i64::from(array.as_primitive::<Int16Type>().value(row))),
        ArrowType::Int32 => Value::from(i64::from(array.as_primitive::<Int32Type>().value(row))),
        ArrowType::Int64 => Value::from(array.as_primitive::<Int64Type>().value(row)),
        ArrowType::UInt8 => Value::from(i64::from(array.as_primitive::<UInt8Type>().value(row))),
        ArrowType::UInt16 => Value::from(i64::from(array.as_primitive::<UInt16Type>().value(row))),
        ArrowType::UInt32 => Value::from(i64::from(array.as_primitive::<UInt32Type>().value(row))),
        ArrowType::UInt64 => {
            let v = array.as_primitive::<UInt64Type>().value(row);
            Value::from(i64::try_from(v).map_err(|_| {
                FlowError::source_read(format!("UInt64 value {v} does not fit in Int64"))
            })?)
        }
        ArrowType::Float32 => Value::from(f64::from(array.as_primitive::<Float32Type>().value(row))),
        ArrowType::Float64 => Value::from(array.as_primitive::<Float64Type>().value(row)),
        ArrowType::Utf8 => Value::from(array.as_string::<i32>().value(row)),
        ArrowType::LargeUtf8 => Value::from(array.as_string::<i64>().value(row)),
        ArrowType::List(_) => list_values(&array.as_list::<i32>().value(row))?,
        ArrowType::LargeList(_) => list_values(&array.as_list::<i64>().value(row))?,
        ArrowType::Null => Value::Null,
        other => {
            return Err(FlowError::source_read(format!(
                "unsupported column type {other}"
            )))
        }
    };
    Ok(value)
}

fn list_values(inner: &ArrayRef) -> FlowResult<Value> {
    (0..inner.len())
        .map(|i| value_at(inner, i))
        .collect::<FlowResult<Vec<_>>>()
        .map(Value::Array)
}
