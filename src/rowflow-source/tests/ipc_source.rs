//! Integration tests reading Arrow IPC files through `BatchSource`.

use std::fs::File;
use std::sync::Arc;

use arrow::array::{Float64Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow_ipc::writer::FileWriter;

use common_error::FlowError;
use rowflow_core::Value;
use rowflow_source::{BatchSource, RowSource};

fn write_ipc(path: &std::path::Path, batches: usize, rows_per_batch: i64) {
    let schema = Arc::new(Schema::new(vec![
        Field::new("x", DataType::Int64, false),
        Field::new("w", DataType::Float64, false),
    ]));
    let file = File::create(path).unwrap();
    let mut writer = FileWriter::try_new(file, &schema).unwrap();
    for b in 0..batches as i64 {
        let start = b * rows_per_batch;
        let xs: Vec<i64> = (start..start + rows_per_batch).collect();
        let ws: Vec<f64> = xs.iter().map(|x| *x as f64 * 0.5).collect();
        let batch = RecordBatch::try_new(
            Arc::clone(&schema),
            vec![
                Arc::new(Int64Array::from(xs)),
                Arc::new(Float64Array::from(ws)),
            ],
        )
        .unwrap();
        writer.write(&batch).unwrap();
    }
    writer.finish().unwrap();
}

#[test]
fn test_open_ipc_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.arrow");
    write_ipc(&path, 3, 4);

    let source = BatchSource::open_ipc("events", &path).unwrap();
    assert_eq!(source.schema().name, "events");
    assert_eq!(source.num_batches(), 3);
    assert_eq!(source.num_rows(), Some(12));

    let mut parts = source.partition(1).unwrap();
    let mut sum = 0;
    let mut last = None;
    while let Some(idx) = parts[0].next_row().unwrap() {
        if let Some(prev) = last {
            assert!(idx > prev);
        }
        last = Some(idx);
        sum += parts[0].get(0).unwrap().as_int64().unwrap();
    }
    assert_eq!(sum, (0..12).sum::<i64>());
}

#[test]
fn test_threaded_partitions_cover_all_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.arrow");
    write_ipc(&path, 4, 5);

    let source = BatchSource::open_ipc("events", &path).unwrap();
    let mut parts = source.partition(2).unwrap();
    assert_eq!(parts.len(), 4);

    let mut indices = Vec::new();
    for part in &mut parts {
        while let Some(idx) = part.next_row().unwrap() {
            assert_eq!(part.get(1).unwrap(), Value::Float64(idx as f64 * 0.5));
            indices.push(idx);
        }
    }
    indices.sort_unstable();
    assert_eq!(indices, (0..20).collect::<Vec<u64>>());
}

#[test]
fn test_open_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = BatchSource::open_ipc("events", dir.path().join("missing.arrow"));
    assert!(matches!(result, Err(FlowError::SourceReadFailure(_))));
}
