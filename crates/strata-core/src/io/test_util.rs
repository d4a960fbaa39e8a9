use std::sync::Arc;

use arrow::array::{Array, Int64Array, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use bytes::Bytes;
use parquet::arrow::ArrowWriter;

use crate::io::writer::SegmentWriter;

pub(crate) type TestResult = Result<(), Box<dyn std::error::Error>>;

pub(crate) fn sample_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("val", DataType::Utf8, true),
    ]))
}

pub(crate) fn sample_batch(start: i64, rows: usize) -> RecordBatch {
    let ids = Int64Array::from_iter_values(start..start + rows as i64);
    let vals = StringArray::from_iter_values((0..rows).map(|i| format!("val-{}", start + i as i64)));
    RecordBatch::try_new(sample_schema(), vec![Arc::new(ids), Arc::new(vals)])
        .expect("valid sample batch")
}

/// Write the given batches as an in-memory strata segment.
pub(crate) fn write_segment(
    batches: &[RecordBatch],
    batch_rows: usize,
) -> Result<Bytes, Box<dyn std::error::Error>> {
    let mut buf = Vec::new();
    let mut writer = SegmentWriter::new(&mut buf, sample_schema(), batch_rows)?;
    for batch in batches {
        writer.write(batch)?;
    }
    writer.finish()?;
    Ok(Bytes::from(buf))
}

/// Write the given batches as a plain Parquet file with no manifest entry.
pub(crate) fn write_plain_parquet(
    batches: &[RecordBatch],
) -> Result<Bytes, Box<dyn std::error::Error>> {
    let mut buf = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buf, sample_schema(), None)?;
    for batch in batches {
        writer.write(batch)?;
    }
    writer.close()?;
    Ok(Bytes::from(buf))
}

/// Collect the `id` column values across batches, in delivery order.
pub(crate) fn id_values(batches: &[RecordBatch]) -> Vec<i64> {
    batches
        .iter()
        .flat_map(|batch| {
            let ids = batch
                .column_by_name("id")
                .expect("id column present")
                .as_any()
                .downcast_ref::<Int64Array>()
                .expect("id column is Int64");
            (0..ids.len()).map(|i| ids.value(i)).collect::<Vec<_>>()
        })
        .collect()
}
