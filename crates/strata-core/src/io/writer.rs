//! Physical segment writer.
//!
//! [`SegmentWriter`] binds a destination stream to a schema at construction
//! time: it derives the logical schema (rejecting anything outside the
//! supported lattice), builds the manifest, and configures the underlying
//! Parquet writer to embed it in the footer. No bytes reach the destination
//! until batches are written and the writer is finished.
use std::io::Write;

use arrow::array::RecordBatch;
use arrow::datatypes::SchemaRef;
use parquet::arrow::ArrowWriter;
use parquet::errors::ParquetError;
use parquet::file::metadata::KeyValue;
use parquet::file::properties::WriterProperties;
use snafu::{Backtrace, prelude::*};

use crate::manifest::{MANIFEST_METADATA_KEY, Manifest, ManifestError};
use crate::schema::SchemaConvertError;

/// Errors raised while constructing or driving a segment writer.
#[derive(Debug, Snafu)]
pub enum WriteError {
    /// The schema cannot be represented by the strata format.
    #[snafu(display("schema is not supported by the strata format: {source}"))]
    Schema {
        /// Underlying conversion error.
        source: SchemaConvertError,
    },

    /// The manifest could not be encoded for the footer.
    #[snafu(display("failed to encode segment manifest: {source}"))]
    Manifest {
        /// Underlying manifest error.
        source: ManifestError,
    },

    /// The rows-per-flush-unit setting was zero.
    #[snafu(display("write batch rows must be greater than 0"))]
    InvalidBatchRows,

    /// The underlying Parquet writer failed.
    #[snafu(display("parquet write error: {source}"))]
    Parquet {
        /// Underlying Parquet error.
        source: ParquetError,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },
}

/// Writer for one strata segment.
///
/// `batch_rows` is the flush unit: it caps how many rows are grouped into
/// one Parquet row group, which is also the natural batch size seen by
/// readers of the finished segment.
pub struct SegmentWriter<W: Write + Send> {
    inner: ArrowWriter<W>,
    manifest: Manifest,
    rows_written: u64,
}

impl<W: Write + Send> SegmentWriter<W> {
    /// Bind a writer to a destination stream and schema.
    ///
    /// Fails if the schema lies outside the supported lattice or the
    /// Parquet writer cannot be set up; nothing is flushed on success.
    pub fn new(destination: W, schema: SchemaRef, batch_rows: usize) -> Result<Self, WriteError> {
        ensure!(batch_rows > 0, InvalidBatchRowsSnafu);

        let manifest = Manifest::from_arrow_schema(&schema).context(SchemaSnafu)?;
        let json = manifest.to_json().context(ManifestSnafu)?;

        let props = WriterProperties::builder()
            .set_max_row_group_size(batch_rows)
            .set_key_value_metadata(Some(vec![KeyValue::new(
                MANIFEST_METADATA_KEY.to_string(),
                json,
            )]))
            .build();

        let inner = ArrowWriter::try_new(destination, schema, Some(props)).context(ParquetSnafu)?;

        Ok(SegmentWriter {
            inner,
            manifest,
            rows_written: 0,
        })
    }

    /// The manifest that will be recorded in the segment footer.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Rows accepted so far across all written batches.
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Append one record batch to the segment.
    pub fn write(&mut self, batch: &RecordBatch) -> Result<(), WriteError> {
        self.inner.write(batch).context(ParquetSnafu)?;
        self.rows_written += batch.num_rows() as u64;
        Ok(())
    }

    /// Flush remaining data, write the footer, and close the segment.
    ///
    /// Returns the total number of rows written.
    pub fn finish(self) -> Result<u64, WriteError> {
        let rows = self.rows_written;
        self.inner.close().context(ParquetSnafu)?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::reader::{ReadOptions, SegmentReader};
    use crate::io::test_util::*;
    use crate::manifest::FORMAT_VERSION;
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    #[test]
    fn new_rejects_unsupported_schema() {
        let schema = Arc::new(Schema::new(vec![Field::new(
            "tags",
            DataType::List(Arc::new(Field::new("item", DataType::Utf8, true))),
            true,
        )]));

        let mut buf = Vec::new();
        let err = SegmentWriter::new(&mut buf, schema, 1024).err().unwrap();
        assert!(matches!(err, WriteError::Schema { .. }));
        assert!(buf.is_empty(), "nothing may be flushed on failure");
    }

    #[test]
    fn new_rejects_zero_batch_rows() {
        let mut buf = Vec::new();
        let err = SegmentWriter::new(&mut buf, sample_schema(), 0).err().unwrap();
        assert!(matches!(err, WriteError::InvalidBatchRows));
    }

    #[test]
    fn new_flushes_nothing_before_finish() -> TestResult {
        let mut buf = Vec::new();
        let writer = SegmentWriter::new(&mut buf, sample_schema(), 1024)?;
        assert_eq!(writer.rows_written(), 0);
        drop(writer);
        Ok(())
    }

    #[test]
    fn write_accumulates_row_count() -> TestResult {
        let mut buf = Vec::new();
        let mut writer = SegmentWriter::new(&mut buf, sample_schema(), 1024)?;

        writer.write(&sample_batch(0, 7))?;
        writer.write(&sample_batch(7, 5))?;
        assert_eq!(writer.rows_written(), 12);

        let rows = writer.finish()?;
        assert_eq!(rows, 12);
        Ok(())
    }

    #[test]
    fn finished_segment_roundtrips_through_reader() -> TestResult {
        let data = write_segment(&[sample_batch(0, 8), sample_batch(8, 8)], 1024)?;
        let reader = SegmentReader::open(data)?;

        assert_eq!(reader.num_rows(), 16);
        assert_eq!(reader.manifest().format_version(), FORMAT_VERSION);
        assert_eq!(reader.schema().as_ref(), sample_schema().as_ref());

        let batches = reader
            .batch_reader(&ReadOptions::default())?
            .collect::<Result<Vec<_>, _>>()?;
        assert_eq!(id_values(&batches), (0..16).collect::<Vec<i64>>());
        Ok(())
    }

    #[test]
    fn batch_rows_bounds_row_group_size() -> TestResult {
        use parquet::file::reader::{FileReader, SerializedFileReader};

        // One logical write split across flush units of 3 rows.
        let data = write_segment(&[sample_batch(0, 8)], 3)?;

        let parquet = SerializedFileReader::new(data.clone())?;
        assert_eq!(parquet.metadata().num_row_groups(), 3);

        let reader = SegmentReader::open(data)?;
        let batches = reader
            .batch_reader(&ReadOptions::default())?
            .collect::<Result<Vec<_>, _>>()?;
        assert_eq!(id_values(&batches), (0..8).collect::<Vec<i64>>());
        Ok(())
    }
}
