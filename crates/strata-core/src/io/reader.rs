//! Physical segment reader.
//!
//! [`SegmentReader::open`] parses the Parquet footer exactly once and
//! resolves the embedded manifest; everything after that (schema and row
//! count accessors, building projected batch readers) works off the parsed
//! footer without re-reading it. Opening fails for truncated, corrupt, or
//! foreign input, which is how scan pipelines report bad sources before any
//! batch is requested.
use std::sync::Arc;

use arrow::datatypes::SchemaRef;
use arrow::error::ArrowError;
use bytes::Bytes;
use parquet::arrow::ProjectionMask;
use parquet::arrow::arrow_reader::{
    ArrowReaderMetadata, ArrowReaderOptions, ParquetRecordBatchReader,
    ParquetRecordBatchReaderBuilder,
};
use parquet::errors::ParquetError;
use snafu::{Backtrace, prelude::*};

use crate::manifest::{MANIFEST_METADATA_KEY, Manifest, ManifestError};

/// Default number of rows per decoded batch.
pub const DEFAULT_BATCH_SIZE: usize = 1024;

/// Errors raised while opening or reading a segment.
#[derive(Debug, Snafu)]
pub enum ReadError {
    /// The footer is truncated, corrupt, or not a Parquet container at all.
    #[snafu(display("segment footer is invalid or truncated: {source}"))]
    Footer {
        /// Underlying Parquet error.
        source: ParquetError,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// The footer parsed but carries no `strata.manifest` entry; the file
    /// is a foreign Parquet file, not a strata segment.
    #[snafu(display("segment has no strata.manifest footer entry"))]
    MissingManifest,

    /// The manifest entry was present but invalid.
    #[snafu(display("segment manifest is invalid: {source}"))]
    Manifest {
        /// Underlying manifest error.
        source: ManifestError,
    },

    /// A projected column does not exist in the segment schema.
    #[snafu(display("unknown projected column {column}"))]
    ProjectionColumn {
        /// The requested column name.
        column: String,
    },

    /// The requested batch size was zero.
    #[snafu(display("scan batch size must be greater than 0"))]
    InvalidBatchSize,

    /// Decoding a record batch failed mid-scan.
    #[snafu(display("failed to decode record batch: {source}"))]
    Decode {
        /// Underlying Arrow error.
        source: ArrowError,
    },

    /// The worker-pool task producing the next batch did not complete.
    #[snafu(display("batch decode task failed to run: {source}"))]
    Scheduling {
        /// Underlying join error.
        source: tokio::task::JoinError,
    },
}

/// Column selection and batching knobs for one segment scan.
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Columns to decode, by name; `None` decodes every column.
    pub projection: Option<Vec<String>>,
    /// Number of rows per decoded batch.
    pub batch_size: usize,
    /// Decode at most this many rows (applied after `offset`).
    pub limit: Option<usize>,
    /// Skip this many rows before decoding.
    pub offset: Option<usize>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions {
            projection: None,
            batch_size: DEFAULT_BATCH_SIZE,
            limit: None,
            offset: None,
        }
    }
}

/// A strata segment opened for reading.
///
/// Construction parses the footer and resolves the manifest, so a value of
/// this type always has both. The reader itself performs no data I/O; that
/// happens in the batch readers it hands out.
pub struct SegmentReader {
    data: Bytes,
    metadata: ArrowReaderMetadata,
    manifest: Arc<Manifest>,
}

impl SegmentReader {
    /// Open a segment from its full contents, decoding the manifest from
    /// the footer.
    pub fn open(data: Bytes) -> Result<Self, ReadError> {
        let metadata = load_metadata(&data)?;
        let manifest = decode_manifest(&metadata)?;
        Ok(SegmentReader {
            data,
            metadata,
            manifest: Arc::new(manifest),
        })
    }

    /// Open a segment with a pre-resolved manifest.
    ///
    /// The footer is still parsed (row groups are needed for reading), but
    /// the manifest entry is not re-decoded; `manifest` is trusted to
    /// describe the same logical source.
    pub fn open_with_manifest(data: Bytes, manifest: Arc<Manifest>) -> Result<Self, ReadError> {
        let metadata = load_metadata(&data)?;
        Ok(SegmentReader {
            data,
            metadata,
            manifest,
        })
    }

    /// The manifest bound to this reader.
    pub fn manifest(&self) -> &Arc<Manifest> {
        &self.manifest
    }

    /// The Arrow schema recorded in the segment footer.
    pub fn schema(&self) -> SchemaRef {
        Arc::clone(self.metadata.schema())
    }

    /// Total number of rows stored in the segment.
    pub fn num_rows(&self) -> u64 {
        self.metadata.metadata().file_metadata().num_rows().max(0) as u64
    }

    /// Build a synchronous pull reader over the segment.
    ///
    /// Projection names are resolved against the footer schema; unknown
    /// names and a zero batch size are rejected here, before any data I/O.
    pub fn batch_reader(
        &self,
        options: &ReadOptions,
    ) -> Result<ParquetRecordBatchReader, ReadError> {
        ensure!(options.batch_size > 0, InvalidBatchSizeSnafu);

        let mut builder =
            ParquetRecordBatchReaderBuilder::new_with_metadata(self.data.clone(), self.metadata.clone())
                .with_batch_size(options.batch_size);

        if let Some(columns) = options.projection.as_deref() {
            let schema = self.metadata.schema();
            let mut indices = Vec::with_capacity(columns.len());
            for column in columns {
                let idx = schema
                    .index_of(column)
                    .ok()
                    .context(ProjectionColumnSnafu { column })?;
                indices.push(idx);
            }
            let mask = ProjectionMask::roots(
                self.metadata.metadata().file_metadata().schema_descr(),
                indices,
            );
            builder = builder.with_projection(mask);
        }

        if let Some(offset) = options.offset {
            builder = builder.with_offset(offset);
        }
        if let Some(limit) = options.limit {
            builder = builder.with_limit(limit);
        }

        builder.build().context(FooterSnafu)
    }
}

fn load_metadata(data: &Bytes) -> Result<ArrowReaderMetadata, ReadError> {
    ArrowReaderMetadata::load(data, ArrowReaderOptions::default()).context(FooterSnafu)
}

fn decode_manifest(metadata: &ArrowReaderMetadata) -> Result<Manifest, ReadError> {
    let json = metadata
        .metadata()
        .file_metadata()
        .key_value_metadata()
        .and_then(|kvs| kvs.iter().find(|kv| kv.key == MANIFEST_METADATA_KEY))
        .and_then(|kv| kv.value.as_deref())
        .context(MissingManifestSnafu)?;

    Manifest::from_json(json).context(ManifestSnafu)
}
