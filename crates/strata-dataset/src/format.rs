//! The strata format adapter.
//!
//! [`StrataFileFormat`] is the one concrete implementation of the
//! [`FileFormat`] capability trait: identify, inspect, scan, make a writer.
//! It owns a single lazily resolved manifest per instance (the host
//! framework instantiates one format per dataset), shared by schema
//! inspection and every subsequent scan against that dataset.
use std::io::Write;
use std::pin::Pin;
use std::sync::Arc;

use arrow::array::RecordBatch;
use arrow::datatypes::SchemaRef;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use snafu::prelude::*;
use tokio::runtime::Handle;
use tokio::sync::OnceCell;

use strata_core::io::reader::{ReadOptions, SegmentReader};
use strata_core::io::stream::BatchStream;
use strata_core::io::writer::SegmentWriter;
use strata_core::manifest::Manifest;

use crate::error::{
    DatasetError, DatasetResult, ForeignScanOptionsSnafu, ReadSnafu, SchemaSnafu, SourceSnafu,
    WriteSnafu,
};
use crate::options::{
    FileWriteOptions, ScanOptions, StrataFragmentScanOptions, is_strata_scan_options,
};
use crate::source::{FileFragment, FileLocator, FileSource};
use crate::writer::{FileWriter, StrataFileWriter};

/// Stable type name identifying the strata format.
pub const STRATA_FORMAT_NAME: &str = "strata";

/// Magic bytes of the physical segment container, probed at both ends of a
/// source by [`FileFormat::supports`].
const SEGMENT_MAGIC: &[u8; 4] = b"PAR1";

/// A lazy, single-pass stream of decoded record batches for one fragment.
///
/// Returned by [`FileFormat::scan_batches`] without any data having been
/// read; consuming it drives decoding and I/O. Decode-time failures surface
/// as stream items and terminate the stream.
pub type RecordBatchStream = Pin<Box<dyn Stream<Item = DatasetResult<RecordBatch>> + Send>>;

/// The operations a file format contributes to the dataset framework.
///
/// A format is exactly this capability set; there is one concrete
/// implementing type per format, dispatched through trait objects.
#[async_trait]
pub trait FileFormat: Send + Sync {
    /// Constant name identifying the format; used for dispatch and logging.
    fn type_name(&self) -> &'static str;

    /// Format-kind equality: true iff `other` reports the same type name.
    ///
    /// This is a coarse equivalence over format kinds, not configuration
    /// equality between instances.
    fn equals(&self, other: &dyn FileFormat) -> bool {
        self.type_name() == other.type_name()
    }

    /// Cheap probe of whether `source` looks like this format.
    async fn supports(&self, source: &FileSource) -> DatasetResult<bool>;

    /// Discover the schema of `source`, resolving and caching its manifest
    /// on first use.
    async fn inspect(&self, source: &FileSource) -> DatasetResult<SchemaRef>;

    /// Open `fragment` for scanning and return a lazy batch stream.
    async fn scan_batches(
        &self,
        options: &ScanOptions,
        fragment: &FileFragment,
    ) -> DatasetResult<RecordBatchStream>;

    /// Construct a writer bound to an already-open destination stream.
    ///
    /// `options` are expected to have passed [`FileWriteOptions::validate`]
    /// before the host hands them here; `locator` is bookkeeping only. No
    /// data is flushed at construction time.
    fn make_writer(
        &self,
        destination: Box<dyn Write + Send>,
        schema: SchemaRef,
        options: &FileWriteOptions,
        locator: FileLocator,
    ) -> DatasetResult<Box<dyn FileWriter>>;
}

/// The strata format instance.
///
/// Stateless apart from one cached manifest, which is populated at most
/// once (by the first successful [`FileFormat::inspect`]) and read-only
/// afterwards. Mixing sources with different metadata across one instance
/// is outside the design; the host instantiates one format per dataset.
#[derive(Debug, Default)]
pub struct StrataFileFormat {
    manifest: OnceCell<Arc<Manifest>>,
}

impl StrataFileFormat {
    /// Create a format instance with an empty manifest cache.
    pub fn new() -> Self {
        StrataFileFormat {
            manifest: OnceCell::new(),
        }
    }

    /// The cached manifest, if an `inspect` has resolved one.
    pub fn cached_manifest(&self) -> Option<Arc<Manifest>> {
        self.manifest.get().cloned()
    }

    /// Write options owned by this instance, with defaults applied.
    pub fn default_write_options(self: Arc<Self>) -> FileWriteOptions {
        FileWriteOptions::new(self)
    }

    /// Resolve the manifest for `source`, parsing its footer at most once
    /// per instance.
    ///
    /// Concurrent first-time callers are serialized by the cell: a single
    /// physical parse runs and every caller observes the same final value.
    async fn resolve_manifest(&self, source: &FileSource) -> DatasetResult<Arc<Manifest>> {
        self.manifest
            .get_or_try_init(|| async {
                let data = source.open().await.context(SourceSnafu)?;
                let reader = SegmentReader::open(data).context(ReadSnafu)?;
                let manifest = Arc::clone(reader.manifest());
                log::debug!(
                    "resolved manifest for {source}: {} columns, format version {}",
                    manifest.schema().fields().len(),
                    manifest.format_version(),
                );
                Ok(manifest)
            })
            .await
            .cloned()
    }
}

#[async_trait]
impl FileFormat for StrataFileFormat {
    fn type_name(&self) -> &'static str {
        STRATA_FORMAT_NAME
    }

    async fn supports(&self, source: &FileSource) -> DatasetResult<bool> {
        let probe = source.head_tail().await.context(SourceSnafu)?;
        Ok(probe.len >= 8 && &probe.head == SEGMENT_MAGIC && &probe.tail == SEGMENT_MAGIC)
    }

    async fn inspect(&self, source: &FileSource) -> DatasetResult<SchemaRef> {
        let manifest = self.resolve_manifest(source).await?;
        manifest.arrow_schema_ref().context(SchemaSnafu)
    }

    async fn scan_batches(
        &self,
        options: &ScanOptions,
        fragment: &FileFragment,
    ) -> DatasetResult<RecordBatchStream> {
        let read_options = to_read_options(options)?;

        let data = fragment.source().open().await.context(SourceSnafu)?;
        let reader = match self.cached_manifest() {
            Some(manifest) => SegmentReader::open_with_manifest(data, manifest),
            None => SegmentReader::open(data),
        }
        .context(ReadSnafu)?;

        let stream = BatchStream::open(&reader, &read_options, Handle::current())
            .context(ReadSnafu)?;

        Ok(Box::pin(
            stream
                .into_stream()
                .map_err(|source| DatasetError::Read { source }),
        ))
    }

    fn make_writer(
        &self,
        destination: Box<dyn Write + Send>,
        schema: SchemaRef,
        options: &FileWriteOptions,
        locator: FileLocator,
    ) -> DatasetResult<Box<dyn FileWriter>> {
        let writer =
            SegmentWriter::new(destination, schema, options.batch_size).context(WriteSnafu)?;
        Ok(Box::new(StrataFileWriter::new(writer, locator)))
    }
}

/// Map generic scan options (plus any attached strata-specific fragment
/// options) onto the segment reader's options.
fn to_read_options(options: &ScanOptions) -> DatasetResult<ReadOptions> {
    let mut read = ReadOptions {
        projection: options.projection.clone(),
        batch_size: options.batch_size,
        ..ReadOptions::default()
    };

    if let Some(fso) = options.fragment_scan_options.as_deref() {
        ensure!(
            is_strata_scan_options(fso),
            ForeignScanOptionsSnafu {
                type_name: fso.type_name(),
            }
        );
        if let Some(strata) = fso.as_any().downcast_ref::<StrataFragmentScanOptions>() {
            read.limit = strata.limit;
            read.offset = strata.offset;
        }
    }

    Ok(read)
}
