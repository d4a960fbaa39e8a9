//! Dataset-facing writer surface.
//!
//! [`FileFormat::make_writer`](crate::format::FileFormat::make_writer)
//! returns these. The actual encoding lives in the core
//! [`SegmentWriter`]; this layer binds it to the destination locator the
//! host framework uses for bookkeeping.
use std::io::Write;

use arrow::array::RecordBatch;
use snafu::prelude::*;

use strata_core::io::writer::SegmentWriter;
use strata_core::manifest::Manifest;

use crate::error::{DatasetResult, WriteSnafu, WriterFinishedSnafu};
use crate::source::FileLocator;

/// A writer for one output file of some format.
pub trait FileWriter: Send {
    /// Append one record batch to the destination.
    fn write(&mut self, batch: &RecordBatch) -> DatasetResult<()>;

    /// Flush remaining data and close the file, returning the total row
    /// count. Fails if called more than once.
    fn finish(&mut self) -> DatasetResult<u64>;

    /// Where the output resides; bookkeeping only.
    fn locator(&self) -> &FileLocator;
}

/// Writer for one strata segment, bound to its destination locator.
pub struct StrataFileWriter {
    inner: Option<SegmentWriter<Box<dyn Write + Send>>>,
    locator: FileLocator,
}

impl StrataFileWriter {
    pub(crate) fn new(inner: SegmentWriter<Box<dyn Write + Send>>, locator: FileLocator) -> Self {
        StrataFileWriter {
            inner: Some(inner),
            locator,
        }
    }

    /// The manifest that will be recorded in the written segment, if the
    /// writer has not been finished yet.
    pub fn manifest(&self) -> Option<&Manifest> {
        self.inner.as_ref().map(SegmentWriter::manifest)
    }
}

impl FileWriter for StrataFileWriter {
    fn write(&mut self, batch: &RecordBatch) -> DatasetResult<()> {
        let writer = self.inner.as_mut().context(WriterFinishedSnafu)?;
        writer.write(batch).context(WriteSnafu)
    }

    fn finish(&mut self) -> DatasetResult<u64> {
        let writer = self.inner.take().context(WriterFinishedSnafu)?;
        writer.finish().context(WriteSnafu)
    }

    fn locator(&self) -> &FileLocator {
        &self.locator
    }
}
