//! Bridge from the synchronous pull reader to an asynchronous batch stream.
//!
//! The host scanning framework drives scans on a shared, process-wide
//! worker pool; this module owns no threads. [`BatchStream::open`] validates
//! the scan options against an opened segment and captures the pool handle;
//! [`BatchStream::into_stream`] produces a lazy stream where every pull
//! schedules exactly one "produce next batch" unit of work on the pool.
//! Because the next unit is only scheduled once the previous one has
//! resolved, batches arrive in the same order the pull reader would produce
//! them synchronously. The pool only decides *when* work runs, never in
//! what order results are delivered.
use std::pin::Pin;

use arrow::array::{RecordBatch, RecordBatchReader};
use arrow::datatypes::SchemaRef;
use futures::Stream;
use parquet::arrow::arrow_reader::ParquetRecordBatchReader;
use tokio::runtime::Handle;

use crate::io::reader::{ReadError, ReadOptions, SegmentReader};

/// A boxed, single-pass stream of decoded record batches.
///
/// Decode failures surface as stream items at the point of consumption; the
/// stream terminates after yielding an error because the underlying pull
/// reader is not restartable mid-file.
pub type BoxedBatchStream = Pin<Box<dyn Stream<Item = Result<RecordBatch, ReadError>> + Send>>;

/// An opened scan over one segment, ready to be consumed asynchronously.
pub struct BatchStream {
    reader: ParquetRecordBatchReader,
    pool: Handle,
}

impl BatchStream {
    /// Validate `options` against the segment and bind the scan to a
    /// worker-pool handle.
    ///
    /// Incompatible options (unknown projected columns, zero batch size)
    /// fail here, synchronously, before any batch exists.
    pub fn open(
        segment: &SegmentReader,
        options: &ReadOptions,
        pool: Handle,
    ) -> Result<Self, ReadError> {
        let reader = segment.batch_reader(options)?;
        Ok(BatchStream { reader, pool })
    }

    /// The schema of the batches this scan will produce (projection
    /// applied).
    pub fn schema(&self) -> SchemaRef {
        self.reader.schema()
    }

    /// Turn the opened scan into a lazy asynchronous stream.
    ///
    /// Nothing is decoded until the first poll. Abandoning the stream lets
    /// any in-flight unit run to completion and discards its result.
    pub fn into_stream(self) -> BoxedBatchStream {
        let BatchStream { reader, pool } = self;

        Box::pin(futures::stream::unfold(
            Some((reader, pool)),
            |state| async move {
                let (mut reader, pool) = state?;

                let unit = pool.spawn_blocking(move || {
                    let item = reader.next();
                    (reader, item)
                });

                match unit.await {
                    Ok((reader, Some(Ok(batch)))) => Some((Ok(batch), Some((reader, pool)))),
                    Ok((_, Some(Err(source)))) => Some((Err(ReadError::Decode { source }), None)),
                    Ok((_, None)) => None,
                    Err(source) => {
                        log::warn!("batch decode task did not complete: {source}");
                        Some((Err(ReadError::Scheduling { source }), None))
                    }
                }
            },
        ))
    }
}
