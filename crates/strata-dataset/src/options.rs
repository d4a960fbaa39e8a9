//! Per-operation configuration: scan options, format-specific fragment
//! options, and validated write options.
use std::{any::Any, fmt, sync::Arc};

use snafu::prelude::*;

use crate::error::{DatasetResult, InvalidBatchSizeSnafu};
use crate::format::{FileFormat, STRATA_FORMAT_NAME};

/// Default number of rows per decoded batch during scans.
pub const DEFAULT_SCAN_BATCH_SIZE: usize = 1024;

/// Default rows per flush unit for writes.
pub const DEFAULT_WRITE_BATCH_SIZE: usize = 1024;

/// Format-specific scan options attached to a generic [`ScanOptions`].
///
/// The host framework holds these as trait objects and uses
/// [`is_strata_scan_options`] to decide which format may downcast them.
pub trait FragmentScanOptions: fmt::Debug + Send + Sync {
    /// Type name of the format these options belong to.
    fn type_name(&self) -> &str;

    /// Downcast hook for the owning format.
    fn as_any(&self) -> &dyn Any;
}

/// Returns true iff `options` belong to the strata format.
///
/// Pure predicate used by the host framework to safely dispatch
/// format-specific scan options; no side effects.
pub fn is_strata_scan_options(options: &dyn FragmentScanOptions) -> bool {
    options.type_name() == STRATA_FORMAT_NAME
}

/// Strata-specific scan knobs: row skipping and row limiting pushed down
/// into the segment reader.
#[derive(Clone, Debug, Default)]
pub struct StrataFragmentScanOptions {
    /// Decode at most this many rows (applied after `offset`).
    pub limit: Option<usize>,
    /// Skip this many rows before decoding.
    pub offset: Option<usize>,
}

impl FragmentScanOptions for StrataFragmentScanOptions {
    fn type_name(&self) -> &str {
        STRATA_FORMAT_NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Caller-supplied configuration for one scan operation.
#[derive(Clone, Debug)]
pub struct ScanOptions {
    /// Columns to decode, by name; `None` decodes every column.
    pub projection: Option<Vec<String>>,
    /// Number of rows per decoded batch.
    pub batch_size: usize,
    /// Optional format-specific options, dispatched by type name.
    pub fragment_scan_options: Option<Arc<dyn FragmentScanOptions>>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            projection: None,
            batch_size: DEFAULT_SCAN_BATCH_SIZE,
            fragment_scan_options: None,
        }
    }
}

/// Caller-supplied configuration for one write operation.
///
/// Carries a shared reference back to the owning format instance so the
/// host framework can route the options to the format that issued them;
/// the format instance outlives any use of its options.
#[derive(Clone)]
pub struct FileWriteOptions {
    format: Arc<dyn FileFormat>,
    /// Rows per flush unit for the written segment.
    pub batch_size: usize,
}

impl FileWriteOptions {
    /// Create options owned by `format` with the default batch size.
    pub fn new(format: Arc<dyn FileFormat>) -> Self {
        FileWriteOptions {
            format,
            batch_size: DEFAULT_WRITE_BATCH_SIZE,
        }
    }

    /// Replace the batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// The format instance these options belong to.
    pub fn format(&self) -> &Arc<dyn FileFormat> {
        &self.format
    }

    /// Check the options before any writer is constructed.
    ///
    /// Batches of 0 or 1 rows are rejected: the downstream encoder assumes
    /// at least two rows per flush unit for its run-length and dictionary
    /// strategies.
    pub fn validate(&self) -> DatasetResult<()> {
        ensure!(
            self.batch_size > 1,
            InvalidBatchSizeSnafu {
                batch_size: self.batch_size,
            }
        );
        Ok(())
    }
}

impl fmt::Debug for FileWriteOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileWriteOptions")
            .field("format", &self.format.type_name())
            .field("batch_size", &self.batch_size)
            .finish()
    }
}
