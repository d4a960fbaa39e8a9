//! Dataset-framework integration for the strata segment format.
//!
//! This crate exposes strata segments to a generic dataset-scanning
//! framework. It defines the framework boundary (file sources, fragments,
//! scan and write options, the [`FileFormat`] capability trait) and the one
//! concrete format implementation, [`StrataFileFormat`], which:
//!
//! - identifies the format by a stable type name,
//! - discovers a source's schema through a lazily cached manifest,
//! - turns a file fragment into a lazy, asynchronously driven stream of
//!   record batches scheduled on the shared worker pool,
//! - gates writer construction behind validated write options.
//!
//! Segment I/O itself lives in `strata-core`; this crate only orchestrates
//! it and adapts its results to the shapes the host framework expects.
#![deny(missing_docs)]
pub mod error;
pub mod format;
pub mod options;
pub mod source;
pub mod writer;

pub use error::{DatasetError, DatasetResult};
pub use format::{FileFormat, RecordBatchStream, STRATA_FORMAT_NAME, StrataFileFormat};
pub use options::{
    FileWriteOptions, FragmentScanOptions, ScanOptions, StrataFragmentScanOptions,
    is_strata_scan_options,
};
pub use source::{FileFragment, FileLocator, FileSource};
pub use writer::{FileWriter, StrataFileWriter};
