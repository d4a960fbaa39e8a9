//! Error types for the dataset integration layer.
//!
//! This module centralizes the `DatasetError` enum returned by the public
//! adapter API. Failures from opening sources, parsing segment metadata,
//! and validating options all surface here synchronously; decode-time
//! failures are carried inside the batch stream instead (see
//! [`crate::format::RecordBatchStream`]). Nothing is swallowed or retried;
//! retry policy belongs to the host framework.
use snafu::prelude::*;

use strata_core::io::reader::ReadError;
use strata_core::io::writer::WriteError;
use strata_core::schema::SchemaConvertError;

use crate::source::SourceError;

/// General result type used by the dataset integration layer.
pub type DatasetResult<T> = Result<T, DatasetError>;

/// Errors from the dataset-facing format operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DatasetError {
    /// Write options failed validation: the downstream encoder assumes at
    /// least two rows per flush unit.
    #[snafu(display("write batch size must be greater than 1 (got {batch_size})"))]
    InvalidBatchSize {
        /// The rejected batch size.
        batch_size: usize,
    },

    /// The supplied fragment scan options belong to a different format.
    #[snafu(display("fragment scan options belong to format {type_name}, not strata"))]
    ForeignScanOptions {
        /// Type name reported by the foreign options object.
        type_name: String,
    },

    /// The file source could not be opened or probed.
    #[snafu(display("failed to open file source: {source}"))]
    Source {
        /// Underlying source error.
        source: SourceError,
    },

    /// Opening or reading a segment failed.
    #[snafu(display("failed to read segment: {source}"))]
    Read {
        /// Underlying segment read error.
        source: ReadError,
    },

    /// Constructing or driving a segment writer failed.
    #[snafu(display("failed to write segment: {source}"))]
    Write {
        /// Underlying segment write error.
        source: WriteError,
    },

    /// The cached manifest schema could not be converted for the host.
    #[snafu(display("cannot convert manifest schema: {source}"))]
    Schema {
        /// Underlying conversion error.
        source: SchemaConvertError,
    },

    /// `finish` was called on an already finished writer.
    #[snafu(display("writer is already finished"))]
    WriterFinished,
}
