//! Core engine for the strata columnar segment format.
//!
//! A strata segment is a Parquet container that carries a JSON-encoded
//! manifest in its footer key/value metadata. The manifest is the
//! authoritative description of the segment: a logical schema plus format
//! bookkeeping (version, creation time). This crate provides:
//!
//! - The logical schema model and its Arrow conversions (`schema` module).
//! - The manifest type and its footer encoding (`manifest` module).
//! - Physical segment I/O: a footer-parsing reader, a manifest-embedding
//!   writer, and a bridge that exposes the synchronous pull reader as a
//!   lazy, strictly-ordered asynchronous batch stream scheduled on a shared
//!   worker pool (`io` module).
//!
//! Integration with a dataset-scanning framework (sources, fragments, scan
//! and write options) lives in the `strata-dataset` crate, which depends on
//! this one rather than re-implementing segment I/O.
#![deny(missing_docs)]
pub mod io;
pub mod manifest;
pub mod schema;
