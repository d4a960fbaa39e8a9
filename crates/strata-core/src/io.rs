//! Physical segment I/O.
//!
//! - [`reader`]: footer-parsing segment reader and per-scan read options.
//! - [`writer`]: manifest-embedding segment writer.
//! - [`stream`]: bridge from the synchronous pull reader to a lazy,
//!   strictly-ordered asynchronous batch stream.
pub mod reader;
pub mod stream;
pub mod writer;

#[cfg(test)]
pub(crate) mod test_util;
