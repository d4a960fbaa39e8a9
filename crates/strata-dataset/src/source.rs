//! File sources, fragments, and destination locators.
//!
//! A [`FileSource`] is an openable byte stream plus enough identity to be
//! reopened; the dataset framework supplies one per physical file. This
//! module currently backs sources with the local filesystem or an in-memory
//! buffer. The API is shaped so future backends (for example, object
//! storage) can be introduced without rewriting the format adapter.
use std::{
    fmt,
    io::{self, SeekFrom},
    path::PathBuf,
};

use bytes::Bytes;
use snafu::{Backtrace, prelude::*};
use tokio::{
    fs,
    io::{AsyncReadExt, AsyncSeekExt},
};

/// Errors raised while opening or probing a file source.
#[derive(Debug, Snafu)]
pub enum SourceError {
    /// The source does not exist (or is not a regular file).
    #[snafu(display("source not found: {path}"))]
    NotFound {
        /// The path that was not found.
        path: String,
        /// Underlying I/O error.
        source: io::Error,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// Any other I/O failure while reading the source.
    #[snafu(display("I/O error reading {path}: {source}"))]
    Io {
        /// The path where the I/O error occurred.
        path: String,
        /// Underlying I/O error.
        source: io::Error,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },
}

/// Small probe result used by format sniffing: a source's length and its
/// first and last 4 bytes.
pub struct HeadTail {
    /// Length of the source in bytes.
    pub len: u64,
    /// First 4 bytes (zero-filled if the source is shorter).
    pub head: [u8; 4],
    /// Last 4 bytes (zero-filled if the source is shorter than 8 bytes).
    pub tail: [u8; 4],
}

/// An openable byte stream plus the identity needed to reopen it.
#[derive(Clone, Debug)]
pub enum FileSource {
    /// A file on the local filesystem.
    Local(PathBuf),
    /// An in-memory buffer, identified by a display name.
    Buffer {
        /// Display name used for identity and error messages.
        name: String,
        /// The full contents of the source.
        data: Bytes,
    },
}

impl FileSource {
    /// Create a source backed by a local file.
    pub fn local(path: impl Into<PathBuf>) -> Self {
        FileSource::Local(path.into())
    }

    /// Create a source backed by an in-memory buffer.
    pub fn buffer(name: impl Into<String>, data: Bytes) -> Self {
        FileSource::Buffer {
            name: name.into(),
            data,
        }
    }

    /// Open the source and return its full contents.
    pub async fn open(&self) -> Result<Bytes, SourceError> {
        match self {
            FileSource::Local(path) => {
                let path_str = path.display().to_string();
                match fs::read(path).await {
                    Ok(bytes) => Ok(Bytes::from(bytes)),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {
                        Err(e).context(NotFoundSnafu { path: path_str })
                    }
                    Err(e) => Err(e).context(IoSnafu { path: path_str }),
                }
            }
            FileSource::Buffer { data, .. } => Ok(data.clone()),
        }
    }

    /// Read the source's length and its first/last 4 bytes without reading
    /// the whole stream.
    ///
    /// For sources shorter than 4 bytes both `head` and `tail` stay
    /// zero-filled; between 4 and 7 bytes only `head` is filled, since the
    /// two reads would overlap. Callers that need distinct head/tail magic
    /// must check `len >= 8` first.
    pub async fn head_tail(&self) -> Result<HeadTail, SourceError> {
        match self {
            FileSource::Local(path) => {
                let path_str = path.display().to_string();

                let meta = match fs::metadata(path).await {
                    Ok(m) => m,
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {
                        return Err(e).context(NotFoundSnafu { path: path_str });
                    }
                    Err(e) => return Err(e).context(IoSnafu { path: path_str }),
                };

                // Non-regular file: semantic "not found", no real OS error.
                if !meta.is_file() {
                    return Err(io::Error::other("not a regular file"))
                        .context(NotFoundSnafu { path: path_str });
                }

                let len = meta.len();
                let mut head = [0u8; 4];
                let mut tail = [0u8; 4];

                let mut file = fs::File::open(path).await.context(IoSnafu {
                    path: path_str.clone(),
                })?;

                if len >= 4 {
                    file.read_exact(&mut head).await.context(IoSnafu {
                        path: path_str.clone(),
                    })?;
                }
                if len >= 8 {
                    file.seek(SeekFrom::End(-4)).await.context(IoSnafu {
                        path: path_str.clone(),
                    })?;
                    file.read_exact(&mut tail).await.context(IoSnafu {
                        path: path_str.clone(),
                    })?;
                }

                Ok(HeadTail { len, head, tail })
            }

            FileSource::Buffer { data, .. } => {
                let len = data.len() as u64;
                let mut head = [0u8; 4];
                let mut tail = [0u8; 4];

                if len >= 4 {
                    head.copy_from_slice(&data[..4]);
                }
                if len >= 8 {
                    tail.copy_from_slice(&data[data.len() - 4..]);
                }

                Ok(HeadTail { len, head, tail })
            }
        }
    }
}

impl fmt::Display for FileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileSource::Local(path) => write!(f, "{}", path.display()),
            FileSource::Buffer { name, .. } => write!(f, "{name}"),
        }
    }
}

/// A reference to one physical file within a logical dataset.
#[derive(Clone, Debug)]
pub struct FileFragment {
    source: FileSource,
}

impl FileFragment {
    /// Create a fragment over the given source.
    pub fn new(source: FileSource) -> Self {
        FileFragment { source }
    }

    /// The source this fragment is scanned from.
    pub fn source(&self) -> &FileSource {
        &self.source
    }
}

/// Describes where a written file resides; bookkeeping only, never used
/// for the write itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileLocator {
    path: String,
}

impl FileLocator {
    /// Create a locator for the given destination path.
    pub fn new(path: impl Into<String>) -> Self {
        FileLocator { path: path.into() }
    }

    /// The destination path this locator records.
    pub fn path(&self) -> &str {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[tokio::test]
    async fn open_local_returns_contents() -> TestResult {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("data.bin");
        tokio::fs::write(&path, b"hello strata").await?;

        let source = FileSource::local(&path);
        let bytes = source.open().await?;
        assert_eq!(bytes.as_ref(), b"hello strata");
        Ok(())
    }

    #[tokio::test]
    async fn open_local_missing_file_is_not_found() -> TestResult {
        let tmp = TempDir::new()?;
        let source = FileSource::local(tmp.path().join("missing.bin"));

        let err = source.open().await.unwrap_err();
        assert!(matches!(err, SourceError::NotFound { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn open_buffer_returns_data() -> TestResult {
        let source = FileSource::buffer("mem", Bytes::from_static(b"abcd1234"));
        let bytes = source.open().await?;
        assert_eq!(bytes.as_ref(), b"abcd1234");
        Ok(())
    }

    #[tokio::test]
    async fn head_tail_reads_both_ends() -> TestResult {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("probe.bin");
        tokio::fs::write(&path, b"HEADxxxxxxxxTAIL").await?;

        let probe = FileSource::local(&path).head_tail().await?;
        assert_eq!(probe.len, 16);
        assert_eq!(&probe.head, b"HEAD");
        assert_eq!(&probe.tail, b"TAIL");
        Ok(())
    }

    #[tokio::test]
    async fn head_tail_short_file_stays_zero_filled() -> TestResult {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("tiny.bin");
        tokio::fs::write(&path, b"ab").await?;

        let probe = FileSource::local(&path).head_tail().await?;
        assert_eq!(probe.len, 2);
        assert_eq!(probe.head, [0u8; 4]);
        assert_eq!(probe.tail, [0u8; 4]);
        Ok(())
    }

    #[tokio::test]
    async fn head_tail_mid_size_file_fills_head_only() -> TestResult {
        let probe = FileSource::buffer("mem", Bytes::from_static(b"abcdef"))
            .head_tail()
            .await?;
        assert_eq!(probe.len, 6);
        assert_eq!(&probe.head, b"abcd");
        assert_eq!(probe.tail, [0u8; 4]);
        Ok(())
    }

    #[tokio::test]
    async fn head_tail_directory_is_not_found() -> TestResult {
        let tmp = TempDir::new()?;
        let err = FileSource::local(tmp.path()).head_tail().await.err().unwrap();
        assert!(matches!(err, SourceError::NotFound { .. }));
        Ok(())
    }

    #[test]
    fn display_uses_path_or_name() {
        let local = FileSource::local("/tmp/seg.strata");
        assert_eq!(local.to_string(), "/tmp/seg.strata");

        let buffer = FileSource::buffer("in-memory", Bytes::new());
        assert_eq!(buffer.to_string(), "in-memory");
    }
}
