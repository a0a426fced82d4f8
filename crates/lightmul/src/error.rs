//! Error types for light archive operations

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or decoding a light archive.
///
/// An identifier outside the entry table is not an error: lookups for it
/// simply report that no resource exists.
#[derive(Error, Debug)]
pub enum LightError {
    /// One of the archive files does not exist.
    #[error("Archive file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Read or seek failure after the archive was opened.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Declared dimensions need more bytes than the data file holds.
    #[error(
        "Truncated light data at offset {offset:#x}: expected {expected} bytes, {available} available"
    )]
    TruncatedData {
        /// Offset of the sample run in the data file
        offset: u64,
        /// Bytes required by the record's width * height
        expected: usize,
        /// Bytes left in the data file from `offset`
        available: usize,
    },

    /// The archive has not finished loading.
    #[error("Light archive is not loaded")]
    NotReady,

    /// The archive handles were released by a reset.
    #[error("Light archive has been closed")]
    ArchiveClosed,

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Index record could not be parsed.
    #[error("Binary format error: {0}")]
    BinRw(#[from] binrw::Error),

    /// The background load worker failed to complete.
    #[error("Load task failed: {0}")]
    Task(String),
}

impl LightError {
    /// Whether this error came from reading past the end of a file.
    pub fn is_eof(&self) -> bool {
        match self {
            Self::Io(err) => err.kind() == io::ErrorKind::UnexpectedEof,
            Self::BinRw(binrw::Error::Io(err)) => err.kind() == io::ErrorKind::UnexpectedEof,
            _ => false,
        }
    }
}

/// Result type for light archive operations.
pub type Result<T> = std::result::Result<T, LightError>;
