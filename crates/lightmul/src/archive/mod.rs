//! Light archive file handling
//!
//! A light archive is a pair of files: `lightidx.mul`, a fixed-count array
//! of index records, and `light.mul`, the raw 8-bit samples those records
//! point into.

mod reader;
mod record;

pub use reader::{ArchiveCursor, ArchiveReader, ReadSeek};
pub use record::{IndexRecord, RECORD_SIZE, RawIndexRecord};
