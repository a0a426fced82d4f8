//! Archive reader with memory mapping support

use super::record::{IndexRecord, RECORD_SIZE, RawIndexRecord};
use crate::error::{LightError, Result};
use binrw::BinRead;
use memmap2::Mmap;
use parking_lot::{Mutex, MutexGuard};
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace, warn};

/// Readable and seekable byte stream.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// Backing storage for the data file
enum DataSource {
    Mapped(Mmap),
    Stream(Box<dyn ReadSeek>),
    Closed,
}

impl DataSource {
    fn read_at(&mut self, position: u64, buf: &mut [u8]) -> Result<()> {
        match self {
            Self::Mapped(map) => {
                let range = usize::try_from(position)
                    .ok()
                    .and_then(|start| Some(start..start.checked_add(buf.len())?));
                let src = range
                    .and_then(|range| map.get(range))
                    .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))?;
                buf.copy_from_slice(src);
                Ok(())
            }
            Self::Stream(stream) => {
                stream.seek(SeekFrom::Start(position))?;
                stream.read_exact(buf)?;
                Ok(())
            }
            Self::Closed => Err(LightError::ArchiveClosed),
        }
    }
}

struct DataState {
    source: DataSource,
    len: u64,
    position: u64,
}

/// Reader over an index/data file pair.
///
/// The index handle is used once to build the entry table; the data handle
/// stays open until [`ArchiveReader::close`] for on-demand decoding. Access
/// to the data handle goes through [`ArchiveCursor`], which holds a lock for
/// its lifetime so a seek and the reads that follow it cannot interleave
/// with another caller's.
pub struct ArchiveReader {
    index: Mutex<Option<Box<dyn ReadSeek>>>,
    index_len: u64,
    data: Mutex<DataState>,
    max_count: usize,
    reads: AtomicU64,
    memory_mapped: bool,
}

impl ArchiveReader {
    /// Open an index/data file pair
    #[allow(unsafe_code)]
    pub fn open(
        index_path: &Path,
        data_path: &Path,
        max_count: usize,
        use_memory_mapping: bool,
    ) -> Result<Self> {
        let index_file = open_file(index_path)?;
        let data_file = open_file(data_path)?;

        let index_len = index_file.metadata()?.len();
        let data_len = data_file.metadata()?.len();

        debug!(
            "Opening light archive: index={:?} ({} bytes), data={:?} ({} bytes)",
            index_path, index_len, data_path, data_len
        );

        let source = if use_memory_mapping && data_len > 0 {
            // SAFETY: the mapping is read-only and the archive files are not
            // modified while a loader holds them open.
            match unsafe { Mmap::map(&data_file) } {
                Ok(map) => {
                    debug!("Memory-mapped light data file");
                    DataSource::Mapped(map)
                }
                Err(e) => {
                    debug!("Failed to memory-map light data, using file reader: {}", e);
                    DataSource::Stream(Box::new(BufReader::new(data_file)))
                }
            }
        } else {
            DataSource::Stream(Box::new(BufReader::new(data_file)))
        };

        Ok(Self::from_parts(
            Box::new(BufReader::new(index_file)),
            index_len,
            source,
            data_len,
            max_count,
        ))
    }

    /// Build a reader over in-memory index and data bytes
    pub fn from_bytes(index: Vec<u8>, data: Vec<u8>, max_count: usize) -> Self {
        let index_len = index.len() as u64;
        let data_len = data.len() as u64;
        Self::from_parts(
            Box::new(Cursor::new(index)),
            index_len,
            DataSource::Stream(Box::new(Cursor::new(data))),
            data_len,
            max_count,
        )
    }

    fn from_parts(
        index: Box<dyn ReadSeek>,
        index_len: u64,
        source: DataSource,
        data_len: u64,
        max_count: usize,
    ) -> Self {
        let memory_mapped = matches!(source, DataSource::Mapped(_));
        Self {
            index: Mutex::new(Some(index)),
            index_len,
            data: Mutex::new(DataState {
                source,
                len: data_len,
                position: 0,
            }),
            max_count,
            reads: AtomicU64::new(0),
            memory_mapped,
        }
    }

    /// Read `max_count` index records.
    ///
    /// Slots past the end of a short index file are absent. Records beyond
    /// `max_count` are ignored.
    pub fn read_index_records(&self) -> Result<Vec<IndexRecord>> {
        let mut guard = self.index.lock();
        let stream = guard.as_mut().ok_or(LightError::ArchiveClosed)?;
        stream.seek(SeekFrom::Start(0))?;

        let stored = usize::try_from(self.index_len / RECORD_SIZE as u64).unwrap_or(usize::MAX);
        if self.index_len % RECORD_SIZE as u64 != 0 {
            warn!(
                "Light index has {} trailing bytes, ignoring partial record",
                self.index_len % RECORD_SIZE as u64
            );
        }
        let readable = stored.min(self.max_count);

        let mut records = Vec::with_capacity(self.max_count);
        for id in 0..readable {
            let raw = RawIndexRecord::read(stream)?;
            if raw.offset >= 0 && !raw.is_present() {
                trace!("Light slot {} has offset {} but no dimensions", id, raw.offset);
            }
            records.push(raw.to_record());
        }
        records.resize(self.max_count, IndexRecord::ABSENT);

        debug!(
            "Read {} light index records ({} stored, {} requested)",
            readable, stored, self.max_count
        );
        Ok(records)
    }

    /// Lock the data file for a seek-and-read sequence
    pub fn cursor(&self) -> ArchiveCursor<'_> {
        ArchiveCursor {
            state: self.data.lock(),
            reads: &self.reads,
        }
    }

    /// Size of the data file in bytes, zero once closed
    pub fn data_len(&self) -> u64 {
        self.data.lock().len
    }

    /// Configured number of index slots
    pub fn max_count(&self) -> usize {
        self.max_count
    }

    /// Number of sample runs read from the data file
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Check if memory mapping is in use
    pub fn is_memory_mapped(&self) -> bool {
        self.memory_mapped
    }

    /// Whether [`ArchiveReader::close`] has been called
    pub fn is_closed(&self) -> bool {
        matches!(self.data.lock().source, DataSource::Closed)
    }

    /// Release both file handles.
    ///
    /// Waits for an in-progress cursor to finish. Calling it again is a no-op.
    pub fn close(&self) {
        let mut data = self.data.lock();
        if matches!(data.source, DataSource::Closed) {
            return;
        }
        data.source = DataSource::Closed;
        data.len = 0;
        data.position = 0;
        drop(data);

        self.index.lock().take();
        debug!("Closed light archive handles");
    }
}

fn open_file(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => LightError::FileNotFound(path.to_path_buf()),
        _ => LightError::Io(e),
    })
}

/// Exclusive access to the data file.
pub struct ArchiveCursor<'a> {
    state: MutexGuard<'a, DataState>,
    reads: &'a AtomicU64,
}

impl ArchiveCursor<'_> {
    /// Move to an absolute offset in the data file
    pub fn seek(&mut self, offset: u64) {
        self.state.position = offset;
    }

    /// Current offset
    pub fn position(&self) -> u64 {
        self.state.position
    }

    /// Bytes left between the current offset and the end of the data file
    pub fn remaining(&self) -> u64 {
        self.state.len.saturating_sub(self.state.position)
    }

    /// Read one byte and advance
    pub fn read_byte(&mut self) -> Result<u8> {
        let mut byte = [0u8; 1];
        self.read_at_position(&mut byte)?;
        Ok(byte[0])
    }

    /// Fill `buf` from the current offset and advance past it
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.read_at_position(buf)
    }

    fn read_at_position(&mut self, buf: &mut [u8]) -> Result<()> {
        let state = &mut *self.state;
        state.source.read_at(state.position, buf)?;
        state.position += buf.len() as u64;
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn index_bytes(records: &[(i32, i32, u16, u16)]) -> Vec<u8> {
        let mut bytes = Vec::new();
        for &(offset, length, width, height) in records {
            let extra = (i32::from(width) << 16) | i32::from(height);
            bytes.extend_from_slice(&offset.to_le_bytes());
            bytes.extend_from_slice(&length.to_le_bytes());
            bytes.extend_from_slice(&extra.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn test_short_index_pads_with_absent() {
        let index = index_bytes(&[(0, 4, 2, 2), (-1, 0, 0, 0), (4, 1, 1, 1)]);
        let reader = ArchiveReader::from_bytes(index, vec![1; 5], 5);

        let records = reader.read_index_records().unwrap();
        assert_eq!(records.len(), 5);
        assert_eq!(records[0], IndexRecord::new(0, 2, 2));
        assert!(records[1].is_absent());
        assert_eq!(records[2], IndexRecord::new(4, 1, 1));
        assert!(records[3].is_absent());
        assert!(records[4].is_absent());
    }

    #[test]
    fn test_long_index_is_truncated_to_max_count() {
        let index = index_bytes(&[(0, 1, 1, 1), (1, 1, 1, 1), (2, 1, 1, 1)]);
        let reader = ArchiveReader::from_bytes(index, vec![1; 3], 2);

        let records = reader.read_index_records().unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_partial_trailing_record_is_ignored() {
        let mut index = index_bytes(&[(0, 1, 1, 1)]);
        index.extend_from_slice(&[0xAA; 5]);
        let reader = ArchiveReader::from_bytes(index, vec![1], 2);

        let records = reader.read_index_records().unwrap();
        assert_eq!(records[0], IndexRecord::new(0, 1, 1));
        assert!(records[1].is_absent());
    }

    #[test]
    fn test_seek_and_read() {
        let reader = ArchiveReader::from_bytes(Vec::new(), vec![10, 20, 30, 40], 0);
        let mut cursor = reader.cursor();

        cursor.seek(2);
        assert_eq!(cursor.read_byte().unwrap(), 30);
        assert_eq!(cursor.position(), 3);
        assert_eq!(cursor.remaining(), 1);
        assert_eq!(cursor.read_byte().unwrap(), 40);

        let err = cursor.read_byte().unwrap_err();
        assert!(err.is_eof());
    }

    #[test]
    fn test_read_counter() {
        let reader = ArchiveReader::from_bytes(Vec::new(), vec![0; 8], 0);
        assert_eq!(reader.reads(), 0);

        let mut buf = [0u8; 4];
        reader.cursor().read_exact(&mut buf).unwrap();
        reader.cursor().read_exact(&mut buf).unwrap();
        assert_eq!(reader.reads(), 2);
    }

    #[test]
    fn test_close_is_idempotent() {
        let reader = ArchiveReader::from_bytes(index_bytes(&[(0, 1, 1, 1)]), vec![7], 1);
        reader.close();
        reader.close();

        assert!(reader.is_closed());
        assert_eq!(reader.data_len(), 0);
        assert!(matches!(
            reader.cursor().read_byte(),
            Err(LightError::ArchiveClosed)
        ));
        assert!(matches!(
            reader.read_index_records(),
            Err(LightError::ArchiveClosed)
        ));
    }

    #[test]
    fn test_open_missing_file() {
        let dir = TempDir::new().unwrap();
        let index_path = dir.path().join("lightidx.mul");
        std::fs::write(&index_path, index_bytes(&[(0, 1, 1, 1)])).unwrap();

        let result = ArchiveReader::open(&index_path, &dir.path().join("light.mul"), 1, true);
        assert!(matches!(result, Err(LightError::FileNotFound(p)) if p.ends_with("light.mul")));
    }

    #[test]
    fn test_open_with_and_without_mmap() {
        let dir = TempDir::new().unwrap();
        let index_path = dir.path().join("lightidx.mul");
        let data_path = dir.path().join("light.mul");
        std::fs::write(&index_path, index_bytes(&[(1, 2, 2, 1)])).unwrap();
        let mut data = File::create(&data_path).unwrap();
        data.write_all(&[0, 5, 6]).unwrap();
        drop(data);

        for use_mmap in [true, false] {
            let reader = ArchiveReader::open(&index_path, &data_path, 1, use_mmap).unwrap();
            assert_eq!(reader.is_memory_mapped(), use_mmap);
            assert_eq!(reader.data_len(), 3);

            let records = reader.read_index_records().unwrap();
            assert_eq!(records, vec![IndexRecord::new(1, 2, 1)]);

            let mut cursor = reader.cursor();
            cursor.seek(1);
            let mut buf = [0u8; 2];
            cursor.read_exact(&mut buf).unwrap();
            assert_eq!(buf, [5, 6]);

            let mut past_end = [0u8; 3];
            cursor.seek(1);
            assert!(cursor.read_exact(&mut past_end).unwrap_err().is_eof());
        }
    }

    #[test]
    fn test_empty_data_file_is_not_mapped() {
        let dir = TempDir::new().unwrap();
        let index_path = dir.path().join("lightidx.mul");
        let data_path = dir.path().join("light.mul");
        std::fs::write(&index_path, b"").unwrap();
        std::fs::write(&data_path, b"").unwrap();

        let reader = ArchiveReader::open(&index_path, &data_path, 4, true).unwrap();
        assert!(!reader.is_memory_mapped());
        assert!(reader.read_index_records().unwrap().iter().all(IndexRecord::is_absent));
    }
}
