//! Index record parsing
//!
//! `lightidx.mul` is a flat array of 12-byte little-endian records:
//!
//! | Field    | Type  | Notes                                     |
//! |----------|-------|-------------------------------------------|
//! | `offset` | `i32` | Start of the sample run, `-1` when unused |
//! | `length` | `i32` | Run length in bytes                       |
//! | `extra`  | `i32` | Width in the high 16 bits, height in low  |

use binrw::BinRead;

/// Size of one on-disk index record in bytes.
pub const RECORD_SIZE: usize = 12;

/// Index record exactly as stored in the index file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead)]
#[br(little)]
pub struct RawIndexRecord {
    /// Offset into the data file, negative for unused slots
    pub offset: i32,
    /// Stored run length in bytes
    pub length: i32,
    /// Packed dimensions
    pub extra: i32,
}

impl RawIndexRecord {
    /// Width packed into the high half of `extra`.
    pub const fn width(&self) -> u32 {
        ((self.extra >> 16) & 0xFFFF) as u32
    }

    /// Height packed into the low half of `extra`.
    pub const fn height(&self) -> u32 {
        (self.extra & 0xFFFF) as u32
    }

    /// Whether the slot refers to real data.
    pub const fn is_present(&self) -> bool {
        self.offset >= 0 && self.length > 0 && (self.width() != 0 || self.height() != 0)
    }

    /// Translate into the in-memory record, mapping unused slots to
    /// [`IndexRecord::ABSENT`].
    pub const fn to_record(self) -> IndexRecord {
        if self.is_present() {
            IndexRecord::new(self.offset as u64, self.width(), self.height())
        } else {
            IndexRecord::ABSENT
        }
    }
}

/// Location and dimensions of one light in the data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexRecord {
    /// Offset of the first sample; only meaningful when present
    pub offset: u64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl IndexRecord {
    /// Sentinel for slots without a resource.
    pub const ABSENT: Self = Self {
        offset: u64::MAX,
        width: 0,
        height: 0,
    };

    /// Create a record
    pub const fn new(offset: u64, width: u32, height: u32) -> Self {
        Self {
            offset,
            width,
            height,
        }
    }

    /// A record with zero width and height carries no resource.
    pub const fn is_absent(&self) -> bool {
        self.width == 0 && self.height == 0
    }

    /// Number of samples (bytes) the run occupies.
    pub const fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Offset one past the last sample.
    pub const fn end(&self) -> u64 {
        self.offset.saturating_add(self.pixel_count() as u64)
    }
}

impl Default for IndexRecord {
    fn default() -> Self {
        Self::ABSENT
    }
}
