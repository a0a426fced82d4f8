//! Light sample decoding
//!
//! Each sample is one byte. It is replicated into the three 5-bit fields of
//! a 15-bit color word, `(v << 10) | (v << 5) | v`, computed in 16 bits so
//! high bits of wide samples fall off. The word is then expanded to 8 bits
//! per channel. A zero word stays a fully transparent zero pixel; every
//! other word is forced opaque.

use crate::archive::{ArchiveCursor, IndexRecord};
use crate::error::{LightError, Result};
use tracing::debug;

/// Alpha bits of an opaque pixel.
pub const OPAQUE: u32 = 0xFF00_0000;

/// 5-bit to 8-bit channel expansion, `floor(x * 255 / 31)`.
const FIVE_TO_EIGHT: [u8; 32] = [
    0x00, 0x08, 0x10, 0x18, 0x20, 0x29, 0x31, 0x39, 0x41, 0x4A, 0x52, 0x5A, 0x62, 0x6A, 0x73, 0x7B,
    0x83, 0x8B, 0x94, 0x9C, 0xA4, 0xAC, 0xB4, 0xBD, 0xC5, 0xCD, 0xD5, 0xDE, 0xE6, 0xEE, 0xF6, 0xFF,
];

/// Decoded light bitmap.
///
/// Pixels are packed `0xAABBGGRR` words in row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl PixelBuffer {
    /// Wrap decoded pixels. Returns `None` if the length does not match the
    /// dimensions.
    pub fn new(width: u32, height: u32, pixels: Vec<u32>) -> Option<Self> {
        (pixels.len() == width as usize * height as usize).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// All pixels, row-major
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Pixel at column `x`, row `y`
    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Take ownership of the pixel words
    pub fn into_pixels(self) -> Vec<u32> {
        self.pixels
    }
}

/// Expand a 15-bit `0RRRRRGGGGGBBBBB` color into `0x00BBGGRR`.
pub const fn color16_to_32(color: u16) -> u32 {
    let r = FIVE_TO_EIGHT[((color >> 10) & 0x1F) as usize] as u32;
    let g = FIVE_TO_EIGHT[((color >> 5) & 0x1F) as usize] as u32;
    let b = FIVE_TO_EIGHT[(color & 0x1F) as usize] as u32;
    r | (g << 8) | (b << 16)
}

/// Replicate a sample into all three channel fields of a 15-bit color.
pub const fn sample_to_color16(sample: u8) -> u16 {
    let v = sample as u16;
    (v << 10) | (v << 5) | v
}

/// Convert one sample to its output pixel.
pub const fn expand_sample(sample: u8) -> u32 {
    match sample_to_color16(sample) {
        0 => 0,
        color => color16_to_32(color) | OPAQUE,
    }
}

/// Expand an already-read sample run.
///
/// Only the first `width * height` bytes are used; a shorter run fails with
/// [`LightError::TruncatedData`] where `offset` is relative to the run.
pub fn decode_run(width: u32, height: u32, run: &[u8]) -> Result<PixelBuffer> {
    let expected = width as usize * height as usize;
    let samples = run.get(..expected).ok_or(LightError::TruncatedData {
        offset: 0,
        expected,
        available: run.len(),
    })?;

    Ok(PixelBuffer {
        width,
        height,
        pixels: samples.iter().copied().map(expand_sample).collect(),
    })
}

/// Decode the light described by `record`.
///
/// Returns `Ok(None)` for an absent record without touching the data file.
/// A run that extends past the end of the data file is an error, never a
/// partially filled buffer.
pub fn decode(cursor: &mut ArchiveCursor<'_>, record: &IndexRecord) -> Result<Option<PixelBuffer>> {
    if record.is_absent() {
        return Ok(None);
    }

    let expected = record.pixel_count();
    cursor.seek(record.offset);
    let available = usize::try_from(cursor.remaining()).unwrap_or(usize::MAX);

    if available < expected {
        debug!(
            "Light run at {:#x} needs {} bytes, {} available",
            record.offset, expected, available
        );
        return Err(LightError::TruncatedData {
            offset: record.offset,
            expected,
            available,
        });
    }

    let mut run = vec![0u8; expected];
    cursor.read_exact(&mut run).map_err(|e| {
        if e.is_eof() {
            LightError::TruncatedData {
                offset: record.offset,
                expected,
                available,
            }
        } else {
            e
        }
    })?;

    decode_run(record.width, record.height, &run).map(Some)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::archive::ArchiveReader;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_expansion_table_matches_formula() {
        for (x, &expanded) in FIVE_TO_EIGHT.iter().enumerate() {
            assert_eq!(u32::from(expanded), x as u32 * 255 / 31, "channel value {x}");
        }
    }

    #[test]
    fn test_color16_to_32() {
        assert_eq!(color16_to_32(0), 0);
        assert_eq!(color16_to_32(0x7FFF), 0x00FF_FFFF);
        // Red field lands in the low byte
        assert_eq!(color16_to_32(0x1F << 10), 0x0000_00FF);
        assert_eq!(color16_to_32(0x1F << 5), 0x0000_FF00);
        assert_eq!(color16_to_32(0x1F), 0x00FF_0000);
    }

    #[test]
    fn test_sample_replication() {
        assert_eq!(sample_to_color16(0x05), 0x14A5);
        assert_eq!(sample_to_color16(0x1F), 0x7FFF);
        // High bits of wide samples are discarded in 16-bit arithmetic
        assert_eq!(sample_to_color16(0x40), 0x0840);
        assert_eq!(sample_to_color16(0xFF), 0xFFFF);
    }

    #[test]
    fn test_transparency_rule() {
        assert_eq!(expand_sample(0), 0);
        assert_eq!(expand_sample(0x1F), 0xFFFF_FFFF);
        assert_eq!(expand_sample(0x05), 0xFF29_2929);
        assert_eq!(expand_sample(0x01), 0xFF08_0808);
    }

    #[test]
    fn test_decode_scenario() {
        let mut data = vec![0xEE; 100];
        data.extend_from_slice(&[0x00, 0x1F, 0x00, 0x05]);
        let reader = ArchiveReader::from_bytes(Vec::new(), data, 0);

        let record = IndexRecord::new(100, 2, 2);
        let buffer = decode(&mut reader.cursor(), &record).unwrap().unwrap();

        assert_eq!(buffer.width(), 2);
        assert_eq!(buffer.height(), 2);
        assert_eq!(
            buffer.pixels(),
            &[0x0000_0000, 0xFFFF_FFFF, 0x0000_0000, 0xFF29_2929]
        );
        assert_eq!(buffer.pixel(1, 1), Some(0xFF29_2929));
        assert_eq!(buffer.pixel(2, 0), None);
    }

    #[test]
    fn test_decode_absent_reads_nothing() {
        let reader = ArchiveReader::from_bytes(Vec::new(), vec![1, 2, 3], 0);
        let result = decode(&mut reader.cursor(), &IndexRecord::ABSENT).unwrap();

        assert!(result.is_none());
        assert_eq!(reader.reads(), 0);
    }

    #[test]
    fn test_decode_truncated() {
        let reader = ArchiveReader::from_bytes(Vec::new(), vec![1; 10], 0);
        let record = IndexRecord::new(8, 2, 2);

        match decode(&mut reader.cursor(), &record) {
            Err(LightError::TruncatedData {
                offset,
                expected,
                available,
            }) => {
                assert_eq!(offset, 8);
                assert_eq!(expected, 4);
                assert_eq!(available, 2);
            }
            other => panic!("expected truncated data, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_offset_past_end() {
        let reader = ArchiveReader::from_bytes(Vec::new(), vec![1; 4], 0);
        let record = IndexRecord::new(1_000, 1, 1);

        assert!(matches!(
            decode(&mut reader.cursor(), &record),
            Err(LightError::TruncatedData { available: 0, .. })
        ));
    }

    #[test]
    fn test_decode_run_short_input() {
        assert!(matches!(
            decode_run(3, 3, &[1; 8]),
            Err(LightError::TruncatedData {
                expected: 9,
                available: 8,
                ..
            })
        ));
        assert_eq!(decode_run(1, 1, &[0x1F, 0x00]).unwrap().pixels(), &[0xFFFF_FFFF]);
    }

    #[test]
    fn test_pixel_buffer_length_check() {
        assert!(PixelBuffer::new(2, 2, vec![0; 4]).is_some());
        assert!(PixelBuffer::new(2, 2, vec![0; 3]).is_none());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn zero_samples_are_transparent_and_others_opaque(
                samples in prop::collection::vec(any::<u8>(), 1..256)
            ) {
                let width = samples.len() as u32;
                let buffer = decode_run(width, 1, &samples).unwrap();

                for (sample, pixel) in samples.iter().zip(buffer.pixels()) {
                    if *sample == 0 {
                        prop_assert_eq!(*pixel, 0);
                    } else {
                        prop_assert_eq!(*pixel >> 24, 0xFF);
                    }
                }
            }

            #[test]
            fn decoding_is_deterministic(
                prefix in prop::collection::vec(any::<u8>(), 0..64),
                samples in prop::collection::vec(any::<u8>(), 1..128),
                width in 1u32..8
            ) {
                let height = samples.len() as u32 / width;
                prop_assume!(height > 0);

                let offset = prefix.len() as u64;
                let mut data = prefix;
                data.extend_from_slice(&samples);
                let reader = ArchiveReader::from_bytes(Vec::new(), data, 0);
                let record = IndexRecord::new(offset, width, height);

                let first = decode(&mut reader.cursor(), &record).unwrap();
                let second = decode(&mut reader.cursor(), &record).unwrap();
                prop_assert_eq!(first, second);
            }
        }
    }
}
