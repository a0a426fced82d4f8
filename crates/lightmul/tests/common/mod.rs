//! Shared fixtures for integration tests

#![allow(dead_code)]

use lightmul::LightsConfig;
use std::path::Path;
use tempfile::TempDir;

/// One light to place in a fixture archive.
pub struct FixtureLight {
    pub id: usize,
    pub width: u16,
    pub height: u16,
    pub samples: Vec<u8>,
}

impl FixtureLight {
    pub fn new(id: usize, width: u16, height: u16, samples: &[u8]) -> Self {
        Self {
            id,
            width,
            height,
            samples: samples.to_vec(),
        }
    }
}

/// Encode one index record
pub fn record_bytes(offset: i32, length: i32, width: u16, height: u16) -> [u8; 12] {
    let extra = (i32::from(width) << 16) | i32::from(height);
    let mut bytes = [0u8; 12];
    bytes[0..4].copy_from_slice(&offset.to_le_bytes());
    bytes[4..8].copy_from_slice(&length.to_le_bytes());
    bytes[8..12].copy_from_slice(&extra.to_le_bytes());
    bytes
}

/// Light archive written into a temporary client directory.
pub struct FixtureArchive {
    pub dir: TempDir,
    pub slots: usize,
}

impl FixtureArchive {
    /// Write `lights` into `slots` index records, data laid out in order
    /// after `padding` filler bytes.
    pub fn build(slots: usize, padding: usize, lights: &[FixtureLight]) -> Self {
        let mut index = Vec::with_capacity(slots * 12);
        for _ in 0..slots {
            index.extend_from_slice(&record_bytes(-1, 0, 0, 0));
        }

        let mut data = vec![0xAB; padding];
        for light in lights {
            let offset = data.len() as i32;
            let record = record_bytes(
                offset,
                light.samples.len() as i32,
                light.width,
                light.height,
            );
            index[light.id * 12..light.id * 12 + 12].copy_from_slice(&record);
            data.extend_from_slice(&light.samples);
        }

        Self::from_bytes(slots, &index, &data)
    }

    /// Write raw index and data bytes
    pub fn from_bytes(slots: usize, index: &[u8], data: &[u8]) -> Self {
        let dir = TempDir::new().expect("create temp dir");
        std::fs::write(dir.path().join("lightidx.mul"), index).expect("write index");
        std::fs::write(dir.path().join("light.mul"), data).expect("write data");
        Self { dir, slots }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn config(&self) -> LightsConfig {
        LightsConfig::new(self.path()).with_max_count(self.slots)
    }

    /// Cut the data file down to `len` bytes
    pub fn truncate_data(&self, len: usize) {
        let path = self.path().join("light.mul");
        let mut data = std::fs::read(&path).expect("read data");
        data.truncate(len);
        std::fs::write(&path, data).expect("rewrite data");
    }
}
