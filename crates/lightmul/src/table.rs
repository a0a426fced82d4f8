//! Identifier to index record lookup

use crate::archive::IndexRecord;

/// Index records for every identifier slot, built once per load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryTable {
    records: Box<[IndexRecord]>,
}

impl EntryTable {
    /// Build a table from the records read out of the index file.
    pub fn new(records: Vec<IndexRecord>) -> Self {
        Self {
            records: records.into_boxed_slice(),
        }
    }

    /// Record for `id`, or `None` when out of range or absent.
    pub fn lookup(&self, id: u32) -> Option<IndexRecord> {
        let index = usize::try_from(id).ok()?;
        self.records
            .get(index)
            .copied()
            .filter(|record| !record.is_absent())
    }

    /// Whether `id` names a present resource
    pub fn contains(&self, id: u32) -> bool {
        self.lookup(id).is_some()
    }

    /// Number of identifier slots, present or not
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the table has no slots
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over present records with their identifiers
    pub fn present(&self) -> impl Iterator<Item = (u32, IndexRecord)> + '_ {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, record)| !record.is_absent())
            .map(|(id, record)| (id as u32, *record))
    }

    /// Number of present records
    pub fn present_count(&self) -> usize {
        self.present().count()
    }

    /// Present records whose sample run extends past `data_len`
    pub fn out_of_bounds(&self, data_len: u64) -> impl Iterator<Item = (u32, IndexRecord)> + '_ {
        self.present()
            .filter(move |(_, record)| record.end() > data_len)
    }
}
