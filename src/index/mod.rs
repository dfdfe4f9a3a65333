//! C4/C5 — the inverted phrase index and its postlist-meta skip index.
//!
//! Both are "opened by the same reader abstraction" (spec.md §9): a key
//! table (an `fst::Map` from key string to a packed `(start, count)` pair)
//! over a flat payload blob of fixed-width records, split into a builder
//! and a reader, storing this crate's own fixed-width [`crate::codec`]
//! records rather than a schema-compiled message format.

pub mod inverted;
pub mod postlist_meta;

use std::collections::BTreeMap;
use std::io;
use std::marker::PhantomData;
#[cfg(feature = "mmap")]
use std::path::Path;
use std::sync::Arc;

use fst::{Map, MapBuilder};
use owning_ref::ArcRef;

use crate::error::{NetspeakError, Result};
use crate::storage::Bytes;

/// A value with a known, constant on-disk width.
pub trait FixedWidthRecord: Sized {
    const ENCODED_LEN: usize;
    fn encode_into(&self, buf: &mut Vec<u8>);
    fn decode(buf: &[u8]) -> io::Result<Self>;
}

impl FixedWidthRecord for crate::codec::PostlistEntry {
    const ENCODED_LEN: usize = crate::codec::PostlistEntry::ENCODED_LEN;
    fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.encode());
    }
    fn decode(buf: &[u8]) -> io::Result<Self> {
        crate::codec::PostlistEntry::decode(buf)
    }
}

impl FixedWidthRecord for crate::codec::PostlistMetaEntry {
    const ENCODED_LEN: usize = crate::codec::PostlistMetaEntry::ENCODED_LEN;
    fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.encode());
    }
    fn decode(buf: &[u8]) -> io::Result<Self> {
        crate::codec::PostlistMetaEntry::decode(buf)
    }
}

/// Up to 16M records per key, addressed by a 40-bit start offset (in
/// records, not bytes) packed alongside the count in one `u64` fst value.
const COUNT_BITS: u32 = 24;
const COUNT_MASK: u64 = (1 << COUNT_BITS) - 1;

fn pack(start_record: u64, count: u32) -> u64 {
    (start_record << COUNT_BITS) | (count as u64 & COUNT_MASK)
}

fn unpack(value: u64) -> (u64, u32) {
    (value >> COUNT_BITS, (value & COUNT_MASK) as u32)
}

/// A read-only handle onto one key's list of fixed-width records.
pub struct Records<R> {
    bytes: ArcRef<dyn Bytes, [u8]>,
    _marker: PhantomData<R>,
}

impl<R: FixedWidthRecord> Records<R> {
    pub fn len(&self) -> usize {
        self.bytes.len() / R::ENCODED_LEN
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, i: usize) -> Option<R> {
        if i >= self.len() {
            return None;
        }
        let start = i * R::ENCODED_LEN;
        R::decode(&self.bytes[start..start + R::ENCODED_LEN]).ok()
    }

    pub fn iter(&self) -> RecordsIter<'_, R> {
        RecordsIter { records: self, next: 0 }
    }
}

pub struct RecordsIter<'a, R> {
    records: &'a Records<R>,
    next: usize,
}

impl<'a, R: FixedWidthRecord> Iterator for RecordsIter<'a, R> {
    type Item = R;
    fn next(&mut self) -> Option<R> {
        let item = self.records.get(self.next)?;
        self.next += 1;
        Some(item)
    }
}

/// `key -> postlist of fixed-width records`, backed by a key-table fst
/// plus a flat payload blob.
pub struct BlockIndex<D, R> {
    keys: Map<D>,
    payload: Arc<dyn Bytes>,
    _marker: PhantomData<R>,
}

impl<D: AsRef<[u8]>, R: FixedWidthRecord> BlockIndex<D, R> {
    fn from_parts(keys: Map<D>, payload: Arc<dyn Bytes>) -> Self {
        BlockIndex { keys, payload, _marker: PhantomData }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.keys.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Returns the records stored for `key`, or `None` if the key is
    /// absent (spec.md §4.2: "no postlist" is the unknown-word signal).
    pub fn get(&self, key: &str) -> Option<Records<R>> {
        let packed = self.keys.get(key)?;
        let (start_record, count) = unpack(packed);
        let start = start_record as usize * R::ENCODED_LEN;
        let end = start + count as usize * R::ENCODED_LEN;
        let bytes = ArcRef::new(self.payload.clone()).map(|b| &b.as_ref()[start..end]);
        Some(Records { bytes, _marker: PhantomData })
    }

    /// Size/shape diagnostics, grounded on `RetrievalStrategy3::properties()`
    /// (spec.md §4.2: "Stats is diagnostics, not part of the contract") —
    /// key count, total record count, and the payload's byte size, none of
    /// which requires touching an individual postlist's payload.
    pub fn properties(&self) -> IndexProperties {
        IndexProperties {
            key_count: self.keys.len(),
            payload_bytes: self.payload.as_ref().as_ref().len(),
            record_width: R::ENCODED_LEN,
        }
    }
}

/// Diagnostic snapshot of one [`BlockIndex`]'s shape, exposed through
/// [`crate::index::inverted::InvertedIndex::properties`] and
/// [`crate::index::postlist_meta::PostlistMetaIndex::properties`] for
/// observability rather than as part of the retrieval contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexProperties {
    pub key_count: usize,
    pub payload_bytes: usize,
    pub record_width: usize,
}

impl IndexProperties {
    /// Total fixed-width records stored across every key.
    pub fn record_count(&self) -> usize {
        if self.record_width == 0 {
            0
        } else {
            self.payload_bytes / self.record_width
        }
    }
}

#[cfg(feature = "mmap")]
impl<R: FixedWidthRecord> BlockIndex<memmap::Mmap, R> {
    pub fn open<P: AsRef<Path>>(key_table_path: P, payload_path: P) -> Result<Self> {
        let key_table_file = std::fs::File::open(key_table_path)?;
        let key_table_mmap = unsafe { memmap::Mmap::map(&key_table_file)? };
        let keys = Map::new(key_table_mmap)?;
        let file = std::fs::File::open(payload_path)?;
        let mmap = unsafe { memmap::Mmap::map(&file)? };
        Ok(BlockIndex::from_parts(keys, Arc::new(mmap)))
    }
}

impl<R: FixedWidthRecord> BlockIndex<Vec<u8>, R> {
    pub fn from_bytes(key_table_bytes: Vec<u8>, payload: Vec<u8>) -> Result<Self> {
        let keys = Map::new(key_table_bytes)?;
        Ok(BlockIndex::from_parts(keys, Arc::new(payload)))
    }
}

/// Accumulates `key -> [record]` postlists in a `BTreeMap` staging area,
/// sorted by key at `finish` time to satisfy the `fst` crate's
/// insertion-order requirement.
pub struct BlockIndexBuilder<R> {
    postlists: BTreeMap<String, Vec<R>>,
}

impl<R> BlockIndexBuilder<R> {
    pub fn new() -> Self {
        BlockIndexBuilder { postlists: BTreeMap::new() }
    }

    pub fn insert(&mut self, key: impl Into<String>, record: R) {
        self.postlists.entry(key.into()).or_insert_with(Vec::new).push(record);
    }
}

impl<R> Default for BlockIndexBuilder<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: FixedWidthRecord> BlockIndexBuilder<R> {
    pub fn finish(self) -> Result<BlockIndex<Vec<u8>, R>> {
        let mut map_builder = MapBuilder::memory();
        let mut payload = Vec::new();
        let mut next_record: u64 = 0;
        for (key, records) in self.postlists {
            if records.len() as u64 > COUNT_MASK {
                return Err(NetspeakError::CorruptIndex(format!(
                    "postlist for key '{}' exceeds the maximum of {} records",
                    key, COUNT_MASK
                )));
            }
            map_builder
                .insert(&key, pack(next_record, records.len() as u32))
                .map_err(|e| NetspeakError::CorruptIndex(format!("duplicate key '{}': {}", key, e)))?;
            for record in &records {
                record.encode_into(&mut payload);
            }
            next_record += records.len() as u64;
        }
        let key_table_bytes = map_builder.into_inner()?;
        BlockIndex::from_bytes(key_table_bytes, payload)
    }
}
