//! C5 — the postlist-meta (skip) index: same keys as the inverted index,
//! but mapping to a sparse list of `(offset, IndexFrequency)` checkpoints,
//! one per block, used to jump into the middle of a postlist without
//! scanning it from the start (spec.md §4.2).

use crate::codec::{PostlistEntry, PostlistMetaEntry};
use crate::error::Result;
use crate::index::inverted::key;
use crate::index::{BlockIndex, BlockIndexBuilder, IndexProperties, Records};
use crate::model::IndexFrequency;

/// Checkpoints are taken every `BLOCK_SIZE` postlist entries, matching
/// spec.md §3's "broken into equal-size blocks on disk".
pub const BLOCK_SIZE: usize = 64;

pub type Checkpoints = Records<PostlistMetaEntry>;

/// `"{length}:{position}_{word}" -> [(offset, frequency)]` checkpoints.
pub struct PostlistMetaIndex<D> {
    inner: BlockIndex<D, PostlistMetaEntry>,
}

impl<D: AsRef<[u8]>> PostlistMetaIndex<D> {
    pub fn checkpoints(&self, length: u32, position: u32, word: &str) -> Option<Checkpoints> {
        self.inner.get(&key(length, position, word))
    }

    /// The entry-index offset to start reading the postlist at in order to
    /// see every entry with frequency `<= threshold`, per spec.md §4.2:
    /// "binary-scan forward until finding the latest checkpoint whose
    /// recorded frequency >= current J; start reading the postlist at
    /// that checkpoint's offset. If no checkpoint is >= J, start at
    /// offset 0; if the last checkpoint's frequency < J, start there."
    pub fn skip_to(&self, length: u32, position: u32, word: &str, threshold: IndexFrequency) -> u64 {
        let checkpoints = match self.checkpoints(length, position, word) {
            Some(c) => c,
            None => return 0,
        };
        let mut best_offset = 0u64;
        for checkpoint in checkpoints.iter() {
            if checkpoint.frequency >= threshold {
                best_offset = checkpoint.offset;
            } else {
                break;
            }
        }
        best_offset
    }

    /// Key/record/byte-size diagnostics for this index (spec.md §4.2's
    /// "Stats" accessor, generalized from `RetrievalStrategy3::properties()`).
    pub fn properties(&self) -> IndexProperties {
        self.inner.properties()
    }
}

#[cfg(feature = "mmap")]
impl PostlistMetaIndex<memmap::Mmap> {
    pub fn open<P: AsRef<std::path::Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let inner = BlockIndex::open(dir.join("keys.fst"), dir.join("checkpoints.bin"))?;
        log::info!("opened postlist-meta index at {}", dir.display());
        Ok(PostlistMetaIndex { inner })
    }
}

impl PostlistMetaIndex<Vec<u8>> {
    pub fn from_bytes(key_table_bytes: Vec<u8>, payload: Vec<u8>) -> Result<Self> {
        Ok(PostlistMetaIndex { inner: BlockIndex::from_bytes(key_table_bytes, payload)? })
    }
}

/// Derives one key's checkpoints from its postlist, taking a checkpoint at
/// every `BLOCK_SIZE`th entry (offsets are entry indices, not byte
/// offsets: `index::BlockIndex` owns the byte layout).
pub fn checkpoints_for(postlist: &[PostlistEntry]) -> Vec<PostlistMetaEntry> {
    postlist
        .iter()
        .enumerate()
        .step_by(BLOCK_SIZE)
        .map(|(i, entry)| PostlistMetaEntry { offset: i as u64, frequency: entry.frequency })
        .collect()
}

#[derive(Default)]
pub struct PostlistMetaIndexBuilder {
    inner: BlockIndexBuilder<PostlistMetaEntry>,
}

impl PostlistMetaIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts the derived checkpoints for one key's full postlist.
    pub fn insert_postlist(&mut self, length: u32, position: u32, word: &str, postlist: &[PostlistEntry]) {
        for checkpoint in checkpoints_for(postlist) {
            self.inner.insert(key(length, position, word), checkpoint);
        }
    }

    pub fn finish(self) -> Result<PostlistMetaIndex<Vec<u8>>> {
        Ok(PostlistMetaIndex { inner: self.inner.finish()? })
    }
}
