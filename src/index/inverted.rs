//! C4 — the inverted phrase index: `"{length}:{position}_{word}"` to a
//! postlist of `(IndexFrequency, local-phrase-id)`, sorted descending by
//! frequency (spec.md §3).

use crate::codec::PostlistEntry;
use crate::error::Result;
use crate::index::{BlockIndex, BlockIndexBuilder, IndexProperties, Records};

/// Builds the textual key a postlist is stored under.
pub fn key(length: u32, position: u32, word: &str) -> String {
    format!("{}:{}_{}", length, position, word)
}

pub type Postlist = Records<PostlistEntry>;

/// `"{length}:{position}_{word}" -> postlist`.
pub struct InvertedIndex<D> {
    inner: BlockIndex<D, PostlistEntry>,
}

impl<D: AsRef<[u8]>> InvertedIndex<D> {
    pub fn postlist(&self, length: u32, position: u32, word: &str) -> Option<Postlist> {
        self.inner.get(&key(length, position, word))
    }

    pub fn contains(&self, length: u32, position: u32, word: &str) -> bool {
        self.inner.contains_key(&key(length, position, word))
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Key/record/byte-size diagnostics for this index (spec.md §4.2's
    /// "Stats" accessor, generalized from `RetrievalStrategy3::properties()`).
    pub fn properties(&self) -> IndexProperties {
        self.inner.properties()
    }
}

#[cfg(feature = "mmap")]
impl InvertedIndex<memmap::Mmap> {
    pub fn open<P: AsRef<std::path::Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let inner = BlockIndex::open(dir.join("keys.fst"), dir.join("postlists.bin"))?;
        log::info!("opened inverted index at {}", dir.display());
        Ok(InvertedIndex { inner })
    }
}

impl InvertedIndex<Vec<u8>> {
    pub fn from_bytes(key_table_bytes: Vec<u8>, payload: Vec<u8>) -> Result<Self> {
        Ok(InvertedIndex { inner: BlockIndex::from_bytes(key_table_bytes, payload)? })
    }
}

/// Accumulates `(length, position, word) -> postlist entry` pairs. Callers
/// must insert each key's entries in descending-frequency order; the
/// builder does not re-sort them.
#[derive(Default)]
pub struct InvertedIndexBuilder {
    inner: BlockIndexBuilder<PostlistEntry>,
}

impl InvertedIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, length: u32, position: u32, word: &str, entry: PostlistEntry) {
        self.inner.insert(key(length, position, word), entry);
    }

    pub fn finish(self) -> Result<InvertedIndex<Vec<u8>>> {
        Ok(InvertedIndex { inner: self.inner.finish()? })
    }
}
