//! C3 — the phrase dictionary: word → (exact frequency, word-id).
//!
//! On disk this is an `fst::Map` from word bytes to a dense word-id
//! (an exact-match lookup structure with no edit-distance variant
//! expansion, which this crate has no use for) plus a side array of
//! fixed-width frequency records indexed by word-id.

use std::io::Cursor;
#[cfg(feature = "mmap")]
use std::path::Path;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use fst::{Map, MapBuilder};

use crate::error::{NetspeakError, Result};
use crate::model::Frequency;

/// A word whose dictionary frequency exceeds this is a stopword (spec.md §3).
pub const STOPWORD_FREQUENCY_THRESHOLD: Frequency = 1_000_000_000;

/// `word -> (frequency, word-id)`.
pub struct PhraseDictionary<D> {
    map: Map<D>,
    frequencies: Vec<u8>,
}

impl<D: AsRef<[u8]>> PhraseDictionary<D> {
    fn from_parts(map: Map<D>, frequencies: Vec<u8>) -> Self {
        PhraseDictionary { map, frequencies }
    }

    pub fn get(&self, word: &str) -> Option<(Frequency, u32)> {
        let word_id = self.map.get(word)? as u32;
        let frequency = self.frequency_of(word_id);
        Some((frequency, word_id))
    }

    pub fn contains(&self, word: &str) -> bool {
        self.map.contains_key(word)
    }

    pub fn is_stopword(&self, word: &str) -> bool {
        self.get(word)
            .map(|(freq, _)| freq > STOPWORD_FREQUENCY_THRESHOLD)
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn frequency_of(&self, word_id: u32) -> Frequency {
        let offset = word_id as usize * 8;
        let mut cursor = Cursor::new(&self.frequencies[offset..offset + 8]);
        cursor.read_u64::<BigEndian>().expect("frequency table is fixed-width")
    }
}

impl PhraseDictionary<Vec<u8>> {
    pub fn from_bytes(map_bytes: Vec<u8>, frequencies: Vec<u8>) -> Result<Self> {
        let map = Map::new(map_bytes)?;
        Ok(PhraseDictionary::from_parts(map, frequencies))
    }
}

#[cfg(feature = "mmap")]
impl PhraseDictionary<memmap::Mmap> {
    /// Opens a phrase dictionary directory containing `words.fst` and
    /// `frequencies.bin`, memory-mapping the fst transducer directly.
    pub unsafe fn from_path<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let file = std::fs::File::open(dir.join("words.fst"))?;
        let mmap = memmap::Mmap::map(&file)?;
        let map = Map::new(mmap)?;
        let frequencies = std::fs::read(dir.join("frequencies.bin"))?;
        log::info!("opened phrase dictionary at {}", dir.display());
        Ok(PhraseDictionary::from_parts(map, frequencies))
    }
}

/// Builds a [`PhraseDictionary`] from `(word, frequency)` pairs.
///
/// Words must be inserted in strictly increasing lexicographic order (the
/// `fst` crate's requirement); word-ids are assigned densely in
/// insertion order.
pub struct PhraseDictionaryBuilder {
    map_builder: MapBuilder<Vec<u8>>,
    frequencies: Vec<u8>,
    next_id: u64,
}

impl PhraseDictionaryBuilder {
    pub fn new() -> Self {
        PhraseDictionaryBuilder {
            map_builder: MapBuilder::memory(),
            frequencies: Vec::new(),
            next_id: 0,
        }
    }

    pub fn insert(&mut self, word: &str, frequency: Frequency) -> Result<()> {
        self.map_builder
            .insert(word, self.next_id)
            .map_err(|e| NetspeakError::CorruptIndex(format!("duplicate or out-of-order word '{}': {}", word, e)))?;
        self.frequencies
            .write_u64::<BigEndian>(frequency)
            .expect("writing to a Vec cannot fail");
        self.next_id += 1;
        Ok(())
    }

    pub fn finish(self) -> Result<PhraseDictionary<Vec<u8>>> {
        let map_bytes = self.map_builder.into_inner()?;
        PhraseDictionary::from_bytes(map_bytes, self.frequencies)
    }
}

impl Default for PhraseDictionaryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
