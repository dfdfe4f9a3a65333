//! DICTSET synonym lookup: `#name` expands to a fixed list of words
//! (spec.md §4.1). An `fst::Map` from name to a dense id plus a side file
//! of per-id word lists, serialized with `rmp-serde` instead of
//! re-parsing anything on every lookup.

use std::io::{BufReader, BufWriter};
#[cfg(feature = "mmap")]
use std::path::Path;

use fst::{Map, MapBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{NetspeakError, Result};

#[derive(Serialize, Deserialize)]
struct WordLists(Vec<Vec<String>>);

/// A DICTSET collaborator, resolving a headword to its synonym list.
/// Named distinctly from [`HashDictionary::expand`] so a `&dyn
/// SynonymDictionary` trait object can be passed to the normalizer while
/// the inherent method keeps its more specific `&[String]` return type.
pub trait SynonymDictionary {
    fn expand_synonyms(&self, headword: &str) -> Option<Vec<String>>;
}

impl<D: AsRef<[u8]>> SynonymDictionary for HashDictionary<D> {
    fn expand_synonyms(&self, headword: &str) -> Option<Vec<String>> {
        self.expand(headword).map(|words| words.to_vec())
    }
}

/// `#name -> [word, ...]`.
pub struct HashDictionary<D> {
    names: Map<D>,
    word_lists: Vec<Vec<String>>,
}

impl<D: AsRef<[u8]>> HashDictionary<D> {
    fn from_parts(names: Map<D>, word_lists: Vec<Vec<String>>) -> Self {
        HashDictionary { names, word_lists }
    }

    pub fn expand(&self, name: &str) -> Option<&[String]> {
        let id = self.names.get(name)? as usize;
        self.word_lists.get(id).map(|words| words.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl HashDictionary<Vec<u8>> {
    pub fn from_bytes(map_bytes: Vec<u8>, word_lists_bytes: &[u8]) -> Result<Self> {
        let names = Map::new(map_bytes)?;
        let word_lists: WordLists = rmp_serde::from_read(word_lists_bytes)
            .map_err(|e| NetspeakError::CorruptIndex(e.to_string()))?;
        Ok(HashDictionary::from_parts(names, word_lists.0))
    }
}

#[cfg(feature = "mmap")]
impl HashDictionary<memmap::Mmap> {
    /// Opens a hash-dictionary directory containing `names.fst` and
    /// `word_lists.msg`, mirroring `FuzzyMap::from_path`'s fst+msgpack pair.
    pub unsafe fn from_path<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let names_file = std::fs::File::open(dir.join("names.fst"))?;
        let names_mmap = memmap::Mmap::map(&names_file)?;
        let names = Map::new(names_mmap)?;
        let reader = BufReader::new(std::fs::File::open(dir.join("word_lists.msg"))?);
        let word_lists: WordLists = rmp_serde::from_read(reader)
            .map_err(|e| NetspeakError::CorruptIndex(e.to_string()))?;
        log::info!("opened hash dictionary at {}", dir.display());
        Ok(HashDictionary::from_parts(names, word_lists.0))
    }
}

/// Builds a [`HashDictionary`] from `(name, words)` pairs inserted in
/// ascending name order.
pub struct HashDictionaryBuilder {
    map_builder: MapBuilder<Vec<u8>>,
    word_lists: Vec<Vec<String>>,
    next_id: u64,
}

impl HashDictionaryBuilder {
    pub fn new() -> Self {
        HashDictionaryBuilder {
            map_builder: MapBuilder::memory(),
            word_lists: Vec::new(),
            next_id: 0,
        }
    }

    pub fn insert(&mut self, name: &str, words: Vec<String>) -> Result<()> {
        self.map_builder
            .insert(name, self.next_id)
            .map_err(|e| NetspeakError::CorruptIndex(format!("duplicate or out-of-order name '{}': {}", name, e)))?;
        self.word_lists.push(words);
        self.next_id += 1;
        Ok(())
    }

    pub fn finish(self) -> Result<HashDictionary<Vec<u8>>> {
        let map_bytes = self.map_builder.into_inner()?;
        let mut word_lists_bytes = Vec::new();
        WordLists(self.word_lists)
            .serialize(&mut rmp_serde::Serializer::new(&mut word_lists_bytes))
            .map_err(|e| NetspeakError::CorruptIndex(e.to_string()))?;
        HashDictionary::from_bytes(map_bytes, &word_lists_bytes)
    }

    /// Writes the built dictionary's two files directly to a directory,
    /// for tooling that wants `HashDictionary::from_path` afterwards.
    pub fn write_to<P: AsRef<std::path::Path>>(self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let map_bytes = self.map_builder.into_inner()?;
        std::fs::write(dir.join("names.fst"), &map_bytes)?;
        let writer = BufWriter::new(std::fs::File::create(dir.join("word_lists.msg"))?);
        WordLists(self.word_lists)
            .serialize(&mut rmp_serde::Serializer::new(writer))
            .map_err(|e| NetspeakError::CorruptIndex(e.to_string()))
    }
}

impl Default for HashDictionaryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_known_name() {
        let mut builder = HashDictionaryBuilder::new();
        builder.insert("colors", vec!["red".to_string(), "blue".to_string()]).unwrap();
        builder.insert("pets", vec!["cat".to_string(), "dog".to_string()]).unwrap();
        let dict = builder.finish().unwrap();

        assert_eq!(dict.expand("colors"), Some(&["red".to_string(), "blue".to_string()][..]));
        assert_eq!(dict.expand("missing"), None);
        assert!(dict.contains("pets"));
    }
}
