//! The byte-source abstraction shared by every memory-mappable structure
//! (phrase corpus, inverted index, postlist-meta index): either an
//! in-memory buffer, built fresh or loaded in tests, or a memory map
//! opened against a file on disk.

/// A backing byte source held behind `Arc` so the corresponding file
/// descriptor closes on last release (spec.md §5).
pub trait Bytes: AsRef<[u8]> + Send + Sync {}
impl<T: AsRef<[u8]> + Send + Sync> Bytes for T {}
