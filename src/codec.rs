//! Fixed-width binary value codecs (C1).
//!
//! Every on-disk record the core reads is a fixed-width tuple of
//! big-endian integers. This module is the single place that knows those
//! byte layouts: big-endian integer chopping generalized to the wider
//! fixed-width records this crate needs.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Cursor, Read, Write};

use crate::model::{Frequency, IndexFrequency, PhraseId};

/// A postlist entry: `(IndexFrequency, local-phrase-id)`, 8 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostlistEntry {
    pub frequency: IndexFrequency,
    pub local_id: u32,
}

impl PostlistEntry {
    pub const ENCODED_LEN: usize = 8;

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32::<BigEndian>(self.frequency)?;
        w.write_u32::<BigEndian>(self.local_id)?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let frequency = r.read_u32::<BigEndian>()?;
        let local_id = r.read_u32::<BigEndian>()?;
        Ok(PostlistEntry { frequency, local_id })
    }

    pub fn decode(buf: &[u8]) -> io::Result<Self> {
        let mut cursor = Cursor::new(buf);
        Self::read_from(&mut cursor)
    }

    pub fn encode(&self) -> [u8; Self::ENCODED_LEN] {
        let mut buf = [0u8; Self::ENCODED_LEN];
        {
            let mut cursor = Cursor::new(&mut buf[..]);
            self.write_to(&mut cursor).expect("writing to a fixed buffer cannot fail");
        }
        buf
    }
}

/// A postlist-meta checkpoint: `(start-offset, IndexFrequency)`, 12 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostlistMetaEntry {
    pub offset: u64,
    pub frequency: IndexFrequency,
}

impl PostlistMetaEntry {
    pub const ENCODED_LEN: usize = 12;

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u64::<BigEndian>(self.offset)?;
        w.write_u32::<BigEndian>(self.frequency)?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let offset = r.read_u64::<BigEndian>()?;
        let frequency = r.read_u32::<BigEndian>()?;
        Ok(PostlistMetaEntry { offset, frequency })
    }

    pub fn decode(buf: &[u8]) -> io::Result<Self> {
        let mut cursor = Cursor::new(buf);
        Self::read_from(&mut cursor)
    }

    pub fn encode(&self) -> [u8; Self::ENCODED_LEN] {
        let mut buf = [0u8; Self::ENCODED_LEN];
        {
            let mut cursor = Cursor::new(&mut buf[..]);
            self.write_to(&mut cursor).expect("writing to a fixed buffer cannot fail");
        }
        buf
    }
}

/// The size in bytes of a phrase-corpus row for a phrase of the given
/// length: `length * 4` bytes of word-ids followed by 8 bytes of
/// exact frequency.
pub fn phrase_row_len(length: u32) -> usize {
    (length as usize) * 4 + 8
}

/// A decoded phrase-corpus row: word-ids plus the exact frequency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhraseRow {
    pub word_ids: Vec<u32>,
    pub frequency: Frequency,
}

impl PhraseRow {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(phrase_row_len(self.word_ids.len() as u32));
        for id in &self.word_ids {
            buf.write_u32::<BigEndian>(*id).expect("writing to a Vec cannot fail");
        }
        buf.write_u64::<BigEndian>(self.frequency).expect("writing to a Vec cannot fail");
        buf
    }

    pub fn decode(buf: &[u8], length: u32) -> io::Result<Self> {
        let mut cursor = Cursor::new(buf);
        let mut word_ids = Vec::with_capacity(length as usize);
        for _ in 0..length {
            word_ids.push(cursor.read_u32::<BigEndian>()?);
        }
        let frequency = cursor.read_u64::<BigEndian>()?;
        Ok(PhraseRow { word_ids, frequency })
    }

    /// The offset of this phrase's row within its length-partitioned file.
    pub fn offset_for(id: PhraseId) -> u64 {
        id.local() as u64 * phrase_row_len(id.length()) as u64
    }
}

/// A phrase-dictionary value: `(exact Frequency, word-id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordEntry {
    pub frequency: Frequency,
    pub word_id: u32,
}

impl WordEntry {
    pub const ENCODED_LEN: usize = 12;

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u64::<BigEndian>(self.frequency)?;
        w.write_u32::<BigEndian>(self.word_id)?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let frequency = r.read_u64::<BigEndian>()?;
        let word_id = r.read_u32::<BigEndian>()?;
        Ok(WordEntry { frequency, word_id })
    }

    pub fn decode(buf: &[u8]) -> io::Result<Self> {
        let mut cursor = Cursor::new(buf);
        Self::read_from(&mut cursor)
    }

    pub fn encode(&self) -> [u8; Self::ENCODED_LEN] {
        let mut buf = [0u8; Self::ENCODED_LEN];
        {
            let mut cursor = Cursor::new(&mut buf[..]);
            self.write_to(&mut cursor).expect("writing to a fixed buffer cannot fail");
        }
        buf
    }
}
