//! Bounds-checked access to a type-map blob.
//!
//! `Blob` owns (or borrows statically) the raw bytes and hands out records,
//! index lists and strings only after checking that the offset is aligned,
//! lies in the segment the caller expects, and that the declared record
//! length fits in what remains of that segment.

use std::borrow::Cow;
use std::fmt;

use aida_format::layout::{
    is_aligned, read_u32, HEADER_SIZE, MAGIC, OFFSET_LENGTH, OFFSET_RESERVED, OFFSET_SEG_LISTS,
    OFFSET_SEG_STRINGS, OFFSET_SEG_TYPES, OFFSET_TYPES, SENTINEL_SIZE, TYPE_RECORD_SIZE,
};
use thiserror::Error;

use super::Limits;

/// The four byte ranges of a blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Header,
    Types,
    Lists,
    Strings,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Header => f.write_str("header"),
            Segment::Types => f.write_str("types"),
            Segment::Lists => f.write_str("lists"),
            Segment::Strings => f.write_str("strings"),
        }
    }
}

/// Structural problems found in a blob.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlobError {
    #[error("blob of {size} bytes exceeds the limit of {limit} bytes")]
    TooLarge { size: usize, limit: usize },

    #[error("blob of {have} bytes is shorter than the header")]
    Truncated { have: usize },

    #[error("invalid magic")]
    BadMagic,

    #[error("declared length {length} does not fit {available} available bytes")]
    BadLength { length: u32, available: usize },

    #[error("segment offsets are unordered or misaligned")]
    BadSegments,

    #[error("reserved header word is not zero")]
    ReservedNotZero,

    #[error("missing zero sentinel after the declared length")]
    MissingSentinel,

    #[error("offset {offset:#x} is not 4-byte aligned")]
    Misaligned { offset: u32 },

    #[error("offset {offset:#x} is outside the {segment} segment")]
    OutOfSegment { offset: u32, segment: Segment },

    #[error("record at {offset:#x} overruns the {segment} segment")]
    Overrun { offset: u32, segment: Segment },

    #[error("string at {offset:#x} is not valid UTF-8")]
    InvalidUtf8 { offset: u32 },

    #[error("unknown kind tag {tag:#x} in record at {offset:#x}")]
    UnknownKind { offset: u32, tag: u32 },

    #[error("malformed enum entry at {offset:#x}")]
    BadEnumEntry { offset: u32 },

    #[error("list of {count} entries exceeds the limit of {limit}")]
    ListTooLong { count: u32, limit: usize },
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Header {
    pub length: u32,
    pub seg_types: u32,
    pub seg_lists: u32,
    pub seg_strings: u32,
    pub types: u32,
}

/// One type record, exactly as stored.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TypeRecord {
    pub kind: u32,
    pub name: u32,
    pub aux: u32,
    pub custom: u32,
}

/// A validated view of one index list.
#[derive(Debug, Clone, Copy)]
pub(crate) struct IndexList<'a> {
    words: &'a [u8],
}

impl<'a> IndexList<'a> {
    pub fn len(&self) -> usize {
        self.words.len() / 4
    }

    pub fn get(&self, index: usize) -> Option<u32> {
        read_u32(self.words, index.checked_mul(4)?)
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + 'a {
        let words = self.words;
        words
            .chunks_exact(4)
            .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
    }
}

pub(crate) struct Blob {
    bytes: Cow<'static, [u8]>,
    header: Header,
    max_list_len: usize,
}

impl Blob {
    /// Validate the header, segment layout, sentinel and top-level type list.
    pub fn parse(bytes: Cow<'static, [u8]>, limits: &Limits) -> Result<Blob, BlobError> {
        if bytes.len() > limits.max_blob_size {
            return Err(BlobError::TooLarge {
                size: bytes.len(),
                limit: limits.max_blob_size,
            });
        }
        if bytes.len() < HEADER_SIZE as usize {
            return Err(BlobError::Truncated { have: bytes.len() });
        }
        if bytes[..MAGIC.len()] != MAGIC {
            return Err(BlobError::BadMagic);
        }

        let word = |offset: usize| read_u32(&bytes, offset).unwrap_or(0);
        let header = Header {
            length: word(OFFSET_LENGTH),
            seg_types: word(OFFSET_SEG_TYPES),
            seg_lists: word(OFFSET_SEG_LISTS),
            seg_strings: word(OFFSET_SEG_STRINGS),
            types: word(OFFSET_TYPES),
        };

        let available = bytes.len();
        let end = header.length as u64 + SENTINEL_SIZE as u64;
        if header.length < HEADER_SIZE || !is_aligned(header.length) || end > available as u64 {
            return Err(BlobError::BadLength {
                length: header.length,
                available,
            });
        }
        let ordered = HEADER_SIZE <= header.seg_types
            && header.seg_types <= header.seg_lists
            && header.seg_lists <= header.seg_strings
            && header.seg_strings <= header.length;
        let aligned = is_aligned(header.seg_types)
            && is_aligned(header.seg_lists)
            && is_aligned(header.seg_strings);
        if !ordered || !aligned {
            return Err(BlobError::BadSegments);
        }
        if word(OFFSET_RESERVED) != 0 {
            return Err(BlobError::ReservedNotZero);
        }
        let length = header.length as usize;
        if bytes[length..length + SENTINEL_SIZE as usize] != [0u8; SENTINEL_SIZE as usize] {
            return Err(BlobError::MissingSentinel);
        }

        let blob = Blob {
            bytes,
            header,
            max_list_len: limits.max_list_len,
        };

        // Top-level types must be fully addressable; deeper records are
        // checked lazily on access.
        let top = blob.list(header.types)?;
        for offset in top.iter() {
            let record = blob.record(offset)?;
            blob.string(record.name)?;
        }
        Ok(blob)
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Header and segments, without the sentinel.
    pub fn declared(&self) -> &[u8] {
        &self.bytes[..self.header.length as usize]
    }

    fn range(&self, segment: Segment) -> (u32, u32) {
        let h = &self.header;
        match segment {
            Segment::Header => (0, h.seg_types),
            Segment::Types => (h.seg_types, h.seg_lists),
            Segment::Lists => (h.seg_lists, h.seg_strings),
            Segment::Strings => (h.seg_strings, h.length),
        }
    }

    /// Check that `need` bytes starting at `offset` lie inside `segment`.
    fn check(&self, offset: u32, segment: Segment, need: u32) -> Result<(), BlobError> {
        if !is_aligned(offset) {
            return Err(BlobError::Misaligned { offset });
        }
        let (start, end) = self.range(segment);
        if offset < start || offset >= end {
            return Err(BlobError::OutOfSegment { offset, segment });
        }
        if need > end - offset {
            return Err(BlobError::Overrun { offset, segment });
        }
        Ok(())
    }

    fn word(&self, offset: u32) -> u32 {
        // Callers have bounds-checked `offset` against a segment.
        read_u32(&self.bytes, offset as usize).unwrap_or(0)
    }

    pub fn record(&self, offset: u32) -> Result<TypeRecord, BlobError> {
        self.check(offset, Segment::Types, TYPE_RECORD_SIZE)?;
        let record = TypeRecord {
            kind: self.word(offset),
            name: self.word(offset + 4),
            aux: self.word(offset + 8),
            custom: self.word(offset + 12),
        };
        if aida_format::TypeKind::from_tag(record.kind).is_none() {
            return Err(BlobError::UnknownKind {
                offset,
                tag: record.kind,
            });
        }
        Ok(record)
    }

    pub fn list(&self, offset: u32) -> Result<IndexList<'_>, BlobError> {
        self.check(offset, Segment::Lists, 4)?;
        let count = self.word(offset);
        if count as usize > self.max_list_len {
            return Err(BlobError::ListTooLong {
                count,
                limit: self.max_list_len,
            });
        }
        let need = 4u64 + 4 * count as u64;
        let (_, end) = self.range(Segment::Lists);
        if need > (end - offset) as u64 {
            return Err(BlobError::Overrun {
                offset,
                segment: Segment::Lists,
            });
        }
        let start = offset as usize + 4;
        Ok(IndexList {
            words: &self.bytes[start..start + 4 * count as usize],
        })
    }

    pub fn string(&self, offset: u32) -> Result<&str, BlobError> {
        self.check(offset, Segment::Strings, 4)?;
        let len = self.word(offset);
        let (_, end) = self.range(Segment::Strings);
        if len as u64 + 4 > (end - offset) as u64 {
            return Err(BlobError::Overrun {
                offset,
                segment: Segment::Strings,
            });
        }
        let start = offset as usize + 4;
        std::str::from_utf8(&self.bytes[start..start + len as usize])
            .map_err(|_| BlobError::InvalidUtf8 { offset })
    }
}
