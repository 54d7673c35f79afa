//! Header constants and little-endian word helpers.

/// Leading magic bytes of every type map.
pub const MAGIC: [u8; 16] = *b"AidaTypeMap\0\0\0\0\0";

/// Size of the fixed header in bytes.
pub const HEADER_SIZE: u32 = 40;

/// Byte offset of the `length` word.
pub const OFFSET_LENGTH: usize = 16;
/// Byte offset of the `seg_types` word.
pub const OFFSET_SEG_TYPES: usize = 20;
/// Byte offset of the `seg_lists` word.
pub const OFFSET_SEG_LISTS: usize = 24;
/// Byte offset of the `seg_strings` word.
pub const OFFSET_SEG_STRINGS: usize = 28;
/// Byte offset of the top-level type list word.
pub const OFFSET_TYPES: usize = 32;
/// Byte offset of the reserved word, always zero.
pub const OFFSET_RESERVED: usize = 36;

/// A type record is four words: kind, name, aux list, custom.
pub const TYPE_RECORD_SIZE: u32 = 16;

/// Bytes of the trailing zero sentinel.
pub const SENTINEL_SIZE: u32 = 4;

/// Number of string offsets in one enum entry list: ident, value, label, blurb.
pub const ENUM_ENTRY_WORDS: u32 = 4;

/// Round `n` up to the next multiple of four.
pub const fn align4(n: u32) -> u32 {
    (n + 3) & !3
}

/// True when `offset` is a multiple of four.
pub const fn is_aligned(offset: u32) -> bool {
    offset & 3 == 0
}

/// Read a little-endian word at `offset`, `None` when it does not fit.
pub fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let end = offset.checked_add(4)?;
    let word = bytes.get(offset..end)?;
    Some(u32::from_le_bytes([word[0], word[1], word[2], word[3]]))
}
