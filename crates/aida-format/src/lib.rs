//! Binary layout of AIDA type maps.
//!
//! A type map is a single self-describing blob:
//!
//! ```text
//! ┌──────────────────────────────┐ 0
//! │ header (magic, length,       │
//! │ segment offsets, type list)  │
//! ├──────────────────────────────┤ seg_types
//! │ type records (4 words each)  │
//! ├──────────────────────────────┤ seg_lists
//! │ index lists (count + words)  │
//! ├──────────────────────────────┤ seg_strings
//! │ strings (len + utf-8 bytes)  │
//! ├──────────────────────────────┤ length
//! │ zero sentinel (4 bytes)      │
//! └──────────────────────────────┘
//! ```
//!
//! Every cross reference is an absolute byte offset. This crate only knows
//! the layout and how to produce it; validation and read access live in the
//! runtime crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod digest;
mod kind;
pub mod layout;
mod writer;

pub use digest::BlobDigest;
pub use kind::TypeKind;
pub use writer::{encode, BlobWriter, EnumValueDecl, FormatError, TypeBody, TypeDecl};
