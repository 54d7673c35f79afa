//! AIDA: type metadata, dynamic values and signals for IPC bindings
//!
//! The runtime core that generated bindings and the connection layer build
//! on. It has no I/O of its own beyond reading metadata files.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │             AIDA runtime core           │
//! │                                         │
//! │  typemap  - compiled type metadata      │
//! │  any      - dynamically typed values    │
//! │  signal   - sync and async signals      │
//! │                                         │
//! ├─────────────────────────────────────────┤
//! │   aida-format (blob layout + writer)    │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Type maps
//!
//! IDL compilers emit `.aidatypes` blobs describing enums, records,
//! sequences and interfaces. A [`TypeMap`] validates a blob once at load
//! time; afterwards [`TypeCode`]s walk it without copying:
//!
//! ```no_run
//! use aida::{TypeKind, TypeRegistry};
//!
//! let registry = TypeRegistry::new();
//! let map = registry.load("player.aidatypes");
//! if let Some(state) = registry.lookup("PlayState") {
//!     assert_eq!(state.kind(), TypeKind::Enum);
//!     println!("{}", state.pretty(""));
//! }
//! # drop(map);
//! ```
//!
//! ## Values
//!
//! ```
//! use aida::{AnyValue, FieldVector};
//!
//! let song = AnyValue::from(FieldVector::new().with("title", "Intro").with("length", 93u32));
//! assert_eq!(song.field("length").and_then(|v| v.get::<i32>()), Some(93));
//! ```

pub mod any;
pub mod signal;
pub mod typemap;

pub use any::{AnyValue, AnyVector, ConversionError, Field, FieldVector, FromAny, Payload};
pub use signal::{
    AsyncSignal, Collector, CollectorDefault, CollectorLast, CollectorSum, CollectorUntil0,
    CollectorVector, CollectorWhile0, Connectable, Emission, HandlerId, Signal,
};
pub use typemap::{
    BlobError, EnumValue, FieldWalk, Limits, LoadError, TypeCode, TypeKind, TypeMap, TypeRegistry,
};
