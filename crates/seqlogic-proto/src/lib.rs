//! # seqlogic Protocol
//!
//! Transmissible encodings of diagram snapshots and the library index format.
//!
//! ## Snapshots
//!
//! - JSON documents: the persisted file format
//! - `Clipboard`: versioned CBOR envelope for copy and paste between sessions
//!
//! ## Library layout
//!
//! Index documents map names to hrefs: `{base}/samples/index.json` and
//! `{base}/units/index.json`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod index;
pub mod snapshot;

pub use index::{popular_units, LibraryIndex, LibraryLayout, POPULAR_UNITS};
pub use snapshot::{decode_json, encode_json, Clipboard, MessageError, CLIPBOARD_VERSION};
