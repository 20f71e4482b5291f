//! # seqlogic Library
//!
//! HTTP client for the sample and unit libraries a seqlogic editor loads
//! diagrams from.
//!
//! A library is a static directory of JSON files:
//!
//! - `samples/index.json`: sample name to href, relative to the index
//! - `units/index.json`: unit name to href, relative to the library root
//!
//! Every fetched diagram is validated before it is returned.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;

pub use client::{parse_document, ClientError, LibraryClient, LibraryClientConfig, LibraryIndexes};
