//! Snapshot encodings.

use seqlogic_core::{DiagramStorage, ValidationError};
use serde::{Deserialize, Serialize};

/// Envelope version written by this build.
pub const CLIPBOARD_VERSION: u32 = 1;

/// Encode a snapshot as a pretty-printed JSON document.
///
/// # Errors
///
/// Returns error if serialization fails.
pub fn encode_json(storage: &DiagramStorage) -> Result<String, MessageError> {
    storage
        .to_json_string()
        .map_err(|e| MessageError::Serialize(e.to_string()))
}

/// Decode a JSON document and check its shape.
///
/// Wire integrity is not checked here; loading into a diagram does that.
///
/// # Errors
///
/// Returns error if the text is not a well-formed diagram.
pub fn decode_json(json: &str) -> Result<DiagramStorage, MessageError> {
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| MessageError::Deserialize(e.to_string()))?;
    Ok(DiagramStorage::from_json_value(value)?)
}

/// A copied selection, ready to be pasted with `Diagram::merge`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clipboard {
    /// Envelope format version
    pub version: u32,
    /// Copied entities
    pub storage: DiagramStorage,
}

impl Clipboard {
    /// Wrap a snapshot in the current envelope version.
    #[must_use]
    pub fn new(storage: DiagramStorage) -> Self {
        Self {
            version: CLIPBOARD_VERSION,
            storage,
        }
    }

    /// Unwrap the snapshot.
    #[must_use]
    pub fn into_storage(self) -> DiagramStorage {
        self.storage
    }

    /// Serialize to CBOR bytes.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_cbor(&self) -> Result<Vec<u8>, MessageError> {
        let mut bytes = Vec::new();
        ciborium::into_writer(self, &mut bytes)
            .map_err(|e| MessageError::Serialize(e.to_string()))?;
        Ok(bytes)
    }

    /// Deserialize from CBOR bytes and check the version and snapshot shape.
    ///
    /// # Errors
    ///
    /// Returns error if deserialization fails, the version is unknown, or the
    /// snapshot is invalid.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self, MessageError> {
        let clipboard: Self =
            ciborium::from_reader(bytes).map_err(|e| MessageError::Deserialize(e.to_string()))?;
        if clipboard.version != CLIPBOARD_VERSION {
            return Err(MessageError::UnsupportedVersion {
                found: clipboard.version,
                expected: CLIPBOARD_VERSION,
            });
        }
        clipboard.storage.validate()?;
        Ok(clipboard)
    }
}

/// Errors for snapshot and index encoding.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MessageError {
    /// Serialization failed
    #[error("serialization failed: {0}")]
    Serialize(String),
    /// Deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialize(String),
    /// The payload decoded but is not a valid diagram
    #[error("invalid diagram: {0}")]
    InvalidDocument(#[from] ValidationError),
    /// Envelope written by an incompatible version
    #[error("unsupported clipboard version {found} (expected {expected})")]
    UnsupportedVersion {
        /// Version in the payload
        found: u32,
        /// Version this build reads
        expected: u32,
    },
    /// Index document is not a name to href object
    #[error("invalid index: {0}")]
    InvalidIndex(String),
    /// An index href or base is not a usable URL
    #[error("invalid index URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}
