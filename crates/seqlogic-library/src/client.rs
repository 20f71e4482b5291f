//! HTTP client for sample and unit libraries.

use reqwest::Client;
use seqlogic_core::DiagramStorage;
use seqlogic_proto::{popular_units, LibraryIndex, LibraryLayout, MessageError};
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Library client configuration.
#[derive(Debug, Clone)]
pub struct LibraryClientConfig {
    /// Root URL of the library (e.g., <http://localhost:8080/>)
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for LibraryClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Both library indexes, fetched together.
#[derive(Debug, Clone, Default)]
pub struct LibraryIndexes {
    /// Sample names to document URLs
    pub samples: LibraryIndex,
    /// Unit names to document URLs
    pub units: LibraryIndex,
}

/// HTTP client for one library.
pub struct LibraryClient {
    client: Client,
    layout: LibraryLayout,
}

impl LibraryClient {
    /// Create a new library client.
    ///
    /// # Errors
    ///
    /// Returns error if the base URL is invalid or the HTTP client cannot be
    /// created.
    pub fn new(config: LibraryClientConfig) -> Result<Self, ClientError> {
        let layout = LibraryLayout::new(&config.base_url)?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::Init(e.to_string()))?;
        Ok(Self { client, layout })
    }

    /// Library root.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        self.layout.base()
    }

    /// Fetch the samples index. Hrefs resolve against the index location.
    ///
    /// # Errors
    ///
    /// Returns error on network errors or if the index is malformed.
    pub async fn samples_index(&self) -> Result<LibraryIndex, ClientError> {
        let url = self.layout.samples_index()?;
        let value = self.get_json(&url).await?;
        let index = LibraryIndex::from_json_value(&value, &url)?;
        tracing::debug!(samples = index.len(), "Fetched samples index");
        Ok(index)
    }

    /// Fetch the units index. Hrefs resolve against the library root.
    ///
    /// # Errors
    ///
    /// Returns error on network errors or if the index is malformed.
    pub async fn units_index(&self) -> Result<LibraryIndex, ClientError> {
        let url = self.layout.units_index()?;
        let value = self.get_json(&url).await?;
        let index = LibraryIndex::from_json_value(&value, self.layout.base())?;
        tracing::debug!(units = index.len(), "Fetched units index");
        Ok(index)
    }

    /// Fetch both indexes concurrently.
    ///
    /// # Errors
    ///
    /// Returns the first error from either index.
    pub async fn indexes(&self) -> Result<LibraryIndexes, ClientError> {
        let (samples, units) = tokio::try_join!(self.samples_index(), self.units_index())?;
        Ok(LibraryIndexes { samples, units })
    }

    /// Fetch and validate the sample at `url`.
    ///
    /// # Errors
    ///
    /// Returns error on network errors or if the document is not a valid
    /// diagram.
    pub async fn sample(&self, url: &Url) -> Result<DiagramStorage, ClientError> {
        let value = self.get_json(url).await?;
        parse_document(value)
    }

    /// Look `name` up in the units index, then fetch and validate it.
    ///
    /// # Errors
    ///
    /// Returns error if the unit is unknown, on network errors, or if the
    /// document is not a valid diagram.
    pub async fn unit(&self, name: &str) -> Result<DiagramStorage, ClientError> {
        let index = self.units_index().await?;
        let url = index
            .get(name)
            .ok_or_else(|| ClientError::UnknownUnit(name.to_string()))?;
        tracing::debug!(unit = name, %url, "Fetching unit");
        let value = self.get_json(url).await?;
        parse_document(value)
    }

    /// Unit names offered as shortcuts.
    #[must_use]
    pub fn popular_units(&self) -> Vec<String> {
        popular_units()
    }

    async fn get_json(&self, url: &Url) -> Result<Value, ClientError> {
        tracing::debug!(%url, "GET");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ClientError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ClientError::ApiError {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))
    }
}

/// Decode a fetched diagram and check both its shape and its wires.
///
/// # Errors
///
/// Returns error if the value is not a valid diagram.
pub fn parse_document(value: Value) -> Result<DiagramStorage, ClientError> {
    let storage = DiagramStorage::from_json_value(value)
        .map_err(|e| ClientError::InvalidDocument(e.to_string()))?;
    storage
        .validate_wires()
        .map_err(|e| ClientError::InvalidDocument(e.to_string()))?;
    Ok(storage)
}

/// Errors that can occur with library operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Client initialization failed
    #[error("client init error: {0}")]
    Init(String),
    /// HTTP request failed
    #[error("request error: {0}")]
    Request(String),
    /// Server returned an error status
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },
    /// Response body is not JSON
    #[error("parse error: {0}")]
    Parse(String),
    /// Index document or URL is malformed
    #[error("invalid index: {0}")]
    Index(#[from] MessageError),
    /// No unit with this name in the units index
    #[error("unknown unit: {0}")]
    UnknownUnit(String),
    /// Fetched JSON is not a valid diagram
    #[error("invalid document: {0}")]
    InvalidDocument(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn config_default() {
        let config = LibraryClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8080/");
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn client_creation() {
        let client = LibraryClient::new(LibraryClientConfig::default()).unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:8080/");
        assert_eq!(client.popular_units().len(), 4);
    }

    #[test]
    fn client_creation_with_relative_base_fails() {
        let config = LibraryClientConfig {
            base_url: "library".to_string(),
            ..Default::default()
        };

        let result = LibraryClient::new(config);
        assert!(matches!(result, Err(ClientError::Index(_))));
    }

    #[test]
    fn unreachable_library_is_request_error() {
        let config = LibraryClientConfig {
            base_url: "http://127.0.0.1:9/".to_string(),
            timeout: Duration::from_secs(2),
        };
        let client = LibraryClient::new(config).unwrap();

        let result = tokio_test::block_on(client.samples_index());
        assert!(matches!(result, Err(ClientError::Request(_))));
    }

    #[test]
    fn parse_document_accepts_valid_diagram() {
        let value = json!({
            "nodes": {
                "a": { "x": 0, "y": 0, "powered": true },
                "b": { "x": 40, "y": 0, "powered": false }
            },
            "wires": { "w": { "start": "a", "end": "b", "not": true } },
            "texts": {},
            "viewport": { "x": 0, "y": 0, "scale": 1 }
        });

        let storage = parse_document(value).unwrap();
        assert_eq!(storage.nodes.len(), 2);
    }

    #[test]
    fn parse_document_rejects_dangling_wire() {
        let value = json!({
            "nodes": { "a": { "x": 0, "y": 0, "powered": true } },
            "wires": { "w": { "start": "a", "end": "gone", "not": false } },
            "texts": {},
            "viewport": { "x": 0, "y": 0, "scale": 1 }
        });

        assert!(matches!(
            parse_document(value),
            Err(ClientError::InvalidDocument(_))
        ));
    }

    #[test]
    fn parse_document_rejects_wrong_shape() {
        assert!(matches!(
            parse_document(json!({ "nodes": [] })),
            Err(ClientError::InvalidDocument(_))
        ));
    }
}
