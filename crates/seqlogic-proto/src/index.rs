//! Library layout and index documents.
//!
//! Layout: `{base}/samples/index.json` and `{base}/units/index.json`
//!
//! Each index is a JSON object mapping a display name to an href. Relative
//! hrefs are resolved against a caller-chosen URL, so a library can be
//! served from any directory.

use crate::snapshot::MessageError;
use indexmap::IndexMap;
use url::Url;

/// Path of the samples index below the library base.
pub const SAMPLES_INDEX_PATH: &str = "samples/index.json";

/// Path of the units index below the library base.
pub const UNITS_INDEX_PATH: &str = "units/index.json";

/// Unit names offered as shortcuts.
pub const POPULAR_UNITS: [&str; 4] = ["and", "or", "xor", "d-latch"];

/// Unit names offered as shortcuts, in display order.
#[must_use]
pub fn popular_units() -> Vec<String> {
    POPULAR_UNITS.iter().map(ToString::to_string).collect()
}

/// Locations of the index documents of one library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryLayout {
    base: Url,
}

impl LibraryLayout {
    /// Create a layout rooted at `base`.
    ///
    /// A missing trailing slash is added so index paths nest under the last
    /// path segment.
    ///
    /// # Errors
    ///
    /// Returns error if `base` is not an absolute URL.
    pub fn new(base: &str) -> Result<Self, MessageError> {
        let mut base = Url::parse(base)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { base })
    }

    /// Library root.
    #[must_use]
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Location of the samples index.
    ///
    /// # Errors
    ///
    /// Returns error if the path cannot be joined to the base.
    pub fn samples_index(&self) -> Result<Url, MessageError> {
        Ok(self.base.join(SAMPLES_INDEX_PATH)?)
    }

    /// Location of the units index.
    ///
    /// # Errors
    ///
    /// Returns error if the path cannot be joined to the base.
    pub fn units_index(&self) -> Result<Url, MessageError> {
        Ok(self.base.join(UNITS_INDEX_PATH)?)
    }
}

/// A parsed index: names to absolute document URLs, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryIndex {
    entries: IndexMap<String, Url>,
}

impl LibraryIndex {
    /// Parse an index document, resolving every href against `relative_to`.
    ///
    /// # Errors
    ///
    /// Returns error if the document is not an object of strings or an href
    /// does not resolve.
    pub fn from_json_value(
        value: &serde_json::Value,
        relative_to: &Url,
    ) -> Result<Self, MessageError> {
        let object = value
            .as_object()
            .ok_or_else(|| MessageError::InvalidIndex("expected an object".to_string()))?;
        let mut entries = IndexMap::with_capacity(object.len());
        for (name, href) in object {
            let href = href.as_str().ok_or_else(|| {
                MessageError::InvalidIndex(format!("href of {name:?} is not a string"))
            })?;
            entries.insert(name.clone(), relative_to.join(href)?);
        }
        Ok(Self { entries })
    }

    /// Parse an index document from text. See [`LibraryIndex::from_json_value`].
    ///
    /// # Errors
    ///
    /// Returns error if the text is not a valid index.
    pub fn from_json_str(json: &str, relative_to: &Url) -> Result<Self, MessageError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| MessageError::Deserialize(e.to_string()))?;
        Self::from_json_value(&value, relative_to)
    }

    /// URL of `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Url> {
        self.entries.get(name)
    }

    /// Entry names in document order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterate over `(name, url)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Url)> {
        self.entries.iter().map(|(name, url)| (name.as_str(), url))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn layout_paths() {
        let layout = LibraryLayout::new("https://logic.example.com/app").unwrap();

        assert_eq!(layout.base().as_str(), "https://logic.example.com/app/");
        assert_eq!(
            layout.samples_index().unwrap().as_str(),
            "https://logic.example.com/app/samples/index.json"
        );
        assert_eq!(
            layout.units_index().unwrap().as_str(),
            "https://logic.example.com/app/units/index.json"
        );
    }

    #[test]
    fn layout_rejects_relative_base() {
        assert!(matches!(
            LibraryLayout::new("samples/"),
            Err(MessageError::InvalidUrl(_))
        ));
    }

    #[test]
    fn index_resolves_relative_hrefs() {
        let at = Url::parse("http://localhost:8080/samples/index.json").unwrap();
        let value = json!({
            "Counter": "counter.json",
            "Clock": "/shared/clock.json",
            "Remote": "https://cdn.example.com/adder.json"
        });

        let index = LibraryIndex::from_json_value(&value, &at).unwrap();

        assert_eq!(index.names().collect::<Vec<_>>(), vec!["Counter", "Clock", "Remote"]);
        assert_eq!(
            index.get("Counter").unwrap().as_str(),
            "http://localhost:8080/samples/counter.json"
        );
        assert_eq!(
            index.get("Clock").unwrap().as_str(),
            "http://localhost:8080/shared/clock.json"
        );
        assert_eq!(
            index.get("Remote").unwrap().as_str(),
            "https://cdn.example.com/adder.json"
        );
    }

    #[test]
    fn index_rejects_non_string_href() {
        let at = Url::parse("http://localhost/units/index.json").unwrap();
        assert!(matches!(
            LibraryIndex::from_json_value(&json!({ "and": 3 }), &at),
            Err(MessageError::InvalidIndex(_))
        ));
        assert!(matches!(
            LibraryIndex::from_json_value(&json!(["and"]), &at),
            Err(MessageError::InvalidIndex(_))
        ));
    }

    #[test]
    fn popular_units_in_order() {
        assert_eq!(popular_units(), vec!["and", "or", "xor", "d-latch"]);
    }
}
