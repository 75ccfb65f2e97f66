//! Per-node data bags.
//!
//! Provides [`Data`], the open mapping every page and directory carries, and
//! the loader-boundary conversion from JSON-shaped input.
//!
//! # Reserved Keys
//!
//! - `url`: Output URL, derived by [`Page::update_dest`](crate::Page::update_dest)
//! - `tags`: Tag list (merged as `stringArray` by default)
//! - `date`: Publication date (also injected from filename prefixes)
//! - `draft`: Excluded-from-output marker
//! - `layout`: Layout template name for renderers
//! - `mergedKeys`: Per-key merge strategy declarations
//!
//! Any other key is plugin data and passes through the cascade untouched.

use std::ops::Index;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::merge::{MergeKeys, MergeStrategy};
use crate::value::{Map, Value};

/// Reserved key names.
pub mod keys {
    /// Output URL.
    pub const URL: &str = "url";
    /// Tag list.
    pub const TAGS: &str = "tags";
    /// Publication date.
    pub const DATE: &str = "date";
    /// Draft marker.
    pub const DRAFT: &str = "draft";
    /// Layout name.
    pub const LAYOUT: &str = "layout";
    /// Merge strategy declarations.
    pub const MERGED_KEYS: &str = "mergedKeys";
    /// Self reference set by plugins, never copied by `duplicate`.
    pub const PAGE: &str = "page";
}

static NULL: Value = Value::Null;

/// Open mapping from key to [`Value`].
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Data {
    fields: Map,
}

impl Data {
    /// Create an empty data bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a data bag from loader output.
    ///
    /// The input must be a JSON object. A `mergedKeys` entry must be an object
    /// mapping key names to `array`, `stringArray` or `object`.
    ///
    /// # Errors
    ///
    /// Returns [`DataError`] if the input is not an object or declares an
    /// invalid merge strategy.
    pub fn from_json(value: serde_json::Value) -> Result<Self, DataError> {
        let serde_json::Value::Object(object) = value else {
            return Err(DataError::NotAnObject);
        };

        if let Some(declared) = object.get(keys::MERGED_KEYS) {
            validate_merged_keys(declared)?;
        }

        let fields = object
            .into_iter()
            .map(|(key, value)| (key, Value::from(value)))
            .collect();
        Ok(Self { fields })
    }

    /// Parse and validate a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Json`] on malformed JSON, otherwise the errors of
    /// [`Data::from_json`].
    pub fn from_json_str(json: &str) -> Result<Self, DataError> {
        Self::from_json(serde_json::from_str(json)?)
    }

    /// Get a value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Insert a value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    /// Remove a value by key.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    /// Check if a key is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the bag has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Overlay every entry of `other`, replacing existing keys.
    pub fn overlay(&mut self, other: &Data) {
        self.fields
            .extend(other.fields.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    /// Output URL, if derived.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.get(keys::URL).and_then(Value::as_str)
    }

    /// Tags as strings. A single scalar counts as one tag.
    #[must_use]
    pub fn tags(&self) -> Vec<String> {
        match self.get(keys::TAGS) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items.iter().map(Value::to_plain_string).collect(),
            Some(other) => vec![other.to_plain_string()],
        }
    }

    /// Publication date, if set as a date value.
    #[must_use]
    pub fn date(&self) -> Option<NaiveDateTime> {
        self.get(keys::DATE).and_then(Value::as_date)
    }

    /// Check the draft marker.
    #[must_use]
    pub fn is_draft(&self) -> bool {
        self.get(keys::DRAFT)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Layout name, if set.
    #[must_use]
    pub fn layout(&self) -> Option<&str> {
        self.get(keys::LAYOUT).and_then(Value::as_str)
    }

    /// Merge-key declarations carried by this bag.
    #[must_use]
    pub fn merged_keys(&self) -> MergeKeys {
        self.get(keys::MERGED_KEYS)
            .and_then(Value::as_object)
            .map(MergeKeys::from_declarations)
            .unwrap_or_default()
    }
}

impl Index<&str> for Data {
    type Output = Value;

    /// Missing keys index as [`Value::Null`].
    fn index(&self, key: &str) -> &Value {
        self.fields.get(key).unwrap_or(&NULL)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Data {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn validate_merged_keys(declared: &serde_json::Value) -> Result<(), DataError> {
    let serde_json::Value::Object(declared) = declared else {
        return Err(DataError::InvalidMergedKeys);
    };
    for (key, strategy) in declared {
        let name = strategy.as_str().unwrap_or_default();
        if MergeStrategy::from_name(name).is_none() {
            return Err(DataError::UnknownMergeStrategy {
                key: key.clone(),
                strategy: strategy.to_string(),
            });
        }
    }
    Ok(())
}

/// Error raised while converting loader output into [`Data`].
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// Top-level value is not an object.
    #[error("Data must be an object")]
    NotAnObject,
    /// `mergedKeys` is not an object.
    #[error("mergedKeys must be an object")]
    InvalidMergedKeys,
    /// `mergedKeys` names a strategy the cascade does not know.
    #[error("Unknown merge strategy {strategy} for key \"{key}\"")]
    UnknownMergeStrategy {
        /// Declared key.
        key: String,
        /// Offending strategy as written.
        strategy: String,
    },
    /// Malformed JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
