//! Data cascade and merge-key strategies.
//!
//! A node's effective data is its parent's effective data with the node's own
//! data laid on top. Most keys simply override. Keys declared in `mergedKeys`
//! combine instead, using one of the strategies in [`MergeStrategy`].
//!
//! # Cascade Rules
//!
//! - Scalar keys: own value replaces the parent's
//! - `mergedKeys`: union of parent and own declarations (own wins per key)
//! - `array` keys: parent items then own items, deduplicated, first seen wins
//! - `stringArray` keys: like `array`, with every item coerced to a string
//! - `object` keys: shallow merge, own keys win on collision
//!
//! Strategy names are not validated here. Unknown names fall back to plain
//! override; rejecting them is the loader's job (see
//! [`Data::from_json`](crate::Data::from_json)).

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use serde::{Deserialize, Serialize};

use crate::data::{Data, keys};
use crate::value::{Map, Value};

/// How a merge key combines parent and own values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MergeStrategy {
    /// Concatenate sequences and deduplicate.
    Array,
    /// Concatenate sequences as strings and deduplicate.
    StringArray,
    /// Shallow-merge mappings.
    Object,
}

impl MergeStrategy {
    /// Parse a strategy name as written in `mergedKeys`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "array" => Some(Self::Array),
            "stringArray" => Some(Self::StringArray),
            "object" => Some(Self::Object),
            _ => None,
        }
    }

    /// Name of the strategy as written in `mergedKeys`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Array => "array",
            Self::StringArray => "stringArray",
            Self::Object => "object",
        }
    }

    /// Combine a parent value (if any) with an own value.
    #[must_use]
    pub fn combine(self, parent: Option<&Value>, own: &Value) -> Value {
        match self {
            Self::Array => {
                let mut out: Vec<Value> = Vec::new();
                for item in items(parent).chain(items(Some(own))) {
                    if !out.contains(item) {
                        out.push(item.clone());
                    }
                }
                Value::Array(out)
            }
            Self::StringArray => {
                let mut out: Vec<String> = Vec::new();
                for item in items(parent).chain(items(Some(own))) {
                    let text = item.to_plain_string();
                    if !out.contains(&text) {
                        out.push(text);
                    }
                }
                Value::Array(out.into_iter().map(Value::String).collect())
            }
            Self::Object => match (parent, own) {
                (Some(Value::Object(base)), Value::Object(over)) => {
                    let mut merged = base.clone();
                    merged.extend(over.iter().map(|(k, v)| (k.clone(), v.clone())));
                    Value::Object(merged)
                }
                _ => own.clone(),
            },
        }
    }
}

/// Iterate a value as a list: arrays yield their items, null yields nothing,
/// any other value is a single item.
fn items(value: Option<&Value>) -> impl Iterator<Item = &Value> {
    let slice: &[Value] = match value {
        None | Some(Value::Null) => &[],
        Some(Value::Array(items)) => items,
        Some(other) => std::slice::from_ref(other),
    };
    slice.iter()
}

/// Resolved merge-key declarations.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeKeys {
    strategies: BTreeMap<String, MergeStrategy>,
}

impl MergeKeys {
    /// Read declarations from a `mergedKeys` object, skipping unknown names.
    #[must_use]
    pub fn from_declarations(declarations: &Map) -> Self {
        let strategies = declarations
            .iter()
            .filter_map(|(key, value)| {
                let strategy = MergeStrategy::from_name(value.as_str()?)?;
                Some((key.clone(), strategy))
            })
            .collect();
        Self { strategies }
    }

    /// Strategy declared for `key`, if any.
    #[must_use]
    pub fn strategy(&self, key: &str) -> Option<MergeStrategy> {
        self.strategies.get(key).copied()
    }

    /// Iterate declared keys and strategies.
    pub fn iter(&self) -> impl Iterator<Item = (&str, MergeStrategy)> {
        self.strategies.iter().map(|(k, s)| (k.as_str(), *s))
    }

    /// Check if nothing is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

/// Effective parent of every node without a parent directory.
///
/// Declares the built-in merge keys so that a bare tree already merges tags.
static CASCADE_BASE: LazyLock<Arc<Data>> = LazyLock::new(|| {
    let mut declarations = Map::new();
    declarations.insert(
        keys::TAGS.to_owned(),
        Value::from(MergeStrategy::StringArray.as_str()),
    );
    let mut base = Data::new();
    base.insert(keys::MERGED_KEYS, Value::Object(declarations));
    Arc::new(base)
});

/// Data every parentless node cascades from.
pub(crate) fn cascade_base() -> Arc<Data> {
    Arc::clone(&CASCADE_BASE)
}

/// Compute effective data from the parent's effective data and own data.
#[must_use]
pub fn cascade(parent: &Data, own: &Data) -> Data {
    let declared = union_declarations(parent.get(keys::MERGED_KEYS), own.get(keys::MERGED_KEYS));
    let merge_keys = MergeKeys::from_declarations(&declared);

    let mut merged = parent.clone();
    for (key, value) in own.iter() {
        if key == keys::MERGED_KEYS {
            continue;
        }
        let value = match merge_keys.strategy(key) {
            Some(strategy) => strategy.combine(parent.get(key), value),
            None => value.clone(),
        };
        merged.insert(key, value);
    }

    if !declared.is_empty() {
        merged.insert(keys::MERGED_KEYS, Value::Object(declared));
    }
    merged
}

fn union_declarations(parent: Option<&Value>, own: Option<&Value>) -> Map {
    let mut declared = parent.and_then(Value::as_object).cloned().unwrap_or_default();
    if let Some(own) = own.and_then(Value::as_object) {
        declared.extend(own.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    declared
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn data(json: serde_json::Value) -> Data {
        Data::from_json(json).unwrap()
    }

    fn strings(items: &[&str]) -> Value {
        Value::Array(items.iter().map(|s| Value::from(*s)).collect())
    }

    #[test]
    fn test_scalar_override() {
        let parent = data(serde_json::json!({"layout": "base.vto", "title": "Parent"}));
        let own = data(serde_json::json!({"title": "Child"}));
        let merged = cascade(&parent, &own);
        assert_eq!(merged.get("title"), Some(&Value::from("Child")));
        assert_eq!(merged.get("layout"), Some(&Value::from("base.vto")));
    }

    #[test]
    fn test_string_array_parent_first_dedup() {
        let parent = cascade(&cascade_base(), &data(serde_json::json!({"tags": ["a"]})));
        let own = data(serde_json::json!({"tags": ["a", "b"]}));
        let merged = cascade(&parent, &own);
        assert_eq!(merged.get("tags"), Some(&strings(&["a", "b"])));
    }

    #[test]
    fn test_string_array_coerces_items() {
        let parent = data(serde_json::json!({
            "mergedKeys": {"ids": "stringArray"},
            "ids": [1, "2"]
        }));
        let own = data(serde_json::json!({"ids": [2, true]}));
        let merged = cascade(&parent, &own);
        assert_eq!(merged["ids"], strings(&["1", "2", "true"]));
    }

    #[test]
    fn test_array_keeps_types() {
        let parent = data(serde_json::json!({"mergedKeys": {"extra": "array"}, "extra": [1]}));
        let own = data(serde_json::json!({"extra": [1, "1"]}));
        let merged = cascade(&parent, &own);
        assert_eq!(
            merged["extra"],
            Value::Array(vec![Value::Number(1.0), Value::from("1")])
        );
    }

    #[test]
    fn test_object_shallow_merge_own_wins() {
        let parent = data(serde_json::json!({
            "mergedKeys": {"site": "object"},
            "site": {"name": "Parent", "lang": "en"}
        }));
        let own = data(serde_json::json!({"site": {"name": "Child"}}));
        let merged = cascade(&parent, &own);
        let site = merged["site"].as_object().unwrap();
        assert_eq!(site.get("name"), Some(&Value::from("Child")));
        assert_eq!(site.get("lang"), Some(&Value::from("en")));
    }

    #[test]
    fn test_own_declaration_applies_at_own_level() {
        let parent = data(serde_json::json!({"authors": ["ann"]}));
        let own = data(serde_json::json!({
            "mergedKeys": {"authors": "array"},
            "authors": ["bob"]
        }));
        let merged = cascade(&parent, &own);
        assert_eq!(merged["authors"], strings(&["ann", "bob"]));
    }

    #[test]
    fn test_declarations_union() {
        let parent = data(serde_json::json!({"mergedKeys": {"a": "array"}}));
        let own = data(serde_json::json!({"mergedKeys": {"b": "object"}}));
        let merged = cascade(&parent, &own);
        let keys = merged.merged_keys();
        assert_eq!(keys.strategy("a"), Some(MergeStrategy::Array));
        assert_eq!(keys.strategy("b"), Some(MergeStrategy::Object));
    }

    #[test]
    fn test_unknown_strategy_overrides() {
        let mut parent = Data::new();
        let mut decl = Map::new();
        decl.insert("x".to_owned(), Value::from("concat"));
        parent.insert(keys::MERGED_KEYS, Value::Object(decl));
        parent.insert("x", strings(&["a"]));
        let mut own = Data::new();
        own.insert("x", strings(&["b"]));

        let merged = cascade(&parent, &own);
        assert_eq!(merged["x"], strings(&["b"]));
    }

    #[test]
    fn test_base_declares_tags() {
        let keys = cascade_base().merged_keys();
        assert_eq!(keys.strategy("tags"), Some(MergeStrategy::StringArray));
    }
}
