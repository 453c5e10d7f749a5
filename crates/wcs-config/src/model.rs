//! Immutable configuration snapshots.
//!
//! A [`ConfigurationModel`] is one layer's worth of key→value data: a base
//! tree of dotted-path keys plus per-override-identifier sections that take
//! precedence within the layer. Models are never mutated after construction;
//! every derived state is a new instance.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An immutable snapshot of one configuration layer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationModel {
    contents: Map<String, Value>,
    keys: Vec<String>,
    overrides: BTreeMap<String, Map<String, Value>>,
    unsupported_keys: Vec<String>,
}

impl ConfigurationModel {
    #[must_use]
    pub fn new(
        contents: Map<String, Value>,
        keys: Vec<String>,
        overrides: BTreeMap<String, Map<String, Value>>,
        unsupported_keys: Vec<String>,
    ) -> Self {
        ConfigurationModel {
            contents,
            keys,
            overrides,
            unsupported_keys,
        }
    }

    /// A model holding a single key.
    #[must_use]
    pub fn with_key_value(key: &str, value: Value) -> Self {
        let mut model = ConfigurationModel::default();
        model.insert(key, value);
        model
    }

    /// Build a model from a flat map of dotted keys.
    ///
    /// Bracketed top-level keys (`"[ident]"`) become override sections; their
    /// object values are read as flat dotted maps as well.
    #[must_use]
    pub fn from_flat_map(map: &Map<String, Value>) -> Self {
        let mut model = ConfigurationModel::default();
        for (key, value) in map {
            if let Some(identifier) = override_identifier(key) {
                if let Value::Object(section) = value {
                    for (k, v) in section {
                        model.insert_override(identifier, k, v.clone());
                    }
                }
            } else {
                model.insert(key, value.clone());
            }
        }
        model
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contents.is_empty() && self.overrides.is_empty()
    }

    /// Dotted leaf keys of the base section, in insertion order.
    #[must_use]
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    #[must_use]
    pub fn unsupported_keys(&self) -> &[String] {
        &self.unsupported_keys
    }

    /// Look up a dotted-path key in the base section.
    #[must_use]
    pub fn get_value(&self, key: &str) -> Option<&Value> {
        lookup(&self.contents, key)
    }

    /// Look up a key with an override identifier applied.
    ///
    /// The identifier's section is preferred; absent there, the base value
    /// answers.
    #[must_use]
    pub fn get_override_value(&self, key: &str, identifier: &str) -> Option<&Value> {
        self.overrides
            .get(identifier)
            .and_then(|section| lookup_flat(section, key))
            .or_else(|| self.get_value(key))
    }

    /// The base section as a JSON object.
    #[must_use]
    pub fn contents(&self) -> &Map<String, Value> {
        &self.contents
    }

    /// Merge `other` on top of this model; later leaf values win, override
    /// sections are merged per identifier and carried through when present in
    /// only one operand.
    #[must_use]
    pub fn merge(&self, other: &ConfigurationModel) -> ConfigurationModel {
        let mut contents = self.contents.clone();
        merge_maps(&mut contents, &other.contents);

        let mut keys = self.keys.clone();
        for key in &other.keys {
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }

        let mut overrides = self.overrides.clone();
        for (identifier, section) in &other.overrides {
            overrides
                .entry(identifier.clone())
                .and_modify(|existing| existing.extend(section.clone()))
                .or_insert_with(|| section.clone());
        }

        let mut unsupported_keys = self.unsupported_keys.clone();
        for key in &other.unsupported_keys {
            if !unsupported_keys.contains(key) {
                unsupported_keys.push(key.clone());
            }
        }

        ConfigurationModel {
            contents,
            keys,
            overrides,
            unsupported_keys,
        }
    }

    /// The set of dotted keys whose value differs between the two models.
    ///
    /// A key is changed when present in exactly one model, or present in both
    /// with structurally unequal values. Keys inside override sections are
    /// reported in bracketed form (`"[ident].key"`). The result is symmetric.
    #[must_use]
    pub fn compare(&self, other: &ConfigurationModel) -> BTreeSet<String> {
        let mut changed = BTreeSet::new();

        let mut base_keys: BTreeSet<String> = leaf_keys(&self.contents);
        base_keys.extend(leaf_keys(&other.contents));
        for key in base_keys {
            if lookup(&self.contents, &key) != lookup(&other.contents, &key) {
                changed.insert(key);
            }
        }

        let identifiers: BTreeSet<&String> =
            self.overrides.keys().chain(other.overrides.keys()).collect();
        for identifier in identifiers {
            let ours = self.overrides.get(identifier);
            let theirs = other.overrides.get(identifier);
            let mut section_keys: BTreeSet<&String> = BTreeSet::new();
            section_keys.extend(ours.into_iter().flat_map(Map::keys));
            section_keys.extend(theirs.into_iter().flat_map(Map::keys));
            for key in section_keys {
                let a = ours.and_then(|s| s.get(key));
                let b = theirs.and_then(|s| s.get(key));
                if a != b {
                    changed.insert(format!("[{identifier}].{key}"));
                }
            }
        }

        changed
    }

    /// A copy of this model with `key` removed from the base section.
    #[must_use]
    pub fn without_key(&self, key: &str) -> ConfigurationModel {
        let mut model = self.clone();
        remove(&mut model.contents, key);
        model.keys.retain(|k| k != key);
        model
    }

    pub(crate) fn insert(&mut self, key: &str, value: Value) {
        insert(&mut self.contents, key, value);
        if !self.keys.iter().any(|k| k == key) {
            self.keys.push(key.to_string());
        }
    }

    pub(crate) fn insert_override(&mut self, identifier: &str, key: &str, value: Value) {
        self.overrides
            .entry(identifier.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    // In-place removal is reserved for the aggregator's memory layer, the one
    // layer whose state is owned outright rather than swapped wholesale.
    pub(crate) fn remove(&mut self, key: &str) {
        remove(&mut self.contents, key);
        self.keys.retain(|k| k != key);
    }

    pub(crate) fn remove_override(&mut self, identifier: &str, key: &str) {
        if let Some(section) = self.overrides.get_mut(identifier) {
            section.remove(key);
            if section.is_empty() {
                self.overrides.remove(identifier);
            }
        }
    }

    pub(crate) fn push_unsupported(&mut self, key: &str) {
        if !self.unsupported_keys.iter().any(|k| k == key) {
            self.unsupported_keys.push(key.to_string());
        }
    }
}

/// Extract the override identifier from a bracketed settings key.
#[must_use]
pub(crate) fn override_identifier(key: &str) -> Option<&str> {
    key.strip_prefix('[')?.strip_suffix(']')
}

fn insert(map: &mut Map<String, Value>, key: &str, value: Value) {
    match key.split_once('.') {
        None => {
            map.insert(key.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = map
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                // A leaf is being refined into a subtree; the dotted form wins.
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(child) = entry {
                insert(child, rest, value);
            }
        }
    }
}

fn remove(map: &mut Map<String, Value>, key: &str) {
    match key.split_once('.') {
        None => {
            map.remove(key);
        }
        Some((head, rest)) => {
            let mut emptied = false;
            if let Some(Value::Object(child)) = map.get_mut(head) {
                remove(child, rest);
                emptied = child.is_empty();
            }
            if emptied {
                map.remove(head);
            }
        }
    }
}

fn lookup<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    match key.split_once('.') {
        None => map.get(key),
        Some((head, rest)) => match map.get(head)? {
            Value::Object(child) => lookup(child, rest),
            _ => None,
        },
    }
}

// Override sections are stored flat; dotted keys are literal entries there.
fn lookup_flat<'a>(section: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    section.get(key)
}

fn merge_maps(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (key, value) in source {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_maps(existing, incoming);
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

fn leaf_keys(map: &Map<String, Value>) -> BTreeSet<String> {
    fn walk(map: &Map<String, Value>, prefix: &str, out: &mut BTreeSet<String>) {
        for (key, value) in map {
            let dotted = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            match value {
                Value::Object(child) if !child.is_empty() => walk(child, &dotted, out),
                _ => {
                    out.insert(dotted);
                }
            }
        }
    }

    let mut out = BTreeSet::new();
    walk(map, "", &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn model(flat: Value) -> ConfigurationModel {
        match flat {
            Value::Object(map) => ConfigurationModel::from_flat_map(&map),
            _ => panic!("expected object"),
        }
    }

    mod lookup {
        use super::*;

        #[test]
        fn dotted_keys_resolve_through_the_tree() {
            let m = model(json!({"editor.font.size": 12, "files.exclude": ["a"]}));
            assert_eq!(m.get_value("editor.font.size"), Some(&json!(12)));
            assert_eq!(m.get_value("editor.font"), Some(&json!({"size": 12})));
            assert_eq!(m.get_value("editor.missing"), None);
        }

        #[test]
        fn override_section_preferred_over_base() {
            let m = model(json!({
                "tabs.width": 4,
                "[markdown]": {"tabs.width": 2}
            }));
            assert_eq!(m.get_override_value("tabs.width", "markdown"), Some(&json!(2)));
            assert_eq!(m.get_override_value("tabs.width", "python"), Some(&json!(4)));
            assert_eq!(m.get_value("tabs.width"), Some(&json!(4)));
        }
    }

    mod merge {
        use super::*;

        #[test]
        fn later_leaf_wins() {
            let a = model(json!({"x.y": 1, "x.z": 2}));
            let b = model(json!({"x.y": 10}));
            let merged = a.merge(&b);
            assert_eq!(merged.get_value("x.y"), Some(&json!(10)));
            assert_eq!(merged.get_value("x.z"), Some(&json!(2)));
        }

        #[test]
        fn override_sections_carry_through() {
            let a = model(json!({"[md]": {"a": 1}}));
            let b = model(json!({"[py]": {"b": 2}}));
            let merged = a.merge(&b);
            assert_eq!(merged.get_override_value("a", "md"), Some(&json!(1)));
            assert_eq!(merged.get_override_value("b", "py"), Some(&json!(2)));
        }

        #[test]
        fn matching_override_sections_merge_with_later_winning() {
            let a = model(json!({"[md]": {"a": 1, "b": 1}}));
            let b = model(json!({"[md]": {"a": 2}}));
            let merged = a.merge(&b);
            assert_eq!(merged.get_override_value("a", "md"), Some(&json!(2)));
            assert_eq!(merged.get_override_value("b", "md"), Some(&json!(1)));
        }
    }

    mod compare {
        use super::*;

        #[test]
        fn reports_added_removed_and_unequal() {
            let a = model(json!({"x": 1, "y": 2, "z": 3}));
            let b = model(json!({"x": 1, "y": 5, "w": 4}));
            let changed = a.compare(&b);
            let expected: BTreeSet<String> = ["y", "z", "w"].iter().map(|s| (*s).to_string()).collect();
            assert_eq!(changed, expected);
        }

        #[test]
        fn is_symmetric() {
            let a = model(json!({"x": 1, "n.a": true, "[md]": {"k": 1}}));
            let b = model(json!({"x": 2, "n.b": false, "[md]": {"k": 2}}));
            assert_eq!(a.compare(&b), b.compare(&a));
        }

        #[test]
        fn equal_models_compare_empty() {
            let a = model(json!({"x": {"deep": [1, 2]}, "[md]": {"k": 1}}));
            assert!(a.compare(&a.clone()).is_empty());
        }

        #[test]
        fn override_keys_reported_in_bracketed_form() {
            let a = model(json!({"[md]": {"k": 1}}));
            let b = model(json!({}));
            let changed = a.compare(&b);
            assert!(changed.contains("[md].k"));
        }

        #[test]
        fn deep_structural_equality() {
            let a = model(json!({"x": {"list": [1, {"y": 2}]}}));
            let b = model(json!({"x": {"list": [1, {"y": 3}]}}));
            assert_eq!(a.compare(&b).len(), 1);
        }
    }

    #[test]
    fn without_key_prunes_empty_parents() {
        let m = model(json!({"a.b.c": 1}));
        let removed = m.without_key("a.b.c");
        assert!(removed.is_empty());
        assert!(removed.keys().is_empty());
    }

    #[test]
    fn with_key_value_round_trips() {
        let m = ConfigurationModel::with_key_value("a.b", json!(3));
        assert_eq!(m.get_value("a.b"), Some(&json!(3)));
        assert_eq!(m.keys(), ["a.b"]);
    }
}
