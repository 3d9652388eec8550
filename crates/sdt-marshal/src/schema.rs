// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Map class definitions: named, ordered key schemas.
//!
//! Key order is load-bearing. It fixes the positional wire encoding of
//! map-class instances and the row order/labels used by the formatter.

use std::collections::BTreeMap;

use crate::value::{Map, Value};
use crate::wire::{DISPLAY_NAME_KEY, MAP_CLASS_NAME_KEY};

const KEY_KEY: &str = "key";
const KEYS_KEY: &str = "keys";
const NAME_KEY: &str = "name";

/// One key of a map class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeyDefinition {
    key: String,
    display_name: Option<String>,
    properties: BTreeMap<String, String>,
}

impl KeyDefinition {
    /// Key with no display label.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            display_name: None,
            properties: BTreeMap::new(),
        }
    }

    /// Raw key name.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Display label, if any.
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Label shown by the formatter: the display name, else the raw key.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.key)
    }

    /// Extra properties such as `display-short-name`.
    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// Looks up a property by name; `display-name` is served from the label.
    pub fn property(&self, name: &str) -> Option<&str> {
        if name == DISPLAY_NAME_KEY {
            return self.display_name();
        }
        self.properties.get(name).map(String::as_str)
    }

    fn set_property(&mut self, name: &str, value: String) {
        if name == DISPLAY_NAME_KEY {
            self.display_name = Some(value);
        } else if name != KEY_KEY {
            self.properties.insert(name.to_string(), value);
        }
    }

    /// Wire form: a map with entries in sorted key order.
    fn to_value(&self) -> Value {
        let mut entries: BTreeMap<&str, &str> = self
            .properties
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        if let Some(display) = &self.display_name {
            entries.insert(DISPLAY_NAME_KEY, display);
        }
        entries.insert(KEY_KEY, &self.key);
        entries.into_iter().collect()
    }

    fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_map()?;
        let mut def = Self::new(map.get(KEY_KEY)?.as_str()?);
        for (name, prop) in map {
            if name == KEY_KEY {
                continue;
            }
            def.set_property(name, prop.as_str()?.to_string());
        }
        Some(def)
    }
}

/// Named, ordered schema of keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MapClassDefinition {
    name: String,
    keys: Vec<KeyDefinition>,
}

impl MapClassDefinition {
    /// Empty definition named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keys: Vec::new(),
        }
    }

    /// Schema name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Keys in schema order.
    pub fn keys(&self) -> &[KeyDefinition] {
        &self.keys
    }

    /// Finds a key by its raw name.
    pub fn key(&self, key: &str) -> Option<&KeyDefinition> {
        self.keys.iter().find(|k| k.key == key)
    }

    /// Position of `key` in schema order.
    pub fn position(&self, key: &str) -> Option<usize> {
        self.keys.iter().position(|k| k.key == key)
    }

    /// Appends a key without a display label.
    pub fn add_key(&mut self, key: impl Into<String>) -> &mut Self {
        self.keys.push(KeyDefinition::new(key));
        self
    }

    /// Appends a key with a display label.
    pub fn add_key_with_display_name(
        &mut self,
        key: impl Into<String>,
        display_name: impl Into<String>,
    ) -> &mut Self {
        let mut def = KeyDefinition::new(key);
        def.display_name = Some(display_name.into());
        self.keys.push(def);
        self
    }

    /// Sets `property` on every key named `key` (e.g. `display-short-name`).
    ///
    /// Setting `display-name` replaces the key's display label. Unknown keys
    /// are ignored.
    pub fn set_key_property(
        &mut self,
        key: &str,
        property: &str,
        value: impl Into<String>,
    ) -> &mut Self {
        let value = value.into();
        for k in self.keys.iter_mut().filter(|k| k.key == key) {
            k.set_property(property, value.clone());
        }
        self
    }

    /// Fresh instance map holding only the `staf-map-class-name` entry.
    pub fn create_instance(&self) -> Value {
        let mut map = Map::new();
        map.insert(MAP_CLASS_NAME_KEY.to_string(), Value::from(self.name.as_str()));
        Value::Map(map)
    }

    /// Registry form carried inside a marshalled context.
    ///
    /// `{ "keys": [ { ["display-name"], ..., "key" }, ... ], "name": <name> }`
    pub fn to_value(&self) -> Value {
        let keys = Value::List(self.keys.iter().map(KeyDefinition::to_value).collect());
        let mut map = Map::with_capacity(2);
        map.insert(KEYS_KEY.to_string(), keys);
        map.insert(NAME_KEY.to_string(), Value::from(self.name.as_str()));
        Value::Map(map)
    }

    /// Parses the registry form produced by [`Self::to_value`].
    ///
    /// Returns `None` unless `value` is a map with a scalar `name` and a list
    /// of `keys`, each a map with a scalar `key` and scalar properties.
    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_map()?;
        let name = map.get(NAME_KEY)?.as_str()?;
        let keys = map
            .get(KEYS_KEY)?
            .as_list()?
            .iter()
            .map(KeyDefinition::from_value)
            .collect::<Option<Vec<_>>>()?;
        Some(Self {
            name: name.to_string(),
            keys,
        })
    }
}

impl core::fmt::Display for MapClassDefinition {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&crate::format::format(&self.to_value(), None, 0))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;

    #[test]
    fn labels_fall_back_to_raw_key() {
        let mut def = MapClassDefinition::new("S");
        def.add_key_with_display_name("key1", "Key #1").add_key("key2");
        let labels: Vec<_> = def.keys().iter().map(KeyDefinition::label).collect();
        assert_eq!(labels, vec!["Key #1", "key2"]);
        assert_eq!(def.position("key2"), Some(1));
    }

    #[test]
    fn key_properties_update_display_name_and_extras() {
        let mut def = MapClassDefinition::new("S");
        def.add_key("key1");
        def.set_key_property("key1", "display-name", "First");
        def.set_key_property("key1", "display-short-name", "1st");
        def.set_key_property("missing", "display-name", "ignored");
        let key = def.key("key1").expect("key1");
        assert_eq!(key.label(), "First");
        assert_eq!(key.property("display-short-name"), Some("1st"));
    }

    #[test]
    fn registry_form_sorts_entry_keys() {
        let mut def = MapClassDefinition::new("S");
        def.add_key_with_display_name("key1", "Key #1");
        def.set_key_property("key1", "display-short-name", "K1");
        let value = def.to_value();
        let top: Vec<_> = value.as_map().expect("map").keys().cloned().collect();
        assert_eq!(top, vec!["keys", "name"]);
        let entry = &value.get("keys").and_then(Value::as_list).expect("keys")[0];
        let entry_keys: Vec<_> = entry.as_map().expect("entry").keys().cloned().collect();
        assert_eq!(entry_keys, vec!["display-name", "display-short-name", "key"]);
        assert_eq!(MapClassDefinition::from_value(&value), Some(def));
    }

    #[test]
    fn registry_form_rejects_malformed_definitions() {
        assert_eq!(MapClassDefinition::from_value(&Value::from("S")), None);
        let no_keys: Value = std::iter::once(("name", "S")).collect();
        assert_eq!(MapClassDefinition::from_value(&no_keys), None);
        let nested_key: Value = [
            ("keys", Value::List(vec![Value::List(vec![])])),
            ("name", Value::from("S")),
        ]
        .into_iter()
        .collect();
        assert_eq!(MapClassDefinition::from_value(&nested_key), None);
    }

    #[test]
    fn create_instance_seeds_class_name() {
        let def = MapClassDefinition::new("Widget");
        assert_eq!(def.create_instance().map_class_name(), Some("Widget"));
    }
}
