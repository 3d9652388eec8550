// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Marshalling context: an optional root value plus a map class registry.

use std::collections::BTreeMap;

use crate::schema::MapClassDefinition;
use crate::value::Value;

/// Registry of map class definitions keyed by name.
pub type MapClassMap = BTreeMap<String, MapClassDefinition>;

/// The unit exchanged between producer and consumer.
///
/// Owns its root value and its registry. Contexts embedded in a [`Value`] are
/// moved in, never shared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MarshallingContext {
    root: Option<Value>,
    map_classes: MapClassMap,
}

impl MarshallingContext {
    /// Empty context: no root, no map classes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context holding `root` and no map classes.
    pub fn with_root(root: impl Into<Value>) -> Self {
        Self {
            root: Some(root.into()),
            map_classes: MapClassMap::new(),
        }
    }

    /// Context built from an existing registry.
    pub fn with_map_classes(root: Option<Value>, map_classes: MapClassMap) -> Self {
        Self { root, map_classes }
    }

    /// Registers `def`, replacing any definition with the same name.
    pub fn set_map_class_definition(&mut self, def: MapClassDefinition) -> &mut Self {
        self.map_classes.insert(def.name().to_string(), def);
        self
    }

    /// Definition registered under `name`.
    pub fn get_map_class_definition(&self, name: &str) -> Option<&MapClassDefinition> {
        self.map_classes.get(name)
    }

    /// True if `name` is registered.
    pub fn has_map_class_definition(&self, name: &str) -> bool {
        self.map_classes.contains_key(name)
    }

    /// Registered definitions, ordered by name.
    pub fn map_class_definitions(&self) -> impl Iterator<Item = &MapClassDefinition> {
        self.map_classes.values()
    }

    /// The whole registry.
    pub fn map_class_map(&self) -> &MapClassMap {
        &self.map_classes
    }

    /// Replaces the root value.
    pub fn set_root_object(&mut self, root: impl Into<Value>) -> &mut Self {
        self.root = Some(root.into());
        self
    }

    /// Root value, if set.
    pub fn root_object(&self) -> Option<&Value> {
        self.root.as_ref()
    }

    /// Removes and returns the root value.
    pub fn take_root_object(&mut self) -> Option<Value> {
        self.root.take()
    }

    /// The value a consumer should work with.
    ///
    /// With an empty registry this is the root itself (or `Null`); otherwise
    /// the whole context, since the schemas must travel with the value for
    /// later formatting or re-marshalling.
    pub fn primary_object(&self) -> Value {
        self.clone().into_primary_object()
    }

    /// Owned form of [`Self::primary_object`].
    pub fn into_primary_object(self) -> Value {
        if self.map_classes.is_empty() {
            self.root.unwrap_or_default()
        } else {
            Value::Context(Box::new(self))
        }
    }

    /// Marshals this context using itself as the schema source.
    pub fn marshall(&self) -> String {
        crate::marshal::marshall(self, Some(self))
    }
}

impl core::fmt::Display for MarshallingContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let root = self.root.as_ref().unwrap_or(&Value::Null);
        f.write_str(&crate::format::format(root, Some(self), 0))
    }
}
