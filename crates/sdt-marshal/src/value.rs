// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Dynamically-shaped value model carried by the marshalling codec.
//!
//! A [`Value`] is one of:
//!
//! - `Null`
//! - `Scalar` text (every non-container host value is coerced to text)
//! - `List` of values
//! - `Map` of unique string keys to values, in insertion order
//! - `MapClassInstance`, a record whose fields follow a named schema
//! - `Context`, an owned [`MarshallingContext`] carrying its own schemas
//!
//! Unmarshalled map-class instances whose class is registered come back as
//! `Map`s holding a `staf-map-class-name` entry. Instances of unregistered
//! classes stay positional as [`MapClassInstance`]s.

use core::fmt;

use indexmap::IndexMap;

use crate::context::MarshallingContext;
use crate::schema::MapClassDefinition;
use crate::wire::MAP_CLASS_NAME_KEY;

/// Ordered generic map used by [`Value::Map`].
pub type Map = IndexMap<String, Value>;

/// Marshallable value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// Absent value.
    #[default]
    Null,
    /// Text scalar.
    Scalar(String),
    /// Ordered list.
    List(Vec<Value>),
    /// Ordered map with unique keys.
    Map(Map),
    /// Positional record described by a map class definition.
    MapClassInstance(MapClassInstance),
    /// Nested context owning its own schema registry.
    Context(Box<MarshallingContext>),
}

impl Value {
    /// True for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Text of a scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Items of a list.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Entries of a generic map.
    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Embedded context.
    pub fn as_context(&self) -> Option<&MarshallingContext> {
        match self {
            Self::Context(ctx) => Some(ctx),
            _ => None,
        }
    }

    /// Looks up `key` in a generic map.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|map| map.get(key))
    }

    /// Map class this value claims to be an instance of.
    ///
    /// For generic maps this is the scalar `staf-map-class-name` entry.
    pub fn map_class_name(&self) -> Option<&str> {
        match self {
            Self::Map(map) => map.get(MAP_CLASS_NAME_KEY).and_then(Value::as_str),
            Self::MapClassInstance(instance) => Some(instance.name()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::format::format(self, None, 0))
    }
}

/// Record whose fields are stored by position in its map class's key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MapClassInstance {
    name: String,
    fields: Vec<Value>,
}

impl MapClassInstance {
    /// Creates an instance of map class `name` with positional `fields`.
    pub fn new(name: impl Into<String>, fields: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Projects a keyed map onto `def`'s key order.
    ///
    /// Keys the map lacks become `Null`; keys the schema lacks are ignored.
    pub fn from_map(def: &MapClassDefinition, map: &Map) -> Self {
        let fields = def
            .keys()
            .iter()
            .map(|k| map.get(k.key()).cloned().unwrap_or_default())
            .collect();
        Self::new(def.name(), fields)
    }

    /// Map class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Positional fields.
    pub fn fields(&self) -> &[Value] {
        &self.fields
    }

    /// Mutable positional fields.
    pub fn fields_mut(&mut self) -> &mut Vec<Value> {
        &mut self.fields
    }

    /// Field at the position of `key` in `def`.
    pub fn field(&self, def: &MapClassDefinition, key: &str) -> Option<&Value> {
        def.position(key).and_then(|idx| self.fields.get(idx))
    }

    /// Keyed view: the map-class name entry followed by one entry per field.
    ///
    /// Fields beyond the schema's keys are dropped; keys beyond the fields are
    /// left absent.
    pub fn to_map(&self, def: &MapClassDefinition) -> Map {
        let mut map = Map::with_capacity(self.fields.len() + 1);
        map.insert(MAP_CLASS_NAME_KEY.to_string(), Value::from(self.name.as_str()));
        for (key, field) in def.keys().iter().zip(&self.fields) {
            map.insert(key.key().to_string(), field.clone());
        }
        map
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Scalar(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Scalar(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Self::Scalar(s.clone())
    }
}

macro_rules! scalar_from_display {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::Scalar(v.to_string())
                }
            }
        )*
    };
}

scalar_from_display!(bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Self::Map(map)
    }
}

impl From<MapClassInstance> for Value {
    fn from(instance: MapClassInstance) -> Self {
        Self::MapClassInstance(instance)
    }
}

impl From<MarshallingContext> for Value {
    fn from(ctx: MarshallingContext) -> Self {
        Self::Context(Box::new(ctx))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::Map(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> MapClassDefinition {
        let mut def = MapClassDefinition::new("S");
        def.add_key("key1");
        def.add_key("key2");
        def.add_key("key3");
        def
    }

    #[test]
    fn conversions_coerce_to_scalars() {
        assert_eq!(Value::from(42_u32), Value::Scalar("42".into()));
        assert_eq!(Value::from(-7_i64), Value::Scalar("-7".into()));
        assert_eq!(Value::from(true), Value::Scalar("true".into()));
        assert_eq!(Value::from(None::<&str>), Value::Null);
        assert_eq!(
            Value::from(vec!["a", "b"]),
            Value::List(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn map_from_iter_keeps_insertion_order() {
        let v: Value = [("z", "1"), ("a", "2")].into_iter().collect();
        let keys: Vec<_> = v.as_map().map(|m| m.keys().cloned().collect()).unwrap_or_default();
        assert_eq!(keys, vec!["z".to_string(), "a".to_string()]);
    }

    #[test]
    fn instance_from_map_pads_missing_keys_with_null() {
        let def = schema();
        let map: Map = [("key3", Value::from("c")), ("key1", Value::from("a"))]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let inst = MapClassInstance::from_map(&def, &map);
        assert_eq!(inst.fields(), &[Value::from("a"), Value::Null, Value::from("c")]);
        assert_eq!(inst.field(&def, "key3"), Some(&Value::from("c")));
    }

    #[test]
    fn instance_to_map_leads_with_class_name() {
        let def = schema();
        let inst = MapClassInstance::new("S", vec!["a".into()]);
        let map = inst.to_map(&def);
        let keys: Vec<_> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, vec![MAP_CLASS_NAME_KEY, "key1"]);
        assert_eq!(Value::Map(map).map_class_name(), Some("S"));
    }
}
