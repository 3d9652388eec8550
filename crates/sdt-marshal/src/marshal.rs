// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Marshaller: values to `@SDT/` wire strings.
//!
//! Marshalling is total. Every [`Value`] has an encoding, and host types
//! without a structural encoding are written as scalars of their text form.
//! Host types may implement [`Encodable`] to supply their own encoding.

use crate::context::MarshallingContext;
use crate::value::{Map, MapClassInstance, Value};
use crate::wire::{
    CONTEXT_MARKER, DELIMITER, LIST_MARKER, MAP_CLASS_MAP_KEY, MAP_CLASS_NAME_KEY, MAP_MARKER,
    MC_INSTANCE_MARKER, NONE_MARKER, SCALAR_STRING_MARKER,
};

const NULL: &Value = &Value::Null;

/// Types that can write themselves as marshalled data.
pub trait Encodable {
    /// Append this value's encoding to `writer`.
    fn encode(&self, writer: &mut Writer<'_>);
}

/// Marshals `value`, resolving map classes against `context`.
pub fn marshall<T: Encodable + ?Sized>(value: &T, context: Option<&MarshallingContext>) -> String {
    let mut writer = Writer::new(context);
    value.encode(&mut writer);
    writer.into_string()
}

/// Output buffer plus the context map classes are resolved against.
#[derive(Debug, Default)]
pub struct Writer<'c> {
    buf: String,
    context: Option<&'c MarshallingContext>,
}

impl<'c> Writer<'c> {
    /// Empty writer resolving map classes against `context`.
    #[must_use]
    pub fn new(context: Option<&'c MarshallingContext>) -> Self {
        Self {
            buf: String::new(),
            context,
        }
    }

    /// Context map classes are resolved against.
    pub fn context(&self) -> Option<&'c MarshallingContext> {
        self.context
    }

    /// Empty writer sharing this writer's context, for building a payload.
    #[must_use]
    pub fn payload_writer(&self) -> Self {
        Self::new(self.context)
    }

    /// Appends already-marshalled data verbatim.
    pub fn write_raw(&mut self, data: &str) {
        self.buf.push_str(data);
    }

    /// `@SDT/$0:0:`
    pub fn write_null(&mut self) {
        self.buf.push_str(NONE_MARKER);
    }

    /// `@SDT/$S:<len>:<text>`
    pub fn write_scalar(&mut self, text: &str) {
        self.write_framed(SCALAR_STRING_MARKER, None, text);
    }

    /// `@SDT/[<count>:<len>:<items>`
    pub fn write_list<T: Encodable>(&mut self, items: &[T]) {
        let mut payload = self.payload_writer();
        for item in items {
            item.encode(&mut payload);
        }
        self.write_framed(LIST_MARKER, Some(items.len()), &payload.buf);
    }

    /// Writes `map`, as a map-class instance when it names a registered map
    /// class and as a generic map otherwise.
    pub fn write_map(&mut self, map: &Map) {
        let context = self.context;
        let def = map
            .get(MAP_CLASS_NAME_KEY)
            .and_then(Value::as_str)
            .and_then(|name| context?.get_map_class_definition(name));
        match def {
            Some(def) => {
                let fields = def.keys().iter().map(|k| map.get(k.key()).unwrap_or(NULL));
                self.write_map_class(def.name(), fields);
            }
            None => self.write_generic_map(map),
        }
    }

    /// `@SDT/{:<len>:` followed by `:<klen>:<key><value>` per entry.
    pub fn write_generic_map(&mut self, map: &Map) {
        let mut payload = self.payload_writer();
        for (key, value) in map {
            payload.write_length_prefixed(key);
            value.encode(&mut payload);
        }
        self.write_framed(MAP_MARKER, None, &payload.buf);
    }

    /// `@SDT/%:<len>::<nlen>:<name>` followed by each field.
    pub fn write_map_class<'v>(&mut self, name: &str, fields: impl IntoIterator<Item = &'v Value>) {
        let mut payload = self.payload_writer();
        payload.write_length_prefixed(name);
        for field in fields {
            field.encode(&mut payload);
        }
        self.write_framed(MC_INSTANCE_MARKER, None, &payload.buf);
    }

    /// `<marker>[count]:<len>:<payload>`
    pub fn write_framed(&mut self, marker: &str, count: Option<usize>, payload: &str) {
        self.buf.push_str(marker);
        if let Some(count) = count {
            self.buf.push_str(&count.to_string());
        }
        self.write_length_prefixed(payload);
    }

    /// `:<len>:<data>`
    fn write_length_prefixed(&mut self, data: &str) {
        self.buf.push(DELIMITER);
        self.buf.push_str(&data.len().to_string());
        self.buf.push(DELIMITER);
        self.buf.push_str(data);
    }

    /// Consumes the writer and returns the wire string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.buf
    }
}

impl Encodable for Value {
    fn encode(&self, writer: &mut Writer<'_>) {
        match self {
            Self::Null => writer.write_null(),
            Self::Scalar(text) => writer.write_scalar(text),
            Self::List(items) => writer.write_list(items),
            Self::Map(map) => writer.write_map(map),
            Self::MapClassInstance(instance) => instance.encode(writer),
            Self::Context(ctx) => ctx.encode(writer),
        }
    }
}

impl Encodable for MapClassInstance {
    fn encode(&self, writer: &mut Writer<'_>) {
        match writer
            .context()
            .and_then(|ctx| ctx.get_map_class_definition(self.name()))
        {
            Some(def) => {
                let fields = (0..def.keys().len()).map(|i| self.fields().get(i).unwrap_or(NULL));
                writer.write_map_class(self.name(), fields);
            }
            None => writer.write_map_class(self.name(), self.fields()),
        }
    }
}

impl Encodable for MarshallingContext {
    fn encode(&self, writer: &mut Writer<'_>) {
        let root = self.root_object().unwrap_or(NULL);
        if self.map_class_map().is_empty() {
            root.encode(writer);
            return;
        }

        let registry: Map = self
            .map_class_map()
            .iter()
            .map(|(name, def)| (name.clone(), def.to_value()))
            .collect();
        let mut context_map = Map::with_capacity(1);
        context_map.insert(MAP_CLASS_MAP_KEY.to_string(), Value::Map(registry));

        // Registry without schemas; root against this context's schemas.
        let mut payload = Writer::new(None);
        payload.write_generic_map(&context_map);
        let mut root_writer = Writer::new(Some(self));
        root.encode(&mut root_writer);
        payload.write_raw(&root_writer.buf);

        writer.write_framed(CONTEXT_MARKER, None, &payload.buf);
    }
}

impl Encodable for str {
    fn encode(&self, writer: &mut Writer<'_>) {
        writer.write_scalar(self);
    }
}

impl Encodable for String {
    fn encode(&self, writer: &mut Writer<'_>) {
        writer.write_scalar(self);
    }
}

macro_rules! encodable_via_display {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Encodable for $ty {
                fn encode(&self, writer: &mut Writer<'_>) {
                    writer.write_scalar(&self.to_string());
                }
            }
        )*
    };
}

encodable_via_display!(bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl<T: Encodable> Encodable for Option<T> {
    fn encode(&self, writer: &mut Writer<'_>) {
        match self {
            Some(value) => value.encode(writer),
            None => writer.write_null(),
        }
    }
}

impl<T: Encodable> Encodable for [T] {
    fn encode(&self, writer: &mut Writer<'_>) {
        writer.write_list(self);
    }
}

impl<T: Encodable> Encodable for Vec<T> {
    fn encode(&self, writer: &mut Writer<'_>) {
        writer.write_list(self);
    }
}

impl<T: Encodable + ?Sized> Encodable for &T {
    fn encode(&self, writer: &mut Writer<'_>) {
        (**self).encode(writer);
    }
}

impl<T: Encodable + ?Sized> Encodable for Box<T> {
    fn encode(&self, writer: &mut Writer<'_>) {
        (**self).encode(writer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::MapClassDefinition;

    fn map(entries: &[(&str, Value)]) -> Map {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    fn schema_s() -> MapClassDefinition {
        let mut def = MapClassDefinition::new("S");
        def.add_key_with_display_name("key1", "Key #1");
        def.add_key_with_display_name("key2", "Key #2");
        def
    }

    #[test]
    fn null_and_scalar_literals() {
        assert_eq!(marshall(&Value::Null, None), "@SDT/$0:0:");
        assert_eq!(marshall(&Value::from("abc"), None), "@SDT/$S:3:abc");
        assert_eq!(marshall(&Value::from(""), None), "@SDT/$S:0:");
    }

    #[test]
    fn scalar_length_counts_bytes() {
        assert_eq!(marshall("héllo", None), "@SDT/$S:6:héllo");
    }

    #[test]
    fn list_counts_items_and_payload_bytes() {
        let v = Value::from(vec!["a", "bc"]);
        assert_eq!(marshall(&v, None), "@SDT/[2:23:@SDT/$S:1:a@SDT/$S:2:bc");
        assert_eq!(marshall(&Value::List(vec![]), None), "@SDT/[0:0:");
    }

    #[test]
    fn generic_map_keeps_insertion_order() {
        let v = Value::Map(map(&[("b", "1".into()), ("a", Value::Null)]));
        assert_eq!(
            marshall(&v, None),
            "@SDT/{:29::1:b@SDT/$S:1:1:1:a@SDT/$0:0:"
        );
    }

    #[test]
    fn map_with_registered_class_is_positional() {
        let mut ctx = MarshallingContext::new();
        ctx.set_map_class_definition(schema_s());
        let v = Value::Map(map(&[
            (MAP_CLASS_NAME_KEY, "S".into()),
            ("key2", "two".into()),
        ]));
        assert_eq!(
            marshall(&v, Some(&ctx)),
            "@SDT/%:27::1:S@SDT/$0:0:@SDT/$S:3:two"
        );
    }

    #[test]
    fn map_with_unregistered_class_stays_generic() {
        let v = Value::Map(map(&[(MAP_CLASS_NAME_KEY, "S".into())]));
        assert!(marshall(&v, Some(&MarshallingContext::new())).starts_with(MAP_MARKER));
        assert!(marshall(&v, None).starts_with(MAP_MARKER));
    }

    #[test]
    fn explicit_instance_is_aligned_to_registered_keys() {
        let mut ctx = MarshallingContext::new();
        ctx.set_map_class_definition(schema_s());
        let short = MapClassInstance::new("S", vec!["one".into()]);
        assert_eq!(
            marshall(&short, Some(&ctx)),
            "@SDT/%:27::1:S@SDT/$S:3:one@SDT/$0:0:"
        );
        let long = MapClassInstance::new("S", vec!["1".into(), "2".into(), "3".into()]);
        assert_eq!(
            marshall(&long, Some(&ctx)),
            "@SDT/%:26::1:S@SDT/$S:1:1@SDT/$S:1:2"
        );
        assert_eq!(
            marshall(&long, None),
            "@SDT/%:37::1:S@SDT/$S:1:1@SDT/$S:1:2@SDT/$S:1:3"
        );
    }

    #[test]
    fn context_without_map_classes_elides_wrapper() {
        let ctx = MarshallingContext::with_root("x");
        assert_eq!(ctx.marshall(), "@SDT/$S:1:x");
        assert_eq!(marshall(&MarshallingContext::new(), None), NONE_MARKER);
    }

    #[test]
    fn context_carries_registry_then_root() {
        let mut def = MapClassDefinition::new("T");
        def.add_key("k");
        let mut ctx = MarshallingContext::new();
        ctx.set_map_class_definition(def);
        ctx.set_root_object(MapClassInstance::new("T", vec!["v".into()]));

        let registry = "@SDT/{:104::13:map-class-map@SDT/{:77::1:T@SDT/{:63::4:keys@SDT/[1:27:@SDT/{:17::3:key@SDT/$S:1:k:4:name@SDT/$S:1:T";
        let root = "@SDT/%:15::1:T@SDT/$S:1:v";
        let expected = format!("@SDT/*:{}:{registry}{root}", registry.len() + root.len());
        assert_eq!(ctx.marshall(), expected);
    }

    struct Point(i32, i32);

    impl Encodable for Point {
        fn encode(&self, writer: &mut Writer<'_>) {
            writer.write_scalar(&format!("{},{}", self.0, self.1));
        }
    }

    #[test]
    fn host_types_override_encoding() {
        assert_eq!(marshall(&Point(1, -2), None), "@SDT/$S:4:1,-2");
        assert_eq!(
            marshall(&vec![Some(7_u8), None], None),
            "@SDT/[2:21:@SDT/$S:1:7@SDT/$0:0:"
        );
    }
}
