// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Property tests: round trips, truncation, and arbitrary input.

use proptest::prelude::*;
use sdt_marshal::{
    format, marshall, try_unmarshall, unmarshall, unmarshall_value, Map, MapClassDefinition,
    MarshallingContext, UnmarshallFlags, Value,
};

fn text() -> impl Strategy<Value = String> {
    // Colons, marker fragments, and multi-byte characters on purpose.
    "[a-z0-9 :@/$%{}\\[*é漢]{0,12}"
}

fn value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![Just(Value::Null), text().prop_map(Value::Scalar)];
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::List),
            prop::collection::vec((text(), inner), 0..6)
                .prop_map(|entries| Value::Map(entries.into_iter().collect::<Map>())),
        ]
    })
}

fn row_schema() -> MarshallingContext {
    let mut def = MapClassDefinition::new("Row");
    def.add_key_with_display_name("id", "ID")
        .add_key_with_display_name("name", "Name")
        .add_key("note");
    let mut ctx = MarshallingContext::new();
    ctx.set_map_class_definition(def);
    ctx
}

fn row(id: String, name: Option<String>, note: Value) -> Value {
    [
        ("staf-map-class-name", Value::from("Row")),
        ("id", Value::from(id)),
        ("name", Value::from(name)),
        ("note", note),
    ]
    .into_iter()
    .collect()
}

proptest! {
    #[test]
    fn generic_values_round_trip(v in value()) {
        let wire = marshall(&v, None);
        let back = unmarshall_value(&wire, None, UnmarshallFlags::IGNORE_INDIRECT_OBJECTS);
        prop_assert_eq!(back, v);
    }

    #[test]
    fn map_class_rows_round_trip_through_a_context(
        rows in prop::collection::vec((text(), prop::option::of(text()), value()), 0..5)
    ) {
        let mut ctx = row_schema();
        let list = Value::List(
            rows.into_iter().map(|(id, name, note)| row(id, name, note)).collect(),
        );
        ctx.set_root_object(list.clone());

        let wire = ctx.marshall();
        let back = unmarshall(&wire, None, UnmarshallFlags::IGNORE_INDIRECT_OBJECTS);
        prop_assert_eq!(back.root_object(), Some(&list));
        prop_assert_eq!(back.map_class_map(), ctx.map_class_map());
        prop_assert_eq!(format(&back.primary_object(), None, 0), ctx.to_string());
    }

    #[test]
    fn every_truncation_degrades_to_itself(v in value()) {
        let wire = marshall(&Value::List(vec![v]), None);
        for cut in (0..wire.len()).filter(|&i| wire.is_char_boundary(i)) {
            let prefix = &wire[..cut];
            let back = unmarshall(prefix, None, UnmarshallFlags::DEFAULTS);
            prop_assert_eq!(back.root_object(), Some(&Value::from(prefix)));
        }
    }

    #[test]
    fn arbitrary_text_never_panics(data in "(@SDT/)?[\\[{%*$S0-9:a-zé]{0,64}") {
        let back = unmarshall(&data, None, UnmarshallFlags::DEFAULTS);
        if try_unmarshall(&data, None, UnmarshallFlags::DEFAULTS).is_err() {
            prop_assert_eq!(back.root_object(), Some(&Value::from(data.as_str())));
        }
    }

    #[test]
    fn arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let data = String::from_utf8_lossy(&bytes);
        let _ = unmarshall(&data, Some(&row_schema()), UnmarshallFlags::DEFAULTS);
    }
}
