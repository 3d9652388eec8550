// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Self-describing `@SDT/` marshalling.
//!
//! Values (null, scalars, lists, maps, map-class records and nested contexts)
//! are encoded into length-framed wire strings. Repeated record shapes are
//! described once by a [`MapClassDefinition`] registered in a
//! [`MarshallingContext`], and their instances are then encoded by position
//! instead of by key name.
//!
//! - [`marshall`] is total: every value has an encoding.
//! - [`unmarshall`] never fails: malformed input degrades to a context whose
//!   root is the input string itself.
//! - [`format`] renders values for logs and diagnostics.
//!
//! ```
//! use sdt_marshal::{
//!     format, marshall, unmarshall, MapClassDefinition, MarshallingContext, UnmarshallFlags,
//!     Value,
//! };
//!
//! let mut def = MapClassDefinition::new("Point");
//! def.add_key_with_display_name("x", "X").add_key_with_display_name("y", "Y");
//!
//! let mut point = def.create_instance();
//! if let Value::Map(map) = &mut point {
//!     map.insert("x".into(), "1".into());
//!     map.insert("y".into(), "2".into());
//! }
//!
//! let mut ctx = MarshallingContext::with_root(point);
//! ctx.set_map_class_definition(def);
//!
//! let wire = marshall(&ctx, None);
//! let back = unmarshall(&wire, None, UnmarshallFlags::DEFAULTS);
//! assert_eq!(format(&back.primary_object(), None, 0), "{\n  X: 1\n  Y: 2\n}");
//! ```

mod context;
mod format;
mod marshal;
mod schema;
mod unmarshal;
mod value;
pub mod wire;

pub use context::{MapClassMap, MarshallingContext};
pub use format::{format, format_with, FormatOptions};
pub use marshal::{marshall, Encodable, Writer};
pub use schema::{KeyDefinition, MapClassDefinition};
pub use unmarshal::{
    try_unmarshall, unmarshall, unmarshall_value, DecodeError, UnmarshallFlags, MAX_DEPTH,
};
pub use value::{Map, MapClassInstance, Value};
pub use wire::is_marshalled_data;
