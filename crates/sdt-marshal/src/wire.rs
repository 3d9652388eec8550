// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `@SDT/` wire markers.
//!
//! Every marshalled value starts with one of these literal markers, followed by
//! colon-delimited decimal length fields and a payload of exactly the declared
//! number of bytes:
//!
//! ```text
//! @SDT/$0:0:                                   null
//! @SDT/$S:<len>:<text>                         scalar string
//! @SDT/[<count>:<len>:<item>...                list
//! @SDT/{:<len>::<klen>:<key><value>...         map
//! @SDT/%:<len>::<nlen>:<name><value>...        map-class instance
//! @SDT/*:<len>:<registry map><root>            marshalling context
//! ```

/// Prefix shared by every marshalled value.
pub const MARSHALLED_DATA_MARKER: &str = "@SDT/";
/// Complete encoding of the null value.
pub const NONE_MARKER: &str = "@SDT/$0:0:";
/// Scalar string marker.
pub const SCALAR_STRING_MARKER: &str = "@SDT/$S";
/// List marker.
pub const LIST_MARKER: &str = "@SDT/[";
/// Generic map marker.
pub const MAP_MARKER: &str = "@SDT/{";
/// Map-class instance marker.
pub const MC_INSTANCE_MARKER: &str = "@SDT/%";
/// Marshalling context marker.
pub const CONTEXT_MARKER: &str = "@SDT/*";

/// Field delimiter for length prefixes.
pub const DELIMITER: char = ':';

/// Map entry naming the map class of a map-class instance.
pub const MAP_CLASS_NAME_KEY: &str = "staf-map-class-name";
/// Context registry entry holding the map class definitions.
pub const MAP_CLASS_MAP_KEY: &str = "map-class-map";
/// Key property holding a key's display label.
pub const DISPLAY_NAME_KEY: &str = "display-name";

/// Returns true when `data` looks like marshalled data.
///
/// Only the prefix is checked; the data may still fail to unmarshall.
pub fn is_marshalled_data(data: &str) -> bool {
    data.starts_with(MARSHALLED_DATA_MARKER)
}
