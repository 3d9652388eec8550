// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Unmarshaller: `@SDT/` wire strings back to marshalling contexts.
//!
//! [`unmarshall`] never fails. Every decode step returns a
//! `Result<_, DecodeError>`, and the entry point turns any error, at any
//! depth, into a context whose root is the untouched input string. Decoding
//! is all-or-nothing: a single bad frame anywhere degrades the whole input.
//!
//! Colons are only scanned for to locate the decimal length fields. Payload
//! boundaries always come from the declared byte lengths, so payload text may
//! contain colons and marker-like substrings freely.

use thiserror::Error;
use tracing::{debug, trace};

use crate::context::{MapClassMap, MarshallingContext};
use crate::schema::MapClassDefinition;
use crate::value::{Map, MapClassInstance, Value};
use crate::wire::{
    is_marshalled_data, CONTEXT_MARKER, DELIMITER, LIST_MARKER, MAP_CLASS_MAP_KEY,
    MAP_CLASS_NAME_KEY, MAP_MARKER, MC_INSTANCE_MARKER, NONE_MARKER, SCALAR_STRING_MARKER,
};

/// Maximum frame nesting accepted before the input is treated as invalid.
///
/// Indirect objects (scalars holding marshalled text) count as a level.
pub const MAX_DEPTH: usize = 256;

/// Structural failure while decoding marshalled data.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A `:` delimiting a length field was not found.
    #[error("missing delimiter after offset {offset}")]
    MissingDelimiter {
        /// Offset where the scan started.
        offset: usize,
    },
    /// A length or count field was not a decimal number.
    #[error("invalid length field {0:?}")]
    InvalidLength(String),
    /// A frame header carried text where none is allowed.
    #[error("unexpected header field {0:?}")]
    UnexpectedHeader(String),
    /// A declared payload length disagrees with the bytes present.
    #[error("declared length {declared} but {actual} bytes remain")]
    LengthMismatch {
        /// Declared byte length.
        declared: usize,
        /// Bytes actually available.
        actual: usize,
    },
    /// A frame extends past the end of its enclosing payload.
    #[error("frame at offset {offset} runs past end of input")]
    Truncated {
        /// Offset where the frame starts.
        offset: usize,
    },
    /// A declared length splits a UTF-8 code point.
    #[error("length ends inside a UTF-8 sequence at offset {offset}")]
    InvalidUtf8Boundary {
        /// Offset of the offending boundary.
        offset: usize,
    },
    /// Bytes left over after the declared number of items.
    #[error("{remaining} trailing bytes after last item")]
    TrailingData {
        /// Unconsumed byte count.
        remaining: usize,
    },
    /// A context's registry frame did not decode to a map.
    #[error("context registry is not a map")]
    NotAMap,
    /// A registry entry is not a valid map class definition.
    #[error("invalid map class definition {0:?}")]
    InvalidMapClassDefinition(String),
    /// Nesting exceeded [`MAX_DEPTH`].
    #[error("nesting deeper than {MAX_DEPTH} levels")]
    TooDeep,
}

type Result<T> = std::result::Result<T, DecodeError>;

/// Unmarshalling options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct UnmarshallFlags {
    /// Leave scalars holding marshalled text as literal strings instead of
    /// unmarshalling them.
    pub ignore_indirect_objects: bool,
}

impl UnmarshallFlags {
    /// Default behavior: indirect objects are expanded.
    pub const DEFAULTS: Self = Self {
        ignore_indirect_objects: false,
    };

    /// Indirect objects are left as literal strings.
    pub const IGNORE_INDIRECT_OBJECTS: Self = Self {
        ignore_indirect_objects: true,
    };
}

/// Unmarshals `data`, resolving map classes against `context`.
///
/// Never fails: input that is not valid marshalled data comes back as a
/// context whose root is `data` itself.
pub fn unmarshall(
    data: &str,
    context: Option<&MarshallingContext>,
    flags: UnmarshallFlags,
) -> MarshallingContext {
    let empty = MarshallingContext::new();
    unmarshall_at(data, context.unwrap_or(&empty), flags, 0)
}

/// Like [`unmarshall`], but reports the structural failure instead of
/// degrading.
pub fn try_unmarshall(
    data: &str,
    context: Option<&MarshallingContext>,
    flags: UnmarshallFlags,
) -> Result<MarshallingContext> {
    let empty = MarshallingContext::new();
    decode_context(data, context.unwrap_or(&empty), flags, 0)
}

/// Unmarshals `data` and returns its primary object.
pub fn unmarshall_value(
    data: &str,
    context: Option<&MarshallingContext>,
    flags: UnmarshallFlags,
) -> Value {
    unmarshall(data, context, flags).into_primary_object()
}

fn unmarshall_at(
    data: &str,
    context: &MarshallingContext,
    flags: UnmarshallFlags,
    depth: usize,
) -> MarshallingContext {
    decode_context(data, context, flags, depth).unwrap_or_else(|err| {
        debug!(%err, len = data.len(), "not valid marshalled data; keeping input as scalar");
        MarshallingContext::with_root(data)
    })
}

fn decode_context(
    data: &str,
    context: &MarshallingContext,
    flags: UnmarshallFlags,
    depth: usize,
) -> Result<MarshallingContext> {
    if depth > MAX_DEPTH {
        return Err(DecodeError::TooDeep);
    }

    // Null and scalar frames match their exact markers; other `@SDT/$` tags stay opaque.
    if data == NONE_MARKER {
        Ok(MarshallingContext::new())
    } else if data.starts_with(SCALAR_STRING_MARKER) {
        let text = open_unit_frame(data, SCALAR_STRING_MARKER)?;
        if is_marshalled_data(text) && !flags.ignore_indirect_objects {
            trace!(len = text.len(), "expanding indirect object");
            Ok(unmarshall_at(text, context, flags, depth + 1))
        } else {
            Ok(MarshallingContext::with_root(text))
        }
    } else if data.starts_with(LIST_MARKER) {
        decode_list(data, context, flags, depth).map(MarshallingContext::with_root)
    } else if data.starts_with(MAP_MARKER) {
        decode_map(data, context, flags, depth).map(MarshallingContext::with_root)
    } else if data.starts_with(MC_INSTANCE_MARKER) {
        decode_map_class(data, context, flags, depth).map(MarshallingContext::with_root)
    } else if data.starts_with(CONTEXT_MARKER) {
        decode_embedded_context(data, flags, depth)
    } else {
        // Unknown marker or plain text: the string stands for itself.
        Ok(MarshallingContext::with_root(data))
    }
}

fn decode_item(
    frame: &str,
    context: &MarshallingContext,
    flags: UnmarshallFlags,
    depth: usize,
) -> Result<Value> {
    decode_context(frame, context, flags, depth + 1).map(MarshallingContext::into_primary_object)
}

fn decode_list(
    data: &str,
    context: &MarshallingContext,
    flags: UnmarshallFlags,
    depth: usize,
) -> Result<Value> {
    let (head, payload) = open_frame(data, LIST_MARKER)?;
    let count = parse_length(head)?;
    let mut reader = Reader::new(payload);
    let mut items = Vec::with_capacity(count.min(payload.len() / NONE_MARKER.len()));
    for _ in 0..count {
        let frame = reader.next_frame()?;
        items.push(decode_item(frame, context, flags, depth)?);
    }
    reader.finish()?;
    Ok(Value::List(items))
}

fn decode_map(
    data: &str,
    context: &MarshallingContext,
    flags: UnmarshallFlags,
    depth: usize,
) -> Result<Value> {
    let payload = open_unit_frame(data, MAP_MARKER)?;
    let mut reader = Reader::new(payload);
    let mut map = Map::new();
    while !reader.is_empty() {
        let key = reader.read_prefixed()?;
        let frame = reader.next_frame()?;
        map.insert(key.to_string(), decode_item(frame, context, flags, depth)?);
    }
    Ok(Value::Map(map))
}

fn decode_map_class(
    data: &str,
    context: &MarshallingContext,
    flags: UnmarshallFlags,
    depth: usize,
) -> Result<Value> {
    let payload = open_unit_frame(data, MC_INSTANCE_MARKER)?;
    let mut reader = Reader::new(payload);
    let name = reader.read_prefixed()?;

    let Some(def) = context.get_map_class_definition(name) else {
        trace!(name, "map class not registered; keeping fields by position");
        let mut fields = Vec::new();
        while !reader.is_empty() {
            fields.push(decode_item(reader.next_frame()?, context, flags, depth)?);
        }
        return Ok(Value::MapClassInstance(MapClassInstance::new(name, fields)));
    };

    let mut map = Map::with_capacity(def.keys().len() + 1);
    map.insert(MAP_CLASS_NAME_KEY.to_string(), Value::from(name));
    let mut keys = def.keys().iter();
    while !reader.is_empty() {
        let frame = reader.next_frame()?;
        let value = decode_item(frame, context, flags, depth)?;
        // Fields beyond the schema's keys are dropped.
        if let Some(key) = keys.next() {
            map.insert(key.key().to_string(), value);
        }
    }
    Ok(Value::Map(map))
}

fn decode_embedded_context(
    data: &str,
    flags: UnmarshallFlags,
    depth: usize,
) -> Result<MarshallingContext> {
    let payload = open_unit_frame(data, CONTEXT_MARKER)?;
    let mut reader = Reader::new(payload);
    let registry_frame = reader.next_frame()?;
    let root_frame = reader.next_frame()?;
    reader.finish()?;

    if !registry_frame.starts_with(MAP_MARKER) {
        return Err(DecodeError::NotAMap);
    }
    // Schema metadata is plain text; labels that look like wire data stay literal.
    let registry = decode_map(
        registry_frame,
        &MarshallingContext::new(),
        UnmarshallFlags::IGNORE_INDIRECT_OBJECTS,
        depth + 1,
    )?;
    let map_classes = match registry.get(MAP_CLASS_MAP_KEY) {
        None => MapClassMap::new(),
        Some(Value::Map(defs)) => defs
            .iter()
            .map(|(name, def)| {
                MapClassDefinition::from_value(def)
                    .map(|def| (name.clone(), def))
                    .ok_or_else(|| DecodeError::InvalidMapClassDefinition(name.clone()))
            })
            .collect::<Result<_>>()?,
        Some(_) => return Err(DecodeError::NotAMap),
    };

    // The root resolves against the embedded registry, not the caller's.
    let mut decoded = MarshallingContext::with_map_classes(None, map_classes);
    let root = decode_item(root_frame, &decoded, flags, depth)?;
    if !root.is_null() {
        decoded.set_root_object(root);
    }
    Ok(decoded)
}

/// Splits `<marker><head>:<len>:<payload>` and checks the payload length.
fn open_frame<'a>(data: &'a str, marker: &str) -> Result<(&'a str, &'a str)> {
    let mut reader = Reader::new(data);
    reader.skip(marker.len());
    let head = reader.read_field()?;
    let len = reader.read_length()?;
    let payload = reader.rest();
    if payload.len() != len {
        return Err(DecodeError::LengthMismatch {
            declared: len,
            actual: payload.len(),
        });
    }
    Ok((head, payload))
}

/// [`open_frame`] for markers that carry no count.
fn open_unit_frame<'a>(data: &'a str, marker: &str) -> Result<&'a str> {
    match open_frame(data, marker)? {
        ("", payload) => Ok(payload),
        (head, _) => Err(DecodeError::UnexpectedHeader(head.to_string())),
    }
}

fn parse_length(field: &str) -> Result<usize> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DecodeError::InvalidLength(field.to_string()));
    }
    field
        .parse()
        .map_err(|_| DecodeError::InvalidLength(field.to_string()))
}

/// Cursor over one frame's payload.
#[derive(Debug)]
struct Reader<'a> {
    data: &'a str,
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a str) -> Self {
        Self { data, offset: 0 }
    }

    fn is_empty(&self) -> bool {
        self.offset >= self.data.len()
    }

    fn rest(&self) -> &'a str {
        self.data.get(self.offset..).unwrap_or_default()
    }

    fn skip(&mut self, len: usize) {
        self.offset = self.offset.saturating_add(len).min(self.data.len());
    }

    fn find_delimiter(&self, from: usize) -> Result<usize> {
        self.data
            .get(from..)
            .and_then(|s| s.find(DELIMITER))
            .map(|idx| from + idx)
            .ok_or(DecodeError::MissingDelimiter { offset: from })
    }

    fn slice(&self, start: usize, end: usize) -> Result<&'a str> {
        if end > self.data.len() {
            return Err(DecodeError::Truncated { offset: start });
        }
        self.data
            .get(start..end)
            .ok_or(DecodeError::InvalidUtf8Boundary { offset: end })
    }

    /// Text up to the next delimiter; the delimiter is consumed.
    fn read_field(&mut self) -> Result<&'a str> {
        let end = self.find_delimiter(self.offset)?;
        let field = self.slice(self.offset, end)?;
        self.offset = end + 1;
        Ok(field)
    }

    fn read_length(&mut self) -> Result<usize> {
        parse_length(self.read_field()?)
    }

    fn take(&mut self, len: usize) -> Result<&'a str> {
        let end = self
            .offset
            .checked_add(len)
            .ok_or(DecodeError::Truncated {
                offset: self.offset,
            })?;
        let out = self.slice(self.offset, end)?;
        self.offset = end;
        Ok(out)
    }

    /// `:<len>:<text>`
    fn read_prefixed(&mut self) -> Result<&'a str> {
        let head = self.read_field()?;
        if !head.is_empty() {
            return Err(DecodeError::UnexpectedHeader(head.to_string()));
        }
        let len = self.read_length()?;
        self.take(len)
    }

    /// One complete nested value: everything through its second delimiter
    /// plus the payload length declared between the first and second.
    fn next_frame(&mut self) -> Result<&'a str> {
        let start = self.offset;
        let first = self.find_delimiter(start)?;
        let second = self.find_delimiter(first + 1)?;
        let len = parse_length(self.slice(first + 1, second)?)?;
        let end = (second + 1)
            .checked_add(len)
            .ok_or(DecodeError::Truncated { offset: start })?;
        let frame = self.slice(start, end)?;
        self.offset = end;
        Ok(frame)
    }

    fn finish(&self) -> Result<()> {
        match self.data.len().saturating_sub(self.offset) {
            0 => Ok(()),
            remaining => Err(DecodeError::TrailingData { remaining }),
        }
    }
}
