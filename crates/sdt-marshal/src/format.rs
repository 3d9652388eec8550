// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Human-readable rendering of values for diagnostics and logs.
//!
//! ```text
//! [
//!   {
//!     Key #1: Value 1 1
//!     Key #2: Value 2 1
//!   }
//! ]
//! ```
//!
//! Not a wire format; output is not meant to be parsed back.

use std::borrow::Cow;

use crate::context::MarshallingContext;
use crate::schema::MapClassDefinition;
use crate::value::{Map, MapClassInstance, Value};
use crate::wire::MAP_CLASS_NAME_KEY;

/// Formatter settings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FormatOptions {
    /// Spaces added per nesting level.
    pub indent_step: usize,
    /// Text rendered for null values.
    pub null_token: String,
    /// Line terminator.
    pub line_separator: String,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            indent_step: 2,
            null_token: "<None>".to_string(),
            line_separator: "\n".to_string(),
        }
    }
}

/// Renders `value` with default options, starting at nesting level `indent`.
///
/// Map-class instances whose class is registered in `context` are shown with
/// their display labels in schema order.
pub fn format(value: &Value, context: Option<&MarshallingContext>, indent: usize) -> String {
    format_with(value, context, indent, &FormatOptions::default())
}

/// Renders `value` with explicit `options`.
pub fn format_with(
    value: &Value,
    context: Option<&MarshallingContext>,
    indent: usize,
    options: &FormatOptions,
) -> String {
    let mut formatter = Formatter {
        options,
        out: String::new(),
    };
    formatter.write_value(value, context, indent);
    formatter.out
}

const NULL: &Value = &Value::Null;

type Entries<'a> = Vec<(Cow<'a, str>, Cow<'a, Value>)>;

struct Formatter<'o> {
    options: &'o FormatOptions,
    out: String,
}

impl Formatter<'_> {
    fn write_value<'a>(
        &mut self,
        value: &'a Value,
        context: Option<&'a MarshallingContext>,
        level: usize,
    ) {
        match value {
            Value::Null => self.out.push_str(&self.options.null_token),
            Value::Scalar(text) => self.out.push_str(text),
            Value::List(items) => self.write_list(items, context, level),
            Value::Map(map) => {
                let entries = match resolve(context, value.map_class_name()) {
                    Some(def) => labelled_entries(def, |_, key| map.get(key)),
                    None => generic_entries(map),
                };
                self.write_entries(&entries, context, level);
            }
            Value::MapClassInstance(instance) => {
                let entries = match resolve(context, Some(instance.name())) {
                    Some(def) => labelled_entries(def, |idx, _| instance.fields().get(idx)),
                    None => ordinal_entries(instance),
                };
                self.write_entries(&entries, context, level);
            }
            Value::Context(inner) => {
                let root = inner.root_object().unwrap_or(NULL);
                self.write_value(root, Some(inner.as_ref()), level);
            }
        }
    }

    fn write_list<'a>(
        &mut self,
        items: &'a [Value],
        context: Option<&'a MarshallingContext>,
        level: usize,
    ) {
        self.out.push('[');
        if !items.is_empty() {
            self.newline();
            for item in items {
                self.indent(level + 1);
                self.write_value(item, context, level + 1);
                self.newline();
            }
            self.indent(level);
        }
        self.out.push(']');
    }

    fn write_entries<'a>(
        &mut self,
        entries: &Entries<'a>,
        context: Option<&'a MarshallingContext>,
        level: usize,
    ) {
        self.out.push('{');
        if !entries.is_empty() {
            self.newline();
            let width = entries
                .iter()
                .map(|(label, _)| label.chars().count())
                .max()
                .unwrap_or(0);
            for (label, value) in entries {
                self.indent(level + 1);
                self.out.push_str(label);
                self.pad(width - label.chars().count());
                self.out.push_str(": ");
                self.write_value(value, context, level + 1);
                self.newline();
            }
            self.indent(level);
        }
        self.out.push('}');
    }

    fn indent(&mut self, level: usize) {
        self.pad(level * self.options.indent_step);
    }

    fn pad(&mut self, n: usize) {
        self.out.extend(std::iter::repeat_n(' ', n));
    }

    fn newline(&mut self) {
        self.out.push_str(&self.options.line_separator);
    }
}

fn resolve<'a>(
    context: Option<&'a MarshallingContext>,
    name: Option<&str>,
) -> Option<&'a MapClassDefinition> {
    context?.get_map_class_definition(name?)
}

/// Schema order with display labels; missing fields render as null.
fn labelled_entries<'a>(
    def: &'a MapClassDefinition,
    field: impl Fn(usize, &str) -> Option<&'a Value>,
) -> Entries<'a> {
    def.keys()
        .iter()
        .enumerate()
        .map(|(idx, key)| {
            let value = field(idx, key.key()).unwrap_or(NULL);
            (Cow::Borrowed(key.label()), Cow::Borrowed(value))
        })
        .collect()
}

fn generic_entries(map: &Map) -> Entries<'_> {
    map.iter()
        .map(|(key, value)| (Cow::Borrowed(key.as_str()), Cow::Borrowed(value)))
        .collect()
}

/// Unresolved positional instance: class name, then fields by position.
fn ordinal_entries(instance: &MapClassInstance) -> Entries<'_> {
    let mut entries = Vec::with_capacity(instance.fields().len() + 1);
    entries.push((
        Cow::Borrowed(MAP_CLASS_NAME_KEY),
        Cow::Owned(Value::from(instance.name())),
    ));
    entries.extend(
        instance
            .fields()
            .iter()
            .enumerate()
            .map(|(idx, value)| (Cow::Owned(idx.to_string()), Cow::Borrowed(value))),
    );
    entries
}
