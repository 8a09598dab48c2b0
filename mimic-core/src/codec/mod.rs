//! Type-directed text codec for recorded values
//!
//! Encodes a [`Value`] into the single-line text used in transcripts and
//! decodes it back given the statically known target [`ValueType`].
//!
//! | Value | Encoded form |
//! |---|---|
//! | null | `null` |
//! | bool | `True` / `False` |
//! | int / float | `42`, `-3.5` |
//! | string | `"say \"hi\""` |
//! | date/time | `2024-03-01 10:15:00` |
//! | list | `[1, 2, 3]` |
//! | map | `{"a": 1, "b": 2}` |
//! | registered object | `<id:Calculator_1>` |
//! | unregistered object | `<unknown:Calculator>` |
//!
//! Decoding resolves `<id:...>` references eagerly against the registry, so a
//! missing registry or id fails immediately rather than at first use.
//!
//! # Example
//!
//! ```rust,ignore
//! use mimic_core::codec;
//! use mimic_core::value::{Value, ValueType};
//!
//! let text = codec::encode(&Value::List(vec![Value::Int(1), Value::Int(2)]), None);
//! assert_eq!(text, "[1, 2]");
//!
//! let back = codec::decode(&text, &ValueType::list(ValueType::Int), None)?;
//! ```

mod scan;

use chrono::NaiveDateTime;
use regex::Regex;
use std::sync::LazyLock;

use crate::error::{MimicError, ObjectNotFound, Result};
use crate::registry::ObjectRegistry;
use crate::value::{ObjectRef, ReplayValue, Value, ValueType};

pub(crate) use scan::{split_entry, split_items};

/// Fixed date/time layout (`yyyy-MM-dd HH:mm:ss`)
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Literal written for null
pub const NULL_LITERAL: &str = "null";

/// Encode a value; object references are looked up in `registry`
pub fn encode(value: &Value, registry: Option<&ObjectRegistry>) -> String {
    let mut out = String::new();
    write_value(&mut out, value, registry);
    out
}

/// Encode any [`ReplayValue`]
pub fn encode_value<T: ReplayValue>(value: T, registry: Option<&ObjectRegistry>) -> String {
    encode(&value.into_value(), registry)
}

/// Encode an object reference as `<id:X>` or `<unknown:Type>`
pub fn encode_reference(object: &ObjectRef, registry: Option<&ObjectRegistry>) -> String {
    match registry.and_then(|r| r.lookup_id(object)) {
        Some(id) => format!("<id:{}>", id),
        None => format!("<unknown:{}>", object.type_name()),
    }
}

/// Double-quote a string, escaping quotes, backslashes and line breaks
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

fn write_value(out: &mut String, value: &Value, registry: Option<&ObjectRegistry>) {
    match value {
        Value::Null => out.push_str(NULL_LITERAL),
        Value::Bool(true) => out.push_str("True"),
        Value::Bool(false) => out.push_str("False"),
        Value::Int(n) => out.push_str(&n.to_string()),
        Value::Float(f) => out.push_str(&f.to_string()),
        Value::Str(s) => out.push_str(&quote(s)),
        Value::DateTime(dt) => out.push_str(&dt.format(DATE_TIME_FORMAT).to_string()),
        Value::List(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, item, registry);
            }
            out.push(']');
        }
        Value::Map(entries) => {
            out.push('{');
            for (i, (key, val)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, key, registry);
                out.push_str(": ");
                write_value(out, val, registry);
            }
            out.push('}');
        }
        Value::Object(obj) => out.push_str(&encode_reference(obj, registry)),
    }
}

/// A reference literal found in encoded text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference<'a> {
    /// `<id:X>`
    Id(&'a str),
    /// `<unknown>` or `<unknown:Type>`
    Unknown(Option<&'a str>),
}

/// Recognise a reference literal
pub fn parse_reference(text: &str) -> Option<Reference<'_>> {
    static ID_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^<id:\s*([^<>\s]+)\s*>$").unwrap());
    static UNKNOWN_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^<unknown(?::\s*(.+?)\s*)?>$").unwrap());

    if let Some(caps) = ID_RE.captures(text) {
        return caps.get(1).map(|m| Reference::Id(m.as_str()));
    }
    UNKNOWN_RE
        .captures(text)
        .map(|caps| Reference::Unknown(caps.get(1).map(|m| m.as_str())))
}

/// Decode `text` into a value of type `target`
pub fn decode(text: &str, target: &ValueType, registry: Option<&ObjectRegistry>) -> Result<Value> {
    let text = text.trim();

    if let Some(reference) = parse_reference(text) {
        return decode_reference(text, reference, target, registry);
    }

    if text.eq_ignore_ascii_case(NULL_LITERAL) {
        if target.is_nullable() {
            return Ok(Value::Null);
        }
        return Err(MimicError::type_conversion(text, target, "null is not allowed"));
    }

    match target {
        ValueType::Optional(inner) => decode(text, inner, registry),
        ValueType::Bool => {
            if text.eq_ignore_ascii_case("true") {
                Ok(Value::Bool(true))
            } else if text.eq_ignore_ascii_case("false") {
                Ok(Value::Bool(false))
            } else {
                Err(MimicError::type_conversion(text, target, "expected True or False"))
            }
        }
        ValueType::Int => text
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|e| MimicError::type_conversion(text, target, e.to_string())),
        ValueType::Float => text
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|e| MimicError::type_conversion(text, target, e.to_string())),
        ValueType::Str => unquote(text).map(Value::Str),
        ValueType::DateTime => NaiveDateTime::parse_from_str(text, DATE_TIME_FORMAT)
            .map(Value::DateTime)
            .map_err(|e| {
                MimicError::type_conversion(
                    text,
                    target,
                    format!("{} (expected yyyy-MM-dd HH:mm:ss)", e),
                )
            }),
        ValueType::List(element) => {
            let body = strip_delimiters(text, '[', ']', target)?;
            split_items(body)?
                .into_iter()
                .map(|item| decode(item, element, registry))
                .collect::<Result<Vec<_>>>()
                .map(Value::List)
        }
        ValueType::Map(key_type, value_type) => {
            let body = strip_delimiters(text, '{', '}', target)?;
            split_items(body)?
                .into_iter()
                .map(|entry| {
                    let (key, value) = split_entry(entry)?;
                    Ok((
                        decode(key, key_type, registry)?,
                        decode(value, value_type, registry)?,
                    ))
                })
                .collect::<Result<Vec<_>>>()
                .map(Value::Map)
        }
        ValueType::Object(_) | ValueType::AnyObject => Err(MimicError::type_conversion(
            text,
            target,
            "expected an object reference like <id:Name_1>",
        )),
    }
}

/// Decode straight into a Rust type
pub fn decode_as<T: ReplayValue>(text: &str, registry: Option<&ObjectRegistry>) -> Result<T> {
    T::from_value(decode(text, &T::value_type(), registry)?)
}

fn decode_reference(
    text: &str,
    reference: Reference<'_>,
    target: &ValueType,
    registry: Option<&ObjectRegistry>,
) -> Result<Value> {
    match reference {
        Reference::Unknown(type_name) => Err(MimicError::UnknownObject {
            type_name: type_name.map(str::to_string),
        }),
        Reference::Id(id) => {
            let registry =
                registry.ok_or_else(|| ObjectNotFound::NoRegistry(id.to_string()))?;
            let object = registry
                .resolve(id)
                .ok_or_else(|| ObjectNotFound::NotFound(id.to_string()))?;
            assignable_view(text, id, object, registry, target).map(Value::Object)
        }
    }
}

/// The view of the resolved object that fits `target`
fn assignable_view(
    text: &str,
    id: &str,
    object: ObjectRef,
    registry: &ObjectRegistry,
    target: &ValueType,
) -> Result<ObjectRef> {
    let view = match target {
        ValueType::AnyObject => return Ok(object),
        ValueType::Optional(inner) => {
            return assignable_view(text, id, object, registry, inner);
        }
        ValueType::Object(capability) => registry.resolve_view(id, capability),
        _ => None,
    };
    match view {
        Some(view) => Ok(view),
        None => Err(MimicError::type_conversion(
            text,
            target,
            format!("object of type {} is not assignable to {}", object.type_name(), target),
        )),
    }
}

fn strip_delimiters<'a>(
    text: &'a str,
    open: char,
    close: char,
    target: &ValueType,
) -> Result<&'a str> {
    let Some(rest) = text.strip_prefix(open) else {
        return Err(MimicError::type_conversion(
            text,
            target,
            format!("expected text starting with '{}'", open),
        ));
    };
    rest.strip_suffix(close)
        .ok_or_else(|| MimicError::malformed(text, format!("missing closing '{}'", close)))
}

/// Remove surrounding quotes and resolve escapes
pub fn unquote(text: &str) -> Result<String> {
    let Some(rest) = text.strip_prefix('"') else {
        return Err(MimicError::type_conversion(
            text,
            ValueType::Str,
            "expected a double-quoted string",
        ));
    };

    let mut out = String::with_capacity(rest.len());
    let mut chars = rest.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => {
                if i + 1 != rest.len() {
                    return Err(MimicError::malformed(
                        text,
                        "unescaped quote inside string",
                    ));
                }
                return Ok(out);
            }
            '\\' => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 'r')) => out.push('\r'),
                Some((_, 't')) => out.push('\t'),
                Some((_, '"')) => out.push('"'),
                Some((_, '\\')) => out.push('\\'),
                // Hand-edited paths like "C:\data" keep their backslash
                Some((_, other)) => {
                    out.push('\\');
                    out.push(other);
                }
                None => break,
            },
            other => out.push(other),
        }
    }

    Err(MimicError::malformed(text, "unterminated string"))
}
