//! Field tags and the directive mini-language.
//!
//! A field carries one raw tag string made of `key:"value"` pairs, for example
//! `json:"name,omitempty" jsonschema:"minLength=1,pattern=^[a-z]+$"`. The
//! `jsonschema` value is a comma-separated list of directives; a comma
//! preceded by a backslash is part of the directive text.

use std::borrow::Cow;
use std::fmt;

/// Tag key holding constraint directives.
pub const JSONSCHEMA_KEY: &str = "jsonschema";
/// Tag key holding passthrough `key=value` pairs.
pub const EXTRAS_KEY: &str = "jsonschema_extras";
/// Tag key holding a plain description.
pub const DESCRIPTION_KEY: &str = "jsonschema_description";

/// Raw tag string attached to a field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StructTag(Cow<'static, str>);

impl StructTag {
    pub const fn new(raw: &'static str) -> Self {
        Self(Cow::Borrowed(raw))
    }

    pub fn owned(raw: impl Into<String>) -> Self {
        Self(Cow::Owned(raw.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for `key`, or an empty string when the key is absent.
    pub fn get(&self, key: &str) -> String {
        self.lookup(key).unwrap_or_default()
    }

    /// Value for `key` with `\"` and `\\` unescaped. Parsing stops at the
    /// first malformed pair.
    pub fn lookup(&self, key: &str) -> Option<String> {
        let mut rest: &str = &self.0;
        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                return None;
            }

            let end = rest.find(|c: char| c == ':' || c == ' ' || c == '"' || c.is_control())?;
            if end == 0 || !rest[end..].starts_with(":\"") {
                return None;
            }
            let name = &rest[..end];
            rest = &rest[end + 1..];

            let bytes = rest.as_bytes();
            let mut index = 1;
            while index < bytes.len() && bytes[index] != b'"' {
                if bytes[index] == b'\\' {
                    index += 1;
                }
                index += 1;
            }
            if index >= bytes.len() {
                return None;
            }
            let quoted = &rest[1..index];
            rest = &rest[index + 1..];

            if name == key {
                return Some(unquote(quoted));
            }
        }
    }
}

impl fmt::Display for StructTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for StructTag {
    fn from(raw: &'static str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for StructTag {
    fn from(raw: String) -> Self {
        Self::owned(raw)
    }
}

fn unquote(quoted: &str) -> String {
    let mut out = String::with_capacity(quoted.len());
    let mut chars = quoted.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Splits on commas that are not immediately preceded by a backslash. The
/// escaping backslash is removed; empty parts are kept.
pub fn split_on_unescaped_commas(input: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    for ch in input.chars() {
        if ch != ',' {
            current.push(ch);
        } else if current.ends_with('\\') {
            current.pop();
            current.push(',');
        } else {
            parts.push(std::mem::take(&mut current));
        }
    }
    parts.push(current);
    parts
}

/// One `key` or `key=value` entry of a directive list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub key: String,
    /// Text after the first `=`, or empty for a bare flag.
    pub value: String,
    /// True when the entry had no `=`.
    pub flag: bool,
}

impl Directive {
    pub fn parse(part: &str) -> Self {
        match part.split_once('=') {
            Some((key, value)) => Self {
                key: key.to_string(),
                value: value.to_string(),
                flag: false,
            },
            None => Self {
                key: part.to_string(),
                value: String::new(),
                flag: true,
            },
        }
    }

    pub fn is_flag(&self, key: &str) -> bool {
        self.flag && self.key == key
    }
}

/// Parses a directive list in order.
pub fn parse_directives(tag: &str) -> Vec<Directive> {
    split_on_unescaped_commas(tag)
        .iter()
        .map(|part| Directive::parse(part))
        .collect()
}
