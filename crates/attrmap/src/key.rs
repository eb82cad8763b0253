//! Keys and the attribute-key classifier.
//!
//! The key space is deliberately small: strings and 64-bit integers. Only a
//! subset of string keys is *attribute-safe*: case-sensitive identifier-like
//! names that do not start with the hidden-key marker and do not collide with
//! a proxy method. Everything else stays reachable through subscript access.

use std::{fmt, sync::LazyLock};

use ahash::AHashSet;
use regex::Regex;

/// Marker character that makes a string key hidden from attribute access.
pub const HIDDEN_MARKER: char = '_';

/// The identifier shape required for attribute-style access. The leading
/// character class excludes the hidden marker on purpose.
static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[A-Za-z][A-Za-z0-9_]*$").expect("identifier pattern is valid"));

/// A mapping key: an owned string or a 64-bit integer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Key {
    /// Text key. May or may not be attribute-safe.
    Str(String),
    /// Integer key. Never attribute-safe.
    Int(i64),
}

impl Key {
    /// Returns the text of a string key.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(name) => Some(name),
            Self::Int(_) => None,
        }
    }

    /// Returns whether this is a string key starting with [`HIDDEN_MARKER`].
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        matches!(self, Self::Str(name) if name.starts_with(HIDDEN_MARKER))
    }

    /// Writes the key the way it appears inside a mapping repr: string keys
    /// quoted, integer keys bare.
    pub(crate) fn repr_fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(name) => crate::value::str_repr_fmt(name, f),
            Self::Int(value) => write!(f, "{value}"),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(name) => f.write_str(name),
            Self::Int(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Self::Str(name.to_owned())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Self::Str(name)
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

/// Decides whether `key` may be used with attribute-style access.
///
/// True only if the key is a string, matches the identifier shape (which
/// rules out the hidden marker as a first character), and is not in
/// `reserved_names`. Total: integer keys and malformed text return false
/// rather than failing.
#[must_use]
pub fn is_attribute_key(key: &Key, reserved_names: &AHashSet<&'static str>) -> bool {
    match key {
        Key::Int(_) => false,
        Key::Str(name) => IDENTIFIER.is_match(name) && !reserved_names.contains(name.as_str()),
    }
}
