//! The dynamic value space backing stores hold.
//!
//! `Value` owns all of its data except nested mappings, which sit behind a
//! [`SharedMap`] handle so that wrapping a nested mapping on read never copies
//! it: every proxy produced for the same nested mapping sees, and mutates, the
//! same store. Text and byte strings are scalars here, never sequences.
//!
//! Values are what the stores serialize; no proxy wrapper types ever appear
//! in them.

use std::{
    cell::{Ref, RefCell, RefMut},
    fmt::{self, Write},
    rc::Rc,
};

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::store::Store;

/// Shared handle to a nested backing store.
///
/// This is the single-threaded stand-in for reference semantics: cloning the
/// handle shares the store, and mutation through any clone is visible through
/// all of them. Equality is content equality, with a pointer-identity fast
/// path.
pub struct SharedMap<S>(Rc<RefCell<S>>);

impl<S> SharedMap<S> {
    /// Wraps a store in a fresh handle.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self(Rc::new(RefCell::new(store)))
    }

    /// Immutably borrows the store.
    ///
    /// # Panics
    /// Panics if the store is currently mutably borrowed, as `RefCell` does.
    #[must_use]
    pub fn borrow(&self) -> Ref<'_, S> {
        self.0.borrow()
    }

    /// Mutably borrows the store.
    ///
    /// # Panics
    /// Panics if the store is currently borrowed, as `RefCell` does.
    #[must_use]
    pub fn borrow_mut(&self) -> RefMut<'_, S> {
        self.0.borrow_mut()
    }

    /// Stable address of the shared allocation, used as a cycle-guard token
    /// in reprs.
    pub(crate) fn address(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}

impl<S: Clone> SharedMap<S> {
    /// Takes the store out of the handle, cloning only if it is still shared.
    #[must_use]
    pub fn into_inner(self) -> S {
        Rc::try_unwrap(self.0).map_or_else(|shared| shared.borrow().clone(), RefCell::into_inner)
    }
}

impl<S> Clone for SharedMap<S> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<S: fmt::Debug> fmt::Debug for SharedMap<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedMap").field(&self.0).finish()
    }
}

impl<S: PartialEq> PartialEq for SharedMap<S> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0) || *self.0.borrow() == *other.0.borrow()
    }
}

impl<S: Serialize> Serialize for SharedMap<S> {
    fn serialize<Ser: serde::Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        self.0.borrow().serialize(serializer)
    }
}

impl<'de, S: Deserialize<'de>> Deserialize<'de> for SharedMap<S> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        S::deserialize(deserializer).map(Self::new)
    }
}

/// A raw stored value: scalar, ordered sequence, or nested mapping.
///
/// The sequence kinds mirror the two ordered sequence shapes the wrapper can
/// rebuild between; they compare unequal to each other even with equal
/// elements. `Map` holds the concrete store kind of the proxy that owns the
/// value, so the wrapper can always produce a proxy of the same kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value<S> {
    /// The null scalar.
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Text. A scalar for wrapping purposes, never a sequence of characters.
    Str(String),
    /// A byte string. Also a scalar for wrapping purposes.
    Bytes(Vec<u8>),
    /// A list-kind ordered sequence.
    List(Vec<Value<S>>),
    /// A tuple-kind ordered sequence.
    Tuple(Vec<Value<S>>),
    /// A nested mapping, shared with every proxy wrapped around it.
    Map(SharedMap<S>),
}

impl<S> Value<S> {
    /// Builds a list-kind sequence from anything convertible to values.
    pub fn list<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Self>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Builds a tuple-kind sequence from anything convertible to values.
    pub fn tuple<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Self>,
    {
        Self::Tuple(items.into_iter().map(Into::into).collect())
    }

    /// Builds a byte-string scalar.
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(bytes.into())
    }

    /// Returns the text of a `Str` value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the payload of an `Int` value.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the payload of a `Float` value.
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the payload of a `Bool` value.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the shared handle of a `Map` value.
    #[must_use]
    pub fn as_map(&self) -> Option<&SharedMap<S>> {
        match self {
            Self::Map(shared) => Some(shared),
            _ => None,
        }
    }

    /// Returns the elements of either sequence kind.
    #[must_use]
    pub fn as_sequence(&self) -> Option<&[Value<S>]> {
        match self {
            Self::List(items) | Self::Tuple(items) => Some(items),
            _ => None,
        }
    }

    /// Returns whether this value is a nested mapping.
    #[must_use]
    pub fn is_map(&self) -> bool {
        matches!(self, Self::Map(_))
    }

    /// Human-readable name of the value's kind, for error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Bytes(_) => "bytes",
            Self::List(_) => "list",
            Self::Tuple(_) => "tuple",
            Self::Map(_) => "mapping",
        }
    }
}

impl<S: Store> Value<S> {
    /// Recursively copies this value, rebuilding every nested mapping and
    /// sequence so the result shares nothing with the original.
    #[must_use]
    pub fn deep_clone(&self) -> Self {
        match self {
            Self::Map(shared) => {
                let store = shared.borrow();
                let mut copy = S::with_capacity(store.len());
                for (key, value) in store.iter() {
                    copy.insert(key.clone(), value.deep_clone());
                }
                Self::Map(SharedMap::new(copy))
            }
            Self::List(items) => Self::List(items.iter().map(Self::deep_clone).collect()),
            Self::Tuple(items) => Self::Tuple(items.iter().map(Self::deep_clone).collect()),
            scalar => scalar.clone(),
        }
    }

    pub(crate) fn repr_fmt(&self, f: &mut fmt::Formatter<'_>, seen: &mut AHashSet<usize>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => float_repr_fmt(*value, f),
            Self::Str(text) => str_repr_fmt(text, f),
            Self::Bytes(bytes) => bytes_repr_fmt(bytes, f),
            Self::List(items) => seq_repr_fmt(items, ('[', ']'), false, f, seen),
            Self::Tuple(items) => seq_repr_fmt(items, ('(', ')'), true, f, seen),
            Self::Map(shared) => {
                let address = shared.address();
                if !seen.insert(address) {
                    return f.write_str("{...}");
                }
                let result = store_repr_fmt(&*shared.borrow(), f, seen);
                seen.remove(&address);
                result
            }
        }
    }
}

impl<S: Store> fmt::Display for Value<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.repr_fmt(f, &mut AHashSet::new())
    }
}

fn float_repr_fmt(value: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if value.is_finite() && value.fract() == 0.0 {
        write!(f, "{value:.1}")
    } else {
        write!(f, "{value}")
    }
}

pub(crate) fn str_repr_fmt(text: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_char('\'')?;
    for ch in text.chars() {
        match ch {
            '\'' => f.write_str("\\'")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            other => f.write_char(other)?,
        }
    }
    f.write_char('\'')
}

fn bytes_repr_fmt(bytes: &[u8], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("b'")?;
    for byte in bytes {
        match byte {
            b'\'' => f.write_str("\\'")?,
            b'\\' => f.write_str("\\\\")?,
            b'\n' => f.write_str("\\n")?,
            b'\t' => f.write_str("\\t")?,
            b'\r' => f.write_str("\\r")?,
            0x20..=0x7e => f.write_char(char::from(*byte))?,
            other => write!(f, "\\x{other:02x}")?,
        }
    }
    f.write_char('\'')
}

fn seq_repr_fmt<S: Store>(
    items: &[Value<S>],
    (open, close): (char, char),
    trailing_comma_when_single: bool,
    f: &mut fmt::Formatter<'_>,
    seen: &mut AHashSet<usize>,
) -> fmt::Result {
    f.write_char(open)?;
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            f.write_str(", ")?;
        }
        item.repr_fmt(f, seen)?;
    }
    if trailing_comma_when_single && items.len() == 1 {
        f.write_char(',')?;
    }
    f.write_char(close)
}

/// Writes a store's contents as `{'key': value, ...}`.
pub(crate) fn store_repr_fmt<S: Store>(
    store: &S,
    f: &mut fmt::Formatter<'_>,
    seen: &mut AHashSet<usize>,
) -> fmt::Result {
    f.write_char('{')?;
    for (index, (key, value)) in store.iter().enumerate() {
        if index > 0 {
            f.write_str(", ")?;
        }
        key.repr_fmt(f)?;
        f.write_str(": ")?;
        value.repr_fmt(f, seen)?;
    }
    f.write_char('}')
}

impl<S> From<bool> for Value<S> {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl<S> From<i64> for Value<S> {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl<S> From<i32> for Value<S> {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl<S> From<f64> for Value<S> {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl<S> From<&str> for Value<S> {
    fn from(text: &str) -> Self {
        Self::Str(text.to_owned())
    }
}

impl<S> From<String> for Value<S> {
    fn from(text: String) -> Self {
        Self::Str(text)
    }
}

impl<S> From<Vec<u8>> for Value<S> {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl<S> From<Vec<Value<S>>> for Value<S> {
    fn from(items: Vec<Value<S>>) -> Self {
        Self::List(items)
    }
}
