//! The recursive wrapper: the on-read transformation from raw stored values
//! to attribute-capable views.
//!
//! Wrapping runs on every read access and never on store. Nested mappings
//! become proxies of the same concrete kind, carrying the same configuration
//! and sharing the same underlying store; sequences are rebuilt according to
//! the sequence-wrapping policy; scalars pass through. The backing store
//! therefore never contains a proxy and serializes clean.

use std::fmt::{self, Write};

use serde::{Deserialize, Serialize};

use crate::{
    attr::Attr,
    error::{AttrError, AttrResult},
    key::Key,
    store::Store,
    value::Value,
};

/// The two ordered sequence shapes a policy can rebuild between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeqKind {
    List,
    Tuple,
}

impl SeqKind {
    pub(crate) fn build<S>(self, items: Vec<Value<S>>) -> Value<S> {
        match self {
            Self::List => Value::List(items),
            Self::Tuple => Value::Tuple(items),
        }
    }
}

/// Per-instance configuration: what to do with sequences found as values.
///
/// Immutable for the life of a proxy and propagated unchanged to every
/// nested proxy created during recursive access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequencePolicy {
    /// Rebuild any sequence as the given kind, wrapping each element.
    Rebuild(SeqKind),
    /// Keep the original sequence kind but still wrap mapping elements.
    Preserve,
    /// Pass sequences through untouched; their elements stay unwrapped too.
    Raw,
}

impl Default for SequencePolicy {
    fn default() -> Self {
        Self::Rebuild(SeqKind::Tuple)
    }
}

/// A value as seen through a proxy: the result of [`wrap`].
#[derive(Debug)]
pub enum Wrapped<S: Store> {
    /// A scalar, or a raw sequence passed through under [`SequencePolicy::Raw`].
    Value(Value<S>),
    /// A nested mapping, rewrapped as a proxy sharing the underlying store.
    Map(Attr<S>),
    /// A sequence rebuilt with each element individually wrapped.
    Seq(SeqKind, Vec<Wrapped<S>>),
}

/// Wraps a raw value for reading under the given policy.
#[must_use]
pub fn wrap<S: Store>(value: &Value<S>, policy: SequencePolicy) -> Wrapped<S> {
    match value {
        Value::Map(shared) => Wrapped::Map(Attr::from_shared(shared.clone(), policy)),
        Value::List(items) => wrap_sequence(SeqKind::List, items, policy, value),
        Value::Tuple(items) => wrap_sequence(SeqKind::Tuple, items, policy, value),
        scalar => Wrapped::Value(scalar.clone()),
    }
}

fn wrap_sequence<S: Store>(
    kind: SeqKind,
    items: &[Value<S>],
    policy: SequencePolicy,
    raw: &Value<S>,
) -> Wrapped<S> {
    let rebuilt_kind = match policy {
        SequencePolicy::Rebuild(target) => target,
        SequencePolicy::Preserve => kind,
        SequencePolicy::Raw => return Wrapped::Value(raw.clone()),
    };
    Wrapped::Seq(rebuilt_kind, items.iter().map(|item| wrap(item, policy)).collect())
}

impl<S: Store> Wrapped<S> {
    /// Returns the raw value of a scalar or raw-passthrough result.
    #[must_use]
    pub fn as_value(&self) -> Option<&Value<S>> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the nested proxy of a mapping result.
    #[must_use]
    pub fn as_map(&self) -> Option<&Attr<S>> {
        match self {
            Self::Map(proxy) => Some(proxy),
            _ => None,
        }
    }

    /// Consumes a mapping result into its nested proxy.
    #[must_use]
    pub fn into_map(self) -> Option<Attr<S>> {
        match self {
            Self::Map(proxy) => Some(proxy),
            _ => None,
        }
    }

    /// Returns the kind and elements of a rebuilt sequence result.
    #[must_use]
    pub fn as_seq(&self) -> Option<(SeqKind, &[Wrapped<S>])> {
        match self {
            Self::Seq(kind, items) => Some((*kind, items)),
            _ => None,
        }
    }

    /// Returns the element at `index` of a rebuilt sequence result.
    #[must_use]
    pub fn index(&self, index: usize) -> Option<&Wrapped<S>> {
        match self {
            Self::Seq(_, items) => items.get(index),
            _ => None,
        }
    }

    /// Shortcut for [`Value::as_str`] on scalar results.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_str)
    }

    /// Shortcut for [`Value::as_int`] on scalar results.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        self.as_value().and_then(Value::as_int)
    }

    /// Attribute access on a mapping result; fails with a type mismatch on
    /// anything else.
    pub fn attr(&self, name: &str) -> AttrResult<Wrapped<S>> {
        self.require_map("attribute access")?.attr(name)
    }

    /// Subscript access on a mapping result.
    pub fn get_item(&self, key: impl Into<Key>) -> AttrResult<Wrapped<S>> {
        self.require_map("subscript access")?.get_item(key)
    }

    /// Call-style access on a mapping result.
    pub fn lookup(&self, key: impl Into<Key>) -> AttrResult<Wrapped<S>> {
        self.require_map("lookup")?.lookup(key)
    }

    fn require_map(&self, operation: &str) -> AttrResult<&Attr<S>> {
        self.as_map().ok_or_else(|| {
            AttrError::type_mismatch(format!("{operation} requires a mapping, found {}", self.kind_name()))
        })
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Self::Value(value) => value.type_name(),
            Self::Map(_) => "mapping",
            Self::Seq(SeqKind::List, _) => "list",
            Self::Seq(SeqKind::Tuple, _) => "tuple",
        }
    }

    /// Flattens the wrapped view back into a raw value. Mapping results keep
    /// sharing their store; rebuilt sequences become sequences of the rebuilt
    /// kind.
    #[must_use]
    pub fn into_value(self) -> Value<S> {
        match self {
            Self::Value(value) => value,
            Self::Map(proxy) => Value::Map(proxy.store.clone()),
            Self::Seq(kind, items) => kind.build(items.into_iter().map(Self::into_value).collect()),
        }
    }
}

impl<S: Store> PartialEq for Wrapped<S> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Value(a), Self::Value(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Seq(kind_a, a), Self::Seq(kind_b, b)) => kind_a == kind_b && a == b,
            (Self::Value(raw), wrapped) | (wrapped, Self::Value(raw)) => wrapped == raw,
            _ => false,
        }
    }
}

/// Content equality against raw values: a mapping result equals the raw
/// mapping it wraps, a rebuilt sequence equals a raw sequence of the same
/// kind with equal elements.
impl<S: Store> PartialEq<Value<S>> for Wrapped<S> {
    fn eq(&self, other: &Value<S>) -> bool {
        match (self, other) {
            (Self::Value(value), raw) => value == raw,
            (Self::Map(proxy), Value::Map(shared)) => proxy.store == *shared,
            (Self::Seq(SeqKind::List, items), Value::List(raw))
            | (Self::Seq(SeqKind::Tuple, items), Value::Tuple(raw)) => {
                items.len() == raw.len() && items.iter().zip(raw).all(|(item, value)| item == value)
            }
            _ => false,
        }
    }
}

impl<S: Store> fmt::Display for Wrapped<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => fmt::Display::fmt(value, f),
            Self::Map(proxy) => fmt::Display::fmt(proxy, f),
            Self::Seq(kind, items) => {
                let (open, close) = match kind {
                    SeqKind::List => ('[', ']'),
                    SeqKind::Tuple => ('(', ')'),
                };
                f.write_char(open)?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    fmt::Display::fmt(item, f)?;
                }
                if *kind == SeqKind::Tuple && items.len() == 1 {
                    f.write_char(',')?;
                }
                f.write_char(close)
            }
        }
    }
}
