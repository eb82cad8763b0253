//! The attribute-proxy core.
//!
//! `Attr<S>` is the generic proxy every concrete kind shares. It holds exactly
//! one backing store handle plus the sequence-wrapping configuration, and
//! implements the whole facade in terms of the key classifier and the
//! recursive wrapper: classifier-gated attribute access, unrestricted
//! subscript access, call-style lookup, right-biased deep merge, content
//! equality against plain stores, and lazily wrapping iteration.
//!
//! The backing store is the single source of truth. Values go in raw and come
//! out wrapped; the only state next to the store is the configuration and the
//! non-serialized instance-local attribute table behind the
//! `allow_invalid_attributes` escape hatch.

use std::{fmt, ops::Add, str::FromStr};

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AttrError, AttrResult, Rejection},
    key::{Key, is_attribute_key},
    reserved::{ReservedName, reserved_names},
    store::{FrozenStore, HashStore, OrderedStore, Store},
    value::{SharedMap, Value, store_repr_fmt},
    wrap::{SequencePolicy, Wrapped, wrap},
};

/// Insertion-ordered mutable proxy.
pub type AttrMap = Attr<OrderedStore>;
/// Plain unordered mutable proxy.
pub type AttrDict = Attr<HashStore>;
/// Insertion-ordered proxy that refuses mutation after construction.
pub type FrozenAttrMap = Attr<FrozenStore>;

/// The result of resolving a name against a proxy.
#[derive(Debug)]
pub enum Member<S: Store> {
    /// The name resolved to stored data or an instance-local attribute.
    Data(Wrapped<S>),
    /// The name is one of the proxy's own methods.
    Method(ReservedName),
    /// The name cannot be served as an attribute.
    Rejected(Rejection),
}

/// Attribute-style facade over a backing key-value store.
#[derive(Debug, Serialize, Deserialize)]
pub struct Attr<S: Store> {
    pub(crate) store: SharedMap<S>,
    pub(crate) policy: SequencePolicy,
    /// When set, attribute assignment to classifier-rejected names lands in
    /// `locals` instead of failing. Never serialized.
    #[serde(skip)]
    pub(crate) allow_invalid: bool,
    /// Instance-local attributes: the escape hatch's storage. Not part of the
    /// mapping, equality, or serialized state.
    #[serde(skip)]
    pub(crate) locals: AHashMap<String, Value<S>>,
}

impl<S: Store> Attr<S> {
    /// Creates an empty proxy with the default sequence policy.
    #[must_use]
    pub fn new() -> Self {
        Self::from_store(S::default(), SequencePolicy::default())
    }

    /// Creates an empty proxy with the given sequence policy.
    #[must_use]
    pub fn with_policy(policy: SequencePolicy) -> Self {
        Self::from_store(S::default(), policy)
    }

    /// Builds a proxy from key-value pairs; a repeated key overwrites the
    /// earlier value, keeping its original position in ordered kinds.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<Key>,
        V: Into<Value<S>>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::from_pairs_with(pairs, SequencePolicy::default())
    }

    /// [`Self::from_pairs`] with an explicit sequence policy.
    pub fn from_pairs_with<K, V, I>(pairs: I, policy: SequencePolicy) -> Self
    where
        K: Into<Key>,
        V: Into<Value<S>>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::from_store(
            S::from_pairs(pairs.into_iter().map(|(key, value)| (key.into(), value.into()))),
            policy,
        )
    }

    /// Builds a proxy mapping every key to a clone of `value`.
    pub fn from_keys<K, I>(keys: I, value: impl Into<Value<S>>) -> Self
    where
        K: Into<Key>,
        I: IntoIterator<Item = K>,
    {
        let value = value.into();
        Self::from_pairs(keys.into_iter().map(|key| (key, value.clone())))
    }

    /// The standardized constructor: a backing store plus a configuration.
    /// Every recursive wrap and every merge result goes through here.
    #[must_use]
    pub fn from_store(store: S, policy: SequencePolicy) -> Self {
        Self::from_shared(SharedMap::new(store), policy)
    }

    pub(crate) fn from_shared(store: SharedMap<S>, policy: SequencePolicy) -> Self {
        Self {
            store,
            policy,
            allow_invalid: false,
            locals: AHashMap::new(),
        }
    }

    /// The configuration accessor: this instance's sequence policy.
    #[must_use]
    pub fn policy(&self) -> SequencePolicy {
        self.policy
    }

    /// Number of entries in the backing store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.borrow().len()
    }

    /// Returns whether the backing store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns whether `key` is present. Never applies the classifier.
    pub fn contains(&self, key: impl Into<Key>) -> bool {
        self.store.borrow().contains(&key.into())
    }

    /// Subscript read: fails with [`AttrError::KeyNotFound`] when absent.
    /// Works for every key shape; the classifier is never consulted.
    pub fn get_item(&self, key: impl Into<Key>) -> AttrResult<Wrapped<S>> {
        let key = key.into();
        let found = self.store.borrow().get(&key).map(|value| wrap(value, self.policy));
        found.ok_or_else(|| AttrError::key_not_found(key))
    }

    /// Attribute read: requires the classifier to approve `name`, and fails
    /// with [`AttrError::AttributeNotFound`] otherwise — even when the key is
    /// present in the backing store. Hidden and reserved keys stay reachable
    /// through subscript access only.
    pub fn attr(&self, name: &str) -> AttrResult<Wrapped<S>> {
        match self.resolve_member(name) {
            Member::Data(found) => Ok(found),
            Member::Method(_) => Err(AttrError::attribute(name, Rejection::Reserved)),
            Member::Rejected(reason) => Err(AttrError::attribute(name, reason)),
        }
    }

    /// Call-style read: behaves like subscript read but fails with the
    /// attribute-style error. This is the canonical accessor for keys that
    /// can never be valid attributes (integers, non-identifier text).
    pub fn lookup(&self, key: impl Into<Key>) -> AttrResult<Wrapped<S>> {
        let key = key.into();
        let found = self.store.borrow().get(&key).map(|value| wrap(value, self.policy));
        found.ok_or_else(|| AttrError::attribute(key.to_string(), Rejection::Missing))
    }

    /// Defaulting read: `None` on absence, never an error. Works for every
    /// key shape.
    pub fn get(&self, key: impl Into<Key>) -> Option<Wrapped<S>> {
        let key = key.into();
        self.store.borrow().get(&key).map(|value| wrap(value, self.policy))
    }

    /// Defaulting read returning `default` (wrapped) on absence.
    pub fn get_or(&self, key: impl Into<Key>, default: impl Into<Value<S>>) -> Wrapped<S> {
        self.get(key).unwrap_or_else(|| wrap(&default.into(), self.policy))
    }

    /// Resolves a name the way attribute access does, as a tagged result:
    /// instance-local attributes first, then the proxy's own method names,
    /// then the classifier-gated mapping lookup.
    pub fn resolve_member(&self, name: &str) -> Member<S> {
        if let Some(value) = self.locals.get(name) {
            return Member::Data(Wrapped::Value(value.clone()));
        }
        if let Ok(method) = ReservedName::from_str(name) {
            return Member::Method(method);
        }
        let key = Key::from(name);
        if !is_attribute_key(&key, reserved_names()) {
            let reason = if key.is_hidden() {
                Rejection::Hidden
            } else {
                Rejection::NotIdentifier
            };
            return Member::Rejected(reason);
        }
        match self.store.borrow().get(&key) {
            Some(value) => Member::Data(wrap(value, self.policy)),
            None => Member::Rejected(Rejection::Missing),
        }
    }

    fn ensure_mutable(&self, operation: &str) -> AttrResult<()> {
        if S::MUTABLE {
            Ok(())
        } else {
            Err(AttrError::type_mismatch(format!(
                "'{}' does not support {operation}",
                S::KIND
            )))
        }
    }

    /// Subscript write. Works for every key shape on mutable kinds; fails
    /// with [`AttrError::TypeMismatch`] on immutable kinds.
    pub fn set_item(&mut self, key: impl Into<Key>, value: impl Into<Value<S>>) -> AttrResult<()> {
        self.ensure_mutable("item assignment")?;
        self.store.borrow_mut().insert(key.into(), value.into());
        Ok(())
    }

    /// Attribute write: classifier-approved names go to the mapping. A
    /// rejected name fails with [`AttrError::TypeMismatch`] unless the
    /// `allow_invalid_attributes` escape hatch is on, in which case the value
    /// becomes an instance-local attribute and the mapping is untouched.
    pub fn set_attr(&mut self, name: &str, value: impl Into<Value<S>>) -> AttrResult<()> {
        let key = Key::from(name);
        if is_attribute_key(&key, reserved_names()) {
            self.set_item(key, value)
        } else if self.allow_invalid {
            self.locals.insert(name.to_owned(), value.into());
            Ok(())
        } else {
            Err(AttrError::type_mismatch(format!(
                "'{name}' is not a valid attribute name"
            )))
        }
    }

    /// Subscript delete: fails with [`AttrError::KeyNotFound`] when absent.
    pub fn remove_item(&mut self, key: impl Into<Key>) -> AttrResult<()> {
        self.ensure_mutable("item deletion")?;
        let key = key.into();
        let removed = self.store.borrow_mut().remove(&key);
        removed.map(|_| ()).ok_or_else(|| AttrError::key_not_found(key))
    }

    /// Attribute delete, symmetric to [`Self::set_attr`]: approved names
    /// delete from the mapping (missing is [`AttrError::AttributeNotFound`]),
    /// rejected names fail with [`AttrError::TypeMismatch`] unless the escape
    /// hatch is on, in which case the instance-local attribute is removed.
    pub fn del_attr(&mut self, name: &str) -> AttrResult<()> {
        let key = Key::from(name);
        if is_attribute_key(&key, reserved_names()) {
            self.ensure_mutable("attribute deletion")?;
            let removed = self.store.borrow_mut().remove(&key);
            removed
                .map(|_| ())
                .ok_or_else(|| AttrError::attribute(name, Rejection::Missing))
        } else if self.allow_invalid {
            self.locals
                .remove(name)
                .map(|_| ())
                .ok_or_else(|| AttrError::attribute(name, Rejection::Missing))
        } else {
            Err(AttrError::type_mismatch(format!(
                "'{name}' is not a valid attribute name"
            )))
        }
    }

    /// Removes `key` and returns its raw value; [`AttrError::KeyNotFound`]
    /// when absent.
    pub fn pop(&mut self, key: impl Into<Key>) -> AttrResult<Value<S>> {
        self.ensure_mutable("pop")?;
        let key = key.into();
        let removed = self.store.borrow_mut().remove(&key);
        removed.ok_or_else(|| AttrError::key_not_found(key))
    }

    /// Removes `key` and returns its raw value, or `default` when absent.
    pub fn pop_or(&mut self, key: impl Into<Key>, default: impl Into<Value<S>>) -> AttrResult<Value<S>> {
        self.ensure_mutable("pop")?;
        Ok(self
            .store
            .borrow_mut()
            .remove(&key.into())
            .unwrap_or_else(|| default.into()))
    }

    /// Removes and returns one raw entry: the most recently inserted on
    /// ordered kinds, an arbitrary one otherwise. `None` when empty.
    pub fn popitem(&mut self) -> AttrResult<Option<(Key, Value<S>)>> {
        self.ensure_mutable("popitem")?;
        Ok(self.store.borrow_mut().pop_entry())
    }

    /// Removes every entry.
    pub fn clear(&mut self) -> AttrResult<()> {
        self.ensure_mutable("clear")?;
        self.store.borrow_mut().clear();
        Ok(())
    }

    /// Inserts every pair, overwriting on conflict.
    pub fn update<K, V, I>(&mut self, pairs: I) -> AttrResult<()>
    where
        K: Into<Key>,
        V: Into<Value<S>>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.ensure_mutable("update")?;
        let mut store = self.store.borrow_mut();
        for (key, value) in pairs {
            store.insert(key.into(), value.into());
        }
        Ok(())
    }

    /// Returns the wrapped value under `key`, inserting `default` first when
    /// the key is absent. Never applies the classifier.
    pub fn setdefault(&mut self, key: impl Into<Key>, default: impl Into<Value<S>>) -> AttrResult<Wrapped<S>> {
        let key = key.into();
        if let Some(found) = self.get(key.clone()) {
            return Ok(found);
        }
        self.ensure_mutable("setdefault")?;
        let value = default.into();
        self.store.borrow_mut().insert(key, value.clone());
        Ok(wrap(&value, self.policy))
    }

    /// Whether attribute assignment to rejected names is redirected to
    /// instance-local attributes instead of failing.
    #[must_use]
    pub fn allow_invalid_attributes(&self) -> bool {
        self.allow_invalid
    }

    /// Enables or disables the instance-local attribute escape hatch.
    pub fn set_allow_invalid_attributes(&mut self, allow: bool) {
        self.allow_invalid = allow;
    }

    /// Forcibly sets an instance-local attribute, bypassing the classifier
    /// and the escape-hatch flag. Never touches the mapping.
    pub fn set_local_attribute(&mut self, name: impl Into<String>, value: impl Into<Value<S>>) {
        self.locals.insert(name.into(), value.into());
    }

    /// Forcibly removes an instance-local attribute, returning its value.
    pub fn remove_local_attribute(&mut self, name: &str) -> Option<Value<S>> {
        self.locals.remove(name)
    }

    /// Cloned keys, in store order.
    pub fn keys(&self) -> Keys {
        let keys: Vec<Key> = self.store.borrow().iter().map(|(key, _)| key.clone()).collect();
        Keys { inner: keys.into_iter() }
    }

    /// Values, each wrapped lazily as the iterator advances.
    pub fn values(&self) -> ValuesIter<S> {
        let values: Vec<Value<S>> = self.store.borrow().iter().map(|(_, value)| value.clone()).collect();
        ValuesIter {
            inner: values.into_iter(),
            policy: self.policy,
        }
    }

    /// Key-value pairs, each value wrapped lazily as the iterator advances.
    pub fn items(&self) -> Items<S> {
        Items {
            inner: self.raw_items().into_iter(),
            policy: self.policy,
        }
    }

    fn raw_items(&self) -> Vec<(Key, Value<S>)> {
        self.store
            .borrow()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Merges with another proxy of the same kind: every key from both, the
    /// right side winning conflicts, nested mappings unified recursively.
    /// The result has this proxy's kind and configuration.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        Self::from_store(merge_stores(&self.store.borrow(), &other.store.borrow()), self.policy)
    }

    /// Merges with a plain store on the right.
    #[must_use]
    pub fn merge_plain(&self, other: &S) -> Self {
        Self::from_store(merge_stores(&self.store.borrow(), other), self.policy)
    }

    /// Merges a plain store on the left with a proxy on the right; the
    /// result takes the proxy's kind and configuration.
    #[must_use]
    pub fn merge_from(left: &S, right: &Self) -> Self {
        Self::from_store(merge_stores(left, &right.store.borrow()), right.policy)
    }

    /// Merges with a dynamic value on the right; anything but a mapping is a
    /// type mismatch.
    pub fn merge_value(&self, other: &Value<S>) -> AttrResult<Self> {
        match other {
            Value::Map(shared) => Ok(Self::from_store(
                merge_stores(&self.store.borrow(), &shared.borrow()),
                self.policy,
            )),
            other => Err(AttrError::type_mismatch(format!(
                "cannot merge {} with {}",
                S::KIND,
                other.type_name()
            ))),
        }
    }

    /// Merges a dynamic value on the left with a proxy on the right; errors
    /// commutatively with [`Self::merge_value`].
    pub fn merge_value_from(left: &Value<S>, right: &Self) -> AttrResult<Self> {
        match left {
            Value::Map(shared) => Ok(Self::from_store(
                merge_stores(&shared.borrow(), &right.store.borrow()),
                right.policy,
            )),
            other => Err(AttrError::type_mismatch(format!(
                "cannot merge {} with {}",
                other.type_name(),
                S::KIND
            ))),
        }
    }

    /// Recursively copies the proxy so the result shares nothing with the
    /// original.
    #[must_use]
    pub fn deep_clone(&self) -> Self {
        let store = self.store.borrow();
        let mut copy = S::with_capacity(store.len());
        for (key, value) in store.iter() {
            copy.insert(key.clone(), value.deep_clone());
        }
        drop(store);
        Self {
            store: SharedMap::new(copy),
            policy: self.policy,
            allow_invalid: self.allow_invalid,
            locals: self.locals.clone(),
        }
    }
}

/// Right-biased merge of two stores. Keys present in both with mapping
/// values on both sides unify recursively into a fresh nested store; every
/// other conflict takes the right value outright.
fn merge_stores<S: Store>(left: &S, right: &S) -> S {
    let mut merged = S::with_capacity(left.len() + right.len());
    for (key, value) in left.iter() {
        merged.insert(key.clone(), value.clone());
    }
    for (key, value) in right.iter() {
        let left_map = match merged.get(key) {
            Some(Value::Map(shared)) => Some(shared.clone()),
            _ => None,
        };
        let unified = match (left_map, value) {
            (Some(left_shared), Value::Map(right_shared)) => Value::Map(SharedMap::new(merge_stores(
                &*left_shared.borrow(),
                &*right_shared.borrow(),
            ))),
            (_, other) => other.clone(),
        };
        merged.insert(key.clone(), unified);
    }
    merged
}

impl<S: Store> Default for Attr<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Shallow copy: the top-level store is copied, nested mappings stay shared
/// with the original. Use [`Attr::deep_clone`] for full isolation.
impl<S: Store> Clone for Attr<S> {
    fn clone(&self) -> Self {
        Self {
            store: SharedMap::new(self.store.borrow().clone()),
            policy: self.policy,
            allow_invalid: self.allow_invalid,
            locals: self.locals.clone(),
        }
    }
}

/// Content equality of the backing stores; configuration and instance-local
/// attributes are ignored, and order is irrelevant.
impl<S: Store> PartialEq for Attr<S> {
    fn eq(&self, other: &Self) -> bool {
        self.store == other.store
    }
}

/// Content equality against a plain store.
impl<S: Store> PartialEq<S> for Attr<S> {
    fn eq(&self, other: &S) -> bool {
        *self.store.borrow() == *other
    }
}

impl<S: Store> fmt::Display for Attr<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", S::KIND)?;
        let mut seen = AHashSet::new();
        seen.insert(self.store.address());
        store_repr_fmt(&*self.store.borrow(), f, &mut seen)?;
        f.write_str(")")
    }
}

impl<S: Store> Add for Attr<S> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.merge(&rhs)
    }
}

impl<S: Store> Add<&Attr<S>> for &Attr<S> {
    type Output = Attr<S>;

    fn add(self, rhs: &Attr<S>) -> Attr<S> {
        self.merge(rhs)
    }
}

impl<S: Store> Add<&S> for &Attr<S> {
    type Output = Attr<S>;

    fn add(self, rhs: &S) -> Attr<S> {
        self.merge_plain(rhs)
    }
}

impl Add<&AttrMap> for &OrderedStore {
    type Output = AttrMap;

    fn add(self, rhs: &AttrMap) -> AttrMap {
        AttrMap::merge_from(self, rhs)
    }
}

impl Add<&AttrDict> for &HashStore {
    type Output = AttrDict;

    fn add(self, rhs: &AttrDict) -> AttrDict {
        AttrDict::merge_from(self, rhs)
    }
}

impl Add<&FrozenAttrMap> for &FrozenStore {
    type Output = FrozenAttrMap;

    fn add(self, rhs: &FrozenAttrMap) -> FrozenAttrMap {
        FrozenAttrMap::merge_from(self, rhs)
    }
}

impl PartialEq<AttrMap> for OrderedStore {
    fn eq(&self, other: &AttrMap) -> bool {
        other == self
    }
}

impl PartialEq<AttrDict> for HashStore {
    fn eq(&self, other: &AttrDict) -> bool {
        other == self
    }
}

impl PartialEq<FrozenAttrMap> for FrozenStore {
    fn eq(&self, other: &FrozenAttrMap) -> bool {
        other == self
    }
}

/// Iterator over cloned keys in store order.
#[derive(Debug)]
pub struct Keys {
    inner: std::vec::IntoIter<Key>,
}

impl Iterator for Keys {
    type Item = Key;

    fn next(&mut self) -> Option<Key> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Keys {}

/// Iterator over values, wrapping each one as it is yielded.
#[derive(Debug)]
pub struct ValuesIter<S: Store> {
    inner: std::vec::IntoIter<Value<S>>,
    policy: SequencePolicy,
}

impl<S: Store> Iterator for ValuesIter<S> {
    type Item = Wrapped<S>;

    fn next(&mut self) -> Option<Wrapped<S>> {
        self.inner.next().map(|value| wrap(&value, self.policy))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<S: Store> ExactSizeIterator for ValuesIter<S> {}

/// Iterator over key-value pairs, wrapping each value as it is yielded.
#[derive(Debug)]
pub struct Items<S: Store> {
    inner: std::vec::IntoIter<(Key, Value<S>)>,
    policy: SequencePolicy,
}

impl<S: Store> Iterator for Items<S> {
    type Item = (Key, Wrapped<S>);

    fn next(&mut self) -> Option<(Key, Wrapped<S>)> {
        self.inner.next().map(|(key, value)| (key, wrap(&value, self.policy)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<S: Store> ExactSizeIterator for Items<S> {}

impl<S: Store> IntoIterator for &Attr<S> {
    type Item = (Key, Wrapped<S>);
    type IntoIter = Items<S>;

    fn into_iter(self) -> Items<S> {
        self.items()
    }
}

/// Sharing an owned proxy as a value: the nested mapping keeps pointing at
/// the same store, matching what wrap-on-read produces.
impl<S: Store> From<Attr<S>> for Value<S> {
    fn from(proxy: Attr<S>) -> Self {
        Self::Map(proxy.store)
    }
}
