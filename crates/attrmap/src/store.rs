//! The abstract key-value store and its concrete adapters.
//!
//! The proxy core is written once against [`Store`] and parameterized by the
//! concrete kind, so ordered, unordered, and immutable concretions share every
//! line of proxy logic. Adapters are thin: they pick a map representation and
//! declare their capabilities.

use std::fmt;

use ahash::AHashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{key::Key, value::Value};

/// A concrete backing store for a proxy.
///
/// Implementing this trait is the whole collaborator contract: construction
/// from pairs, keyed access, length, iteration, and the capability constants.
/// The construct-from-store and configuration hooks the proxy needs are trait
/// and inherent requirements, so omitting one is a compile error rather than
/// a runtime one.
pub trait Store: Default + Clone + PartialEq + fmt::Debug + Sized {
    /// Display name of the proxy kind built on this store, used in reprs and
    /// error messages.
    const KIND: &'static str;
    /// False for concretions that refuse mutation after construction. The
    /// proxy checks this before touching the store, so a rejected write
    /// leaves the store unchanged.
    const MUTABLE: bool;
    /// True when iteration preserves insertion order.
    const ORDERED: bool;

    /// Creates an empty store sized for `capacity` entries.
    fn with_capacity(capacity: usize) -> Self;

    /// Returns the value stored under `key`.
    fn get(&self, key: &Key) -> Option<&Value<Self>>;

    /// Inserts a pair, returning the previous value if the key was present.
    /// An existing key keeps its position in ordered stores.
    fn insert(&mut self, key: Key, value: Value<Self>) -> Option<Value<Self>>;

    /// Removes a key, preserving the order of the remaining entries.
    fn remove(&mut self, key: &Key) -> Option<Value<Self>>;

    /// Removes and returns one entry: the most recently inserted for ordered
    /// stores, an arbitrary one otherwise.
    fn pop_entry(&mut self) -> Option<(Key, Value<Self>)>;

    /// Number of entries.
    fn len(&self) -> usize;

    /// Removes every entry.
    fn clear(&mut self);

    /// Iterates entries; in insertion order when [`Self::ORDERED`].
    fn iter(&self) -> impl Iterator<Item = (&Key, &Value<Self>)>;

    /// Returns whether the store has no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns whether `key` is present.
    fn contains(&self, key: &Key) -> bool {
        self.get(key).is_some()
    }

    /// Builds a store from key-value pairs; a repeated key overwrites the
    /// earlier value while keeping its original position in ordered stores.
    fn from_pairs(pairs: impl IntoIterator<Item = (Key, Value<Self>)>) -> Self {
        let pairs = pairs.into_iter();
        let mut store = Self::with_capacity(pairs.size_hint().0);
        for (key, value) in pairs {
            store.insert(key, value);
        }
        store
    }
}

/// Insertion-ordered mutable store backing [`AttrMap`](crate::AttrMap).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderedStore {
    entries: IndexMap<Key, Value<OrderedStore>>,
}

impl Store for OrderedStore {
    const KIND: &'static str = "AttrMap";
    const MUTABLE: bool = true;
    const ORDERED: bool = true;

    fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
        }
    }

    fn get(&self, key: &Key) -> Option<&Value<Self>> {
        self.entries.get(key)
    }

    fn insert(&mut self, key: Key, value: Value<Self>) -> Option<Value<Self>> {
        self.entries.insert(key, value)
    }

    fn remove(&mut self, key: &Key) -> Option<Value<Self>> {
        self.entries.shift_remove(key)
    }

    fn pop_entry(&mut self) -> Option<(Key, Value<Self>)> {
        self.entries.pop()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn iter(&self) -> impl Iterator<Item = (&Key, &Value<Self>)> {
        self.entries.iter()
    }
}

impl From<IndexMap<Key, Value<OrderedStore>>> for OrderedStore {
    fn from(entries: IndexMap<Key, Value<OrderedStore>>) -> Self {
        Self { entries }
    }
}

impl From<OrderedStore> for Value<OrderedStore> {
    fn from(store: OrderedStore) -> Self {
        Self::Map(crate::value::SharedMap::new(store))
    }
}

/// Plain unordered mutable store backing [`AttrDict`](crate::AttrDict).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashStore {
    entries: AHashMap<Key, Value<HashStore>>,
}

impl Store for HashStore {
    const KIND: &'static str = "AttrDict";
    const MUTABLE: bool = true;
    const ORDERED: bool = false;

    fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: AHashMap::with_capacity(capacity),
        }
    }

    fn get(&self, key: &Key) -> Option<&Value<Self>> {
        self.entries.get(key)
    }

    fn insert(&mut self, key: Key, value: Value<Self>) -> Option<Value<Self>> {
        self.entries.insert(key, value)
    }

    fn remove(&mut self, key: &Key) -> Option<Value<Self>> {
        self.entries.remove(key)
    }

    fn pop_entry(&mut self) -> Option<(Key, Value<Self>)> {
        let key = self.entries.keys().next()?.clone();
        let value = self.entries.remove(&key)?;
        Some((key, value))
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn iter(&self) -> impl Iterator<Item = (&Key, &Value<Self>)> {
        self.entries.iter()
    }
}

impl From<HashStore> for Value<HashStore> {
    fn from(store: HashStore) -> Self {
        Self::Map(crate::value::SharedMap::new(store))
    }
}

/// Insertion-ordered immutable store backing
/// [`FrozenAttrMap`](crate::FrozenAttrMap).
///
/// The mutating trait methods still work at the store level: construction and
/// merge results are populated through them. User-facing mutation is refused
/// by the proxy layer, which gates on `MUTABLE` before touching the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrozenStore {
    entries: IndexMap<Key, Value<FrozenStore>>,
}

impl Store for FrozenStore {
    const KIND: &'static str = "FrozenAttrMap";
    const MUTABLE: bool = false;
    const ORDERED: bool = true;

    fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
        }
    }

    fn get(&self, key: &Key) -> Option<&Value<Self>> {
        self.entries.get(key)
    }

    fn insert(&mut self, key: Key, value: Value<Self>) -> Option<Value<Self>> {
        self.entries.insert(key, value)
    }

    fn remove(&mut self, key: &Key) -> Option<Value<Self>> {
        self.entries.shift_remove(key)
    }

    fn pop_entry(&mut self) -> Option<(Key, Value<Self>)> {
        self.entries.pop()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn iter(&self) -> impl Iterator<Item = (&Key, &Value<Self>)> {
        self.entries.iter()
    }
}

impl From<FrozenStore> for Value<FrozenStore> {
    fn from(store: FrozenStore) -> Self {
        Self::Map(crate::value::SharedMap::new(store))
    }
}
