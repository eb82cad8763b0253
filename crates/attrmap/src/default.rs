//! The default-value variant: a proxy that manufactures missing values.
//!
//! `AttrDefault` composes the core proxy with an optional factory. A miss on
//! subscript or attribute read invokes the factory, stores the produced value
//! raw at the missing key, and returns it wrapped — the one deliberate
//! exception to "values are stored only on explicit write". `lookup` and
//! `get` never trigger the factory, and neither does a classifier-rejected
//! attribute name.
//!
//! Reads that insert take `&self`: the store handle's interior mutability
//! carries the write, so the read surface matches the core proxy's.

use std::{fmt, rc::Rc};

use ahash::AHashSet;
use serde::{Deserialize, Serialize, ser::SerializeStruct};

use crate::{
    attr::{Attr, Items, Keys, Member, ValuesIter},
    error::{AttrError, AttrResult, Rejection},
    key::Key,
    store::{OrderedStore, Store},
    value::{SharedMap, Value, store_repr_fmt},
    wrap::{SequencePolicy, Wrapped, wrap},
};

/// How to manufacture a value for a missing key.
///
/// The pass-key choice is the variant: `Call` factories take no argument,
/// `CallWithKey` factories receive the missing key.
#[derive(Clone)]
pub enum DefaultFactory<S: Store> {
    /// A fixed default. Deep-cloned per miss so produced values never alias.
    Value(Value<S>),
    /// A no-argument factory.
    Call(Rc<dyn Fn() -> Value<S>>),
    /// A factory receiving the missing key.
    CallWithKey(Rc<dyn Fn(&Key) -> Value<S>>),
}

impl<S: Store> DefaultFactory<S> {
    /// Fixed-value factory.
    pub fn value(value: impl Into<Value<S>>) -> Self {
        Self::Value(value.into())
    }

    /// No-argument callable factory.
    pub fn call(factory: impl Fn() -> Value<S> + 'static) -> Self {
        Self::Call(Rc::new(factory))
    }

    /// Callable factory that receives the missing key.
    pub fn call_with_key(factory: impl Fn(&Key) -> Value<S> + 'static) -> Self {
        Self::CallWithKey(Rc::new(factory))
    }

    /// Whether the factory receives the missing key.
    #[must_use]
    pub fn passes_key(&self) -> bool {
        matches!(self, Self::CallWithKey(_))
    }

    pub(crate) fn produce(&self, key: &Key) -> Value<S> {
        match self {
            Self::Value(value) => value.deep_clone(),
            Self::Call(factory) => factory(),
            Self::CallWithKey(factory) => factory(key),
        }
    }
}

impl<S: Store> fmt::Debug for DefaultFactory<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Call(_) => f.write_str("Call(<factory>)"),
            Self::CallWithKey(_) => f.write_str("CallWithKey(<factory>)"),
        }
    }
}

/// A proxy whose missing-key reads invoke a factory and store the result.
///
/// With no factory it behaves exactly like [`Attr<S>`].
#[derive(Debug, Clone)]
pub struct AttrDefault<S: Store = OrderedStore> {
    inner: Attr<S>,
    factory: Option<DefaultFactory<S>>,
}

impl<S: Store> AttrDefault<S> {
    /// Creates an empty proxy with the given factory and default policy.
    #[must_use]
    pub fn new(factory: Option<DefaultFactory<S>>) -> Self {
        Self {
            inner: Attr::new(),
            factory,
        }
    }

    /// Creates an empty proxy with the given factory and sequence policy.
    #[must_use]
    pub fn with_policy(factory: Option<DefaultFactory<S>>, policy: SequencePolicy) -> Self {
        Self {
            inner: Attr::with_policy(policy),
            factory,
        }
    }

    /// Builds a proxy from key-value pairs plus a factory.
    pub fn from_pairs<K, V, I>(factory: Option<DefaultFactory<S>>, pairs: I) -> Self
    where
        K: Into<Key>,
        V: Into<Value<S>>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            inner: Attr::from_pairs(pairs),
            factory,
        }
    }

    /// [`Self::from_pairs`] with an explicit sequence policy.
    pub fn from_pairs_with<K, V, I>(factory: Option<DefaultFactory<S>>, pairs: I, policy: SequencePolicy) -> Self
    where
        K: Into<Key>,
        V: Into<Value<S>>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            inner: Attr::from_pairs_with(pairs, policy),
            factory,
        }
    }

    /// Attaches a factory to an existing proxy.
    #[must_use]
    pub fn from_attr(factory: Option<DefaultFactory<S>>, inner: Attr<S>) -> Self {
        Self { inner, factory }
    }

    /// The core proxy this variant delegates to.
    #[must_use]
    pub fn as_attr(&self) -> &Attr<S> {
        &self.inner
    }

    /// Mutable access to the core proxy.
    pub fn as_attr_mut(&mut self) -> &mut Attr<S> {
        &mut self.inner
    }

    /// Discards the factory and returns the core proxy.
    #[must_use]
    pub fn into_attr(self) -> Attr<S> {
        self.inner
    }

    /// The factory, if any.
    #[must_use]
    pub fn factory(&self) -> Option<&DefaultFactory<S>> {
        self.factory.as_ref()
    }

    /// Replaces the factory, returning the previous one.
    pub fn replace_factory(&mut self, factory: Option<DefaultFactory<S>>) -> Option<DefaultFactory<S>> {
        std::mem::replace(&mut self.factory, factory)
    }

    /// This instance's sequence policy.
    #[must_use]
    pub fn policy(&self) -> SequencePolicy {
        self.inner.policy()
    }

    fn produce_and_store(&self, key: Key, factory: &DefaultFactory<S>) -> AttrResult<Wrapped<S>> {
        if !S::MUTABLE {
            return Err(AttrError::type_mismatch(format!(
                "'{}' does not support storing produced defaults",
                S::KIND
            )));
        }
        let value = factory.produce(&key);
        self.inner.store.borrow_mut().insert(key, value.clone());
        Ok(wrap(&value, self.inner.policy))
    }

    /// Subscript read; a miss invokes the factory, stores the produced value,
    /// and returns it. Without a factory this is [`Attr::get_item`].
    pub fn get_item(&self, key: impl Into<Key>) -> AttrResult<Wrapped<S>> {
        let key = key.into();
        if let Some(found) = self.inner.get(key.clone()) {
            return Ok(found);
        }
        match &self.factory {
            Some(factory) => self.produce_and_store(key, factory),
            None => Err(AttrError::key_not_found(key)),
        }
    }

    /// Attribute read; a classifier-approved miss invokes the factory.
    /// Rejected names never do.
    pub fn attr(&self, name: &str) -> AttrResult<Wrapped<S>> {
        match self.inner.resolve_member(name) {
            Member::Data(found) => Ok(found),
            Member::Method(_) => Err(AttrError::attribute(name, Rejection::Reserved)),
            Member::Rejected(Rejection::Missing) => match &self.factory {
                Some(factory) => self.produce_and_store(Key::from(name), factory),
                None => Err(AttrError::attribute(name, Rejection::Missing)),
            },
            Member::Rejected(reason) => Err(AttrError::attribute(name, reason)),
        }
    }

    /// Call-style read. Never invokes the factory.
    pub fn lookup(&self, key: impl Into<Key>) -> AttrResult<Wrapped<S>> {
        self.inner.lookup(key)
    }

    /// Defaulting read. Never invokes the factory.
    pub fn get(&self, key: impl Into<Key>) -> Option<Wrapped<S>> {
        self.inner.get(key)
    }

    /// Defaulting read with an explicit fallback. Never invokes the factory.
    pub fn get_or(&self, key: impl Into<Key>, default: impl Into<Value<S>>) -> Wrapped<S> {
        self.inner.get_or(key, default)
    }

    /// See [`Attr::resolve_member`].
    pub fn resolve_member(&self, name: &str) -> Member<S> {
        self.inner.resolve_member(name)
    }

    /// See [`Attr::contains`].
    pub fn contains(&self, key: impl Into<Key>) -> bool {
        self.inner.contains(key)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns whether the backing store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// See [`Attr::keys`].
    pub fn keys(&self) -> Keys {
        self.inner.keys()
    }

    /// See [`Attr::values`].
    pub fn values(&self) -> ValuesIter<S> {
        self.inner.values()
    }

    /// See [`Attr::items`].
    pub fn items(&self) -> Items<S> {
        self.inner.items()
    }

    /// See [`Attr::set_item`].
    pub fn set_item(&mut self, key: impl Into<Key>, value: impl Into<Value<S>>) -> AttrResult<()> {
        self.inner.set_item(key, value)
    }

    /// See [`Attr::set_attr`].
    pub fn set_attr(&mut self, name: &str, value: impl Into<Value<S>>) -> AttrResult<()> {
        self.inner.set_attr(name, value)
    }

    /// See [`Attr::remove_item`].
    pub fn remove_item(&mut self, key: impl Into<Key>) -> AttrResult<()> {
        self.inner.remove_item(key)
    }

    /// See [`Attr::del_attr`].
    pub fn del_attr(&mut self, name: &str) -> AttrResult<()> {
        self.inner.del_attr(name)
    }

    /// See [`Attr::pop`].
    pub fn pop(&mut self, key: impl Into<Key>) -> AttrResult<Value<S>> {
        self.inner.pop(key)
    }

    /// See [`Attr::pop_or`].
    pub fn pop_or(&mut self, key: impl Into<Key>, default: impl Into<Value<S>>) -> AttrResult<Value<S>> {
        self.inner.pop_or(key, default)
    }

    /// See [`Attr::popitem`].
    pub fn popitem(&mut self) -> AttrResult<Option<(Key, Value<S>)>> {
        self.inner.popitem()
    }

    /// See [`Attr::clear`].
    pub fn clear(&mut self) -> AttrResult<()> {
        self.inner.clear()
    }

    /// See [`Attr::update`].
    pub fn update<K, V, I>(&mut self, pairs: I) -> AttrResult<()>
    where
        K: Into<Key>,
        V: Into<Value<S>>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.inner.update(pairs)
    }

    /// See [`Attr::setdefault`].
    pub fn setdefault(&mut self, key: impl Into<Key>, default: impl Into<Value<S>>) -> AttrResult<Wrapped<S>> {
        self.inner.setdefault(key, default)
    }

    /// Merges with another default proxy; the result keeps this side's kind,
    /// configuration, and factory.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            inner: self.inner.merge(&other.inner),
            factory: self.factory.clone(),
        }
    }

    /// Merges with a plain store on the right.
    #[must_use]
    pub fn merge_plain(&self, other: &S) -> Self {
        Self {
            inner: self.inner.merge_plain(other),
            factory: self.factory.clone(),
        }
    }

    /// Recursively copies the proxy; the factory is shared, the data is not.
    #[must_use]
    pub fn deep_clone(&self) -> Self {
        Self {
            inner: self.inner.deep_clone(),
            factory: self.factory.clone(),
        }
    }
}

impl<S: Store> Default for AttrDefault<S> {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Content equality of the backing stores; the factory is ignored.
impl<S: Store> PartialEq for AttrDefault<S> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<S: Store> PartialEq<Attr<S>> for AttrDefault<S> {
    fn eq(&self, other: &Attr<S>) -> bool {
        self.inner == *other
    }
}

impl<S: Store> PartialEq<S> for AttrDefault<S> {
    fn eq(&self, other: &S) -> bool {
        self.inner == *other
    }
}

impl<S: Store> fmt::Display for AttrDefault<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AttrDefault(")?;
        match &self.factory {
            None => f.write_str("None")?,
            Some(DefaultFactory::Value(value)) => {
                let mut seen = AHashSet::new();
                value.repr_fmt(f, &mut seen)?;
            }
            Some(_) => f.write_str("<factory>")?,
        }
        let passes_key = self.factory.as_ref().is_some_and(DefaultFactory::passes_key);
        write!(f, ", {}, ", if passes_key { "True" } else { "False" })?;
        let mut seen = AHashSet::new();
        seen.insert(self.inner.store.address());
        store_repr_fmt(&*self.inner.store.borrow(), f, &mut seen)?;
        f.write_str(")")
    }
}

/// Serialized form: exactly (store, configuration, fixed default). Callable
/// factories cannot cross a serialization boundary and are dropped.
impl<S: Store + Serialize> Serialize for AttrDefault<S> {
    fn serialize<Ser: serde::Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        let mut state = serializer.serialize_struct("AttrDefault", 3)?;
        state.serialize_field("store", &self.inner.store)?;
        state.serialize_field("policy", &self.inner.policy)?;
        let fixed = match &self.factory {
            Some(DefaultFactory::Value(value)) => Some(value),
            _ => None,
        };
        state.serialize_field("default", &fixed)?;
        state.end()
    }
}

#[derive(Deserialize)]
#[serde(rename = "AttrDefault")]
struct DefaultState<S: Store> {
    store: S,
    policy: SequencePolicy,
    default: Option<Value<S>>,
}

impl<'de, S: Store + Deserialize<'de>> Deserialize<'de> for AttrDefault<S> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let state = DefaultState::<S>::deserialize(deserializer)?;
        Ok(Self {
            inner: Attr::from_shared(SharedMap::new(state.store), state.policy),
            factory: state.default.map(DefaultFactory::Value),
        })
    }
}

impl<S: Store + Serialize> AttrDefault<S> {
    /// Serializes (store, configuration, fixed default) to bytes.
    pub fn dump(&self) -> AttrResult<Vec<u8>> {
        postcard::to_allocvec(self).map_err(Into::into)
    }
}

impl<S: Store + serde::de::DeserializeOwned> AttrDefault<S> {
    /// Reconstructs a proxy from [`Self::dump`] output.
    pub fn load(bytes: &[u8]) -> AttrResult<Self> {
        postcard::from_bytes(bytes).map_err(Into::into)
    }
}
