//! State extraction and byte-level round-trips.
//!
//! A proxy's entire serializable state is the pair (backing store,
//! configuration). `ProxyState` is that pair; `from_state` rebuilds an
//! equivalent instance directly, without replaying any constructor merge
//! logic. `dump`/`load` carry the pair through postcard.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{attr::Attr, error::AttrResult, store::Store, wrap::SequencePolicy};

/// The get-state/set-state pair: exactly the backing store and the
/// configuration, nothing else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyState<S> {
    /// The backing store, values raw.
    pub store: S,
    /// The sequence-wrapping configuration.
    pub policy: SequencePolicy,
}

impl<S: Store> Attr<S> {
    /// Clones out the serializable state.
    #[must_use]
    pub fn state(&self) -> ProxyState<S> {
        ProxyState {
            store: self.store.borrow().clone(),
            policy: self.policy,
        }
    }

    /// Takes the serializable state, cloning the store only if it is still
    /// shared with nested proxies.
    #[must_use]
    pub fn into_state(self) -> ProxyState<S> {
        ProxyState {
            store: self.store.into_inner(),
            policy: self.policy,
        }
    }

    /// Rebuilds a proxy from previously extracted state.
    #[must_use]
    pub fn from_state(state: ProxyState<S>) -> Self {
        Self::from_store(state.store, state.policy)
    }
}

impl<S: Store + Serialize> Attr<S> {
    /// Serializes (store, configuration) to bytes.
    pub fn dump(&self) -> AttrResult<Vec<u8>> {
        postcard::to_allocvec(&self.state()).map_err(Into::into)
    }
}

impl<S: Store + DeserializeOwned> Attr<S> {
    /// Reconstructs a proxy from [`Self::dump`] output.
    pub fn load(bytes: &[u8]) -> AttrResult<Self> {
        postcard::from_bytes::<ProxyState<S>>(bytes)
            .map(Self::from_state)
            .map_err(Into::into)
    }
}
