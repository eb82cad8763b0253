#![doc = include_str!("../../../README.md")]

mod attr;
mod default;
mod error;
mod json;
mod key;
mod macros;
mod reserved;
mod state;
mod store;
mod value;
mod wrap;

pub use crate::{
    attr::{Attr, AttrDict, AttrMap, FrozenAttrMap, Items, Keys, Member, ValuesIter},
    default::{AttrDefault, DefaultFactory},
    error::{AttrError, AttrResult, Rejection},
    key::{HIDDEN_MARKER, Key, is_attribute_key},
    reserved::{ReservedName, reserved_names},
    state::ProxyState,
    store::{FrozenStore, HashStore, OrderedStore, Store},
    value::{SharedMap, Value},
    wrap::{SeqKind, SequencePolicy, Wrapped, wrap},
};
