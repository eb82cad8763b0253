//! Error taxonomy for proxy operations.
//!
//! Every failure is local and synchronous; a rejected write or delete leaves
//! the backing store untouched. Callers decide whether to recover.

use thiserror::Error;

use crate::key::Key;

/// Result type alias for operations that can fail with an [`AttrError`].
pub type AttrResult<T> = Result<T, AttrError>;

/// Why a name could not be served through attribute-style access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Rejection {
    /// The key has identifier form but is absent from the mapping.
    #[strum(serialize = "key is absent")]
    Missing,
    /// The key is not a case-sensitive identifier-like string.
    #[strum(serialize = "key does not have identifier form")]
    NotIdentifier,
    /// The key starts with the hidden-key marker.
    #[strum(serialize = "key is hidden")]
    Hidden,
    /// The name collides with one of the proxy's own methods.
    #[strum(serialize = "name is reserved by the proxy")]
    Reserved,
}

/// Errors produced by proxy operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttrError {
    /// Subscript-style miss: the key is not in the backing store.
    #[error("key not found: {0}")]
    KeyNotFound(Key),
    /// Attribute-style miss, including classifier rejections of keys that are
    /// present in the backing store.
    #[error("no attribute '{name}': {reason}")]
    AttributeNotFound {
        /// The attribute name that failed to resolve.
        name: String,
        /// Why the name was rejected.
        reason: Rejection,
    },
    /// Write or delete on an immutable concretion, an attribute write/delete
    /// through a rejected name, or merging with a non-mapping value.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    /// Dump/load or JSON conversion failure.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl AttrError {
    /// Creates a key-not-found error for a subscript-style miss.
    #[must_use]
    pub fn key_not_found(key: Key) -> Self {
        Self::KeyNotFound(key)
    }

    /// Creates an attribute-not-found error with the rejection reason.
    #[must_use]
    pub fn attribute(name: impl Into<String>, reason: Rejection) -> Self {
        Self::AttributeNotFound {
            name: name.into(),
            reason,
        }
    }

    /// Creates a type-mismatch error.
    #[must_use]
    pub fn type_mismatch(detail: impl Into<String>) -> Self {
        Self::TypeMismatch(detail.into())
    }
}

impl From<postcard::Error> for AttrError {
    fn from(err: postcard::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for AttrError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
