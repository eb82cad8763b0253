//! The proxy's reserved-name table.
//!
//! Every public instance method of the proxy claims its name: a mapping key
//! equal to one of these stays reachable through subscript access but can
//! never be read or written as an attribute. The table is an enum with string
//! lookup so that member resolution can report *which* method shadowed a key.

use std::sync::OnceLock;

use ahash::AHashSet;
use strum::IntoEnumIterator;

/// Names bound on the proxy type itself.
///
/// The string form of each variant is its snake_case method name
/// (`GetItem` -> `"get_item"`).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum ReservedName {
    AllowInvalidAttributes,
    Attr,
    Clear,
    Contains,
    DeepClone,
    DelAttr,
    Dump,
    Get,
    GetItem,
    GetOr,
    IntoState,
    IsEmpty,
    Items,
    Keys,
    Len,
    Lookup,
    Merge,
    MergePlain,
    MergeValue,
    Policy,
    Pop,
    PopOr,
    Popitem,
    RemoveItem,
    RemoveLocalAttribute,
    ResolveMember,
    SetAllowInvalidAttributes,
    SetAttr,
    SetItem,
    SetLocalAttribute,
    Setdefault,
    State,
    ToJson,
    ToJsonValue,
    Update,
    Values,
}

/// The materialized reserved-name set, built once on first use.
pub fn reserved_names() -> &'static AHashSet<&'static str> {
    static NAMES: OnceLock<AHashSet<&'static str>> = OnceLock::new();
    NAMES.get_or_init(|| ReservedName::iter().map(Into::into).collect())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn lookup_uses_snake_case_method_names() {
        assert_eq!(ReservedName::from_str("get"), Ok(ReservedName::Get));
        assert_eq!(ReservedName::from_str("get_item"), Ok(ReservedName::GetItem));
        assert_eq!(ReservedName::from_str("deep_clone"), Ok(ReservedName::DeepClone));
        assert!(ReservedName::from_str("no_such_method").is_err());
    }

    #[test]
    fn set_contains_every_variant() {
        let names = reserved_names();
        assert_eq!(names.len(), ReservedName::iter().count());
        assert!(names.contains("setdefault"));
        assert!(names.contains("is_empty"));
    }
}
