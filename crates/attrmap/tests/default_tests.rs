//! The default-value variant: factory matrix, store-on-miss behavior, and
//! the accessors that must never manufacture values.

use attrmap::{
    AttrDefault, AttrError, AttrMap, DefaultFactory, FrozenStore, OrderedStore, Rejection,
    SequencePolicy, Value, attr_map,
};
use pretty_assertions::assert_eq;

#[test]
fn without_a_factory_misses_fail_like_the_core() {
    let none: AttrDefault = AttrDefault::new(None);

    assert!(matches!(
        none.attr("foo"),
        Err(AttrError::AttributeNotFound {
            reason: Rejection::Missing,
            ..
        })
    ));
    assert!(matches!(none.get_item("foo"), Err(AttrError::KeyNotFound(_))));
    assert_eq!(none, AttrMap::new());
}

#[test]
fn a_no_arg_factory_fills_misses_and_stores_the_result() {
    let defaults: AttrDefault = AttrDefault::with_policy(
        Some(DefaultFactory::call(|| Value::List(Vec::new()))),
        SequencePolicy::Raw,
    );

    assert_eq!(defaults.attr("foo").unwrap(), Value::List(Vec::new()));
    assert_eq!(defaults.get_item("bar").unwrap(), Value::List(Vec::new()));

    // both misses are now stored entries
    assert!(defaults.contains("foo"));
    assert!(defaults.contains("bar"));
    assert_eq!(
        defaults,
        attr_map! { "foo" => Value::List(Vec::new()), "bar" => Value::List(Vec::new()) }
    );
}

#[test]
fn a_key_factory_receives_the_missing_key() {
    let doubled: AttrDefault = AttrDefault::new(Some(DefaultFactory::call_with_key(|key| {
        Value::Str(format!("{key}{key}"))
    })));

    assert_eq!(doubled.attr("foo").unwrap(), Value::from("foofoo"));
    assert_eq!(doubled.get_item("bar").unwrap(), Value::from("barbar"));
    assert_eq!(doubled, attr_map! { "foo" => "foofoo", "bar" => "barbar" });

    // integer keys reach the factory through subscript access
    assert_eq!(doubled.get_item(7).unwrap(), Value::from("77"));
}

#[test]
fn fixed_value_defaults_never_alias_each_other() {
    let defaults: AttrDefault = AttrDefault::new(Some(DefaultFactory::value(attr_map! {})));

    let mut first = defaults.get_item("a").unwrap().into_map().unwrap();
    first.set_item("x", 1).unwrap();

    // the second miss gets a fresh copy, not the mutated one
    assert_eq!(defaults.get_item("b").unwrap(), Value::from(attr_map! {}));
    assert_eq!(defaults.get_item("a").unwrap(), Value::from(attr_map! { "x" => 1 }));
}

#[test]
fn lookup_and_get_never_trigger_the_factory() {
    let defaults: AttrDefault = AttrDefault::new(Some(DefaultFactory::value(0)));

    assert!(defaults.get("missing").is_none());
    assert_eq!(defaults.get_or("missing", "fallback"), Value::from("fallback"));
    assert!(matches!(
        defaults.lookup("missing"),
        Err(AttrError::AttributeNotFound { .. })
    ));
    assert!(!defaults.contains("missing"));
    assert!(defaults.is_empty());
}

#[test]
fn rejected_attribute_names_never_trigger_the_factory() {
    let defaults: AttrDefault = AttrDefault::new(Some(DefaultFactory::value(0)));

    assert!(matches!(
        defaults.attr("_hidden"),
        Err(AttrError::AttributeNotFound {
            reason: Rejection::Hidden,
            ..
        })
    ));
    assert!(matches!(
        defaults.attr("get"),
        Err(AttrError::AttributeNotFound {
            reason: Rejection::Reserved,
            ..
        })
    ));
    assert!(defaults.is_empty());
}

#[test]
fn explicit_writes_and_reads_behave_like_the_core() {
    let mut defaults: AttrDefault =
        AttrDefault::from_pairs(Some(DefaultFactory::value(0)), [("foo", Value::from("bar"))]);

    assert_eq!(defaults.attr("foo").unwrap(), Value::from("bar"));
    defaults.set_attr("foo", "manchu").unwrap();
    assert_eq!(defaults.get_item("foo").unwrap(), Value::from("manchu"));

    defaults.set_item("_hidden", true).unwrap();
    assert!(defaults.attr("_hidden").is_err());

    assert_eq!(defaults.pop("foo").unwrap(), Value::from("manchu"));
    assert!(!defaults.contains("foo"));
    // and a subsequent subscript read manufactures a fresh default
    assert_eq!(defaults.get_item("foo").unwrap(), Value::from(0));
}

#[test]
fn nested_proxies_produced_by_wrapping_stay_plain() {
    let defaults: AttrDefault =
        AttrDefault::from_pairs(Some(DefaultFactory::value(0)), [("sub", attr_map! { "a" => 1 })]);

    let nested = defaults.attr("sub").unwrap().into_map().unwrap();
    // the nested value is a plain proxy: no factory, misses fail
    assert!(nested.attr("missing").is_err());
    assert_eq!(nested.attr("a").unwrap(), Value::from(1));
}

#[test]
fn merge_keeps_the_left_factory() {
    let defaults: AttrDefault =
        AttrDefault::from_pairs(Some(DefaultFactory::value(0)), [("foo", Value::from(1))]);
    let other: AttrDefault = AttrDefault::from_pairs(None, [("bar", Value::from(2))]);

    let combined = defaults.merge(&other);
    assert_eq!(combined, attr_map! { "foo" => 1, "bar" => 2 });
    assert_eq!(combined.get_item("fresh").unwrap(), Value::from(0));

    let plain = defaults.merge_plain(&OrderedStore::default());
    assert_eq!(plain, attr_map! { "foo" => 1 });
    assert!(plain.factory().is_some());
}

#[test]
fn immutable_stores_refuse_the_implicit_factory_write() {
    let frozen: AttrDefault<FrozenStore> = AttrDefault::new(Some(DefaultFactory::value(0)));

    assert!(matches!(frozen.get_item("x"), Err(AttrError::TypeMismatch(_))));
    assert!(matches!(frozen.attr("x"), Err(AttrError::TypeMismatch(_))));
    assert!(frozen.is_empty());
}

#[test]
fn reprs_show_factory_pass_key_and_contents() {
    let none: AttrDefault = AttrDefault::new(None);
    assert_eq!(none.to_string(), "AttrDefault(None, False, {})");

    let fixed: AttrDefault = AttrDefault::new(Some(DefaultFactory::value(0)));
    assert_eq!(fixed.to_string(), "AttrDefault(0, False, {})");

    let keyed: AttrDefault = AttrDefault::from_pairs(
        Some(DefaultFactory::call_with_key(|key| Value::Str(key.to_string()))),
        [("foo", Value::from("bar"))],
    );
    assert_eq!(keyed.to_string(), "AttrDefault(<factory>, True, {'foo': 'bar'})");
}

#[test]
fn replace_factory_swaps_behavior() {
    let mut defaults: AttrDefault = AttrDefault::new(Some(DefaultFactory::value(0)));
    assert_eq!(defaults.get_item("a").unwrap(), Value::from(0));

    let previous = defaults.replace_factory(None);
    assert!(previous.is_some());
    assert!(matches!(defaults.get_item("b"), Err(AttrError::KeyNotFound(_))));

    defaults.replace_factory(Some(DefaultFactory::call(|| Value::from("made"))));
    assert_eq!(defaults.get_item("b").unwrap(), Value::from("made"));
}
