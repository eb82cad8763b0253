//! Construction macros.

/// Builds an [`AttrMap`](crate::AttrMap) literal.
///
/// ```
/// use attrmap::{attr_map, Value};
///
/// let m = attr_map! {
///     "name" => "carol",
///     "scores" => Value::list([1, 2, 3]),
///     "nested" => attr_map! { "deep" => true },
/// };
/// assert_eq!(m.attr("name").unwrap(), Value::from("carol"));
/// ```
#[macro_export]
macro_rules! attr_map {
    () => {
        $crate::AttrMap::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::AttrMap::new();
        $(
            map.set_item($key, $value).expect("ordered maps are mutable");
        )+
        map
    }};
}
