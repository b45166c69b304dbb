//! Small helpers shared by the other modules.
//!
//! - [`MultiValueDict`]: a dictionary that can hold multiple values per key.
//! - [`make_name`]: joins dotted field names.
//! - [`fill_dict`]: fills missing keys of an initial-data map.

mod multi_value_dict;

use std::collections::BTreeMap;

pub use multi_value_dict::MultiValueDict;

/// Joins a parent and a child name with a dot.
///
/// ```
/// use fungiform_core::utils::make_name;
///
/// assert_eq!(make_name(None, "street"), "street");
/// assert_eq!(make_name(Some("addresses.0"), "street"), "addresses.0.street");
/// ```
pub fn make_name(parent: Option<&str>, child: &str) -> String {
    match parent {
        Some(parent) => format!("{parent}.{child}"),
        None => child.to_string(),
    }
}

/// Inserts every default whose key is not yet in `map`.
///
/// When `map` is `None` the defaults themselves are returned. This is handy
/// for prepopulating the initial data of a form.
pub fn fill_dict<V>(
    map: Option<BTreeMap<String, V>>,
    defaults: impl IntoIterator<Item = (String, V)>,
) -> BTreeMap<String, V> {
    let mut map = map.unwrap_or_default();
    for (key, value) in defaults {
        map.entry(key).or_insert(value);
    }
    map
}
