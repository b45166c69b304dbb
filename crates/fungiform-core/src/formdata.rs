//! Flat form submissions and their decoding into nested values.
//!
//! HTML forms can only submit flat `name=value` pairs. Nested fields are
//! encoded into dotted names instead: `addresses.0.street` is the `street`
//! key of the first entry of the `addresses` list. [`decode_form_data`]
//! turns such a flat submission back into a tree of [`Value`]s.
//!
//! ```
//! use fungiform_core::formdata::{decode_form_data, FormData};
//! use fungiform_core::value::Value;
//!
//! let data = FormData::parse_urlencoded("foo.0=bar&foo.1=baz&name=John+Doe");
//! let decoded = decode_form_data(&data);
//! assert_eq!(decoded.get("foo"), Some(&Value::from(vec!["bar", "baz"])));
//! assert_eq!(decoded.get("name"), Some(&Value::from("John Doe")));
//! ```

use std::collections::BTreeMap;

use crate::utils::MultiValueDict;
use crate::value::Value;

/// A flat, multi-valued form submission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormData {
    data: MultiValueDict<String, Value>,
}

impl FormData {
    /// Creates an empty submission.
    pub const fn new() -> Self {
        Self {
            data: MultiValueDict::new(),
        }
    }

    /// Parses an `application/x-www-form-urlencoded` body or query string.
    pub fn parse_urlencoded(input: &str) -> Self {
        let mut data = Self::new();
        for pair in input.split('&') {
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair
                .find('=')
                .map_or((pair, ""), |eq_pos| (&pair[..eq_pos], &pair[eq_pos + 1..]));
            data.append(percent_decode(key), percent_decode(value));
        }
        data
    }

    /// Adds a value for `key`. List values contribute each of their items.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        match value.into() {
            Value::List(items) => {
                for item in items {
                    self.data.append(key.clone(), item);
                }
            }
            other => self.data.append(key, other),
        }
    }

    /// Replaces all values of `key`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        self.data.remove(key.as_str());
        self.append(key, value);
    }

    /// Returns the last value submitted for `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Returns all values submitted for `key`.
    pub fn get_list(&self, key: &str) -> Option<&[Value]> {
        self.data.get_list(key)
    }

    /// Returns `true` if nothing was submitted.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterates over `(key, values)` pairs in key order.
    pub fn lists(&self) -> impl Iterator<Item = (&String, &Vec<Value>)> {
        self.data.lists()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for FormData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut data = Self::new();
        for (key, value) in iter {
            data.append(key, value);
        }
        data
    }
}

impl From<MultiValueDict<String, String>> for FormData {
    fn from(dict: MultiValueDict<String, String>) -> Self {
        let mut data = Self::new();
        for (key, values) in dict {
            for value in values {
                data.append(key.clone(), value);
            }
        }
        data
    }
}

impl From<BTreeMap<String, Value>> for FormData {
    fn from(map: BTreeMap<String, Value>) -> Self {
        map.into_iter().collect()
    }
}

fn percent_decode(input: &str) -> String {
    let plus_decoded = input.replace('+', " ");
    percent_encoding::percent_decode_str(&plus_decoded)
        .decode_utf8_lossy()
        .into_owned()
}

/// One segment of a dotted key. Indexes sort before names.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum KeyPart {
    Index(u64),
    Name(String),
}

impl KeyPart {
    fn parse(part: &str) -> Self {
        if !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(index) = part.parse() {
                return Self::Index(index);
            }
        }
        Self::Name(part.to_string())
    }

    fn into_key(self) -> String {
        match self {
            Self::Index(index) => index.to_string(),
            Self::Name(name) => name,
        }
    }
}

#[derive(Debug, Default)]
struct Node {
    values: Option<Vec<Value>>,
    is_list: bool,
    children: BTreeMap<KeyPart, Node>,
}

impl Node {
    fn into_value(self) -> Value {
        let Self {
            values,
            is_list,
            children,
        } = self;
        match values {
            Some(mut values) if is_list => {
                values.extend(children.into_values().map(Self::into_value));
                Value::List(values)
            }
            Some(mut values) if values.len() == 1 => values.pop().unwrap_or_default(),
            Some(values) => Value::List(values),
            None if is_list => Value::List(children.into_values().map(Self::into_value).collect()),
            None => Value::Map(
                children
                    .into_iter()
                    .map(|(key, node)| (key.into_key(), node.into_value()))
                    .collect(),
            ),
        }
    }
}

/// Decodes a flat submission into a nested structure.
///
/// - Keys are split on dots. All-digit parts are list indexes, everything
///   else is a mapping key.
/// - Lists are ordered by index and gaps are dropped, so `foo.42` and `foo.82`
///   decode into a two element list. Client side code can insert and delete
///   rows without renumbering.
/// - A key with a single value decodes to that value. Several values stay a
///   list.
/// - A key with direct values and indexed children decodes to the direct
///   values followed by the children.
///
/// The result is a [`Value::Map`] unless the submission itself only consists
/// of indexed keys. Invalid input never fails but the shape of the result is
/// unspecified for it.
pub fn decode_form_data(data: &FormData) -> Value {
    let mut root = Node::default();

    for (key, values) in data.lists() {
        if key.is_empty() {
            continue;
        }
        let mut container = &mut root;
        for part in key.split('.').map(KeyPart::parse) {
            container.is_list = matches!(part, KeyPart::Index(_));
            container = container.children.entry(part).or_default();
        }
        container.values = Some(values.clone());
    }

    root.into_value()
}

/// Converts already nested JSON data, such as a decoded JSON request body.
pub fn decode_json(data: serde_json::Value) -> Value {
    Value::from(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_map;

    fn decode<const N: usize>(pairs: [(&str, Value); N]) -> Value {
        let data: FormData = pairs.into_iter().collect();
        decode_form_data(&data)
    }

    #[test]
    fn test_plain_key() {
        assert_eq!(decode([("foo", "bar".into())]), value_map! { "foo" => "bar" });
    }

    #[test]
    fn test_indexed_keys_become_list() {
        let v = decode([("foo.0", "bar".into()), ("foo.1", "baz".into())]);
        assert_eq!(v, value_map! { "foo" => vec!["bar", "baz"] });
    }

    #[test]
    fn test_nested_mapping() {
        let v = decode([("foo.bar", "1".into()), ("foo.baz", "2".into())]);
        assert_eq!(v, value_map! { "foo" => value_map! { "bar" => "1", "baz" => "2" } });
    }

    #[test]
    fn test_list_in_mapping() {
        let v = decode([("foo.bar.0", "baz".into()), ("foo.bar.1", "buzz".into())]);
        assert_eq!(
            v,
            value_map! { "foo" => value_map! { "bar" => vec!["baz", "buzz"] } }
        );
    }

    #[test]
    fn test_mappings_in_list() {
        let v = decode([("foo.0.bar", "23".into()), ("foo.1.baz", "42".into())]);
        assert_eq!(
            v,
            value_map! { "foo" => vec![value_map! { "bar" => "23" }, value_map! { "baz" => "42" }] }
        );
    }

    #[test]
    fn test_list_in_list() {
        let v = decode([("foo.0.0", "23".into()), ("foo.0.1", "42".into())]);
        assert_eq!(
            v,
            value_map! { "foo" => Value::List(vec![Value::from(vec!["23", "42"])]) }
        );
    }

    #[test]
    fn test_missing_indexes_are_compacted() {
        let v = decode([("foo.42", "a".into()), ("foo.82", "b".into())]);
        assert_eq!(v, value_map! { "foo" => vec!["a", "b"] });
    }

    #[test]
    fn test_indexes_sort_numerically() {
        let v = decode([
            ("ints.0", "42".into()),
            ("ints.1", "125".into()),
            ("ints.55", "23".into()),
            ("ints.9", "7".into()),
        ]);
        assert_eq!(v, value_map! { "ints" => vec!["42", "125", "7", "23"] });
    }

    #[test]
    fn test_decode_list_in_dict() {
        let v = decode([
            ("a_list", Value::from(vec!["foo", "bar"])),
            ("a_list.42", "baz".into()),
            ("a_list.23", "meh".into()),
        ]);
        assert_eq!(
            v.get("a_list"),
            Some(&Value::from(vec!["foo", "bar", "meh", "baz"]))
        );
    }

    #[test]
    fn test_multidict_values() {
        let mut dict = MultiValueDict::new();
        for value in ["value1", "value2", "value3"] {
            dict.append("key1".to_string(), value.to_string());
        }
        dict.append("key2".to_string(), "awesome".to_string());

        let v = decode_form_data(&FormData::from(dict));
        assert_eq!(
            v.get("key1"),
            Some(&Value::from(vec!["value1", "value2", "value3"]))
        );
        assert_eq!(v.get("key2"), Some(&Value::from("awesome")));
    }

    #[test]
    fn test_direct_values_combined_with_indexes() {
        let v = decode([
            ("foo", Value::from(vec!["1"])),
            ("foo.0", "2".into()),
            ("foo.1", "3".into()),
        ]);
        assert_eq!(v, value_map! { "foo" => vec!["1", "2", "3"] });
    }

    #[test]
    fn test_empty_keys_are_ignored() {
        let v = decode([("", "x".into()), ("a", "b".into())]);
        assert_eq!(v, value_map! { "a" => "b" });
    }

    #[test]
    fn test_parse_urlencoded() {
        let data = FormData::parse_urlencoded("a=1&a=2&b=hello%20world&c=x+y&d&&");
        assert_eq!(
            data.get_list("a"),
            Some(&[Value::from("1"), Value::from("2")][..])
        );
        assert_eq!(data.get("b"), Some(&Value::from("hello world")));
        assert_eq!(data.get("c"), Some(&Value::from("x y")));
        assert_eq!(data.get("d"), Some(&Value::from("")));
    }

    #[test]
    fn test_decode_json_keeps_nesting() {
        let v = decode_json(serde_json::json!({"foo": [{"bar": "23"}]}));
        assert_eq!(
            v,
            value_map! { "foo" => vec![value_map! { "bar" => "23" }] }
        );
    }

    #[test]
    fn test_set_replaces() {
        let mut data = FormData::new();
        data.append("a", "1");
        data.append("a", "2");
        data.set("a", "3");
        assert_eq!(data.get_list("a"), Some(&[Value::from("3")][..]));
        assert!(!data.is_empty());
    }
}
