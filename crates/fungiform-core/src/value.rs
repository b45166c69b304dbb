//! Dynamic values flowing through form validation.
//!
//! Submitted data starts out as strings, possibly nested into lists and maps
//! by [`decode_form_data`](crate::formdata::decode_form_data). Fields convert
//! those strings into typed values. [`Value`] covers both ends of that
//! pipeline.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

/// A dynamically typed form value.
///
/// # Examples
///
/// ```
/// use fungiform_core::value::Value;
///
/// let v = Value::from(42);
/// assert_eq!(v, Value::Int(42));
/// assert_eq!(v.to_text(), "42");
///
/// assert!(!Value::from("").is_truthy());
/// assert_eq!(Value::from(true).to_text(), "True");
/// ```
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// No value.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// A 64-bit signed integer.
    Int(i64),
    /// A 64-bit floating-point number.
    Float(f64),
    /// A string.
    String(String),
    /// A calendar date.
    Date(NaiveDate),
    /// A naive date and time, in UTC by convention.
    DateTime(NaiveDateTime),
    /// An ordered list of values.
    List(Vec<Value>),
    /// A mapping of names to values.
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Returns `true` for the null value.
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Truthiness as used by the form fields: null, `false`, zero, the empty
    /// string and empty containers are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::String(s) => !s.is_empty(),
            Self::Date(_) | Self::DateTime(_) => true,
            Self::List(items) => !items.is_empty(),
            Self::Map(map) => !map.is_empty(),
        }
    }

    /// Returns the string slice if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer if this is an integer value.
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the boolean if this is a boolean value.
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the list items if this is a list value.
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the map if this is a map value.
    pub const fn as_map(&self) -> Option<&BTreeMap<String, Self>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Looks up a key in a map value. Anything else yields `None`.
    pub fn get(&self, key: &str) -> Option<&Self> {
        self.as_map().and_then(|map| map.get(key))
    }

    /// The textual form of the value. Null becomes the empty string.
    pub fn to_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// Turns the value into a list. Null becomes an empty list, a list is
    /// returned as is and everything else (strings included) is wrapped.
    pub fn force_list(&self) -> Vec<Self> {
        match self {
            Self::Null => Vec::new(),
            Self::List(items) => items.clone(),
            other => vec![other.clone()],
        }
    }

    /// Like [`force_list`](Self::force_list) but map values contribute their
    /// keys instead of being wrapped.
    pub fn to_list(&self) -> Vec<Self> {
        match self {
            Self::Map(map) => map.keys().cloned().map(Self::String).collect(),
            other => other.force_list(),
        }
    }

    /// Returns the map of a map value or an empty map for anything else.
    pub fn force_dict(&self) -> BTreeMap<String, Self> {
        match self {
            Self::Map(map) => map.clone(),
            _ => BTreeMap::new(),
        }
    }

    /// Checks if a value matches a choice: either they are equal or their
    /// textual forms are, so `1` matches `"1"`.
    pub fn matches_choice(&self, choice: &Self) -> bool {
        self == choice || self.to_text() == choice.to_text()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "None"),
            Self::Bool(true) => write!(f, "True"),
            Self::Bool(false) => write!(f, "False"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{v:.1}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Self::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

// ── From implementations ───────────────────────────────────────────────

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Self::DateTime(v)
    }
}

impl<T: Into<Self>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, Self>> for Value {
    fn from(v: BTreeMap<String, Self>) -> Self {
        Self::Map(v)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map_or_else(|| Self::Float(n.as_f64().unwrap_or_default()), Self::Int),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

/// Builds a [`Value::Map`] from `key => value` pairs.
///
/// ```
/// use fungiform_core::{value_map, value::Value};
///
/// let v = value_map! { "name" => "John", "age" => 42 };
/// assert_eq!(v.get("age"), Some(&Value::Int(42)));
/// ```
#[macro_export]
macro_rules! value_map {
    () => {
        $crate::value::Value::Map(::std::collections::BTreeMap::new())
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = ::std::collections::BTreeMap::new();
        $(
            map.insert(::std::string::String::from($key), $crate::value::Value::from($value));
        )+
        $crate::value::Value::Map(map)
    }};
}
