//! Core error types for fungiform.
//!
//! Two kinds of failure exist. A [`ValidationError`] is the expected outcome of
//! bad user input and ends up rendered next to a form field. A [`FormError`]
//! means the form was used in a way the current setup cannot support (no
//! session for CSRF tokens, an unreachable captcha service, broken
//! configuration files and so on).

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::utils::make_name;

/// Errors keyed by the dotted field name. The `None` key holds form-level
/// errors that do not belong to a single field.
pub type ErrorMap = BTreeMap<Option<String>, Vec<String>>;

/// A validation failure raised while cleaning a value.
///
/// Leaf fields raise [`ValidationError::Messages`]. Container fields (mappings
/// and lists) collect the errors of their children into
/// [`ValidationError::Multiple`], keyed by the child name or list index.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use fungiform_core::error::ValidationError;
///
/// let mut children = BTreeMap::new();
/// children.insert("age".to_string(), ValidationError::new("Please enter a whole number."));
/// let err = ValidationError::multiple(children);
///
/// let unpacked = err.unpack(Some("person"));
/// assert_eq!(
///     unpacked.get(&Some("person.age".to_string())).unwrap(),
///     &vec!["Please enter a whole number.".to_string()]
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// One or more messages for a single value.
    Messages(Vec<String>),
    /// Errors of child values, keyed by child name or index.
    Multiple(BTreeMap<String, ValidationError>),
}

impl ValidationError {
    /// Creates a validation error with a single message.
    pub fn new(message: impl Into<String>) -> Self {
        Self::Messages(vec![message.into()])
    }

    /// Creates a validation error carrying several messages.
    pub fn with_messages<I, S>(messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Messages(messages.into_iter().map(Into::into).collect())
    }

    /// Creates a container error from child errors.
    pub fn multiple(errors: BTreeMap<String, Self>) -> Self {
        Self::Multiple(errors)
    }

    /// Returns the direct messages of this error. Container errors have none.
    pub fn messages(&self) -> &[String] {
        match self {
            Self::Messages(messages) => messages,
            Self::Multiple(_) => &[],
        }
    }

    /// Flattens the error tree into an [`ErrorMap`].
    ///
    /// Child keys are joined to `key` with [`make_name`], so an error on the
    /// `street` field of the third address ends up under `addresses.2.street`.
    pub fn unpack(&self, key: Option<&str>) -> ErrorMap {
        let mut result = ErrorMap::new();
        self.unpack_into(key, &mut result);
        result
    }

    fn unpack_into(&self, key: Option<&str>, into: &mut ErrorMap) {
        match self {
            Self::Messages(messages) => {
                into.entry(key.map(str::to_string))
                    .or_default()
                    .extend(messages.iter().cloned());
            }
            Self::Multiple(children) => {
                for (name, error) in children {
                    let child = make_name(key, name);
                    error.unpack_into(Some(&child), into);
                }
            }
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Messages(messages) => {
                write!(f, "{}", messages.first().map_or("", String::as_str))
            }
            Self::Multiple(children) => {
                let mut first = true;
                for error in children.values() {
                    if !first {
                        write!(f, ", ")?;
                    }
                    write!(f, "{error}")?;
                    first = false;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<&str> for ValidationError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for ValidationError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// The error type for everything in fungiform that is not a validation failure.
#[derive(Error, Debug)]
pub enum FormError {
    // ── Configuration ────────────────────────────────────────────────

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The form is missing an integration it needs.
    #[error("Improperly configured: {0}")]
    ImproperlyConfigured(String),

    // ── Usage ────────────────────────────────────────────────────────

    /// The requested operation is not available for this form.
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// A URL could not be parsed or joined.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    // ── Captcha ──────────────────────────────────────────────────────

    /// The captcha service rejected the configured keys or referrer.
    #[error("Captcha misconfigured: {0}")]
    CaptchaMisconfigured(String),

    /// The captcha service could not be reached.
    #[error("Captcha transport error: {0}")]
    CaptchaTransport(String),

    // ── Serialization ────────────────────────────────────────────────

    /// Data could not be serialized or deserialized.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // ── IO ───────────────────────────────────────────────────────────

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A convenience type alias for `Result<T, FormError>`.
pub type FormResult<T> = Result<T, FormError>;
