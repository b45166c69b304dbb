//! Validators run after a field converted the submitted value.
//!
//! A validator only sees values that survived conversion, and only when the
//! field considers them worth validating: empty text and null values skip
//! validation, so `Email` never complains about an optional field left
//! blank.
//!
//! Any `Fn(&ValidationContext, &Value) -> Result<(), ValidationError>`
//! closure is a validator. [`from_fn`] helps the compiler infer the closure
//! signature.
//!
//! ```
//! use fungiform_core::{ValidationError, Value};
//! use fungiform_forms::validators::{from_fn, ValidationContext, Validator};
//!
//! let no_admin = from_fn(|ctx, value| {
//!     if value.as_str() == Some("admin") {
//!         return Err(ValidationError::new(ctx.gettext("This name is reserved.")));
//!     }
//!     Ok(())
//! });
//! let ctx = ValidationContext::default();
//! assert!(no_admin.validate(&ctx, &Value::from("jane")).is_ok());
//! assert!(no_admin.validate(&ctx, &Value::from("admin")).is_err());
//! ```

use std::fmt;
use std::sync::{Arc, LazyLock};

use fungiform_core::error::ValidationError;
use fungiform_core::i18n::{interpolate, NullTranslations, Translations};
use fungiform_core::value::Value;
use fungiform_security::request::RequestInfo;
use regex::Regex;

/// What a validator may look at besides the value itself.
#[derive(Clone, Copy)]
pub struct ValidationContext<'a> {
    translations: &'a dyn Translations,
    data: Option<&'a Value>,
    request_info: Option<&'a RequestInfo>,
}

impl Default for ValidationContext<'_> {
    fn default() -> Self {
        Self::new(&NullTranslations)
    }
}

impl fmt::Debug for ValidationContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationContext")
            .field("data", &self.data)
            .field("request_info", &self.request_info)
            .finish_non_exhaustive()
    }
}

impl<'a> ValidationContext<'a> {
    pub fn new(translations: &'a dyn Translations) -> Self {
        Self {
            translations,
            data: None,
            request_info: None,
        }
    }

    /// Attaches the whole submission being validated.
    #[must_use]
    pub fn with_data(mut self, data: &'a Value) -> Self {
        self.data = Some(data);
        self
    }

    #[must_use]
    pub fn with_request_info(mut self, info: Option<&'a RequestInfo>) -> Self {
        self.request_info = info;
        self
    }

    pub fn translations(&self) -> &'a dyn Translations {
        self.translations
    }

    pub fn gettext(&self, msgid: &str) -> String {
        self.translations.gettext(msgid)
    }

    pub fn ngettext(&self, singular: &str, plural: &str, count: u64) -> String {
        self.translations.ngettext(singular, plural, count)
    }

    /// The submitted data of the whole form, when validating inside a form.
    /// Cross-field checks read sibling values from here.
    pub fn data(&self) -> Option<&'a Value> {
        self.data
    }

    pub fn request_info(&self) -> Option<&'a RequestInfo> {
        self.request_info
    }
}

/// Checks a converted value.
pub trait Validator: Send + Sync {
    fn validate(&self, ctx: &ValidationContext<'_>, value: &Value) -> Result<(), ValidationError>;
}

impl<F> Validator for F
where
    F: Fn(&ValidationContext<'_>, &Value) -> Result<(), ValidationError> + Send + Sync,
{
    fn validate(&self, ctx: &ValidationContext<'_>, value: &Value) -> Result<(), ValidationError> {
        self(ctx, value)
    }
}

/// A validator shared between field copies.
pub type SharedValidator = Arc<dyn Validator>;

/// Returns the closure unchanged, pinning its signature to the one
/// [`Validator`] expects.
pub fn from_fn<F>(f: F) -> F
where
    F: Fn(&ValidationContext<'_>, &Value) -> Result<(), ValidationError> + Send + Sync,
{
    f
}

// ── Built-in validators ──────────────────────────────────────────────────

/// Requires the text of a value to match a regular expression.
#[derive(Debug, Clone)]
pub struct RegexValidator {
    regex: Regex,
    message: String,
}

impl RegexValidator {
    /// Builds the validator. The message is translated when it is shown.
    ///
    /// # Errors
    ///
    /// Returns the regex error for an invalid pattern.
    pub fn new(pattern: &str, message: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Self::from_regex(Regex::new(pattern)?, message))
    }

    pub fn from_regex(regex: Regex, message: impl Into<String>) -> Self {
        Self {
            regex,
            message: message.into(),
        }
    }
}

impl Validator for RegexValidator {
    fn validate(&self, ctx: &ValidationContext<'_>, value: &Value) -> Result<(), ValidationError> {
        if self.regex.is_match(&value.to_text()) {
            Ok(())
        } else {
            Err(ValidationError::new(ctx.gettext(&self.message)))
        }
    }
}

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$").expect("valid regex")
});

/// Accepts plausible email addresses.
#[derive(Debug, Clone, Copy, Default)]
pub struct Email;

impl Validator for Email {
    fn validate(&self, ctx: &ValidationContext<'_>, value: &Value) -> Result<(), ValidationError> {
        let text = value.to_text();
        if text.len() <= 254 && EMAIL_RE.is_match(&text) {
            Ok(())
        } else {
            Err(ValidationError::new(ctx.gettext("Please enter a valid e-mail address.")))
        }
    }
}

/// Accepts absolute `http` and `https` URLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct Url;

impl Validator for Url {
    fn validate(&self, ctx: &ValidationContext<'_>, value: &Value) -> Result<(), ValidationError> {
        let valid = url::Url::parse(&value.to_text()).is_ok_and(|url| {
            matches!(url.scheme(), "http" | "https") && url.host_str().is_some_and(|h| !h.is_empty())
        });
        if valid {
            Ok(())
        } else {
            Err(ValidationError::new(ctx.gettext("Please enter a valid URL.")))
        }
    }
}

/// A lower bound on the number of characters of a string.
#[derive(Debug, Clone, Copy)]
pub struct MinLength(pub usize);

impl Validator for MinLength {
    fn validate(&self, ctx: &ValidationContext<'_>, value: &Value) -> Result<(), ValidationError> {
        match value.as_str() {
            Some(text) if text.chars().count() < self.0 => Err(ValidationError::new(interpolate(
                &ctx.ngettext(
                    "Please enter at least %d character.",
                    "Please enter at least %d characters.",
                    self.0 as u64,
                ),
                self.0,
            ))),
            _ => Ok(()),
        }
    }
}

/// An upper bound on the number of characters of a string.
#[derive(Debug, Clone, Copy)]
pub struct MaxLength(pub usize);

impl Validator for MaxLength {
    fn validate(&self, ctx: &ValidationContext<'_>, value: &Value) -> Result<(), ValidationError> {
        match value.as_str() {
            Some(text) if text.chars().count() > self.0 => Err(ValidationError::new(interpolate(
                &ctx.ngettext(
                    "Please enter no more than %d character.",
                    "Please enter no more than %d characters.",
                    self.0 as u64,
                ),
                self.0,
            ))),
            _ => Ok(()),
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

/// A lower bound for integers and floats.
#[derive(Debug, Clone, Copy)]
pub struct MinValue(pub f64);

impl Validator for MinValue {
    fn validate(&self, ctx: &ValidationContext<'_>, value: &Value) -> Result<(), ValidationError> {
        match numeric(value) {
            Some(n) if n < self.0 => Err(ValidationError::new(interpolate(
                &ctx.gettext("Ensure this value is greater than or equal to %s."),
                self.0,
            ))),
            _ => Ok(()),
        }
    }
}

/// An upper bound for integers and floats.
#[derive(Debug, Clone, Copy)]
pub struct MaxValue(pub f64);

impl Validator for MaxValue {
    fn validate(&self, ctx: &ValidationContext<'_>, value: &Value) -> Result<(), ValidationError> {
        match numeric(value) {
            Some(n) if n > self.0 => Err(ValidationError::new(interpolate(
                &ctx.gettext("Ensure this value is less than or equal to %s."),
                self.0,
            ))),
            _ => Ok(()),
        }
    }
}

/// Only accepts the listed values. `1` and `"1"` count as the same value.
#[derive(Debug, Clone)]
pub struct OneOf(pub Vec<Value>);

impl Validator for OneOf {
    fn validate(&self, ctx: &ValidationContext<'_>, value: &Value) -> Result<(), ValidationError> {
        if self.0.iter().any(|allowed| value.matches_choice(allowed)) {
            Ok(())
        } else {
            Err(ValidationError::new(ctx.gettext("Please enter a valid choice.")))
        }
    }
}
