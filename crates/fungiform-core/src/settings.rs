//! Library-wide settings.
//!
//! [`Settings`] holds the defaults every form starts out with: CSRF and
//! captcha protection, redirect tracking, the HTML dialect and the formats
//! used for lenient date parsing. Applications configure them once through
//! the global [`SETTINGS`] and individual forms may override them.

use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::dates::{self, DATE_FORMATS, TIME_FORMATS};
use crate::error::{FormError, FormResult};
use crate::html::Dialect;

/// Default number of CSRF tokens kept per session.
pub const MAX_CSRF_TOKENS: usize = 4;

/// The fungiform settings.
///
/// Every field has a default, so configuration files only need to list
/// what they change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // ── Core ──────────────────────────────────────────────────────────
    /// Enables human readable log output.
    pub debug: bool,
    /// An `EnvFilter` directive such as `info` or `fungiform=debug`.
    pub log_level: String,
    /// The language forms are translated into by default.
    pub language_code: String,
    /// `UTC` or a fixed offset like `+01:00`, used to read and display
    /// datetimes.
    pub time_zone: String,

    // ── Protection ────────────────────────────────────────────────────
    pub max_csrf_tokens: usize,
    /// `None` protects forms that know their request.
    pub csrf_protected: Option<bool>,
    pub redirect_tracking: bool,
    /// Host patterns (`*.example.com`) that redirects may point to.
    pub allowed_redirect_rules: Vec<String>,
    pub captcha_protected: bool,

    // ── Rendering ─────────────────────────────────────────────────────
    pub default_method: String,
    pub html_dialect: Dialect,

    // ── reCAPTCHA ─────────────────────────────────────────────────────
    pub recaptcha_public_key: Option<String>,
    pub recaptcha_private_key: Option<String>,
    pub recaptcha_use_ssl: bool,
    pub recaptcha_verify_timeout_secs: u64,

    // ── Dates ─────────────────────────────────────────────────────────
    /// Date formats accepted after the ISO format.
    pub date_formats: Vec<String>,
    /// Time formats accepted on their own and combined with a date.
    pub time_formats: Vec<String>,

    /// Application specific values.
    pub extra: HashMap<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            log_level: "info".to_string(),
            language_code: "en".to_string(),
            time_zone: "UTC".to_string(),
            max_csrf_tokens: MAX_CSRF_TOKENS,
            csrf_protected: None,
            redirect_tracking: true,
            allowed_redirect_rules: Vec::new(),
            captcha_protected: false,
            default_method: "POST".to_string(),
            html_dialect: Dialect::Html,
            recaptcha_public_key: None,
            recaptcha_private_key: None,
            recaptcha_use_ssl: false,
            recaptcha_verify_timeout_secs: 10,
            date_formats: DATE_FORMATS.iter().map(ToString::to_string).collect(),
            time_formats: TIME_FORMATS.iter().map(ToString::to_string).collect(),
            extra: HashMap::new(),
        }
    }
}

impl Settings {
    /// Parses [`time_zone`](Self::time_zone).
    ///
    /// # Errors
    ///
    /// Returns [`FormError::ConfigurationError`] for anything but `UTC` or a
    /// fixed offset.
    pub fn timezone(&self) -> FormResult<FixedOffset> {
        dates::parse_offset(&self.time_zone).map_err(|_| {
            FormError::ConfigurationError(format!("Unsupported time zone '{}'", self.time_zone))
        })
    }

    /// Checks values that serde cannot validate on its own.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::ConfigurationError`] describing the first
    /// problem found.
    pub fn validate(&self) -> FormResult<()> {
        self.timezone()?;
        if self.max_csrf_tokens == 0 {
            return Err(FormError::ConfigurationError(
                "max_csrf_tokens must be at least 1".to_string(),
            ));
        }
        if self.captcha_protected
            && (self.recaptcha_public_key.is_none() || self.recaptcha_private_key.is_none())
        {
            return Err(FormError::ConfigurationError(
                "captcha protection requires both recaptcha keys".to_string(),
            ));
        }
        Ok(())
    }
}

/// A lazily-initialized, globally-accessible settings container.
///
/// # Panics
///
/// [`get`](LazySettings::get) panics if settings have not been configured.
/// [`configure`](LazySettings::configure) panics if called more than once.
pub struct LazySettings {
    inner: OnceLock<Settings>,
}

impl Default for LazySettings {
    fn default() -> Self {
        Self::new()
    }
}

impl LazySettings {
    pub const fn new() -> Self {
        Self {
            inner: OnceLock::new(),
        }
    }

    /// Configures the settings. Must be called exactly once.
    ///
    /// # Panics
    ///
    /// Panics if settings have already been configured.
    pub fn configure(&self, settings: Settings) {
        assert!(
            self.inner.set(settings).is_ok(),
            "Settings have already been configured"
        );
    }

    /// Returns the configured settings.
    ///
    /// # Panics
    ///
    /// Panics if settings have not been configured.
    pub fn get(&self) -> &Settings {
        self.inner
            .get()
            .expect("Settings have not been configured. Call SETTINGS.configure() first.")
    }

    /// Returns the configured settings, if any.
    pub fn try_get(&self) -> Option<&Settings> {
        self.inner.get()
    }

    pub fn is_configured(&self) -> bool {
        self.inner.get().is_some()
    }
}

/// The global settings.
pub static SETTINGS: LazySettings = LazySettings::new();
