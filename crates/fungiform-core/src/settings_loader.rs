//! Loading [`Settings`] from configuration files and the environment.
//!
//! 1. Start with the defaults.
//! 2. Merge a TOML or JSON file over them. Nested tables merge key by key.
//! 3. Apply `FUNGIFORM_*` environment variables.
//!
//! | Env Var | Setting |
//! |---|---|
//! | `FUNGIFORM_DEBUG` | `debug` |
//! | `FUNGIFORM_LOG_LEVEL` | `log_level` |
//! | `FUNGIFORM_LANGUAGE_CODE` | `language_code` |
//! | `FUNGIFORM_TIME_ZONE` | `time_zone` |
//! | `FUNGIFORM_MAX_CSRF_TOKENS` | `max_csrf_tokens` |
//! | `FUNGIFORM_ALLOWED_REDIRECT_RULES` | `allowed_redirect_rules` (comma-separated) |
//! | `FUNGIFORM_RECAPTCHA_PUBLIC_KEY` | `recaptcha_public_key` |
//! | `FUNGIFORM_RECAPTCHA_PRIVATE_KEY` | `recaptcha_private_key` |
//! | `FUNGIFORM_RECAPTCHA_USE_SSL` | `recaptcha_use_ssl` |
//! | `FUNGIFORM_DEFAULT_METHOD` | `default_method` |
//! | `FUNGIFORM_HTML_DIALECT` | `html_dialect` |
//!
//! ```rust,no_run
//! use fungiform_core::settings_loader;
//!
//! let settings = settings_loader::from_toml_file_with_env("config/forms.toml").unwrap();
//! ```

use std::path::Path;

use crate::error::{FormError, FormResult};
use crate::settings::Settings;

/// Loads settings from a TOML string.
///
/// # Errors
///
/// Returns [`FormError::ConfigurationError`] if the TOML is malformed or
/// holds values of the wrong type.
pub fn from_toml_str(toml_str: &str) -> FormResult<Settings> {
    let toml_value: toml::Value = toml::from_str(toml_str)
        .map_err(|e| FormError::ConfigurationError(format!("Failed to parse TOML: {e}")))?;
    merge_over_defaults(toml_to_json(toml_value), "TOML")
}

/// Loads settings from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or its content is invalid.
pub fn from_toml_file(path: impl AsRef<Path>) -> FormResult<Settings> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        FormError::ConfigurationError(format!("Failed to read {}: {e}", path.display()))
    })?;
    from_toml_str(&content)
}

/// [`from_toml_file`] followed by [`apply_env_overrides`].
///
/// # Errors
///
/// See [`from_toml_file`].
pub fn from_toml_file_with_env(path: impl AsRef<Path>) -> FormResult<Settings> {
    let mut settings = from_toml_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Loads settings from a JSON string.
///
/// # Errors
///
/// Returns [`FormError::ConfigurationError`] if the JSON is malformed or
/// holds values of the wrong type.
pub fn from_json_str(json_str: &str) -> FormResult<Settings> {
    let json_value: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| FormError::ConfigurationError(format!("Failed to parse JSON: {e}")))?;
    merge_over_defaults(json_value, "JSON")
}

/// Loads settings from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or its content is invalid.
pub fn from_json_file(path: impl AsRef<Path>) -> FormResult<Settings> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        FormError::ConfigurationError(format!("Failed to read {}: {e}", path.display()))
    })?;
    from_json_str(&content)
}

/// [`from_json_file`] followed by [`apply_env_overrides`].
///
/// # Errors
///
/// See [`from_json_file`].
pub fn from_json_file_with_env(path: impl AsRef<Path>) -> FormResult<Settings> {
    let mut settings = from_json_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// The defaults with environment overrides applied.
pub fn from_env() -> Settings {
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings);
    settings
}

/// Applies `FUNGIFORM_*` environment variables. Values that do not parse
/// are ignored with a warning.
pub fn apply_env_overrides(settings: &mut Settings) {
    apply_overrides_from(settings, |key| std::env::var(key).ok());
}

fn apply_overrides_from(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(val) = var("FUNGIFORM_DEBUG") {
        settings.debug = parse_flag(&val);
    }
    if let Some(val) = var("FUNGIFORM_LOG_LEVEL") {
        settings.log_level = val;
    }
    if let Some(val) = var("FUNGIFORM_LANGUAGE_CODE") {
        settings.language_code = val;
    }
    if let Some(val) = var("FUNGIFORM_TIME_ZONE") {
        settings.time_zone = val;
    }
    if let Some(val) = var("FUNGIFORM_MAX_CSRF_TOKENS") {
        match val.trim().parse() {
            Ok(max) => settings.max_csrf_tokens = max,
            Err(_) => tracing::warn!(value = %val, "ignoring invalid FUNGIFORM_MAX_CSRF_TOKENS"),
        }
    }
    if let Some(val) = var("FUNGIFORM_ALLOWED_REDIRECT_RULES") {
        settings.allowed_redirect_rules = val
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }
    if let Some(val) = var("FUNGIFORM_RECAPTCHA_PUBLIC_KEY") {
        settings.recaptcha_public_key = Some(val);
    }
    if let Some(val) = var("FUNGIFORM_RECAPTCHA_PRIVATE_KEY") {
        settings.recaptcha_private_key = Some(val);
    }
    if let Some(val) = var("FUNGIFORM_RECAPTCHA_USE_SSL") {
        settings.recaptcha_use_ssl = parse_flag(&val);
    }
    if let Some(val) = var("FUNGIFORM_DEFAULT_METHOD") {
        settings.default_method = val.to_uppercase();
    }
    if let Some(val) = var("FUNGIFORM_HTML_DIALECT") {
        match val.parse() {
            Ok(dialect) => settings.html_dialect = dialect,
            Err(e) => tracing::warn!(error = %e, "ignoring invalid FUNGIFORM_HTML_DIALECT"),
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn parse_flag(val: &str) -> bool {
    matches!(val.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

fn merge_over_defaults(value: serde_json::Value, source: &str) -> FormResult<Settings> {
    let default_json = serde_json::to_value(Settings::default()).map_err(|e| {
        FormError::ConfigurationError(format!("Failed to serialize default settings: {e}"))
    })?;
    serde_json::from_value(merge_json(default_json, value)).map_err(|e| {
        FormError::ConfigurationError(format!("Failed to deserialize settings from {source}: {e}"))
    })
}

fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::json!(i),
        toml::Value::Float(f) => serde_json::json!(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => serde_json::Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

/// Deep-merges `overlay` into `base`.
fn merge_json(base: serde_json::Value, overlay: serde_json::Value) -> serde_json::Value {
    match (base, overlay) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => merge_json(base_value, value),
                    None => value,
                };
                base_map.insert(key, merged);
            }
            serde_json::Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}
