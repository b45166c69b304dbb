//! Translation of form messages.
//!
//! Every message a form shows (error messages, button labels, captcha
//! texts) goes through a [`Translations`] object. The default,
//! [`ActiveTranslations`], follows the language activated on the current
//! thread and looks messages up in the global [`catalog`].
//!
//! ```
//! use fungiform_core::i18n::{self, ActiveTranslations, Translations};
//!
//! i18n::catalog::register_translations("nl", vec![("Submit", "Verzenden")]);
//! i18n::activate("nl");
//! assert_eq!(ActiveTranslations.gettext("Submit"), "Verzenden");
//! i18n::deactivate();
//! assert_eq!(ActiveTranslations.gettext("Submit"), "Submit");
//! ```

pub mod catalog;

use std::cell::RefCell;
use std::fmt;

/// The language used when none was activated.
pub const DEFAULT_LANGUAGE: &str = "en";

// ── Thread-local language state ──────────────────────────────────────────

thread_local! {
    static CURRENT_LANGUAGE: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Activates a language for the current thread.
pub fn activate(language_code: &str) {
    CURRENT_LANGUAGE.with(|cell| {
        *cell.borrow_mut() = Some(language_code.to_string());
    });
}

/// Reverts the current thread to [`DEFAULT_LANGUAGE`].
pub fn deactivate() {
    CURRENT_LANGUAGE.with(|cell| {
        *cell.borrow_mut() = None;
    });
}

pub fn get_language() -> String {
    CURRENT_LANGUAGE.with(|cell| {
        cell.borrow()
            .clone()
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string())
    })
}

/// Translates a message into the active language, falling back to `msgid`.
pub fn gettext(msgid: &str) -> String {
    catalog::translate(&get_language(), msgid).unwrap_or_else(|| msgid.to_string())
}

/// Plural aware [`gettext`].
pub fn ngettext(singular: &str, plural: &str, count: u64) -> String {
    catalog::translate_plural(&get_language(), singular, plural, count)
        .unwrap_or_else(|| untranslated_plural(singular, plural, count))
}

fn untranslated_plural(singular: &str, plural: &str, count: u64) -> String {
    if count == 1 { singular } else { plural }.to_string()
}

/// Replaces the first `%d` or `%s` placeholder of a translated message.
///
/// ```
/// use fungiform_core::i18n::interpolate;
///
/// assert_eq!(
///     interpolate("Please enter at least %d character(s).", 3),
///     "Please enter at least 3 character(s)."
/// );
/// assert_eq!(interpolate("\"%s\" is not a valid choice", "x"), "\"x\" is not a valid choice");
/// assert_eq!(interpolate("No placeholder", 1), "No placeholder");
/// ```
pub fn interpolate(template: &str, value: impl fmt::Display) -> String {
    let position = match (template.find("%d"), template.find("%s")) {
        (Some(d), Some(s)) => Some(d.min(s)),
        (d, s) => d.or(s),
    };
    position.map_or_else(
        || template.to_string(),
        |pos| format!("{}{value}{}", &template[..pos], &template[pos + 2..]),
    )
}

// ── Translation objects ──────────────────────────────────────────────────

/// A source of translated messages.
///
/// Forms hold one of these and pass it down to fields and validators, so
/// applications can plug in their own translation system.
pub trait Translations: Send + Sync {
    fn gettext(&self, msgid: &str) -> String;

    fn ngettext(&self, singular: &str, plural: &str, count: u64) -> String;
}

/// Returns every message untranslated.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTranslations;

impl Translations for NullTranslations {
    fn gettext(&self, msgid: &str) -> String {
        msgid.to_string()
    }

    fn ngettext(&self, singular: &str, plural: &str, count: u64) -> String {
        untranslated_plural(singular, plural, count)
    }
}

/// Translates into whatever language is active on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActiveTranslations;

impl Translations for ActiveTranslations {
    fn gettext(&self, msgid: &str) -> String {
        gettext(msgid)
    }

    fn ngettext(&self, singular: &str, plural: &str, count: u64) -> String {
        ngettext(singular, plural, count)
    }
}

/// Translates into a fixed language regardless of the thread state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogTranslations {
    language: String,
}

impl CatalogTranslations {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }
}

impl Translations for CatalogTranslations {
    fn gettext(&self, msgid: &str) -> String {
        catalog::translate(&self.language, msgid).unwrap_or_else(|| msgid.to_string())
    }

    fn ngettext(&self, singular: &str, plural: &str, count: u64) -> String {
        catalog::translate_plural(&self.language, singular, plural, count)
            .unwrap_or_else(|| untranslated_plural(singular, plural, count))
    }
}
