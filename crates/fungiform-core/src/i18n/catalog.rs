//! A global registry of message catalogs.
//!
//! Catalogs are keyed by language code and can be filled programmatically
//! or from JSON:
//!
//! ```json
//! {
//!   "messages": { "This field is required.": "Dieses Feld ist erforderlich." },
//!   "plurals": {
//!     "Please provide at least %d item.": {
//!       "singular": "Bitte mindestens %d Eintrag angeben.",
//!       "plural": "Bitte mindestens %d Einträge angeben."
//!     }
//!   }
//! }
//! ```
//!
//! Plural entries are keyed by the singular message id.

use std::collections::HashMap;
use std::sync::{OnceLock, PoisonError, RwLock};

use serde::Deserialize;

use crate::error::{FormError, FormResult};

/// Translations for a single language.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TranslationCatalog {
    messages: HashMap<String, String>,
    plurals: HashMap<String, PluralForms>,
}

#[derive(Debug, Clone, Deserialize)]
struct PluralForms {
    singular: String,
    plural: String,
}

impl TranslationCatalog {
    fn merge(&mut self, other: Self) {
        self.messages.extend(other.messages);
        self.plurals.extend(other.plurals);
    }
}

fn global_catalogs() -> &'static RwLock<HashMap<String, TranslationCatalog>> {
    static CATALOGS: OnceLock<RwLock<HashMap<String, TranslationCatalog>>> = OnceLock::new();
    CATALOGS.get_or_init(|| RwLock::new(HashMap::new()))
}

// Poisoned locks are used as is.
fn with_catalog<F, R>(language: &str, f: F) -> Option<R>
where
    F: FnOnce(&TranslationCatalog) -> Option<R>,
{
    let catalogs = global_catalogs()
        .read()
        .unwrap_or_else(PoisonError::into_inner);
    catalogs.get(language).and_then(f)
}

#[allow(clippy::significant_drop_tightening)]
fn with_catalog_mut<F>(language: &str, f: F)
where
    F: FnOnce(&mut TranslationCatalog),
{
    let mut catalogs = global_catalogs()
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    f(catalogs.entry(language.to_string()).or_default());
}

// ── Registration ─────────────────────────────────────────────────────────

/// Registers `(msgid, translated)` pairs, overwriting existing entries.
///
/// ```
/// use fungiform_core::i18n::catalog;
///
/// catalog::register_translations("de", vec![
///     ("This field is required.", "Dieses Feld ist erforderlich."),
/// ]);
/// assert_eq!(
///     catalog::translate("de", "This field is required.").as_deref(),
///     Some("Dieses Feld ist erforderlich.")
/// );
/// ```
pub fn register_translations(language: &str, entries: Vec<(&str, &str)>) {
    with_catalog_mut(language, |catalog| {
        catalog.messages.extend(
            entries
                .into_iter()
                .map(|(msgid, translated)| (msgid.to_string(), translated.to_string())),
        );
    });
}

/// Registers `(singular, plural, translated_singular, translated_plural)`
/// entries.
pub fn register_plural_translations(language: &str, entries: Vec<(&str, &str, &str, &str)>) {
    with_catalog_mut(language, |catalog| {
        for (singular, _plural, trans_singular, trans_plural) in entries {
            catalog.plurals.insert(
                singular.to_string(),
                PluralForms {
                    singular: trans_singular.to_string(),
                    plural: trans_plural.to_string(),
                },
            );
        }
    });
}

/// Merges a JSON catalog into the catalog of `language`.
///
/// # Errors
///
/// Returns [`FormError::SerializationError`] if the JSON does not describe
/// a catalog.
pub fn load_from_json(language: &str, json: &str) -> FormResult<()> {
    let loaded: TranslationCatalog = serde_json::from_str(json)
        .map_err(|e| FormError::SerializationError(format!("invalid catalog for '{language}': {e}")))?;
    tracing::debug!(
        language,
        messages = loaded.messages.len(),
        plurals = loaded.plurals.len(),
        "loaded translation catalog"
    );
    with_catalog_mut(language, |catalog| catalog.merge(loaded));
    Ok(())
}

// ── Lookup ───────────────────────────────────────────────────────────────

pub fn translate(language: &str, msgid: &str) -> Option<String> {
    with_catalog(language, |catalog| catalog.messages.get(msgid).cloned())
}

/// Looks up a plural translation. The singular form is used for a count of
/// one.
pub fn translate_plural(
    language: &str,
    singular: &str,
    _plural: &str,
    count: u64,
) -> Option<String> {
    with_catalog(language, |catalog| {
        catalog.plurals.get(singular).map(|forms| {
            if count == 1 {
                forms.singular.clone()
            } else {
                forms.plural.clone()
            }
        })
    })
}

pub fn has_language(language: &str) -> bool {
    global_catalogs()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .contains_key(language)
}

/// Drops every registered catalog.
pub fn clear_all() {
    global_catalogs()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .clear();
}
