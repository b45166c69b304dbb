//! # fungiform-core
//!
//! The foundation shared by the fungiform crates: the dynamic [`Value`]
//! model, decoding of flat form submissions, an HTML builder, lenient date
//! parsing, error types, settings, logging and translations.
//!
//! ## Modules
//!
//! - [`error`] - [`ValidationError`] and [`FormError`]
//! - [`value`] - The [`Value`] type
//! - [`formdata`] - Flat submissions and [`decode_form_data`]
//! - [`html`] - [`Markup`], escaping and [`HtmlBuilder`]
//! - [`dates`] - Date parsing and formatting
//! - [`settings`] / [`settings_loader`] - Configuration
//! - [`logging`] - Tracing setup
//! - [`i18n`] - Translations
//! - [`utils`] - `MultiValueDict` and naming helpers

pub mod dates;
pub mod error;
pub mod formdata;
pub mod html;
pub mod i18n;
pub mod logging;
pub mod settings;
pub mod settings_loader;
pub mod utils;
pub mod value;

pub use error::{ErrorMap, FormError, FormResult, ValidationError};
pub use formdata::{decode_form_data, FormData};
pub use html::{Attrs, Dialect, HtmlBuilder, Markup};
pub use i18n::Translations;
pub use settings::{Settings, SETTINGS};
pub use value::Value;
