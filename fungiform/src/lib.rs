//! # fungiform
//!
//! Declarative forms for web applications: convert and validate submitted
//! data, render the form back as HTML, and protect it against CSRF, open
//! redirects and bots.
//!
//! This is the facade crate that re-exports the sub-crates. Depend on the
//! sub-crates directly for finer-grained control.
//!
//! ```
//! # #[tokio::main]
//! # async fn main() {
//! use fungiform::prelude::*;
//!
//! let contact = FormDefinition::new("ContactForm")
//!     .field("email", Field::text().required(true).validator(Email))
//!     .field("message", Field::text().widget(WidgetType::Textarea));
//!
//! let mut form = FormBase::new(&contact);
//! let data = FormData::parse_urlencoded("email=jane%40example.com&message=Hello");
//! assert!(form.validate(&data).await.unwrap());
//! assert_eq!(form.get("message"), Some(&Value::from("Hello")));
//! # }
//! ```

/// Values, errors, HTML building, settings, logging and translations.
pub use fungiform_core as core;

/// Request info, sessions, CSRF tokens, redirect checks and reCAPTCHA.
#[cfg(feature = "security")]
pub use fungiform_security as security;

/// Fields, validators, forms and widgets.
#[cfg(feature = "forms")]
pub use fungiform_forms as forms;

pub use fungiform_core::value_map;

/// Third-party crates that appear in the public API.
pub use async_trait::async_trait;
pub use chrono;
pub use serde_json;
pub use tracing;

/// The types most applications need.
pub mod prelude {
    pub use fungiform_core::error::{ErrorMap, FormError, FormResult, ValidationError};
    pub use fungiform_core::formdata::{decode_form_data, decode_json, FormData};
    pub use fungiform_core::html::{Attrs, Dialect, HtmlBuilder, Markup};
    pub use fungiform_core::i18n::Translations;
    pub use fungiform_core::logging::setup_logging;
    pub use fungiform_core::settings::{Settings, SETTINGS};
    pub use fungiform_core::value::Value;
    pub use fungiform_core::value_map;

    #[cfg(feature = "security")]
    pub use fungiform_security::{
        CaptchaVerifier, CsrfTokens, MemorySession, RequestInfo, Session,
    };

    #[cfg(feature = "forms")]
    pub use fungiform_forms::validators::{
        from_fn, Email, MaxLength, MaxValue, MinLength, MinValue, OneOf, RegexValidator, Url,
    };
    #[cfg(feature = "forms")]
    pub use fungiform_forms::{
        Choice, DefaultIntegration, Field, FormBase, FormDefinition, FormIntegration, FormOptions,
        ValidationContext, Validator, WidgetType,
    };
}
