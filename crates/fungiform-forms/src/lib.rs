//! # fungiform-forms
//!
//! Declarative forms: fields that convert and validate submitted data,
//! form definitions with CSRF, redirect and captcha protection, and widgets
//! that render everything as HTML.
//!
//! ## Modules
//!
//! - [`fields`] - [`Field`] and its kinds
//! - [`validators`] - The [`Validator`] trait and built-in validators
//! - [`form`] - [`FormDefinition`], [`FormBase`] and [`FormIntegration`]
//! - [`widgets`] - HTML rendering of bound fields and forms
//! - [`errors`] - [`ErrorList`]

pub mod errors;
pub mod fields;
pub mod form;
pub mod validators;
pub mod widgets;

pub use errors::ErrorList;
pub use fields::{Choice, Field, FieldKind, Separator};
pub use form::{
    DefaultIntegration, FormBase, FormDefinition, FormIntegration, FormOptions, CSRF_TOKEN_FIELD,
    REDIRECT_TARGET_FIELD,
};
pub use validators::{ValidationContext, Validator};
pub use widgets::{BoundWidget, ChoiceWidget, FormWidget, ListOptions, WidgetType};
