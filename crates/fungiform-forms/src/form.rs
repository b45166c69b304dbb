//! Form definitions and form instances.
//!
//! A [`FormDefinition`] is the reusable description of a form: its fields,
//! its validators and its [`FormOptions`]. Each request creates a
//! [`FormBase`] from it, which owns copies of the fields, validates
//! submissions, checks the CSRF token and captcha, and renders itself as a
//! [`FormWidget`].
//!
//! Validation is async because the captcha check talks to a remote service.
//!
//! Everything a form needs from the surrounding web application (the
//! session, the request, translations, redirect responses) comes through
//! the [`FormIntegration`] trait, whose hooks all have working defaults.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::Instrument;

use fungiform_core::error::{ErrorMap, FormError, FormResult, ValidationError};
use fungiform_core::formdata::{decode_form_data, decode_json, FormData};
use fungiform_core::html::{Dialect, HtmlBuilder};
use fungiform_core::i18n::{ActiveTranslations, Translations};
use fungiform_core::logging::form_span;
use fungiform_core::settings::{Settings, SETTINGS};
use fungiform_core::value::Value;
use fungiform_security::csrf::{tokens_match, CsrfTokens};
use fungiform_security::recaptcha::{
    CaptchaVerifier, HttpCaptchaVerifier, CHALLENGE_FIELD, RESPONSE_FIELD,
};
use fungiform_security::redirects::get_redirect_target;
use fungiform_security::request::RequestInfo;
use fungiform_security::session::Session;

use crate::fields::Field;
use crate::validators::{SharedValidator, ValidationContext, Validator};
use crate::widgets::{BoundWidget, FormWidget, WidgetContext};

/// The hidden field carrying the CSRF token.
pub const CSRF_TOKEN_FIELD: &str = "_csrf_token";
/// The hidden field carrying the redirect target.
pub const REDIRECT_TARGET_FIELD: &str = "_redirect_target";

// ── Options ──────────────────────────────────────────────────────────────

/// Per-form behavior. Defaults come from the global settings.
#[derive(Debug, Clone, PartialEq)]
pub struct FormOptions {
    /// `None` protects the form whenever it knows its request.
    pub csrf_protected: Option<bool>,
    pub redirect_tracking: bool,
    /// Host patterns redirect targets may point to besides the current host.
    pub allowed_redirect_rules: Vec<String>,
    pub captcha_protected: bool,
    pub default_method: String,
    pub html: Dialect,
    pub recaptcha_public_key: Option<String>,
    pub recaptcha_private_key: Option<String>,
    pub recaptcha_use_ssl: bool,
    pub max_csrf_tokens: usize,
    pub recaptcha_verify_timeout: Duration,
}

impl FormOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            csrf_protected: settings.csrf_protected,
            redirect_tracking: settings.redirect_tracking,
            allowed_redirect_rules: settings.allowed_redirect_rules.clone(),
            captcha_protected: settings.captcha_protected,
            default_method: settings.default_method.clone(),
            html: settings.html_dialect,
            recaptcha_public_key: settings.recaptcha_public_key.clone(),
            recaptcha_private_key: settings.recaptcha_private_key.clone(),
            recaptcha_use_ssl: settings.recaptcha_use_ssl,
            max_csrf_tokens: settings.max_csrf_tokens,
            recaptcha_verify_timeout: Duration::from_secs(settings.recaptcha_verify_timeout_secs),
        }
    }
}

impl Default for FormOptions {
    /// Reads the configured [`SETTINGS`], or the default settings when
    /// nothing was configured.
    fn default() -> Self {
        SETTINGS
            .try_get()
            .map_or_else(|| Self::from_settings(&Settings::default()), Self::from_settings)
    }
}

// ── Definitions ──────────────────────────────────────────────────────────

#[derive(Clone)]
struct DefinitionInner {
    name: String,
    fields: Vec<(String, Field)>,
    field_validators: Vec<(String, SharedValidator)>,
    root_validators: Vec<SharedValidator>,
    options: Option<FormOptions>,
}

/// The description of a form. Cheap to clone.
///
/// ```
/// use fungiform_core::ValidationError;
/// use fungiform_forms::fields::Field;
/// use fungiform_forms::form::FormDefinition;
/// use fungiform_forms::validators::from_fn;
///
/// let register = FormDefinition::new("RegisterForm")
///     .field("username", Field::text().required(true))
///     .field("password", Field::password().required(true))
///     .field("password_again", Field::password().required(true))
///     .context_validator(from_fn(|_, data| {
///         if data.get("password") != data.get("password_again") {
///             return Err(ValidationError::new("The two passwords must be the same"));
///         }
///         Ok(())
///     }));
/// assert_eq!(register.field_names(), ["username", "password", "password_again"]);
/// ```
#[derive(Clone)]
pub struct FormDefinition {
    inner: Arc<DefinitionInner>,
}

impl fmt::Debug for FormDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormDefinition")
            .field("name", &self.inner.name)
            .field("fields", &self.field_names())
            .field("root_validators", &self.inner.root_validators.len())
            .finish_non_exhaustive()
    }
}

impl FormDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(DefinitionInner {
                name: name.into(),
                fields: Vec::new(),
                field_validators: Vec::new(),
                root_validators: Vec::new(),
                options: None,
            }),
        }
    }

    fn inner_mut(&mut self) -> &mut DefinitionInner {
        Arc::make_mut(&mut self.inner)
    }

    /// Adds a field. A field with the same name is replaced and the new one
    /// moves to the end.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, field: Field) -> Self {
        let name = name.into();
        let inner = self.inner_mut();
        inner.fields.retain(|(existing, _)| *existing != name);
        inner.fields.push((name, field));
        self
    }

    /// Adds a validator for the cleaned value of one field.
    #[must_use]
    pub fn field_validator(mut self, name: impl Into<String>, validator: impl Validator + 'static) -> Self {
        let validator: SharedValidator = Arc::new(validator);
        self.inner_mut().field_validators.push((name.into(), validator));
        self
    }

    /// Adds a validator for the whole cleaned form. It runs after all
    /// fields converted successfully and its errors belong to the form.
    #[must_use]
    pub fn context_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.inner_mut().root_validators.push(Arc::new(validator));
        self
    }

    /// Builds on `base`: its fields and validators come first. Fields
    /// defined here again replace the inherited ones. Options are inherited
    /// unless set here.
    #[must_use]
    pub fn inherit(mut self, base: &Self) -> Self {
        let inner = self.inner_mut();
        let mut fields: Vec<(String, Field)> = base
            .inner
            .fields
            .iter()
            .filter(|(name, _)| !inner.fields.iter().any(|(own, _)| own == name))
            .cloned()
            .collect();
        fields.append(&mut inner.fields);
        inner.fields = fields;

        let mut field_validators = base.inner.field_validators.clone();
        field_validators.append(&mut inner.field_validators);
        inner.field_validators = field_validators;

        let mut root_validators = base.inner.root_validators.clone();
        root_validators.append(&mut inner.root_validators);
        inner.root_validators = root_validators;

        if inner.options.is_none() {
            inner.options.clone_from(&base.inner.options);
        }
        self
    }

    #[must_use]
    pub fn options(mut self, options: FormOptions) -> Self {
        self.inner_mut().options = Some(options);
        self
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.inner.fields.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn get_field(&self, name: &str) -> Option<&Field> {
        self.inner
            .fields
            .iter()
            .find(|(own, _)| own == name)
            .map(|(_, field)| field)
    }

    /// The options set on this definition, or the defaults.
    pub fn form_options(&self) -> FormOptions {
        self.inner.options.clone().unwrap_or_default()
    }

    /// The form as a mapping field, usable inside other forms. Field
    /// validators are attached to their fields and context validators to
    /// the mapping.
    pub fn as_field(&self) -> Field {
        let mut root = Field::mapping(self.inner.fields.iter().cloned());
        for (name, validator) in &self.inner.field_validators {
            if let Some(field) = root.subfield_mut(name) {
                field.add_validator(Arc::clone(validator));
            } else {
                tracing::warn!(form = %self.inner.name, field = %name, "validator for unknown field");
            }
        }
        for validator in &self.inner.root_validators {
            root.add_validator(Arc::clone(validator));
        }
        root
    }
}

// ── Integration ──────────────────────────────────────────────────────────

/// Connects forms to a web application.
///
/// Every hook has a default, so an integration only overrides what its
/// framework provides. A typical one looks up the current request, hands
/// out the user's session and builds redirect responses.
#[async_trait]
pub trait FormIntegration: Send + Sync {
    /// Translations for messages and widgets.
    fn translations(&self) -> Arc<dyn Translations> {
        Arc::new(ActiveTranslations)
    }

    /// Called when a form is created without request info.
    fn lookup_request_info(&self) -> Option<RequestInfo> {
        None
    }

    /// The action of forms that were not given one. `None` submits to the
    /// current URL.
    fn default_action(&self, _info: &RequestInfo) -> Option<String> {
        None
    }

    /// The session CSRF tokens are stored in.
    fn session(&self) -> Option<Arc<dyn Session>> {
        None
    }

    /// Finds the submitted data when none is passed to validation.
    async fn autodiscover_data(&self, _info: Option<&RequestInfo>) -> FormResult<FormData> {
        Err(FormError::NotSupported(
            "No data passed to the validation and data auto discovery not implemented".to_string(),
        ))
    }

    /// The redirect target the user asked for. By default only the hidden
    /// `_redirect_target` field of the submission counts.
    fn redirect_user_url(&self, raw_data: Option<&Value>) -> Option<String> {
        raw_data
            .and_then(|raw| raw.get(REDIRECT_TARGET_FIELD))
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    /// Turns a redirect fallback into a URL.
    fn resolve_url(&self, target: &str) -> FormResult<String> {
        Ok(target.to_string())
    }

    /// A `302 Found` response pointing at `url`.
    fn redirect_response(&self, url: &str) -> FormResult<http::Response<()>> {
        http::Response::builder()
            .status(http::StatusCode::FOUND)
            .header(http::header::LOCATION, url)
            .body(())
            .map_err(|e| FormError::InvalidUrl(format!("cannot redirect to '{url}': {e}")))
    }

    fn captcha_verifier(&self, options: &FormOptions) -> FormResult<Arc<dyn CaptchaVerifier>> {
        Ok(Arc::new(HttpCaptchaVerifier::new(options.recaptcha_verify_timeout)?))
    }

    fn remote_addr(&self, info: Option<&RequestInfo>) -> String {
        info.and_then(|info| info.remote_addr.clone()).unwrap_or_default()
    }
}

/// An integration that uses every default.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultIntegration;

impl FormIntegration for DefaultIntegration {}

// ── Form instances ───────────────────────────────────────────────────────

/// A form instance, created per request.
///
/// ```
/// # #[tokio::main]
/// # async fn main() {
/// use fungiform_core::{FormData, Value};
/// use fungiform_forms::fields::Field;
/// use fungiform_forms::form::{FormBase, FormDefinition};
///
/// let person = FormDefinition::new("PersonForm")
///     .field("name", Field::text().required(true))
///     .field("age", Field::integer());
///
/// let mut form = FormBase::new(&person);
/// let data = FormData::parse_urlencoded("name=johnny&age=42");
/// assert!(form.validate(&data).await.unwrap());
/// assert_eq!(form.get("age"), Some(&Value::Int(42)));
///
/// let mut form = FormBase::new(&person);
/// let data = FormData::parse_urlencoded("name=&age=fourty-two");
/// assert!(!form.validate(&data).await.unwrap());
/// assert_eq!(form.errors()[&Some("age".to_string())], ["Please enter a whole number."]);
/// # }
/// ```
pub struct FormBase {
    definition: FormDefinition,
    root: Field,
    options: FormOptions,
    integration: Arc<dyn FormIntegration>,
    translations: Arc<dyn Translations>,
    request_info: Option<RequestInfo>,
    action: Option<String>,
    initial: BTreeMap<String, Value>,
    data: BTreeMap<String, Value>,
    raw_data: Option<Value>,
    errors: ErrorMap,
    invalid_redirect_targets: Vec<String>,
}

impl fmt::Debug for FormBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormBase")
            .field("name", &self.definition.name())
            .field("request_info", &self.request_info)
            .field("data", &self.data)
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}

impl FormBase {
    pub fn new(definition: &FormDefinition) -> Self {
        let integration: Arc<dyn FormIntegration> = Arc::new(DefaultIntegration);
        Self {
            definition: definition.clone(),
            root: definition.as_field(),
            options: definition.form_options(),
            translations: integration.translations(),
            request_info: integration.lookup_request_info(),
            integration,
            action: None,
            initial: BTreeMap::new(),
            data: BTreeMap::new(),
            raw_data: None,
            errors: ErrorMap::new(),
            invalid_redirect_targets: Vec::new(),
        }
    }

    /// Values shown before anything was submitted, for example loaded from
    /// a database. Non-map values are ignored.
    #[must_use]
    pub fn with_initial(mut self, initial: impl Into<Value>) -> Self {
        self.initial = initial.into().force_dict();
        self.reset();
        self
    }

    #[must_use]
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    #[must_use]
    pub fn with_request_info(mut self, info: RequestInfo) -> Self {
        self.request_info = Some(info);
        self
    }

    /// Switches to another integration. If no request info was given yet,
    /// the integration is asked for it.
    #[must_use]
    pub fn with_integration(mut self, integration: Arc<dyn FormIntegration>) -> Self {
        self.translations = integration.translations();
        if self.request_info.is_none() {
            self.request_info = integration.lookup_request_info();
        }
        self.integration = integration;
        self
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn name(&self) -> &str {
        self.definition.name()
    }

    pub const fn definition(&self) -> &FormDefinition {
        &self.definition
    }

    pub const fn options(&self) -> &FormOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut FormOptions {
        &mut self.options
    }

    pub const fn request_info(&self) -> Option<&RequestInfo> {
        self.request_info.as_ref()
    }

    pub fn translations(&self) -> &dyn Translations {
        self.translations.as_ref()
    }

    pub const fn html(&self) -> HtmlBuilder {
        HtmlBuilder::new(self.options.html)
    }

    pub const fn initial(&self) -> &BTreeMap<String, Value> {
        &self.initial
    }

    /// The current values: the initial ones, updated by every successful
    /// validation.
    pub const fn data(&self) -> &BTreeMap<String, Value> {
        &self.data
    }

    /// The decoded submission of the last validation.
    pub const fn raw_data(&self) -> Option<&Value> {
        self.raw_data.as_ref()
    }

    pub const fn errors(&self) -> &ErrorMap {
        &self.errors
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Whether the data differs from the initial data, compared as
    /// submitted strings.
    pub fn has_changed(&self) -> bool {
        let initial = Value::Map(self.initial.clone());
        let data = Value::Map(self.data.clone());
        self.root.to_primitive(&initial) != self.root.to_primitive(&data)
    }

    /// Whether submissions must carry a CSRF token. Unless configured, a
    /// form is protected when it knows its request.
    pub fn csrf_protected(&self) -> bool {
        self.options
            .csrf_protected
            .unwrap_or(self.request_info.is_some())
    }

    /// The URL the form submits to.
    ///
    /// With request info an empty action (or `.`) becomes the integration's
    /// default action and anything else is resolved against the current
    /// URL.
    pub fn action(&self) -> String {
        let Some(info) = &self.request_info else {
            return self.action.clone().unwrap_or_default();
        };
        match self.action.as_deref() {
            None | Some("" | ".") => self.integration.default_action(info).unwrap_or_default(),
            Some(action) => url::Url::parse(&info.current_url(false))
                .and_then(|base| base.join(action))
                .map_or_else(|_| action.to_string(), String::from),
        }
    }

    // ── Fields of this instance ──────────────────────────────────────

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.root.subfield(name)
    }

    /// Changes a field of this instance only.
    pub fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.root.subfield_mut(name)
    }

    pub fn remove_field(&mut self, name: &str) -> Option<Field> {
        self.root.remove_subfield(name)
    }

    // ── State ────────────────────────────────────────────────────────

    /// Drops submitted data and errors.
    pub fn reset(&mut self) {
        self.data = self.initial.clone();
        self.errors.clear();
        self.raw_data = None;
    }

    /// Adds an error for a field, or for the whole form with `None`.
    pub fn add_error(&mut self, message: impl Into<String>, field: Option<&str>) {
        self.errors
            .entry(field.map(str::to_string))
            .or_default()
            .push(message.into());
    }

    // ── Protection ───────────────────────────────────────────────────

    fn session(&self) -> FormResult<Arc<dyn Session>> {
        self.integration.session().ok_or_else(|| {
            FormError::NotSupported(
                "some features require access to the session; provide one through the form integration"
                    .to_string(),
            )
        })
    }

    /// The CSRF token for this form's action.
    ///
    /// # Errors
    ///
    /// [`FormError::NotSupported`] if the form is not protected or there is
    /// no session.
    pub fn csrf_token(&self) -> FormResult<String> {
        if !self.csrf_protected() {
            return Err(FormError::NotSupported(
                "no csrf token because form not csrf protected".to_string(),
            ));
        }
        let session = self.session()?;
        Ok(CsrfTokens::new(self.options.max_csrf_tokens).get_token(
            session.as_ref(),
            &self.action(),
            false,
        ))
    }

    /// Where to send the user back to, if that place is safe.
    ///
    /// # Errors
    ///
    /// [`FormError::NotSupported`] without request info.
    pub fn redirect_target(&self) -> FormResult<Option<String>> {
        let Some(info) = &self.request_info else {
            return Err(FormError::NotSupported(
                "redirect targets require request info".to_string(),
            ));
        };
        let user_url = self.integration.redirect_user_url(self.raw_data.as_ref());
        Ok(get_redirect_target(
            info,
            user_url.as_deref(),
            self.invalid_redirect_targets.as_slice(),
            self.options.allowed_redirect_rules.as_slice(),
        ))
    }

    /// Marks a URL as a bad place to return to, for example the edit page
    /// of something that was just deleted.
    pub fn add_invalid_redirect_target(&mut self, target: &str) -> FormResult<()> {
        let url = self.integration.resolve_url(target)?;
        if !self.invalid_redirect_targets.contains(&url) {
            self.invalid_redirect_targets.push(url);
        }
        Ok(())
    }

    /// Redirects back to where the user came from, or to `fallback`.
    pub fn redirect(&self, fallback: &str) -> FormResult<http::Response<()>> {
        let target = if self.options.redirect_tracking {
            self.redirect_target()?
        } else {
            None
        };
        let url = match target {
            Some(target) => target,
            None => self.integration.resolve_url(fallback)?,
        };
        self.integration.redirect_response(&url)
    }

    fn raw_text(&self, key: &str) -> String {
        self.raw_data
            .as_ref()
            .and_then(|raw| raw.get(key))
            .map(Value::to_text)
            .unwrap_or_default()
    }

    /// Runs the CSRF and captcha checks against the raw data. `Ok(Some)` is
    /// a failed check.
    async fn check_protection(&self) -> FormResult<Option<ValidationError>> {
        if self.csrf_protected() {
            let expected = self.csrf_token()?;
            if !tokens_match(&expected, &self.raw_text(CSRF_TOKEN_FIELD)) {
                tracing::debug!("csrf token missing or outdated");
                return Ok(Some(ValidationError::new(self.translations.gettext(
                    "Form submitted multiple times or session expired.  Try again.",
                ))));
            }
        }
        if self.options.captcha_protected {
            let verifier = self.integration.captcha_verifier(&self.options)?;
            let verified = verifier
                .verify(
                    self.options.recaptcha_private_key.as_deref().unwrap_or_default(),
                    &self.raw_text(CHALLENGE_FIELD),
                    &self.raw_text(RESPONSE_FIELD),
                    &self.integration.remote_addr(self.request_info.as_ref()),
                )
                .await?;
            if !verified {
                return Ok(Some(ValidationError::new(
                    self.translations.gettext("You entered an invalid captcha."),
                )));
            }
        }
        Ok(None)
    }

    // ── Validation ───────────────────────────────────────────────────

    /// Validates a flat submission such as a decoded query string.
    ///
    /// Returns whether the form is valid. Validation failures end up in
    /// [`errors`](Self::errors); an `Err` means the form could not be
    /// validated at all, for example because the session is missing.
    pub async fn validate(&mut self, data: &FormData) -> FormResult<bool> {
        self.validate_value(decode_form_data(data)).await
    }

    /// Validates the data the integration finds in the current request.
    pub async fn validate_request(&mut self) -> FormResult<bool> {
        let data = self
            .integration
            .autodiscover_data(self.request_info.as_ref())
            .await?;
        self.validate(&data).await
    }

    /// Validates data that is already nested, such as decoded JSON.
    pub async fn validate_value(&mut self, raw: Value) -> FormResult<bool> {
        let span = form_span(self.definition.name());
        self.run_validation(raw).instrument(span).await
    }

    /// Validates a JSON request body.
    pub async fn validate_json(&mut self, body: serde_json::Value) -> FormResult<bool> {
        self.validate_value(decode_json(body)).await
    }

    async fn run_validation(&mut self, raw: Value) -> FormResult<bool> {
        let mut raw = raw.force_dict();
        for (name, field) in self.root.subfields() {
            if field.validate_on_omission() && !raw.contains_key(name) {
                raw.insert(name.clone(), Value::Null);
            }
        }
        self.raw_data = Some(Value::Map(raw.clone()));

        let mut merged = self.data.clone();
        merged.extend(raw);
        let merged = Value::Map(merged);

        let result = match self.check_protection().await? {
            Some(err) => Err(err),
            None => {
                let ctx = ValidationContext::new(self.translations.as_ref())
                    .with_data(&merged)
                    .with_request_info(self.request_info.as_ref());
                self.root.clean(&ctx, &merged)
            }
        };
        self.errors = match &result {
            Ok(_) => ErrorMap::new(),
            Err(err) => err.unpack(None),
        };

        if self.csrf_protected() {
            let session = self.session()?;
            CsrfTokens::new(self.options.max_csrf_tokens)
                .invalidate_token(session.as_ref(), &self.action());
        }

        match result {
            Ok(cleaned) => {
                self.data.extend(cleaned.force_dict());
                tracing::debug!("form is valid");
                Ok(true)
            }
            Err(_) => {
                tracing::debug!(errors = self.errors.len(), "form is invalid");
                Ok(false)
            }
        }
    }

    // ── Rendering ────────────────────────────────────────────────────

    /// The form as a widget. Shows the submitted data if there is any,
    /// otherwise the current data.
    pub fn as_widget(&self) -> FormWidget<'_> {
        let value = self
            .raw_data
            .clone()
            .unwrap_or_else(|| Value::Map(self.data.clone()));
        let ctx = WidgetContext {
            html: self.html(),
            translations: self.translations.as_ref(),
            errors: &self.errors,
        };
        FormWidget::new(self, BoundWidget::new(&self.root, None, value, ctx))
    }
}
