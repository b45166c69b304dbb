//! Form fields.
//!
//! A [`Field`] converts one submitted value into a typed [`Value`] and runs
//! its validators on the result. Simple fields handle a single string;
//! [`FieldKind::Mapping`] and [`FieldKind::Multiple`] nest other fields, so
//! a whole form is just a mapping field at the root.
//!
//! ```
//! use fungiform_core::{value_map, Value};
//! use fungiform_forms::fields::Field;
//! use fungiform_forms::validators::ValidationContext;
//!
//! let person = Field::mapping([
//!     ("name", Field::text().required(true)),
//!     ("age", Field::integer()),
//! ]);
//! let cleaned = person
//!     .clean(&ValidationContext::default(), &value_map! { "name" => "John Doe", "age" => "42" })
//!     .unwrap();
//! assert_eq!(cleaned, value_map! { "name" => "John Doe", "age" => 42 });
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use chrono::FixedOffset;

use fungiform_core::dates::{
    format_system_date, format_system_datetime, parse_date_with, parse_datetime_with,
    DATE_FORMATS, TIME_FORMATS,
};
use fungiform_core::error::ValidationError;
use fungiform_core::i18n::interpolate;
use fungiform_core::value::Value;

use crate::validators::{SharedValidator, ValidationContext, Validator};
use crate::widgets::WidgetType;

/// One selectable option of a choice field: the key that is submitted and
/// compared, and the label shown to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct Choice {
    pub key: Value,
    pub label: String,
}

impl Choice {
    pub fn new(key: impl Into<Value>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
        }
    }

    /// A choice labelled with the text of its key.
    pub fn plain(key: impl Into<Value>) -> Self {
        let key = key.into();
        let label = key.to_text();
        Self { key, label }
    }
}

impl From<&str> for Choice {
    fn from(key: &str) -> Self {
        Self::plain(key)
    }
}

impl From<String> for Choice {
    fn from(key: String) -> Self {
        Self::plain(key)
    }
}

impl From<i32> for Choice {
    fn from(key: i32) -> Self {
        Self::plain(key)
    }
}

impl From<i64> for Choice {
    fn from(key: i64) -> Self {
        Self::plain(key)
    }
}

impl<K: Into<Value>, L: Into<String>> From<(K, L)> for Choice {
    fn from((key, label): (K, L)) -> Self {
        Self::new(key, label)
    }
}

/// How a [`FieldKind::Multiple`] field reads a single string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Separator {
    /// Splits on the separator, `1, 2, 3`.
    Comma(String),
    /// One item per line.
    Lines,
}

/// The type specific part of a [`Field`].
#[derive(Debug, Clone)]
pub enum FieldKind {
    Text {
        required: bool,
        min_length: Option<usize>,
        max_length: Option<usize>,
    },
    DateTime {
        required: bool,
        /// Input is read in this zone and converted to UTC.
        timezone: Option<FixedOffset>,
        date_formats: Vec<String>,
        time_formats: Vec<String>,
    },
    Date {
        required: bool,
        date_formats: Vec<String>,
    },
    Choice {
        required: bool,
        choices: Vec<Choice>,
    },
    MultiChoice {
        choices: Vec<Choice>,
        min_size: Option<usize>,
        max_size: Option<usize>,
    },
    Integer {
        required: bool,
        min_value: Option<f64>,
        max_value: Option<f64>,
    },
    Float {
        required: bool,
        min_value: Option<f64>,
        max_value: Option<f64>,
    },
    Boolean,
    /// Named subfields in declaration order.
    Mapping { fields: Vec<(String, Field)> },
    /// The same field applied to every item of a list.
    Multiple {
        field: Box<Field>,
        min_size: Option<usize>,
        max_size: Option<usize>,
        separator: Option<Separator>,
    },
}

/// A form field: shared metadata plus a [`FieldKind`].
///
/// Fields are plain values. Cloning one gives an independent copy whose
/// choices, messages and validators can be changed without touching the
/// original; validators themselves are shared.
#[derive(Clone)]
pub struct Field {
    pub label: Option<String>,
    pub help_text: Option<String>,
    validators: Vec<SharedValidator>,
    widget: WidgetType,
    messages: HashMap<String, String>,
    sentinel: bool,
    kind: FieldKind,
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("label", &self.label)
            .field("widget", &self.widget)
            .field("validators", &self.validators.len())
            .field("sentinel", &self.sentinel)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

fn default_widget(kind: &FieldKind) -> WidgetType {
    match kind {
        FieldKind::Choice { .. } | FieldKind::MultiChoice { .. } => WidgetType::SelectBox,
        FieldKind::Boolean => WidgetType::Checkbox,
        FieldKind::Mapping { .. } => WidgetType::Mapping,
        FieldKind::Multiple { separator: None, .. } => WidgetType::List,
        FieldKind::Multiple {
            separator: Some(Separator::Lines),
            ..
        } => WidgetType::Textarea,
        _ => WidgetType::TextInput,
    }
}

fn formats(defaults: &[&str]) -> Vec<String> {
    defaults.iter().map(ToString::to_string).collect()
}

impl Field {
    fn with_kind(kind: FieldKind) -> Self {
        Self {
            label: None,
            help_text: None,
            validators: Vec::new(),
            widget: default_widget(&kind),
            messages: HashMap::new(),
            sentinel: false,
            kind,
        }
    }

    // ── Constructors ─────────────────────────────────────────────────

    pub fn text() -> Self {
        Self::with_kind(FieldKind::Text {
            required: false,
            min_length: None,
            max_length: None,
        })
    }

    /// A text field rendered as a password input.
    pub fn password() -> Self {
        Self::text().widget(WidgetType::PasswordInput)
    }

    pub fn datetime() -> Self {
        Self::with_kind(FieldKind::DateTime {
            required: false,
            timezone: None,
            date_formats: formats(DATE_FORMATS),
            time_formats: formats(TIME_FORMATS),
        })
    }

    pub fn date() -> Self {
        Self::with_kind(FieldKind::Date {
            required: false,
            date_formats: formats(DATE_FORMATS),
        })
    }

    /// A single choice out of `choices`. Required unless told otherwise.
    pub fn choice<I, C>(choices: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Choice>,
    {
        Self::with_kind(FieldKind::Choice {
            required: true,
            choices: choices.into_iter().map(Into::into).collect(),
        })
    }

    pub fn multi_choice<I, C>(choices: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Choice>,
    {
        Self::with_kind(FieldKind::MultiChoice {
            choices: choices.into_iter().map(Into::into).collect(),
            min_size: None,
            max_size: None,
        })
    }

    pub fn integer() -> Self {
        Self::with_kind(FieldKind::Integer {
            required: false,
            min_value: None,
            max_value: None,
        })
    }

    pub fn float() -> Self {
        Self::with_kind(FieldKind::Float {
            required: false,
            min_value: None,
            max_value: None,
        })
    }

    pub fn boolean() -> Self {
        Self::with_kind(FieldKind::Boolean)
    }

    pub fn mapping<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, Self)>,
        S: Into<String>,
    {
        Self::with_kind(FieldKind::Mapping {
            fields: fields.into_iter().map(|(n, f)| (n.into(), f)).collect(),
        })
    }

    /// Applies `field` to every item of a list.
    pub fn multiple(field: Self) -> Self {
        Self::with_kind(FieldKind::Multiple {
            field: Box::new(field),
            min_size: None,
            max_size: None,
            separator: None,
        })
    }

    /// Like [`multiple`](Self::multiple) but a single string is split on
    /// commas first.
    pub fn comma_separated(field: Self) -> Self {
        Self::with_kind(FieldKind::Multiple {
            field: Box::new(field),
            min_size: None,
            max_size: None,
            separator: Some(Separator::Comma(",".to_string())),
        })
    }

    /// Like [`multiple`](Self::multiple) but a single string is split into
    /// lines first.
    pub fn line_separated(field: Self) -> Self {
        Self::with_kind(FieldKind::Multiple {
            field: Box::new(field),
            min_size: None,
            max_size: None,
            separator: Some(Separator::Lines),
        })
    }

    // ── Builder setters ──────────────────────────────────────────────

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn help_text(mut self, text: impl Into<String>) -> Self {
        self.help_text = Some(text.into());
        self
    }

    /// Marks the field as required. For multi choice fields this means at
    /// least one item. Kinds without a notion of required ignore it.
    #[must_use]
    pub fn required(mut self, value: bool) -> Self {
        match &mut self.kind {
            FieldKind::Text { required, .. }
            | FieldKind::DateTime { required, .. }
            | FieldKind::Date { required, .. }
            | FieldKind::Choice { required, .. }
            | FieldKind::Integer { required, .. }
            | FieldKind::Float { required, .. } => *required = value,
            FieldKind::MultiChoice { min_size, .. } => {
                *min_size = if value { Some(min_size.unwrap_or(1).max(1)) } else { None };
            }
            _ => {}
        }
        self
    }

    #[must_use]
    pub fn min_length(mut self, value: usize) -> Self {
        if let FieldKind::Text { min_length, .. } = &mut self.kind {
            *min_length = Some(value);
        }
        self
    }

    #[must_use]
    pub fn max_length(mut self, value: usize) -> Self {
        if let FieldKind::Text { max_length, .. } = &mut self.kind {
            *max_length = Some(value);
        }
        self
    }

    #[must_use]
    pub fn min_value(mut self, value: f64) -> Self {
        if let FieldKind::Integer { min_value, .. } | FieldKind::Float { min_value, .. } =
            &mut self.kind
        {
            *min_value = Some(value);
        }
        self
    }

    #[must_use]
    pub fn max_value(mut self, value: f64) -> Self {
        if let FieldKind::Integer { max_value, .. } | FieldKind::Float { max_value, .. } =
            &mut self.kind
        {
            *max_value = Some(value);
        }
        self
    }

    #[must_use]
    pub fn min_size(mut self, value: usize) -> Self {
        if let FieldKind::MultiChoice { min_size, .. } | FieldKind::Multiple { min_size, .. } =
            &mut self.kind
        {
            *min_size = Some(value);
        }
        self
    }

    #[must_use]
    pub fn max_size(mut self, value: usize) -> Self {
        if let FieldKind::MultiChoice { max_size, .. } | FieldKind::Multiple { max_size, .. } =
            &mut self.kind
        {
            *max_size = Some(value);
        }
        self
    }

    #[must_use]
    pub fn choices<I, C>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Choice>,
    {
        self.set_choices(choices);
        self
    }

    #[must_use]
    pub fn timezone(mut self, tz: FixedOffset) -> Self {
        if let FieldKind::DateTime { timezone, .. } = &mut self.kind {
            *timezone = Some(tz);
        }
        self
    }

    #[must_use]
    pub fn date_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let FieldKind::DateTime { date_formats, .. } | FieldKind::Date { date_formats, .. } =
            &mut self.kind
        {
            *date_formats = formats.into_iter().map(Into::into).collect();
        }
        self
    }

    #[must_use]
    pub fn time_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let FieldKind::DateTime { time_formats, .. } = &mut self.kind {
            *time_formats = formats.into_iter().map(Into::into).collect();
        }
        self
    }

    /// Changes the separator of a comma separated field.
    #[must_use]
    pub fn separator(mut self, sep: impl Into<String>) -> Self {
        if let FieldKind::Multiple {
            separator: Some(Separator::Comma(current)),
            ..
        } = &mut self.kind
        {
            *current = sep.into();
        }
        self
    }

    #[must_use]
    pub fn validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    #[must_use]
    pub fn widget(mut self, widget: WidgetType) -> Self {
        self.widget = widget;
        self
    }

    /// Overrides the default message for an error code such as `required`
    /// or `too_short`.
    #[must_use]
    pub fn message(mut self, code: &str, text: impl Into<String>) -> Self {
        self.messages.insert(code.to_string(), text.into());
        self
    }

    /// Lets list fields skip items that leave this field empty.
    ///
    /// With `Multiple(Mapping(name, count.sentinel(true)))` a row without a
    /// count is neither validated nor stored.
    #[must_use]
    pub fn sentinel(mut self, sentinel: bool) -> Self {
        self.sentinel = sentinel;
        self
    }

    // ── Per instance changes ─────────────────────────────────────────

    /// Replaces the choices of a choice field, or of the item field of a
    /// list.
    pub fn set_choices<I, C>(&mut self, choices: I)
    where
        I: IntoIterator<Item = C>,
        C: Into<Choice>,
    {
        match &mut self.kind {
            FieldKind::Choice { choices: current, .. }
            | FieldKind::MultiChoice { choices: current, .. } => {
                *current = choices.into_iter().map(Into::into).collect();
            }
            FieldKind::Multiple { field, .. } => field.set_choices(choices),
            _ => {}
        }
    }

    pub fn add_validator(&mut self, validator: SharedValidator) {
        self.validators.push(validator);
    }

    pub fn set_widget(&mut self, widget: WidgetType) {
        self.widget = widget;
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub const fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub const fn widget_type(&self) -> WidgetType {
        self.widget
    }

    pub fn validators(&self) -> &[SharedValidator] {
        &self.validators
    }

    pub const fn is_sentinel(&self) -> bool {
        self.sentinel
    }

    pub const fn is_required(&self) -> bool {
        match &self.kind {
            FieldKind::Text { required, .. }
            | FieldKind::DateTime { required, .. }
            | FieldKind::Date { required, .. }
            | FieldKind::Choice { required, .. }
            | FieldKind::Integer { required, .. }
            | FieldKind::Float { required, .. } => *required,
            FieldKind::MultiChoice { min_size, .. } => matches!(min_size, Some(n) if *n > 0),
            _ => false,
        }
    }

    /// The subfields of a mapping, in declaration order.
    pub fn subfields(&self) -> &[(String, Self)] {
        match &self.kind {
            FieldKind::Mapping { fields } => fields,
            _ => &[],
        }
    }

    pub fn subfield(&self, name: &str) -> Option<&Self> {
        self.subfields().iter().find(|(n, _)| n == name).map(|(_, f)| f)
    }

    pub fn subfield_mut(&mut self, name: &str) -> Option<&mut Self> {
        match &mut self.kind {
            FieldKind::Mapping { fields } => {
                fields.iter_mut().find(|(n, _)| n == name).map(|(_, f)| f)
            }
            _ => None,
        }
    }

    /// Removes a subfield of a mapping.
    pub fn remove_subfield(&mut self, name: &str) -> Option<Self> {
        let FieldKind::Mapping { fields } = &mut self.kind else {
            return None;
        };
        let pos = fields.iter().position(|(n, _)| n == name)?;
        Some(fields.remove(pos).1)
    }

    /// The field applied to each item of a list.
    pub fn item_field(&self) -> Option<&Self> {
        match &self.kind {
            FieldKind::Multiple { field, .. } => Some(field),
            _ => None,
        }
    }

    /// The choices widgets offer for this field. Lists offer the choices of
    /// their item field.
    pub fn choice_list(&self) -> Vec<Choice> {
        match &self.kind {
            FieldKind::Choice { choices, .. } | FieldKind::MultiChoice { choices, .. } => {
                choices.clone()
            }
            FieldKind::Boolean => vec![Choice::plain("True"), Choice::plain("False")],
            FieldKind::Multiple { field, .. } => field.choice_list(),
            _ => Vec::new(),
        }
    }

    /// Whether widgets should allow selecting several choices.
    pub const fn multiple_choices(&self) -> bool {
        match &self.kind {
            FieldKind::MultiChoice { .. } => true,
            FieldKind::Multiple { max_size, .. } => match max_size {
                None => true,
                Some(n) => *n > 1,
            },
            _ => false,
        }
    }

    /// Fields with this flag are validated even when the submission does
    /// not mention them; an unchecked checkbox is simply missing.
    pub const fn validate_on_omission(&self) -> bool {
        matches!(
            self.kind,
            FieldKind::Multiple { .. } | FieldKind::MultiChoice { .. } | FieldKind::Boolean
        )
    }

    /// Whether a list item holding `value` counts as empty and is skipped.
    pub fn empty_as_item(&self, value: &Value) -> bool {
        match &self.kind {
            FieldKind::Mapping { fields } => fields
                .iter()
                .any(|(name, field)| field.empty_as_item(value.get(name).unwrap_or(&Value::Null))),
            FieldKind::Multiple { field, .. } => {
                value.force_list().iter().any(|item| field.empty_as_item(item))
            }
            _ => self.sentinel && !value.is_truthy(),
        }
    }

    /// Whether validators run for a converted value. Null never is; for
    /// text fields neither is the empty string.
    pub fn should_validate(&self, value: &Value) -> bool {
        match self.kind {
            FieldKind::Text { .. } => value.is_truthy(),
            _ => !value.is_null(),
        }
    }

    // ── Conversion ───────────────────────────────────────────────────

    /// Converts `value` and runs the validators on the result.
    pub fn clean(&self, ctx: &ValidationContext<'_>, value: &Value) -> Result<Value, ValidationError> {
        let value = self.convert(ctx, value)?;
        if self.should_validate(&value) {
            for validator in &self.validators {
                validator.validate(ctx, &value)?;
            }
        }
        Ok(value)
    }

    /// The custom message for `code`, or the translated default.
    fn message_for(&self, code: &str, default: impl FnOnce() -> String) -> String {
        self.messages.get(code).cloned().unwrap_or_else(default)
    }

    fn fail(&self, code: &str, default: impl FnOnce() -> String) -> ValidationError {
        ValidationError::new(self.message_for(code, default))
    }

    fn required_error(&self, ctx: &ValidationContext<'_>) -> ValidationError {
        self.fail("required", || ctx.gettext("This field is required."))
    }

    /// Converts `value` without running validators.
    pub fn convert(&self, ctx: &ValidationContext<'_>, value: &Value) -> Result<Value, ValidationError> {
        match &self.kind {
            FieldKind::Text {
                required,
                min_length,
                max_length,
            } => self.convert_text(ctx, value, *required, *min_length, *max_length),
            FieldKind::DateTime {
                required,
                timezone,
                date_formats,
                time_formats,
            } => {
                if let Value::DateTime(_) = value {
                    return Ok(value.clone());
                }
                let text = value.to_text();
                if text.is_empty() {
                    return if *required { Err(self.required_error(ctx)) } else { Ok(Value::Null) };
                }
                parse_datetime_with(&text, timezone.as_ref(), date_formats, time_formats)
                    .map(Value::DateTime)
                    .map_err(|_| self.invalid_date(ctx))
            }
            FieldKind::Date {
                required,
                date_formats,
            } => {
                match value {
                    Value::Date(_) => return Ok(value.clone()),
                    Value::DateTime(dt) => return Ok(Value::Date(dt.date())),
                    _ => {}
                }
                let text = value.to_text();
                if text.is_empty() {
                    return if *required { Err(self.required_error(ctx)) } else { Ok(Value::Null) };
                }
                parse_date_with(&text, date_formats)
                    .map(Value::Date)
                    .map_err(|_| self.invalid_date(ctx))
            }
            FieldKind::Choice { required, choices } => {
                if !value.is_truthy() && !required {
                    return Ok(Value::Null);
                }
                choices
                    .iter()
                    .find(|choice| value.matches_choice(&choice.key))
                    .map(|choice| choice.key.clone())
                    .ok_or_else(|| {
                        self.fail("invalid_choice", || ctx.gettext("Please enter a valid choice."))
                    })
            }
            FieldKind::MultiChoice {
                choices,
                min_size,
                max_size,
            } => {
                let mut result = Vec::new();
                for item in value.to_list() {
                    let Some(choice) = choices.iter().find(|c| item.matches_choice(&c.key)) else {
                        return Err(ValidationError::new(interpolate(
                            &ctx.gettext("\"%s\" is not a valid choice"),
                            item,
                        )));
                    };
                    result.push(choice.key.clone());
                }
                self.check_size(ctx, result.len(), *min_size, *max_size)?;
                Ok(Value::List(result))
            }
            FieldKind::Integer {
                required,
                min_value,
                max_value,
            } => {
                let text = value.to_text();
                if text.is_empty() {
                    return if *required { Err(self.required_error(ctx)) } else { Ok(Value::Null) };
                }
                let number: i64 = text.trim().parse().map_err(|_| {
                    self.fail("no_integer", || ctx.gettext("Please enter a whole number."))
                })?;
                #[allow(clippy::cast_precision_loss)]
                let as_float = number as f64;
                self.check_range(ctx, as_float, *min_value, *max_value)?;
                Ok(Value::Int(number))
            }
            FieldKind::Float {
                required,
                min_value,
                max_value,
            } => {
                let text = value.to_text();
                if text.is_empty() {
                    return if *required { Err(self.required_error(ctx)) } else { Ok(Value::Null) };
                }
                let number: f64 = text.trim().parse().map_err(|_| {
                    self.fail("no_float", || ctx.gettext("Please enter a floating-point number."))
                })?;
                self.check_range(ctx, number, *min_value, *max_value)?;
                Ok(Value::Float(number))
            }
            FieldKind::Boolean => Ok(Value::Bool(
                value.as_str() != Some("False") && value.is_truthy(),
            )),
            FieldKind::Mapping { fields } => {
                let values = value.force_dict();
                let mut result = BTreeMap::new();
                let mut errors = BTreeMap::new();
                for (name, field) in fields {
                    match field.clean(ctx, values.get(name).unwrap_or(&Value::Null)) {
                        Ok(cleaned) => {
                            result.insert(name.clone(), cleaned);
                        }
                        Err(err) => {
                            errors.insert(name.clone(), err);
                        }
                    }
                }
                if errors.is_empty() {
                    Ok(Value::Map(result))
                } else {
                    Err(ValidationError::multiple(errors))
                }
            }
            FieldKind::Multiple {
                field,
                min_size,
                max_size,
                separator,
            } => {
                let items = match (separator, value) {
                    (Some(separator), Value::String(text)) => split_items(text, separator),
                    _ => value.to_list(),
                };
                let items: Vec<(usize, Value)> = items
                    .into_iter()
                    .enumerate()
                    .filter(|(_, item)| !field.empty_as_item(item))
                    .collect();
                self.check_size(ctx, items.len(), *min_size, *max_size)?;

                let mut result = Vec::with_capacity(items.len());
                let mut errors = BTreeMap::new();
                for (index, item) in items {
                    match field.clean(ctx, &item) {
                        Ok(cleaned) => result.push(cleaned),
                        Err(err) => {
                            errors.insert(index.to_string(), err);
                        }
                    }
                }
                if errors.is_empty() {
                    Ok(Value::List(result))
                } else {
                    Err(ValidationError::multiple(errors))
                }
            }
        }
    }

    fn convert_text(
        &self,
        ctx: &ValidationContext<'_>,
        value: &Value,
        required: bool,
        min_length: Option<usize>,
        max_length: Option<usize>,
    ) -> Result<Value, ValidationError> {
        let text = value.to_text();
        if text.is_empty() && required {
            return Err(self.required_error(ctx));
        }
        if !text.is_empty() {
            let length = text.chars().count();
            if let Some(min) = min_length.filter(|min| length < *min) {
                return Err(self.fail("too_short", || {
                    interpolate(
                        &ctx.ngettext(
                            "Please enter at least %d character.",
                            "Please enter at least %d characters.",
                            min as u64,
                        ),
                        min,
                    )
                }));
            }
            if let Some(max) = max_length.filter(|max| length > *max) {
                return Err(self.fail("too_long", || {
                    interpolate(
                        &ctx.ngettext(
                            "Please enter no more than %d character.",
                            "Please enter no more than %d characters.",
                            max as u64,
                        ),
                        max,
                    )
                }));
            }
        }
        Ok(Value::String(text))
    }

    fn invalid_date(&self, ctx: &ValidationContext<'_>) -> ValidationError {
        self.fail("invalid_date", || ctx.gettext("Please enter a valid date."))
    }

    fn check_size(
        &self,
        ctx: &ValidationContext<'_>,
        len: usize,
        min_size: Option<usize>,
        max_size: Option<usize>,
    ) -> Result<(), ValidationError> {
        if let Some(min) = min_size.filter(|min| len < *min) {
            return Err(self.fail("too_small", || {
                interpolate(
                    &ctx.ngettext(
                        "Please provide at least %d item.",
                        "Please provide at least %d items.",
                        min as u64,
                    ),
                    min,
                )
            }));
        }
        if let Some(max) = max_size.filter(|max| len > *max) {
            return Err(self.fail("too_big", || {
                interpolate(
                    &ctx.ngettext(
                        "Please provide no more than %d item.",
                        "Please provide no more than %d items.",
                        max as u64,
                    ),
                    max,
                )
            }));
        }
        Ok(())
    }

    fn check_range(
        &self,
        ctx: &ValidationContext<'_>,
        number: f64,
        min_value: Option<f64>,
        max_value: Option<f64>,
    ) -> Result<(), ValidationError> {
        if let Some(min) = min_value.filter(|min| number < *min) {
            return Err(self.fail("too_small", || {
                interpolate(&ctx.gettext("Ensure this value is greater than or equal to %s."), min)
            }));
        }
        if let Some(max) = max_value.filter(|max| number > *max) {
            return Err(self.fail("too_big", || {
                interpolate(&ctx.gettext("Ensure this value is less than or equal to %s."), max)
            }));
        }
        Ok(())
    }

    // ── Primitives ───────────────────────────────────────────────────

    /// Converts a value back into what the user would submit: strings, or
    /// lists and maps of strings. Never fails.
    pub fn to_primitive(&self, value: &Value) -> Value {
        match &self.kind {
            FieldKind::DateTime { timezone, .. } => match value {
                Value::DateTime(dt) => Value::String(format_system_datetime(dt, timezone.as_ref())),
                Value::Null => Value::Null,
                other => Value::String(other.to_text()),
            },
            FieldKind::Date { .. } => match value {
                Value::Date(date) => Value::String(format_system_date(date)),
                Value::Null => Value::Null,
                other => Value::String(other.to_text()),
            },
            FieldKind::MultiChoice { .. } => {
                Value::List(value.to_list().iter().map(|v| Value::String(v.to_text())).collect())
            }
            FieldKind::Boolean => {
                let checked = value.as_str() != Some("False") && value.is_truthy();
                Value::from(if checked { "True" } else { "False" })
            }
            FieldKind::Mapping { fields } => Value::Map(
                fields
                    .iter()
                    .map(|(name, field)| {
                        let item = value.get(name).unwrap_or(&Value::Null);
                        (name.clone(), field.to_primitive(item))
                    })
                    .collect(),
            ),
            FieldKind::Multiple {
                field, separator, ..
            } => {
                let Some(separator) = separator else {
                    return Value::List(
                        value.to_list().iter().map(|item| field.to_primitive(item)).collect(),
                    );
                };
                match value {
                    Value::Null => Value::from(""),
                    Value::String(_) => value.clone(),
                    other => {
                        let parts: Vec<String> = other
                            .to_list()
                            .iter()
                            .map(|item| field.to_primitive(item).to_text())
                            .collect();
                        let joiner = match separator {
                            Separator::Comma(sep) => format!("{sep} "),
                            Separator::Lines => "\n".to_string(),
                        };
                        Value::String(parts.join(&joiner))
                    }
                }
            }
            _ => Value::String(value.to_text()),
        }
    }
}

fn split_items(text: &str, separator: &Separator) -> Vec<Value> {
    let parts: Vec<&str> = match separator {
        Separator::Comma(sep) => text.split(sep.as_str()).collect(),
        Separator::Lines => text.lines().collect(),
    };
    parts
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(Value::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use fungiform_core::value_map;

    fn clean(field: &Field, value: impl Into<Value>) -> Result<Value, ValidationError> {
        field.clean(&ValidationContext::default(), &value.into())
    }

    fn message(result: Result<Value, ValidationError>) -> String {
        result.unwrap_err().to_string()
    }

    #[test]
    fn test_text_required_and_lengths() {
        let field = Field::text().required(true);
        assert_eq!(clean(&field, "foo bar").unwrap(), Value::from("foo bar"));
        assert_eq!(message(clean(&field, "")), "This field is required.");
        assert_eq!(message(clean(&field, Value::Null)), "This field is required.");

        let field = Field::text().min_length(6).max_length(8);
        assert_eq!(clean(&field, "").unwrap(), Value::from(""));
        assert_eq!(message(clean(&field, "foo")), "Please enter at least 6 characters.");
        assert_eq!(
            message(clean(&field, "foobarbaz")),
            "Please enter no more than 8 characters."
        );

        let field = Field::text().required(true).min_length(6).max_length(8);
        assert_eq!(message(clean(&field, "")), "This field is required.");
        assert_eq!(message(clean(&field, "foo")), "Please enter at least 6 characters.");
        assert_eq!(
            message(clean(&field, "foobarbaz")),
            "Please enter no more than 8 characters."
        );
        assert_eq!(clean(&field, "foobar").unwrap(), Value::from("foobar"));
    }

    #[test]
    fn test_custom_messages() {
        let field = Field::text().required(true).message("required", "Name missing");
        assert_eq!(message(clean(&field, "")), "Name missing");

        let field = Field::integer().message("no_integer", "Digits only");
        assert_eq!(message(clean(&field, "x")), "Digits only");
    }

    #[test]
    fn test_password_uses_password_widget() {
        assert_eq!(Field::password().widget_type(), WidgetType::PasswordInput);
        assert_eq!(clean(&Field::password(), "s3cret").unwrap(), Value::from("s3cret"));
    }

    #[test]
    fn test_datetime() {
        let field = Field::datetime();
        let expected = NaiveDate::from_ymd_opt(1970, 1, 12)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(clean(&field, "1970-01-12 00:00").unwrap(), Value::DateTime(expected));
        assert_eq!(message(clean(&field, "foo")), "Please enter a valid date.");
        assert_eq!(clean(&field, "").unwrap(), Value::Null);
        assert_eq!(
            message(clean(&Field::datetime().required(true), "")),
            "This field is required."
        );
        assert_eq!(
            field.to_primitive(&Value::DateTime(expected)),
            Value::from("1970-01-12 00:00")
        );
    }

    #[test]
    fn test_datetime_with_timezone_and_formats() {
        let cet = FixedOffset::east_opt(3600).unwrap();
        let field = Field::datetime()
            .timezone(cet)
            .date_formats(["%d.%m.%Y"])
            .time_formats(["%H:%M"]);
        let cleaned = clean(&field, "12.01.1970 01:00").unwrap();
        assert_eq!(cleaned.to_text(), "1970-01-12 00:00:00");
        assert_eq!(field.to_primitive(&cleaned), Value::from("1970-01-12 01:00"));
        assert!(clean(&field, "01/12/1970 01:00").is_err());
    }

    #[test]
    fn test_date() {
        let field = Field::date();
        let expected = NaiveDate::from_ymd_opt(1970, 1, 12).unwrap();
        assert_eq!(clean(&field, "1970-01-12").unwrap(), Value::Date(expected));
        assert_eq!(message(clean(&field, "foo")), "Please enter a valid date.");
        assert_eq!(field.to_primitive(&Value::Date(expected)), Value::from("1970-01-12"));
    }

    #[test]
    fn test_choice() {
        let field = Field::choice([1, 2, 3]);
        assert_eq!(clean(&field, "1").unwrap(), Value::Int(1));
        assert_eq!(message(clean(&field, "42")), "Please enter a valid choice.");
        assert_eq!(message(clean(&field, "")), "Please enter a valid choice.");

        let field = Field::choice([(0, "inactive"), (1, "active")]);
        assert_eq!(clean(&field, "0").unwrap(), Value::Int(0));

        let optional = Field::choice([("", "Nothing"), ("1", "Something")]).required(false);
        assert_eq!(clean(&optional, "").unwrap(), Value::Null);
    }

    #[test]
    fn test_set_choices_on_copy() {
        let field = Field::choice(Vec::<Choice>::new());
        let mut copy = field.clone();
        copy.set_choices(["happy", "unhappy"]);
        assert_eq!(clean(&copy, "happy").unwrap(), Value::from("happy"));
        assert!(clean(&field, "happy").is_err());
    }

    #[test]
    fn test_multi_choice() {
        let field = Field::multi_choice([1, 2, 3]).max_size(2);
        assert_eq!(
            clean(&field, vec!["1", "3"]).unwrap(),
            Value::from(vec![1, 3])
        );
        assert_eq!(message(clean(&field, vec!["4"])), "\"4\" is not a valid choice");
        assert_eq!(
            message(clean(&field, vec!["1", "2", "3"])),
            "Please provide no more than 2 items."
        );
        assert_eq!(clean(&field, Value::Null).unwrap(), Value::List(vec![]));

        let required = Field::multi_choice(["a"]).min_size(1);
        assert!(required.is_required());
        assert_eq!(message(clean(&required, Value::Null)), "Please provide at least 1 item.");
        assert_eq!(
            field.to_primitive(&Value::from(vec![1, 3])),
            Value::from(vec!["1", "3"])
        );
    }

    #[test]
    fn test_integer() {
        let field = Field::integer().min_value(0.0).max_value(99.0);
        assert_eq!(clean(&field, "13").unwrap(), Value::Int(13));
        assert_eq!(clean(&field, " 13 ").unwrap(), Value::Int(13));
        assert_eq!(message(clean(&field, "thirteen")), "Please enter a whole number.");
        assert_eq!(
            message(clean(&field, "193")),
            "Ensure this value is less than or equal to 99."
        );
        assert_eq!(
            message(clean(&field, "-1")),
            "Ensure this value is greater than or equal to 0."
        );
        assert_eq!(clean(&field, "").unwrap(), Value::Null);
        assert_eq!(field.to_primitive(&Value::Int(13)), Value::from("13"));
        assert_eq!(field.to_primitive(&Value::Null), Value::from(""));
    }

    #[test]
    fn test_float() {
        let field = Field::float().min_value(0.0).max_value(99.9);
        assert_eq!(clean(&field, "13").unwrap(), Value::Float(13.0));
        assert_eq!(
            message(clean(&field, "thirteen")),
            "Please enter a floating-point number."
        );
        assert_eq!(
            message(clean(&field, 101)),
            "Ensure this value is less than or equal to 99.9."
        );
    }

    #[test]
    fn test_boolean() {
        let field = Field::boolean();
        assert_eq!(clean(&field, "1").unwrap(), Value::Bool(true));
        assert_eq!(clean(&field, "").unwrap(), Value::Bool(false));
        assert_eq!(clean(&field, "False").unwrap(), Value::Bool(false));
        assert_eq!(clean(&field, Value::Null).unwrap(), Value::Bool(false));
        assert_eq!(field.to_primitive(&Value::Bool(true)), Value::from("True"));
        assert_eq!(field.to_primitive(&Value::Null), Value::from("False"));
        assert!(field.validate_on_omission());
    }

    #[test]
    fn test_mapping_collects_child_errors() {
        let field = Field::mapping([
            ("name", Field::text().required(true)),
            ("age", Field::integer()),
        ]);
        let err = clean(&field, value_map! { "name" => "", "age" => "x" }).unwrap_err();
        let errors = err.unpack(None);
        assert_eq!(errors[&Some("name".to_string())], ["This field is required."]);
        assert_eq!(errors[&Some("age".to_string())], ["Please enter a whole number."]);

        assert_eq!(
            clean(&field, "not a dict").unwrap_err().unpack(None).len(),
            1
        );
    }

    #[test]
    fn test_multiple() {
        let field = Field::multiple(Field::integer());
        assert_eq!(clean(&field, vec!["1", "2", "3"]).unwrap(), Value::from(vec![1, 2, 3]));

        let err = clean(&field, vec!["1", "x"]).unwrap_err();
        assert_eq!(
            err.unpack(Some("ints"))[&Some("ints.1".to_string())],
            ["Please enter a whole number."]
        );
    }

    #[test]
    fn test_multiple_of_named_keys_uses_the_keys() {
        let field = Field::multiple(Field::text());
        let submitted = value_map! { "a" => "x", "b" => "y" };
        assert_eq!(clean(&field, submitted.clone()).unwrap(), Value::from(vec!["a", "b"]));
        assert_eq!(field.to_primitive(&submitted), Value::from(vec!["a", "b"]));
    }

    #[test]
    fn test_multiple_sizes() {
        let field = Field::multiple(Field::text()).min_size(2).max_size(3);
        assert_eq!(message(clean(&field, vec!["a"])), "Please provide at least 2 items.");
        assert_eq!(
            message(clean(&field, vec!["a", "b", "c", "d"])),
            "Please provide no more than 3 items."
        );
        assert!(field.multiple_choices());
        assert!(!Field::multiple(Field::text()).max_size(1).multiple_choices());
    }

    #[test]
    fn test_sentinel_rows_are_skipped() {
        let field = Field::multiple(Field::mapping([
            ("name", Field::text().required(true)),
            ("count", Field::integer().required(true).sentinel(true)),
        ]));
        let rows = Value::from(vec![
            value_map! { "name" => "apples", "count" => "3" },
            value_map! { "name" => "", "count" => "" },
            value_map! { "name" => "pears", "count" => "x" },
        ]);
        let err = clean(&field, rows).unwrap_err().unpack(None);
        assert_eq!(err.len(), 1);
        assert!(err.contains_key(&Some("2.count".to_string())));
    }

    #[test]
    fn test_comma_separated() {
        let field = Field::comma_separated(Field::integer());
        assert_eq!(clean(&field, "1, 2, 3").unwrap(), Value::from(vec![1, 2, 3]));
        assert_eq!(clean(&field, " , ").unwrap(), Value::List(vec![]));
        assert_eq!(field.to_primitive(&Value::from(vec![1, 2])), Value::from("1, 2"));
        assert_eq!(field.to_primitive(&Value::Null), Value::from(""));
        assert_eq!(field.widget_type(), WidgetType::TextInput);

        let piped = Field::comma_separated(Field::text()).separator("|");
        assert_eq!(clean(&piped, "a|b").unwrap(), Value::from(vec!["a", "b"]));
        assert_eq!(piped.to_primitive(&Value::from(vec!["a", "b"])), Value::from("a| b"));
    }

    #[test]
    fn test_line_separated() {
        let field = Field::line_separated(Field::integer());
        assert_eq!(clean(&field, "1\n2\r\n\n3").unwrap(), Value::from(vec![1, 2, 3]));
        assert_eq!(field.to_primitive(&Value::from(vec![1, 2])), Value::from("1\n2"));
        assert_eq!(field.widget_type(), WidgetType::Textarea);
    }

    #[test]
    fn test_validators_skip_empty_values() {
        let field = Field::text().validator(crate::validators::Email);
        assert!(clean(&field, "").is_ok());
        assert!(clean(&field, "nope").is_err());
        assert!(clean(&field, "jane@example.com").is_ok());
    }

    #[test]
    fn test_choice_list() {
        assert_eq!(Field::boolean().choice_list().len(), 2);
        let list = Field::multiple(Field::choice([("a", "A")]));
        assert_eq!(list.choice_list(), vec![Choice::new("a", "A")]);
        assert!(Field::text().choice_list().is_empty());
    }
}
