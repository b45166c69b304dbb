//! Widget system for rendering fields as HTML.
//!
//! A [`BoundWidget`] pairs a field with its dotted name, its current value
//! and the error map of the form. What it renders depends on the field's
//! [`WidgetType`]: mappings become `<dl>` lists of their subwidgets, lists
//! become `<ul>` items, choice groups become radio buttons or checkboxes.
//! [`FormWidget`] wraps the root of a form and adds the `<form>` element,
//! the hidden protection fields and the submit button.

use std::fmt;

use fungiform_core::error::{ErrorMap, FormResult};
use fungiform_core::html::{AttrValue, Attrs, HtmlBuilder, Markup};
use fungiform_core::i18n::Translations;
use fungiform_core::utils::make_name;
use fungiform_core::value::Value;
use fungiform_security::recaptcha::recaptcha_html;

use crate::errors::ErrorList;
use crate::fields::{Choice, Field};
use crate::form::{FormBase, CSRF_TOKEN_FIELD, REDIRECT_TARGET_FIELD};

/// Enumerates the built-in widgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetType {
    /// `<input type="text">`.
    TextInput,
    /// `<input type="password">`, never showing the value.
    PasswordInput,
    /// `<input type="hidden">`.
    HiddenInput,
    /// `<textarea>`.
    Textarea,
    /// A single `<input type="checkbox">`.
    Checkbox,
    /// `<select>`, with `multiple` for multi value fields.
    SelectBox,
    /// A list of `<input type="radio">` elements.
    RadioButtonGroup,
    /// A list of `<input type="checkbox">` elements.
    CheckboxGroup,
    /// A `<dl>` of the subfields of a mapping.
    Mapping,
    /// A `<ul>` of the items of a list.
    List,
}

impl fmt::Display for WidgetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TextInput => "TextInput",
            Self::PasswordInput => "PasswordInput",
            Self::HiddenInput => "HiddenInput",
            Self::Textarea => "Textarea",
            Self::Checkbox => "Checkbox",
            Self::SelectBox => "SelectBox",
            Self::RadioButtonGroup => "RadioButtonGroup",
            Self::CheckboxGroup => "CheckboxGroup",
            Self::Mapping => "MappingWidget",
            Self::List => "ListWidget",
        };
        write!(f, "{name}")
    }
}

/// What every widget of one form shares.
#[derive(Clone, Copy)]
pub struct WidgetContext<'a> {
    pub html: HtmlBuilder,
    pub translations: &'a dyn Translations,
    pub errors: &'a ErrorMap,
}

impl fmt::Debug for WidgetContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetContext")
            .field("html", &self.html)
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}

/// Options for rendering choice groups and lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOptions {
    /// Render nothing instead of an empty list.
    pub hide_empty: bool,
    /// Shown by an empty choice group instead of "No choices.".
    pub empty_msg: Option<String>,
    /// Leave out the labels of choice group items.
    pub nolabel: bool,
    /// Empty rows a list widget appends for new items. Trailing empty
    /// items count against it.
    pub extra_rows: usize,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            hide_empty: false,
            empty_msg: None,
            nolabel: false,
            extra_rows: 1,
        }
    }
}

/// Applies `extra` on top of `base`. Attributes already in `base` keep
/// their position.
fn merge(mut base: Attrs, extra: &Attrs) -> Attrs {
    for (name, value) in extra.iter() {
        base.set(name, value.clone());
    }
    base
}

fn is_choice_selected(field: &Field, value: &Value, key: &Value) -> bool {
    if field.multiple_choices() {
        value.force_list().iter().any(|v| v.matches_choice(key))
    } else {
        value.matches_choice(key)
    }
}

fn collect_hidden(html: HtmlBuilder, value: &Value, name: Option<&str>, out: &mut Vec<Markup>) {
    match value {
        Value::List(items) => {
            for (index, item) in items.iter().enumerate() {
                collect_hidden(html, item, Some(&make_name(name, &index.to_string())), out);
            }
        }
        Value::Map(map) => {
            for (key, item) in map {
                collect_hidden(html, item, Some(&make_name(name, key)), out);
            }
        }
        other => {
            let attrs = Attrs::new()
                .with("type", "hidden")
                .with("name", AttrValue::from(name.map(str::to_string)))
                .with("value", other.to_text());
            out.push(html.element("input", &attrs, []));
        }
    }
}

/// A field bound to a name, a value and the errors of its form.
#[derive(Clone)]
pub struct BoundWidget<'a> {
    field: &'a Field,
    name: Option<String>,
    value: Value,
    ctx: WidgetContext<'a>,
}

impl fmt::Debug for BoundWidget<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundWidget")
            .field("type", &self.field.widget_type())
            .field("name", &self.name)
            .field("value", &self.value)
            .finish_non_exhaustive()
    }
}

impl<'a> BoundWidget<'a> {
    pub fn new(field: &'a Field, name: Option<String>, value: Value, ctx: WidgetContext<'a>) -> Self {
        Self {
            field,
            name,
            value,
            ctx,
        }
    }

    pub const fn field(&self) -> &'a Field {
        self.field
    }

    pub const fn widget_type(&self) -> WidgetType {
        self.field.widget_type()
    }

    /// The full dotted name, `None` for the root of a form.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The last part of the dotted name.
    pub fn localname(&self) -> Option<&str> {
        self.name
            .as_deref()
            .map(|name| name.rsplit_once('.').map_or(name, |(_, local)| local))
    }

    /// The proposed `id` attribute: `f_` plus the name with dots replaced by
    /// double underscores.
    pub fn id(&self) -> Option<String> {
        self.name
            .as_ref()
            .map(|name| format!("f_{}", name.replace('.', "__")))
    }

    /// The value converted back into what a user would submit.
    pub fn value(&self) -> Value {
        self.field.to_primitive(&self.value)
    }

    pub fn label(&self) -> Option<Markup> {
        self.label_with(&Attrs::new())
    }

    /// A `<label>` pointing at this widget, if the field has a label.
    pub fn label_with(&self, attrs: &Attrs) -> Option<Markup> {
        let text = self.field.label.as_deref()?;
        let attrs = merge(Attrs::new().with("for", AttrValue::from(self.id())), attrs);
        Some(self.ctx.html.text_element("label", &attrs, text))
    }

    pub fn help_text(&self) -> Option<&'a str> {
        self.field.help_text.as_deref()
    }

    /// The errors reported for exactly this name.
    pub fn errors(&self) -> ErrorList {
        ErrorList::new(
            self.ctx.html,
            self.ctx.errors.get(&self.name).into_iter().flatten().cloned(),
        )
    }

    /// The errors of this widget and of all widgets below it. For the root
    /// of a form that is every error.
    pub fn all_errors(&self) -> ErrorList {
        let messages = self
            .ctx
            .errors
            .iter()
            .filter(|(key, _)| match (&self.name, key) {
                (None, _) => true,
                (Some(name), Some(key)) => {
                    key == name || key.strip_prefix(name.as_str()).is_some_and(|rest| rest.starts_with('.'))
                }
                (Some(_), None) => false,
            })
            .flat_map(|(_, messages)| messages.iter().cloned());
        ErrorList::new(self.ctx.html, messages)
    }

    /// Text areas often hold several items, so they show the errors of all
    /// of them.
    pub fn default_display_errors(&self) -> ErrorList {
        match self.widget_type() {
            WidgetType::Textarea => self.all_errors(),
            _ => self.errors(),
        }
    }

    /// Whether a list should treat this item as empty.
    pub fn empty_as_item(&self) -> bool {
        self.field.empty_as_item(&self.value())
    }

    /// Hidden inputs carrying the current value, one per leaf of nested
    /// values.
    pub fn hidden(&self) -> Markup {
        let mut fields = Vec::new();
        collect_hidden(self.ctx.html, &self.value(), self.name.as_deref(), &mut fields);
        Markup::join(fields, "\n")
    }

    // ── Rendering ────────────────────────────────────────────────────

    /// Renders the bare widget.
    pub fn render(&self, attrs: &Attrs) -> Markup {
        match self.widget_type() {
            WidgetType::TextInput => self.render_input("text", false, attrs),
            WidgetType::PasswordInput => self.render_input("password", true, attrs),
            WidgetType::HiddenInput => self.render_input("hidden", false, attrs),
            WidgetType::Textarea => self.render_textarea(attrs),
            WidgetType::Checkbox => self.render_checkbox(attrs),
            WidgetType::SelectBox => self.render_select(attrs),
            WidgetType::RadioButtonGroup | WidgetType::CheckboxGroup | WidgetType::List => {
                self.as_ul(attrs)
            }
            WidgetType::Mapping => self.as_dl(attrs),
        }
    }

    /// The default display: the widget followed by its error list.
    /// Mappings and lists show their items, which carry their own errors.
    pub fn display(&self, attrs: &Attrs) -> Markup {
        match self.widget_type() {
            WidgetType::Mapping => self.as_dl(attrs),
            WidgetType::List => self.as_ul(attrs),
            _ => {
                let mut out = self.render(attrs);
                out.push(self.default_display_errors().display());
                out
            }
        }
    }

    /// A `<dt>` with the label and a `<dd>` with the widget, plus a second
    /// `<dd class="explanation">` for the help text.
    pub fn as_dd(&self, attrs: &Attrs) -> Markup {
        let html = self.ctx.html;
        let mut out = Markup::empty();
        if let Some(label) = self.label() {
            out.push(html.element("dt", &Attrs::new(), [label]));
        }
        if self.widget_type() == WidgetType::Checkbox {
            out.push(html.element("dd", &Attrs::new(), [self.with_help_text(attrs)]));
            return out;
        }
        out.push(html.element("dd", &Attrs::new(), [self.display(attrs)]));
        if let Some(help) = self.help_text() {
            out.push(html.text_element("dd", &Attrs::new().with("class", "explanation"), help));
        }
        out
    }

    fn render_input(&self, input_type: &str, hide_value: bool, attrs: &Attrs) -> Markup {
        let value = if hide_value {
            String::new()
        } else {
            self.value().to_text()
        };
        let base = Attrs::new()
            .with("type", input_type)
            .with("id", AttrValue::from(self.id()))
            .with("value", value)
            .with("name", AttrValue::from(self.name.clone()));
        self.ctx.html.element("input", &merge(base, attrs), [])
    }

    fn render_textarea(&self, attrs: &Attrs) -> Markup {
        let base = Attrs::new()
            .with("id", AttrValue::from(self.id()))
            .with("name", AttrValue::from(self.name.clone()))
            .with("rows", "8")
            .with("cols", "40");
        self.ctx
            .html
            .text_element("textarea", &merge(base, attrs), &self.value().to_text())
    }

    // ── Checkbox ─────────────────────────────────────────────────────

    /// A checkbox is checked unless its value is `False`.
    pub fn checked(&self) -> bool {
        self.value().as_str() != Some("False")
    }

    fn render_checkbox(&self, attrs: &Attrs) -> Markup {
        let base = Attrs::new()
            .with("type", "checkbox")
            .with("id", AttrValue::from(self.id()))
            .with("name", AttrValue::from(self.name.clone()))
            .with("checked", self.checked());
        self.ctx.html.element("input", &merge(base, attrs), [])
    }

    /// The checkbox with its help text as a label next to it.
    pub fn with_help_text(&self, attrs: &Attrs) -> Markup {
        let mut out = self.display(attrs);
        if let Some(help) = self.help_text() {
            let label_attrs = Attrs::new()
                .with("class", "explanation")
                .with("for", AttrValue::from(self.id()));
            out.push(Markup::new(" "));
            out.push(self.ctx.html.text_element("label", &label_attrs, help));
        }
        out
    }

    /// The checkbox as a list item, label and help text included.
    pub fn as_li(&self, attrs: &Attrs) -> Markup {
        let html = self.ctx.html;
        let mut parts = vec![self.render(attrs)];
        if let Some(label) = self.label() {
            parts.push(Markup::new(" "));
            parts.push(label);
        }
        if let Some(help) = self.help_text() {
            parts.push(html.text_element("div", &Attrs::new().with("class", "explanation"), help));
        }
        parts.push(self.default_display_errors().display());
        html.element("li", &Attrs::new(), parts)
    }

    // ── Select box ───────────────────────────────────────────────────

    fn render_select(&self, attrs: &Attrs) -> Markup {
        let html = self.ctx.html;
        let value = self.value();
        let options = self.field.choice_list().into_iter().map(|choice| {
            let selected = is_choice_selected(self.field, &value, &choice.key);
            let option_attrs = Attrs::new()
                .with("value", choice.key.to_text())
                .with("selected", selected);
            html.text_element("option", &option_attrs, &choice.label)
        });
        let base = Attrs::new()
            .with("id", AttrValue::from(self.id()))
            .with("name", AttrValue::from(self.name.clone()))
            .with("multiple", self.field.multiple_choices());
        html.element("select", &merge(base, attrs), options)
    }

    // ── Choice groups ────────────────────────────────────────────────

    /// The radio buttons or checkboxes of a choice group.
    pub fn choices(&self) -> Vec<ChoiceWidget> {
        let input_type = match self.widget_type() {
            WidgetType::RadioButtonGroup => "radio",
            _ => "checkbox",
        };
        let value = self.value();
        self.field
            .choice_list()
            .into_iter()
            .map(|Choice { key, label }| {
                let key_text = key.to_text();
                let id = match self.id() {
                    Some(id) => format!("{id}_{key_text}"),
                    None => format!("f_{key_text}"),
                };
                ChoiceWidget {
                    input_type,
                    name: self.name.clone(),
                    id,
                    checked: is_choice_selected(self.field, &value, &key),
                    value: key_text,
                    label,
                    html: self.ctx.html,
                }
            })
            .collect()
    }

    /// The group member for one choice key.
    pub fn choice(&self, key: impl Into<Value>) -> Option<ChoiceWidget> {
        let key = key.into().to_text();
        self.choices().into_iter().find(|choice| choice.value == key)
    }

    pub fn as_table(&self, attrs: &Attrs) -> Markup {
        let html = self.ctx.html;
        let rows = self.choices().into_iter().map(|choice| {
            html.element(
                "tr",
                &Attrs::new(),
                [
                    html.element("td", &Attrs::new(), [choice.render(&Attrs::new())]),
                    html.element("td", &Attrs::new(), [choice.label()]),
                ],
            )
        });
        let mut attrs = attrs.clone();
        attrs.set_default("id", AttrValue::from(self.id()));
        html.element("table", &attrs, rows)
    }

    fn group_as_list(&self, tag: &str, attrs: &Attrs, options: &ListOptions) -> Markup {
        let html = self.ctx.html;
        let choices = self.choices();
        if options.hide_empty && choices.is_empty() {
            return Markup::empty();
        }
        let mut attrs = attrs.clone();
        attrs.set_default("id", AttrValue::from(self.id()));
        let class = attrs
            .remove("class_")
            .or_else(|| attrs.remove("class"))
            .unwrap_or_else(|| AttrValue::from("choicegroup"));
        attrs.set("class", class);

        let mut items: Vec<Markup> = choices
            .iter()
            .map(|choice| {
                let label = if options.nolabel {
                    Markup::empty()
                } else {
                    choice.label()
                };
                html.element(
                    "li",
                    &Attrs::new(),
                    [choice.render(&Attrs::new()), Markup::new(" "), label],
                )
            })
            .collect();
        if items.is_empty() {
            let msg = options.empty_msg.as_deref().unwrap_or("No choices.");
            items.push(html.text_element("li", &Attrs::new(), &self.ctx.translations.gettext(msg)));
        }
        html.element(tag, &attrs, items)
    }

    // ── Mappings ─────────────────────────────────────────────────────

    /// The widget of a subfield.
    pub fn field_widget(&self, name: &str) -> Option<Self> {
        let field = self.field.subfield(name)?;
        let value = self.value.get(name).cloned().unwrap_or_default();
        Some(Self::new(
            field,
            Some(make_name(self.name.as_deref(), name)),
            value,
            self.ctx,
        ))
    }

    /// The widgets of all subfields in declaration order.
    pub fn field_widgets(&self) -> Vec<Self> {
        self.field
            .subfields()
            .iter()
            .filter_map(|(name, _)| self.field_widget(name))
            .collect()
    }

    pub fn as_dl(&self, attrs: &Attrs) -> Markup {
        let mut attrs = attrs.clone();
        attrs.add_class("mapping");
        let items = self
            .field_widgets()
            .into_iter()
            .map(|widget| widget.as_dd(&Attrs::new()));
        self.ctx.html.element("dl", &attrs, items)
    }

    // ── Lists ────────────────────────────────────────────────────────

    /// The number of items of a list value.
    pub fn len(&self) -> usize {
        self.value.force_list().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The widget of a list item. Indexes past the end give a widget
    /// without a value, used for adding new items.
    pub fn item(&self, index: usize) -> Option<Self> {
        let field = self.field.item_field()?;
        let value = self.value.force_list().into_iter().nth(index).unwrap_or_default();
        Some(Self::new(
            field,
            Some(make_name(self.name.as_deref(), &index.to_string())),
            value,
            self.ctx,
        ))
    }

    pub fn items(&self) -> Vec<Self> {
        (0..self.len()).filter_map(|index| self.item(index)).collect()
    }

    fn list_as_list(&self, tag: &str, attrs: &Attrs, options: &ListOptions) -> Markup {
        let html = self.ctx.html;
        let len = self.len();
        if options.hide_empty && len == 0 {
            return Markup::empty();
        }
        let mut attrs = attrs.clone();
        attrs.add_class("multiple-items");

        let mut items = Vec::with_capacity(len + options.extra_rows);
        let mut empty_streak = 0;
        for widget in self.items() {
            empty_streak = if widget.empty_as_item() { empty_streak + 1 } else { 0 };
            items.push(html.element("li", &Attrs::new(), [widget.display(&Attrs::new())]));
        }
        for offset in 0..options.extra_rows.saturating_sub(empty_streak) {
            if let Some(widget) = self.item(len + offset) {
                items.push(html.element("li", &Attrs::new(), [widget.display(&Attrs::new())]));
            }
        }
        html.element(tag, &attrs, items)
    }

    // ── Lists and choice groups ──────────────────────────────────────

    pub fn as_ul(&self, attrs: &Attrs) -> Markup {
        self.as_ul_with(attrs, &ListOptions::default())
    }

    pub fn as_ol(&self, attrs: &Attrs) -> Markup {
        self.as_ol_with(attrs, &ListOptions::default())
    }

    pub fn as_ul_with(&self, attrs: &Attrs, options: &ListOptions) -> Markup {
        self.as_list("ul", attrs, options)
    }

    pub fn as_ol_with(&self, attrs: &Attrs, options: &ListOptions) -> Markup {
        self.as_list("ol", attrs, options)
    }

    fn as_list(&self, tag: &str, attrs: &Attrs, options: &ListOptions) -> Markup {
        match self.widget_type() {
            WidgetType::List => self.list_as_list(tag, attrs, options),
            _ => self.group_as_list(tag, attrs, options),
        }
    }
}

/// One radio button or checkbox of a choice group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceWidget {
    input_type: &'static str,
    name: Option<String>,
    id: String,
    value: String,
    label: String,
    checked: bool,
    html: HtmlBuilder,
}

impl ChoiceWidget {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub const fn checked(&self) -> bool {
        self.checked
    }

    pub fn render(&self, attrs: &Attrs) -> Markup {
        let base = Attrs::new()
            .with("type", self.input_type)
            .with("id", self.id.as_str())
            .with("value", self.value.as_str())
            .with("name", AttrValue::from(self.name.clone()))
            .with("checked", self.checked);
        self.html.element("input", &merge(base, attrs), [])
    }

    pub fn label(&self) -> Markup {
        self.html
            .text_element("label", &Attrs::new().with("for", self.id.as_str()), &self.label)
    }
}

/// The widget of a whole form.
pub struct FormWidget<'a> {
    form: &'a FormBase,
    root: BoundWidget<'a>,
}

impl fmt::Debug for FormWidget<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormWidget")
            .field("form", &self.form.name())
            .field("root", &self.root)
            .finish()
    }
}

impl<'a> FormWidget<'a> {
    pub(crate) fn new(form: &'a FormBase, root: BoundWidget<'a>) -> Self {
        Self { form, root }
    }

    /// The mapping widget of the form's fields.
    pub const fn root(&self) -> &BoundWidget<'a> {
        &self.root
    }

    pub fn field(&self, name: &str) -> Option<BoundWidget<'a>> {
        self.root.field_widget(name)
    }

    pub fn fields(&self) -> Vec<BoundWidget<'a>> {
        self.root.field_widgets()
    }

    /// Errors that belong to the form as a whole.
    pub fn errors(&self) -> ErrorList {
        self.root.errors()
    }

    pub fn all_errors(&self) -> ErrorList {
        self.root.all_errors()
    }

    pub fn as_dl(&self, attrs: &Attrs) -> Markup {
        self.root.as_dl(attrs)
    }

    /// The special hidden fields as name and value pairs: the CSRF token
    /// and the redirect target. Forms without request info have none.
    ///
    /// # Errors
    ///
    /// Fails when the form is CSRF protected but has no session.
    pub fn hidden_field_pairs(&self) -> FormResult<Vec<(&'static str, String)>> {
        let mut fields = Vec::new();
        if self.form.request_info().is_none() {
            return Ok(fields);
        }
        if self.form.csrf_protected() {
            fields.push((CSRF_TOKEN_FIELD, self.form.csrf_token()?));
        }
        if self.form.options().redirect_tracking {
            if let Some(target) = self.form.redirect_target()? {
                fields.push((REDIRECT_TARGET_FIELD, target));
            }
        }
        Ok(fields)
    }

    /// The special hidden fields as inputs.
    pub fn hidden_fields(&self) -> FormResult<Markup> {
        let html = self.root.ctx.html;
        Ok(Markup::concat(self.hidden_field_pairs()?.into_iter().map(
            |(name, value)| {
                let attrs = Attrs::new()
                    .with("type", "hidden")
                    .with("name", name)
                    .with("value", value);
                html.element("input", &attrs, [])
            },
        )))
    }

    /// The captcha of a captcha protected form.
    pub fn captcha(&self) -> Option<Markup> {
        let options = self.form.options();
        if !options.captcha_protected {
            return None;
        }
        Some(recaptcha_html(
            &self.root.ctx.html,
            options.recaptcha_public_key.as_deref().unwrap_or_default(),
            options.recaptcha_use_ssl,
            None,
            self.root.ctx.translations,
        ))
    }

    pub fn csrf_token(&self) -> FormResult<String> {
        self.form.csrf_token()
    }

    pub fn redirect_target(&self) -> FormResult<Option<String>> {
        self.form.redirect_target()
    }

    /// A `<div class="actions">` with a submit button labelled `label`, or
    /// the translated "Submit".
    pub fn default_actions(&self, label: Option<&str>, attrs: &Attrs) -> Markup {
        let html = self.root.ctx.html;
        let label = label.map_or_else(
            || self.root.ctx.translations.gettext("Submit"),
            str::to_string,
        );
        let mut attrs = attrs.clone();
        attrs.set_default("class", "actions");
        let button = Attrs::new().with("type", "submit").with("value", label);
        html.element("div", &attrs, [html.element("input", &button, [])])
    }

    /// Renders the `<form>` with all fields and the default actions.
    ///
    /// `method` defaults to the form's default method in lower case. With
    /// `with_errors` the form level errors are shown first.
    ///
    /// # Errors
    ///
    /// See [`hidden_field_pairs`](Self::hidden_field_pairs).
    pub fn render(&self, method: Option<&str>, attrs: &Attrs, with_errors: bool) -> FormResult<Markup> {
        let mut body = self.as_dl(&Attrs::new());
        body.push(self.default_actions(None, &Attrs::new()));
        self.render_body(body, method, attrs, with_errors)
    }

    /// Like [`render`](Self::render) but with a custom body inside the
    /// `<form>` element.
    pub fn render_body(
        &self,
        body: Markup,
        method: Option<&str>,
        attrs: &Attrs,
        with_errors: bool,
    ) -> FormResult<Markup> {
        let html = self.root.ctx.html;
        let method = method.map_or_else(
            || self.form.options().default_method.to_lowercase(),
            str::to_string,
        );

        let mut content = Markup::empty();
        if with_errors {
            content.push(self.errors().display());
        }
        let hidden = self.hidden_fields()?;
        if !hidden.is_empty() {
            content.push(html.element(
                "div",
                &Attrs::new().with("style", "display: none"),
                [hidden],
            ));
        }
        content.push(body);

        let base = Attrs::new()
            .with("action", self.form.action())
            .with("method", method);
        Ok(html.element("form", &merge(base, attrs), [content]))
    }

    /// The form rendered with its errors.
    pub fn display(&self) -> FormResult<Markup> {
        self.render(None, &Attrs::new(), true)
    }
}
