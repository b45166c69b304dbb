//! A small HTML builder.
//!
//! Widgets render through [`HtmlBuilder`], which knows about boolean and
//! empty elements and can emit either HTML or XHTML. Everything that is not
//! already [`Markup`] gets escaped on the way in.

use std::fmt;

use crate::value::Value;

/// Attributes that are rendered without a value when set.
const BOOLEAN_ATTRIBUTES: &[&str] = &[
    "selected", "checked", "compact", "declare", "defer", "disabled", "ismap", "multiple",
    "nohref", "noresize", "noshade", "nowrap",
];

/// Elements that have no closing tag.
const EMPTY_ELEMENTS: &[&str] = &[
    "area", "base", "basefont", "br", "col", "frame", "hr", "img", "input", "isindex", "link",
    "meta", "param",
];

/// A string that is safe to embed into HTML as is.
///
/// # Examples
///
/// ```
/// use fungiform_core::html::{escape, Markup};
///
/// let mut m = Markup::new("<b>");
/// m.push_str("1 < 2");
/// m.push(Markup::new("</b>"));
/// assert_eq!(m.as_str(), "<b>1 &lt; 2</b>");
/// assert_eq!(escape("\"x\" & y").as_str(), "&#34;x&#34; &amp; y");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Markup(String);

impl Markup {
    /// Wraps a string that is already known to be safe.
    pub fn new(html: impl Into<String>) -> Self {
        Self(html.into())
    }

    /// The empty markup.
    pub const fn empty() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Appends other markup unescaped.
    pub fn push(&mut self, other: Self) {
        self.0.push_str(&other.0);
    }

    /// Appends text, escaping it.
    pub fn push_str(&mut self, text: &str) {
        self.0.push_str(escape(text).as_str());
    }

    /// Concatenates several pieces of markup.
    pub fn concat<I: IntoIterator<Item = Self>>(parts: I) -> Self {
        Self(parts.into_iter().map(|m| m.0).collect())
    }

    /// Joins several pieces of markup with a separator.
    pub fn join<I: IntoIterator<Item = Self>>(parts: I, separator: &str) -> Self {
        Self(
            parts
                .into_iter()
                .map(|m| m.0)
                .collect::<Vec<_>>()
                .join(separator),
        )
    }
}

impl fmt::Display for Markup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Markup> for String {
    fn from(markup: Markup) -> Self {
        markup.0
    }
}

/// Escapes `&`, `<`, `>` and `"` for use in text and attribute values.
pub fn escape(text: &str) -> Markup {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            c => out.push(c),
        }
    }
    Markup(out)
}

/// Escapes the textual form of a value. Null escapes to the empty string.
pub fn escape_value(value: &Value) -> Markup {
    escape(&value.to_text())
}

/// The value of a single attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Text(String),
    Flag(bool),
    /// Present in the list but never rendered.
    Omit,
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        Self::Flag(v)
    }
}

impl From<Option<String>> for AttrValue {
    fn from(v: Option<String>) -> Self {
        v.map_or(Self::Omit, Self::Text)
    }
}

/// An ordered list of attributes. Setting an existing name keeps its
/// position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attrs {
    items: Vec<(String, AttrValue)>,
}

impl Attrs {
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Sets an attribute, consuming and returning `self` for chaining.
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<AttrValue>) {
        let value = value.into();
        if let Some(slot) = self.items.iter_mut().find(|(n, _)| n == name) {
            slot.1 = value;
        } else {
            self.items.push((name.to_string(), value));
        }
    }

    /// Sets an attribute only if it is not present yet.
    pub fn set_default(&mut self, name: &str, value: impl Into<AttrValue>) {
        if !self.contains(name) {
            self.items.push((name.to_string(), value.into()));
        }
    }

    pub fn flag(&mut self, name: &str, on: bool) {
        self.set(name, AttrValue::Flag(on));
    }

    pub fn remove(&mut self, name: &str) -> Option<AttrValue> {
        let pos = self.items.iter().position(|(n, _)| n == name)?;
        Some(self.items.remove(pos).1)
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.items.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.iter().any(|(n, _)| n == name)
    }

    /// Adds a CSS class. Existing `class` and `class_` values are merged into
    /// a single `class` attribute.
    pub fn add_class(&mut self, class: &str) {
        let mut classes: Vec<String> = Vec::new();
        for key in ["class", "class_"] {
            if let Some(AttrValue::Text(existing)) = self.remove(key) {
                if !existing.is_empty() {
                    classes.push(existing);
                }
            }
        }
        classes.push(class.to_string());
        self.set("class", classes.join(" "));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.items.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<K: Into<String>, V: Into<AttrValue>> FromIterator<(K, V)> for Attrs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Self::new();
        for (name, value) in iter {
            attrs.set(&name.into(), value);
        }
        attrs
    }
}

/// The markup flavor produced by [`HtmlBuilder`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Html,
    Xhtml,
}

impl std::str::FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "html" => Ok(Self::Html),
            "xhtml" => Ok(Self::Xhtml),
            other => Err(format!("unknown html dialect '{other}'")),
        }
    }
}

/// Renders elements in a given [`Dialect`].
///
/// ```
/// use fungiform_core::html::{Attrs, Dialect, HtmlBuilder};
///
/// let html = HtmlBuilder::new(Dialect::Html);
/// let attrs = Attrs::new().with("type", "checkbox").with("checked", true);
/// assert_eq!(html.element("input", &attrs, []).as_str(), r#"<input type="checkbox" checked>"#);
///
/// let xhtml = HtmlBuilder::new(Dialect::Xhtml);
/// assert_eq!(xhtml.element("br", &Attrs::new(), []).as_str(), "<br />");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HtmlBuilder {
    pub dialect: Dialect,
}

impl HtmlBuilder {
    pub const fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// Escaped text content.
    pub fn text(&self, text: &str) -> Markup {
        escape(text)
    }

    /// Renders a single element with the given children.
    pub fn element<I>(&self, tag: &str, attrs: &Attrs, children: I) -> Markup
    where
        I: IntoIterator<Item = Markup>,
    {
        let xhtml = self.dialect == Dialect::Xhtml;
        let mut out = String::new();
        out.push('<');
        out.push_str(tag);

        for (name, value) in attrs.iter() {
            let name = name.strip_suffix('_').unwrap_or(name);
            let is_boolean = BOOLEAN_ATTRIBUTES.contains(&name);
            let text = match value {
                AttrValue::Omit => continue,
                AttrValue::Flag(false) if is_boolean => continue,
                AttrValue::Flag(true) if is_boolean => {
                    out.push(' ');
                    out.push_str(name);
                    if xhtml {
                        out.push_str("=\"");
                        out.push_str(name);
                        out.push('"');
                    }
                    continue;
                }
                AttrValue::Flag(flag) => String::from(if *flag { "True" } else { "False" }),
                AttrValue::Text(text) => text.clone(),
            };
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(escape(&text).as_str());
            out.push('"');
        }

        let children: Vec<Markup> = children.into_iter().collect();
        if children.is_empty() && EMPTY_ELEMENTS.contains(&tag) {
            out.push_str(if xhtml { " />" } else { ">" });
            return Markup(out);
        }

        out.push('>');
        let body = Markup::concat(children);
        if xhtml && matches!(tag, "script" | "style") && !body.is_empty() {
            out.push_str("/*<![CDATA[*/");
            out.push_str(body.as_str());
            out.push_str("/*]]>*/");
        } else {
            out.push_str(body.as_str());
        }
        out.push_str("</");
        out.push_str(tag);
        out.push('>');
        Markup(out)
    }

    /// Renders an element whose only child is escaped text.
    pub fn text_element(&self, tag: &str, attrs: &Attrs, text: &str) -> Markup {
        self.element(tag, attrs, [escape(text)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<script>alert("x & y")</script>"#).as_str(),
            "&lt;script&gt;alert(&#34;x &amp; y&#34;)&lt;/script&gt;"
        );
        assert_eq!(escape("it's").as_str(), "it's");
    }

    #[test]
    fn test_escape_value() {
        assert_eq!(escape_value(&Value::Null).as_str(), "");
        assert_eq!(escape_value(&Value::Int(4)).as_str(), "4");
        assert_eq!(escape_value(&Value::from("a<b")).as_str(), "a&lt;b");
    }

    #[test]
    fn test_markup_join_and_concat() {
        let parts = vec![Markup::new("<li>a</li>"), Markup::new("<li>b</li>")];
        assert_eq!(Markup::join(parts.clone(), "\n").as_str(), "<li>a</li>\n<li>b</li>");
        assert_eq!(Markup::concat(parts).as_str(), "<li>a</li><li>b</li>");
    }

    #[test]
    fn test_attrs_keep_insertion_order() {
        let mut attrs = Attrs::new().with("type", "text").with("id", "f_x");
        attrs.set("type", "hidden");
        attrs.set_default("id", "other");
        attrs.set_default("name", "x");
        let names: Vec<_> = attrs.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["type", "id", "name"]);
        assert_eq!(attrs.get("type"), Some(&AttrValue::from("hidden")));
        assert_eq!(attrs.get("id"), Some(&AttrValue::from("f_x")));
    }

    #[test]
    fn test_add_class_merges() {
        let mut attrs = Attrs::new().with("class_", "foo").with("class", "bar");
        attrs.add_class("errors");
        assert_eq!(attrs.get("class"), Some(&AttrValue::from("bar foo errors")));
        assert!(!attrs.contains("class_"));
    }

    #[test]
    fn test_boolean_attributes() {
        let html = HtmlBuilder::new(Dialect::Html);
        let attrs = Attrs::new()
            .with("selected", false)
            .with("multiple", true)
            .with("value", "1");
        assert_eq!(
            html.element("select", &attrs, []).as_str(),
            r#"<select multiple value="1"></select>"#
        );

        let xhtml = HtmlBuilder::new(Dialect::Xhtml);
        assert_eq!(
            xhtml.element("option", &Attrs::new().with("selected", true), [xhtml.text("a")]).as_str(),
            r#"<option selected="selected">a</option>"#
        );
    }

    #[test]
    fn test_non_boolean_flag_and_omit() {
        let html = HtmlBuilder::default();
        let attrs = Attrs::new()
            .with("data-x", true)
            .with("title", AttrValue::Omit)
            .with("for_", "f_id");
        assert_eq!(
            html.element("label", &attrs, [html.text("A & B")]).as_str(),
            r#"<label data-x="True" for="f_id">A &amp; B</label>"#
        );
    }

    #[test]
    fn test_empty_elements() {
        let html = HtmlBuilder::new(Dialect::Html);
        assert_eq!(html.element("br", &Attrs::new(), []).as_str(), "<br>");
        assert_eq!(html.element("div", &Attrs::new(), []).as_str(), "<div></div>");
    }

    #[test]
    fn test_script_cdata_in_xhtml() {
        let xhtml = HtmlBuilder::new(Dialect::Xhtml);
        let script = xhtml.element("script", &Attrs::new(), [Markup::new("var a = 1 < 2;")]);
        assert_eq!(
            script.as_str(),
            "<script>/*<![CDATA[*/var a = 1 < 2;/*]]>*/</script>"
        );
        let html = HtmlBuilder::new(Dialect::Html);
        assert_eq!(
            html.element("script", &Attrs::new(), [Markup::new("a < b")]).as_str(),
            "<script>a < b</script>"
        );
    }

    #[test]
    fn test_dialect_from_str() {
        assert_eq!("XHTML".parse::<Dialect>(), Ok(Dialect::Xhtml));
        assert!("xml".parse::<Dialect>().is_err());
    }
}
