//! Rendering of error messages.

use fungiform_core::html::{escape, Attrs, HtmlBuilder, Markup};

/// The messages of one widget, ready to be rendered as a list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorList {
    messages: Vec<String>,
    html: HtmlBuilder,
}

impl ErrorList {
    pub fn new<I, S>(html: HtmlBuilder, messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            messages: messages.into_iter().map(Into::into).collect(),
            html,
        }
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    pub fn as_ul(&self, attrs: &Attrs) -> Markup {
        self.as_list("ul", attrs)
    }

    pub fn as_ol(&self, attrs: &Attrs) -> Markup {
        self.as_list("ol", attrs)
    }

    fn as_list(&self, tag: &str, attrs: &Attrs) -> Markup {
        let items = self
            .messages
            .iter()
            .map(|msg| self.html.element("li", &Attrs::new(), [escape(msg)]));
        self.html.element(tag, attrs, items)
    }

    /// The default display: `<ul class="errors">`, or nothing at all when
    /// there are no errors.
    pub fn display(&self) -> Markup {
        self.display_with(&Attrs::new())
    }

    /// Like [`display`](Self::display) with extra attributes. A `class`
    /// given here replaces `errors`.
    pub fn display_with(&self, attrs: &Attrs) -> Markup {
        if self.is_empty() {
            return Markup::empty();
        }
        let mut attrs = attrs.clone();
        if let Some(class) = attrs.remove("class_") {
            attrs.set_default("class", class);
        }
        attrs.set_default("class", "errors");
        self.as_ul(&attrs)
    }
}

impl<'a> IntoIterator for &'a ErrorList {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
