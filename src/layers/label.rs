use crate::{core::config::StyleMap, traits::ElementHandle};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Presentation state of the label, kept independently of the DOM node so a
/// detach/attach cycle rebuilds the same label
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelPresentation {
    pub content: String,
    pub class_name: String,
    pub style: StyleMap,
}

impl LabelPresentation {
    pub fn new(content: impl Into<String>, class_name: impl Into<String>, style: StyleMap) -> Self {
        Self {
            content: content.into(),
            class_name: class_name.into(),
            style,
        }
    }

    /// Writes class, style and content onto `element`
    pub fn apply_to<E: ElementHandle>(&self, element: &E) {
        element.set_class_name(&self.class_name);
        apply_style(element, &self.style);
        element.set_inner_html(&self.content);
    }

    /// Adds or overwrites properties; properties absent from `style` are kept
    pub fn merge_style(&mut self, style: StyleMap) {
        self.style.extend(style);
    }
}

pub fn apply_style<E: ElementHandle>(element: &E, style: &StyleMap) {
    for (property, value) in style {
        element.set_style_property(property, value);
    }
}

/// CSS length in pixels, e.g. `40px` or `12.5px`
pub fn pixels(value: f64) -> String {
    format!("{}px", value)
}

/// Converts a script-style property name (`fontSize`) to its CSS spelling
/// (`font-size`). Names already in CSS form are returned unchanged.
pub fn css_property_name(property: &str) -> Cow<'_, str> {
    if !property.bytes().any(|b| b.is_ascii_uppercase()) {
        return Cow::Borrowed(property);
    }

    let mut css = String::with_capacity(property.len() + 4);
    for c in property.chars() {
        if c.is_ascii_uppercase() {
            css.push('-');
            css.push(c.to_ascii_lowercase());
        } else {
            css.push(c);
        }
    }
    Cow::Owned(css)
}
