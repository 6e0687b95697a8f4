//! Construction options for [`LabeledMarkerOverlay`](crate::LabeledMarkerOverlay)
//!
//! Options can be built in code with the `with_*` methods or parsed from the
//! camelCase JSON shape used by the JavaScript marker APIs. The host map handle
//! is never part of the JSON; attach it with [`LabeledMarkerOptions::with_map`].

use crate::{core::geo::LatLng, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// CSS property name to value. Properties are applied in key order.
pub type StyleMap = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(serialize = "", deserialize = ""))]
pub struct LabeledMarkerOptions<M = ()> {
    /// Host map to attach to; `None` leaves the overlay detached
    #[serde(skip)]
    pub map: Option<M>,
    pub position: LatLng,
    #[serde(default)]
    pub title: String,
    /// Markup for a custom marker glyph
    #[serde(default)]
    pub icon_html: Option<String>,
    #[serde(default)]
    pub draggable: bool,
    /// Image URL for the marker glyph
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub icon_width: Option<f64>,
    #[serde(default)]
    pub icon_height: Option<f64>,
    #[serde(default)]
    pub icon_class: Option<String>,
    #[serde(default)]
    pub label_class: String,
    #[serde(default)]
    pub label_style: StyleMap,
    /// Trusted markup; callers sanitize it
    #[serde(default)]
    pub label_content: String,
}

impl<M> LabeledMarkerOptions<M> {
    pub fn new(position: impl Into<LatLng>) -> Self {
        Self {
            map: None,
            position: position.into(),
            title: String::new(),
            icon_html: None,
            draggable: false,
            icon: None,
            icon_width: None,
            icon_height: None,
            icon_class: None,
            label_class: String::new(),
            label_style: StyleMap::new(),
            label_content: String::new(),
        }
    }

    /// Parses options from a JSON value such as
    /// `{"position": {"lat": 1, "lng": 2}, "labelContent": "<b>A</b>"}`
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_map(mut self, map: M) -> Self {
        self.map = Some(map);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_icon_html(mut self, markup: impl Into<String>) -> Self {
        self.icon_html = Some(markup.into());
        self
    }

    pub fn with_draggable(mut self, draggable: bool) -> Self {
        self.draggable = draggable;
        self
    }

    pub fn with_icon(mut self, url: impl Into<String>, options: IconOptions) -> Self {
        self.icon = Some(url.into());
        self.icon_width = options.width;
        self.icon_height = options.height;
        self.icon_class = options.class_name;
        self
    }

    pub fn with_label_class(mut self, class_name: impl Into<String>) -> Self {
        self.label_class = class_name.into();
        self
    }

    pub fn with_label_style<K, V>(mut self, style: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.label_style
            .extend(style.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn with_label_content(mut self, markup: impl Into<String>) -> Self {
        self.label_content = markup.into();
        self
    }

    /// Icon sizing taken from `iconWidth`, `iconHeight` and `iconClass`
    pub fn icon_options(&self) -> IconOptions {
        IconOptions {
            width: self.icon_width,
            height: self.icon_height,
            class_name: self.icon_class.clone(),
        }
    }
}

/// Sizing and class for an image icon
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IconOptions {
    /// Width in pixels, applied when positive
    pub width: Option<f64>,
    /// Height in pixels, applied when positive
    pub height: Option<f64>,
    /// Class name, applied when non-empty
    pub class_name: Option<String>,
}

impl IconOptions {
    pub fn sized(width: f64, height: f64) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            class_name: None,
        }
    }

    pub fn with_class(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geo::Point;
    use crate::host::headless::HeadlessMap;
    use crate::OverlayError;
    use serde_json::json;

    #[test]
    fn test_defaults_from_json() {
        let options: LabeledMarkerOptions =
            LabeledMarkerOptions::from_json(json!({ "position": { "lat": 1.5, "lng": 2.5 } })).unwrap();

        assert_eq!(options.position, LatLng::new(1.5, 2.5));
        assert_eq!(options.title, "");
        assert!(!options.draggable);
        assert!(options.icon.is_none());
        assert!(options.label_style.is_empty());
        assert!(options.map.is_none());
    }

    #[test]
    fn test_camel_case_keys() {
        let options: LabeledMarkerOptions = LabeledMarkerOptions::from_json_str(
            r#"{
                "position": {"lat": 0, "lng": 0},
                "title": "Depot",
                "draggable": true,
                "icon": "pin.png",
                "iconWidth": 32,
                "iconHeight": 40,
                "iconClass": "pin",
                "labelClass": "tag",
                "labelStyle": {"color": "red"},
                "labelContent": "<b>7</b>"
            }"#,
        )
        .unwrap();

        assert_eq!(options.title, "Depot");
        assert!(options.draggable);
        assert_eq!(options.icon.as_deref(), Some("pin.png"));
        assert_eq!(
            options.icon_options(),
            IconOptions::sized(32.0, 40.0).with_class("pin")
        );
        assert_eq!(options.label_class, "tag");
        assert_eq!(options.label_style.get("color").map(String::as_str), Some("red"));
        assert_eq!(options.label_content, "<b>7</b>");
    }

    #[test]
    fn test_missing_position_is_config_error() {
        let result = LabeledMarkerOptions::<()>::from_json(json!({ "title": "nowhere" }));
        assert!(matches!(result, Err(OverlayError::Config(_))));
    }

    #[test]
    fn test_parse_for_host_map() {
        let map = HeadlessMap::new(LatLng::new(0.0, 0.0), 3.0, Point::new(256.0, 256.0));
        let options = LabeledMarkerOptions::<HeadlessMap>::from_json_str(
            r#"{"position": {"lat": 4, "lng": 5}, "labelContent": "A"}"#,
        )
        .unwrap();
        assert!(options.map.is_none());

        let options = options.with_map(map.clone());
        assert_eq!(options.map, Some(map));
        assert_eq!(options.position, LatLng::new(4.0, 5.0));
        assert_eq!(options.label_content, "A");
    }

    #[test]
    fn test_builder() {
        let options = LabeledMarkerOptions::new((10.0, 20.0))
            .with_map("map-a")
            .with_title("A")
            .with_label_style([("color", "red")])
            .with_label_style([("fontSize", "12px")]);

        assert_eq!(options.map, Some("map-a"));
        assert_eq!(options.position, LatLng::new(10.0, 20.0));
        assert_eq!(options.label_style.len(), 2);
    }
}
