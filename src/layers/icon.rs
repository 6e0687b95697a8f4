//! Image glyphs for the host marker (distinct from the synchronized label)

use crate::{
    core::{config::IconOptions, constants::ICON_IMAGE_TAG},
    layers::label::pixels,
    traits::{ElementHandle, Host},
    OverlayError, Result,
};
use serde_json::Value;

/// Extracts an icon URL, rejecting anything that is not a JSON string
pub fn icon_url(url: &Value) -> Result<&str> {
    url.as_str()
        .ok_or_else(|| OverlayError::InvalidIcon(url.to_string()))
}

/// Builds an `<img>` node for `url`, sized and classed per `options`
pub fn build_icon_element<H: Host>(host: &H, url: &str, options: &IconOptions) -> Result<H::Element> {
    let image = host.create_element(ICON_IMAGE_TAG)?;
    image.set_attribute("src", url);

    if let Some(width) = options.width.filter(|w| *w > 0.0) {
        image.set_style_property("width", &pixels(width));
    }
    if let Some(height) = options.height.filter(|h| *h > 0.0) {
        image.set_style_property("height", &pixels(height));
    }
    if let Some(class_name) = options.class_name.as_deref().filter(|c| !c.is_empty()) {
        image.set_class_name(class_name);
    }

    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::headless::HeadlessHost;
    use serde_json::json;

    #[test]
    fn test_icon_url() {
        assert_eq!(icon_url(&json!("pin.png")).unwrap(), "pin.png");
        assert!(matches!(icon_url(&json!(123)), Err(OverlayError::InvalidIcon(v)) if v == "123"));
        assert!(icon_url(&Value::Null).is_err());
    }

    #[test]
    fn test_build_icon_element() {
        let host = HeadlessHost::new();
        let options = IconOptions::sized(40.0, 0.0).with_class("pin");
        let image = build_icon_element(&host, "pin.png", &options).unwrap();

        assert_eq!(image.tag(), "img");
        assert_eq!(image.attribute("src").as_deref(), Some("pin.png"));
        assert_eq!(image.style("width").as_deref(), Some("40px"));
        assert_eq!(image.style("height"), None);
        assert_eq!(image.class_name(), "pin");
    }

    #[test]
    fn test_build_icon_element_without_options() {
        let host = HeadlessHost::new();
        let image = build_icon_element(&host, "pin.png", &IconOptions::default()).unwrap();

        assert_eq!(image.style("width"), None);
        assert_eq!(image.class_name(), "");
    }
}
