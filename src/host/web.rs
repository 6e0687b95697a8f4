//! Google Maps JavaScript API host
//!
//! Binds the overlay to `google.maps.OverlayView` and
//! `google.maps.marker.AdvancedMarkerElement`, with labels as real DOM nodes.
//! [`WasmLabelMarker`] exposes the overlay to JavaScript callers.

use crate::{
    core::{
        config::{IconOptions, LabeledMarkerOptions, StyleMap},
        geo::{LatLng, Point},
    },
    input::events::EventKind,
    layers::{label::css_property_name, marker::LabeledMarkerOverlay},
    traits::{
        ElementHandle, Host, MarkerEvent, MarkerEventSource, MarkerHandle, MarkerSpec,
        OverlayView, Projection, RenderLifecycle,
    },
    OverlayError, Result,
};
use js_sys::{Function, Object, Reflect};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::cell::RefCell;
use std::rc::Weak;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::HtmlElement;

/// Raw `google.maps` bindings
pub mod sys {
    use wasm_bindgen::prelude::*;

    #[wasm_bindgen]
    extern "C" {
        #[wasm_bindgen(js_namespace = ["google", "maps"])]
        #[derive(Debug, Clone, PartialEq)]
        pub type Map;

        #[wasm_bindgen(js_namespace = ["google", "maps"])]
        #[derive(Debug, Clone)]
        pub type LatLng;

        #[wasm_bindgen(constructor, js_namespace = ["google", "maps"])]
        pub fn new(lat: f64, lng: f64) -> LatLng;

        #[wasm_bindgen(js_namespace = ["google", "maps"])]
        #[derive(Debug, Clone)]
        pub type OverlayView;

        #[wasm_bindgen(constructor, js_namespace = ["google", "maps"])]
        pub fn new() -> OverlayView;

        #[wasm_bindgen(method, js_name = setMap)]
        pub fn set_map(this: &OverlayView, map: &JsValue);

        #[wasm_bindgen(method, js_name = getProjection)]
        pub fn get_projection(this: &OverlayView) -> Option<MapCanvasProjection>;

        #[wasm_bindgen(method, js_name = getPanes)]
        pub fn get_panes(this: &OverlayView) -> Option<MapPanes>;

        #[derive(Debug, Clone)]
        pub type MapCanvasProjection;

        #[wasm_bindgen(method, js_name = fromLatLngToDivPixel)]
        pub fn from_lat_lng_to_div_pixel(
            this: &MapCanvasProjection,
            lat_lng: &LatLng,
        ) -> Option<Point>;

        #[derive(Debug, Clone)]
        pub type Point;

        #[wasm_bindgen(method, getter)]
        pub fn x(this: &Point) -> f64;

        #[wasm_bindgen(method, getter)]
        pub fn y(this: &Point) -> f64;

        #[derive(Debug, Clone)]
        pub type MapPanes;

        #[wasm_bindgen(method, getter = overlayMouseTarget)]
        pub fn overlay_mouse_target(this: &MapPanes) -> web_sys::Element;

        #[wasm_bindgen(js_namespace = ["google", "maps", "marker"])]
        #[derive(Debug, Clone)]
        pub type AdvancedMarkerElement;

        #[wasm_bindgen(constructor, js_namespace = ["google", "maps", "marker"])]
        pub fn new(options: &js_sys::Object) -> AdvancedMarkerElement;

        #[wasm_bindgen(method, setter)]
        pub fn set_position(this: &AdvancedMarkerElement, position: &LatLng);

        #[wasm_bindgen(method, setter)]
        pub fn set_content(this: &AdvancedMarkerElement, content: &web_sys::Element);

        #[wasm_bindgen(method, setter = gmpDraggable)]
        pub fn set_gmp_draggable(this: &AdvancedMarkerElement, draggable: bool);

        #[wasm_bindgen(method, getter)]
        pub fn map(this: &AdvancedMarkerElement) -> Option<Map>;

        #[wasm_bindgen(method, setter)]
        pub fn set_map(this: &AdvancedMarkerElement, map: &JsValue);

        #[wasm_bindgen(method, js_name = addListener)]
        pub fn add_listener(
            this: &AdvancedMarkerElement,
            event: &str,
            handler: &js_sys::Function,
        ) -> JsValue;
    }
}

fn js_lat_lng(lat_lng: LatLng) -> sys::LatLng {
    sys::LatLng::new(lat_lng.lat, lat_lng.lng)
}

fn js_map(map: Option<&sys::Map>) -> JsValue {
    map.map(|map| JsValue::from(map.clone()))
        .unwrap_or(JsValue::NULL)
}

fn set_option(target: &Object, key: &str, value: JsValue) {
    if Reflect::set(target, &JsValue::from_str(key), &value).is_err() {
        log::warn!("Failed to set marker option '{}'", key);
    }
}

/// Reads `lat`/`lng` from a `google.maps.LatLng` or a `{lat, lng}` literal
fn read_lat_lng(value: &JsValue) -> Option<LatLng> {
    fn coordinate(value: &JsValue, key: &str) -> Option<f64> {
        let field = Reflect::get(value, &JsValue::from_str(key)).ok()?;
        match field.dyn_ref::<Function>() {
            Some(getter) => getter.call0(value).ok()?.as_f64(),
            None => field.as_f64(),
        }
    }

    if !value.is_object() {
        return None;
    }
    Some(LatLng::new(coordinate(value, "lat")?, coordinate(value, "lng")?))
}

/// `log` backend writing to the browser console
struct ConsoleLogger;

static CONSOLE_LOGGER: ConsoleLogger = ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = JsValue::from_str(&console_line(record));
        match record.level() {
            Level::Error => web_sys::console::error_1(&line),
            Level::Warn => web_sys::console::warn_1(&line),
            Level::Info => web_sys::console::info_1(&line),
            Level::Debug | Level::Trace => web_sys::console::debug_1(&line),
        }
    }

    fn flush(&self) {}
}

fn console_line(record: &Record) -> String {
    format!("[{} {}] {}", record.level(), record.target(), record.args())
}

/// Routes `log` output to the console unless the page already installed a logger
fn init_console_logging() {
    if log::set_logger(&CONSOLE_LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Info);
    }
}

/// Parses a `google.maps.LatLng` or `{lat, lng}` literal from its JSON form
fn position_from_json(value: serde_json::Value) -> Result<LatLng> {
    Ok(serde_json::from_value(value)?)
}

/// Browser host. Construct once at startup; it checks that a document and the
/// Maps API are present.
#[derive(Debug, Clone)]
pub struct WebHost {
    document: web_sys::Document,
}

impl WebHost {
    pub fn new() -> Result<Self> {
        #[cfg(target_arch = "wasm32")]
        console_error_panic_hook::set_once();
        init_console_logging();

        let window = web_sys::window()
            .ok_or_else(|| OverlayError::HostUnavailable("no browser window".to_string()))?;
        let document = window
            .document()
            .ok_or_else(|| OverlayError::HostUnavailable("no document".to_string()))?;

        let maps = Reflect::get(&window, &JsValue::from_str("google"))
            .ok()
            .filter(JsValue::is_object)
            .and_then(|google| Reflect::get(&google, &JsValue::from_str("maps")).ok())
            .filter(JsValue::is_object);
        if maps.is_none() {
            return Err(OverlayError::HostUnavailable(
                "Google Maps API not detected; load the API script first".to_string(),
            ));
        }

        Ok(Self { document })
    }
}

impl Host for WebHost {
    type Map = sys::Map;
    type Element = WebElement;
    type Event = WebMarkerEvent;
    type Marker = WebMarker;
    type View = WebOverlayView;

    fn create_element(&self, tag: &str) -> Result<WebElement> {
        let element = self
            .document
            .create_element(tag)
            .map_err(|e| OverlayError::Dom(format!("create <{}>: {:?}", tag, e)))?;
        element
            .dyn_into::<HtmlElement>()
            .map(WebElement)
            .map_err(|_| OverlayError::Dom(format!("<{}> is not an HTML element", tag)))
    }

    fn create_marker(&self, spec: MarkerSpec<'_, sys::Map, WebElement>) -> WebMarker {
        let options = Object::new();
        set_option(&options, "map", js_map(spec.map));
        set_option(&options, "position", js_lat_lng(spec.position).into());
        set_option(&options, "title", JsValue::from_str(spec.title));
        set_option(
            &options,
            "content",
            spec.content
                .map(|content| JsValue::from(content.0.clone()))
                .unwrap_or(JsValue::NULL),
        );
        set_option(&options, "draggable", JsValue::from_bool(spec.draggable));
        set_option(&options, "gmpDraggable", JsValue::from_bool(spec.draggable));
        set_option(&options, "gmpClickable", JsValue::from_bool(spec.clickable));

        WebMarker {
            inner: sys::AdvancedMarkerElement::new(&options),
            listeners: RefCell::new(Vec::new()),
        }
    }

    fn create_overlay_view(&self, lifecycle: Weak<dyn RenderLifecycle>) -> WebOverlayView {
        let view = sys::OverlayView::new();
        let hooks: [(&str, fn(&dyn RenderLifecycle)); 3] = [
            ("onAdd", |overlay| overlay.on_attach()),
            ("draw", |overlay| overlay.on_render()),
            ("onRemove", |overlay| overlay.on_detach()),
        ];

        let hooks = hooks
            .into_iter()
            .map(|(name, hook)| {
                let lifecycle = lifecycle.clone();
                let closure = Closure::wrap(Box::new(move || {
                    if let Some(overlay) = lifecycle.upgrade() {
                        hook(&*overlay);
                    }
                }) as Box<dyn FnMut()>);

                if Reflect::set(&view, &JsValue::from_str(name), closure.as_ref()).is_err() {
                    log::warn!("Failed to install overlay hook '{}'", name);
                }
                closure
            })
            .collect();

        WebOverlayView { inner: view, _hooks: hooks }
    }
}

/// An `HTMLElement`
#[derive(Debug, Clone, PartialEq)]
pub struct WebElement(pub HtmlElement);

impl ElementHandle for WebElement {
    fn set_class_name(&self, class_name: &str) {
        self.0.set_class_name(class_name);
    }

    fn set_inner_html(&self, markup: &str) {
        self.0.set_inner_html(markup);
    }

    fn set_style_property(&self, property: &str, value: &str) {
        if let Err(e) = self.0.style().set_property(&css_property_name(property), value) {
            log::warn!("Failed to set style '{}': {:?}", property, e);
        }
    }

    fn set_attribute(&self, name: &str, value: &str) {
        if let Err(e) = self.0.set_attribute(name, value) {
            log::warn!("Failed to set attribute '{}': {:?}", name, e);
        }
    }

    fn add_click_listener(&self, mut handler: Box<dyn FnMut()>) {
        let closure = Closure::wrap(
            Box::new(move |_: web_sys::Event| handler()) as Box<dyn FnMut(web_sys::Event)>
        );
        if let Err(e) = self
            .0
            .add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())
        {
            log::warn!("Failed to listen for label clicks: {:?}", e);
        }
        // Lives as long as the element.
        closure.forget();
    }

    fn remove_from_parent(&self) {
        self.0.remove();
    }
}

/// Payload of an `AdvancedMarkerElement` event, passed through untouched
#[derive(Debug, Clone)]
pub struct WebMarkerEvent(pub JsValue);

impl MarkerEvent for WebMarkerEvent {
    fn lat_lng(&self) -> Option<LatLng> {
        let lat_lng = Reflect::get(&self.0, &JsValue::from_str("latLng")).ok()?;
        read_lat_lng(&lat_lng)
    }
}

pub struct WebMarker {
    inner: sys::AdvancedMarkerElement,
    listeners: RefCell<Vec<Closure<dyn FnMut(JsValue)>>>,
}

impl WebMarker {
    pub fn element(&self) -> &sys::AdvancedMarkerElement {
        &self.inner
    }
}

impl MarkerHandle for WebMarker {
    type Map = sys::Map;
    type Element = WebElement;

    fn set_position(&self, position: LatLng) {
        self.inner.set_position(&js_lat_lng(position));
    }

    fn set_content(&self, content: &WebElement) {
        self.inner.set_content(&content.0);
    }

    fn set_draggable(&self, draggable: bool) {
        self.inner.set_gmp_draggable(draggable);
    }

    fn map(&self) -> Option<sys::Map> {
        self.inner.map()
    }

    fn set_map(&self, map: Option<&sys::Map>) {
        self.inner.set_map(&js_map(map));
    }
}

impl MarkerEventSource for WebMarker {
    type Event = WebMarkerEvent;

    fn subscribe(&self, kind: EventKind, mut handler: Box<dyn FnMut(&WebMarkerEvent)>) {
        let closure = Closure::wrap(Box::new(move |event: JsValue| {
            handler(&WebMarkerEvent(event));
        }) as Box<dyn FnMut(JsValue)>);

        self.inner
            .add_listener(kind.as_str(), closure.as_ref().unchecked_ref());
        self.listeners.borrow_mut().push(closure);
    }
}

/// `google.maps.OverlayView` with the lifecycle hooks installed
pub struct WebOverlayView {
    inner: sys::OverlayView,
    _hooks: Vec<Closure<dyn FnMut()>>,
}

impl OverlayView for WebOverlayView {
    type Map = sys::Map;
    type Element = WebElement;
    type Projection = WebProjection;

    fn set_map(&self, map: Option<&sys::Map>) {
        self.inner.set_map(&js_map(map));
    }

    fn projection(&self) -> Option<WebProjection> {
        self.inner.get_projection().map(WebProjection)
    }

    fn append_to_overlay_mouse_target(&self, element: &WebElement) {
        match self.inner.get_panes() {
            Some(panes) => {
                if let Err(e) = panes.overlay_mouse_target().append_child(&element.0) {
                    log::warn!("Failed to insert label: {:?}", e);
                }
            }
            None => log::warn!("Map panes unavailable; label not inserted"),
        }
    }
}

pub struct WebProjection(sys::MapCanvasProjection);

impl Projection for WebProjection {
    fn from_lat_lng_to_div_pixel(&self, lat_lng: LatLng) -> Option<Point> {
        let pixel = self.0.from_lat_lng_to_div_pixel(&js_lat_lng(lat_lng))?;
        Some(Point::new(pixel.x(), pixel.y()))
    }
}

fn to_js(error: OverlayError) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn to_json(value: &JsValue) -> std::result::Result<serde_json::Value, JsValue> {
    if value.is_undefined() {
        return Ok(serde_json::Value::Null);
    }
    let text: String = js_sys::JSON::stringify(value)?.into();
    serde_json::from_str(&text).map_err(|e| to_js(OverlayError::from(e)))
}

/// Labeled marker for JavaScript callers
#[wasm_bindgen]
pub struct WasmLabelMarker {
    inner: LabeledMarkerOverlay<WebHost>,
}

#[wasm_bindgen]
impl WasmLabelMarker {
    /// `options` uses the camelCase option names; pass the map separately
    #[wasm_bindgen(constructor)]
    pub fn new(map: Option<sys::Map>, options: JsValue) -> std::result::Result<WasmLabelMarker, JsValue> {
        let host = WebHost::new().map_err(to_js)?;
        let mut options =
            LabeledMarkerOptions::<sys::Map>::from_json(to_json(&options)?).map_err(to_js)?;
        options.map = map;

        Ok(WasmLabelMarker {
            inner: LabeledMarkerOverlay::new(host, options),
        })
    }

    /// Accepts a `google.maps.LatLng` or a `{lat, lng}` literal
    #[wasm_bindgen(js_name = setPosition)]
    pub fn set_position(&self, position: JsValue) -> std::result::Result<(), JsValue> {
        let position = position_from_json(to_json(&position)?).map_err(to_js)?;
        self.inner.set_position(position);
        Ok(())
    }

    #[wasm_bindgen(js_name = getPosition)]
    pub fn get_position(&self) -> sys::LatLng {
        js_lat_lng(self.inner.position())
    }

    #[wasm_bindgen(js_name = getDraggable)]
    pub fn get_draggable(&self) -> bool {
        self.inner.draggable()
    }

    #[wasm_bindgen(js_name = setDraggable)]
    pub fn set_draggable(&self, draggable: bool) {
        self.inner.set_draggable(draggable);
    }

    #[wasm_bindgen(js_name = getVisible)]
    pub fn get_visible(&self) -> bool {
        self.inner.is_visible()
    }

    #[wasm_bindgen(js_name = setLabelContent)]
    pub fn set_label_content(&self, markup: String) {
        self.inner.set_label_content(markup);
    }

    #[wasm_bindgen(js_name = setLabelClass)]
    pub fn set_label_class(&self, class_name: String) {
        self.inner.set_label_class(class_name);
    }

    #[wasm_bindgen(js_name = setLabelStyle)]
    pub fn set_label_style(&self, style: JsValue) -> std::result::Result<(), JsValue> {
        let style: StyleMap = serde_json::from_value(to_json(&style)?)
            .map_err(|e| to_js(OverlayError::from(e)))?;
        self.inner.set_label_style(style);
        Ok(())
    }

    #[wasm_bindgen(js_name = setLabelVisible)]
    pub fn set_label_visible(&self, visible: bool) {
        self.inner.set_label_visible(visible);
    }

    #[wasm_bindgen(js_name = setIcon)]
    pub fn set_icon(&self, url: JsValue, options: JsValue) -> std::result::Result<(), JsValue> {
        let options = match to_json(&options)? {
            serde_json::Value::Null => IconOptions::default(),
            value => serde_json::from_value(value).map_err(|e| to_js(OverlayError::from(e)))?,
        };
        self.inner.set_icon(to_json(&url)?, options);
        Ok(())
    }

    #[wasm_bindgen(js_name = setMap)]
    pub fn set_map(&self, map: Option<sys::Map>) {
        self.inner.set_map(map.as_ref());
    }

    /// Calls `handler` with the host event (or `undefined` for label clicks)
    #[wasm_bindgen(js_name = addListener)]
    pub fn add_listener(&self, event: &str, handler: Function) -> std::result::Result<(), JsValue> {
        let kind: EventKind = event.parse().map_err(to_js)?;
        self.inner.add_listener(kind, move |payload| {
            let argument = payload
                .map(|event| event.0.clone())
                .unwrap_or(JsValue::UNDEFINED);
            if let Err(e) = handler.call1(&JsValue::NULL, &argument) {
                log::warn!("'{}' listener threw: {:?}", kind, e);
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_console_line_format() {
        let line = console_line(
            &Record::builder()
                .level(Level::Error)
                .target("label_marker::layers::marker")
                .args(format_args!("icon url must be a string, got 123"))
                .build(),
        );
        assert_eq!(
            line,
            "[ERROR label_marker::layers::marker] icon url must be a string, got 123"
        );
    }

    #[test]
    fn test_console_logger_respects_max_level() {
        log::set_max_level(LevelFilter::Warn);
        let error = Metadata::builder().level(Level::Error).build();
        let debug = Metadata::builder().level(Level::Debug).build();

        assert!(CONSOLE_LOGGER.enabled(&error));
        assert!(!CONSOLE_LOGGER.enabled(&debug));
    }

    #[test]
    fn test_position_from_lat_lng_json() {
        // google.maps.LatLng serializes through its toJSON() as a literal
        let position = position_from_json(json!({ "lat": 37.7749, "lng": -122.4194 })).unwrap();
        assert_eq!(position, LatLng::new(37.7749, -122.4194));

        assert!(matches!(
            position_from_json(json!([37.7749, -122.4194])),
            Err(OverlayError::Config(_))
        ));
        assert!(position_from_json(serde_json::Value::Null).is_err());
    }
}
