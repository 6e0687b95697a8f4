//! In-memory map host
//!
//! Models just enough of a browser map SDK to drive a labeled marker without a
//! browser: a Web Mercator camera, an overlay pane, markers that record what
//! was set on them, and DOM-like elements. Lifecycle hooks run from
//! [`HeadlessMap::render_frame`], the way a browser map runs them from its
//! animation frame.

use crate::{
    core::{
        config::StyleMap,
        geo::{LatLng, Point},
        viewport::Viewport,
    },
    input::events::EventKind,
    traits::{
        ElementHandle, Host, MarkerEvent, MarkerEventSource, MarkerHandle, MarkerSpec,
        OverlayView, Projection, RenderLifecycle,
    },
    Result,
};
use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

/// Factory for headless handles
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadlessHost;

impl HeadlessHost {
    pub fn new() -> Self {
        Self
    }
}

impl Host for HeadlessHost {
    type Map = HeadlessMap;
    type Element = HeadlessElement;
    type Event = HeadlessEvent;
    type Marker = HeadlessMarker;
    type View = HeadlessView;

    fn create_element(&self, tag: &str) -> Result<HeadlessElement> {
        Ok(HeadlessElement::new(tag))
    }

    fn create_marker(&self, spec: MarkerSpec<'_, HeadlessMap, HeadlessElement>) -> HeadlessMarker {
        HeadlessMarker::new(spec)
    }

    fn create_overlay_view(&self, lifecycle: Weak<dyn RenderLifecycle>) -> HeadlessView {
        HeadlessView::new(lifecycle)
    }
}

/// Marker event payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadlessEvent {
    #[serde(default)]
    pub lat_lng: Option<LatLng>,
}

impl HeadlessEvent {
    pub fn at(lat_lng: impl Into<LatLng>) -> Self {
        Self {
            lat_lng: Some(lat_lng.into()),
        }
    }
}

impl MarkerEvent for HeadlessEvent {
    fn lat_lng(&self) -> Option<LatLng> {
        self.lat_lng
    }
}

// ---------------------------------------------------------------------------
// Elements
// ---------------------------------------------------------------------------

type ClickListener = Rc<RefCell<Box<dyn FnMut()>>>;

#[derive(Default)]
struct ElementState {
    tag: String,
    class_name: String,
    inner_html: String,
    style: StyleMap,
    attributes: BTreeMap<String, String>,
    parent: Option<Weak<RefCell<Vec<HeadlessElement>>>>,
    click_listeners: Vec<ClickListener>,
}

/// A DOM-like node. Clones are the same node.
#[derive(Clone)]
pub struct HeadlessElement {
    inner: Rc<RefCell<ElementState>>,
}

impl HeadlessElement {
    pub fn new(tag: &str) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ElementState {
                tag: tag.to_string(),
                ..ElementState::default()
            })),
        }
    }

    pub fn tag(&self) -> String {
        self.inner.borrow().tag.clone()
    }

    pub fn class_name(&self) -> String {
        self.inner.borrow().class_name.clone()
    }

    pub fn inner_html(&self) -> String {
        self.inner.borrow().inner_html.clone()
    }

    pub fn style(&self, property: &str) -> Option<String> {
        self.inner.borrow().style.get(property).cloned()
    }

    pub fn style_map(&self) -> StyleMap {
        self.inner.borrow().style.clone()
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.inner.borrow().attributes.get(name).cloned()
    }

    /// Whether the node is currently inside a pane
    pub fn is_connected(&self) -> bool {
        self.inner
            .borrow()
            .parent
            .as_ref()
            .and_then(Weak::upgrade)
            .is_some()
    }

    /// Dispatches a click to every click listener
    pub fn click(&self) {
        let listeners: Vec<ClickListener> = self.inner.borrow().click_listeners.clone();
        for listener in listeners {
            let mut listener = listener.borrow_mut();
            (*listener)();
        }
    }
}

impl PartialEq for HeadlessElement {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for HeadlessElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.borrow();
        f.debug_struct("HeadlessElement")
            .field("tag", &state.tag)
            .field("class_name", &state.class_name)
            .field("inner_html", &state.inner_html)
            .field("style", &state.style)
            .field("attributes", &state.attributes)
            .finish()
    }
}

impl ElementHandle for HeadlessElement {
    fn set_class_name(&self, class_name: &str) {
        self.inner.borrow_mut().class_name = class_name.to_string();
    }

    fn set_inner_html(&self, markup: &str) {
        self.inner.borrow_mut().inner_html = markup.to_string();
    }

    fn set_style_property(&self, property: &str, value: &str) {
        self.inner
            .borrow_mut()
            .style
            .insert(property.to_string(), value.to_string());
    }

    fn set_attribute(&self, name: &str, value: &str) {
        self.inner
            .borrow_mut()
            .attributes
            .insert(name.to_string(), value.to_string());
    }

    fn add_click_listener(&self, handler: Box<dyn FnMut()>) {
        self.inner
            .borrow_mut()
            .click_listeners
            .push(Rc::new(RefCell::new(handler)));
    }

    fn remove_from_parent(&self) {
        let parent = self.inner.borrow_mut().parent.take();
        if let Some(children) = parent.as_ref().and_then(Weak::upgrade) {
            children.borrow_mut().retain(|child| child != self);
        }
    }
}

/// A container of elements, such as a map pane
#[derive(Clone, Default)]
pub struct HeadlessPane {
    children: Rc<RefCell<Vec<HeadlessElement>>>,
}

impl HeadlessPane {
    pub fn append(&self, element: &HeadlessElement) {
        element.remove_from_parent();
        element.inner.borrow_mut().parent = Some(Rc::downgrade(&self.children));
        self.children.borrow_mut().push(element.clone());
    }

    pub fn children(&self) -> Vec<HeadlessElement> {
        self.children.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.children.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for HeadlessPane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.children.borrow().iter()).finish()
    }
}

// ---------------------------------------------------------------------------
// Map and overlay view
// ---------------------------------------------------------------------------

struct MapState {
    viewport: Viewport,
    overlays: Vec<Weak<RefCell<ViewState>>>,
    overlay_mouse_target: HeadlessPane,
}

/// A map with a camera. Clones are the same map.
#[derive(Clone)]
pub struct HeadlessMap {
    inner: Rc<RefCell<MapState>>,
}

impl HeadlessMap {
    pub fn new(center: LatLng, zoom: f64, size: Point) -> Self {
        Self {
            inner: Rc::new(RefCell::new(MapState {
                viewport: Viewport::new(center, zoom, size),
                overlays: Vec::new(),
                overlay_mouse_target: HeadlessPane::default(),
            })),
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.inner.borrow().viewport.clone()
    }

    pub fn set_center(&self, center: LatLng) {
        self.inner.borrow_mut().viewport.set_center(center);
    }

    pub fn set_zoom(&self, zoom: f64) {
        self.inner.borrow_mut().viewport.set_zoom(zoom);
    }

    /// Moves the map content by `delta` pixels
    pub fn pan_by(&self, delta: Point) {
        self.inner.borrow_mut().viewport.pan(delta);
    }

    pub fn overlay_mouse_target(&self) -> HeadlessPane {
        self.inner.borrow().overlay_mouse_target.clone()
    }

    /// Number of overlays currently on this map
    pub fn overlay_count(&self) -> usize {
        self.inner
            .borrow()
            .overlays
            .iter()
            .filter(|view| view.strong_count() > 0)
            .count()
    }

    /// Attaches overlays added since the last frame, then renders every
    /// overlay on this map
    pub fn render_frame(&self) {
        let overlays: Vec<HeadlessView> = {
            let mut state = self.inner.borrow_mut();
            state.overlays.retain(|view| view.strong_count() > 0);
            state
                .overlays
                .iter()
                .filter_map(Weak::upgrade)
                .map(|inner| HeadlessView { inner })
                .collect()
        };

        for view in overlays {
            view.render(self);
        }
    }

    fn register(&self, view: &HeadlessView) {
        let mut state = self.inner.borrow_mut();
        let known = state
            .overlays
            .iter()
            .any(|other| std::ptr::eq(other.as_ptr(), Rc::as_ptr(&view.inner)));
        if !known {
            state.overlays.push(Rc::downgrade(&view.inner));
        }
    }

    fn unregister(&self, view: &HeadlessView) {
        self.inner
            .borrow_mut()
            .overlays
            .retain(|other| !std::ptr::eq(other.as_ptr(), Rc::as_ptr(&view.inner)));
    }
}

impl PartialEq for HeadlessMap {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for HeadlessMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeadlessMap")
            .field("viewport", &self.inner.borrow().viewport)
            .finish()
    }
}

/// Projection of a map's camera at the time it was taken
#[derive(Debug, Clone)]
pub struct HeadlessProjection {
    viewport: Viewport,
}

impl Projection for HeadlessProjection {
    fn from_lat_lng_to_div_pixel(&self, lat_lng: LatLng) -> Option<Point> {
        Some(self.viewport.lat_lng_to_container_point(&lat_lng))
    }
}

struct ViewState {
    lifecycle: Weak<dyn RenderLifecycle>,
    map: Option<HeadlessMap>,
    attached: bool,
}

/// Overlay primitive driving one [`RenderLifecycle`]
pub struct HeadlessView {
    inner: Rc<RefCell<ViewState>>,
}

impl HeadlessView {
    fn new(lifecycle: Weak<dyn RenderLifecycle>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ViewState {
                lifecycle,
                map: None,
                attached: false,
            })),
        }
    }

    /// Whether `on_attach` has run for the current map
    pub fn is_attached(&self) -> bool {
        self.inner.borrow().attached
    }

    pub fn map(&self) -> Option<HeadlessMap> {
        self.inner.borrow().map.clone()
    }

    fn render(&self, map: &HeadlessMap) {
        let (lifecycle, needs_attach) = {
            let mut state = self.inner.borrow_mut();
            if state.map.as_ref() != Some(map) {
                return;
            }
            let needs_attach = !state.attached;
            state.attached = true;
            (state.lifecycle.clone(), needs_attach)
        };

        let Some(lifecycle) = lifecycle.upgrade() else {
            return;
        };
        if needs_attach {
            lifecycle.on_attach();
        }
        lifecycle.on_render();
    }
}

impl fmt::Debug for HeadlessView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.borrow();
        f.debug_struct("HeadlessView")
            .field("map", &state.map)
            .field("attached", &state.attached)
            .finish()
    }
}

impl OverlayView for HeadlessView {
    type Map = HeadlessMap;
    type Element = HeadlessElement;
    type Projection = HeadlessProjection;

    /// Leaving a map detaches synchronously; joining one attaches on the
    /// map's next frame
    fn set_map(&self, map: Option<&HeadlessMap>) {
        let (previous, was_attached, lifecycle) = {
            let mut state = self.inner.borrow_mut();
            if state.map.as_ref() == map {
                return;
            }
            let was_attached = std::mem::replace(&mut state.attached, false);
            let previous = std::mem::replace(&mut state.map, map.cloned());
            (previous, was_attached, state.lifecycle.clone())
        };

        if let Some(previous) = previous {
            previous.unregister(self);
        }
        if was_attached {
            if let Some(lifecycle) = lifecycle.upgrade() {
                lifecycle.on_detach();
            }
        }
        if let Some(map) = map {
            map.register(self);
        }
    }

    fn projection(&self) -> Option<HeadlessProjection> {
        let state = self.inner.borrow();
        if !state.attached {
            return None;
        }
        state.map.as_ref().map(|map| HeadlessProjection {
            viewport: map.viewport(),
        })
    }

    fn append_to_overlay_mouse_target(&self, element: &HeadlessElement) {
        let map = self.inner.borrow().map.clone();
        match map {
            Some(map) => map.overlay_mouse_target().append(element),
            None => log::warn!("Overlay has no map; label not inserted"),
        }
    }
}

// ---------------------------------------------------------------------------
// Markers
// ---------------------------------------------------------------------------

type MarkerListener = Rc<RefCell<Box<dyn FnMut(&HeadlessEvent)>>>;

struct MarkerState {
    position: LatLng,
    title: String,
    content: Option<HeadlessElement>,
    draggable: bool,
    clickable: bool,
    map: Option<HeadlessMap>,
    listeners: FxHashMap<EventKind, Vec<MarkerListener>>,
}

/// Marker that records what the overlay sets on it. Clones are the same marker.
#[derive(Clone)]
pub struct HeadlessMarker {
    inner: Rc<RefCell<MarkerState>>,
}

impl HeadlessMarker {
    pub fn new(spec: MarkerSpec<'_, HeadlessMap, HeadlessElement>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(MarkerState {
                position: spec.position,
                title: spec.title.to_string(),
                content: spec.content.cloned(),
                draggable: spec.draggable,
                clickable: spec.clickable,
                map: spec.map.cloned(),
                listeners: FxHashMap::default(),
            })),
        }
    }

    pub fn position(&self) -> LatLng {
        self.inner.borrow().position
    }

    pub fn title(&self) -> String {
        self.inner.borrow().title.clone()
    }

    pub fn content(&self) -> Option<HeadlessElement> {
        self.inner.borrow().content.clone()
    }

    pub fn is_draggable(&self) -> bool {
        self.inner.borrow().draggable
    }

    pub fn is_clickable(&self) -> bool {
        self.inner.borrow().clickable
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.inner
            .borrow()
            .listeners
            .get(&kind)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Fires `kind` at every subscriber, as the host would
    pub fn trigger(&self, kind: EventKind, event: &HeadlessEvent) {
        let listeners: Vec<MarkerListener> = self
            .inner
            .borrow()
            .listeners
            .get(&kind)
            .cloned()
            .unwrap_or_default();

        for listener in listeners {
            match listener.try_borrow_mut() {
                Ok(mut listener) => (*listener)(event),
                Err(_) => log::warn!("Skipping re-entrant marker '{}' listener", kind),
            }
        }
    }

    /// Drags the marker along `path`: `dragstart` at the first point, a
    /// `drag` per point, `dragend` at the last point
    pub fn simulate_drag(&self, path: &[LatLng]) {
        let (Some(first), Some(last)) = (path.first(), path.last()) else {
            return;
        };

        self.trigger(EventKind::DragStart, &HeadlessEvent::at(*first));
        for point in path {
            self.inner.borrow_mut().position = *point;
            self.trigger(EventKind::Drag, &HeadlessEvent::at(*point));
        }
        self.trigger(EventKind::DragEnd, &HeadlessEvent::at(*last));
    }
}

impl fmt::Debug for HeadlessMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.borrow();
        f.debug_struct("HeadlessMarker")
            .field("position", &state.position)
            .field("title", &state.title)
            .field("draggable", &state.draggable)
            .field("on_map", &state.map.is_some())
            .finish()
    }
}

impl MarkerHandle for HeadlessMarker {
    type Map = HeadlessMap;
    type Element = HeadlessElement;

    fn set_position(&self, position: LatLng) {
        self.inner.borrow_mut().position = position;
    }

    fn set_content(&self, content: &HeadlessElement) {
        self.inner.borrow_mut().content = Some(content.clone());
    }

    fn set_draggable(&self, draggable: bool) {
        self.inner.borrow_mut().draggable = draggable;
    }

    fn map(&self) -> Option<HeadlessMap> {
        self.inner.borrow().map.clone()
    }

    fn set_map(&self, map: Option<&HeadlessMap>) {
        self.inner.borrow_mut().map = map.cloned();
    }
}

impl MarkerEventSource for HeadlessMarker {
    type Event = HeadlessEvent;

    fn subscribe(&self, kind: EventKind, handler: Box<dyn FnMut(&HeadlessEvent)>) {
        self.inner
            .borrow_mut()
            .listeners
            .entry(kind)
            .or_default()
            .push(Rc::new(RefCell::new(handler)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Recorder {
        calls: RefCell<Vec<&'static str>>,
    }

    impl RenderLifecycle for Recorder {
        fn on_attach(&self) {
            self.calls.borrow_mut().push("attach");
        }

        fn on_render(&self) {
            self.calls.borrow_mut().push("render");
        }

        fn on_detach(&self) {
            self.calls.borrow_mut().push("detach");
        }
    }

    fn map() -> HeadlessMap {
        HeadlessMap::new(LatLng::new(0.0, 0.0), 3.0, Point::new(640.0, 480.0))
    }

    #[test]
    fn test_view_lifecycle_order() {
        let recorder = Rc::new(Recorder {
            calls: RefCell::new(Vec::new()),
        });
        let lifecycle: Weak<dyn RenderLifecycle> = Rc::downgrade(&recorder) as Weak<dyn RenderLifecycle>;
        let view = HeadlessHost::new().create_overlay_view(lifecycle);
        let map = map();

        view.set_map(Some(&map));
        assert!(view.projection().is_none());
        assert_eq!(map.overlay_count(), 1);

        map.render_frame();
        map.render_frame();
        assert!(view.projection().is_some());

        view.set_map(None);
        map.render_frame();

        assert_eq!(
            *recorder.calls.borrow(),
            vec!["attach", "render", "render", "detach"]
        );
        assert_eq!(map.overlay_count(), 0);
        assert!(view.projection().is_none());
    }

    #[test]
    fn test_pane_append_and_remove() {
        let pane = HeadlessPane::default();
        let element = HeadlessElement::new("div");

        pane.append(&element);
        assert!(element.is_connected());
        assert_eq!(pane.len(), 1);

        element.remove_from_parent();
        assert!(!element.is_connected());
        assert!(pane.is_empty());

        // removing a detached node is a no-op
        element.remove_from_parent();
    }

    #[test]
    fn test_element_click_listeners() {
        let element = HeadlessElement::new("div");
        let clicks = Rc::new(Cell::new(0));

        let counter = Rc::clone(&clicks);
        element.add_click_listener(Box::new(move || counter.set(counter.get() + 1)));
        element.click();
        element.click();

        assert_eq!(clicks.get(), 2);
    }

    #[test]
    fn test_simulate_drag_sequence() {
        let marker = HeadlessHost::new().create_marker(MarkerSpec {
            map: None,
            position: LatLng::new(0.0, 0.0),
            title: "",
            content: None,
            draggable: true,
            clickable: true,
        });
        let seen = Rc::new(RefCell::new(Vec::new()));

        for kind in EventKind::MARKER_EVENTS {
            let sink = Rc::clone(&seen);
            marker.subscribe(
                kind,
                Box::new(move |event: &HeadlessEvent| sink.borrow_mut().push((kind, event.lat_lng))),
            );
        }

        let path = [LatLng::new(1.0, 1.0), LatLng::new(2.0, 2.0)];
        marker.simulate_drag(&path);

        assert_eq!(
            *seen.borrow(),
            vec![
                (EventKind::DragStart, Some(path[0])),
                (EventKind::Drag, Some(path[0])),
                (EventKind::Drag, Some(path[1])),
                (EventKind::DragEnd, Some(path[1])),
            ]
        );
        assert_eq!(marker.position(), path[1]);
    }

    #[test]
    fn test_event_payload_json() {
        let event: HeadlessEvent =
            serde_json::from_str(r#"{"latLng": {"lat": 10, "lng": 20}}"#).unwrap();
        assert_eq!(event.lat_lng(), Some(LatLng::new(10.0, 20.0)));

        let empty: HeadlessEvent = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.lat_lng(), None);
    }
}
