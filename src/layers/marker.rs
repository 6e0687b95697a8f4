use crate::{
    core::{
        config::{IconOptions, LabeledMarkerOptions, StyleMap},
        constants::{
            DISPLAY_HIDDEN, DISPLAY_SHOWN, ICON_HTML_TAG, LABEL_ANCHOR_TRANSFORM, LABEL_POSITION,
            LABEL_TAG,
        },
        geo::LatLng,
    },
    input::events::{EventEmitter, EventKind, ListenerId},
    layers::{
        icon,
        label::{apply_style, pixels, LabelPresentation},
    },
    traits::{
        ElementHandle, Host, MarkerEvent, MarkerEventSource, MarkerHandle, MarkerSpec,
        OverlayView, Projection, RenderLifecycle,
    },
};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// A host marker with an HTML label kept at the marker's screen position.
///
/// The label node exists only while the host has the overlay attached to a
/// map; its class, style and content live in a [`LabelPresentation`] that
/// survives detach. Marker `click`, `drag`, `dragstart` and `dragend` events
/// are re-emitted to listeners added with [`add_listener`](Self::add_listener)
/// with the host payload unchanged. A click on the label emits `click` with no
/// payload.
///
/// The handle is cheap to clone; clones share one overlay.
pub struct LabeledMarkerOverlay<H: Host> {
    shared: Rc<Shared<H>>,
}

struct Shared<H: Host> {
    this: Weak<Shared<H>>,
    host: H,
    marker: H::Marker,
    view: H::View,
    position: Cell<LatLng>,
    draggable: Cell<bool>,
    presentation: RefCell<LabelPresentation>,
    label: RefCell<Option<H::Element>>,
    map: RefCell<Option<H::Map>>,
    events: EventEmitter<H::Event>,
}

impl<H: Host> LabeledMarkerOverlay<H> {
    /// Creates the host marker and overlay, then attaches both to
    /// `options.map` (if any)
    pub fn new(host: H, options: LabeledMarkerOptions<H::Map>) -> Self {
        let glyph = options
            .icon_html
            .as_deref()
            .and_then(|markup| match host.create_element(ICON_HTML_TAG) {
                Ok(element) => {
                    element.set_inner_html(markup);
                    Some(element)
                }
                Err(e) => {
                    log::warn!("Failed to build marker glyph: {}", e);
                    None
                }
            });

        let marker = host.create_marker(MarkerSpec {
            map: options.map.as_ref(),
            position: options.position,
            title: &options.title,
            content: glyph.as_ref(),
            draggable: options.draggable,
            clickable: true,
        });

        let icon_options = options.icon_options();
        let presentation = LabelPresentation::new(
            options.label_content,
            options.label_class,
            options.label_style,
        );

        let shared = Rc::new_cyclic(|this: &Weak<Shared<H>>| {
            let lifecycle: Weak<dyn RenderLifecycle> = this.clone();
            let view = host.create_overlay_view(lifecycle);

            Shared {
                this: this.clone(),
                host,
                marker,
                view,
                position: Cell::new(options.position),
                draggable: Cell::new(options.draggable),
                presentation: RefCell::new(presentation),
                label: RefCell::new(None),
                map: RefCell::new(None),
                events: EventEmitter::new(),
            }
        });

        let overlay = Self { shared };
        if let Some(url) = options.icon.filter(|url| !url.is_empty()) {
            overlay.set_icon(url, icon_options);
        }
        overlay.forward_marker_events();
        overlay.set_map(options.map.as_ref());
        overlay
    }

    fn forward_marker_events(&self) {
        for kind in EventKind::MARKER_EVENTS {
            let this = Rc::downgrade(&self.shared);
            self.shared.marker.subscribe(
                kind,
                Box::new(move |event: &H::Event| {
                    if let Some(shared) = this.upgrade() {
                        shared.on_marker_event(kind, event);
                    }
                }),
            );
        }
    }

    pub fn position(&self) -> LatLng {
        self.shared.position.get()
    }

    /// Moves both the label (immediately, when a projection is available)
    /// and the host marker
    pub fn set_position(&self, position: impl Into<LatLng>) {
        let position = position.into();
        self.shared.position.set(position);

        if let Some(projection) = self.shared.view.projection() {
            self.shared.place_label(&projection);
        }
        self.shared.marker.set_position(position);
    }

    pub fn draggable(&self) -> bool {
        self.shared.draggable.get()
    }

    pub fn set_draggable(&self, draggable: bool) {
        self.shared.draggable.set(draggable);
        self.shared.marker.set_draggable(draggable);
    }

    /// Whether the host marker is on a map
    pub fn is_visible(&self) -> bool {
        self.shared.marker.map().is_some()
    }

    pub fn set_label_content(&self, markup: impl Into<String>) {
        let markup = markup.into();
        if let Some(element) = self.shared.label_element() {
            element.set_inner_html(&markup);
        }
        self.shared.presentation.borrow_mut().content = markup;
    }

    pub fn set_label_class(&self, class_name: impl Into<String>) {
        let class_name = class_name.into();
        if let Some(element) = self.shared.label_element() {
            element.set_class_name(&class_name);
        }
        self.shared.presentation.borrow_mut().class_name = class_name;
    }

    /// Merges `style` into the label style. Properties not named in `style`
    /// keep their current values.
    pub fn set_label_style<K, V>(&self, style: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        let style: StyleMap = style
            .into_iter()
            .map(|(property, value)| (property.into(), value.into()))
            .collect();

        if let Some(element) = self.shared.label_element() {
            apply_style(&element, &style);
        }
        self.shared.presentation.borrow_mut().merge_style(style);
    }

    /// Shows or hides the current label node. Has no effect while detached.
    pub fn set_label_visible(&self, visible: bool) {
        if let Some(element) = self.shared.label_element() {
            let display = if visible { DISPLAY_SHOWN } else { DISPLAY_HIDDEN };
            element.set_style_property("display", display);
        }
    }

    /// Attaches the overlay and the marker to `map`, or detaches both
    pub fn set_map(&self, map: Option<&H::Map>) {
        self.shared.map.replace(map.cloned());
        self.shared.view.set_map(map);
        self.shared.marker.set_map(map);
    }

    pub fn map(&self) -> Option<H::Map> {
        self.shared.map.borrow().clone()
    }

    /// Replaces the marker glyph with an image. `url` must be a JSON string;
    /// anything else is logged and ignored.
    pub fn set_icon(&self, url: impl Into<Value>, options: IconOptions) {
        let value = url.into();
        let url = match icon::icon_url(&value) {
            Ok(url) => url,
            Err(e) => {
                log::error!("{}", e);
                return;
            }
        };

        match icon::build_icon_element(&self.shared.host, url, &options) {
            Ok(image) => self.shared.marker.set_content(&image),
            Err(e) => log::warn!("Failed to build icon {}: {}", url, e),
        }
    }

    pub fn add_listener<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: FnMut(Option<&H::Event>) + 'static,
    {
        self.shared.events.add_listener(kind, listener)
    }

    pub fn remove_listener(&self, listener: ListenerId) -> bool {
        self.shared.events.remove_listener(listener)
    }

    pub fn clear_listeners(&self, kind: EventKind) {
        self.shared.events.clear_listeners(kind)
    }

    pub fn marker(&self) -> &H::Marker {
        &self.shared.marker
    }

    pub fn view(&self) -> &H::View {
        &self.shared.view
    }

    /// The live label node, present only while attached
    pub fn label_element(&self) -> Option<H::Element> {
        self.shared.label_element()
    }

    pub fn label_presentation(&self) -> LabelPresentation {
        self.shared.presentation.borrow().clone()
    }
}

impl<H: Host> Clone for LabeledMarkerOverlay<H> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<H: Host> RenderLifecycle for LabeledMarkerOverlay<H> {
    fn on_attach(&self) {
        self.shared.on_attach()
    }

    fn on_render(&self) {
        self.shared.on_render()
    }

    fn on_detach(&self) {
        self.shared.on_detach()
    }
}

impl<H: Host> Shared<H> {
    fn label_element(&self) -> Option<H::Element> {
        self.label.borrow().clone()
    }

    fn place_label(&self, projection: &impl Projection) {
        let Some(element) = self.label_element() else {
            return;
        };
        let position = self.position.get();
        let Some(pixel) = projection.from_lat_lng_to_div_pixel(position) else {
            return;
        };

        log::trace!(
            "placing label for ({:.6}, {:.6}) at ({:.1}, {:.1})",
            position.lat,
            position.lng,
            pixel.x,
            pixel.y
        );
        element.set_style_property("left", &pixels(pixel.x));
        element.set_style_property("top", &pixels(pixel.y));
    }

    fn on_marker_event(&self, kind: EventKind, event: &H::Event) {
        match kind {
            EventKind::Drag => {
                self.follow(kind, event);
                self.on_render();
            }
            // The host redraws after a drag completes.
            EventKind::DragEnd => self.follow(kind, event),
            EventKind::Click | EventKind::DragStart => {}
        }
        self.events.trigger(kind, Some(event));
    }

    fn follow(&self, kind: EventKind, event: &H::Event) {
        match event.lat_lng() {
            Some(position) => self.position.set(position),
            None => log::debug!("{} event without a position; keeping label in place", kind),
        }
    }
}

impl<H: Host> RenderLifecycle for Shared<H> {
    fn on_attach(&self) {
        let element = match self.host.create_element(LABEL_TAG) {
            Ok(element) => element,
            Err(e) => {
                log::warn!("Failed to create label element: {}", e);
                return;
            }
        };

        let presentation = self.presentation.borrow().clone();
        presentation.apply_to(&element);
        element.set_style_property("position", LABEL_POSITION);
        element.set_style_property("transform", LABEL_ANCHOR_TRANSFORM);

        let this = self.this.clone();
        element.add_click_listener(Box::new(move || {
            if let Some(shared) = this.upgrade() {
                log::debug!("Label clicked");
                shared.events.trigger(EventKind::Click, None);
            }
        }));

        if let Some(stale) = self.label.replace(Some(element.clone())) {
            stale.remove_from_parent();
        }
        self.view.append_to_overlay_mouse_target(&element);
        log::debug!("Label attached");
    }

    fn on_render(&self) {
        // No projection before attach; the next render places the label.
        let Some(projection) = self.view.projection() else {
            return;
        };
        self.place_label(&projection);
    }

    fn on_detach(&self) {
        if let Some(element) = self.label.take() {
            element.remove_from_parent();
            log::debug!("Label detached");
        }
    }
}

// The last handle is gone: take the label and marker off the map before the
// host's hooks lose their target.
impl<H: Host> Drop for Shared<H> {
    fn drop(&mut self) {
        self.on_detach();
        self.view.set_map(None);
        self.marker.set_map(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geo::Point;
    use crate::host::headless::{HeadlessHost, HeadlessMap};

    fn overlay(options: LabeledMarkerOptions<HeadlessMap>) -> LabeledMarkerOverlay<HeadlessHost> {
        LabeledMarkerOverlay::new(HeadlessHost::new(), options)
    }

    #[test]
    fn test_detached_overlay_has_no_label() {
        let overlay = overlay(LabeledMarkerOptions::new((1.0, 2.0)).with_label_content("A"));

        overlay.on_render();
        assert!(overlay.label_element().is_none());
        assert!(!overlay.is_visible());
        assert_eq!(overlay.position(), LatLng::new(1.0, 2.0));
    }

    #[test]
    fn test_attach_builds_anchored_label() {
        let overlay = overlay(
            LabeledMarkerOptions::new((1.0, 2.0))
                .with_label_class("tag")
                .with_label_style([("color", "red")])
                .with_label_content("<b>A</b>"),
        );

        overlay.on_attach();
        let label = overlay.label_element().unwrap();

        assert_eq!(label.tag(), "div");
        assert_eq!(label.class_name(), "tag");
        assert_eq!(label.inner_html(), "<b>A</b>");
        assert_eq!(label.style("color").as_deref(), Some("red"));
        assert_eq!(label.style("position").as_deref(), Some("absolute"));
        assert_eq!(
            label.style("transform").as_deref(),
            Some("translate(-50%, -100%)")
        );
    }

    #[test]
    fn test_render_uses_current_projection() {
        let map = HeadlessMap::new(LatLng::new(0.0, 0.0), 2.0, Point::new(512.0, 512.0));
        let overlay = overlay(LabeledMarkerOptions::new((0.0, 0.0)).with_map(map.clone()));

        map.render_frame();
        let label = overlay.label_element().unwrap();
        assert_eq!(label.style("left").as_deref(), Some("256px"));
        assert_eq!(label.style("top").as_deref(), Some("256px"));
    }

    struct Unplaceable;

    impl Projection for Unplaceable {
        fn from_lat_lng_to_div_pixel(&self, _lat_lng: LatLng) -> Option<Point> {
            None
        }
    }

    #[test]
    fn test_placed_label_kept_without_projection() {
        let map = HeadlessMap::new(LatLng::new(0.0, 0.0), 2.0, Point::new(512.0, 512.0));
        let overlay = overlay(LabeledMarkerOptions::new((0.0, 0.0)).with_map(map.clone()));
        map.render_frame();
        let label = overlay.label_element().unwrap();

        overlay.shared.position.set(LatLng::new(10.0, 10.0));
        overlay.shared.place_label(&Unplaceable);
        assert_eq!(label.style("left").as_deref(), Some("256px"));
        assert_eq!(label.style("top").as_deref(), Some("256px"));

        overlay
            .shared
            .place_label(&|_: LatLng| Point::new(12.0, 34.0));
        assert_eq!(label.style("left").as_deref(), Some("12px"));
        assert_eq!(label.style("top").as_deref(), Some("34px"));
    }

    #[test]
    fn test_drop_detaches_label_and_marker() {
        let map = HeadlessMap::new(LatLng::new(0.0, 0.0), 2.0, Point::new(512.0, 512.0));
        let overlay = overlay(LabeledMarkerOptions::new((0.0, 0.0)).with_map(map.clone()));
        map.render_frame();
        let marker = overlay.marker().clone();

        drop(overlay);
        assert!(map.overlay_mouse_target().is_empty());
        assert_eq!(marker.map(), None);
        assert_eq!(map.overlay_count(), 0);
    }

    #[test]
    fn test_repeated_attach_replaces_label() {
        let map = HeadlessMap::new(LatLng::new(0.0, 0.0), 2.0, Point::new(512.0, 512.0));
        let overlay = overlay(LabeledMarkerOptions::new((0.0, 0.0)).with_map(map.clone()));
        map.render_frame();
        let first = overlay.label_element().unwrap();

        overlay.on_attach();
        let second = overlay.label_element().unwrap();

        assert!(first != second);
        assert!(!first.is_connected());
        assert_eq!(map.overlay_mouse_target().children(), vec![second]);
    }
}
