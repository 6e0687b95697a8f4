//! Capabilities the overlay needs from a map host
//!
//! A host (a browser map SDK binding, or the in-memory headless host) implements
//! these traits; [`LabeledMarkerOverlay`](crate::LabeledMarkerOverlay) is written
//! only against them. Handles are shared references: every method takes `&self`,
//! and a host is free to call back into the overlay from inside any of them.

use crate::{
    core::geo::{LatLng, Point},
    input::events::EventKind,
    Result,
};
use std::rc::Weak;

/// Hooks the host calls as an overlay enters, redraws on, and leaves a map
pub trait RenderLifecycle {
    /// The overlay became part of an active map; panes are available
    fn on_attach(&self);

    /// The camera or projection changed
    fn on_render(&self);

    /// The overlay left the map
    fn on_detach(&self);
}

/// Coordinate-to-pixel transform of the current camera
pub trait Projection {
    /// Pixel offset of `lat_lng` within the overlay layer, or `None` if the
    /// host cannot place it
    fn from_lat_lng_to_div_pixel(&self, lat_lng: LatLng) -> Option<Point>;
}

impl<F> Projection for F
where
    F: Fn(LatLng) -> Point,
{
    fn from_lat_lng_to_div_pixel(&self, lat_lng: LatLng) -> Option<Point> {
        Some(self(lat_lng))
    }
}

/// A DOM-like node owned by the overlay
pub trait ElementHandle: Clone {
    fn set_class_name(&self, class_name: &str);

    /// Assigns trusted markup as the node's children
    fn set_inner_html(&self, markup: &str);

    /// Sets one inline style property (`"fontSize"` or `"font-size"`)
    fn set_style_property(&self, property: &str, value: &str);

    fn set_attribute(&self, name: &str, value: &str);

    fn add_click_listener(&self, handler: Box<dyn FnMut()>);

    /// Detaches the node from its parent, if it has one
    fn remove_from_parent(&self);
}

/// Payload of a host marker event
pub trait MarkerEvent: Clone + 'static {
    /// Geographic position carried by the event, if any
    fn lat_lng(&self) -> Option<LatLng>;
}

/// Generic event subscription on a host object
pub trait MarkerEventSource {
    type Event: MarkerEvent;

    fn subscribe(&self, kind: EventKind, handler: Box<dyn FnMut(&Self::Event)>);
}

/// Host-managed marker glyph
pub trait MarkerHandle {
    type Map;
    type Element;

    fn set_position(&self, position: LatLng);

    /// Replaces the marker's glyph
    fn set_content(&self, content: &Self::Element);

    fn set_draggable(&self, draggable: bool);

    fn map(&self) -> Option<Self::Map>;

    fn set_map(&self, map: Option<&Self::Map>);
}

/// The host's custom-overlay primitive
pub trait OverlayView {
    type Map;
    type Element;
    type Projection: Projection;

    /// Joins or leaves a map. The host answers with `on_attach`/`on_detach`,
    /// possibly before this call returns.
    fn set_map(&self, map: Option<&Self::Map>);

    /// `None` until the overlay is attached and the map has a camera
    fn projection(&self) -> Option<Self::Projection>;

    /// Inserts `element` into the pane that receives mouse events
    fn append_to_overlay_mouse_target(&self, element: &Self::Element);
}

/// Everything needed to create a host marker
#[derive(Debug)]
pub struct MarkerSpec<'a, M, E> {
    pub map: Option<&'a M>,
    pub position: LatLng,
    pub title: &'a str,
    pub content: Option<&'a E>,
    pub draggable: bool,
    pub clickable: bool,
}

/// A map host: factories for the handles above
pub trait Host: 'static {
    type Map: Clone + 'static;
    type Element: ElementHandle + 'static;
    type Event: MarkerEvent;
    type Marker: MarkerHandle<Map = Self::Map, Element = Self::Element>
        + MarkerEventSource<Event = Self::Event>
        + 'static;
    type View: OverlayView<Map = Self::Map, Element = Self::Element> + 'static;

    fn create_element(&self, tag: &str) -> Result<Self::Element>;

    fn create_marker(&self, spec: MarkerSpec<'_, Self::Map, Self::Element>) -> Self::Marker;

    /// Creates the overlay primitive that will drive `lifecycle`
    fn create_overlay_view(&self, lifecycle: Weak<dyn RenderLifecycle>) -> Self::View;
}
