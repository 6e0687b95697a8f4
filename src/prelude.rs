//! Prelude module for common label-marker types and traits
//!
//! This module re-exports the most commonly used types and traits for easy
//! importing with `use label_marker::prelude::*;`

pub use crate::core::{
    config::{IconOptions, LabeledMarkerOptions, StyleMap},
    geo::{LatLng, Point},
    viewport::Viewport,
};

pub use crate::input::events::{EventEmitter, EventKind, ListenerId};

pub use crate::layers::{label::LabelPresentation, marker::LabeledMarkerOverlay};

pub use crate::traits::{
    ElementHandle, Host, MarkerEvent, MarkerEventSource, MarkerHandle, MarkerSpec, OverlayView,
    Projection, RenderLifecycle,
};

pub use crate::host::headless::{
    HeadlessElement, HeadlessEvent, HeadlessHost, HeadlessMap, HeadlessMarker, HeadlessPane,
};

#[cfg(feature = "wasm")]
pub use crate::host::web::{WasmLabelMarker, WebHost};

pub use crate::{Error as OverlayError, Result};
