//! # label-marker
//!
//! A map marker paired with an HTML label that follows the marker's screen
//! position as the map pans, zooms and the marker is dragged.
//!
//! The crate does not render maps itself. The host (a browser map SDK, or the
//! in-memory [`host::headless`] host used for tests and tooling) owns
//! projection, rendering and gesture handling, and drives the overlay through
//! the [`RenderLifecycle`] hooks.

pub mod core;
pub mod host;
pub mod input;
pub mod layers;
pub mod prelude;
pub mod traits;
pub use crate::core::constants;

// Re-export public API
pub use core::{
    config::{IconOptions, LabeledMarkerOptions, StyleMap},
    geo::{LatLng, Point},
    viewport::Viewport,
};

pub use input::events::{EventEmitter, EventKind, ListenerId};

pub use layers::{label::LabelPresentation, marker::LabeledMarkerOverlay};

pub use traits::{
    ElementHandle, Host, MarkerEvent, MarkerEventSource, MarkerHandle, MarkerSpec, OverlayView,
    Projection, RenderLifecycle,
};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, OverlayError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum OverlayError {
    #[error("icon url must be a string, got {0}")]
    InvalidIcon(String),

    #[error("invalid marker options: {0}")]
    Config(#[from] serde_json::Error),

    #[error("unknown marker event: {0}")]
    UnknownEvent(String),

    #[error("DOM error: {0}")]
    Dom(String),

    #[error("map host unavailable: {0}")]
    HostUnavailable(String),
}

/// Error type alias for convenience
pub type Error = OverlayError;

/// Installs `env_logger` as the global logger. Safe to call more than once.
#[cfg(feature = "debug")]
pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env().try_init();
}
