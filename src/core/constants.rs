//! DOM and projection constants shared by the overlay and the bundled hosts.

/// Tag of the label node created on attach.
pub const LABEL_TAG: &str = "div";

/// Tag of the node built from `icon_html` markup.
pub const ICON_HTML_TAG: &str = "div";

/// Tag of the node built by `set_icon`.
pub const ICON_IMAGE_TAG: &str = "img";

/// The label is positioned against the overlay pane.
pub const LABEL_POSITION: &str = "absolute";

/// Puts the label's bottom-center point on the projected pixel.
pub const LABEL_ANCHOR_TRANSFORM: &str = "translate(-50%, -100%)";

/// `display` values used by `set_label_visible`.
pub const DISPLAY_SHOWN: &str = "block";
pub const DISPLAY_HIDDEN: &str = "none";

/// Default square tile size in pixels.
pub const TILE_SIZE: f64 = 256.0;

/// Web Mercator sphere radius (EPSG:3857).
pub const EARTH_RADIUS: f64 = 6378137.0;

/// Latitude limit of the Web Mercator square.
pub const MAX_LATITUDE: f64 = 85.0511287798;
