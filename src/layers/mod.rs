pub mod icon;
pub mod label;
pub mod marker;

pub use label::LabelPresentation;
pub use marker::LabeledMarkerOverlay;
