//! Map hosts the overlay can run against

pub mod headless;

#[cfg(feature = "wasm")]
pub mod web;

pub use headless::{
    HeadlessElement, HeadlessEvent, HeadlessHost, HeadlessMap, HeadlessMarker, HeadlessPane,
    HeadlessView,
};
