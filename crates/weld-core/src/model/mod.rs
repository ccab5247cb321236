//! Typed element model: kinds, containment rules, and element records.

pub mod element;
pub mod kind;

pub use element::{AttrValue, Element};
pub use kind::ElementKind;
