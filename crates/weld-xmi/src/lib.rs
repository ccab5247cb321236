//! weld-xmi library.
//!
//! The emission half of the pipeline: the namespaced hierarchical XMI
//! document (writer + round-trip reader) and the fused JSON document that
//! mirrors the fragment input contract.

pub mod json;
pub mod reader;
pub mod stereotype;
pub mod writer;

pub use json::FusedDocument;
pub use reader::parse_xmi;
pub use writer::XmiWriter;
