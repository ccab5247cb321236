//! Hierarchical XMI writer.
//!
//! # Overview
//!
//! Walks the fused graph parent-first and emits a namespaced, nested
//! document:
//!
//! - The three namespace declarations appear once, on the `xmi:XMI` root.
//! - The unique parentless structural element becomes the `uml:Model` node;
//!   every other structural element is a nested `packagedElement` carrying
//!   its base `xmi:type`. Children are emitted in first-seen order, never
//!   re-sorted.
//! - Relationship elements are emitted as top-level records after the model
//!   tree (`uml:Abstraction` with `client`/`supplier` idrefs for the
//!   requirement-trace kinds, `source`/`target` attributes for flow-like
//!   kinds) — never as children of their participants.
//! - Stereotype application records bind each domain kind to its base node
//!   at the document root; requirement applications carry `Id` and `Text`.
//!
//! Pretty-printing and the metadata block are configuration toggles with no
//! effect on graph content.

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use std::collections::HashSet;
use tracing::instrument;

use weld_core::config::OutputConfig;
use weld_core::error::IntegrityError;
use weld_core::graph::ElementGraph;
use weld_core::model::{Element, ElementKind};

use crate::stereotype::{NAMESPACES, stereotype, xmi_type};

// ---------------------------------------------------------------------------
// WriteError
// ---------------------------------------------------------------------------

/// Failures while emitting the document.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    #[error("xml write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("xml write failed: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("document is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

// ---------------------------------------------------------------------------
// XmiWriter
// ---------------------------------------------------------------------------

/// Configured XMI emitter.
#[derive(Debug, Clone, Default)]
pub struct XmiWriter {
    config: OutputConfig,
}

impl XmiWriter {
    /// Create a writer with the given output toggles.
    #[must_use]
    pub const fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    /// Serialize a fused graph to an XMI document string.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::Integrity`] if the graph has no unique root,
    /// an unreachable parent, or a cycle in a parent chain.
    #[instrument(skip(self, graph), fields(elements = graph.len()))]
    pub fn write(&self, graph: &ElementGraph) -> Result<String, WriteError> {
        let root = graph.root()?;
        check_reachability(graph, root)?;

        let mut writer = if self.config.pretty {
            Writer::new_with_indent(Vec::new(), b' ', 2)
        } else {
            Writer::new(Vec::new())
        };

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut xmi_root = BytesStart::new("xmi:XMI");
        xmi_root.push_attribute(("xmi:version", "2.5"));
        for (key, uri) in NAMESPACES {
            xmi_root.push_attribute((key, uri));
        }
        writer.write_event(Event::Start(xmi_root))?;

        if self.config.metadata {
            write_metadata(&mut writer, graph)?;
        }

        write_structural(&mut writer, graph, root, true)?;

        for element in graph.iter().filter(|e| e.kind.is_relationship()) {
            write_relationship(&mut writer, element)?;
        }
        for element in graph.iter() {
            write_stereotype_application(&mut writer, element)?;
        }

        writer.write_event(Event::End(BytesEnd::new("xmi:XMI")))?;
        Ok(String::from_utf8(writer.into_inner())?)
    }
}

// ---------------------------------------------------------------------------
// Emission helpers
// ---------------------------------------------------------------------------

fn write_metadata(writer: &mut Writer<Vec<u8>>, graph: &ElementGraph) -> Result<(), WriteError> {
    let relationships = graph.iter().filter(|e| e.kind.is_relationship()).count();
    let mut doc = BytesStart::new("xmi:Documentation");
    doc.push_attribute(("exporter", "weld"));
    doc.push_attribute(("exporterVersion", env!("CARGO_PKG_VERSION")));
    doc.push_attribute(("generated", chrono::Utc::now().to_rfc3339().as_str()));
    doc.push_attribute(("elementCount", graph.len().to_string().as_str()));
    doc.push_attribute(("relationshipCount", relationships.to_string().as_str()));
    writer.write_event(Event::Empty(doc))?;
    Ok(())
}

/// Emit one structural element and, depth-first, its children.
fn write_structural(
    writer: &mut Writer<Vec<u8>>,
    graph: &ElementGraph,
    element: &Element,
    is_root: bool,
) -> Result<(), WriteError> {
    let tag = if is_root { "uml:Model" } else { "packagedElement" };
    let mut start = BytesStart::new(tag);
    start.push_attribute(("xmi:type", xmi_type(element.kind)));
    start.push_attribute(("xmi:id", element.id.as_str()));
    if !element.name.is_empty() {
        start.push_attribute(("name", element.name.as_str()));
    }
    // Reference attributes ride along so the graph's reference edges
    // survive the round trip; free text lives in the stereotype layer and
    // the JSON document.
    for (key, target) in element.ref_attrs() {
        start.push_attribute((key, target));
    }

    let mut children = graph.children_of(&element.id).peekable();
    if children.peek().is_none() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for child in children {
        write_structural(writer, graph, child, false)?;
    }
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

/// Emit one relationship as a top-level record.
fn write_relationship(writer: &mut Writer<Vec<u8>>, element: &Element) -> Result<(), WriteError> {
    let mut start = BytesStart::new("packagedElement");
    start.push_attribute(("xmi:type", xmi_type(element.kind)));
    start.push_attribute(("xmi:id", element.id.as_str()));
    if !element.name.is_empty() {
        start.push_attribute(("name", element.name.as_str()));
    }

    let endpoints = element.endpoint_refs();
    if is_trace_kind(element.kind) {
        writer.write_event(Event::Start(start))?;
        // Role order is fixed: first role is the client, second the supplier.
        let tags = ["client", "supplier"];
        for (tag, (_, target)) in tags.iter().zip(&endpoints) {
            let mut end = BytesStart::new(*tag);
            end.push_attribute(("xmi:idref", *target));
            writer.write_event(Event::Empty(end))?;
        }
        writer.write_event(Event::End(BytesEnd::new("packagedElement")))?;
    } else {
        if let Some((_, source)) = endpoints.first() {
            start.push_attribute(("source", *source));
        }
        if let Some((_, target)) = endpoints.get(1) {
            start.push_attribute(("target", *target));
        }
        writer.write_event(Event::Empty(start))?;
    }
    Ok(())
}

/// Emit the stereotype application record for a kind that has one.
fn write_stereotype_application(
    writer: &mut Writer<Vec<u8>>,
    element: &Element,
) -> Result<(), WriteError> {
    let Some(app) = stereotype(element.kind) else {
        return Ok(());
    };
    let mut record = BytesStart::new(app.tag);
    record.push_attribute(("xmi:id", format!("{}_app", element.id).as_str()));
    record.push_attribute((app.base_attr, element.id.as_str()));
    if element.kind == ElementKind::Requirement {
        let req_id = element
            .attrs
            .get("reqId")
            .and_then(weld_core::model::AttrValue::as_text)
            .unwrap_or("");
        record.push_attribute(("Id", req_id));
        record.push_attribute(("Text", element.description.as_str()));
    }
    writer.write_event(Event::Empty(record))?;
    Ok(())
}

const fn is_trace_kind(kind: ElementKind) -> bool {
    matches!(
        kind,
        ElementKind::DeriveReqt | ElementKind::Satisfy | ElementKind::Verify
    )
}

/// Every structural element must be reachable from the root; anything
/// unreachable is either an orphan (dangling parent) or part of a parent
/// cycle, and both are integrity failures with the offending ids.
fn check_reachability(graph: &ElementGraph, root: &Element) -> Result<(), IntegrityError> {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut stack: Vec<&str> = vec![root.id.as_str()];
    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        for child in graph.children_of(id) {
            stack.push(child.id.as_str());
        }
    }

    for element in graph.iter() {
        if element.kind.is_relationship() || visited.contains(element.id.as_str()) {
            continue;
        }
        // Walk the parent chain to name the failure precisely.
        let mut trail: Vec<String> = vec![element.id.clone()];
        let mut seen: HashSet<&str> = HashSet::new();
        seen.insert(element.id.as_str());
        let mut current = element;
        loop {
            let Some(parent_id) = current.parent_id.as_deref() else {
                // Parentless but not the root: root() would have failed.
                return Err(IntegrityError::MultipleRoots {
                    ids: vec![root.id.clone(), current.id.clone()],
                });
            };
            let Some(parent) = graph.get(parent_id) else {
                return Err(IntegrityError::DanglingReference {
                    element_id: current.id.clone(),
                    attribute: "parentId".to_string(),
                    target_id: parent_id.to_string(),
                });
            };
            trail.push(parent.id.clone());
            if !seen.insert(parent.id.as_str()) {
                return Err(IntegrityError::ParentCycle { path: trail });
            }
            current = parent;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
