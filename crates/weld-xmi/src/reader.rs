//! XMI reader: parses the writer's output back into an element graph.
//!
//! # Overview
//!
//! Supports the round-trip property: serializing a fused graph and parsing
//! the result yields a graph with the same ids, kinds, parent edges and
//! reference edges, regardless of the whitespace and metadata toggles.
//!
//! Kinds are resolved base-type-first (`uml:Class` provisionally reads as a
//! block) and refined by the stereotype application records at the document
//! root. `uml:Abstraction` nodes carry no meaning without their stereotype,
//! so a trace record lacking one is a parse error, not a guess.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

use weld_core::error::IntegrityError;
use weld_core::graph::ElementGraph;
use weld_core::model::{AttrValue, Element, ElementKind};

use crate::stereotype::{kind_from_stereotype_tag, kind_from_xmi_type};

/// Temporary attribute keys for trace endpoints until the stereotype
/// application reveals the relationship's role names.
const CLIENT_KEY: &str = "clientId";
const SUPPLIER_KEY: &str = "supplierId";

// ---------------------------------------------------------------------------
// ReadError
// ---------------------------------------------------------------------------

/// Failures while parsing a document.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("xml parse failed: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("attribute decode failed: {0}")]
    Attr(String),

    #[error("element {0}: missing xmi:id")]
    MissingId(String),

    #[error("element '{id}': unknown xmi:type '{xmi_type}'")]
    UnknownType { id: String, xmi_type: String },

    #[error("abstraction '{0}' has no stereotype application record")]
    MissingStereotype(String),

    #[error(transparent)]
    Integrity(#[from] IntegrityError),
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse an XMI document produced by [`crate::writer::XmiWriter`] back into
/// an [`ElementGraph`].
///
/// # Errors
///
/// Returns [`ReadError`] on malformed XML, unknown base types, trace
/// records without stereotypes, or duplicate ids.
pub fn parse_xmi(xml: &str) -> Result<ElementGraph, ReadError> {
    let mut reader = Reader::from_str(xml);

    let mut state = ParserState::default();
    loop {
        match reader.read_event()? {
            Event::Start(event) => state.handle_open(&event, true)?,
            Event::Empty(event) => state.handle_open(&event, false)?,
            Event::End(_) => state.handle_close(),
            Event::Eof => break,
            _ => {}
        }
    }
    state.finish()
}

// ---------------------------------------------------------------------------
// Parser state
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ParserState {
    elements: Vec<Element>,
    /// id → slot, for stereotype refinement.
    index: HashMap<String, usize>,
    /// Open-element frames; `Some` frames point at a parsed model element.
    stack: Vec<Option<usize>>,
    /// Abstraction ids still waiting for a stereotype record.
    pending: HashSet<String>,
}

impl ParserState {
    fn handle_open(&mut self, event: &BytesStart<'_>, has_children: bool) -> Result<(), ReadError> {
        let tag = String::from_utf8_lossy(event.name().as_ref()).into_owned();
        let frame = match tag.as_str() {
            "uml:Model" | "packagedElement" => Some(self.parse_element(&tag, event)?),
            "client" => {
                self.attach_endpoint(CLIENT_KEY, event)?;
                None
            }
            "supplier" => {
                self.attach_endpoint(SUPPLIER_KEY, event)?;
                None
            }
            other if other.starts_with("sysml:") => {
                self.apply_stereotype(&tag, event)?;
                None
            }
            // xmi:XMI, xmi:Documentation, anything unrecognized: structure
            // only, no element.
            _ => None,
        };
        if has_children {
            self.stack.push(frame);
        }
        Ok(())
    }

    fn handle_close(&mut self) {
        self.stack.pop();
    }

    /// Parse a model element from `uml:Model` or `packagedElement`.
    fn parse_element(&mut self, tag: &str, event: &BytesStart<'_>) -> Result<usize, ReadError> {
        let attrs = attr_map(event)?;
        let id = attrs
            .get("xmi:id")
            .cloned()
            .ok_or_else(|| ReadError::MissingId(tag.to_string()))?;

        let xmi_type = attrs.get("xmi:type").cloned().unwrap_or_default();
        let kind = if tag == "uml:Model" {
            ElementKind::Model
        } else if xmi_type == "uml:Abstraction" {
            // Placeholder until the stereotype record refines it.
            self.pending.insert(id.clone());
            ElementKind::Satisfy
        } else {
            kind_from_xmi_type(&xmi_type).ok_or_else(|| ReadError::UnknownType {
                id: id.clone(),
                xmi_type: xmi_type.clone(),
            })?
        };

        let mut element = Element::new(
            id.clone(),
            kind,
            attrs.get("name").cloned().unwrap_or_default(),
        );

        if kind.is_structural() {
            element.parent_id = self.current_parent();
        } else if let [source_role, target_role] = kind.endpoint_roles() {
            // Flow-like records carry their endpoints inline.
            if let Some(source) = attrs.get("source") {
                element
                    .attrs
                    .insert((*source_role).to_string(), AttrValue::Ref(source.clone()));
            }
            if let Some(target) = attrs.get("target") {
                element
                    .attrs
                    .insert((*target_role).to_string(), AttrValue::Ref(target.clone()));
            }
        }

        // Remaining `…Id` attributes are reference edges the writer carried
        // through; anything else on the wire is presentation-only.
        for (key, value) in &attrs {
            if key.starts_with("xmi:")
                || matches!(key.as_str(), "name" | "source" | "target")
                || !key.ends_with("Id")
            {
                continue;
            }
            element
                .attrs
                .insert(key.clone(), AttrValue::Ref(value.clone()));
        }

        let slot = self.elements.len();
        self.index.insert(id, slot);
        self.elements.push(element);
        Ok(slot)
    }

    /// Record a `client`/`supplier` idref on the nearest open trace record.
    fn attach_endpoint(&mut self, key: &str, event: &BytesStart<'_>) -> Result<(), ReadError> {
        let attrs = attr_map(event)?;
        let Some(target) = attrs.get("xmi:idref") else {
            return Ok(());
        };
        let owner = self
            .stack
            .iter()
            .rev()
            .find_map(|frame| *frame)
            .filter(|&slot| self.elements[slot].kind.is_relationship());
        if let Some(slot) = owner {
            self.elements[slot]
                .attrs
                .insert(key.to_string(), AttrValue::Ref(target.clone()));
        } else {
            debug!(key, idref = %target, "endpoint reference outside a relationship record");
        }
        Ok(())
    }

    /// Refine an element's kind from a stereotype application record.
    fn apply_stereotype(&mut self, tag: &str, event: &BytesStart<'_>) -> Result<(), ReadError> {
        let Some(kind) = kind_from_stereotype_tag(tag) else {
            return Ok(());
        };
        let attrs = attr_map(event)?;
        let Some(base_id) = attrs
            .iter()
            .find(|(key, _)| key.starts_with("base_"))
            .map(|(_, value)| value)
        else {
            return Ok(());
        };
        let Some(&slot) = self.index.get(base_id) else {
            debug!(tag, base_id = %base_id, "stereotype application for an unknown element");
            return Ok(());
        };

        let element = &mut self.elements[slot];
        element.kind = kind;
        self.pending.remove(base_id);

        if kind == ElementKind::Requirement {
            if let Some(req_id) = attrs.get("Id").filter(|v| !v.is_empty()) {
                element
                    .attrs
                    .insert("reqId".to_string(), AttrValue::Text(req_id.clone()));
            }
            if let Some(text) = attrs.get("Text") {
                element.description.clone_from(text);
            }
        }
        Ok(())
    }

    fn current_parent(&self) -> Option<String> {
        self.stack.iter().rev().find_map(|frame| {
            frame.and_then(|slot| {
                let element = &self.elements[slot];
                element
                    .kind
                    .is_structural()
                    .then(|| element.id.clone())
            })
        })
    }

    /// Final fixups: fail leftover abstractions, rename trace endpoint keys
    /// to their role names, and build the graph.
    fn finish(mut self) -> Result<ElementGraph, ReadError> {
        if let Some(id) = self.pending.iter().min() {
            return Err(ReadError::MissingStereotype(id.clone()));
        }

        for element in &mut self.elements {
            if !element.kind.is_relationship() {
                continue;
            }
            let roles = element.kind.endpoint_roles();
            if let Some(AttrValue::Ref(target)) = element.attrs.remove(CLIENT_KEY) {
                element
                    .attrs
                    .insert(roles[0].to_string(), AttrValue::Ref(target));
            }
            if let Some(AttrValue::Ref(target)) = element.attrs.remove(SUPPLIER_KEY) {
                element
                    .attrs
                    .insert(roles[1].to_string(), AttrValue::Ref(target));
            }
        }

        Ok(ElementGraph::new(self.elements)?)
    }
}

/// Decode an event's attributes into an ordered map.
fn attr_map(event: &BytesStart<'_>) -> Result<BTreeMap<String, String>, ReadError> {
    let mut map = BTreeMap::new();
    for attr in event.attributes() {
        let attr = attr.map_err(|e| ReadError::Attr(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| ReadError::Attr(e.to_string()))?
            .into_owned();
        map.insert(key, value);
    }
    Ok(map)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
