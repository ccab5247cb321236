//! Fragment input contract: parsing and strict intra-fragment validation.
//!
//! # Overview
//!
//! A fragment is one independently generated set of elements: a JSON
//! document with a `model` record (single root descriptor) and an
//! `elements` array. Upstream generators emit the `model` record as either
//! an object or a one-element array; both are accepted.
//!
//! On load, the model record itself is promoted to a [`Model`]
//! (`ElementKind::Model`) element, and every parentless element of a
//! packageable kind is reparented under that fragment's model root. This
//! keeps each fragment a single rooted tree and makes the post-fusion
//! unique-root assertion satisfiable.
//!
//! # Two-phase validation
//!
//! Intra-fragment validation is **strict**: ids unique, every `parentId`
//! resolving to a kind-compatible element, parent chains acyclic,
//! relationship kinds carrying all their endpoint roles and no `parentId`.
//! Endpoint reference *values* are deliberately not resolved here —
//! fragments from different generators legitimately reference elements
//! that only exist in sibling fragments, and the fusion engine resolves
//! those after merge. Do not conflate the two phases.
//!
//! [`Model`]: crate::model::ElementKind::Model

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::error::{IntegrityError, ShapeError, WeldError};
use crate::model::{AttrValue, Element, ElementKind};

/// Fields of an element record handled explicitly during parsing; everything
/// else lands in `attrs`.
const RESERVED_FIELDS: [&str; 6] = ["id", "type", "name", "parentId", "description", "sourceIds"];

// ---------------------------------------------------------------------------
// ModelDescriptor
// ---------------------------------------------------------------------------

/// The single root descriptor of a fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDescriptor {
    pub id: String,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Fragment
// ---------------------------------------------------------------------------

/// One parsed fragment: its root descriptor and its elements.
///
/// `elements` starts with the promoted model element, followed by the
/// fragment's own elements in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Source identity (file path or generator name) used in diagnostics.
    pub label: String,
    pub model: ModelDescriptor,
    pub elements: Vec<Element>,
}

impl Fragment {
    /// Parse a fragment from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError`] if the text is not valid JSON or does not
    /// satisfy the fragment shape.
    pub fn from_json_str(label: &str, json: &str) -> Result<Self, ShapeError> {
        let value: Value = serde_json::from_str(json).map_err(|source| ShapeError::Json {
            fragment: label.to_string(),
            source,
        })?;
        Self::from_value(label, &value)
    }

    /// Parse a fragment from an already-deserialized JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError`] if the value does not satisfy the fragment
    /// shape (missing `model`/`elements`, non-object element entries,
    /// missing ids, unknown kinds, relationships carrying a parent).
    pub fn from_value(label: &str, value: &Value) -> Result<Self, ShapeError> {
        let model = parse_model_record(label, value)?;

        let raw_elements = value
            .get("elements")
            .and_then(Value::as_array)
            .ok_or(ShapeError::MissingField {
                fragment: label.to_string(),
                element: "(fragment)".to_string(),
                field: "elements",
            })?;

        let mut elements = Vec::with_capacity(raw_elements.len() + 1);
        elements.push(Element::new(
            model.id.clone(),
            ElementKind::Model,
            model.name.clone(),
        ));

        for (index, raw) in raw_elements.iter().enumerate() {
            elements.push(parse_element(label, index, raw)?);
        }

        // Parentless packageable elements belong to this fragment's root.
        for element in &mut elements[1..] {
            if element.kind.is_structural()
                && element.kind != ElementKind::Model
                && element.parent_id.is_none()
            {
                element.parent_id = Some(model.id.clone());
            }
        }

        debug!(
            fragment = label,
            elements = elements.len(),
            "parsed fragment"
        );

        Ok(Self {
            label: label.to_string(),
            model,
            elements,
        })
    }

    /// Strict intra-fragment validation (phase one).
    ///
    /// # Errors
    ///
    /// Returns [`IntegrityError`] for duplicate ids, unresolved or
    /// kind-incompatible parents, and parent cycles; [`ShapeError`] for
    /// relationships missing an endpoint role.
    pub fn validate(&self) -> Result<(), WeldError> {
        let by_id: HashMap<&str, &Element> = {
            let mut map = HashMap::with_capacity(self.elements.len());
            for element in &self.elements {
                if map.insert(element.id.as_str(), element).is_some() {
                    return Err(IntegrityError::DuplicateId(element.id.clone()).into());
                }
            }
            map
        };

        for element in &self.elements {
            // Relationship kinds: all endpoint roles present as references.
            for role in element.kind.endpoint_roles() {
                let present = element
                    .attrs
                    .get(*role)
                    .is_some_and(|value| value.as_ref_id().is_some());
                if !present {
                    return Err(ShapeError::MissingField {
                        fragment: self.label.clone(),
                        element: format!("'{}'", element.id),
                        field: role,
                    }
                    .into());
                }
            }

            // Parents must resolve in this fragment and be kind-compatible.
            if let Some(parent_id) = element.parent_id.as_deref() {
                let Some(parent) = by_id.get(parent_id) else {
                    return Err(IntegrityError::DanglingReference {
                        element_id: element.id.clone(),
                        attribute: "parentId".to_string(),
                        target_id: parent_id.to_string(),
                    }
                    .into());
                };
                if !parent.kind.may_contain(element.kind) {
                    return Err(IntegrityError::InvalidContainment {
                        parent_id: parent.id.clone(),
                        parent_kind: parent.kind.to_string(),
                        child_id: element.id.clone(),
                        child_kind: element.kind.to_string(),
                    }
                    .into());
                }
            }
        }

        // Parent chains must terminate.
        for element in &self.elements {
            check_parent_chain(element, &by_id)?;
        }

        Ok(())
    }

    /// Consume the fragment, yielding its elements (model root first).
    #[must_use]
    pub fn into_elements(self) -> Vec<Element> {
        self.elements
    }
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// Extract the `model` record, accepting an object or a one-element array.
fn parse_model_record(label: &str, value: &Value) -> Result<ModelDescriptor, ShapeError> {
    let record = match value.get("model") {
        Some(Value::Object(map)) => map,
        Some(Value::Array(items)) => items.first().and_then(Value::as_object).ok_or(
            ShapeError::MissingField {
                fragment: label.to_string(),
                element: "(fragment)".to_string(),
                field: "model",
            },
        )?,
        _ => {
            return Err(ShapeError::MissingField {
                fragment: label.to_string(),
                element: "(fragment)".to_string(),
                field: "model",
            });
        }
    };

    // Tolerate a missing model id the way upstream does: synthesize one
    // from the fragment label so parentage still resolves.
    let id = record
        .get("id")
        .and_then(Value::as_str)
        .map_or_else(|| synthesize_model_id(label), ToString::to_string);
    let name = record
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("Model")
        .to_string();

    Ok(ModelDescriptor { id, name })
}

fn synthesize_model_id(label: &str) -> String {
    let slug: String = label
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();
    format!("model-from-{slug}")
}

/// Parse one element record from the `elements` array.
fn parse_element(label: &str, index: usize, raw: &Value) -> Result<Element, ShapeError> {
    let record = raw.as_object().ok_or_else(|| ShapeError::InvalidElement {
        fragment: label.to_string(),
        element: format!("elements[{index}]"),
    })?;

    let id = record
        .get("id")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or(ShapeError::MissingField {
            fragment: label.to_string(),
            element: format!("elements[{index}]"),
            field: "id",
        })?;

    let kind_str =
        record
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ShapeError::MissingField {
                fragment: label.to_string(),
                element: format!("'{id}'"),
                field: "type",
            })?;
    let kind: ElementKind = kind_str.parse().map_err(|_| ShapeError::UnknownKind {
        fragment: label.to_string(),
        element_id: id.to_string(),
        kind: kind_str.to_string(),
    })?;

    let parent_id = record.get("parentId").and_then(Value::as_str);
    if kind.is_relationship() && parent_id.is_some() {
        return Err(ShapeError::RelationshipWithParent {
            fragment: label.to_string(),
            element_id: id.to_string(),
        });
    }

    let mut element = Element::new(id, kind, record.get("name").and_then(Value::as_str).unwrap_or(""));
    element.parent_id = parent_id.map(ToString::to_string);
    element.description = record
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    // Pre-fused inputs carry their provenance; preserve it so re-fusing a
    // fused document stays idempotent.
    if let Some(sources) = record.get("sourceIds").and_then(Value::as_array) {
        element.source_ids = sources
            .iter()
            .filter_map(Value::as_str)
            .map(ToString::to_string)
            .collect();
    }

    for (key, value) in record {
        if RESERVED_FIELDS.contains(&key.as_str()) {
            continue;
        }
        match value {
            Value::String(text) => {
                let attr = if is_reference_key(kind, key) {
                    AttrValue::Ref(text.clone())
                } else {
                    AttrValue::Text(text.clone())
                };
                element.attrs.insert(key.clone(), attr);
            }
            other => {
                // Structured payloads (nested behaviors, pin lists, …) are
                // outside the closed kind set; note and move on.
                debug!(
                    fragment = label,
                    element = id,
                    key = %key,
                    value = %other,
                    "skipping non-string attribute"
                );
            }
        }
    }

    Ok(element)
}

/// Reference attributes follow the upstream `…Id` suffix convention; the
/// endpoint-role table catches any that do not.
fn is_reference_key(kind: ElementKind, key: &str) -> bool {
    key.ends_with("Id") || kind.endpoint_roles().contains(&key)
}

/// Walk an element's parent chain, erroring on a loop.
fn check_parent_chain(
    start: &Element,
    by_id: &HashMap<&str, &Element>,
) -> Result<(), IntegrityError> {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut path: Vec<String> = vec![start.id.clone()];
    visited.insert(start.id.as_str());

    let mut current = start.parent_id.as_deref();
    while let Some(parent_id) = current {
        path.push(parent_id.to_string());
        if !visited.insert(parent_id) {
            return Err(IntegrityError::ParentCycle { path });
        }
        current = by_id.get(parent_id).and_then(|e| e.parent_id.as_deref());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn fragment_json(elements: &str) -> String {
        format!(
            r#"{{
                "model": {{"id": "model-1", "name": "FanSystem"}},
                "elements": [{elements}]
            }}"#
        )
    }

    // -----------------------------------------------------------------------
    // Parsing
    // -----------------------------------------------------------------------

    #[test]
    fn model_record_is_promoted_to_element() {
        let json = fragment_json("");
        let frag = Fragment::from_json_str("req.json", &json).expect("parse");

        assert_eq!(frag.model.id, "model-1");
        assert_eq!(frag.elements.len(), 1);
        assert_eq!(frag.elements[0].kind, ElementKind::Model);
        assert_eq!(frag.elements[0].name, "FanSystem");
    }

    #[test]
    fn model_record_accepted_as_array() {
        let json = r#"{
            "model": [{"id": "model-1", "name": "FanSystem"}],
            "elements": []
        }"#;
        let frag = Fragment::from_json_str("req.json", json).expect("parse");
        assert_eq!(frag.model.id, "model-1");
    }

    #[test]
    fn missing_model_id_is_synthesized() {
        let json = r#"{"model": {"name": "FanSystem"}, "elements": []}"#;
        let frag = Fragment::from_json_str("req.json", json).expect("parse");
        assert_eq!(frag.model.id, "model-from-req-json");
    }

    #[test]
    fn parentless_packageables_land_under_the_root() {
        let json = fragment_json(
            r#"{"id": "pkg-1", "type": "Package", "name": "Main"},
               {"id": "req-1", "type": "Requirement", "name": "Auth", "parentId": "pkg-1"}"#,
        );
        let frag = Fragment::from_json_str("req.json", &json).expect("parse");

        let pkg = &frag.elements[1];
        assert_eq!(pkg.parent_id.as_deref(), Some("model-1"), "reparented");
        let req = &frag.elements[2];
        assert_eq!(req.parent_id.as_deref(), Some("pkg-1"), "explicit parent kept");
    }

    #[test]
    fn relationships_are_never_reparented() {
        let json = fragment_json(
            r#"{"id": "sat-1", "type": "Satisfy", "blockId": "blk-1", "requirementId": "req-1"}"#,
        );
        let frag = Fragment::from_json_str("req.json", &json).expect("parse");
        assert_eq!(frag.elements[1].parent_id, None);
    }

    #[test]
    fn id_suffix_fields_become_refs_and_others_text() {
        let json = fragment_json(
            r#"{"id": "req-1", "type": "Requirement", "name": "Auth",
                "reqId": "R-001", "typeId": "vt-1", "text": "shall authenticate"}"#,
        );
        let frag = Fragment::from_json_str("req.json", &json).expect("parse");
        let req = &frag.elements[1];

        assert_eq!(
            req.attrs.get("typeId"),
            Some(&AttrValue::Ref("vt-1".to_string()))
        );
        assert_eq!(
            req.attrs.get("reqId"),
            Some(&AttrValue::Text("R-001".to_string())),
            "reqId is requirement numbering, not a reference"
        );
        assert_eq!(
            req.attrs.get("text"),
            Some(&AttrValue::Text("shall authenticate".to_string()))
        );
    }

    #[test]
    fn source_ids_survive_reparsing() {
        let json = fragment_json(
            r#"{"id": "req-1", "type": "Requirement", "name": "Auth",
                "sourceIds": ["req-a", "req-b"]}"#,
        );
        let frag = Fragment::from_json_str("req.json", &json).expect("parse");
        let sources: Vec<_> = frag.elements[1].source_ids.iter().cloned().collect();
        assert_eq!(sources, vec!["req-a", "req-b"]);
    }

    // -----------------------------------------------------------------------
    // Shape rejections
    // -----------------------------------------------------------------------

    #[test]
    fn missing_elements_key_rejected() {
        let err = Fragment::from_json_str("bad.json", r#"{"model": {"id": "m"}}"#).unwrap_err();
        assert!(matches!(err, ShapeError::MissingField { field: "elements", .. }));
    }

    #[test]
    fn missing_model_rejected() {
        let err = Fragment::from_json_str("bad.json", r#"{"elements": []}"#).unwrap_err();
        assert!(matches!(err, ShapeError::MissingField { field: "model", .. }));
    }

    #[test]
    fn element_without_id_rejected() {
        let json = fragment_json(r#"{"type": "Block", "name": "Pump"}"#);
        let err = Fragment::from_json_str("bad.json", &json).unwrap_err();
        assert!(matches!(err, ShapeError::MissingField { field: "id", .. }));
        assert_eq!(err.code(), ErrorCode::FragmentMalformed);
    }

    #[test]
    fn unknown_kind_rejected_with_fragment_identity() {
        let json = fragment_json(r#"{"id": "x-1", "type": "Widget", "name": "W"}"#);
        let err = Fragment::from_json_str("gen-7.json", &json).unwrap_err();
        assert!(err.to_string().contains("gen-7.json"));
        assert_eq!(err.code(), ErrorCode::UnknownKind);
    }

    #[test]
    fn relationship_with_parent_rejected() {
        let json = fragment_json(
            r#"{"id": "sat-1", "type": "Satisfy", "parentId": "pkg-1",
                "blockId": "b", "requirementId": "r"}"#,
        );
        let err = Fragment::from_json_str("bad.json", &json).unwrap_err();
        assert_eq!(err.code(), ErrorCode::RelationshipWithParent);
    }

    #[test]
    fn invalid_json_reports_fragment() {
        let err = Fragment::from_json_str("trunc.json", "{\"model\":").unwrap_err();
        assert!(matches!(err, ShapeError::Json { .. }));
        assert!(err.to_string().contains("trunc.json"));
    }

    // -----------------------------------------------------------------------
    // Validation (strict intra-fragment phase)
    // -----------------------------------------------------------------------

    #[test]
    fn valid_fragment_passes() {
        let json = fragment_json(
            r#"{"id": "pkg-1", "type": "Package", "name": "Main"},
               {"id": "req-1", "type": "Requirement", "name": "Auth", "parentId": "pkg-1"},
               {"id": "blk-1", "type": "Block", "name": "Server", "parentId": "pkg-1"},
               {"id": "sat-1", "type": "Satisfy", "blockId": "blk-1", "requirementId": "req-1"}"#,
        );
        let frag = Fragment::from_json_str("ok.json", &json).expect("parse");
        frag.validate().expect("validate");
    }

    #[test]
    fn dangling_parent_is_an_integrity_error() {
        // Scenario: parentId pointing at a nonexistent id in the same
        // fragment must be rejected before fusion runs.
        let json = fragment_json(
            r#"{"id": "req-1", "type": "Requirement", "name": "Auth", "parentId": "pkg-missing"}"#,
        );
        let frag = Fragment::from_json_str("bad.json", &json).expect("parse");
        let err = frag.validate().unwrap_err();
        assert!(matches!(
            err,
            WeldError::Integrity(IntegrityError::DanglingReference { .. })
        ));
        assert!(err.to_string().contains("pkg-missing"));
    }

    #[test]
    fn duplicate_id_rejected() {
        let json = fragment_json(
            r#"{"id": "req-1", "type": "Requirement", "name": "A"},
               {"id": "req-1", "type": "Requirement", "name": "B"}"#,
        );
        let frag = Fragment::from_json_str("bad.json", &json).expect("parse");
        let err = frag.validate().unwrap_err();
        assert_eq!(err.code(), ErrorCode::DuplicateId);
    }

    #[test]
    fn containment_violation_rejected() {
        // A state may not live directly under a package.
        let json = fragment_json(
            r#"{"id": "pkg-1", "type": "Package", "name": "Main"},
               {"id": "st-1", "type": "State", "name": "Idle", "parentId": "pkg-1"}"#,
        );
        let frag = Fragment::from_json_str("bad.json", &json).expect("parse");
        let err = frag.validate().unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidContainment);
    }

    #[test]
    fn parent_cycle_rejected() {
        // Two packages claiming each other as parents.
        let json = fragment_json(
            r#"{"id": "pkg-a", "type": "Package", "name": "A", "parentId": "pkg-b"},
               {"id": "pkg-b", "type": "Package", "name": "B", "parentId": "pkg-a"}"#,
        );
        let frag = Fragment::from_json_str("bad.json", &json).expect("parse");
        let err = frag.validate().unwrap_err();
        assert_eq!(err.code(), ErrorCode::ParentCycle);
    }

    #[test]
    fn relationship_missing_endpoint_role_rejected() {
        let json = fragment_json(r#"{"id": "sat-1", "type": "Satisfy", "blockId": "blk-1"}"#);
        let frag = Fragment::from_json_str("bad.json", &json).expect("parse");
        let err = frag.validate().unwrap_err();
        assert!(err.to_string().contains("requirementId"));
    }

    #[test]
    fn cross_fragment_endpoint_refs_are_tolerated() {
        // blk-elsewhere lives in a sibling fragment; phase one must not
        // reject it. Only parentId resolution is strict here.
        let json = fragment_json(
            r#"{"id": "req-1", "type": "Requirement", "name": "Auth"},
               {"id": "sat-1", "type": "Satisfy",
                "blockId": "blk-elsewhere", "requirementId": "req-1"}"#,
        );
        let frag = Fragment::from_json_str("ok.json", &json).expect("parse");
        frag.validate().expect("cross-fragment refs are phase-two work");
    }
}
