//! Element records: the nodes and cross-cutting edges of a model graph.
//!
//! An [`Element`] is immutable once it enters a graph. A fusion run never
//! mutates its inputs; it produces a disjoint set of new elements, so runs
//! stay idempotent and side-effect-free for testing.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::kind::ElementKind;

// ---------------------------------------------------------------------------
// AttrValue
// ---------------------------------------------------------------------------

/// One attribute value: free text or a typed reference to another element.
///
/// The distinction matters to the fusion engine: `Ref` values are rewritten
/// through the id remap after clustering, `Text` values are concatenated
/// during canonical synthesis.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AttrValue {
    /// Free-text payload (descriptions, requirement text, guards, …).
    Text(String),
    /// Reference to another element by id.
    Ref(String),
}

impl AttrValue {
    /// The referenced id, if this is a reference value.
    #[must_use]
    pub fn as_ref_id(&self) -> Option<&str> {
        match self {
            Self::Ref(id) => Some(id),
            Self::Text(_) => None,
        }
    }

    /// The text payload, if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Ref(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Element
// ---------------------------------------------------------------------------

/// One typed node or relationship record in the model graph.
///
/// Invariants (enforced by fragment validation and the post-fusion
/// integrity check, not by this type):
///
/// - `id` is unique within a graph.
/// - `parent_id`, when present, resolves to an element whose kind
///   [`may_contain`](ElementKind::may_contain) this element's kind; the
///   parent relation is a tree.
/// - Relationship kinds never carry a `parent_id`; they carry the reference
///   attributes named by [`ElementKind::endpoint_roles`] instead.
/// - `source_ids` records the pre-fusion identities this element absorbed;
///   a freshly parsed element has an empty set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    /// Opaque stable identifier, assigned by the upstream generator.
    pub id: String,
    /// Kind from the closed element-kind set.
    pub kind: ElementKind,
    /// Display name. May be empty for relationship kinds.
    pub name: String,
    /// Containment parent, `None` for the model root and for relationships.
    pub parent_id: Option<String>,
    /// Primary free-text channel, fed to the similarity scorer.
    pub description: String,
    /// Remaining attributes, keyed by name. Ordered for determinism.
    pub attrs: BTreeMap<String, AttrValue>,
    /// Original pre-fusion identifiers merged into this element.
    pub source_ids: BTreeSet<String>,
}

impl Element {
    /// Create a bare element with no parent, description, or attributes.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: ElementKind, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            parent_id: None,
            description: String::new(),
            attrs: BTreeMap::new(),
            source_ids: BTreeSet::new(),
        }
    }

    /// Builder-style parent assignment.
    #[must_use]
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Builder-style description assignment.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder-style reference attribute.
    #[must_use]
    pub fn with_ref(mut self, key: impl Into<String>, target: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), AttrValue::Ref(target.into()));
        self
    }

    /// Builder-style text attribute.
    #[must_use]
    pub fn with_text(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), AttrValue::Text(text.into()));
        self
    }

    /// Iterate all reference-valued attributes as `(key, target_id)`.
    pub fn ref_attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs
            .iter()
            .filter_map(|(key, value)| value.as_ref_id().map(|id| (key.as_str(), id)))
    }

    /// The endpoint references of a relationship element, in role order.
    ///
    /// Structural kinds yield an empty vec. A missing role is skipped here;
    /// fragment validation rejects relationships with absent roles before
    /// they reach any consumer of this method.
    #[must_use]
    pub fn endpoint_refs(&self) -> Vec<(&'static str, &str)> {
        self.kind
            .endpoint_roles()
            .iter()
            .filter_map(|role| {
                self.attrs
                    .get(*role)
                    .and_then(AttrValue::as_ref_id)
                    .map(|id| (*role, id))
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
