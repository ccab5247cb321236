//! In-memory element graph: owned node table plus derived indexes.
//!
//! # Overview
//!
//! [`ElementGraph`] is a read-only view over an owned element table with two
//! derived indexes (by-parent and by-referenced-id), rebuilt whenever the
//! underlying node set changes. Lookup by id is O(1); `children_of` is
//! O(children); `incoming_references` is O(degree).
//!
//! Element insertion order is preserved — the serializer's child-order
//! contract ("first-seen order, not re-sorted") depends on it.
//!
//! # Canonical path keys
//!
//! Every element has a stable fingerprint `Kind::Root.Pkg.….Name` derived
//! from its containment path. Keys are used in logs, diagnostics, and the
//! fused document; computation is cycle-safe (a parent loop surfaces as
//! [`IntegrityError::ParentCycle`], it does not recurse forever).

use std::collections::{HashMap, HashSet};
use tracing::instrument;

use crate::error::IntegrityError;
use crate::model::Element;

// ---------------------------------------------------------------------------
// ElementGraph
// ---------------------------------------------------------------------------

/// Read-only graph over an owned, insertion-ordered element set.
#[derive(Debug, Clone)]
pub struct ElementGraph {
    elements: Vec<Element>,
    /// id → slot in `elements`.
    index: HashMap<String, usize>,
    /// parent id → child slots, in first-seen order.
    children: HashMap<String, Vec<usize>>,
    /// referenced id → referring slots (reference attributes only).
    referenced_by: HashMap<String, Vec<usize>>,
}

impl ElementGraph {
    /// Build a graph from an element set.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrityError::DuplicateId`] if two elements share an id.
    #[instrument(skip(elements), fields(count = elements.len()))]
    pub fn new(elements: Vec<Element>) -> Result<Self, IntegrityError> {
        let mut graph = Self {
            elements,
            index: HashMap::new(),
            children: HashMap::new(),
            referenced_by: HashMap::new(),
        };
        graph.rebuild()?;
        Ok(graph)
    }

    /// Rebuild the derived indexes from the node table.
    fn rebuild(&mut self) -> Result<(), IntegrityError> {
        self.index = HashMap::with_capacity(self.elements.len());
        self.children.clear();
        self.referenced_by.clear();

        for (slot, element) in self.elements.iter().enumerate() {
            if self.index.insert(element.id.clone(), slot).is_some() {
                return Err(IntegrityError::DuplicateId(element.id.clone()));
            }
        }
        for (slot, element) in self.elements.iter().enumerate() {
            if let Some(parent_id) = &element.parent_id {
                self.children.entry(parent_id.clone()).or_default().push(slot);
            }
            for (_, target) in element.ref_attrs() {
                self.referenced_by
                    .entry(target.to_string())
                    .or_default()
                    .push(slot);
            }
        }
        Ok(())
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns `true` if the graph holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Look up an element by id. O(1).
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Element> {
        self.index.get(id).map(|&slot| &self.elements[slot])
    }

    /// Returns `true` if `id` names an element in this graph.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Iterate elements in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter()
    }

    /// Children of `id` in first-seen order. O(children).
    pub fn children_of(&self, id: &str) -> impl Iterator<Item = &Element> {
        self.children
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(|&slot| &self.elements[slot])
    }

    /// Elements referencing `id` through a reference attribute. O(degree).
    ///
    /// This is how incoming relationship edges are answered: a `Satisfy`
    /// pointing at a requirement shows up here for that requirement's id.
    pub fn incoming_references(&self, id: &str) -> impl Iterator<Item = &Element> {
        self.referenced_by
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(|&slot| &self.elements[slot])
    }

    /// The unique structural element without a parent.
    ///
    /// # Errors
    ///
    /// [`IntegrityError::MissingRoot`] if no parentless structural element
    /// exists, [`IntegrityError::MultipleRoots`] if more than one does.
    pub fn root(&self) -> Result<&Element, IntegrityError> {
        let mut roots = self
            .elements
            .iter()
            .filter(|e| e.kind.is_structural() && e.parent_id.is_none());

        let Some(first) = roots.next() else {
            return Err(IntegrityError::MissingRoot);
        };
        let extra: Vec<String> = roots.map(|e| e.id.clone()).collect();
        if extra.is_empty() {
            Ok(first)
        } else {
            let mut ids = vec![first.id.clone()];
            ids.extend(extra);
            Err(IntegrityError::MultipleRoots { ids })
        }
    }

    /// Canonical path key `Kind::Root.….Name` for an element.
    ///
    /// Elements without a name contribute their id to the path instead.
    ///
    /// # Errors
    ///
    /// [`IntegrityError::ParentCycle`] if the parent chain loops, with the
    /// offending path.
    pub fn canonical_key(&self, id: &str) -> Result<Option<String>, IntegrityError> {
        let Some(element) = self.get(id) else {
            return Ok(None);
        };

        let mut segments: Vec<&str> = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut trail: Vec<String> = Vec::new();
        let mut current = Some(element);

        while let Some(elem) = current {
            trail.push(elem.id.clone());
            if !visited.insert(elem.id.as_str()) {
                return Err(IntegrityError::ParentCycle { path: trail });
            }
            segments.push(if elem.name.is_empty() {
                &elem.id
            } else {
                &elem.name
            });
            current = elem.parent_id.as_deref().and_then(|pid| self.get(pid));
        }

        segments.reverse();
        Ok(Some(format!("{}::{}", element.kind, segments.join("."))))
    }

    /// Verify that every `parentId` and reference attribute resolves within
    /// this graph (phase-two referential completeness).
    ///
    /// # Errors
    ///
    /// [`IntegrityError::DanglingReference`] naming the first offender, in
    /// insertion order.
    pub fn verify_referential_integrity(&self) -> Result<(), IntegrityError> {
        for element in &self.elements {
            if let Some(parent_id) = element.parent_id.as_deref() {
                if !self.contains(parent_id) {
                    return Err(IntegrityError::DanglingReference {
                        element_id: element.id.clone(),
                        attribute: "parentId".to_string(),
                        target_id: parent_id.to_string(),
                    });
                }
            }
            for (key, target) in element.ref_attrs() {
                if !self.contains(target) {
                    return Err(IntegrityError::DanglingReference {
                        element_id: element.id.clone(),
                        attribute: key.to_string(),
                        target_id: target.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Content hash of the element set for downstream cache invalidation.
    ///
    /// Derived from the id-sorted elements, so it changes exactly when the
    /// fused content changes and is independent of insertion order.
    #[must_use]
    pub fn content_hash(&self) -> String {
        let mut sorted: Vec<&Element> = self.elements.iter().collect();
        sorted.sort_unstable_by(|a, b| a.id.cmp(&b.id));

        let mut hasher = blake3::Hasher::new();
        for element in sorted {
            hasher.update(element.id.as_bytes());
            hasher.update(b"\x00");
            hasher.update(element.kind.to_string().as_bytes());
            hasher.update(b"\x00");
            hasher.update(element.name.as_bytes());
            hasher.update(b"\x00");
            hasher.update(element.parent_id.as_deref().unwrap_or("").as_bytes());
            hasher.update(b"\x00");
            hasher.update(element.description.as_bytes());
            hasher.update(b"\x00");
            for (key, value) in &element.attrs {
                hasher.update(key.as_bytes());
                hasher.update(b"\x01");
                match value {
                    crate::model::AttrValue::Text(t) => {
                        hasher.update(b"t");
                        hasher.update(t.as_bytes());
                    }
                    crate::model::AttrValue::Ref(r) => {
                        hasher.update(b"r");
                        hasher.update(r.as_bytes());
                    }
                }
                hasher.update(b"\x00");
            }
            for source in &element.source_ids {
                hasher.update(source.as_bytes());
                hasher.update(b"\x02");
            }
        }
        format!("blake3:{}", hasher.finalize())
    }

    /// Consume the graph, yielding the element set in insertion order.
    #[must_use]
    pub fn into_elements(self) -> Vec<Element> {
        self.elements
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
