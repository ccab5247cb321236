//! Fused JSON document: the downstream-facing mirror of the input contract.
//!
//! The document keeps the fragment shape — a `model` record plus a flat
//! `elements` array — so a fused output can be fed straight back through the
//! fragment parser (re-fusing it is a no-op). On top of the input shape it
//! carries each element's `sourceIds` and a `statistics` block with the
//! fusion counters and the content hash.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use weld_core::error::IntegrityError;
use weld_core::model::{AttrValue, Element};
use weld_fuse::{FusionOutcome, FusionStats};

// ---------------------------------------------------------------------------
// Document types
// ---------------------------------------------------------------------------

/// Root descriptor of the fused model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRecord {
    pub id: String,
    pub name: String,
}

/// Fusion statistics attached to the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    #[serde(flatten)]
    pub fusion: FusionStats,
    pub reduction_rate: f64,
    pub content_hash: String,
}

/// The fused JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedDocument {
    pub model: ModelRecord,
    pub elements: Vec<Value>,
    pub statistics: Statistics,
}

impl FusedDocument {
    /// Build the document from a fusion outcome.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrityError`] if the fused graph has no unique root.
    pub fn from_outcome(outcome: &FusionOutcome) -> Result<Self, IntegrityError> {
        let root = outcome.graph.root()?;
        let elements = outcome
            .graph
            .iter()
            .filter(|element| element.id != root.id)
            .map(element_to_value)
            .collect();

        Ok(Self {
            model: ModelRecord {
                id: root.id.clone(),
                name: root.name.clone(),
            },
            elements,
            statistics: Statistics {
                fusion: outcome.stats,
                reduction_rate: outcome.stats.reduction_rate(),
                content_hash: outcome.graph.content_hash(),
            },
        })
    }

    /// Serialize to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns a `serde_json` error only on a non-serializable value, which
    /// the document types cannot contain.
    pub fn to_json_string(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}

/// Flatten one element into the fragment record shape: reserved fields
/// first, then every attribute as a plain string value.
fn element_to_value(element: &Element) -> Value {
    let mut record = Map::new();
    record.insert("id".to_string(), Value::String(element.id.clone()));
    record.insert(
        "type".to_string(),
        Value::String(element.kind.to_string()),
    );
    if !element.name.is_empty() {
        record.insert("name".to_string(), Value::String(element.name.clone()));
    }
    if let Some(parent_id) = &element.parent_id {
        record.insert("parentId".to_string(), Value::String(parent_id.clone()));
    }
    if !element.description.is_empty() {
        record.insert(
            "description".to_string(),
            Value::String(element.description.clone()),
        );
    }
    for (key, value) in &element.attrs {
        let text = match value {
            AttrValue::Text(t) => t.clone(),
            AttrValue::Ref(r) => r.clone(),
        };
        record.insert(key.clone(), Value::String(text));
    }
    if !element.source_ids.is_empty() {
        record.insert(
            "sourceIds".to_string(),
            Value::Array(
                element
                    .source_ids
                    .iter()
                    .map(|id| Value::String(id.clone()))
                    .collect(),
            ),
        );
    }
    Value::Object(record)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
