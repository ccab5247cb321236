//! Error taxonomy: integrity, shape, and configuration failures.
//!
//! # Overview
//!
//! Three failure domains, mirrored from the pipeline contract:
//!
//! - [`IntegrityError`] — the graph itself is unsound (dangling reference,
//!   missing/duplicate root, parent cycle, illegal containment). Always
//!   fatal to the run and always names the offending element id(s).
//! - [`ShapeError`] — a fragment is malformed (missing required field,
//!   unknown kind, relationship carrying a parent). Fatal per fragment;
//!   other fragments keep their own diagnostics.
//! - [`ConfigError`] — invalid tuning values, rejected at construction
//!   before any data is processed.
//!
//! There is no silent recovery: a merge that would produce a dangling
//! reference raises instead of auto-dropping. Downstream consumers receive
//! either a complete validated graph or a typed error, never partial output.

use std::fmt;

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigInvalid,
    FragmentMalformed,
    UnknownKind,
    RelationshipWithParent,
    DuplicateId,
    DanglingReference,
    MissingRoot,
    MultipleRoots,
    ParentCycle,
    InvalidContainment,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigInvalid => "E1001",
            Self::FragmentMalformed => "E2001",
            Self::UnknownKind => "E2002",
            Self::RelationshipWithParent => "E2003",
            Self::DuplicateId => "E3001",
            Self::DanglingReference => "E3002",
            Self::MissingRoot => "E3003",
            Self::MultipleRoots => "E3004",
            Self::ParentCycle => "E3005",
            Self::InvalidContainment => "E3006",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigInvalid => "Invalid fusion configuration",
            Self::FragmentMalformed => "Malformed input fragment",
            Self::UnknownKind => "Unknown element kind",
            Self::RelationshipWithParent => "Relationship element carries a parent",
            Self::DuplicateId => "Duplicate element id",
            Self::DanglingReference => "Dangling element reference",
            Self::MissingRoot => "No root element",
            Self::MultipleRoots => "Multiple root elements",
            Self::ParentCycle => "Cycle in parent chain",
            Self::InvalidContainment => "Containment not allowed for these kinds",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigInvalid => Some("Keep the threshold within [0, 1] and weights positive."),
            Self::FragmentMalformed => {
                Some("Regenerate the fragment; every element needs id and type.")
            }
            Self::UnknownKind => Some("Use one of the documented element kinds."),
            Self::RelationshipWithParent => {
                Some("Relationships reference participants by attribute, not by parentId.")
            }
            Self::DuplicateId => Some("Upstream generators must emit unique element ids."),
            Self::DanglingReference => {
                Some("Every reference must resolve inside the fragment it is generated in.")
            }
            Self::MissingRoot => Some("Each fragment needs a model record to root its elements."),
            Self::MultipleRoots => None,
            Self::ParentCycle => Some("Break the parentId loop in the generating agent."),
            Self::InvalidContainment => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ---------------------------------------------------------------------------
// IntegrityError
// ---------------------------------------------------------------------------

/// The graph violates a structural invariant. Fatal to the run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntegrityError {
    /// Two elements share one id within a single graph.
    #[error("duplicate element id '{0}'")]
    DuplicateId(String),

    /// A `parentId` or reference attribute points at a missing element.
    #[error("element '{element_id}': {attribute} references missing id '{target_id}'")]
    DanglingReference {
        element_id: String,
        attribute: String,
        target_id: String,
    },

    /// No structural element without a parent exists.
    #[error("no root element found")]
    MissingRoot,

    /// More than one structural element has no parent.
    #[error("multiple root elements: {}", ids.join(", "))]
    MultipleRoots { ids: Vec<String> },

    /// The parent chain of an element loops back on itself.
    #[error("cycle in parent chain: {}", path.join(" -> "))]
    ParentCycle { path: Vec<String> },

    /// A parent kind may not contain a child of this kind.
    #[error(
        "element '{child_id}' ({child_kind}) may not be contained by '{parent_id}' ({parent_kind})"
    )]
    InvalidContainment {
        parent_id: String,
        parent_kind: String,
        child_id: String,
        child_kind: String,
    },
}

impl IntegrityError {
    /// The machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::DuplicateId(_) => ErrorCode::DuplicateId,
            Self::DanglingReference { .. } => ErrorCode::DanglingReference,
            Self::MissingRoot => ErrorCode::MissingRoot,
            Self::MultipleRoots { .. } => ErrorCode::MultipleRoots,
            Self::ParentCycle { .. } => ErrorCode::ParentCycle,
            Self::InvalidContainment { .. } => ErrorCode::InvalidContainment,
        }
    }
}

// ---------------------------------------------------------------------------
// ShapeError
// ---------------------------------------------------------------------------

/// A fragment does not satisfy the input contract. Fatal per fragment.
///
/// Carries the fragment label so multi-fragment runs can report which
/// generator produced the bad output.
#[derive(Debug, thiserror::Error)]
pub enum ShapeError {
    /// The fragment is not parseable JSON of the expected shape.
    #[error("fragment '{fragment}': {source}")]
    Json {
        fragment: String,
        #[source]
        source: serde_json::Error,
    },

    /// A required field is absent.
    #[error("fragment '{fragment}': element {element}: missing required field '{field}'")]
    MissingField {
        fragment: String,
        element: String,
        field: &'static str,
    },

    /// An entry in the `elements` array is not a JSON object.
    #[error("fragment '{fragment}': element {element}: expected a JSON object")]
    InvalidElement { fragment: String, element: String },

    /// The `type` field is not in the closed kind set.
    #[error("fragment '{fragment}': element '{element_id}': unknown kind '{kind}'")]
    UnknownKind {
        fragment: String,
        element_id: String,
        kind: String,
    },

    /// A relationship element carries a `parentId`.
    #[error("fragment '{fragment}': relationship '{element_id}' must not carry a parentId")]
    RelationshipWithParent {
        fragment: String,
        element_id: String,
    },
}

impl ShapeError {
    /// The machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Json { .. } | Self::MissingField { .. } | Self::InvalidElement { .. } => {
                ErrorCode::FragmentMalformed
            }
            Self::UnknownKind { .. } => ErrorCode::UnknownKind,
            Self::RelationshipWithParent { .. } => ErrorCode::RelationshipWithParent,
        }
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Invalid tuning values, rejected before any data is processed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("merge threshold {0} outside [0, 1]")]
    ThresholdOutOfRange(f64),

    #[error("candidate cap must be at least 1")]
    ZeroCandidateCap,

    #[error("scorer weights must be positive and finite (name={name}, description={description})")]
    InvalidWeights { name: f64, description: f64 },
}

impl ConfigError {
    /// The machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::ConfigInvalid
    }
}

// ---------------------------------------------------------------------------
// WeldError
// ---------------------------------------------------------------------------

/// Umbrella error for the whole pipeline.
#[derive(Debug, thiserror::Error)]
pub enum WeldError {
    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl WeldError {
    /// The machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Integrity(e) => e.code(),
            Self::Shape(e) => e.code(),
            Self::Config(e) => e.code(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::ConfigInvalid,
            ErrorCode::FragmentMalformed,
            ErrorCode::UnknownKind,
            ErrorCode::RelationshipWithParent,
            ErrorCode::DuplicateId,
            ErrorCode::DanglingReference,
            ErrorCode::MissingRoot,
            ErrorCode::MultipleRoots,
            ErrorCode::ParentCycle,
            ErrorCode::InvalidContainment,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::DanglingReference.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn dangling_reference_names_the_offender() {
        let err = IntegrityError::DanglingReference {
            element_id: "req-9".to_string(),
            attribute: "parentId".to_string(),
            target_id: "pkg-missing".to_string(),
        };
        let s = err.to_string();
        assert!(s.contains("req-9"));
        assert!(s.contains("pkg-missing"));
        assert_eq!(err.code(), ErrorCode::DanglingReference);
    }

    #[test]
    fn parent_cycle_displays_the_path() {
        let err = IntegrityError::ParentCycle {
            path: vec!["a".to_string(), "b".to_string(), "a".to_string()],
        };
        assert!(err.to_string().contains("a -> b -> a"));
    }

    #[test]
    fn weld_error_forwards_codes() {
        let err: WeldError = ConfigError::ThresholdOutOfRange(1.5).into();
        assert_eq!(err.code(), ErrorCode::ConfigInvalid);
    }
}
