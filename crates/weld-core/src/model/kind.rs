//! The closed set of element kinds and their structural rules.
//!
//! # Overview
//!
//! Every element in a model graph carries exactly one [`ElementKind`]. Kinds
//! fall into two families:
//!
//! - **Structural** kinds form the containment tree (`parentId` edges):
//!   packages, requirements, blocks, activities, state machines, …
//! - **Relationship** kinds are cross-cutting edges layered over the tree
//!   (derive/satisfy/verify/flow/transition/connector). They never carry a
//!   `parentId`; their participation is expressed through reference
//!   attributes named by [`ElementKind::endpoint_roles`].
//!
//! Containment is type-constrained: [`ElementKind::may_contain`] is the
//! single source of truth for which parent/child pairings are legal.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

// ---------------------------------------------------------------------------
// ElementKind
// ---------------------------------------------------------------------------

/// The closed element-kind set.
///
/// Serialized with the exact variant name (`"Requirement"`, `"DeriveReqt"`,
/// …) to match the fragment JSON contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    // Structural kinds.
    Model,
    Package,
    Requirement,
    Block,
    InterfaceBlock,
    Activity,
    Action,
    StateMachine,
    State,
    Actor,
    UseCase,
    TestCase,
    // Relationship kinds.
    DeriveReqt,
    Satisfy,
    Verify,
    Flow,
    Transition,
    Connector,
}

impl ElementKind {
    /// Every kind, structural first, in declaration order.
    pub const ALL: [Self; 18] = [
        Self::Model,
        Self::Package,
        Self::Requirement,
        Self::Block,
        Self::InterfaceBlock,
        Self::Activity,
        Self::Action,
        Self::StateMachine,
        Self::State,
        Self::Actor,
        Self::UseCase,
        Self::TestCase,
        Self::DeriveReqt,
        Self::Satisfy,
        Self::Verify,
        Self::Flow,
        Self::Transition,
        Self::Connector,
    ];

    const fn as_str(self) -> &'static str {
        match self {
            Self::Model => "Model",
            Self::Package => "Package",
            Self::Requirement => "Requirement",
            Self::Block => "Block",
            Self::InterfaceBlock => "InterfaceBlock",
            Self::Activity => "Activity",
            Self::Action => "Action",
            Self::StateMachine => "StateMachine",
            Self::State => "State",
            Self::Actor => "Actor",
            Self::UseCase => "UseCase",
            Self::TestCase => "TestCase",
            Self::DeriveReqt => "DeriveReqt",
            Self::Satisfy => "Satisfy",
            Self::Verify => "Verify",
            Self::Flow => "Flow",
            Self::Transition => "Transition",
            Self::Connector => "Connector",
        }
    }

    /// Returns `true` for the cross-cutting relationship kinds.
    #[must_use]
    pub const fn is_relationship(self) -> bool {
        matches!(
            self,
            Self::DeriveReqt
                | Self::Satisfy
                | Self::Verify
                | Self::Flow
                | Self::Transition
                | Self::Connector
        )
    }

    /// Returns `true` for kinds that participate in the containment tree.
    #[must_use]
    pub const fn is_structural(self) -> bool {
        !self.is_relationship()
    }

    /// Whether an element of this kind may contain a child of `child` kind.
    ///
    /// Relationship kinds are never legal on either side of a containment
    /// edge.
    #[must_use]
    pub const fn may_contain(self, child: Self) -> bool {
        match self {
            Self::Model => matches!(child, Self::Package),
            Self::Package => matches!(
                child,
                Self::Package
                    | Self::Requirement
                    | Self::Block
                    | Self::InterfaceBlock
                    | Self::Activity
                    | Self::StateMachine
                    | Self::Actor
                    | Self::UseCase
                    | Self::TestCase
            ),
            // Nested requirements decompose a parent requirement.
            Self::Requirement => matches!(child, Self::Requirement),
            // A block owns nested parts and its classifier behavior.
            Self::Block => matches!(child, Self::Block | Self::StateMachine),
            Self::Activity => matches!(child, Self::Action),
            Self::StateMachine => matches!(child, Self::State),
            _ => false,
        }
    }

    /// The reference-attribute names a relationship of this kind must carry,
    /// in emission order. Empty for structural kinds.
    #[must_use]
    pub const fn endpoint_roles(self) -> &'static [&'static str] {
        match self {
            Self::DeriveReqt => &["derivedRequirementId", "sourceRequirementId"],
            Self::Satisfy => &["blockId", "requirementId"],
            Self::Verify => &["testCaseId", "requirementId"],
            Self::Flow | Self::Transition | Self::Connector => &["sourceId", "targetId"],
            _ => &[],
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown element kind '{s}'"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
