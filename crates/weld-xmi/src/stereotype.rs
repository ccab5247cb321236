//! Two-layer type mapping: base metamodel element + domain stereotype.
//!
//! # Overview
//!
//! The serialized document mirrors the "base UML node + SysML stereotype"
//! structure: every element is emitted as a generic container tag carrying a
//! base `xmi:type`, and domain-specific kinds additionally get a stereotype
//! application record at the document root binding the domain qualifier
//! (`sysml:Requirement`, `sysml:Satisfy`, …) to the base node.
//!
//! Several kinds share one base type (`uml:Class` backs requirements and
//! blocks alike), so the reader resolves kinds base-type-first and lets the
//! stereotype applications refine them.

use weld_core::model::ElementKind;

/// The three fixed namespace declarations, emitted once at the document
/// root: structural metamodel, base modeling language, domain profile.
pub const NAMESPACES: [(&str, &str); 3] = [
    ("xmlns:xmi", "http://www.omg.org/spec/XMI/20131001"),
    ("xmlns:uml", "http://www.omg.org/spec/UML/20131001"),
    ("xmlns:sysml", "http://www.omg.org/spec/SysML/20181001/SysML"),
];

/// One stereotype application: the root-level tag and the attribute naming
/// the stereotyped base element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stereotype {
    /// Qualified tag of the application record, e.g. `sysml:Requirement`.
    pub tag: &'static str,
    /// Attribute binding the record to its base node, e.g. `base_Class`.
    pub base_attr: &'static str,
}

/// Base `xmi:type` for an element kind.
#[must_use]
pub const fn xmi_type(kind: ElementKind) -> &'static str {
    match kind {
        ElementKind::Model => "uml:Model",
        ElementKind::Package => "uml:Package",
        ElementKind::Requirement | ElementKind::Block | ElementKind::InterfaceBlock => "uml:Class",
        ElementKind::Activity | ElementKind::TestCase => "uml:Activity",
        ElementKind::Action => "uml:OpaqueAction",
        ElementKind::StateMachine => "uml:StateMachine",
        ElementKind::State => "uml:State",
        ElementKind::Actor => "uml:Actor",
        ElementKind::UseCase => "uml:UseCase",
        ElementKind::DeriveReqt | ElementKind::Satisfy | ElementKind::Verify => "uml:Abstraction",
        ElementKind::Flow => "uml:InformationFlow",
        ElementKind::Transition => "uml:Transition",
        ElementKind::Connector => "uml:Connector",
    }
}

/// Stereotype application for a kind, if the domain profile declares one.
#[must_use]
pub const fn stereotype(kind: ElementKind) -> Option<Stereotype> {
    match kind {
        ElementKind::Requirement => Some(Stereotype {
            tag: "sysml:Requirement",
            base_attr: "base_Class",
        }),
        ElementKind::Block => Some(Stereotype {
            tag: "sysml:Block",
            base_attr: "base_Class",
        }),
        ElementKind::InterfaceBlock => Some(Stereotype {
            tag: "sysml:InterfaceBlock",
            base_attr: "base_Class",
        }),
        ElementKind::TestCase => Some(Stereotype {
            tag: "sysml:TestCase",
            base_attr: "base_Behavior",
        }),
        ElementKind::DeriveReqt => Some(Stereotype {
            tag: "sysml:DeriveReqt",
            base_attr: "base_Abstraction",
        }),
        ElementKind::Satisfy => Some(Stereotype {
            tag: "sysml:Satisfy",
            base_attr: "base_Abstraction",
        }),
        ElementKind::Verify => Some(Stereotype {
            tag: "sysml:Verify",
            base_attr: "base_Abstraction",
        }),
        _ => None,
    }
}

/// Provisional kind for a base `xmi:type`, before stereotype refinement.
///
/// Shared base types resolve to the plainest kind (`uml:Class` → `Block`,
/// `uml:Activity` → `Activity`); a stereotype application upgrades them.
/// `uml:Abstraction` has no meaning without its stereotype, so it resolves
/// to `None` here and the reader insists on the application record.
#[must_use]
pub fn kind_from_xmi_type(xmi: &str) -> Option<ElementKind> {
    match xmi {
        "uml:Model" => Some(ElementKind::Model),
        "uml:Package" => Some(ElementKind::Package),
        "uml:Class" => Some(ElementKind::Block),
        "uml:Activity" => Some(ElementKind::Activity),
        "uml:OpaqueAction" => Some(ElementKind::Action),
        "uml:StateMachine" => Some(ElementKind::StateMachine),
        "uml:State" => Some(ElementKind::State),
        "uml:Actor" => Some(ElementKind::Actor),
        "uml:UseCase" => Some(ElementKind::UseCase),
        "uml:InformationFlow" => Some(ElementKind::Flow),
        "uml:Transition" => Some(ElementKind::Transition),
        "uml:Connector" => Some(ElementKind::Connector),
        _ => None,
    }
}

/// Kind refinement for a stereotype application tag.
#[must_use]
pub fn kind_from_stereotype_tag(tag: &str) -> Option<ElementKind> {
    match tag {
        "sysml:Requirement" => Some(ElementKind::Requirement),
        "sysml:Block" => Some(ElementKind::Block),
        "sysml:InterfaceBlock" => Some(ElementKind::InterfaceBlock),
        "sysml:TestCase" => Some(ElementKind::TestCase),
        "sysml:DeriveReqt" => Some(ElementKind::DeriveReqt),
        "sysml:Satisfy" => Some(ElementKind::Satisfy),
        "sysml:Verify" => Some(ElementKind::Verify),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_a_base_type() {
        for kind in ElementKind::ALL {
            assert!(xmi_type(kind).starts_with("uml:"), "{kind}");
        }
    }

    #[test]
    fn stereotype_tags_round_trip_to_kinds() {
        for kind in ElementKind::ALL {
            if let Some(app) = stereotype(kind) {
                assert_eq!(kind_from_stereotype_tag(app.tag), Some(kind), "{kind}");
            }
        }
    }

    #[test]
    fn base_types_without_stereotypes_round_trip_directly() {
        for kind in ElementKind::ALL {
            if stereotype(kind).is_none() && kind != ElementKind::TestCase {
                let base = xmi_type(kind);
                assert_eq!(
                    kind_from_xmi_type(base),
                    Some(kind),
                    "{kind} must be recoverable from {base} alone"
                );
            }
        }
    }

    #[test]
    fn trace_kinds_share_the_abstraction_base() {
        for kind in [
            ElementKind::DeriveReqt,
            ElementKind::Satisfy,
            ElementKind::Verify,
        ] {
            assert_eq!(xmi_type(kind), "uml:Abstraction");
            assert_eq!(
                stereotype(kind).map(|s| s.base_attr),
                Some("base_Abstraction")
            );
        }
        // Without a stereotype the base type is ambiguous by design.
        assert_eq!(kind_from_xmi_type("uml:Abstraction"), None);
    }
}
