//! Round-trip property: serializing a fused graph and parsing the result
//! yields a graph with the same ids, kinds, parent edges, and reference
//! edges — modulo the whitespace/metadata toggles, which must change
//! nothing but presentation.

use weld_core::config::{FusionConfig, OutputConfig};
use weld_core::graph::ElementGraph;
use weld_core::model::{Element, ElementKind};
use weld_fuse::FusionEngine;
use weld_xmi::writer::XmiWriter;
use weld_xmi::parse_xmi;

/// A graph exercising every emission path: nested packages, every
/// stereotyped kind, flow-like and trace relationships.
fn full_graph() -> ElementGraph {
    ElementGraph::new(vec![
        Element::new("model-1", ElementKind::Model, "FanSystem"),
        Element::new("pkg-1", ElementKind::Package, "Main").with_parent("model-1"),
        Element::new("pkg-2", ElementKind::Package, "Nested").with_parent("pkg-1"),
        Element::new("req-1", ElementKind::Requirement, "用户认证")
            .with_description("系统提供登录功能")
            .with_text("reqId", "R-001")
            .with_parent("pkg-2"),
        Element::new("req-2", ElementKind::Requirement, "Fan speed")
            .with_description("regulate speed")
            .with_parent("pkg-2"),
        Element::new("blk-1", ElementKind::Block, "Controller").with_parent("pkg-1"),
        Element::new("ifb-1", ElementKind::InterfaceBlock, "Bus").with_parent("pkg-1"),
        Element::new("act-1", ElementKind::Activity, "Spin up").with_parent("pkg-1"),
        Element::new("stm-1", ElementKind::StateMachine, "Lifecycle").with_parent("blk-1"),
        Element::new("st-1", ElementKind::State, "Idle").with_parent("stm-1"),
        Element::new("st-2", ElementKind::State, "Running").with_parent("stm-1"),
        Element::new("tc-1", ElementKind::TestCase, "Verify spin").with_parent("pkg-1"),
        Element::new("act-2", ElementKind::UseCase, "Operate fan").with_parent("pkg-1"),
        Element::new("actor-1", ElementKind::Actor, "Operator").with_parent("pkg-1"),
        Element::new("der-1", ElementKind::DeriveReqt, "")
            .with_ref("derivedRequirementId", "req-2")
            .with_ref("sourceRequirementId", "req-1"),
        Element::new("sat-1", ElementKind::Satisfy, "")
            .with_ref("blockId", "blk-1")
            .with_ref("requirementId", "req-1"),
        Element::new("ver-1", ElementKind::Verify, "")
            .with_ref("testCaseId", "tc-1")
            .with_ref("requirementId", "req-2"),
        Element::new("tr-1", ElementKind::Transition, "start")
            .with_ref("sourceId", "st-1")
            .with_ref("targetId", "st-2"),
    ])
    .expect("graph")
}

/// Structural isomorphism per the round-trip contract: ids, kinds, names,
/// parent edges, and reference edges all match.
fn assert_isomorphic(original: &ElementGraph, parsed: &ElementGraph) {
    assert_eq!(original.len(), parsed.len(), "element count");
    for element in original.iter() {
        let twin = parsed
            .get(&element.id)
            .unwrap_or_else(|| panic!("element '{}' missing after round trip", element.id));
        assert_eq!(twin.kind, element.kind, "kind of '{}'", element.id);
        assert_eq!(twin.name, element.name, "name of '{}'", element.id);
        assert_eq!(twin.parent_id, element.parent_id, "parent of '{}'", element.id);

        let refs: Vec<_> = element.ref_attrs().collect();
        let twin_refs: Vec<_> = twin.ref_attrs().collect();
        assert_eq!(twin_refs, refs, "reference edges of '{}'", element.id);
    }
}

#[test]
fn round_trip_preserves_the_graph() {
    let graph = full_graph();
    let xml = XmiWriter::new(OutputConfig::default())
        .write(&graph)
        .expect("write");
    let parsed = parse_xmi(&xml).expect("parse");
    assert_isomorphic(&graph, &parsed);
}

#[test]
fn round_trip_is_toggle_invariant() {
    let graph = full_graph();
    let mut parsed_variants = Vec::new();
    for pretty in [false, true] {
        for metadata in [false, true] {
            let xml = XmiWriter::new(OutputConfig { pretty, metadata })
                .write(&graph)
                .expect("write");
            parsed_variants.push(parse_xmi(&xml).expect("parse"));
        }
    }
    for parsed in &parsed_variants {
        assert_isomorphic(&graph, parsed);
    }
}

#[test]
fn round_trip_after_fusion() {
    // The full pipeline: fuse duplicated fragments, serialize, parse back,
    // and confirm the parsed graph still satisfies referential completeness.
    let elements = vec![
        Element::new("model-a", ElementKind::Model, "M"),
        Element::new("model-b", ElementKind::Model, "M"),
        Element::new("pkg-a", ElementKind::Package, "Alpha").with_parent("model-a"),
        Element::new("pkg-b", ElementKind::Package, "Omega").with_parent("model-b"),
        Element::new("req-a", ElementKind::Requirement, "Login")
            .with_description("log in")
            .with_parent("pkg-a"),
        Element::new("req-b", ElementKind::Requirement, "Login")
            .with_description("sign in")
            .with_parent("pkg-b"),
        Element::new("blk-a", ElementKind::Block, "Server").with_parent("pkg-a"),
        Element::new("sat-1", ElementKind::Satisfy, "")
            .with_ref("blockId", "blk-a")
            .with_ref("requirementId", "req-b"),
    ];
    let outcome = FusionEngine::new(FusionConfig::default())
        .expect("engine")
        .fuse(&elements)
        .expect("fuse");

    let xml = XmiWriter::new(OutputConfig::default())
        .write(&outcome.graph)
        .expect("write");
    let parsed = parse_xmi(&xml).expect("parse");

    assert_isomorphic(&outcome.graph, &parsed);
    parsed
        .verify_referential_integrity()
        .expect("parsed graph is referentially complete");
    assert_eq!(parsed.root().expect("root").id, "model-a");
}

mod random_trees {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Round trip holds for arbitrary package/requirement trees, with
        /// either pretty-print setting.
        #[test]
        fn prop_round_trip_random_trees(
            pkg_names in proptest::collection::vec("[A-Za-z]{1,10}", 1..5),
            req_names in proptest::collection::vec("[A-Za-z ]{1,16}", 0..8),
            pretty in proptest::bool::ANY,
        ) {
            let mut elements = vec![Element::new("model-0", ElementKind::Model, "M")];
            for (i, name) in pkg_names.iter().enumerate() {
                elements.push(
                    Element::new(format!("pkg-{i}"), ElementKind::Package, name.as_str())
                        .with_parent("model-0"),
                );
            }
            for (i, name) in req_names.iter().enumerate() {
                let parent = format!("pkg-{}", i % pkg_names.len());
                elements.push(
                    Element::new(format!("req-{i}"), ElementKind::Requirement, name.as_str())
                        .with_description("generated")
                        .with_parent(parent),
                );
            }

            let graph = ElementGraph::new(elements).expect("graph");
            let xml = XmiWriter::new(OutputConfig { pretty, metadata: false })
                .write(&graph)
                .expect("write");
            let parsed = parse_xmi(&xml).expect("parse");
            assert_isomorphic(&graph, &parsed);
        }
    }
}

#[test]
fn requirement_description_survives_via_the_stereotype_layer() {
    let graph = full_graph();
    let xml = XmiWriter::new(OutputConfig::default())
        .write(&graph)
        .expect("write");
    let parsed = parse_xmi(&xml).expect("parse");

    let req = parsed.get("req-1").expect("requirement");
    assert_eq!(req.description, "系统提供登录功能");
    assert_eq!(
        req.attrs.get("reqId").and_then(weld_core::model::AttrValue::as_text),
        Some("R-001")
    );
}
