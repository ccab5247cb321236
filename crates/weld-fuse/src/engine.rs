//! The fusion engine: partition, cluster, synthesize, remap.
//!
//! # Overview
//!
//! A fusion run consumes a multiset of elements (typically several parsed
//! fragments concatenated) and a merge threshold τ, and produces a fused
//! element set plus an id-remapping table:
//!
//! 1. Partition input elements by kind — only same-kind elements are ever
//!    merge candidates. Relationship kinds skip clustering entirely; they
//!    are usually unnamed, so text similarity carries no signal for them.
//! 2. Within each partition, score candidate pairs (bounded by the optional
//!    per-element cap) and union-find everything scoring ≥ τ. Scoring is
//!    read-only and fans out across a rayon pool; the union-find merge is
//!    sequential per partition.
//! 3. Synthesize one canonical element per cluster. All `Model` elements
//!    form a single forced cluster so the fused set has exactly one root.
//! 4. Rewrite every `parentId` and reference attribute across the entire
//!    output through the remap. Relationships whose endpoints collapse into
//!    one canonical element are dropped and counted, not silently kept.
//! 5. Emit the canonical set, the remap table, and the run statistics.
//!
//! # Determinism
//!
//! Given the same input list and configuration, the output element list,
//! remap table, and statistics are byte-identical across runs and thread
//! counts: partitions and cluster members are id-sorted before any
//! tie-break or concatenation, and no unordered map feeds the output.

#![allow(clippy::module_name_repetitions)]

use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{debug, info, instrument, warn};

use weld_core::config::FusionConfig;
use weld_core::error::{ConfigError, IntegrityError, WeldError};
use weld_core::graph::ElementGraph;
use weld_core::model::{AttrValue, Element, ElementKind};

use crate::cluster::UnionFind;
use crate::score::score;
use crate::stats::FusionStats;

/// Fixed delimiter for concatenated free-text values.
const TEXT_JOIN: &str = " | ";

/// Cascade limit for repair mode. Dropping a relationship can orphan a
/// reference to it, so repair iterates, bounded.
const MAX_REPAIR_PASSES: usize = 10;

// ---------------------------------------------------------------------------
// FusionOutcome
// ---------------------------------------------------------------------------

/// Everything a fusion run returns: the fused graph, the global id remap
/// (identity where unclustered), and the run statistics.
#[derive(Debug)]
pub struct FusionOutcome {
    pub graph: ElementGraph,
    pub remap: BTreeMap<String, String>,
    pub stats: FusionStats,
}

impl FusionOutcome {
    /// Returns `true` if no id was rewritten — the signature of re-fusing
    /// an already-fused set.
    #[must_use]
    pub fn is_identity_remap(&self) -> bool {
        self.remap.iter().all(|(from, to)| from == to)
    }
}

// ---------------------------------------------------------------------------
// FusionEngine
// ---------------------------------------------------------------------------

/// One configured fusion engine. Construction validates the configuration;
/// a run never mutates its input elements.
#[derive(Debug, Clone)]
pub struct FusionEngine {
    config: FusionConfig,
}

impl FusionEngine {
    /// Create an engine, rejecting invalid tuning values before any data is
    /// processed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for τ outside `[0, 1]`, a zero candidate
    /// cap, or non-positive weights.
    pub fn new(config: FusionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration this engine runs with.
    #[must_use]
    pub const fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Fuse an element multiset into a canonical set.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrityError`] for duplicate input ids or for any
    /// reference that does not resolve after remap (unless repair mode
    /// drops the offending relationship).
    #[instrument(skip(self, elements), fields(count = elements.len(), threshold = self.config.threshold))]
    pub fn fuse(&self, elements: &[Element]) -> Result<FusionOutcome, WeldError> {
        let mut seen: HashSet<&str> = HashSet::with_capacity(elements.len());
        for element in elements {
            if !seen.insert(element.id.as_str()) {
                return Err(IntegrityError::DuplicateId(element.id.clone()).into());
            }
        }

        let clusters = self.build_clusters(elements);

        let mut stats = FusionStats {
            input_elements: elements.len(),
            ..FusionStats::default()
        };

        // Canonical element per cluster, plus the remap and the input slot
        // where the canonical is emitted (the cluster's first occurrence in
        // input order, so child insertion order survives fusion).
        let mut remap: BTreeMap<String, String> = BTreeMap::new();
        let mut emit_at: HashMap<usize, Element> = HashMap::new();

        for cluster in &clusters {
            let members: Vec<&Element> = cluster.iter().map(|&slot| &elements[slot]).collect();
            if members.len() > 1 {
                stats.clusters_merged += 1;
                stats.merged_away += members.len() - 1;
                debug!(
                    canonical = %members[0].id,
                    absorbed = members.len() - 1,
                    kind = %members[0].kind,
                    "merging cluster"
                );
            }
            let canonical = synthesize(&members);
            for member in &members {
                remap.insert(member.id.clone(), canonical.id.clone());
            }
            let first_slot = cluster.iter().copied().min().unwrap_or_default();
            emit_at.insert(first_slot, canonical);
        }

        // Relationships pass through unclustered, with identity remap.
        for (slot, element) in elements.iter().enumerate() {
            if element.kind.is_relationship() {
                remap.insert(element.id.clone(), element.id.clone());
                emit_at.insert(slot, element.clone());
            }
        }

        // Assemble in input order and rewrite every reference through the
        // remap — parentId and reference attributes alike, relationship
        // elements included.
        let mut output: Vec<Element> = Vec::with_capacity(emit_at.len());
        for slot in 0..elements.len() {
            if let Some(mut element) = emit_at.remove(&slot) {
                rewrite_references(&mut element, &remap);
                output.push(element);
            }
        }

        self.postprocess_relationships(&mut output, &mut stats)?;

        stats.output_elements = output.len();
        let graph = ElementGraph::new(output)?;
        graph.verify_referential_integrity()?;

        info!(%stats, "fusion complete");
        Ok(FusionOutcome { graph, remap, stats })
    }

    /// Partition structural elements by kind and cluster each partition.
    ///
    /// Returned clusters hold input slots sorted by element id.
    fn build_clusters(&self, elements: &[Element]) -> Vec<Vec<usize>> {
        let mut partitions: BTreeMap<ElementKind, Vec<usize>> = BTreeMap::new();
        for (slot, element) in elements.iter().enumerate() {
            if element.kind.is_structural() {
                partitions.entry(element.kind).or_default().push(slot);
            }
        }
        for members in partitions.values_mut() {
            members.sort_by(|&a, &b| elements[a].id.cmp(&elements[b].id));
        }

        let mut clusters: Vec<Vec<usize>> = Vec::new();
        for (kind, members) in &partitions {
            if *kind == ElementKind::Model {
                // Every fragment contributes a model root; unify them all so
                // the fused set has exactly one.
                clusters.push(members.clone());
            } else {
                clusters.extend(self.cluster_partition(elements, members));
            }
        }
        clusters
    }

    /// Cluster one id-sorted partition under the ≥τ relation.
    fn cluster_partition(&self, elements: &[Element], members: &[usize]) -> Vec<Vec<usize>> {
        let n = members.len();
        if n <= 1 {
            return members.iter().map(|&slot| vec![slot]).collect();
        }

        let cap = self.config.candidate_cap.unwrap_or(n);
        let threshold = self.config.threshold;
        let config = &self.config;

        // Read-only pairwise scoring, fanned out over the partition. The
        // candidate window keeps cost bounded on large partitions.
        let merges: Vec<(usize, usize)> = (0..n)
            .into_par_iter()
            .flat_map_iter(|i| {
                let upper = (i + 1 + cap).min(n);
                (i + 1..upper).filter_map(move |j| {
                    let s = score(&elements[members[i]], &elements[members[j]], config);
                    (s >= threshold).then_some((i, j))
                })
            })
            .collect();

        let mut forest = UnionFind::new(n);
        for (i, j) in merges {
            forest.union(i, j);
        }
        forest
            .groups()
            .into_iter()
            .map(|group| group.into_iter().map(|idx| members[idx]).collect())
            .collect()
    }

    /// Post-remap relationship pass: drop fusion-artifact self-loops,
    /// optionally dedup identical edges, and apply repair mode.
    fn postprocess_relationships(
        &self,
        output: &mut Vec<Element>,
        stats: &mut FusionStats,
    ) -> Result<(), WeldError> {
        // Self-loops: every endpoint collapsed onto one canonical element.
        output.retain(|element| {
            if !element.kind.is_relationship() {
                return true;
            }
            let endpoints = element.endpoint_refs();
            let collapsed = endpoints.len() >= 2
                && endpoints.windows(2).all(|pair| pair[0].1 == pair[1].1);
            if collapsed {
                debug!(id = %element.id, kind = %element.kind, "dropping self-loop relationship");
                stats.self_loops_dropped += 1;
            }
            !collapsed
        });

        if self.config.dedup_relationships {
            dedup_relationships(output, stats);
        }

        if self.config.repair_dangling {
            repair_dangling_relationships(output, stats);
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Canonical synthesis
// ---------------------------------------------------------------------------

/// Synthesize the canonical element of a cluster. `members` is id-sorted;
/// singleton clusters pass through unchanged (self-canonical).
fn synthesize(members: &[&Element]) -> Element {
    if members.len() == 1 {
        return members[0].clone();
    }

    let first = members[0];

    // Name comes from the member with the longest description; the id sort
    // makes the smallest id win ties.
    let mut best = first;
    for &member in &members[1..] {
        if member.description.chars().count() > best.description.chars().count() {
            best = member;
        }
    }

    let description = join_distinct(members.iter().map(|m| m.description.trim()));

    // Structural (reference) attributes come from the first member in id
    // order; free-text attributes are concatenated across all members.
    let mut attrs: BTreeMap<String, AttrValue> = first
        .attrs
        .iter()
        .filter(|(_, value)| value.as_ref_id().is_some())
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    let text_keys: BTreeSet<&String> = members
        .iter()
        .flat_map(|m| {
            m.attrs
                .iter()
                .filter(|(_, v)| v.as_text().is_some())
                .map(|(k, _)| k)
        })
        .collect();
    for key in text_keys {
        if attrs.contains_key(key) {
            continue; // reference from the first member wins the key
        }
        let joined = join_distinct(
            members
                .iter()
                .filter_map(|m| m.attrs.get(key).and_then(AttrValue::as_text))
                .map(str::trim),
        );
        attrs.insert(key.clone(), AttrValue::Text(joined));
    }

    let mut source_ids: BTreeSet<String> = BTreeSet::new();
    for member in members {
        source_ids.insert(member.id.clone());
        source_ids.extend(member.source_ids.iter().cloned());
    }

    Element {
        id: first.id.clone(),
        kind: first.kind,
        name: best.name.clone(),
        parent_id: first.parent_id.clone(),
        description,
        attrs,
        source_ids,
    }
}

/// Concatenate distinct non-empty values in iteration order.
fn join_distinct<'a>(values: impl Iterator<Item = &'a str>) -> String {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut parts: Vec<&str> = Vec::new();
    for value in values {
        if !value.is_empty() && seen.insert(value) {
            parts.push(value);
        }
    }
    parts.join(TEXT_JOIN)
}

/// Rewrite `parentId` and every reference attribute through the remap.
fn rewrite_references(element: &mut Element, remap: &BTreeMap<String, String>) {
    if let Some(parent_id) = element.parent_id.as_mut() {
        if let Some(canonical) = remap.get(parent_id) {
            parent_id.clone_from(canonical);
        }
    }
    for value in element.attrs.values_mut() {
        if let AttrValue::Ref(target) = value {
            if let Some(canonical) = remap.get(target) {
                target.clone_from(canonical);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Relationship post-passes
// ---------------------------------------------------------------------------

/// Drop relationships identical in (kind, endpoints in role order) after
/// remap, keeping the smallest id per group.
fn dedup_relationships(output: &mut Vec<Element>, stats: &mut FusionStats) {
    let mut keeper: HashMap<(ElementKind, Vec<String>), String> = HashMap::new();
    for element in output.iter() {
        if !element.kind.is_relationship() {
            continue;
        }
        let key = (
            element.kind,
            element
                .endpoint_refs()
                .iter()
                .map(|(_, id)| (*id).to_string())
                .collect::<Vec<_>>(),
        );
        keeper
            .entry(key)
            .and_modify(|kept| {
                if element.id < *kept {
                    kept.clone_from(&element.id);
                }
            })
            .or_insert_with(|| element.id.clone());
    }

    output.retain(|element| {
        if !element.kind.is_relationship() {
            return true;
        }
        let key = (
            element.kind,
            element
                .endpoint_refs()
                .iter()
                .map(|(_, id)| (*id).to_string())
                .collect::<Vec<_>>(),
        );
        let keep = keeper.get(&key).is_none_or(|kept| *kept == element.id);
        if !keep {
            debug!(id = %element.id, "dropping duplicate relationship");
            stats.duplicate_relationships_dropped += 1;
        }
        keep
    });
}

/// Repair mode: iteratively drop relationships with unresolvable endpoints.
/// Iterates because dropping a relationship can orphan a reference to it.
fn repair_dangling_relationships(output: &mut Vec<Element>, stats: &mut FusionStats) {
    for _ in 0..MAX_REPAIR_PASSES {
        let ids: HashSet<String> = output.iter().map(|e| e.id.clone()).collect();
        let before = output.len();
        output.retain(|element| {
            if !element.kind.is_relationship() {
                return true;
            }
            let dangling = element
                .endpoint_refs()
                .iter()
                .find(|(_, target)| !ids.contains(*target))
                .map(|(role, target)| ((*role).to_string(), (*target).to_string()));
            if let Some((role, target)) = dangling {
                warn!(
                    id = %element.id,
                    role = %role,
                    target = %target,
                    "repair: dropping relationship with unresolved endpoint"
                );
                stats.dangling_relationships_dropped += 1;
                return false;
            }
            true
        });
        if output.len() == before {
            break;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
