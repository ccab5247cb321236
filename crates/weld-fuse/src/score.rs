//! Pairwise similarity scoring between same-kind elements.
//!
//! # Overview
//!
//! `score(a, b)` returns a bounded equivalence score in `[0, 1]`, defined
//! only for elements of identical kind (mismatched kinds score 0 before any
//! text is compared — a mismatched pair reaching the text channels is a
//! programming error upstream, not a runtime condition here).
//!
//! Two channels feed the score:
//!
//! 1. **Name** — normalized string-edit-distance similarity over trimmed
//!    names (default weight 0.4).
//! 2. **Description** — length-weighted token overlap over the description
//!    text (default weight 0.6).
//!
//! Two rules sit ahead of the weighted combination:
//!
//! - **Identity**: equal non-empty trimmed names of the same kind score
//!    exactly 1.0. Same kind + same name is the canonical-key identity the
//!    upstream generators rely on; divergent descriptions are merged, not
//!    treated as evidence of distinctness.
//! - **No signal, no merge**: two empty names score 0.0 in the name channel
//!    (unnamed elements must not mass-merge), and a missing description on
//!    either side scores 0.0 in the description channel. When both
//!    descriptions are absent the name channel carries the full weight.
//!
//! The function is symmetric and reflexive (`score(a, a) == 1`), and pure:
//! no side effects, no shared state.

use std::collections::BTreeSet;

use weld_core::config::FusionConfig;
use weld_core::model::Element;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Score the equivalence of two elements. See the module docs for the exact
/// channel rules.
#[must_use]
pub fn score(a: &Element, b: &Element, config: &FusionConfig) -> f64 {
    if a.kind != b.kind {
        return 0.0;
    }
    if a.id == b.id {
        return 1.0;
    }

    let name_a = a.name.trim();
    let name_b = b.name.trim();
    if !name_a.is_empty() && name_a == name_b {
        return 1.0;
    }

    let name_sim = if name_a.is_empty() && name_b.is_empty() {
        0.0
    } else {
        strsim::normalized_levenshtein(name_a, name_b)
    };

    let desc_a = a.description.trim();
    let desc_b = b.description.trim();
    if desc_a.is_empty() && desc_b.is_empty() {
        return name_sim.clamp(0.0, 1.0);
    }

    let desc_sim = if desc_a.is_empty() || desc_b.is_empty() {
        0.0
    } else {
        token_similarity(desc_a, desc_b)
    };

    let combined = (config.name_weight * name_sim + config.description_weight * desc_sim)
        / (config.name_weight + config.description_weight);
    combined.clamp(0.0, 1.0)
}

// ---------------------------------------------------------------------------
// Description channel
// ---------------------------------------------------------------------------

/// Length-weighted Jaccard over the distinct token sets of two texts.
///
/// Longer tokens carry more weight, so shared content terms count for more
/// than shared particles.
fn token_similarity(a: &str, b: &str) -> f64 {
    let tokens_a = tokenize(a);
    let tokens_b = tokenize(b);
    if tokens_a.is_empty() && tokens_b.is_empty() {
        return 0.0;
    }

    let weight = |token: &String| token.chars().count() as f64;
    let intersection: f64 = tokens_a.intersection(&tokens_b).map(weight).sum();
    let union: f64 = tokens_a.union(&tokens_b).map(weight).sum();
    if union == 0.0 { 0.0 } else { intersection / union }
}

/// Lowercased tokens: alphanumeric runs, with each CJK codepoint emitted as
/// its own token (CJK text carries no whitespace word boundaries).
fn tokenize(text: &str) -> BTreeSet<String> {
    let mut tokens = BTreeSet::new();
    let mut buf = String::new();
    for c in text.chars() {
        if is_cjk(c) {
            if !buf.is_empty() {
                tokens.insert(std::mem::take(&mut buf));
            }
            tokens.insert(c.to_string());
        } else if c.is_alphanumeric() {
            buf.extend(c.to_lowercase());
        } else if !buf.is_empty() {
            tokens.insert(std::mem::take(&mut buf));
        }
    }
    if !buf.is_empty() {
        tokens.insert(buf);
    }
    tokens
}

const fn is_cjk(c: char) -> bool {
    matches!(
        c as u32,
        0x4E00..=0x9FFF | 0x3400..=0x4DBF | 0xF900..=0xFAFF
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
