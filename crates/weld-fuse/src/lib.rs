//! weld-fuse library.
//!
//! The consolidation half of the pipeline: pairwise similarity scoring,
//! union-find clustering, canonical element synthesis, and the global id
//! remap that keeps every cross-reference sound after merging.

pub mod cluster;
pub mod engine;
pub mod score;
pub mod stats;

pub use engine::{FusionEngine, FusionOutcome};
pub use score::score;
pub use stats::FusionStats;
