//! Fusion run statistics.
//!
//! Returned by value alongside the fused set — never written to shared
//! process state — so runs stay composable and testable in isolation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Counters describing one fusion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FusionStats {
    /// Elements consumed, across all fragments (model roots included).
    pub input_elements: usize,
    /// Elements in the fused output set.
    pub output_elements: usize,
    /// Clusters of size > 1 that produced a canonical element.
    pub clusters_merged: usize,
    /// Elements absorbed into a canonical representative.
    pub merged_away: usize,
    /// Relationships dropped because both endpoints collapsed into one
    /// canonical element.
    pub self_loops_dropped: usize,
    /// Relationships dropped by the opt-in post-remap dedup pass.
    pub duplicate_relationships_dropped: usize,
    /// Relationships dropped by repair mode because an endpoint did not
    /// resolve after remap.
    pub dangling_relationships_dropped: usize,
}

impl FusionStats {
    /// `1 − |output| / |input|`; 0 for an empty input.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn reduction_rate(&self) -> f64 {
        if self.input_elements == 0 {
            return 0.0;
        }
        1.0 - self.output_elements as f64 / self.input_elements as f64
    }

    /// Total relationships dropped for any reason.
    #[must_use]
    pub const fn relationships_dropped(&self) -> usize {
        self.self_loops_dropped
            + self.duplicate_relationships_dropped
            + self.dangling_relationships_dropped
    }
}

impl fmt::Display for FusionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} elements ({} clusters, {} merged away, {:.1}% reduction)",
            self.input_elements,
            self.output_elements,
            self.clusters_merged,
            self.merged_away,
            self.reduction_rate() * 100.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduction_rate_empty_input_is_zero() {
        assert!(FusionStats::default().reduction_rate().abs() < f64::EPSILON);
    }

    #[test]
    fn reduction_rate_half() {
        let stats = FusionStats {
            input_elements: 10,
            output_elements: 5,
            ..FusionStats::default()
        };
        assert!((stats.reduction_rate() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn display_mentions_counts() {
        let stats = FusionStats {
            input_elements: 4,
            output_elements: 3,
            clusters_merged: 1,
            merged_away: 1,
            ..FusionStats::default()
        };
        let s = stats.to_string();
        assert!(s.contains("4 -> 3"), "display: {s}");
        assert!(s.contains("25.0%"), "display: {s}");
    }
}
