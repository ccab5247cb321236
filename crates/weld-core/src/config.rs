//! Configuration surface consumed by the fusion core.
//!
//! Loaded from an optional `weld.toml` (`[fusion]` and `[output]` tables);
//! every field has a reproducible default so a missing file means default
//! behavior, not an error. Values are validated once, at construction,
//! before any data is processed.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// FusionConfig
// ---------------------------------------------------------------------------

/// Tuning for the similarity scorer and the fusion engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionConfig {
    /// Merge threshold τ: minimum score for two same-kind elements to merge.
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Per-element candidate cap K. `None` scores every same-kind pair.
    #[serde(default)]
    pub candidate_cap: Option<usize>,

    /// Weight of the name channel in the combined score.
    #[serde(default = "default_name_weight")]
    pub name_weight: f64,

    /// Weight of the description channel in the combined score.
    #[serde(default = "default_description_weight")]
    pub description_weight: f64,

    /// Drop relationships that become identical (kind + endpoints) after
    /// remap, keeping the smallest id. Off by default: every input edge is
    /// preserved unless it degenerates into a self-loop.
    #[serde(default)]
    pub dedup_relationships: bool,

    /// Drop (and count) relationships whose endpoints do not resolve after
    /// remap instead of failing the run. A dangling parent is always fatal.
    #[serde(default)]
    pub repair_dangling: bool,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            candidate_cap: None,
            name_weight: default_name_weight(),
            description_weight: default_description_weight(),
            dedup_relationships: false,
            repair_dangling: false,
        }
    }
}

impl FusionConfig {
    /// Validate tuning values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if τ is outside `[0, 1]`, the candidate cap
    /// is zero, or a weight is non-positive or non-finite.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.threshold.is_finite() || !(0.0..=1.0).contains(&self.threshold) {
            return Err(ConfigError::ThresholdOutOfRange(self.threshold));
        }
        if self.candidate_cap == Some(0) {
            return Err(ConfigError::ZeroCandidateCap);
        }
        let weights_ok = self.name_weight.is_finite()
            && self.description_weight.is_finite()
            && self.name_weight > 0.0
            && self.description_weight > 0.0;
        if !weights_ok {
            return Err(ConfigError::InvalidWeights {
                name: self.name_weight,
                description: self.description_weight,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// OutputConfig
// ---------------------------------------------------------------------------

/// Document-emission toggles. No effect on graph content, only on
/// whitespace and annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Indent the XMI document for human readers.
    #[serde(default = "default_true")]
    pub pretty: bool,

    /// Include the metadata block (generation timestamp, source counts).
    #[serde(default = "default_true")]
    pub metadata: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            pretty: default_true(),
            metadata: default_true(),
        }
    }
}

// ---------------------------------------------------------------------------
// WeldConfig
// ---------------------------------------------------------------------------

/// Full configuration file contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct WeldConfig {
    #[serde(default)]
    pub fusion: FusionConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Load configuration from `path`, falling back to defaults when the file
/// does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed, or if
/// the parsed fusion values fail validation.
pub fn load_config(path: &Path) -> Result<WeldConfig> {
    if !path.exists() {
        return Ok(WeldConfig::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let config: WeldConfig =
        toml::from_str(&raw).with_context(|| format!("parse config {}", path.display()))?;
    config
        .fusion
        .validate()
        .with_context(|| format!("validate config {}", path.display()))?;
    Ok(config)
}

const fn default_true() -> bool {
    true
}

const fn default_threshold() -> f64 {
    0.85
}

const fn default_name_weight() -> f64 {
    0.4
}

const fn default_description_weight() -> f64 {
    0.6
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
