//! OIT Settings & Technique Configuration
//!
//! This module defines the runtime configuration of the transparency core.
//!
//! The central type is [`OitSettings`]; it selects the [`OitTechnique`],
//! the number of layers kept per pixel and the [`MergePolicy`] applied once
//! a pixel's bucket is full.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use strata_render::{OitSettings, MergePolicy};
//!
//! let settings = OitSettings {
//!     num_layers: 4,
//!     merge_policy: MergePolicy::NearestPair,
//!     ..Default::default()
//! };
//!
//! // Or from a JSON file shipped alongside the application
//! let settings = OitSettings::from_json_str(r#"{ "num_layers": 16 }"#)?;
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strata_core::{Result, StrataError};

/// Largest supported number of layers per pixel.
pub const MAX_LAYERS: usize = 64;

/// Default number of layers per pixel.
pub const DEFAULT_LAYERS: usize = 8;

// ---------------------------------------------------------------------------
// MergePolicy
// ---------------------------------------------------------------------------

/// Rule selecting which two entries are blended together when a pixel's
/// bucket would exceed its capacity.
///
/// Both variants blend with premultiplied "over" (front over back) and are
/// deterministic for a given bucket content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Merge the depth-adjacent pair with the smallest depth gap. The far end
    /// of the bucket is adjacent to the overflow slot at depth 1.0.
    #[default]
    NearestPair,

    /// Always fold the farthest entry into the overflow slot.
    Tail,
}

impl MergePolicy {
    /// Name used for the `MERGE_POLICY` shader define.
    #[must_use]
    pub fn shader_name(&self) -> &'static str {
        match self {
            Self::NearestPair => "NEAREST_PAIR",
            Self::Tail => "TAIL",
        }
    }
}

// ---------------------------------------------------------------------------
// OitTechnique
// ---------------------------------------------------------------------------

/// Transparency technique, selected when the renderer is constructed.
///
/// | Technique    | Memory per pixel     | Result                       | Synchronization        |
/// |--------------|----------------------|------------------------------|------------------------|
/// | `Bucket`     | `num_layers` entries | bounded approximation        | per-pixel lock         |
/// | `SortedList` | unbounded            | exact back-to-front ordering | per-draw batch + sort  |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OitTechnique {
    /// Fixed-capacity per-pixel buckets with synchronized merge insertion.
    #[default]
    Bucket,

    /// Collect every fragment, then sort per pixel before compositing.
    SortedList,
}

// ---------------------------------------------------------------------------
// OitSettings
// ---------------------------------------------------------------------------

/// Configuration consumed by [`OitRenderer::new`](crate::OitRenderer::new).
///
/// | Field          | Description                                   | Default       |
/// |----------------|-----------------------------------------------|---------------|
/// | `technique`    | Transparency technique                        | `Bucket`      |
/// | `num_layers`   | Bucket capacity per pixel                     | 8             |
/// | `merge_policy` | Overflow merge rule                           | `NearestPair` |
/// | `depth_test`   | Discard fragments behind the opaque scene     | `true`        |
/// | `shader_dir`   | Directory overriding the embedded templates   | `None`        |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OitSettings {
    pub technique: OitTechnique,

    /// Number of fragments kept per pixel. Trades memory for merge frequency.
    pub num_layers: usize,

    pub merge_policy: MergePolicy,

    /// Test each fragment against the scene depth buffer before gathering.
    pub depth_test: bool,

    /// Templates found here take precedence over the embedded ones, which
    /// lets [`reload_shaders`](crate::OitRenderer::reload_shaders) pick up
    /// edits without restarting.
    pub shader_dir: Option<PathBuf>,
}

impl Default for OitSettings {
    fn default() -> Self {
        Self {
            technique: OitTechnique::default(),
            num_layers: DEFAULT_LAYERS,
            merge_policy: MergePolicy::default(),
            depth_test: true,
            shader_dir: None,
        }
    }
}

impl OitSettings {
    pub fn validate(&self) -> Result<()> {
        validate_layers(self.num_layers)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

pub(crate) fn validate_layers(num_layers: usize) -> Result<()> {
    if (1..=MAX_LAYERS).contains(&num_layers) {
        Ok(())
    } else {
        Err(StrataError::InvalidLayerCount {
            requested: num_layers,
            max: MAX_LAYERS,
        })
    }
}

// ---------------------------------------------------------------------------
// StatePreset
// ---------------------------------------------------------------------------

/// Externally supplied configuration, e.g. one step of a benchmark sweep.
///
/// Applied as a whole through
/// [`OitRenderer::set_new_state`](crate::OitRenderer::set_new_state).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatePreset {
    pub name: String,
    pub technique: OitTechnique,
    pub num_layers: usize,
    #[serde(default)]
    pub merge_policy: MergePolicy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = OitSettings::default();
        assert_eq!(settings.num_layers, DEFAULT_LAYERS);
        assert_eq!(settings.technique, OitTechnique::Bucket);
        assert_eq!(settings.merge_policy, MergePolicy::NearestPair);
        assert!(settings.depth_test);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings =
            OitSettings::from_json_str(r#"{ "num_layers": 4, "merge_policy": "tail" }"#).unwrap();
        assert_eq!(settings.num_layers, 4);
        assert_eq!(settings.merge_policy, MergePolicy::Tail);
        assert_eq!(settings.technique, OitTechnique::Bucket);
    }

    #[test]
    fn test_invalid_layer_count_rejected() {
        let err = OitSettings::from_json_str(r#"{ "num_layers": 0 }"#).unwrap_err();
        assert!(matches!(err, StrataError::InvalidLayerCount { requested: 0, .. }));

        let err = OitSettings::from_json_str(r#"{ "num_layers": 1000 }"#).unwrap_err();
        assert!(matches!(err, StrataError::InvalidLayerCount { .. }));
    }

    #[test]
    fn test_malformed_json() {
        let err = OitSettings::from_json_str("{ num_layers: ").unwrap_err();
        assert!(matches!(err, StrataError::ConfigParse(_)));
    }
}
