use serde::Deserialize;

use super::error::{MergeError, Result};

/// Default minimum combined similarity for two roads to be merged.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.8;

/// Default Hausdorff distance, in map units, at which geometric similarity drops to zero.
/// Tuned for geographic coordinates in degrees.
pub const DEFAULT_NORMALIZATION_DISTANCE: f64 = 0.001;

/// How the geometries of two matched roads are combined.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeometryFusion {
    /// Average coordinates pairwise by index. Trailing points of the longer line are dropped.
    #[default]
    Truncate,
    /// Resample the coarser line at the arc-length positions of the denser line's vertices, then
    /// average pairwise. Keeps every vertex of the denser line.
    Resample,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MergeParams {
    pub similarity_threshold: f64,
    pub normalization_distance: f64,
    pub geometry_fusion: GeometryFusion,
    /// Score the candidates of each left road on the rayon thread pool. Matching outcome is
    /// identical either way.
    pub parallel: bool,
}

impl Default for MergeParams {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            normalization_distance: DEFAULT_NORMALIZATION_DISTANCE,
            geometry_fusion: GeometryFusion::default(),
            parallel: true,
        }
    }
}

impl MergeParams {
    pub fn with_threshold(similarity_threshold: f64) -> Self {
        Self {
            similarity_threshold,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(MergeError::Configuration(format!(
                "Similarity threshold must be within [0, 1], got {}",
                self.similarity_threshold
            )));
        }
        if !self.normalization_distance.is_finite() || 0.0 >= self.normalization_distance {
            return Err(MergeError::Configuration(format!(
                "Normalization distance must be a positive number, got {}",
                self.normalization_distance
            )));
        }
        Ok(())
    }
}
