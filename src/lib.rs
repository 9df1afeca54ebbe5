//! Fusion of two independently produced road networks.
//!
//! Roads of the left and right collections are paired greedily by a weighted combination of
//! Hausdorff-based geometric similarity and attribute agreement. Matched pairs are fused into a
//! single road, unmatched roads from both sides are passed through.
pub mod compare;
pub mod geofile;
pub mod merge;

pub use geofile::feature::{Properties, PropertyValue, RoadCollection, RoadFeature};
pub use merge::{
    error::MergeError,
    merger::{merge, MatchCandidate, MergeResult, RoadMerger},
    params::{GeometryFusion, MergeParams},
    stats::MergeStats,
};
