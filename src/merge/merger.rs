use std::{collections::HashSet, iter::zip};

use geo::BoundingRect;
use indicatif::ProgressBar;
use rayon::prelude::*;

use super::{
    error::Result,
    fusion::fuse,
    params::MergeParams,
    similarity::{IndexedRoad, ATTRIBUTE_WEIGHT},
    stats::MergeStats,
};
use crate::geofile::feature::{RoadCollection, RoadFeature};

/// A scored pairing of a left road with a right road.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchCandidate {
    pub left_index: usize,
    pub right_index: usize,
    pub similarity: f64,
}

/// Output of a merge run.
///
/// `features` holds one feature per left road in left order, fused with its match or passed
/// through unchanged, followed by the unclaimed right roads in right order.
#[derive(Debug, Clone)]
pub struct MergeResult {
    pub features: Vec<RoadFeature>,
    pub stats: MergeStats,
    /// Accepted matches in left order.
    pub matches: Vec<MatchCandidate>,
}

type EnvelopeIndexItem =
    rstar::primitives::GeomWithData<rstar::primitives::Rectangle<[f64; 2]>, usize>;

/// R-tree over the bounding boxes of the right roads. Finds every road whose bounding box lies
/// within a given distance of a line's bounding box.
struct EnvelopeIndex {
    rtree: rstar::RTree<EnvelopeIndexItem>,
}

impl EnvelopeIndex {
    fn new(collection: &RoadCollection) -> Self {
        let items = collection
            .iter()
            .enumerate()
            .filter_map(|(index, feature)| {
                feature.geometry().bounding_rect().map(|rect| {
                    EnvelopeIndexItem::new(
                        rstar::primitives::Rectangle::from_corners(
                            [rect.min().x, rect.min().y],
                            [rect.max().x, rect.max().y],
                        ),
                        index,
                    )
                })
            })
            .collect();
        Self {
            rtree: rstar::RTree::bulk_load(items),
        }
    }

    /// Indices of roads whose bounding box is within `distance` of the bounding box of `line`,
    /// in ascending order.
    fn indices_near(&self, line: &geo::LineString, distance: f64) -> Vec<usize> {
        let rect = match line.bounding_rect() {
            Some(rect) => rect,
            None => return Vec::new(),
        };
        let envelope = rstar::AABB::from_corners(
            [rect.min().x - distance, rect.min().y - distance],
            [rect.max().x + distance, rect.max().y + distance],
        );
        let mut indices: Vec<usize> = self
            .rtree
            .locate_in_envelope_intersecting(&envelope)
            .map(|item| item.data)
            .collect();
        indices.sort_unstable();
        indices
    }
}

/// Greedy, left-driven road merger.
///
/// Every left road claims its most similar unclaimed right road if the similarity reaches the
/// threshold. Ties go to the lowest right index. Claims are final, there is no backtracking, so
/// the assignment is not globally optimal.
pub struct RoadMerger {
    params: MergeParams,
    progress_bar: ProgressBar,
}

impl RoadMerger {
    pub fn new(params: MergeParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            progress_bar: ProgressBar::hidden(),
        })
    }

    /// Report matching progress, one tick per left road, on `progress_bar`.
    pub fn with_progress_bar(mut self, progress_bar: ProgressBar) -> Self {
        self.progress_bar = progress_bar;
        self
    }

    pub fn params(&self) -> &MergeParams {
        &self.params
    }

    pub fn merge(&self, left: &RoadCollection, right: &RoadCollection) -> Result<MergeResult> {
        let threshold = self.params.similarity_threshold;
        let normalization_distance = self.params.normalization_distance;
        log::info!(
            "Merging {} roads with {} roads at similarity threshold {}",
            left.len(),
            right.len(),
            threshold
        );

        let mut stats = MergeStats::new(left.len(), right.len());
        let left_roads = index_roads(left, self.params.parallel);
        let right_roads = index_roads(right, self.params.parallel);

        // A right road at least `normalization_distance` away scores at most the attribute
        // weight, so it can be skipped whenever the threshold is above that.
        let envelope_index = if threshold > ATTRIBUTE_WEIGHT {
            Some(EnvelopeIndex::new(right))
        } else {
            None
        };

        let mut claimed_indices: HashSet<usize> = HashSet::new();
        let mut features = Vec::with_capacity(left.len() + right.len());
        let mut matches = Vec::new();

        self.progress_bar.set_length(left.len() as u64);
        for (left_index, left_road) in left_roads.iter().enumerate() {
            let candidates: Vec<usize> = match &envelope_index {
                Some(envelope_index) => envelope_index
                    .indices_near(left_road.feature.geometry(), normalization_distance),
                None => (0..right_roads.len()).collect(),
            }
            .into_iter()
            .filter(|right_index| !claimed_indices.contains(right_index))
            .collect();

            match self.find_best_match(left_index, left_road, &candidates, &right_roads) {
                Some(best) if best.similarity >= threshold => {
                    claimed_indices.insert(best.right_index);
                    stats.matched += 1;
                    features.push(fuse(
                        left_road.feature,
                        right_roads[best.right_index].feature,
                        self.params.geometry_fusion,
                    )?);
                    matches.push(best);
                }
                _ => {
                    stats.unmatched_left += 1;
                    features.push(left_road.feature.clone());
                }
            }
            self.progress_bar.inc(1);
        }
        self.progress_bar.finish_and_clear();

        log::debug!("Adding remaining unmatched roads from second file");
        for (right_index, right_road) in right.iter().enumerate() {
            if !claimed_indices.contains(&right_index) {
                stats.unmatched_right += 1;
                features.push(right_road.clone());
            }
        }

        stats.log_report();
        Ok(MergeResult {
            features,
            stats,
            matches,
        })
    }

    /// Score `candidates` against the left road and return the best one with a positive score.
    /// `candidates` must be in ascending order, the first of several equal scores wins.
    fn find_best_match(
        &self,
        left_index: usize,
        left_road: &IndexedRoad,
        candidates: &[usize],
        right_roads: &[IndexedRoad],
    ) -> Option<MatchCandidate> {
        let normalization_distance = self.params.normalization_distance;
        let scores: Vec<f64> = if self.params.parallel {
            candidates
                .par_iter()
                .map(|&right_index| {
                    left_road.similarity(&right_roads[right_index], normalization_distance)
                })
                .collect()
        } else {
            candidates
                .iter()
                .map(|&right_index| {
                    left_road.similarity(&right_roads[right_index], normalization_distance)
                })
                .collect()
        };

        // A candidate has to beat the current best, starting from zero, so a pair with no
        // similarity at all is never proposed.
        zip(candidates, scores).fold(None, |best, (&right_index, similarity)| {
            let best_similarity = best.map_or(0.0, |best: MatchCandidate| best.similarity);
            if similarity > best_similarity {
                Some(MatchCandidate {
                    left_index,
                    right_index,
                    similarity,
                })
            } else {
                best
            }
        })
    }
}

fn index_roads(collection: &RoadCollection, parallel: bool) -> Vec<IndexedRoad> {
    if parallel {
        collection.features().par_iter().map(IndexedRoad::new).collect()
    } else {
        collection.iter().map(IndexedRoad::new).collect()
    }
}

/// Merge two road collections with default parameters and the given similarity threshold.
pub fn merge(left: &RoadCollection, right: &RoadCollection, threshold: f64) -> Result<MergeResult> {
    RoadMerger::new(MergeParams::with_threshold(threshold))?.merge(left, right)
}
