use geo::EuclideanDistance;

use crate::geofile::feature::{Properties, RoadFeature};

/// Weight of the geometric similarity in the combined score.
pub const GEOMETRY_WEIGHT: f64 = 0.7;
/// Weight of the attribute similarity in the combined score.
pub const ATTRIBUTE_WEIGHT: f64 = 0.3;

/// R-tree over the vertices of one LineString, used for nearest-vertex lookups when computing
/// Hausdorff distances.
pub struct VertexIndex {
    rtree: rstar::RTree<[f64; 2]>,
}

impl VertexIndex {
    pub fn new(line: &geo::LineString) -> Self {
        Self {
            rtree: rstar::RTree::bulk_load(line.coords().map(|coord| [coord.x, coord.y]).collect()),
        }
    }

    /// Distance from `coord` to the closest indexed vertex. Infinite if the index is empty.
    pub fn nearest_vertex_distance(&self, coord: &geo::Coord) -> f64 {
        match self.rtree.nearest_neighbor(&[coord.x, coord.y]) {
            Some([x, y]) => geo::Point::from(*coord).euclidean_distance(&geo::Point::new(*x, *y)),
            None => f64::INFINITY,
        }
    }

    /// Directed Hausdorff distance from the vertices of `from` to the indexed vertex set.
    pub fn directed_hausdorff_from(&self, from: &geo::LineString) -> f64 {
        from.coords()
            .map(|coord| self.nearest_vertex_distance(coord))
            .fold(0.0, f64::max)
    }
}

/// A road feature together with the vertex index of its geometry, built once per merge run.
pub struct IndexedRoad<'a> {
    pub feature: &'a RoadFeature,
    vertex_index: VertexIndex,
}

impl<'a> IndexedRoad<'a> {
    pub fn new(feature: &'a RoadFeature) -> Self {
        Self {
            feature,
            vertex_index: VertexIndex::new(feature.geometry()),
        }
    }

    /// Symmetric Hausdorff distance between the vertex sets of both roads.
    pub fn hausdorff_distance(&self, other: &IndexedRoad) -> f64 {
        let d1 = other
            .vertex_index
            .directed_hausdorff_from(self.feature.geometry());
        let d2 = self
            .vertex_index
            .directed_hausdorff_from(other.feature.geometry());
        d1.max(d2)
    }

    pub fn geometric_similarity(&self, other: &IndexedRoad, normalization_distance: f64) -> f64 {
        distance_to_similarity(self.hausdorff_distance(other), normalization_distance)
    }

    /// Combined similarity in [0, 1]: weighted geometric plus attribute similarity.
    pub fn similarity(&self, other: &IndexedRoad, normalization_distance: f64) -> f64 {
        GEOMETRY_WEIGHT * self.geometric_similarity(other, normalization_distance)
            + ATTRIBUTE_WEIGHT
                * attribute_similarity(&self.feature.properties, &other.feature.properties)
    }
}

fn distance_to_similarity(max_distance: f64, normalization_distance: f64) -> f64 {
    1.0 - (max_distance / normalization_distance).min(1.0)
}

/// Hausdorff distance between the vertex sets of two LineStrings, i.e. the larger of both
/// directed Hausdorff distances.
pub fn hausdorff_distance(a: &geo::LineString, b: &geo::LineString) -> f64 {
    let d1 = VertexIndex::new(b).directed_hausdorff_from(a);
    let d2 = VertexIndex::new(a).directed_hausdorff_from(b);
    d1.max(d2)
}

/// Geometric similarity in [0, 1]. One for identical vertex sets, zero once the Hausdorff
/// distance reaches `normalization_distance`.
pub fn geometric_similarity(
    a: &geo::LineString,
    b: &geo::LineString,
    normalization_distance: f64,
) -> f64 {
    distance_to_similarity(hausdorff_distance(a, b), normalization_distance)
}

/// Share of the keys present on both maps that hold equal values. Zero when no key is shared.
pub fn attribute_similarity(a: &Properties, b: &Properties) -> f64 {
    let (matching_keys, shared_keys) = a
        .iter()
        .filter_map(|(key, value)| b.get(key).map(|other_value| value == other_value))
        .fold((0usize, 0usize), |(matching, shared), is_equal| {
            (matching + is_equal as usize, shared + 1)
        });
    if 0 == shared_keys {
        return 0.0;
    }
    matching_keys as f64 / shared_keys as f64
}

/// Combined similarity of two road features, see `IndexedRoad::similarity`.
pub fn similarity(a: &RoadFeature, b: &RoadFeature, normalization_distance: f64) -> f64 {
    IndexedRoad::new(a).similarity(&IndexedRoad::new(b), normalization_distance)
}
