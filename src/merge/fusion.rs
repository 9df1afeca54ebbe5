use std::iter::zip;

use geo::{EuclideanLength, LineInterpolatePoint};

use super::{error::Result, params::GeometryFusion};
use crate::geofile::feature::{Properties, RoadFeature};

/// Fuse two matched roads into one.
///
/// The geometry is averaged according to `fusion`. Properties are reconciled over the union of
/// keys: the left value wins unless it is missing or null, in which case the right value is used.
pub fn fuse(
    left: &RoadFeature,
    right: &RoadFeature,
    fusion: GeometryFusion,
) -> Result<RoadFeature> {
    let geometry = fuse_geometries(left.geometry(), right.geometry(), fusion);
    let properties = fuse_properties(&left.properties, &right.properties);
    let id = left.id.clone().or_else(|| right.id.clone());
    Ok(RoadFeature::new(geometry, properties)?.with_id(id))
}

/// Average two polylines. An empty input yields an empty result.
pub(crate) fn fuse_geometries(
    left: &geo::LineString,
    right: &geo::LineString,
    fusion: GeometryFusion,
) -> geo::LineString {
    match fusion {
        GeometryFusion::Truncate => average_coords(left.coords().copied(), right.coords().copied()),
        GeometryFusion::Resample => {
            if left.0.len() == right.0.len() {
                average_coords(left.coords().copied(), right.coords().copied())
            } else if left.0.len() > right.0.len() {
                average_coords(left.coords().copied(), resample_at_vertices_of(right, left))
            } else {
                average_coords(resample_at_vertices_of(left, right), right.coords().copied())
            }
        }
    }
}

/// Pairwise average by index. Stops at the end of the shorter sequence.
fn average_coords(
    left: impl IntoIterator<Item = geo::Coord>,
    right: impl IntoIterator<Item = geo::Coord>,
) -> geo::LineString {
    zip(left, right)
        .map(|(a, b)| geo::Coord {
            x: (a.x + b.x) / 2.0,
            y: (a.y + b.y) / 2.0,
        })
        .collect()
}

/// Interpolate points on `line` at the relative arc-length positions of the vertices of
/// `reference`. The result has as many points as `reference`, or none if `line` is empty.
fn resample_at_vertices_of(line: &geo::LineString, reference: &geo::LineString) -> Vec<geo::Coord> {
    let fallback = match line.0.first() {
        Some(coord) => *coord,
        None => return Vec::new(),
    };
    vertex_fractions(reference)
        .into_iter()
        .map(|fraction| {
            line.line_interpolate_point(fraction)
                .map(|point| point.0)
                .unwrap_or(fallback)
        })
        .collect()
}

/// Relative arc-length position in [0, 1] of every vertex of `line`. Zero-length lines get evenly
/// spaced positions.
fn vertex_fractions(line: &geo::LineString) -> Vec<f64> {
    let total_length = line.euclidean_length();
    let num_vertices = line.0.len();
    if 0.0 >= total_length {
        let last = (num_vertices.max(2) - 1) as f64;
        return (0..num_vertices).map(|index| index as f64 / last).collect();
    }
    let mut fractions = Vec::with_capacity(num_vertices);
    fractions.push(0.0);
    let mut travelled = 0.0;
    for segment in line.lines() {
        travelled += segment.euclidean_length();
        fractions.push((travelled / total_length).min(1.0));
    }
    fractions
}

pub fn fuse_properties(left: &Properties, right: &Properties) -> Properties {
    let mut fused = right.clone();
    for (key, value) in left {
        if !value.is_null() || !fused.contains_key(key) {
            fused.insert(key.clone(), value.clone());
        }
    }
    fused
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use rstest::rstest;

    use super::{fuse, fuse_geometries, fuse_properties};
    use crate::{
        geofile::feature::{FeatureId, Properties, PropertyValue, RoadFeature},
        merge::params::GeometryFusion,
    };

    fn props(entries: &[(&str, PropertyValue)]) -> Properties {
        entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[rstest]
    fn test_fuse_averages_coordinates() {
        let left = RoadFeature::new(
            vec![(0.0, 0.0), (1.0, 1.0)].into(),
            props(&[("name", "Main St".into())]),
        )
        .unwrap();
        let right = RoadFeature::new(
            vec![(0.0, 0.0001), (1.0, 1.0001)].into(),
            props(&[("name", "Main St".into())]),
        )
        .unwrap();

        let fused = fuse(&left, &right, GeometryFusion::Truncate).unwrap();

        let expected: geo::LineString = vec![(0.0, 0.00005), (1.0, 1.00005)].into();
        assert_abs_diff_eq!(*fused.geometry(), expected, epsilon = 1e-12);
        assert_eq!(props(&[("name", "Main St".into())]), fused.properties);
    }

    #[rstest]
    fn test_fuse_properties_left_wins_unless_null() {
        let left = props(&[
            ("name", "Main St".into()),
            ("lanes", PropertyValue::Null),
            ("surface", PropertyValue::Null),
        ]);
        let right = props(&[
            ("name", "Main Street".into()),
            ("lanes", 2i64.into()),
            ("maxspeed", 50i64.into()),
        ]);
        let expected = props(&[
            ("name", "Main St".into()),
            ("lanes", 2i64.into()),
            ("surface", PropertyValue::Null),
            ("maxspeed", 50i64.into()),
        ]);
        assert_eq!(expected, fuse_properties(&left, &right));
    }

    #[rstest]
    fn test_fuse_keeps_left_id_then_right_id() {
        let geometry: geo::LineString = vec![(0.0, 0.0), (1.0, 0.0)].into();
        let left = RoadFeature::new(geometry.clone(), Properties::new()).unwrap();
        let right = RoadFeature::new(geometry, Properties::new())
            .unwrap()
            .with_id(Some(FeatureId::String("way/7".to_string())));
        let fused = fuse(&left, &right, GeometryFusion::Truncate).unwrap();
        assert_eq!(Some(FeatureId::String("way/7".to_string())), fused.id);

        let left = left.with_id(Some(FeatureId::Number(serde_json::Number::from(1))));
        let fused = fuse(&left, &right, GeometryFusion::Truncate).unwrap();
        assert_eq!(Some(FeatureId::Number(serde_json::Number::from(1))), fused.id);
    }

    /// Truncation drops the trailing vertices of the denser line. This keeps the historical
    /// output of the merger; `Resample` is the lossless alternative.
    #[rstest]
    fn test_truncate_drops_extra_vertices() {
        let left: geo::LineString = vec![(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)].into();
        let right: geo::LineString = vec![(0.0, 2.0), (2.0, 2.0)].into();

        let fused = fuse_geometries(&left, &right, GeometryFusion::Truncate);

        let expected: geo::LineString = vec![(0.0, 1.0), (1.5, 1.0)].into();
        assert_eq!(expected, fused);
    }

    #[rstest]
    #[case(false)]
    #[case(true)]
    fn test_resample_keeps_every_vertex_of_denser_line(#[case] swap: bool) {
        let dense: geo::LineString = vec![(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)].into();
        let coarse: geo::LineString = vec![(0.0, 2.0), (2.0, 2.0)].into();
        let (left, right) = if swap { (&coarse, &dense) } else { (&dense, &coarse) };

        let fused = fuse_geometries(left, right, GeometryFusion::Resample);

        let expected: geo::LineString = vec![(0.0, 1.0), (1.0, 1.0), (2.0, 1.0)].into();
        assert_abs_diff_eq!(fused, expected, epsilon = 1e-12);
    }

    #[rstest]
    #[case(GeometryFusion::Truncate)]
    #[case(GeometryFusion::Resample)]
    fn test_empty_geometry_fuses_to_empty(#[case] fusion: GeometryFusion) {
        let empty = geo::LineString::new(vec![]);
        let line: geo::LineString = vec![(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)].into();

        assert!(fuse_geometries(&empty, &line, fusion).0.is_empty());
        assert!(fuse_geometries(&line, &empty, fusion).0.is_empty());
    }

    #[rstest]
    fn test_resample_equal_lengths_matches_truncate() {
        let left: geo::LineString = vec![(0.0, 0.0), (1.0, 0.0), (3.0, 0.0)].into();
        let right: geo::LineString = vec![(0.0, 1.0), (2.0, 1.0), (3.0, 1.0)].into();
        assert_eq!(
            fuse_geometries(&left, &right, GeometryFusion::Truncate),
            fuse_geometries(&left, &right, GeometryFusion::Resample)
        );
    }
}
