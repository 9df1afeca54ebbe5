use std::{fs, path::Path};

use super::feature::{Properties, PropertyValue, RoadCollection, RoadFeature};
use crate::merge::error::{MergeError, Result};

/// Decode file contents as UTF-8, falling back to Latin-1.
pub fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            log::warn!("Input is not valid UTF-8, decoding as Latin-1");
            err.into_bytes().into_iter().map(char::from).collect()
        }
    }
}

pub fn read_road_collection(filepath: &Path) -> Result<RoadCollection> {
    log::info!("Loading GeoJSON file: {:?}", filepath);
    let text = decode_text(fs::read(filepath)?);
    let collection = parse_road_collection(&text)?;
    log::info!(
        "Successfully loaded {} features from {:?}",
        collection.len(),
        filepath
    );
    Ok(collection)
}

/// Parse a GeoJSON FeatureCollection, or a single Feature, into a road collection.
///
/// Features with a geometry other than LineString are skipped with a warning. Missing geometries
/// and degenerate LineStrings are rejected.
pub fn parse_road_collection(text: &str) -> Result<RoadCollection> {
    let geojson: geojson::GeoJson = text
        .parse()
        .map_err(|err| MergeError::Validation(format!("Invalid GeoJSON: {}", err)))?;
    let features = match geojson {
        geojson::GeoJson::FeatureCollection(collection) => collection.features,
        geojson::GeoJson::Feature(feature) => vec![feature],
        geojson::GeoJson::Geometry(_) => {
            return Err(MergeError::Validation(
                "Expected a FeatureCollection or Feature, found a bare geometry".to_string(),
            ))
        }
    };

    let num_features = features.len();
    let mut roads = Vec::with_capacity(num_features);
    for (index, feature) in features.iter().enumerate() {
        if let Some(road) = road_feature_from_geojson(feature)
            .map_err(|err| annotate_feature_index(err, index))?
        {
            roads.push(road);
        }
    }
    if roads.len() != num_features {
        log::warn!(
            "Out of {} features read, only {} were LineStrings.",
            num_features,
            roads.len()
        )
    }
    Ok(RoadCollection::new(roads))
}

fn annotate_feature_index(err: MergeError, index: usize) -> MergeError {
    match err {
        MergeError::Validation(message) => {
            MergeError::Validation(format!("Feature {}: {}", index, message))
        }
        other => other,
    }
}

/// Convert a GeoJSON feature. Returns `None` for features whose geometry is not a LineString.
pub fn road_feature_from_geojson(feature: &geojson::Feature) -> Result<Option<RoadFeature>> {
    let geometry = feature
        .geometry
        .as_ref()
        .ok_or_else(|| MergeError::Validation("Feature has no geometry".to_string()))?;
    let positions = match &geometry.value {
        geojson::Value::LineString(positions) => positions,
        other => {
            log::debug!("Skipping feature with {} geometry", geometry_type_name(other));
            return Ok(None);
        }
    };

    let coords = positions
        .iter()
        .map(|position| match position.as_slice() {
            [x, y, ..] => Ok(geo::Coord { x: *x, y: *y }),
            _ => Err(MergeError::Validation(format!(
                "Position {:?} has fewer than two ordinates",
                position
            ))),
        })
        .collect::<Result<Vec<geo::Coord>>>()?;

    let properties: Properties = feature
        .properties
        .iter()
        .flatten()
        .map(|(key, value)| (key.clone(), PropertyValue::from(value)))
        .collect();

    Ok(Some(
        RoadFeature::new(geo::LineString::new(coords), properties)?.with_id(feature.id.clone()),
    ))
}

fn geometry_type_name(value: &geojson::Value) -> &'static str {
    match value {
        geojson::Value::Point(_) => "Point",
        geojson::Value::MultiPoint(_) => "MultiPoint",
        geojson::Value::LineString(_) => "LineString",
        geojson::Value::MultiLineString(_) => "MultiLineString",
        geojson::Value::Polygon(_) => "Polygon",
        geojson::Value::MultiPolygon(_) => "MultiPolygon",
        geojson::Value::GeometryCollection(_) => "GeometryCollection",
    }
}

pub fn feature_to_geojson(road: &RoadFeature) -> geojson::Feature {
    let properties: geojson::JsonObject = road
        .properties
        .iter()
        .map(|(key, value)| (key.clone(), value.to_json()))
        .collect();
    geojson::Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geojson::Value::from(road.geometry()))),
        id: road.id.clone(),
        properties: Some(properties),
        foreign_members: None,
    }
}

pub fn features_to_feature_collection(roads: &[RoadFeature]) -> geojson::FeatureCollection {
    roads.iter().map(feature_to_geojson).collect()
}

pub fn write_features_to_geojson(roads: &[RoadFeature], output_filepath: &Path) -> Result<()> {
    log::info!(
        "Writing {} features to {:?}",
        roads.len(),
        output_filepath
    );
    let geojson_contents = geojson::GeoJson::from(features_to_feature_collection(roads));
    fs::write(output_filepath, serde_json::to_string_pretty(&geojson_contents)?)?;
    Ok(())
}
