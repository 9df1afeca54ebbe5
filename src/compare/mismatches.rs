use std::collections::HashMap;

use serde::Serialize;

use crate::geofile::{
    feature::{FeatureId, Properties, PropertyValue, RoadCollection, RoadFeature},
    geojson::feature_to_geojson,
};

/// Keys compared when deciding whether the attributes of a road changed.
pub const ROAD_PROPERTY_KEYS: [&str; 6] = ["highway", "name", "lanes", "oneway", "surface", "maxspeed"];

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Geometry,
    Properties,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ModifiedRoad {
    pub id: String,
    pub change_type: ChangeType,
    pub original: geojson::Feature,
    pub modified: geojson::Feature,
}

/// Differences between two versions of a road dataset, keyed by feature id.
#[derive(Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct MismatchReport {
    pub missing_roads: Vec<geojson::Feature>,
    pub new_roads: Vec<geojson::Feature>,
    pub modified_roads: Vec<ModifiedRoad>,
}

/// A feature is a road if its `highway` attribute is set to something other than null, `false`,
/// `0` or the empty string.
pub fn is_road(feature: &RoadFeature) -> bool {
    match feature.property("highway") {
        None | Some(PropertyValue::Null) | Some(PropertyValue::Bool(false)) => false,
        Some(PropertyValue::Number(value)) => 0.0 != *value,
        Some(PropertyValue::String(value)) => !value.is_empty(),
        Some(PropertyValue::Bool(true)) => true,
    }
}

/// Identifier of a feature: its own id, else the `@id` attribute.
pub fn feature_id(feature: &RoadFeature) -> Option<String> {
    match &feature.id {
        Some(FeatureId::String(id)) => return Some(id.clone()),
        Some(FeatureId::Number(id)) => return Some(id.to_string()),
        None => {}
    }
    match feature.property("@id")? {
        PropertyValue::String(id) if !id.is_empty() => Some(id.clone()),
        PropertyValue::Number(id) if 0.0 != *id => Some(PropertyValue::Number(*id).to_json().to_string()),
        _ => None,
    }
}

fn road_properties(properties: &Properties) -> Vec<(&'static str, &PropertyValue)> {
    ROAD_PROPERTY_KEYS
        .iter()
        .filter_map(|key| {
            properties
                .get(*key)
                .filter(|value| !value.is_null())
                .map(|value| (*key, value))
        })
        .collect()
}

fn change_type(original: &RoadFeature, updated: &RoadFeature) -> Option<ChangeType> {
    if original.geometry() != updated.geometry() {
        Some(ChangeType::Geometry)
    } else if road_properties(&original.properties) != road_properties(&updated.properties) {
        Some(ChangeType::Properties)
    } else {
        None
    }
}

fn roads_by_id(collection: &RoadCollection) -> HashMap<String, &RoadFeature> {
    collection
        .iter()
        .filter(|feature| is_road(feature))
        .filter_map(|feature| feature_id(feature).map(|id| (id, feature)))
        .collect()
}

/// Compare an original road dataset with an updated one.
///
/// Only road features take part. Updated roads without an id, or with an id unknown to the
/// original, are new. Roads present in both are modified if their coordinates differ, or
/// otherwise if any of `ROAD_PROPERTY_KEYS` differs. Original roads whose id is absent from the
/// update are missing.
pub fn find_mismatches(original: &RoadCollection, updated: &RoadCollection) -> MismatchReport {
    let original_roads = roads_by_id(original);
    let updated_roads = roads_by_id(updated);
    let mut report = MismatchReport::default();

    for updated_feature in updated.iter().filter(|feature| is_road(feature)) {
        let original_feature = feature_id(updated_feature)
            .and_then(|id| original_roads.get(&id).map(|feature| (id, *feature)));
        match original_feature {
            None => report.new_roads.push(feature_to_geojson(updated_feature)),
            Some((id, original_feature)) => {
                if let Some(change_type) = change_type(original_feature, updated_feature) {
                    report.modified_roads.push(ModifiedRoad {
                        id,
                        change_type,
                        original: feature_to_geojson(original_feature),
                        modified: feature_to_geojson(updated_feature),
                    });
                }
            }
        }
    }

    for original_feature in original.iter().filter(|feature| is_road(feature)) {
        if let Some(id) = feature_id(original_feature) {
            if !updated_roads.contains_key(&id) {
                report.missing_roads.push(feature_to_geojson(original_feature));
            }
        }
    }

    log::info!(
        "Found {} missing, {} new and {} modified roads",
        report.missing_roads.len(),
        report.new_roads.len(),
        report.modified_roads.len()
    );
    report
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};
    use serde_json::json;

    use super::{feature_id, find_mismatches, is_road, ChangeType};
    use crate::geofile::feature::{FeatureId, Properties, PropertyValue, RoadCollection, RoadFeature};

    fn road(id: Option<&str>, coords: Vec<(f64, f64)>, entries: &[(&str, PropertyValue)]) -> RoadFeature {
        let properties: Properties = entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect();
        RoadFeature::new(coords.into(), properties)
            .unwrap()
            .with_id(id.map(|id| FeatureId::String(id.to_string())))
    }

    #[fixture]
    fn original() -> RoadCollection {
        vec![
            road(Some("way/1"), vec![(0.0, 0.0), (1.0, 0.0)], &[("highway", "primary".into())]),
            road(
                Some("way/2"),
                vec![(0.0, 1.0), (1.0, 1.0)],
                &[("highway", "residential".into()), ("name", "Elm St".into())],
            ),
            road(
                Some("way/3"),
                vec![(0.0, 2.0), (1.0, 2.0)],
                &[("highway", "residential".into()), ("lanes", 2i64.into())],
            ),
            road(Some("way/4"), vec![(0.0, 3.0), (1.0, 3.0)], &[("highway", "service".into())]),
            // Not a road, ignored.
            road(Some("way/5"), vec![(0.0, 4.0), (1.0, 4.0)], &[("waterway", "river".into())]),
        ]
        .into()
    }

    #[rstest]
    fn test_find_mismatches(original: RoadCollection) {
        let updated: RoadCollection = vec![
            road(Some("way/1"), vec![(0.0, 0.0), (1.0, 0.0)], &[("highway", "primary".into())]),
            road(
                Some("way/2"),
                vec![(0.0, 1.0), (1.0, 1.1)],
                &[("highway", "residential".into()), ("name", "Elm St".into())],
            ),
            road(
                Some("way/3"),
                vec![(0.0, 2.0), (1.0, 2.0)],
                &[("highway", "residential".into()), ("lanes", 3i64.into())],
            ),
            road(Some("way/6"), vec![(0.0, 5.0), (1.0, 5.0)], &[("highway", "track".into())]),
            road(None, vec![(0.0, 6.0), (1.0, 6.0)], &[("highway", "path".into())]),
        ]
        .into();

        let report = find_mismatches(&original, &updated);

        assert_eq!(1, report.missing_roads.len());
        assert_eq!(
            Some(geojson::feature::Id::String("way/4".to_string())),
            report.missing_roads[0].id
        );
        assert_eq!(2, report.new_roads.len());
        let modified: Vec<(&str, ChangeType)> = report
            .modified_roads
            .iter()
            .map(|road| (road.id.as_str(), road.change_type))
            .collect();
        assert_eq!(
            vec![("way/2", ChangeType::Geometry), ("way/3", ChangeType::Properties)],
            modified
        );
    }

    #[rstest]
    fn test_irrelevant_and_null_properties_are_ignored(original: RoadCollection) {
        let updated: RoadCollection = vec![road(
            Some("way/1"),
            vec![(0.0, 0.0), (1.0, 0.0)],
            &[
                ("highway", "primary".into()),
                ("surface", PropertyValue::Null),
                ("source", "survey".into()),
            ],
        )]
        .into();

        let report = find_mismatches(&original, &updated);

        assert!(report.modified_roads.is_empty());
        assert!(report.new_roads.is_empty());
    }

    #[rstest]
    #[case(PropertyValue::String("residential".to_string()), true)]
    #[case(PropertyValue::Bool(true), true)]
    #[case(PropertyValue::Number(1.0), true)]
    #[case(PropertyValue::String(String::new()), false)]
    #[case(PropertyValue::Bool(false), false)]
    #[case(PropertyValue::Number(0.0), false)]
    #[case(PropertyValue::Null, false)]
    fn test_is_road(#[case] highway: PropertyValue, #[case] expected: bool) {
        let feature = road(None, vec![(0.0, 0.0), (1.0, 0.0)], &[("highway", highway)]);
        assert_eq!(expected, is_road(&feature));
        let feature = road(None, vec![(0.0, 0.0), (1.0, 0.0)], &[("name", "Elm St".into())]);
        assert!(!is_road(&feature));
    }

    #[rstest]
    fn test_unset_highway_is_not_compared(original: RoadCollection) {
        let updated: RoadCollection = vec![
            road(Some("way/1"), vec![(0.0, 0.0), (1.0, 0.0)], &[("highway", "primary".into())]),
            road(Some("way/7"), vec![(0.0, 7.0), (1.0, 7.0)], &[("highway", "".into())]),
            road(Some("way/8"), vec![(0.0, 8.0), (1.0, 8.0)], &[("highway", false.into())]),
        ]
        .into();

        let report = find_mismatches(&original, &updated);

        assert!(report.new_roads.is_empty());
        assert!(report.modified_roads.is_empty());
    }

    #[rstest]
    fn test_numeric_id() {
        let feature = road(None, vec![(0.0, 0.0), (1.0, 0.0)], &[])
            .with_id(Some(FeatureId::Number(serde_json::Number::from(42))));
        assert_eq!(Some("42".to_string()), feature_id(&feature));
    }

    #[rstest]
    fn test_id_from_property() {
        let feature = road(None, vec![(0.0, 0.0), (1.0, 0.0)], &[("@id", "way/9".into())]);
        assert_eq!(Some("way/9".to_string()), feature_id(&feature));
        let feature = road(None, vec![(0.0, 0.0), (1.0, 0.0)], &[("@id", 9i64.into())]);
        assert_eq!(Some("9".to_string()), feature_id(&feature));
        let feature = road(None, vec![(0.0, 0.0), (1.0, 0.0)], &[]);
        assert_eq!(None, feature_id(&feature));
    }

    #[rstest]
    fn test_report_serialization_keys(original: RoadCollection) {
        let report = find_mismatches(&original, &RoadCollection::default());
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(4, value["missingRoads"].as_array().unwrap().len());
        assert_eq!(json!([]), value["newRoads"]);
        assert_eq!(json!([]), value["modifiedRoads"]);
    }
}
