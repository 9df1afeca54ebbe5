use std::collections::BTreeMap;

use crate::merge::error::{MergeError, Result};

/// Scalar attribute value of a road feature.
///
/// Numbers are stored as `f64`. Non-finite numbers never make it into a `PropertyValue`, they are
/// normalized to `Null` on construction so that equality between values stays well defined.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

impl PropertyValue {
    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    /// Convert to a JSON value. Integral numbers inside the i64 range are written as integers.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            PropertyValue::Null => serde_json::Value::Null,
            PropertyValue::Bool(value) => serde_json::Value::Bool(*value),
            PropertyValue::Number(value) => {
                if value.fract() == 0.0 && *value >= i64::MIN as f64 && *value < i64::MAX as f64 {
                    serde_json::Value::from(*value as i64)
                } else {
                    serde_json::Number::from_f64(*value)
                        .map(serde_json::Value::Number)
                        .unwrap_or(serde_json::Value::Null)
                }
            }
            PropertyValue::String(value) => serde_json::Value::String(value.clone()),
        }
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        if value.is_finite() {
            PropertyValue::Number(value)
        } else {
            PropertyValue::Null
        }
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Number(value as f64)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl<T: Into<PropertyValue>> From<Option<T>> for PropertyValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(PropertyValue::Null)
    }
}

impl From<&serde_json::Value> for PropertyValue {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => PropertyValue::Null,
            serde_json::Value::Bool(value) => PropertyValue::Bool(*value),
            serde_json::Value::Number(number) => number.as_f64().into(),
            serde_json::Value::String(value) => PropertyValue::String(value.clone()),
            // Nested values are flattened to their JSON text.
            nested => PropertyValue::String(nested.to_string()),
        }
    }
}

/// Attribute map of a road feature, keyed by attribute name.
pub type Properties = BTreeMap<String, PropertyValue>;

/// Feature identifier as found in the source file, string or number.
pub type FeatureId = geojson::feature::Id;

/// A single road segment: a polyline with at least two finite coordinates and its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct RoadFeature {
    geometry: geo::LineString,
    pub properties: Properties,
    /// Identifier carried over from the source file. Never used for matching.
    pub id: Option<FeatureId>,
}

impl RoadFeature {
    /// Create a feature, rejecting degenerate geometries.
    pub fn new(geometry: geo::LineString, properties: Properties) -> Result<Self> {
        if 2 > geometry.0.len() {
            return Err(MergeError::Validation(format!(
                "LineString has {} coordinates, at least two are required",
                geometry.0.len()
            )));
        }
        if let Some(coord) = geometry
            .coords()
            .find(|coord| !coord.x.is_finite() || !coord.y.is_finite())
        {
            return Err(MergeError::Validation(format!(
                "LineString has a non-finite coordinate ({}, {})",
                coord.x, coord.y
            )));
        }
        Ok(Self {
            geometry,
            properties,
            id: None,
        })
    }

    pub fn with_id(mut self, id: Option<FeatureId>) -> Self {
        self.id = id;
        self
    }

    pub fn geometry(&self) -> &geo::LineString {
        &self.geometry
    }

    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }
}

/// Ordered road features from one input source. A feature's identity is its index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoadCollection {
    features: Vec<RoadFeature>,
}

impl RoadCollection {
    pub fn new(features: Vec<RoadFeature>) -> Self {
        Self { features }
    }

    pub fn features(&self) -> &[RoadFeature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&RoadFeature> {
        self.features.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RoadFeature> {
        self.features.iter()
    }

    pub fn into_features(self) -> Vec<RoadFeature> {
        self.features
    }
}

impl From<Vec<RoadFeature>> for RoadCollection {
    fn from(features: Vec<RoadFeature>) -> Self {
        Self::new(features)
    }
}

impl FromIterator<RoadFeature> for RoadCollection {
    fn from_iter<I: IntoIterator<Item = RoadFeature>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
