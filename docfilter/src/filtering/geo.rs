use serde_json::{Value, json};

use super::combinator::{combine, conjoin};
use super::operators::Combinator;
use crate::Document;
use crate::config::CompilerConfig;

/// Proximity anchor stage.
///
/// The storage engine only accepts this stage at the head of a pipeline, so
/// every other constraint on the same query travels inside [`GeoNear::query`].
#[derive(Debug, Clone, PartialEq)]
pub struct GeoNear {
    pub lng: f64,
    pub lat: f64,
    pub max_distance: f64,
    pub min_distance: Option<f64>,
    pub distance_field: String,
    pub spherical: bool,
    pub key: Option<String>,
    query: Document,
}

impl GeoNear {
    #[must_use]
    pub fn new(lng: f64, lat: f64, max_distance: f64, config: &CompilerConfig) -> Self {
        Self {
            lng,
            lat,
            max_distance,
            min_distance: None,
            distance_field: config.distance_field.clone(),
            spherical: config.spherical,
            key: config.geo_key.clone(),
            query: Document::new(),
        }
    }

    /// Drop documents closer than `min_distance`.
    #[must_use]
    pub fn with_min_distance(mut self, min_distance: f64) -> Self {
        self.min_distance = Some(min_distance);
        self
    }

    /// Embedded query applied to documents within range
    #[must_use]
    pub fn query(&self) -> &Document {
        &self.query
    }

    /// Fold sibling predicates into the embedded query under `combinator`.
    pub fn fold(&mut self, combinator: Combinator, fragments: Vec<Document>) {
        let folded = combine(combinator, fragments);
        self.constrain(folded);
    }

    /// AND an additional predicate into the embedded query.
    pub fn constrain(&mut self, predicate: Document) {
        let current = std::mem::take(&mut self.query);
        self.query = conjoin(current, predicate);
    }

    #[must_use]
    pub fn to_stage_body(&self) -> Document {
        let mut body = Document::new();
        body.insert(
            "near".to_string(),
            json!({ "type": "Point", "coordinates": [self.lng, self.lat] }),
        );
        body.insert(
            "distanceField".to_string(),
            Value::String(self.distance_field.clone()),
        );
        body.insert("maxDistance".to_string(), json!(self.max_distance));
        if let Some(min_distance) = self.min_distance {
            body.insert("minDistance".to_string(), json!(min_distance));
        }
        body.insert("query".to_string(), Value::Object(self.query.clone()));
        body.insert("spherical".to_string(), Value::Bool(self.spherical));
        if let Some(key) = &self.key {
            body.insert("key".to_string(), Value::String(key.clone()));
        }
        body
    }

    /// `{"$geoNear": {...}}`
    #[must_use]
    pub fn to_document(&self) -> Document {
        let mut stage = Document::new();
        stage.insert("$geoNear".to_string(), Value::Object(self.to_stage_body()));
        stage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_shape() {
        let geo = GeoNear::new(-73.982, 40.623, 500.0, &CompilerConfig::default());
        let stage = Value::Object(geo.to_document());
        assert_eq!(
            stage,
            json!({
                "$geoNear": {
                    "near": {"type": "Point", "coordinates": [-73.982, 40.623]},
                    "distanceField": "distance",
                    "maxDistance": 500.0,
                    "query": {},
                    "spherical": true
                }
            })
        );
    }

    #[test]
    fn test_min_distance_rendered_when_set() {
        let geo = GeoNear::new(0.0, 0.0, 500.0, &CompilerConfig::default());
        assert!(!geo.to_stage_body().contains_key("minDistance"));

        let body = geo.with_min_distance(100.0).to_stage_body();
        assert_eq!(body["minDistance"], 100.0);
        assert_eq!(body["maxDistance"], 500.0);
    }

    #[test]
    fn test_key_rendered_when_configured() {
        let config = CompilerConfig::default().with_geo_key("address.coord");
        let geo = GeoNear::new(0.0, 0.0, 10.0, &config);
        assert_eq!(geo.to_stage_body()["key"], "address.coord");
    }

    #[test]
    fn test_constrain_accumulates_under_and() {
        let mut geo = GeoNear::new(0.0, 0.0, 10.0, &CompilerConfig::default());
        geo.fold(
            Combinator::Or,
            vec![
                json!({"cuisine": "Bakery"}).as_object().unwrap().clone(),
                json!({"cuisine": "Pizza"}).as_object().unwrap().clone(),
            ],
        );
        geo.constrain(json!({"name": {"$ne": ""}}).as_object().unwrap().clone());

        assert_eq!(
            Value::Object(geo.query().clone()),
            json!({
                "$and": [
                    {"$or": [{"cuisine": "Bakery"}, {"cuisine": "Pizza"}]},
                    {"name": {"$ne": ""}}
                ]
            })
        );
    }
}
