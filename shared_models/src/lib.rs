//! Resources served through the shared query operations.
//!
//! Each resource is a zero-sized marker implementing
//! [`docfilter::QueryResource`], plus the typed document it stores.

pub mod borough;
pub mod neighborhood;
pub mod restaurant;

use docfilter::Document;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

pub use borough::{Borough, Boroughs};
pub use neighborhood::{Neighborhood, Neighborhoods};
pub use restaurant::{Address, Grade, Restaurant, Restaurants};

/// GeoJSON geometry with an optional precomputed centre.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub kind: String,
    #[schema(value_type = Object)]
    pub coordinates: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub centroid: Option<[f64; 2]>,
}

impl Geometry {
    #[must_use]
    pub fn polygon(rings: Vec<Vec<[f64; 2]>>) -> Self {
        Self {
            kind: "Polygon".to_string(),
            coordinates: serde_json::json!(rings),
            centroid: None,
        }
    }
}

/// Serialize a typed model into the store's document shape.
pub(crate) fn to_document<T: Serialize>(model: &T) -> Document {
    match serde_json::to_value(model) {
        Ok(Value::Object(document)) => document,
        _ => Document::new(),
    }
}
