//! GeoJSON helpers for the in-memory store and resource maintenance.
//!
//! Coordinates are `[lng, lat]` in degrees, as GeoJSON orders them.

use geo::Intersects;
use geo_types::{Geometry, LineString, MultiPolygon, Point, Polygon};
use serde_json::Value;

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance in metres.
#[must_use]
pub fn haversine_distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lng = (lng2 - lng1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Flat distance in coordinate units, for non-spherical proximity.
#[must_use]
pub fn planar_distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    (lat2 - lat1).hypot(lng2 - lng1)
}

fn pair(value: &Value) -> Option<(f64, f64)> {
    match value.as_array()?.as_slice() {
        [lng, lat] => Some((lng.as_f64()?, lat.as_f64()?)),
        _ => None,
    }
}

/// `(lng, lat)` from a GeoJSON `Point` or a bare `[lng, lat]` pair.
#[must_use]
pub fn point_of(value: &Value) -> Option<(f64, f64)> {
    match value {
        Value::Array(_) => pair(value),
        Value::Object(object) => {
            if object.get("type").and_then(Value::as_str) != Some("Point") {
                return None;
            }
            object.get("coordinates").and_then(pair)
        }
        _ => None,
    }
}

fn ring(value: &Value) -> Option<Vec<(f64, f64)>> {
    value.as_array()?.iter().map(pair).collect()
}

fn line_string(value: &Value) -> Option<LineString<f64>> {
    ring(value).map(LineString::from)
}

/// Outer ring first, then holes.
fn polygon(rings: &Value) -> Option<Polygon<f64>> {
    let mut rings = rings.as_array()?.iter().filter_map(line_string);
    let exterior = rings.next()?;
    Some(Polygon::new(exterior, rings.collect()))
}

/// A GeoJSON `Polygon` or `MultiPolygon` as a `geo_types` geometry.
fn area_geometry(geometry: &Value) -> Option<Geometry<f64>> {
    let coordinates = geometry.get("coordinates")?;
    match geometry.get("type").and_then(Value::as_str)? {
        "Polygon" => polygon(coordinates).map(Geometry::Polygon),
        "MultiPolygon" => {
            let polygons = coordinates.as_array()?.iter().filter_map(polygon).collect();
            Some(Geometry::MultiPolygon(MultiPolygon::new(polygons)))
        }
        _ => None,
    }
}

/// Whether a GeoJSON geometry intersects the point. Boundaries count as a hit.
#[must_use]
pub fn contains_point(geometry: &Value, lng: f64, lat: f64) -> bool {
    if geometry.get("type").and_then(Value::as_str) == Some("Point") {
        return point_of(geometry).is_some_and(|p| p == (lng, lat));
    }
    area_geometry(geometry).is_some_and(|area| area.intersects(&Point::new(lng, lat)))
}

/// Vertex mean of the first ring found by descending into `coordinates`.
/// A closing vertex repeating the first is counted once.
#[must_use]
pub fn centroid(coordinates: &Value) -> Option<[f64; 2]> {
    let items = coordinates.as_array()?;
    if let Some(mut points) = ring(coordinates).filter(|points| !points.is_empty()) {
        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        #[allow(clippy::cast_precision_loss)]
        let count = points.len() as f64;
        let (sum_lng, sum_lat) = points
            .iter()
            .fold((0.0, 0.0), |(x, y), (lng, lat)| (x + lng, y + lat));
        return Some([sum_lng / count, sum_lat / count]);
    }
    centroid(items.first()?)
}
