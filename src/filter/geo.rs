//! # Geo Primitives
//!
//! Great-circle distance, bounding-box and polygon containment, and
//! distance-literal parsing for the geo filter operators.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{FilterError, FilterResult};

/// Mean Earth radius in meters
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A WGS84 point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees, [-90, 90]
    pub lat: f64,
    /// Longitude in degrees, [-180, 180]
    pub lon: f64,
}

impl GeoPoint {
    /// Create a point, validating coordinate ranges
    pub fn new(lat: f64, lon: f64) -> FilterResult<Self> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(FilterError::InvalidGeoCoordinate(format!(
                "latitude {lat} out of range"
            )));
        }
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(FilterError::InvalidGeoCoordinate(format!(
                "longitude {lon} out of range"
            )));
        }
        Ok(Self { lat, lon })
    }

    /// Parse a point from a JSON value.
    ///
    /// Accepted shapes: `{"lat": .., "lon": ..}`, `[lon, lat]` (GeoJSON
    /// ordering), and `"lat, lon"` strings.
    pub fn parse(value: &Value) -> FilterResult<Self> {
        match value {
            Value::Object(map) => {
                let lat = map
                    .get("lat")
                    .and_then(Value::as_f64)
                    .ok_or_else(|| invalid_point(value))?;
                let lon = map
                    .get("lon")
                    .and_then(Value::as_f64)
                    .ok_or_else(|| invalid_point(value))?;
                Self::new(lat, lon)
            }
            Value::Array(items) if items.len() == 2 => {
                let lon = items[0].as_f64().ok_or_else(|| invalid_point(value))?;
                let lat = items[1].as_f64().ok_or_else(|| invalid_point(value))?;
                Self::new(lat, lon)
            }
            Value::String(s) => {
                let mut parts = s.split(',').map(str::trim);
                let lat = parts
                    .next()
                    .and_then(|p| p.parse::<f64>().ok())
                    .ok_or_else(|| invalid_point(value))?;
                let lon = parts
                    .next()
                    .and_then(|p| p.parse::<f64>().ok())
                    .ok_or_else(|| invalid_point(value))?;
                if parts.next().is_some() {
                    return Err(invalid_point(value));
                }
                Self::new(lat, lon)
            }
            _ => Err(invalid_point(value)),
        }
    }

    /// Great-circle distance to another point, in meters (haversine)
    pub fn distance_m(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlat = (other.lat - self.lat).to_radians();
        let dlon = (other.lon - self.lon).to_radians();

        let a = (dlat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        EARTH_RADIUS_M * c
    }
}

fn invalid_point(value: &Value) -> FilterError {
    FilterError::InvalidGeoCoordinate(value.to_string())
}

/// A latitude/longitude aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Northern latitude bound
    pub top: f64,
    /// Western longitude bound
    pub left: f64,
    /// Southern latitude bound
    pub bottom: f64,
    /// Eastern longitude bound
    pub right: f64,
}

impl BoundingBox {
    /// Create a box, validating coordinate ranges and bound ordering
    pub fn new(top: f64, left: f64, bottom: f64, right: f64) -> FilterResult<Self> {
        GeoPoint::new(top, left)?;
        GeoPoint::new(bottom, right)?;
        if bottom > top {
            return Err(FilterError::InvalidGeoCoordinate(format!(
                "bottom {bottom} above top {top}"
            )));
        }
        Ok(Self {
            top,
            left,
            bottom,
            right,
        })
    }

    /// Whether a point falls inside the box (bounds inclusive)
    pub fn contains(&self, point: &GeoPoint) -> bool {
        point.lat <= self.top
            && point.lat >= self.bottom
            && point.lon >= self.left
            && point.lon <= self.right
    }
}

/// Whether a point falls inside a polygon (ray casting on lat/lon).
///
/// Polygons with fewer than 3 vertices contain nothing.
pub fn point_in_polygon(point: &GeoPoint, polygon: &[GeoPoint]) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (pi, pj) = (&polygon[i], &polygon[j]);
        if (pi.lat > point.lat) != (pj.lat > point.lat) {
            let intersect =
                (pj.lon - pi.lon) * (point.lat - pi.lat) / (pj.lat - pi.lat) + pi.lon;
            if point.lon < intersect {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Parse a distance literal into meters.
///
/// Accepts raw numbers (meters) and strings like `"500 m"`, `"2km"`,
/// `"1.5 mi"`, `"300ft"`.
pub fn parse_distance(value: &Value) -> FilterResult<f64> {
    let meters = match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| invalid_distance(value))?,
        Value::String(s) => {
            let trimmed = s.trim();
            let split = trimmed
                .find(|c: char| c != '.' && c != '-' && c != '+' && !c.is_ascii_digit())
                .unwrap_or(trimmed.len());
            let (number, unit) = trimmed.split_at(split);
            let magnitude: f64 = number
                .trim()
                .parse()
                .map_err(|_| invalid_distance(value))?;
            magnitude * unit_factor(unit.trim()).ok_or_else(|| invalid_distance(value))?
        }
        _ => return Err(invalid_distance(value)),
    };

    if !meters.is_finite() || meters < 0.0 {
        return Err(invalid_distance(value));
    }
    Ok(meters)
}

fn unit_factor(unit: &str) -> Option<f64> {
    match unit.to_ascii_lowercase().as_str() {
        "" | "m" | "meter" | "meters" => Some(1.0),
        "km" | "kilometer" | "kilometers" => Some(1_000.0),
        "mi" | "mile" | "miles" => Some(1_609.344),
        "ft" | "foot" | "feet" => Some(0.3048),
        "yd" | "yard" | "yards" => Some(0.9144),
        _ => None,
    }
}

fn invalid_distance(value: &Value) -> FilterError {
    FilterError::InvalidDistance(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_point_parsing_shapes() {
        let obj = GeoPoint::parse(&json!({"lat": 40.7, "lon": -74.0})).unwrap();
        let arr = GeoPoint::parse(&json!([-74.0, 40.7])).unwrap();
        let s = GeoPoint::parse(&json!("40.7, -74.0")).unwrap();

        assert_eq!(obj, arr);
        assert_eq!(obj, s);
    }

    #[test]
    fn test_point_range_validation() {
        assert!(GeoPoint::new(91.0, 0.0).is_err());
        assert!(GeoPoint::new(0.0, 181.0).is_err());
        assert!(GeoPoint::parse(&json!({"lat": "x", "lon": 0})).is_err());
    }

    #[test]
    fn test_haversine_known_distance() {
        // Paris to London, roughly 344 km
        let paris = GeoPoint::new(48.8566, 2.3522).unwrap();
        let london = GeoPoint::new(51.5074, -0.1278).unwrap();

        let d = paris.distance_m(&london);
        assert!(d > 330_000.0 && d < 350_000.0, "got {d}");
    }

    #[test]
    fn test_bounding_box_contains() {
        let bbox = BoundingBox::new(41.0, -75.0, 40.0, -73.0).unwrap();

        assert!(bbox.contains(&GeoPoint::new(40.7, -74.0).unwrap()));
        assert!(!bbox.contains(&GeoPoint::new(42.0, -74.0).unwrap()));
        assert!(!bbox.contains(&GeoPoint::new(40.7, -72.0).unwrap()));
    }

    #[test]
    fn test_polygon_contains() {
        let square = vec![
            GeoPoint::new(0.0, 0.0).unwrap(),
            GeoPoint::new(0.0, 10.0).unwrap(),
            GeoPoint::new(10.0, 10.0).unwrap(),
            GeoPoint::new(10.0, 0.0).unwrap(),
        ];

        assert!(point_in_polygon(&GeoPoint::new(5.0, 5.0).unwrap(), &square));
        assert!(!point_in_polygon(&GeoPoint::new(15.0, 5.0).unwrap(), &square));
        assert!(!point_in_polygon(&GeoPoint::new(5.0, 5.0).unwrap(), &square[..2]));
    }

    #[test]
    fn test_distance_parsing() {
        assert_eq!(parse_distance(&json!(500)).unwrap(), 500.0);
        assert_eq!(parse_distance(&json!("500 m")).unwrap(), 500.0);
        assert_eq!(parse_distance(&json!("2km")).unwrap(), 2000.0);
        assert_eq!(parse_distance(&json!("1.5 km")).unwrap(), 1500.0);
        assert!((parse_distance(&json!("1 mi")).unwrap() - 1609.344).abs() < 1e-9);
        assert!((parse_distance(&json!("300ft")).unwrap() - 91.44).abs() < 1e-9);
    }

    #[test]
    fn test_distance_rejects_garbage() {
        assert!(parse_distance(&json!("fast")).is_err());
        assert!(parse_distance(&json!("500 lightyears")).is_err());
        assert!(parse_distance(&json!(-5)).is_err());
        assert!(parse_distance(&json!(true)).is_err());
    }
}
