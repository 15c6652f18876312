//! The two route-relative lookup strategies, as pure query computations.
//!
//! Both take a source and destination coordinate pair and produce a
//! [`RouteQuery`] specification; neither computes a road-network corridor.

use serde::Deserialize;
use thiserror::Error;

use crate::models::GeoPoint;

/// Fixed search radius around the route midpoint (15 km).
pub const ROUTE_PROXIMITY_RADIUS_METERS: f64 = 15_000.0;

/// A coordinate pair as clients send it: a `[lng, lat]` JSON array, or a
/// `"lng,lat"` string (form fields always arrive as text).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CoordinateInput {
    Pair(Vec<f64>),
    Text(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum CoordinateError {
    #[error("expected exactly two coordinates [longitude, latitude], got {0}")]
    WrongArity(usize),
    #[error("could not parse \"{0}\" as \"lng,lat\"")]
    Unparseable(String),
    #[error("coordinates must be finite numbers")]
    NotFinite,
    #[error("longitude {0} is out of range [-180, 180]")]
    LongitudeOutOfRange(f64),
    #[error("latitude {0} is out of range [-90, 90]")]
    LatitudeOutOfRange(f64),
}

/// Query specification selecting hoardings relevant to a route.
///
/// The two modes trade off differently (midpoint: cheap but blind to
/// anything away from the route's center; box: full envelope, no distance
/// cutoff) and stay separately invokable.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteQuery {
    /// Everything within `radius_meters` of `center`, nearest first.
    Midpoint { center: GeoPoint, radius_meters: f64 },
    /// Everything inside the closed rectangle spanned by `min`/`max`.
    BoundingBox { min: GeoPoint, max: GeoPoint },
}

/// Validate a longitude/latitude pair.
pub fn validate_point(lon: f64, lat: f64) -> Result<GeoPoint, CoordinateError> {
    if !lon.is_finite() || !lat.is_finite() {
        return Err(CoordinateError::NotFinite);
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(CoordinateError::LongitudeOutOfRange(lon));
    }
    if !(-90.0..=90.0).contains(&lat) {
        return Err(CoordinateError::LatitudeOutOfRange(lat));
    }
    Ok(GeoPoint { lat, lon })
}

/// Resolve a client-supplied coordinate pair, rejecting malformed input
/// before any query executes.
pub fn parse_point(input: &CoordinateInput) -> Result<GeoPoint, CoordinateError> {
    match input {
        CoordinateInput::Pair(values) => {
            if values.len() != 2 {
                return Err(CoordinateError::WrongArity(values.len()));
            }
            validate_point(values[0], values[1])
        }
        CoordinateInput::Text(text) => {
            let parts: Vec<&str> = text.split(',').map(str::trim).collect();
            if parts.len() != 2 {
                return Err(CoordinateError::WrongArity(parts.len()));
            }
            let lon = parts[0]
                .parse::<f64>()
                .map_err(|_| CoordinateError::Unparseable(text.clone()))?;
            let lat = parts[1]
                .parse::<f64>()
                .map_err(|_| CoordinateError::Unparseable(text.clone()))?;
            validate_point(lon, lat)
        }
    }
}

/// Midpoint-proximity mode.
///
/// The center is the arithmetic mean of the endpoints' components, not a
/// great-circle midpoint; at route scale the difference is negligible.
pub fn midpoint_query(source: GeoPoint, destination: GeoPoint) -> RouteQuery {
    RouteQuery::Midpoint {
        center: GeoPoint {
            lon: (source.lon + destination.lon) / 2.0,
            lat: (source.lat + destination.lat) / 2.0,
        },
        radius_meters: ROUTE_PROXIMITY_RADIUS_METERS,
    }
}

/// Bounding-box mode: the axis-aligned envelope of the two endpoints,
/// boundary inclusive. No distance cutoff, no ordering guarantee.
pub fn bounding_box_query(source: GeoPoint, destination: GeoPoint) -> RouteQuery {
    RouteQuery::BoundingBox {
        min: GeoPoint {
            lon: source.lon.min(destination.lon),
            lat: source.lat.min(destination.lat),
        },
        max: GeoPoint {
            lon: source.lon.max(destination.lon),
            lat: source.lat.max(destination.lat),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lon: f64, lat: f64) -> GeoPoint {
        GeoPoint { lat, lon }
    }

    #[test]
    fn midpoint_is_component_mean() {
        let q = midpoint_query(point(78.384, 17.447), point(79.5941, 17.9689));
        match q {
            RouteQuery::Midpoint {
                center,
                radius_meters,
            } => {
                assert!((center.lon - 78.98905).abs() < 1e-9);
                assert!((center.lat - 17.70795).abs() < 1e-9);
                assert_eq!(radius_meters, 15_000.0);
            }
            _ => panic!("expected midpoint query"),
        }
    }

    #[test]
    fn both_modes_are_order_independent() {
        let a = point(-3.2, 55.9);
        let b = point(7.45, 46.95);
        assert_eq!(midpoint_query(a, b), midpoint_query(b, a));
        assert_eq!(bounding_box_query(a, b), bounding_box_query(b, a));
    }

    #[test]
    fn box_spans_min_to_max_per_component() {
        let q = bounding_box_query(point(79.6, 17.45), point(78.4, 17.97));
        match q {
            RouteQuery::BoundingBox { min, max } => {
                assert_eq!(min.lon, 78.4);
                assert_eq!(min.lat, 17.45);
                assert_eq!(max.lon, 79.6);
                assert_eq!(max.lat, 17.97);
            }
            _ => panic!("expected bounding box query"),
        }
    }

    #[test]
    fn identical_endpoints_collapse() {
        let a = point(78.4, 17.45);
        match midpoint_query(a, a) {
            RouteQuery::Midpoint { center, .. } => assert_eq!(center, a),
            _ => panic!("expected midpoint query"),
        }
        match bounding_box_query(a, a) {
            RouteQuery::BoundingBox { min, max } => {
                assert_eq!(min, a);
                assert_eq!(max, a);
            }
            _ => panic!("expected bounding box query"),
        }
    }

    #[test]
    fn accepts_array_and_text_forms() {
        let from_array = parse_point(&CoordinateInput::Pair(vec![78.384, 17.447])).unwrap();
        let from_text = parse_point(&CoordinateInput::Text("78.384, 17.447".to_string())).unwrap();
        assert_eq!(from_array, from_text);
    }

    #[test]
    fn rejects_wrong_arity() {
        assert_eq!(
            parse_point(&CoordinateInput::Pair(vec![78.384])),
            Err(CoordinateError::WrongArity(1))
        );
        assert_eq!(
            parse_point(&CoordinateInput::Pair(vec![1.0, 2.0, 3.0])),
            Err(CoordinateError::WrongArity(3))
        );
        assert_eq!(
            parse_point(&CoordinateInput::Text("78.4".to_string())),
            Err(CoordinateError::WrongArity(1))
        );
    }

    #[test]
    fn rejects_out_of_range_and_non_finite() {
        assert_eq!(
            parse_point(&CoordinateInput::Pair(vec![200.0, 17.0])),
            Err(CoordinateError::LongitudeOutOfRange(200.0))
        );
        assert_eq!(
            parse_point(&CoordinateInput::Pair(vec![78.0, -90.5])),
            Err(CoordinateError::LatitudeOutOfRange(-90.5))
        );
        assert_eq!(
            parse_point(&CoordinateInput::Pair(vec![f64::NAN, 17.0])),
            Err(CoordinateError::NotFinite)
        );
    }

    #[test]
    fn rejects_unparseable_text() {
        assert!(matches!(
            parse_point(&CoordinateInput::Text("east,north".to_string())),
            Err(CoordinateError::Unparseable(_))
        ));
    }

    #[test]
    fn boundary_values_are_valid() {
        assert!(validate_point(-180.0, -90.0).is_ok());
        assert!(validate_point(180.0, 90.0).is_ok());
    }
}
