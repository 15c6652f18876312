//! In-memory spatial index over hoardings.
//!
//! Offers the same two primitives as the document store, backed by an
//! R-tree, so route queries can run against a plain `Vec<Hoarding>` in
//! tests and offline tooling.

use anyhow::Result;
use async_trait::async_trait;
use geo::{Distance, Haversine, Point};
use rstar::{RTree, RTreeObject, AABB};

use crate::geo::store::GeoQueryStore;
use crate::models::{GeoPoint, Hoarding};

/// Meters per degree of latitude at the equator, the smallest value on the
/// spheroid, so radius-to-degrees conversions always over-cover.
const METERS_PER_DEGREE: f64 = 110_574.0;

struct IndexedHoarding {
    position: [f64; 2], // [longitude, latitude]
    hoarding: Hoarding,
}

impl RTreeObject for IndexedHoarding {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

pub struct MemoryGeoIndex {
    tree: RTree<IndexedHoarding>,
}

impl MemoryGeoIndex {
    pub fn build(hoardings: Vec<Hoarding>) -> Self {
        let entries = hoardings
            .into_iter()
            .map(|hoarding| IndexedHoarding {
                position: hoarding.location.coordinates,
                hoarding,
            })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Degree-space envelope guaranteed to contain the search circle. The
    /// longitude span is scaled by the band edge nearest the pole.
    fn radius_envelope(center: GeoPoint, radius_meters: f64) -> AABB<[f64; 2]> {
        let lat_delta = radius_meters / METERS_PER_DEGREE;
        let edge_lat = (center.lat.abs() + lat_delta).min(89.9);
        let lon_delta =
            (radius_meters / (METERS_PER_DEGREE * edge_lat.to_radians().cos())).min(360.0);
        AABB::from_corners(
            [center.lon - lon_delta, center.lat - lat_delta],
            [center.lon + lon_delta, center.lat + lat_delta],
        )
    }

    /// Envelope prefilter, then exact haversine distance, nearest first.
    pub fn near(&self, center: GeoPoint, radius_meters: f64) -> Vec<Hoarding> {
        let envelope = Self::radius_envelope(center, radius_meters);
        let origin = Point::new(center.lon, center.lat);
        let mut hits: Vec<(f64, Hoarding)> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .filter_map(|entry| {
                let there = Point::new(entry.position[0], entry.position[1]);
                let distance = Haversine.distance(origin, there);
                (distance <= radius_meters).then(|| (distance, entry.hoarding.clone()))
            })
            .collect();
        hits.sort_by(|a, b| a.0.total_cmp(&b.0));
        hits.into_iter().map(|(_, hoarding)| hoarding).collect()
    }

    /// Closed-interval rectangle lookup; boundary points match.
    pub fn within_box(&self, min: GeoPoint, max: GeoPoint) -> Vec<Hoarding> {
        let envelope = AABB::from_corners([min.lon, min.lat], [max.lon, max.lat]);
        self.tree
            .locate_in_envelope(&envelope)
            .map(|entry| entry.hoarding.clone())
            .collect()
    }
}

#[async_trait]
impl GeoQueryStore for MemoryGeoIndex {
    async fn find_near(&self, center: GeoPoint, radius_meters: f64) -> Result<Vec<Hoarding>> {
        Ok(self.near(center, radius_meters))
    }

    async fn find_within_box(&self, min: GeoPoint, max: GeoPoint) -> Result<Vec<Hoarding>> {
        Ok(self.within_box(min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::route::{bounding_box_query, midpoint_query};
    use crate::geo::store::run_route_query;
    use crate::models::{HoardingDraft, Location};
    use chrono::Utc;
    use geo::Destination;

    fn hoarding_at(id: &str, lon: f64, lat: f64) -> Hoarding {
        Hoarding::from_draft(
            id.to_string(),
            HoardingDraft {
                name: Some(format!("Board {id}")),
                ..Default::default()
            },
            Location::new(lon, lat),
            format!("https://img.example/hoardings/{id}.jpg"),
            Utc::now(),
        )
    }

    fn hoarding_offset(id: &str, from: GeoPoint, bearing: f64, meters: f64) -> Hoarding {
        let moved = Haversine.destination(Point::new(from.lon, from.lat), bearing, meters);
        hoarding_at(id, moved.x(), moved.y())
    }

    fn ids(hoardings: &[Hoarding]) -> Vec<&str> {
        hoardings.iter().map(|h| h.id.as_str()).collect()
    }

    #[test]
    fn near_filters_by_radius_and_sorts_nearest_first() {
        let center = GeoPoint {
            lon: 78.5,
            lat: 17.4,
        };
        let index = MemoryGeoIndex::build(vec![
            hoarding_offset("far", center, 90.0, 14_000.0),
            hoarding_offset("close", center, 180.0, 2_000.0),
            hoarding_offset("out", center, 0.0, 21_000.0),
            hoarding_offset("mid", center, 270.0, 7_500.0),
        ]);
        let found = index.near(center, 15_000.0);
        assert_eq!(ids(&found), vec!["close", "mid", "far"]);
    }

    #[test]
    fn near_includes_a_hoarding_at_the_query_point() {
        let center = GeoPoint {
            lon: 78.5,
            lat: 17.4,
        };
        let index = MemoryGeoIndex::build(vec![hoarding_at("here", 78.5, 17.4)]);
        assert_eq!(ids(&index.near(center, 15_000.0)), vec!["here"]);
    }

    #[test]
    fn within_box_is_boundary_inclusive() {
        let index = MemoryGeoIndex::build(vec![
            hoarding_at("corner-min", 78.0, 17.0),
            hoarding_at("corner-max", 79.0, 18.0),
            hoarding_at("inside", 78.5, 17.5),
            hoarding_at("outside", 79.001, 17.5),
        ]);
        let found = index.within_box(
            GeoPoint {
                lon: 78.0,
                lat: 17.0,
            },
            GeoPoint {
                lon: 79.0,
                lat: 18.0,
            },
        );
        let mut names = ids(&found);
        names.sort();
        assert_eq!(names, vec!["corner-max", "corner-min", "inside"]);
    }

    #[test]
    fn degenerate_box_matches_only_exact_position() {
        let index = MemoryGeoIndex::build(vec![
            hoarding_at("exact", 78.4, 17.45),
            hoarding_at("nearby", 78.4001, 17.45),
        ]);
        let corner = GeoPoint {
            lon: 78.4,
            lat: 17.45,
        };
        assert_eq!(ids(&index.within_box(corner, corner)), vec!["exact"]);
    }

    #[tokio::test]
    async fn midpoint_route_returns_only_hoardings_near_the_center() {
        // Route endpoints roughly Hyderabad to Warangal; only the board
        // placed by the route's midpoint falls inside the 15 km radius,
        // the two near the endpoints are ~70 km out.
        let source = GeoPoint {
            lon: 78.384,
            lat: 17.447,
        };
        let destination = GeoPoint {
            lon: 79.5941,
            lat: 17.9689,
        };
        let index = MemoryGeoIndex::build(vec![
            hoarding_at("near-source", 78.40, 17.45),
            hoarding_at("near-destination", 79.60, 17.97),
            hoarding_at("near-middle", 78.99, 17.71),
        ]);

        let query = midpoint_query(source, destination);
        let found = run_route_query(&index, &query).await.unwrap();
        assert_eq!(ids(&found), vec!["near-middle"]);

        // Same route, box mode: the envelope covers all three.
        let query = bounding_box_query(source, destination);
        let found = run_route_query(&index, &query).await.unwrap();
        assert_eq!(found.len(), 3);
    }

    #[tokio::test]
    async fn zero_length_route_still_answers() {
        let spot = GeoPoint {
            lon: 78.4,
            lat: 17.45,
        };
        let index = MemoryGeoIndex::build(vec![
            hoarding_at("on-spot", 78.4, 17.45),
            hoarding_offset("city-edge", spot, 45.0, 12_000.0),
        ]);

        let found = run_route_query(&index, &midpoint_query(spot, spot))
            .await
            .unwrap();
        assert_eq!(ids(&found), vec!["on-spot", "city-edge"]);

        let found = run_route_query(&index, &bounding_box_query(spot, spot))
            .await
            .unwrap();
        assert_eq!(ids(&found), vec!["on-spot"]);
    }

    #[test]
    fn empty_index_answers_empty() {
        let index = MemoryGeoIndex::build(Vec::new());
        assert!(index.is_empty());
        let anywhere = GeoPoint {
            lon: 0.0,
            lat: 0.0,
        };
        assert!(index.near(anywhere, 15_000.0).is_empty());
    }
}
