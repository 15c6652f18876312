//! Store-side contract for the route query engine.

use anyhow::Result;
use async_trait::async_trait;

use crate::geo::route::RouteQuery;
use crate::models::{GeoPoint, Hoarding};

/// The two geospatial primitives a hoarding store must expose. The route
/// strategies compile down to exactly these, so any backend implementing
/// them (the document store in production, [`crate::geo::MemoryGeoIndex`]
/// in tests) can serve route lookups.
#[async_trait]
pub trait GeoQueryStore: Send + Sync {
    /// Hoardings within `radius_meters` of `center`, nearest first.
    async fn find_near(&self, center: GeoPoint, radius_meters: f64) -> Result<Vec<Hoarding>>;

    /// Hoardings inside the closed rectangle spanned by `min` and `max`.
    async fn find_within_box(&self, min: GeoPoint, max: GeoPoint) -> Result<Vec<Hoarding>>;
}

/// Execute a route query against any capable store.
pub async fn run_route_query<S>(store: &S, query: &RouteQuery) -> Result<Vec<Hoarding>>
where
    S: GeoQueryStore + ?Sized,
{
    match query {
        RouteQuery::Midpoint {
            center,
            radius_meters,
        } => store.find_near(*center, *radius_meters).await,
        RouteQuery::BoundingBox { min, max } => store.find_within_box(*min, *max).await,
    }
}
