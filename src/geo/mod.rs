//! Route-relative geo query engine.
//!
//! The strategies in [`route`] turn a pair of coordinates into a
//! [`RouteQuery`], and [`run_route_query`] executes it against anything
//! implementing [`GeoQueryStore`]: the document store in production, the
//! R-tree index in [`memory`] everywhere else.

pub mod memory;
pub mod route;
pub mod store;

pub use memory::MemoryGeoIndex;
pub use route::{
    bounding_box_query, midpoint_query, parse_point, validate_point, CoordinateError,
    CoordinateInput, RouteQuery, ROUTE_PROXIMITY_RADIUS_METERS,
};
pub use store::{run_route_query, GeoQueryStore};
