//! Domain types for the bus route aggregator.
//!
//! Everything that crosses a component boundary is one of these types.
//! Upstream-specific shapes are converted into them inside the provider
//! clients and never travel further.

mod date;
mod mapping;
mod provider;
mod route;
mod station;

pub use date::{InvalidDate, TravelDate};
pub use mapping::{
    GroupId, GroupPatch, MappingId, MappingOrigin, MappingPatch, NewGroup, NewMapping,
    StationGroup, StationMapping,
};
pub use provider::{Provider, UnknownProvider};
pub use route::{Route, RouteParts, RouteStop, clamp_seats, price_to_minor};
pub use station::{Coordinates, InvalidStationId, Station, StationId, StationRef};
