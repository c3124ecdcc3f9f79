//! Data transfer objects for web requests and responses.
//!
//! Responses mostly serialize core types directly; only request shapes and
//! the error body live here.

use serde::{Deserialize, Serialize};

use crate::domain::{StationGroup, StationId, StationRef};

/// Query for a route search.
#[derive(Debug, Deserialize)]
pub struct SearchRacesRequest {
    /// Departure station name or id
    pub from: String,

    /// Arrival station name or id
    pub to: String,

    /// Travel date, `DD.MM.YY` or `YYYY-MM-DD`
    pub date: String,
}

/// Query for a route detail lookup.
#[derive(Debug, Default, Deserialize)]
pub struct RouteDetailRequest {
    /// Provider to ask, overriding the route id prefix
    pub provider: Option<String>,
}

/// Query for station resolution.
#[derive(Debug, Deserialize)]
pub struct ResolveStationRequest {
    /// Station name or id
    pub q: String,
}

/// Equivalent stations for a query.
#[derive(Debug, Serialize)]
pub struct ResolveStationResponse {
    pub query: String,
    pub stations: Vec<StationRef>,
}

/// Request to link two stations by hand.
#[derive(Debug, Deserialize)]
pub struct ManualMappingRequest {
    pub station_a: StationId,
    pub station_b: StationId,
}

/// Request to create a group.
#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    pub primary: StationId,
    #[serde(default)]
    pub members: Vec<StationId>,
}

/// Names one station within a group operation.
#[derive(Debug, Deserialize)]
pub struct GroupMemberRequest {
    pub station: StationId,
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

/// Groups created by automatic grouping.
#[derive(Debug, Serialize)]
pub struct AutoGroupResponse {
    pub created: usize,
    pub groups: Vec<StationGroup>,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
