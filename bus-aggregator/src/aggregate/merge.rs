//! Merge, deduplicate, and order results gathered from several providers.

use std::collections::HashSet;

use chrono::NaiveDateTime;

use crate::domain::{Route, Station};
use crate::reconcile::normalize_name;

/// Identity of a departure regardless of which provider sold it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RouteKey {
    from: String,
    to: String,
    departure: NaiveDateTime,
    carrier: String,
}

impl RouteKey {
    fn of(route: &Route) -> Self {
        Self {
            from: normalize_name(&route.from_station.name),
            to: normalize_name(&route.to_station.name),
            departure: route.departure_time,
            carrier: normalize_name(&route.carrier),
        }
    }
}

/// Deduplicate routes, keeping the first occurrence, then sort by departure
/// time with ties broken by price.
///
/// Input order is the fan-out order, so on a collision the earlier provider
/// wins. The sort is stable.
pub fn merge_routes(routes: Vec<Route>) -> Vec<Route> {
    let mut seen = HashSet::new();
    let mut merged: Vec<Route> = routes
        .into_iter()
        .filter(|r| seen.insert(RouteKey::of(r)))
        .collect();

    merged.sort_by_key(|r| (r.departure_time, r.price_minor));
    merged
}

/// Deduplicate stations by normalized name, keeping the first occurrence,
/// then sort by name.
pub fn merge_stations(stations: Vec<Station>) -> Vec<Station> {
    let mut seen = HashSet::new();
    let mut merged: Vec<(String, Station)> = stations
        .into_iter()
        .map(|s| (normalize_name(&s.name), s))
        .filter(|(name, _)| seen.insert(name.clone()))
        .collect();

    merged.sort_by(|(a, _), (b, _)| a.cmp(b));
    merged.into_iter().map(|(_, s)| s).collect()
}
