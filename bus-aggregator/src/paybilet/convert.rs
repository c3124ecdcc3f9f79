//! Conversion from Paybilet DTOs to domain types.

use chrono::{DateTime, NaiveDateTime};
use tracing::warn;

use crate::domain::{Provider, Route, RouteParts, RouteStop, Station, price_to_minor};

use super::types::{PaybiletRace, PaybiletStation};

/// Convert a station record; `None` when the record has no usable id or name.
pub fn convert_station(dto: &PaybiletStation) -> Option<Station> {
    let native_id = dto.id.to_native();
    let name = dto.name.trim();
    if native_id.is_empty() || name.is_empty() {
        return None;
    }

    let mut station = Station::new(Provider::Paybilet, native_id, name);
    if let Some(region) = dto.region.as_deref().filter(|r| !r.trim().is_empty()) {
        station = station.with_region(region.trim());
    }
    if let Some(country) = dto.country.as_deref().filter(|c| !c.trim().is_empty()) {
        station.country = country.trim().to_string();
    }
    if let (Some(lat), Some(lng)) = (dto.latitude, dto.longitude) {
        station = station.with_coordinates(lat, lng);
    }
    Some(station)
}

pub fn convert_stations(dtos: &[PaybiletStation]) -> Vec<Station> {
    dtos.iter()
        .filter_map(|dto| {
            let station = convert_station(dto);
            if station.is_none() {
                warn!(id = ?dto.id, "skipping Paybilet station without id or name");
            }
            station
        })
        .collect()
}

/// Convert a race; `None` when its times cannot be parsed.
pub fn convert_race(dto: &PaybiletRace) -> Option<Route> {
    let native_id = dto.id.to_native();
    if native_id.is_empty() {
        return None;
    }
    let departure_time = parse_paybilet_datetime(&dto.departure_time)?;
    let arrival_time = parse_paybilet_datetime(&dto.arrival_time)?;

    let parts = RouteParts {
        native_id,
        from_station: RouteStop {
            native_id: dto.from.native_id(),
            name: dto.from.name().to_string(),
        },
        to_station: RouteStop {
            native_id: dto.to.native_id(),
            name: dto.to.name().to_string(),
        },
        departure_time,
        arrival_time,
        price_minor: price_to_minor(dto.price),
        currency: dto.currency.clone().unwrap_or_default(),
        reported_seats: dto.available_seats,
        carrier: dto.carrier.clone().unwrap_or_default(),
    };

    Some(Route::from_parts(Provider::Paybilet, parts))
}

pub fn convert_races(dtos: &[PaybiletRace]) -> Vec<Route> {
    dtos.iter()
        .filter_map(|dto| {
            let route = convert_race(dto);
            if route.is_none() {
                warn!(id = ?dto.id, departure = %dto.departure_time, "skipping unparseable Paybilet race");
            }
            route
        })
        .collect()
}

/// Parse `DD.MM.YYYY HH:MM[:SS]` or ISO 8601.
pub fn parse_paybilet_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    [
        "%d.%m.%Y %H:%M",
        "%d.%m.%Y %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
    ]
    .iter()
    .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
    .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_local()))
}
