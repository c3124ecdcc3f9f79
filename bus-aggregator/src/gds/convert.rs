//! Conversion from GDS DTOs to domain types.

use chrono::{DateTime, NaiveDateTime};
use tracing::warn;

use crate::domain::{Provider, Route, RouteParts, RouteStop, Station, price_to_minor};

use super::types::{GdsPoint, GdsRace};

/// Error during DTO to domain conversion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    /// Failed to parse a date/time string
    #[error("invalid date/time: {0}")]
    InvalidDateTime(String),

    /// Missing required field
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

/// Convert a dispatch/arrival point to a station.
pub fn convert_point(point: &GdsPoint) -> Station {
    let mut station = Station::new(Provider::Gds, point.id.to_string(), point.name.trim());

    if let Some(region) = point.region.as_deref().filter(|r| !r.trim().is_empty()) {
        station = station.with_region(region.trim());
    }
    if let Some(country) = point.country.as_deref().filter(|c| !c.trim().is_empty()) {
        station.country = country.trim().to_string();
    }
    if let (Some(lat), Some(lng)) = (point.latitude, point.longitude) {
        station = station.with_coordinates(lat, lng);
    }

    station
}

/// Convert a list of points, dropping nameless ones.
pub fn convert_points(points: &[GdsPoint]) -> Vec<Station> {
    points
        .iter()
        .filter(|p| {
            let keep = !p.name.trim().is_empty();
            if !keep {
                warn!(point = p.id, "skipping GDS point without a name");
            }
            keep
        })
        .map(convert_point)
        .collect()
}

/// Convert a single race to a route.
pub fn convert_race(race: &GdsRace) -> Result<Route, ConversionError> {
    if race.uid.trim().is_empty() {
        return Err(ConversionError::MissingField("uid"));
    }

    let departure_time = parse_gds_datetime(&race.dispatch_date)?;
    let arrival_time = parse_gds_datetime(&race.arrival_date)?;

    let parts = RouteParts {
        native_id: race.uid.trim().to_string(),
        from_station: RouteStop {
            native_id: race.dispatch_point_id.map(|id| id.to_string()),
            name: race.dispatch_station_name.trim().to_string(),
        },
        to_station: RouteStop {
            native_id: race.arrival_point_id.map(|id| id.to_string()),
            name: race.arrival_station_name.trim().to_string(),
        },
        departure_time,
        arrival_time,
        price_minor: price_to_minor(race.price),
        currency: race.currency.clone().unwrap_or_default(),
        reported_seats: race.free_seat_count,
        carrier: race.carrier.clone().unwrap_or_default(),
    };

    Ok(Route::from_parts(Provider::Gds, parts))
}

/// Convert a list of races.
///
/// Cancelled and malformed races are logged and skipped rather than failing
/// the whole response.
pub fn convert_races(races: &[GdsRace]) -> Vec<Route> {
    let mut routes = Vec::with_capacity(races.len());

    for race in races {
        if race.is_cancelled() {
            continue;
        }
        match convert_race(race) {
            Ok(route) => routes.push(route),
            Err(e) => warn!(race = %race.uid, error = %e, "skipping GDS race"),
        }
    }

    routes
}

/// Parse a GDS timestamp.
///
/// The gateway sends local times, sometimes with a UTC offset attached and
/// sometimes with a space instead of `T`. The offset is dropped: routes are
/// compared in the local time of their stations.
pub fn parse_gds_datetime(s: &str) -> Result<NaiveDateTime, ConversionError> {
    let s = s.trim();

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(dt);
        }
    }

    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.naive_local())
        .map_err(|_| ConversionError::InvalidDateTime(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn race(uid: &str, dispatch: &str, seats: i64) -> GdsRace {
        GdsRace {
            uid: uid.to_string(),
            name: None,
            num: Some("115".to_string()),
            dispatch_date: dispatch.to_string(),
            arrival_date: "2025-08-22T10:30:00".to_string(),
            dispatch_point_id: Some(1021),
            arrival_point_id: Some(1022),
            dispatch_station_name: "Южно-Сахалинск ".to_string(),
            arrival_station_name: "Холмск".to_string(),
            price: 1200.0,
            free_seat_count: seats,
            free_seat_estimation: None,
            carrier: Some("Сахавтотранс".to_string()),
            bus_info: None,
            status: Some("SALE".to_string()),
            currency: None,
        }
    }

    #[test]
    fn parse_datetime_variants() {
        let expected = NaiveDate::from_ymd_opt(2025, 8, 22)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();

        assert_eq!(parse_gds_datetime("2025-08-22T08:00:00").unwrap(), expected);
        assert_eq!(parse_gds_datetime("2025-08-22 08:00:00").unwrap(), expected);
        assert_eq!(parse_gds_datetime("2025-08-22T08:00").unwrap(), expected);
        assert_eq!(
            parse_gds_datetime("2025-08-22T08:00:00+11:00").unwrap(),
            expected
        );
        assert!(parse_gds_datetime("22.08.2025 08:00").is_err());
    }

    #[test]
    fn convert_race_normalizes() {
        let route = convert_race(&race("R-1", "2025-08-22T08:00:00", 12)).unwrap();
        assert_eq!(route.id, "gds:R-1");
        assert_eq!(route.provider, Provider::Gds);
        assert_eq!(route.from_station.name, "Южно-Сахалинск");
        assert_eq!(route.from_station.native_id.as_deref(), Some("1021"));
        assert_eq!(route.duration_minutes, 150);
        assert_eq!(route.price_minor, 120_000);
        assert_eq!(route.currency, "RUB");
        assert_eq!(route.available_seats, 12);
    }

    #[test]
    fn oversold_race_has_zero_seats() {
        let route = convert_race(&race("R-2", "2025-08-22T08:00:00", -3)).unwrap();
        assert_eq!(route.available_seats, 0);
    }

    #[test]
    fn convert_races_skips_bad_and_cancelled() {
        let mut cancelled = race("R-3", "2025-08-22T09:00:00", 5);
        cancelled.status = Some("CANCELLED".to_string());

        let routes = convert_races(&[
            race("R-1", "2025-08-22T08:00:00", 1),
            race("R-bad", "not a date", 1),
            cancelled,
        ]);

        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].id, "gds:R-1");
    }

    #[test]
    fn convert_point_fields() {
        let point = GdsPoint {
            id: 7,
            name: " Корсаков ".to_string(),
            address: None,
            region: Some("Сахалинская обл.".to_string()),
            country: None,
            latitude: Some(46.63),
            longitude: Some(142.77),
        };

        let station = convert_point(&point);
        assert_eq!(station.id.as_str(), "gds:7");
        assert_eq!(station.name, "Корсаков");
        assert_eq!(station.country, Station::DEFAULT_COUNTRY);
        assert!(station.coordinates.is_some());
    }

    #[test]
    fn convert_points_drops_nameless() {
        let points = vec![
            GdsPoint {
                id: 1,
                name: "  ".to_string(),
                address: None,
                region: None,
                country: None,
                latitude: None,
                longitude: None,
            },
            GdsPoint {
                id: 2,
                name: "Анива".to_string(),
                address: None,
                region: None,
                country: Some("Россия".to_string()),
                latitude: Some(46.7),
                longitude: None,
            },
        ];

        let stations = convert_points(&points);
        assert_eq!(stations.len(), 1);
        // Half a coordinate pair is no coordinate.
        assert!(stations[0].coordinates.is_none());
    }
}
