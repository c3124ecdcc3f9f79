//! Route (race) type.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::Provider;

/// Endpoint of a route as the provider describes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteStop {
    /// Provider-native station id, when the upstream reports one.
    pub native_id: Option<String>,
    /// Station name as the provider spells it.
    pub name: String,
}

impl RouteStop {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            native_id: None,
            name: name.into(),
        }
    }
}

/// One bus departure returned by a provider.
///
/// Routes are produced per search and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Prefixed id (`gds:<uid>`, `paybilet:<id>`), usable for detail lookups.
    pub id: String,
    pub from_station: RouteStop,
    pub to_station: RouteStop,
    /// Local departure time at the origin.
    pub departure_time: NaiveDateTime,
    /// Local arrival time at the destination.
    pub arrival_time: NaiveDateTime,
    pub duration_minutes: i64,
    /// Price in minor currency units (kopecks for RUB).
    pub price_minor: i64,
    /// ISO 4217 code, uppercase.
    pub currency: String,
    /// Never negative; oversold upstream counts are clamped at construction.
    pub available_seats: u32,
    pub carrier: String,
    pub provider: Provider,
}

/// Fields a provider client has after parsing an upstream record.
#[derive(Debug, Clone)]
pub struct RouteParts {
    pub native_id: String,
    pub from_station: RouteStop,
    pub to_station: RouteStop,
    pub departure_time: NaiveDateTime,
    pub arrival_time: NaiveDateTime,
    pub price_minor: i64,
    pub currency: String,
    /// Seat count exactly as reported, possibly negative.
    pub reported_seats: i64,
    pub carrier: String,
}

impl Route {
    /// Currency assumed when the upstream omits one.
    pub const DEFAULT_CURRENCY: &'static str = "RUB";

    /// Build a normalized route from parsed upstream fields.
    pub fn from_parts(provider: Provider, parts: RouteParts) -> Self {
        let available_seats = clamp_seats(parts.reported_seats);
        if parts.reported_seats < 0 {
            warn!(
                provider = %provider,
                route = %parts.native_id,
                reported = parts.reported_seats,
                "negative seat count from upstream, clamping to 0"
            );
        }

        let duration_minutes = (parts.arrival_time - parts.departure_time)
            .num_minutes()
            .max(0);

        let currency = match parts.currency.trim() {
            "" => Self::DEFAULT_CURRENCY.to_string(),
            c => c.to_ascii_uppercase(),
        };

        Self {
            id: provider.prefixed(&parts.native_id),
            from_station: parts.from_station,
            to_station: parts.to_station,
            departure_time: parts.departure_time,
            arrival_time: parts.arrival_time,
            duration_minutes,
            price_minor: parts.price_minor,
            currency,
            available_seats,
            carrier: parts.carrier.trim().to_string(),
            provider,
        }
    }

    /// Price in major units, for display.
    pub fn price(&self) -> f64 {
        self.price_minor as f64 / 100.0
    }
}

/// Clamp an upstream seat count into the valid range.
pub fn clamp_seats(reported: i64) -> u32 {
    reported.clamp(0, u32::MAX as i64) as u32
}

/// Convert a major-unit price (e.g. `1200.5` roubles) to minor units.
pub fn price_to_minor(major: f64) -> i64 {
    if !major.is_finite() {
        return 0;
    }
    (major * 100.0).round() as i64
}
