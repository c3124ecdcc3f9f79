//! Station types.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Provider;

/// Aggregator-wide station identifier.
///
/// Always of the form `<provider>:<native id>`, so the same upstream
/// station keeps the same id across re-syncs and two distinct upstream
/// stations can never collide.
///
/// # Examples
///
/// ```
/// use bus_aggregator::domain::{Provider, StationId};
///
/// let id = StationId::new(Provider::Gds, "1021");
/// assert_eq!(id.as_str(), "gds:1021");
/// assert_eq!(id.provider(), Provider::Gds);
/// assert_eq!(id.native_id(), "1021");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StationId(String);

/// Error returned when parsing a malformed station id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid station id: {0}")]
pub struct InvalidStationId(String);

impl StationId {
    /// Build an id from its parts.
    pub fn new(provider: Provider, native_id: &str) -> Self {
        StationId(provider.prefixed(native_id))
    }

    /// Parse a prefixed id such as `paybilet:77`.
    pub fn parse(s: &str) -> Result<Self, InvalidStationId> {
        let (provider, native) =
            Provider::split_prefixed(s).ok_or_else(|| InvalidStationId(s.to_string()))?;
        Ok(Self::new(provider, native))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The provider this station came from.
    pub fn provider(&self) -> Provider {
        // The constructors only ever produce well-formed ids.
        Provider::split_prefixed(&self.0)
            .map(|(p, _)| p)
            .unwrap_or(Provider::Gds)
    }

    /// The provider-native part of the id.
    pub fn native_id(&self) -> &str {
        Provider::split_prefixed(&self.0)
            .map(|(_, n)| n)
            .unwrap_or(&self.0)
    }
}

impl TryFrom<String> for StationId {
    type Error = InvalidStationId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        StationId::parse(&value)
    }
}

impl From<StationId> for String {
    fn from(id: StationId) -> Self {
        id.0
    }
}

impl fmt::Debug for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StationId({})", self.0)
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Geographic position of a station.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// A bus station as reported by one provider, normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    /// Aggregator-wide id.
    pub id: StationId,
    /// Human-readable name as the provider spells it.
    pub name: String,
    /// Administrative region, when the provider reports one.
    pub region: Option<String>,
    /// Country name.
    pub country: String,
    /// Position, when known.
    pub coordinates: Option<Coordinates>,
    /// The provider this record came from.
    pub provider: Provider,
    /// Identifier inside the provider's own namespace.
    pub native_id: String,
}

impl Station {
    /// Country assumed when the upstream omits it.
    pub const DEFAULT_COUNTRY: &'static str = "Россия";

    /// Create a station with only the mandatory fields set.
    pub fn new(provider: Provider, native_id: impl Into<String>, name: impl Into<String>) -> Self {
        let native_id = native_id.into();
        Self {
            id: StationId::new(provider, &native_id),
            name: name.into(),
            region: None,
            country: Self::DEFAULT_COUNTRY.to_string(),
            coordinates: None,
            provider,
            native_id,
        }
    }

    /// Set the region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set the coordinates.
    pub fn with_coordinates(mut self, lat: f64, lng: f64) -> Self {
        self.coordinates = Some(Coordinates { lat, lng });
        self
    }

    /// A reference to this station.
    pub fn to_ref(&self) -> StationRef {
        StationRef {
            id: self.id.clone(),
            provider: self.provider,
            native_id: self.native_id.clone(),
            name: self.name.clone(),
        }
    }
}

/// Lightweight pointer to a station, carried by mappings and groups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StationRef {
    pub id: StationId,
    pub provider: Provider,
    pub native_id: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn station_id_roundtrip() {
        let id = StationId::parse("paybilet:77").unwrap();
        assert_eq!(id.provider(), Provider::Paybilet);
        assert_eq!(id.native_id(), "77");
        assert_eq!(id.to_string(), "paybilet:77");
    }

    #[test]
    fn station_id_rejects_unprefixed() {
        assert!(StationId::parse("77").is_err());
        assert!(StationId::parse("train:77").is_err());
        assert!(StationId::parse("gds:").is_err());
    }

    #[test]
    fn station_id_serde_validates() {
        let id: StationId = serde_json::from_str("\"gds:5\"").unwrap();
        assert_eq!(id.native_id(), "5");
        assert!(serde_json::from_str::<StationId>("\"5\"").is_err());
    }

    #[test]
    fn new_station_derives_id() {
        let s = Station::new(Provider::Gds, "12", "Холмск").with_region("Сахалинская обл.");
        assert_eq!(s.id.as_str(), "gds:12");
        assert_eq!(s.country, Station::DEFAULT_COUNTRY);
        assert_eq!(s.region.as_deref(), Some("Сахалинская обл."));

        let r = s.to_ref();
        assert_eq!(r.id, s.id);
        assert_eq!(r.name, "Холмск");
    }
}
