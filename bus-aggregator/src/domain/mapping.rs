//! Station mappings and groups.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Provider, StationId, StationRef};

/// Store-assigned mapping identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MappingId(pub u64);

impl fmt::Display for MappingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// Store-assigned group identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub u64);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// How a mapping came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingOrigin {
    Automatic,
    Manual,
}

/// A mapping before the store has assigned it an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMapping {
    /// GDS side.
    pub station_a: Option<StationRef>,
    /// Paybilet side.
    pub station_b: Option<StationRef>,
    pub display_name: String,
    pub confidence: f64,
    pub origin: MappingOrigin,
}

impl NewMapping {
    /// Link two stations. Sides are assigned by provider, so argument order
    /// does not matter.
    pub fn link(
        first: StationRef,
        second: StationRef,
        confidence: f64,
        origin: MappingOrigin,
    ) -> Self {
        let display_name = first.name.clone();
        let (station_a, station_b) = if first.provider == Provider::Gds {
            (first, second)
        } else {
            (second, first)
        };

        Self {
            station_a: Some(station_a),
            station_b: Some(station_b),
            display_name,
            confidence: confidence.clamp(0.0, 1.0),
            origin,
        }
    }

    /// A partial mapping with one side only, awaiting completion.
    pub fn partial(station: StationRef, origin: MappingOrigin) -> Self {
        let display_name = station.name.clone();
        let (station_a, station_b) = match station.provider {
            Provider::Gds => (Some(station), None),
            Provider::Paybilet => (None, Some(station)),
        };

        Self {
            station_a,
            station_b,
            display_name,
            confidence: 1.0,
            origin,
        }
    }
}

/// A persisted link between one GDS station and one Paybilet station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationMapping {
    pub id: MappingId,
    pub station_a: Option<StationRef>,
    pub station_b: Option<StationRef>,
    pub display_name: String,
    pub confidence: f64,
    pub origin: MappingOrigin,
    pub is_primary_in_group: bool,
    pub is_active: bool,
}

impl StationMapping {
    /// Materialize a new mapping under the given id.
    pub fn from_new(id: MappingId, new: NewMapping) -> Self {
        Self {
            id,
            station_a: new.station_a,
            station_b: new.station_b,
            display_name: new.display_name,
            confidence: new.confidence,
            origin: new.origin,
            is_primary_in_group: false,
            is_active: true,
        }
    }

    /// Both populated sides, GDS first.
    pub fn sides(&self) -> impl Iterator<Item = &StationRef> {
        self.station_a.iter().chain(self.station_b.iter())
    }

    /// Whether this mapping references the station.
    pub fn involves(&self, id: &StationId) -> bool {
        self.sides().any(|s| &s.id == id)
    }

    /// Whether this mapping links exactly the given pair.
    pub fn links_pair(&self, a: Option<&StationId>, b: Option<&StationId>) -> bool {
        self.station_a.as_ref().map(|s| &s.id) == a && self.station_b.as_ref().map(|s| &s.id) == b
    }

    pub fn is_manual(&self) -> bool {
        self.origin == MappingOrigin::Manual
    }
}

/// Fields of a mapping that may change after creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingPatch {
    pub is_primary_in_group: Option<bool>,
    pub is_active: Option<bool>,
    pub display_name: Option<String>,
}

/// A group before the store has assigned it an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewGroup {
    pub name: String,
    pub primary_station: StationRef,
    /// Always contains `primary_station`.
    pub member_stations: Vec<StationRef>,
}

/// A set of stations treated as one boarding point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationGroup {
    pub id: GroupId,
    pub name: String,
    pub primary_station: StationRef,
    pub member_stations: Vec<StationRef>,
    pub is_active: bool,
}

impl StationGroup {
    pub fn from_new(id: GroupId, new: NewGroup) -> Self {
        Self {
            id,
            name: new.name,
            primary_station: new.primary_station,
            member_stations: new.member_stations,
            is_active: true,
        }
    }

    pub fn contains(&self, id: &StationId) -> bool {
        self.member_stations.iter().any(|s| &s.id == id)
    }
}

/// Fields of a group that may change after creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupPatch {
    pub name: Option<String>,
    pub primary_station: Option<StationRef>,
    pub member_stations: Option<Vec<StationRef>>,
    pub is_active: Option<bool>,
}
