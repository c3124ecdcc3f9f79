//! GDS gateway response DTOs.
//!
//! The JSON gateway mirrors the SOAP service one-to-one: every operation
//! answers with an envelope whose `return` member holds the SOAP return
//! value, or a `fault` member when the operation failed. Optional fields
//! are `Option` because the gateway drops empty SOAP elements.

use serde::Deserialize;

/// Envelope around every gateway response.
#[derive(Debug, Clone, Deserialize)]
pub struct GdsEnvelope<T> {
    #[serde(rename = "return")]
    pub value: Option<T>,

    pub fault: Option<GdsFault>,
}

/// SOAP fault, as relayed by the gateway.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GdsFault {
    pub code: Option<String>,
    pub message: String,
}

impl GdsFault {
    /// Whether the fault means the requested entity does not exist.
    pub fn is_not_found(&self) -> bool {
        self.code
            .as_deref()
            .is_some_and(|c| c.ends_with("NOT_FOUND"))
    }
}

/// A dispatch or arrival point (station).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GdsPoint {
    pub id: i64,

    pub name: String,

    /// Street address; occasionally the only place the town is named.
    pub address: Option<String>,

    pub region: Option<String>,

    pub country: Option<String>,

    pub latitude: Option<f64>,

    pub longitude: Option<f64>,
}

/// A race (one scheduled bus departure).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GdsRace {
    /// Stable race identifier, valid for `getRace`.
    pub uid: String,

    /// Route name, e.g. "Южно-Сахалинск - Холмск".
    pub name: Option<String>,

    /// Route number.
    pub num: Option<String>,

    /// Local departure, ISO 8601 with or without offset.
    pub dispatch_date: String,

    /// Local arrival, ISO 8601 with or without offset.
    pub arrival_date: String,

    pub dispatch_point_id: Option<i64>,

    pub arrival_point_id: Option<i64>,

    pub dispatch_station_name: String,

    pub arrival_station_name: String,

    /// Fare in roubles.
    pub price: f64,

    /// Free seats. Negative when the race is oversold.
    pub free_seat_count: i64,

    /// Free-text estimate ("много", "мало"), unused.
    pub free_seat_estimation: Option<String>,

    pub carrier: Option<String>,

    pub bus_info: Option<String>,

    /// "SALE", "CANCELLED", ...
    pub status: Option<String>,

    pub currency: Option<String>,
}

impl GdsRace {
    /// Whether the race was cancelled and must not be offered.
    pub fn is_cancelled(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("CANCELLED"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_points_envelope() {
        let json = r#"{
            "return": [
                {"id": 1021, "name": "Южно-Сахалинск АВ", "address": "ул. Вокзальная, 1",
                 "region": "Сахалинская обл.", "latitude": 46.95, "longitude": 142.73},
                {"id": 1022, "name": "Холмск"}
            ]
        }"#;

        let env: GdsEnvelope<Vec<GdsPoint>> = serde_json::from_str(json).unwrap();
        let points = env.value.unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].id, 1021);
        assert_eq!(points[0].latitude, Some(46.95));
        assert!(points[1].region.is_none());
        assert!(env.fault.is_none());
    }

    #[test]
    fn deserialize_race() {
        let json = r#"{
            "uid": "R-100",
            "num": "115",
            "dispatchDate": "2025-08-22T08:00:00",
            "arrivalDate": "2025-08-22T10:30:00",
            "dispatchPointId": 1021,
            "arrivalPointId": 1022,
            "dispatchStationName": "Южно-Сахалинск",
            "arrivalStationName": "Холмск",
            "price": 1200.0,
            "freeSeatCount": -2,
            "carrier": "Сахавтотранс",
            "status": "SALE"
        }"#;

        let race: GdsRace = serde_json::from_str(json).unwrap();
        assert_eq!(race.uid, "R-100");
        assert_eq!(race.free_seat_count, -2);
        assert!(!race.is_cancelled());
    }

    #[test]
    fn fault_not_found() {
        let json = r#"{"fault": {"code": "RACE_NOT_FOUND", "message": "no such race"}}"#;
        let env: GdsEnvelope<GdsRace> = serde_json::from_str(json).unwrap();
        assert!(env.value.is_none());
        assert!(env.fault.unwrap().is_not_found());
    }
}
