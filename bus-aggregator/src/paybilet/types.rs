//! Paybilet API response DTOs.
//!
//! Paybilet is loosely typed: ids come back as numbers or strings, and a
//! race endpoint may be a bare station name or an object. These DTOs accept
//! every shape seen in the wild and nothing downstream ever sees them.

use serde::Deserialize;

/// `{success, data, error, message}` wrapper around every response.
#[derive(Debug, Clone, Deserialize)]
pub struct PaybiletEnvelope<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub message: Option<String>,
}

impl<T> PaybiletEnvelope<T> {
    /// Best available explanation for an unsuccessful response.
    pub fn failure_reason(&self) -> String {
        self.error
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| "request was not successful".to_string())
    }
}

/// An identifier that may be encoded as a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum LooseId {
    Number(i64),
    Text(String),
}

impl LooseId {
    pub fn to_native(&self) -> String {
        match self {
            LooseId::Number(n) => n.to_string(),
            LooseId::Text(s) => s.trim().to_string(),
        }
    }
}

/// A station record.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaybiletStation {
    pub id: LooseId,
    pub name: String,
    pub code: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// A race endpoint: either a bare name or a station object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PaybiletStop {
    Name(String),
    Station { id: Option<LooseId>, name: String },
}

impl PaybiletStop {
    pub fn name(&self) -> &str {
        match self {
            PaybiletStop::Name(name) | PaybiletStop::Station { name, .. } => name.trim(),
        }
    }

    pub fn native_id(&self) -> Option<String> {
        match self {
            PaybiletStop::Name(_) => None,
            PaybiletStop::Station { id, .. } => id.as_ref().map(LooseId::to_native),
        }
    }
}

/// A race (one bus departure).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaybiletRace {
    pub id: LooseId,
    pub from: PaybiletStop,
    pub to: PaybiletStop,
    /// `DD.MM.YYYY HH:MM` or ISO 8601.
    pub departure_time: String,
    pub arrival_time: String,
    pub price: f64,
    pub currency: Option<String>,
    /// May be negative when oversold.
    #[serde(default)]
    pub available_seats: i64,
    pub carrier: Option<String>,
}
