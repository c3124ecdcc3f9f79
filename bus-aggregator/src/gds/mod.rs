//! GDS (bus station GDS, SOAP) client.
//!
//! Key characteristics of the GDS:
//! - Stations are "points" with integer ids; departures are "races"
//!   identified by a string uid that stays valid for detail lookups
//! - Dates go over the wire as `YYYY-MM-DD`
//! - Seat counts can be negative for oversold races

mod client;
mod convert;
mod error;
mod types;

pub use client::{GdsClient, GdsConfig};
pub use convert::{ConversionError, convert_point, convert_race, parse_gds_datetime};
pub use error::GdsError;
pub use types::{GdsEnvelope, GdsFault, GdsPoint, GdsRace};
