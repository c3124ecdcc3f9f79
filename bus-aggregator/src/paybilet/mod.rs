//! Paybilet (REST ticketing API) client.
//!
//! Authenticates with an `x-access-token` header; every response is a
//! `{success, data}` envelope. Dates go over the wire as `DD.MM.YYYY`.

mod client;
mod convert;
mod error;
mod types;

pub use client::{PaybiletClient, PaybiletConfig};
pub use convert::{convert_race, convert_station, parse_paybilet_datetime};
pub use error::PaybiletError;
pub use types::{LooseId, PaybiletEnvelope, PaybiletRace, PaybiletStation, PaybiletStop};
