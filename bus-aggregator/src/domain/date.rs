//! Travel date handling.
//!
//! Callers send dates either as `DD.MM.YY` or `YYYY-MM-DD`. Internally a
//! search date is a plain calendar date; each provider client renders it in
//! whatever format its upstream expects.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Error returned when a date string matches neither accepted format.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid date {input:?}: expected DD.MM.YY or YYYY-MM-DD")]
pub struct InvalidDate {
    input: String,
}

/// The calendar date a search is for.
///
/// # Examples
///
/// ```
/// use bus_aggregator::domain::TravelDate;
///
/// let a = TravelDate::parse("22.08.25").unwrap();
/// let b = TravelDate::parse("2025-08-22").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.to_iso(), "2025-08-22");
/// assert_eq!(a.to_dotted(), "22.08.2025");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TravelDate(NaiveDate);

impl TravelDate {
    /// Wrap an already-valid date.
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Parse either `DD.MM.YY` or `YYYY-MM-DD`.
    pub fn parse(s: &str) -> Result<Self, InvalidDate> {
        let s = s.trim();
        let invalid = || InvalidDate {
            input: s.to_string(),
        };

        let parsed = if s.contains('.') {
            // Two-digit year only.
            let year_part = s.rsplit('.').next().ok_or_else(invalid)?;
            if year_part.len() != 2 {
                return Err(invalid());
            }
            NaiveDate::parse_from_str(s, "%d.%m.%y")
        } else {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
        };

        parsed.map(Self).map_err(|_| invalid())
    }

    /// The underlying date.
    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// `YYYY-MM-DD`.
    pub fn to_iso(&self) -> String {
        self.0.format("%Y-%m-%d").to_string()
    }

    /// `DD.MM.YYYY`.
    pub fn to_dotted(&self) -> String {
        self.0.format("%d.%m.%Y").to_string()
    }
}

impl fmt::Debug for TravelDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TravelDate({})", self.to_iso())
    }
}

impl fmt::Display for TravelDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso())
    }
}
