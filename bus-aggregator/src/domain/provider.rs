//! Upstream provider identity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when parsing an unknown provider name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown provider: {0}")]
pub struct UnknownProvider(String);

/// One of the upstream systems the aggregator talks to.
///
/// The declaration order is the fan-out order: when two providers return
/// equivalent records, the one from the earlier provider wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// SOAP-based GDS system, reached through its JSON gateway.
    Gds,
    /// REST ticketing API.
    Paybilet,
}

impl Provider {
    /// All providers, in fan-out order.
    pub const ALL: [Provider; 2] = [Provider::Gds, Provider::Paybilet];

    /// Short lowercase tag used in ids and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Gds => "gds",
            Provider::Paybilet => "paybilet",
        }
    }

    /// Parse a provider tag (case-insensitive).
    pub fn parse(s: &str) -> Result<Self, UnknownProvider> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gds" => Ok(Provider::Gds),
            "paybilet" => Ok(Provider::Paybilet),
            _ => Err(UnknownProvider(s.to_string())),
        }
    }

    /// Split a prefixed id like `gds:123` into provider and native id.
    ///
    /// Returns `None` if the prefix is missing or names no provider.
    pub fn split_prefixed(id: &str) -> Option<(Provider, &str)> {
        let (prefix, rest) = id.split_once(':')?;
        let provider = Provider::parse(prefix).ok()?;
        if rest.is_empty() {
            return None;
        }
        Some((provider, rest))
    }

    /// Build a prefixed id for a native identifier.
    pub fn prefixed(&self, native_id: &str) -> String {
        format!("{}:{}", self.as_str(), native_id)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
