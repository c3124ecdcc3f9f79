//! Application configuration from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::aggregate::AggregatorConfig;
use crate::cache::CacheConfig;
use crate::gds::GdsConfig;
use crate::paybilet::PaybiletConfig;
use crate::reconcile::ReconcilerConfig;

const DEFAULT_STORE_PATH: &str = "data/store.json";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

/// Default interval between station syncs (6 hours).
const DEFAULT_SYNC_INTERVAL_SECS: u64 = 6 * 60 * 60;

/// A variable that is set but cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {name}: {value:?} ({reason})")]
pub struct ConfigError {
    pub name: &'static str,
    pub value: String,
    pub reason: String,
}

/// Everything `main` needs to assemble the service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gds: GdsConfig,
    pub paybilet: PaybiletConfig,
    pub cache: CacheConfig,
    pub reconciler: ReconcilerConfig,
    pub aggregator: AggregatorConfig,
    pub store_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub sync_interval: Duration,
}

impl AppConfig {
    /// Read configuration from process environment variables.
    ///
    /// Missing credentials only produce a warning; upstream calls will then
    /// fail and show up as unavailable providers.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let credential = |name: &str| {
            var(name).unwrap_or_else(|| {
                warn!(variable = name, "not set, calls to this provider will fail");
                String::new()
            })
        };

        let mut gds = GdsConfig::new(credential("GDS_USERNAME"), credential("GDS_PASSWORD"));
        if let Some(url) = var("GDS_URL") {
            gds = gds.with_base_url(url);
        }

        let mut paybilet = PaybiletConfig::new(credential("PAYBILET_TOKEN"));
        if let Some(url) = var("PAYBILET_URL") {
            paybilet = paybilet.with_base_url(url);
        }

        let mut aggregator = AggregatorConfig::default();
        if let Some(secs) = parse_secs("SEARCH_TIMEOUT_SECS", var("SEARCH_TIMEOUT_SECS"))? {
            let deadline = Duration::from_secs(secs);
            let call_timeout = aggregator.call_timeout.min(deadline);
            aggregator = aggregator
                .with_search_deadline(deadline)
                .with_call_timeout(call_timeout);
        }

        let sync_interval = parse_secs(
            "STATION_SYNC_INTERVAL_SECS",
            var("STATION_SYNC_INTERVAL_SECS"),
        )?
        .unwrap_or(DEFAULT_SYNC_INTERVAL_SECS);

        let bind = var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind.parse().map_err(|e: std::net::AddrParseError| ConfigError {
            name: "BIND_ADDR",
            value: bind.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            gds,
            paybilet,
            cache: CacheConfig::default(),
            reconciler: ReconcilerConfig::default(),
            aggregator,
            store_path: var("STORE_PATH")
                .unwrap_or_else(|| DEFAULT_STORE_PATH.to_string())
                .into(),
            bind_addr,
            sync_interval: Duration::from_secs(sync_interval),
        })
    }
}

/// Parse a positive number of seconds.
fn parse_secs(name: &'static str, value: Option<String>) -> Result<Option<u64>, ConfigError> {
    let Some(value) = value else {
        return Ok(None);
    };
    match value.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError {
            name,
            value,
            reason: "must be positive".to_string(),
        }),
        Ok(secs) => Ok(Some(secs)),
        Err(e) => Err(ConfigError {
            name,
            value,
            reason: e.to_string(),
        }),
    }
}
