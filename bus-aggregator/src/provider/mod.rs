//! Contract shared by every upstream provider client.
//!
//! The aggregation engine only ever talks to providers through
//! [`RouteProvider`]. Each implementation is responsible for bounding its
//! calls with a timeout and for turning every upstream failure into a
//! [`ProviderError`].

mod error;

use std::future::Future;
use std::time::Instant;

use serde::Serialize;

use crate::domain::{Provider, Route, Station, TravelDate};

pub use error::ProviderError;

/// Parameters of one provider-level route search.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteQuery {
    /// Provider-native origin station id.
    pub from: String,
    /// Provider-native destination station id.
    pub to: String,
    pub date: TravelDate,
}

impl RouteQuery {
    pub fn new(from: impl Into<String>, to: impl Into<String>, date: TravelDate) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            date,
        }
    }
}

/// Result of probing a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnStatus {
    pub reachable: bool,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConnStatus {
    /// Successful check that started at `started`.
    pub fn reachable_since(started: Instant) -> Self {
        Self {
            reachable: true,
            latency_ms: started.elapsed().as_millis() as u64,
            error: None,
        }
    }

    /// Failed check.
    pub fn unreachable(started: Instant, error: impl Into<String>) -> Self {
        Self {
            reachable: false,
            latency_ms: started.elapsed().as_millis() as u64,
            error: Some(error.into()),
        }
    }
}

/// An upstream source of stations and routes.
///
/// This abstraction allows the engine to be tested with mock providers.
/// Calls are fanned out from request handlers, so every future is `Send`.
pub trait RouteProvider: Send + Sync {
    /// Which upstream this client talks to.
    fn provider(&self) -> Provider;

    /// All stations the provider knows about.
    fn list_stations(&self) -> impl Future<Output = Result<Vec<Station>, ProviderError>> + Send;

    /// Stations reachable from the given provider-native station id.
    fn list_destinations_from(
        &self,
        native_id: &str,
    ) -> impl Future<Output = Result<Vec<Station>, ProviderError>> + Send;

    /// Departures between two provider-native stations on a date.
    fn search_routes(
        &self,
        query: &RouteQuery,
    ) -> impl Future<Output = Result<Vec<Route>, ProviderError>> + Send;

    /// A single route by its provider-native id.
    fn get_route_detail(
        &self,
        native_id: &str,
    ) -> impl Future<Output = Result<Route, ProviderError>> + Send;

    /// Check the upstream. Never fails; failures are reported in the status.
    fn test_connection(&self) -> impl Future<Output = ConnStatus> + Send;
}
