//! Caching layer for provider responses.
//!
//! Station lists change rarely and route searches are repeated often while a
//! user refines a query, so both are cached with a TTL. Route details and
//! connection checks always go upstream: seat counts on a single route must
//! be fresh, and a cached check would be meaningless.
//!
//! Only successful responses are cached; a failure is retried on the next
//! call.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache as MokaCache;
use tracing::debug;

use crate::domain::{Provider, Route, Station};
use crate::provider::{ConnStatus, ProviderError, RouteProvider, RouteQuery};

/// Cache key for station lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum StationKey {
    All,
    DestinationsFrom(String),
}

/// Configuration for the cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for route search results.
    pub route_ttl: Duration,

    /// TTL for station lists.
    pub station_ttl: Duration,

    /// Maximum number of cached entries, per kind.
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            route_ttl: Duration::from_secs(60),
            station_ttl: Duration::from_secs(60 * 60),
            max_capacity: 1000,
        }
    }
}

/// A provider client with caching.
///
/// Implements [`RouteProvider`] itself, so it can stand in for the client
/// it wraps.
pub struct CachedProvider<P> {
    inner: P,
    stations: MokaCache<StationKey, Arc<Vec<Station>>>,
    routes: MokaCache<RouteQuery, Arc<Vec<Route>>>,
}

impl<P: RouteProvider> CachedProvider<P> {
    /// Create a new cached client.
    pub fn new(inner: P, config: &CacheConfig) -> Self {
        let stations = MokaCache::builder()
            .time_to_live(config.station_ttl)
            .max_capacity(config.max_capacity)
            .build();
        let routes = MokaCache::builder()
            .time_to_live(config.route_ttl)
            .max_capacity(config.max_capacity)
            .build();

        Self {
            inner,
            stations,
            routes,
        }
    }

    /// Access the underlying client for operations that bypass cache.
    pub fn client(&self) -> &P {
        &self.inner
    }

    /// Invalidate all cached entries.
    pub fn invalidate_all(&self) {
        self.stations.invalidate_all();
        self.routes.invalidate_all();
    }

    async fn stations_cached(
        &self,
        key: StationKey,
        fetch: impl Future<Output = Result<Vec<Station>, ProviderError>>,
    ) -> Result<Vec<Station>, ProviderError> {
        if let Some(cached) = self.stations.get(&key).await {
            debug!(provider = %self.inner.provider(), ?key, "station cache hit");
            return Ok(cached.as_ref().clone());
        }

        let stations = fetch.await?;
        self.stations.insert(key, Arc::new(stations.clone())).await;
        Ok(stations)
    }
}

impl<P: RouteProvider> RouteProvider for CachedProvider<P> {
    fn provider(&self) -> Provider {
        self.inner.provider()
    }

    async fn list_stations(&self) -> Result<Vec<Station>, ProviderError> {
        self.stations_cached(StationKey::All, self.inner.list_stations())
            .await
    }

    async fn list_destinations_from(&self, native_id: &str) -> Result<Vec<Station>, ProviderError> {
        self.stations_cached(
            StationKey::DestinationsFrom(native_id.to_string()),
            self.inner.list_destinations_from(native_id),
        )
        .await
    }

    async fn search_routes(&self, query: &RouteQuery) -> Result<Vec<Route>, ProviderError> {
        if let Some(cached) = self.routes.get(query).await {
            debug!(provider = %self.inner.provider(), from = %query.from, to = %query.to, "route cache hit");
            return Ok(cached.as_ref().clone());
        }

        let routes = self.inner.search_routes(query).await?;
        self.routes
            .insert(query.clone(), Arc::new(routes.clone()))
            .await;
        Ok(routes)
    }

    async fn get_route_detail(&self, native_id: &str) -> Result<Route, ProviderError> {
        self.inner.get_route_detail(native_id).await
    }

    async fn test_connection(&self) -> ConnStatus {
        self.inner.test_connection().await
    }
}
