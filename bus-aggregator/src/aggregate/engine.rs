//! Multi-provider fan-out.

use std::future::Future;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, info, warn};

use crate::domain::{Provider, Route, Station, StationRef, TravelDate};
use crate::provider::{ConnStatus, ProviderError, RouteProvider, RouteQuery};
use crate::reconcile::Reconciler;
use crate::store::StationStore;

use super::error::AggregateError;
use super::merge::{merge_routes, merge_stations};

/// Configuration for the aggregation engine.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Upper bound on any single provider call.
    pub call_timeout: Duration,

    /// Upper bound on a whole search, station resolution included.
    /// Calls still running at this point are abandoned and the search
    /// answers with whatever has completed.
    pub search_deadline: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(10),
            search_deadline: Duration::from_secs(15),
        }
    }
}

impl AggregatorConfig {
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_search_deadline(mut self, deadline: Duration) -> Self {
        self.search_deadline = deadline;
        self
    }
}

/// How one provider fared during a fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderState {
    /// At least one call succeeded.
    Ok,
    /// Every call failed.
    Failed,
    /// Nothing to ask this provider (no resolved stations).
    NotQueried,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderStatus {
    pub provider: Provider,
    pub state: ProviderState,
    pub calls: usize,
    pub failed_calls: usize,
    /// Records returned before merging.
    pub results: usize,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Merged routes plus how each provider fared.
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub routes: Vec<Route>,
    pub statuses: Vec<ProviderStatus>,
}

impl SearchOutcome {
    pub fn status(&self, provider: Provider) -> Option<&ProviderStatus> {
        self.statuses.iter().find(|s| s.provider == provider)
    }
}

/// Merged stations plus how each provider fared.
#[derive(Debug, Clone, Serialize)]
pub struct StationListing {
    pub stations: Vec<Station>,
    pub statuses: Vec<ProviderStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Availability {
    #[serde(rename = "all available")]
    AllAvailable,
    #[serde(rename = "partially available")]
    PartiallyAvailable,
    #[serde(rename = "all unavailable")]
    AllUnavailable,
}

impl Availability {
    fn of(statuses: &[&ConnStatus]) -> Self {
        let reachable = statuses.iter().filter(|s| s.reachable).count();
        if reachable == statuses.len() {
            Availability::AllAvailable
        } else if reachable == 0 {
            Availability::AllUnavailable
        } else {
            Availability::PartiallyAvailable
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionReport {
    pub gds: ConnStatus,
    pub paybilet: ConnStatus,
    pub summary: Availability,
}

/// One provider's share of a fan-out.
struct Gathered<T> {
    items: Vec<T>,
    status: ProviderStatus,
    errors: Vec<ProviderError>,
}

/// Run one provider's calls concurrently, each bounded by `deadline`, and
/// keep whatever succeeded.
async fn gather<T, Fut>(provider: Provider, calls: Vec<Fut>, deadline: Instant) -> Gathered<T>
where
    Fut: Future<Output = Result<Vec<T>, ProviderError>>,
{
    let started = Instant::now();
    let call_count = calls.len();

    let results = join_all(calls.into_iter().map(|call| async move {
        match timeout_at(deadline, call).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::unavailable(provider, "timed out")),
        }
    }))
    .await;

    let mut items = Vec::new();
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(mut batch) => items.append(&mut batch),
            Err(e) => {
                warn!(provider = %provider, error = %e, "provider call failed");
                errors.push(e);
            }
        }
    }

    let state = if call_count == 0 {
        ProviderState::NotQueried
    } else if errors.len() == call_count {
        ProviderState::Failed
    } else {
        ProviderState::Ok
    };

    let status = ProviderStatus {
        provider,
        state,
        calls: call_count,
        failed_calls: errors.len(),
        results: items.len(),
        latency_ms: started.elapsed().as_millis() as u64,
        error: errors.first().map(ToString::to_string),
    };

    Gathered {
        items,
        status,
        errors,
    }
}

/// Fail when every provider that was asked failed.
fn ensure_any_succeeded<T>(gathered: &[&Gathered<T>]) -> Result<(), AggregateError> {
    let attempted: Vec<&&Gathered<T>> = gathered
        .iter()
        .filter(|g| g.status.state != ProviderState::NotQueried)
        .collect();

    if !attempted.is_empty() && attempted.iter().all(|g| g.status.state == ProviderState::Failed) {
        return Err(AggregateError::AllProvidersUnavailable {
            causes: attempted.iter().flat_map(|g| g.errors.clone()).collect(),
        });
    }
    Ok(())
}

/// Native ids of `provider`'s stations among `refs`, deduplicated.
fn native_ids(provider: Provider, refs: &[StationRef]) -> Vec<&str> {
    let mut ids: Vec<&str> = Vec::new();
    for r in refs.iter().filter(|r| r.provider == provider) {
        if !ids.contains(&r.native_id.as_str()) {
            ids.push(&r.native_id);
        }
    }
    ids
}

/// Every origin × destination pair one provider can answer.
fn pair_queries(
    provider: Provider,
    origins: &[StationRef],
    destinations: &[StationRef],
    date: TravelDate,
) -> Vec<RouteQuery> {
    let to_ids = native_ids(provider, destinations);
    native_ids(provider, origins)
        .into_iter()
        .flat_map(|from| {
            to_ids
                .iter()
                .filter(move |to| **to != from)
                .map(move |to| RouteQuery::new(from, *to, date))
        })
        .collect()
}

/// Bound a single call by `limit`.
async fn bounded<T>(
    provider: Provider,
    limit: Duration,
    call: impl Future<Output = Result<T, ProviderError>>,
) -> Result<T, ProviderError> {
    timeout(limit, call)
        .await
        .unwrap_or_else(|_| Err(ProviderError::unavailable(provider, "timed out")))
}

/// Unified façade over both providers.
pub struct Aggregator<G, P, S> {
    gds: G,
    paybilet: P,
    reconciler: Reconciler<S>,
    config: AggregatorConfig,
}

impl<G, P, S> Aggregator<G, P, S>
where
    G: RouteProvider,
    P: RouteProvider,
    S: StationStore,
{
    pub fn new(gds: G, paybilet: P, reconciler: Reconciler<S>, config: AggregatorConfig) -> Self {
        Self {
            gds,
            paybilet,
            reconciler,
            config,
        }
    }

    pub fn gds(&self) -> &G {
        &self.gds
    }

    pub fn paybilet(&self) -> &P {
        &self.paybilet
    }

    pub fn reconciler(&self) -> &Reconciler<S> {
        &self.reconciler
    }

    /// Search both providers for departures between two places on a date.
    ///
    /// `from` and `to` may be station names or station ids; each is resolved
    /// to its equivalent stations on both providers, and every resulting
    /// station pair is queried concurrently. `date` is `DD.MM.YY` or
    /// `YYYY-MM-DD`.
    pub async fn search(
        &self,
        from: &str,
        to: &str,
        date: &str,
    ) -> Result<SearchOutcome, AggregateError> {
        let (from, to) = (from.trim(), to.trim());
        if from.is_empty() || to.is_empty() {
            return Err(AggregateError::InvalidRequest(
                "origin and destination are required".to_string(),
            ));
        }
        let date =
            TravelDate::parse(date).map_err(|e| AggregateError::InvalidRequest(e.to_string()))?;

        let started = Instant::now();
        let search_deadline = started + self.config.search_deadline;

        let origins = self.reconciler.resolve_equivalents(from).await?;
        let destinations = self.reconciler.resolve_equivalents(to).await?;
        debug!(
            from,
            to,
            origins = origins.len(),
            destinations = destinations.len(),
            "stations resolved"
        );

        let gds_queries = pair_queries(Provider::Gds, &origins, &destinations, date);
        let paybilet_queries = pair_queries(Provider::Paybilet, &origins, &destinations, date);

        let deadline = (Instant::now() + self.config.call_timeout).min(search_deadline);
        let (gds, paybilet) = tokio::join!(
            gather(
                Provider::Gds,
                gds_queries.iter().map(|q| self.gds.search_routes(q)).collect(),
                deadline,
            ),
            gather(
                Provider::Paybilet,
                paybilet_queries
                    .iter()
                    .map(|q| self.paybilet.search_routes(q))
                    .collect(),
                deadline,
            ),
        );

        ensure_any_succeeded(&[&gds, &paybilet])?;

        if gds_queries.is_empty() && paybilet_queries.is_empty() {
            info!(from, to, "no stations resolved, nothing to search");
        }

        let statuses = vec![gds.status, paybilet.status];
        let mut routes = gds.items;
        routes.extend(paybilet.items);
        let routes = merge_routes(routes);

        info!(
            from,
            to,
            date = %date,
            routes = routes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "search finished"
        );

        Ok(SearchOutcome { routes, statuses })
    }

    /// Every station known to either provider, deduplicated by name.
    pub async fn get_all_stations(&self) -> Result<StationListing, AggregateError> {
        let deadline = Instant::now() + self.config.call_timeout;
        let (gds, paybilet) = tokio::join!(
            gather(Provider::Gds, vec![self.gds.list_stations()], deadline),
            gather(Provider::Paybilet, vec![self.paybilet.list_stations()], deadline),
        );

        Self::listing(gds, paybilet)
    }

    /// Stations reachable from the given station (name or id) on either
    /// provider.
    pub async fn get_stations_from(&self, station: &str) -> Result<StationListing, AggregateError> {
        let station = station.trim();
        if station.is_empty() {
            return Err(AggregateError::InvalidRequest(
                "station is required".to_string(),
            ));
        }

        let origins = self.reconciler.resolve_equivalents(station).await?;
        let gds_ids = native_ids(Provider::Gds, &origins);
        let paybilet_ids = native_ids(Provider::Paybilet, &origins);

        let deadline = Instant::now() + self.config.call_timeout;
        let (gds, paybilet) = tokio::join!(
            gather(
                Provider::Gds,
                gds_ids
                    .iter()
                    .map(|id| self.gds.list_destinations_from(id))
                    .collect(),
                deadline,
            ),
            gather(
                Provider::Paybilet,
                paybilet_ids
                    .iter()
                    .map(|id| self.paybilet.list_destinations_from(id))
                    .collect(),
                deadline,
            ),
        );

        Self::listing(gds, paybilet)
    }

    fn listing(
        gds: Gathered<Station>,
        paybilet: Gathered<Station>,
    ) -> Result<StationListing, AggregateError> {
        ensure_any_succeeded(&[&gds, &paybilet])?;

        let statuses = vec![gds.status, paybilet.status];
        let mut stations = gds.items;
        stations.extend(paybilet.items);

        Ok(StationListing {
            stations: merge_stations(stations),
            statuses,
        })
    }

    /// Fetch one route.
    ///
    /// The provider comes from `hint`, else from the id's `gds:`/`paybilet:`
    /// prefix; failing both, each provider is asked in fan-out order.
    pub async fn get_route_detail(
        &self,
        route_id: &str,
        hint: Option<Provider>,
    ) -> Result<Route, AggregateError> {
        let route_id = route_id.trim();
        if route_id.is_empty() {
            return Err(AggregateError::InvalidRequest(
                "route id is required".to_string(),
            ));
        }

        let (provider, native_id) = match (hint, Provider::split_prefixed(route_id)) {
            (Some(hinted), Some((prefixed, native))) if hinted == prefixed => (Some(hinted), native),
            (Some(hinted), Some((prefixed, _))) => {
                return Err(AggregateError::InvalidRequest(format!(
                    "route {route_id} belongs to {prefixed}, not {hinted}"
                )));
            }
            (Some(hinted), None) => (Some(hinted), route_id),
            (None, Some((prefixed, native))) => (Some(prefixed), native),
            (None, None) => (None, route_id),
        };

        if let Some(provider) = provider {
            return self
                .detail_from(provider, native_id)
                .await
                .map_err(|e| match e {
                    ProviderError::NotFound { .. } => AggregateError::NotFound(format!("route {route_id}")),
                    unavailable => AggregateError::ProviderUnavailable(unavailable),
                });
        }

        let mut causes = Vec::new();
        for provider in Provider::ALL {
            match self.detail_from(provider, native_id).await {
                Ok(route) => return Ok(route),
                Err(e) => {
                    debug!(provider = %provider, route = route_id, error = %e, "route lookup failed");
                    causes.push(e);
                }
            }
        }

        // NotFound only when every provider answered that it does not know the route.
        match causes.iter().position(|e| !e.is_not_found()) {
            None => Err(AggregateError::NotFound(format!("route {route_id}"))),
            Some(_) if causes.iter().all(|e| !e.is_not_found()) => {
                Err(AggregateError::AllProvidersUnavailable { causes })
            }
            Some(i) => Err(AggregateError::ProviderUnavailable(causes.swap_remove(i))),
        }
    }

    async fn detail_from(&self, provider: Provider, native_id: &str) -> Result<Route, ProviderError> {
        let limit = self.config.call_timeout;
        match provider {
            Provider::Gds => bounded(provider, limit, self.gds.get_route_detail(native_id)).await,
            Provider::Paybilet => {
                bounded(provider, limit, self.paybilet.get_route_detail(native_id)).await
            }
        }
    }

    /// Check both providers concurrently.
    pub async fn test_connections(&self) -> ConnectionReport {
        let limit = self.config.call_timeout;
        let (gds, paybilet) = tokio::join!(
            within(limit, self.gds.test_connection()),
            within(limit, self.paybilet.test_connection()),
        );

        let summary = Availability::of(&[&gds, &paybilet]);
        info!(gds = gds.reachable, paybilet = paybilet.reachable, ?summary, "connection test finished");

        ConnectionReport {
            gds,
            paybilet,
            summary,
        }
    }
}

async fn within(limit: Duration, check: impl Future<Output = ConnStatus>) -> ConnStatus {
    let started = std::time::Instant::now();
    timeout(limit, check)
        .await
        .unwrap_or_else(|_| ConnStatus::unreachable(started, "timed out"))
}
