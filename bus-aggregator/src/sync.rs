//! Station sync.
//!
//! Pulls every provider's station list into the store, then runs the
//! automatic reconciliation pass so newly seen stations get mapped.

use serde::Serialize;
use tracing::{info, warn};

use crate::domain::Provider;
use crate::provider::RouteProvider;
use crate::reconcile::{ReconcileError, ReconcileReport, Reconciler};
use crate::store::{SaveOutcome, StationStore};

/// What a sync did with one provider's stations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderSync {
    pub provider: Provider,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Stations lost because the store refused the batch.
    pub failed: usize,
    /// Set when the station list could not be fetched at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProviderSync {
    fn new(provider: Provider) -> Self {
        Self {
            provider,
            created: 0,
            updated: 0,
            unchanged: 0,
            failed: 0,
            error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub providers: Vec<ProviderSync>,
    /// Absent when no provider could be synced.
    pub reconciliation: Option<ReconcileReport>,
}

/// Copy one provider's stations into the store in a single write.
///
/// If the store refuses the batch, every station is counted as failed and
/// nothing from it is kept.
pub async fn sync_provider<P, S>(provider: &P, store: &S) -> ProviderSync
where
    P: RouteProvider,
    S: StationStore,
{
    let mut report = ProviderSync::new(provider.provider());

    let stations = match provider.list_stations().await {
        Ok(stations) => stations,
        Err(e) => {
            warn!(provider = %report.provider, error = %e, "station sync failed");
            report.error = Some(e.to_string());
            return report;
        }
    };

    let count = stations.len();
    match store.save_stations(stations).await {
        Ok(outcomes) => {
            for outcome in outcomes {
                match outcome {
                    SaveOutcome::Created => report.created += 1,
                    SaveOutcome::Updated => report.updated += 1,
                    SaveOutcome::Unchanged => report.unchanged += 1,
                }
            }
        }
        Err(e) => {
            warn!(provider = %report.provider, error = %e, "failed to store stations");
            report.failed = count;
        }
    }

    info!(
        provider = %report.provider,
        created = report.created,
        updated = report.updated,
        unchanged = report.unchanged,
        failed = report.failed,
        "stations synced"
    );
    report
}

/// Sync both providers concurrently, then reconcile.
pub async fn sync_stations<G, P, S>(
    gds: &G,
    paybilet: &P,
    reconciler: &Reconciler<S>,
) -> Result<SyncReport, ReconcileError>
where
    G: RouteProvider,
    P: RouteProvider,
    S: StationStore,
{
    let store = reconciler.store();
    let (gds, paybilet) = tokio::join!(sync_provider(gds, store), sync_provider(paybilet, store));

    let reconciliation = if gds.error.is_none() || paybilet.error.is_none() {
        Some(reconciler.run_automatic_reconciliation().await?)
    } else {
        warn!("no provider could be synced, skipping reconciliation");
        None
    };

    Ok(SyncReport {
        providers: vec![gds, paybilet],
        reconciliation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Route, Station};
    use crate::provider::{ConnStatus, ProviderError, RouteQuery};
    use crate::reconcile::ReconcilerConfig;
    use crate::store::{JsonFileStore, MemoryStore};
    use std::sync::{Arc, Mutex};
    use std::time::Instant;

    /// Serves a station list that tests can swap between syncs.
    struct StationSource {
        provider: Provider,
        stations: Mutex<Option<Vec<Station>>>,
    }

    impl StationSource {
        fn new(provider: Provider, stations: &[(&str, &str)]) -> Self {
            Self {
                provider,
                stations: Mutex::new(Some(
                    stations
                        .iter()
                        .map(|(id, name)| Station::new(provider, *id, *name))
                        .collect(),
                )),
            }
        }

        fn down(provider: Provider) -> Self {
            Self {
                provider,
                stations: Mutex::new(None),
            }
        }
    }

    impl RouteProvider for StationSource {
        fn provider(&self) -> Provider {
            self.provider
        }

        async fn list_stations(&self) -> Result<Vec<Station>, ProviderError> {
            self.stations
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| ProviderError::unavailable(self.provider, "down"))
        }

        async fn list_destinations_from(&self, _: &str) -> Result<Vec<Station>, ProviderError> {
            Ok(Vec::new())
        }

        async fn search_routes(&self, _: &RouteQuery) -> Result<Vec<Route>, ProviderError> {
            Ok(Vec::new())
        }

        async fn get_route_detail(&self, id: &str) -> Result<Route, ProviderError> {
            Err(ProviderError::not_found(self.provider, id))
        }

        async fn test_connection(&self) -> ConnStatus {
            ConnStatus::reachable_since(Instant::now())
        }
    }

    fn reconciler() -> Reconciler<MemoryStore> {
        Reconciler::new(Arc::new(MemoryStore::new()), ReconcilerConfig::default())
    }

    #[tokio::test]
    async fn sync_stores_and_reconciles() {
        let gds = StationSource::new(Provider::Gds, &[("1", "Южно-Сахалинск"), ("2", "Оха")]);
        let paybilet = StationSource::new(Provider::Paybilet, &[("77", "южно сахалинск")]);
        let reconciler = reconciler();

        let report = sync_stations(&gds, &paybilet, &reconciler).await.unwrap();

        assert_eq!(report.providers[0].created, 2);
        assert_eq!(report.providers[1].created, 1);
        assert_eq!(report.reconciliation.unwrap().created, 1);
        assert_eq!(reconciler.store().load_stations(None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn resync_updates_in_place() {
        let gds = StationSource::new(Provider::Gds, &[("1", "Южно-Сахалинск"), ("2", "Оха")]);
        let paybilet = StationSource::new(Provider::Paybilet, &[("77", "южно сахалинск")]);
        let reconciler = reconciler();
        sync_stations(&gds, &paybilet, &reconciler).await.unwrap();

        *gds.stations.lock().unwrap() = Some(vec![
            Station::new(Provider::Gds, "1", "Южно-Сахалинск"),
            Station::new(Provider::Gds, "2", "Оха АВ"),
        ]);
        let report = sync_stations(&gds, &paybilet, &reconciler).await.unwrap();

        assert_eq!(report.providers[0].created, 0);
        assert_eq!(report.providers[0].updated, 1);
        assert_eq!(report.providers[0].unchanged, 1);
        assert_eq!(report.reconciliation.unwrap().created, 0);

        let stations = reconciler.store().load_stations(Some(Provider::Gds)).await.unwrap();
        assert_eq!(stations.len(), 2);
        assert_eq!(stations[1].name, "Оха АВ");
    }

    #[tokio::test]
    async fn one_provider_down_still_syncs_the_other() {
        let gds = StationSource::down(Provider::Gds);
        let paybilet = StationSource::new(Provider::Paybilet, &[("77", "южно сахалинск")]);
        let reconciler = reconciler();

        let report = sync_stations(&gds, &paybilet, &reconciler).await.unwrap();

        assert!(report.providers[0].error.is_some());
        assert_eq!(report.providers[1].created, 1);
        assert!(report.reconciliation.is_some());
    }

    #[tokio::test]
    async fn both_down_skips_reconciliation() {
        let report = sync_stations(
            &StationSource::down(Provider::Gds),
            &StationSource::down(Provider::Paybilet),
            &reconciler(),
        )
        .await
        .unwrap();

        assert!(report.reconciliation.is_none());
    }

    #[tokio::test]
    async fn refused_batch_counts_every_station_as_failed() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let store = JsonFileStore::open(blocker.join("store.json")).await.unwrap();
        let reconciler = Reconciler::new(Arc::new(store), ReconcilerConfig::default());

        let gds = StationSource::new(Provider::Gds, &[("1", "Южно-Сахалинск"), ("2", "Оха")]);
        let paybilet = StationSource::new(Provider::Paybilet, &[("77", "южно сахалинск")]);
        let report = sync_stations(&gds, &paybilet, &reconciler).await.unwrap();

        assert_eq!(report.providers[0].failed, 2);
        assert_eq!(report.providers[0].created, 0);
        assert_eq!(report.providers[1].failed, 1);
        assert!(reconciler.store().load_stations(None).await.unwrap().is_empty());
        assert_eq!(report.reconciliation.unwrap().created, 0);
    }
}
