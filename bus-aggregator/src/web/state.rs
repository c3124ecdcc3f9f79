//! Application state for the web layer.

use std::sync::Arc;

use crate::aggregate::Aggregator;
use crate::cache::CachedProvider;
use crate::gds::GdsClient;
use crate::paybilet::PaybiletClient;
use crate::reconcile::ReconcileError;
use crate::store::JsonFileStore;
use crate::sync::{SyncReport, sync_stations};

/// The aggregator as the server runs it.
pub type AppAggregator =
    Aggregator<CachedProvider<GdsClient>, CachedProvider<PaybiletClient>, JsonFileStore>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<AppAggregator>,
}

impl AppState {
    /// Create a new app state.
    pub fn new(aggregator: AppAggregator) -> Self {
        Self {
            aggregator: Arc::new(aggregator),
        }
    }

    /// Sync stations straight from the upstream clients, then drop cached
    /// station lists so the next listing sees the fresh data.
    pub async fn sync(&self) -> Result<SyncReport, ReconcileError> {
        let aggregator = &self.aggregator;
        let report = sync_stations(
            aggregator.gds().client(),
            aggregator.paybilet().client(),
            aggregator.reconciler(),
        )
        .await?;
        aggregator.gds().invalidate_all();
        aggregator.paybilet().invalidate_all();
        Ok(report)
    }
}
