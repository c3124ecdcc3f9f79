use std::error::Error;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bus_aggregator::aggregate::Aggregator;
use bus_aggregator::cache::CachedProvider;
use bus_aggregator::config::AppConfig;
use bus_aggregator::gds::GdsClient;
use bus_aggregator::paybilet::PaybiletClient;
use bus_aggregator::reconcile::Reconciler;
use bus_aggregator::store::JsonFileStore;
use bus_aggregator::web::{AppState, create_router};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    let gds = CachedProvider::new(GdsClient::new(config.gds.clone())?, &config.cache);
    let paybilet =
        CachedProvider::new(PaybiletClient::new(config.paybilet.clone())?, &config.cache);

    let store = JsonFileStore::open(config.store_path.clone()).await?;
    info!(path = %store.path().display(), "store loaded");

    let reconciler = Reconciler::new(Arc::new(store), config.reconciler.clone());
    let state = AppState::new(Aggregator::new(
        gds,
        paybilet,
        reconciler,
        config.aggregator.clone(),
    ));

    // Serve with whatever the store already holds if the first sync fails.
    match state.sync().await {
        Ok(report) => info!(?report, "initial station sync finished"),
        Err(e) => warn!(error = %e, "initial station sync failed"),
    }

    let sync_state = state.clone();
    let sync_interval = config.sync_interval;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sync_interval);
        interval.tick().await; // First tick is immediate, skip it
        loop {
            interval.tick().await;
            if let Err(e) = sync_state.sync().await {
                warn!(error = %e, "station sync failed");
            }
        }
    });

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "bus aggregator listening");
    axum::serve(listener, app).await?;
    Ok(())
}
