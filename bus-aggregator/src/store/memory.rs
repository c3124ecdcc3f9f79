//! In-memory store.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::domain::{
    GroupId, GroupPatch, MappingId, MappingPatch, NewGroup, NewMapping, Provider, Station,
    StationGroup, StationMapping,
};

use super::state::StoreState;
use super::{SaveOutcome, StationStore, StoreError};

/// Thread-safe store that lives only as long as the process.
///
/// Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<StoreState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StationStore for MemoryStore {
    async fn load_stations(&self, provider: Option<Provider>) -> Result<Vec<Station>, StoreError> {
        Ok(self.inner.read().await.stations(provider))
    }

    async fn save_station(&self, station: Station) -> Result<SaveOutcome, StoreError> {
        Ok(self.inner.write().await.upsert_station(station))
    }

    async fn save_stations(&self, stations: Vec<Station>) -> Result<Vec<SaveOutcome>, StoreError> {
        Ok(self.inner.write().await.upsert_stations(stations))
    }

    async fn load_mappings(&self) -> Result<Vec<StationMapping>, StoreError> {
        Ok(self.inner.read().await.mappings())
    }

    async fn save_mapping(&self, mapping: NewMapping) -> Result<StationMapping, StoreError> {
        self.inner.write().await.insert_mapping(mapping)
    }

    async fn update_mapping(
        &self,
        id: MappingId,
        patch: MappingPatch,
    ) -> Result<StationMapping, StoreError> {
        self.inner.write().await.patch_mapping(id, patch)
    }

    async fn load_groups(&self) -> Result<Vec<StationGroup>, StoreError> {
        Ok(self.inner.read().await.groups())
    }

    async fn save_group(&self, group: NewGroup) -> Result<StationGroup, StoreError> {
        self.inner.write().await.insert_group(group)
    }

    async fn update_group(
        &self,
        id: GroupId,
        patch: GroupPatch,
    ) -> Result<StationGroup, StoreError> {
        self.inner.write().await.patch_group(id, patch)
    }
}
