//! Persistence gateway for stations, mappings, and groups.
//!
//! The reconciler and the sync job only ever see [`StationStore`]. Two
//! implementations ship: [`MemoryStore`] for tests and ephemeral runs, and
//! [`JsonFileStore`], which keeps the same state on disk as a JSON snapshot.
//!
//! Writes are append-or-fail: uniqueness checks run under the store's write
//! lock at insert time, so two concurrent callers can never both create the
//! same mapping.

mod error;
mod file;
mod memory;
mod state;

use std::future::Future;

use serde::Serialize;

use crate::domain::{
    GroupId, GroupPatch, MappingId, MappingPatch, NewGroup, NewMapping, Provider, Station,
    StationGroup, StationMapping,
};

pub use error::StoreError;
pub use file::JsonFileStore;
pub use memory::MemoryStore;

/// What `save_station` did with the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveOutcome {
    Created,
    Updated,
    /// Identical to the stored record; nothing was written.
    Unchanged,
}

/// Storage for reconciliation state.
///
/// Implementations are shared between request handlers and the sync task,
/// so every returned future is `Send`.
pub trait StationStore: Send + Sync {
    /// Stored stations, optionally restricted to one provider, ordered by id.
    fn load_stations(
        &self,
        provider: Option<Provider>,
    ) -> impl Future<Output = Result<Vec<Station>, StoreError>> + Send;

    /// Insert a station, or update it in place if its id is already known.
    fn save_station(
        &self,
        station: Station,
    ) -> impl Future<Output = Result<SaveOutcome, StoreError>> + Send;

    /// Upsert a whole batch in one write. Outcomes are in input order; on
    /// error nothing from the batch is kept.
    fn save_stations(
        &self,
        stations: Vec<Station>,
    ) -> impl Future<Output = Result<Vec<SaveOutcome>, StoreError>> + Send;

    fn load_mappings(&self) -> impl Future<Output = Result<Vec<StationMapping>, StoreError>> + Send;

    /// Persist a new mapping.
    ///
    /// Fails with [`StoreError::DuplicateMapping`] if an active mapping already
    /// links the same pair, or if the new mapping is manual and an active
    /// manual mapping already involves either of its stations.
    fn save_mapping(
        &self,
        mapping: NewMapping,
    ) -> impl Future<Output = Result<StationMapping, StoreError>> + Send;

    fn update_mapping(
        &self,
        id: MappingId,
        patch: MappingPatch,
    ) -> impl Future<Output = Result<StationMapping, StoreError>> + Send;

    fn load_groups(&self) -> impl Future<Output = Result<Vec<StationGroup>, StoreError>> + Send;

    /// Persist a new group. Fails if any member is already in an active group.
    fn save_group(
        &self,
        group: NewGroup,
    ) -> impl Future<Output = Result<StationGroup, StoreError>> + Send;

    fn update_group(
        &self,
        id: GroupId,
        patch: GroupPatch,
    ) -> impl Future<Output = Result<StationGroup, StoreError>> + Send;
}
