//! JSON snapshot store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::domain::{
    GroupId, GroupPatch, MappingId, MappingPatch, NewGroup, NewMapping, Provider, Station,
    StationGroup, StationMapping,
};

use super::state::{Snapshot, StoreState};
use super::{SaveOutcome, StationStore, StoreError};

/// Store backed by a single JSON file.
///
/// The whole state is held in memory and the file is rewritten after every
/// write that changes it. The new snapshot goes to a sibling temp file first
/// and is renamed over the old one, so a crash mid-write leaves the previous
/// snapshot intact.
///
/// A change is made on a copy of the state and only becomes visible once
/// the file has been written, so a failed write leaves the store as it was.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    inner: Arc<RwLock<StoreState>>,
    path: PathBuf,
}

impl JsonFileStore {
    /// Open the store at `path`, loading an existing snapshot if present.
    ///
    /// A missing file yields an empty store; an unreadable one is an error.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let state = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => {
                let snapshot: Snapshot =
                    serde_json::from_str(&contents).map_err(|e| StoreError::Corrupt {
                        message: format!("{}: {}", path.display(), e),
                    })?;
                StoreState::from_snapshot(snapshot)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no store snapshot yet, starting empty");
                StoreState::default()
            }
            Err(e) => {
                return Err(StoreError::Io {
                    message: format!("failed to read {}: {}", path.display(), e),
                });
            }
        };

        Ok(Self {
            inner: Arc::new(RwLock::new(state)),
            path,
        })
    }

    /// Get the snapshot file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, state: &StoreState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Io {
                    message: format!("failed to create store directory: {}", e),
                })?;
        }

        let json = serde_json::to_vec(&state.to_snapshot()).map_err(|e| StoreError::Io {
            message: format!("failed to serialize snapshot: {}", e),
        })?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| StoreError::Io {
                message: format!("failed to write {}: {}", tmp.display(), e),
            })?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::Io {
                message: format!("failed to replace {}: {}", self.path.display(), e),
            })?;

        debug!(path = %self.path.display(), bytes = json.len(), "store snapshot written");
        Ok(())
    }

    /// Apply `change` to a copy of the state, persist the copy if `change`
    /// reports that it modified anything, then publish it.
    async fn apply<T>(
        &self,
        change: impl FnOnce(&mut StoreState) -> Result<(T, bool), StoreError>,
    ) -> Result<T, StoreError> {
        let mut state = self.inner.write().await;
        let mut next = state.clone();
        let (value, changed) = change(&mut next)?;
        if changed {
            self.persist(&next).await?;
            *state = next;
        }
        Ok(value)
    }
}

impl StationStore for JsonFileStore {
    async fn load_stations(&self, provider: Option<Provider>) -> Result<Vec<Station>, StoreError> {
        Ok(self.inner.read().await.stations(provider))
    }

    async fn save_station(&self, station: Station) -> Result<SaveOutcome, StoreError> {
        self.apply(|state| {
            let outcome = state.upsert_station(station);
            Ok((outcome, outcome != SaveOutcome::Unchanged))
        })
        .await
    }

    async fn save_stations(&self, stations: Vec<Station>) -> Result<Vec<SaveOutcome>, StoreError> {
        self.apply(|state| {
            let outcomes = state.upsert_stations(stations);
            let changed = outcomes.iter().any(|o| *o != SaveOutcome::Unchanged);
            Ok((outcomes, changed))
        })
        .await
    }

    async fn load_mappings(&self) -> Result<Vec<StationMapping>, StoreError> {
        Ok(self.inner.read().await.mappings())
    }

    async fn save_mapping(&self, mapping: NewMapping) -> Result<StationMapping, StoreError> {
        self.apply(|state| Ok((state.insert_mapping(mapping)?, true)))
            .await
    }

    async fn update_mapping(
        &self,
        id: MappingId,
        patch: MappingPatch,
    ) -> Result<StationMapping, StoreError> {
        self.apply(|state| Ok((state.patch_mapping(id, patch)?, true)))
            .await
    }

    async fn load_groups(&self) -> Result<Vec<StationGroup>, StoreError> {
        Ok(self.inner.read().await.groups())
    }

    async fn save_group(&self, group: NewGroup) -> Result<StationGroup, StoreError> {
        self.apply(|state| Ok((state.insert_group(group)?, true)))
            .await
    }

    async fn update_group(
        &self,
        id: GroupId,
        patch: GroupPatch,
    ) -> Result<StationGroup, StoreError> {
        self.apply(|state| Ok((state.patch_group(id, patch)?, true)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MappingOrigin;
    use tempfile::tempdir;

    #[tokio::test]
    async fn reopen_restores_state() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        let gds = Station::new(Provider::Gds, "1", "Южно-Сахалинск");
        let pb = Station::new(Provider::Paybilet, "77", "южно сахалинск");
        store.save_station(gds.clone()).await.unwrap();
        store.save_station(pb.clone()).await.unwrap();
        let mapping = store
            .save_mapping(NewMapping::link(
                gds.to_ref(),
                pb.to_ref(),
                1.0,
                MappingOrigin::Automatic,
            ))
            .await
            .unwrap();

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(reopened.load_stations(None).await.unwrap().len(), 2);
        assert_eq!(reopened.load_mappings().await.unwrap(), vec![mapping]);

        // The id sequence continues where the previous process left off.
        let group = reopened
            .save_group(NewGroup {
                name: "Южно-Сахалинск".into(),
                primary_station: gds.to_ref(),
                member_stations: vec![gds.to_ref(), pb.to_ref()],
            })
            .await
            .unwrap();
        assert_eq!(group.id, GroupId(1));
    }

    #[tokio::test]
    async fn missing_file_starts_empty() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("absent.json"))
            .await
            .unwrap();
        assert!(store.load_stations(None).await.unwrap().is_empty());
        assert!(store.load_groups().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = JsonFileStore::open(&path).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("dir").join("store.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        store
            .save_station(Station::new(Provider::Gds, "5", "Холмск"))
            .await
            .unwrap();
        assert!(path.exists());
        assert_eq!(store.path(), path.as_path());
    }

    #[tokio::test]
    async fn rejected_write_leaves_file_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = JsonFileStore::open(&path).await.unwrap();

        let a = Station::new(Provider::Gds, "1", "A").to_ref();
        let b = Station::new(Provider::Paybilet, "2", "A").to_ref();
        let link = NewMapping::link(a, b, 1.0, MappingOrigin::Manual);
        store.save_mapping(link.clone()).await.unwrap();
        let before = std::fs::read_to_string(&path).unwrap();

        assert!(matches!(
            store.save_mapping(link).await,
            Err(StoreError::DuplicateMapping { .. })
        ));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }

    /// Store path whose parent directory cannot be created.
    fn blocked_path(dir: &tempfile::TempDir) -> (PathBuf, PathBuf) {
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "a file, not a directory").unwrap();
        (blocker.clone(), blocker.join("store.json"))
    }

    #[tokio::test]
    async fn failed_write_leaves_state_unchanged() {
        let dir = tempdir().unwrap();
        let (blocker, path) = blocked_path(&dir);
        let store = JsonFileStore::open(&path).await.unwrap();

        let a = Station::new(Provider::Gds, "1", "Холмск");
        let b = Station::new(Provider::Paybilet, "9", "Холмск");
        let link = NewMapping::link(a.to_ref(), b.to_ref(), 1.0, MappingOrigin::Manual);

        assert!(matches!(
            store.save_station(a.clone()).await,
            Err(StoreError::Io { .. })
        ));
        assert!(matches!(
            store.save_mapping(link.clone()).await,
            Err(StoreError::Io { .. })
        ));
        assert!(store.load_stations(None).await.unwrap().is_empty());
        assert!(store.load_mappings().await.unwrap().is_empty());

        // Once the directory can be created the same write goes through,
        // with the id the failed attempt would have used.
        std::fs::remove_file(&blocker).unwrap();
        let mapping = store.save_mapping(link).await.unwrap();
        assert_eq!(mapping.id, MappingId(1));
        assert_eq!(store.load_mappings().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_group_update_keeps_old_group() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = JsonFileStore::open(&path).await.unwrap();
        let gds = Station::new(Provider::Gds, "1", "Оха").to_ref();
        let group = store
            .save_group(NewGroup {
                name: "Оха".into(),
                primary_station: gds.clone(),
                member_stations: vec![gds],
            })
            .await
            .unwrap();

        // A directory where the snapshot lives makes the final rename fail.
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        let patch = GroupPatch {
            name: Some("Оха АВ".into()),
            ..Default::default()
        };
        assert!(store.update_group(group.id, patch).await.is_err());
        assert_eq!(store.load_groups().await.unwrap()[0].name, "Оха");
    }

    #[tokio::test]
    async fn batch_save_reports_each_station() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = JsonFileStore::open(&path).await.unwrap();
        store
            .save_station(Station::new(Provider::Gds, "1", "Оха"))
            .await
            .unwrap();
        store
            .save_station(Station::new(Provider::Gds, "2", "Ноглики"))
            .await
            .unwrap();

        let outcomes = store
            .save_stations(vec![
                Station::new(Provider::Gds, "1", "Оха"),
                Station::new(Provider::Gds, "2", "Ноглики АВ"),
                Station::new(Provider::Gds, "3", "Тымовское"),
            ])
            .await
            .unwrap();
        assert_eq!(
            outcomes,
            vec![
                SaveOutcome::Unchanged,
                SaveOutcome::Updated,
                SaveOutcome::Created
            ]
        );

        let reopened = JsonFileStore::open(&path).await.unwrap();
        let stations = reopened.load_stations(None).await.unwrap();
        assert_eq!(stations.len(), 3);
        assert_eq!(stations[1].name, "Ноглики АВ");
    }

    #[tokio::test]
    async fn unchanged_batch_does_not_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = JsonFileStore::open(&path).await.unwrap();
        let stations = vec![
            Station::new(Provider::Paybilet, "77", "южно сахалинск"),
            Station::new(Provider::Paybilet, "78", "Холмск"),
        ];
        store.save_stations(stations.clone()).await.unwrap();

        std::fs::remove_file(&path).unwrap();
        let outcomes = store.save_stations(stations).await.unwrap();

        assert!(outcomes.iter().all(|o| *o == SaveOutcome::Unchanged));
        assert!(!path.exists());
    }
}
