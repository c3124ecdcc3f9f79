//! In-process store state shared by the memory and file stores.
//!
//! All invariant checks live here so both stores enforce them identically
//! while holding their write lock.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{
    GroupId, GroupPatch, MappingId, MappingOrigin, MappingPatch, NewGroup, NewMapping, Provider,
    Station, StationGroup, StationId, StationMapping, StationRef,
};

use super::{SaveOutcome, StoreError};

#[derive(Debug, Clone, Default)]
pub(super) struct StoreState {
    stations: BTreeMap<StationId, Station>,
    mappings: Vec<StationMapping>,
    groups: Vec<StationGroup>,
    next_mapping_id: u64,
    next_group_id: u64,
}

/// On-disk form of [`StoreState`].
#[derive(Debug, Default, Serialize, Deserialize)]
pub(super) struct Snapshot {
    #[serde(default)]
    stations: Vec<Station>,
    #[serde(default)]
    mappings: Vec<StationMapping>,
    #[serde(default)]
    groups: Vec<StationGroup>,
}

impl StoreState {
    pub(super) fn from_snapshot(snapshot: Snapshot) -> Self {
        // Ids are never reused, even for records written by an older process.
        let next_mapping_id = snapshot.mappings.iter().map(|m| m.id.0).max().unwrap_or(0);
        let next_group_id = snapshot.groups.iter().map(|g| g.id.0).max().unwrap_or(0);

        Self {
            stations: snapshot
                .stations
                .into_iter()
                .map(|s| (s.id.clone(), s))
                .collect(),
            mappings: snapshot.mappings,
            groups: snapshot.groups,
            next_mapping_id,
            next_group_id,
        }
    }

    pub(super) fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            stations: self.stations.values().cloned().collect(),
            mappings: self.mappings.clone(),
            groups: self.groups.clone(),
        }
    }

    pub(super) fn stations(&self, provider: Option<Provider>) -> Vec<Station> {
        self.stations
            .values()
            .filter(|s| provider.is_none_or(|p| s.provider == p))
            .cloned()
            .collect()
    }

    pub(super) fn upsert_station(&mut self, station: Station) -> SaveOutcome {
        match self.stations.get(&station.id) {
            Some(existing) if *existing == station => SaveOutcome::Unchanged,
            Some(_) => {
                self.stations.insert(station.id.clone(), station);
                SaveOutcome::Updated
            }
            None => {
                self.stations.insert(station.id.clone(), station);
                SaveOutcome::Created
            }
        }
    }

    pub(super) fn upsert_stations(&mut self, stations: Vec<Station>) -> Vec<SaveOutcome> {
        stations
            .into_iter()
            .map(|station| self.upsert_station(station))
            .collect()
    }

    pub(super) fn mappings(&self) -> Vec<StationMapping> {
        self.mappings.clone()
    }

    pub(super) fn insert_mapping(
        &mut self,
        new: NewMapping,
    ) -> Result<StationMapping, StoreError> {
        let a = new.station_a.as_ref().map(|s| &s.id);
        let b = new.station_b.as_ref().map(|s| &s.id);

        if let Some(existing) = self
            .mappings
            .iter()
            .filter(|m| m.is_active)
            .find(|m| m.links_pair(a, b))
        {
            return Err(StoreError::DuplicateMapping {
                existing: existing.id,
            });
        }

        if new.origin == MappingOrigin::Manual {
            let sides: Vec<&StationId> = a.into_iter().chain(b).collect();
            if let Some(existing) = self
                .mappings
                .iter()
                .filter(|m| m.is_active && m.is_manual())
                .find(|m| sides.iter().any(|id| m.involves(id)))
            {
                return Err(StoreError::DuplicateMapping {
                    existing: existing.id,
                });
            }
        }

        self.next_mapping_id += 1;
        let mapping = StationMapping::from_new(MappingId(self.next_mapping_id), new);
        self.mappings.push(mapping.clone());
        Ok(mapping)
    }

    pub(super) fn patch_mapping(
        &mut self,
        id: MappingId,
        patch: MappingPatch,
    ) -> Result<StationMapping, StoreError> {
        let mapping = self
            .mappings
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(StoreError::MappingNotFound(id))?;

        if let Some(primary) = patch.is_primary_in_group {
            mapping.is_primary_in_group = primary;
        }
        if let Some(active) = patch.is_active {
            mapping.is_active = active;
        }
        if let Some(name) = patch.display_name {
            mapping.display_name = name;
        }
        Ok(mapping.clone())
    }

    pub(super) fn groups(&self) -> Vec<StationGroup> {
        self.groups.clone()
    }

    pub(super) fn insert_group(&mut self, new: NewGroup) -> Result<StationGroup, StoreError> {
        self.check_ungrouped(&new.member_stations, None)?;

        self.next_group_id += 1;
        let group = StationGroup::from_new(GroupId(self.next_group_id), new);
        self.groups.push(group.clone());
        Ok(group)
    }

    pub(super) fn patch_group(
        &mut self,
        id: GroupId,
        patch: GroupPatch,
    ) -> Result<StationGroup, StoreError> {
        if !self.groups.iter().any(|g| g.id == id) {
            return Err(StoreError::GroupNotFound(id));
        }
        if let Some(members) = &patch.member_stations {
            self.check_ungrouped(members, Some(id))?;
        }

        let group = self
            .groups
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or(StoreError::GroupNotFound(id))?;

        if let Some(name) = patch.name {
            group.name = name;
        }
        if let Some(primary) = patch.primary_station {
            group.primary_station = primary;
        }
        if let Some(members) = patch.member_stations {
            group.member_stations = members;
        }
        if let Some(active) = patch.is_active {
            group.is_active = active;
        }
        Ok(group.clone())
    }

    /// A station may belong to at most one active group.
    fn check_ungrouped(
        &self,
        members: &[StationRef],
        except: Option<GroupId>,
    ) -> Result<(), StoreError> {
        for member in members {
            if let Some(group) = self
                .groups
                .iter()
                .filter(|g| g.is_active && Some(g.id) != except)
                .find(|g| g.contains(&member.id))
            {
                return Err(StoreError::StationAlreadyGrouped {
                    station: member.id.clone(),
                    group: group.id,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gds(id: &str, name: &str) -> StationRef {
        Station::new(Provider::Gds, id, name).to_ref()
    }

    fn pb(id: &str, name: &str) -> StationRef {
        Station::new(Provider::Paybilet, id, name).to_ref()
    }

    #[test]
    fn upsert_reports_outcome() {
        let mut state = StoreState::default();
        let station = Station::new(Provider::Gds, "1", "Холмск");
        assert_eq!(state.upsert_station(station.clone()), SaveOutcome::Created);
        assert_eq!(state.upsert_station(station.clone()), SaveOutcome::Unchanged);
        assert_eq!(
            state.upsert_station(station.with_region("Сахалинская обл.")),
            SaveOutcome::Updated
        );
        assert_eq!(state.stations(None).len(), 1);
        assert_eq!(state.stations(Some(Provider::Paybilet)).len(), 0);
    }

    #[test]
    fn same_pair_rejected_while_active() {
        let mut state = StoreState::default();
        let link = NewMapping::link(gds("1", "A"), pb("2", "A"), 1.0, MappingOrigin::Automatic);

        let first = state.insert_mapping(link.clone()).unwrap();
        assert_eq!(
            state.insert_mapping(link.clone()),
            Err(StoreError::DuplicateMapping { existing: first.id })
        );

        // Deactivated mappings no longer block the pair.
        state
            .patch_mapping(
                first.id,
                MappingPatch {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();
        let second = state.insert_mapping(link).unwrap();
        assert_ne!(second.id, first.id);
    }

    #[test]
    fn manual_mapping_blocked_by_manual_on_either_side() {
        let mut state = StoreState::default();
        state
            .insert_mapping(NewMapping::link(gds("1", "A"), pb("2", "A"), 1.0, MappingOrigin::Manual))
            .unwrap();

        let err = state
            .insert_mapping(NewMapping::link(gds("1", "A"), pb("3", "B"), 1.0, MappingOrigin::Manual))
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateMapping { .. }));

        // An automatic mapping on a different pair is still allowed.
        state
            .insert_mapping(NewMapping::link(gds("1", "A"), pb("3", "B"), 0.8, MappingOrigin::Automatic))
            .unwrap();
    }

    #[test]
    fn manual_mapping_supersedes_automatic() {
        let mut state = StoreState::default();
        state
            .insert_mapping(NewMapping::link(gds("1", "A"), pb("2", "A"), 0.8, MappingOrigin::Automatic))
            .unwrap();
        state
            .insert_mapping(NewMapping::link(gds("1", "A"), pb("9", "Z"), 1.0, MappingOrigin::Manual))
            .unwrap();
        assert_eq!(state.mappings().len(), 2);
    }

    #[test]
    fn station_in_one_active_group_only() {
        let mut state = StoreState::default();
        let a = gds("1", "A");
        let group = state
            .insert_group(NewGroup {
                name: "A".into(),
                primary_station: a.clone(),
                member_stations: vec![a.clone()],
            })
            .unwrap();

        let err = state
            .insert_group(NewGroup {
                name: "A again".into(),
                primary_station: a.clone(),
                member_stations: vec![a.clone()],
            })
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::StationAlreadyGrouped {
                station: a.id.clone(),
                group: group.id
            }
        );

        // Updating the group itself with its own member is fine.
        state
            .patch_group(
                group.id,
                GroupPatch {
                    member_stations: Some(vec![a.clone(), pb("2", "A")]),
                    ..Default::default()
                },
            )
            .unwrap();
    }

    #[test]
    fn snapshot_preserves_id_sequence() {
        let mut state = StoreState::default();
        state
            .insert_mapping(NewMapping::partial(gds("1", "A"), MappingOrigin::Manual))
            .unwrap();

        let mut restored = StoreState::from_snapshot(state.to_snapshot());
        let next = restored
            .insert_mapping(NewMapping::partial(pb("2", "B"), MappingOrigin::Manual))
            .unwrap();
        assert_eq!(next.id, MappingId(2));
    }

    #[test]
    fn patching_unknown_ids_fails() {
        let mut state = StoreState::default();
        assert_eq!(
            state.patch_mapping(MappingId(5), MappingPatch::default()),
            Err(StoreError::MappingNotFound(MappingId(5)))
        );
        assert_eq!(
            state.patch_group(GroupId(5), GroupPatch::default()),
            Err(StoreError::GroupNotFound(GroupId(5)))
        );
    }
}
