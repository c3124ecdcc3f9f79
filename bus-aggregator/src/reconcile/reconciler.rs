//! Mapping and group lifecycle on top of a [`StationStore`].

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::{
    GroupId, GroupPatch, MappingId, MappingOrigin, MappingPatch, NewGroup, NewMapping, Provider,
    Station, StationGroup, StationId, StationMapping, StationRef,
};
use crate::store::StationStore;

use super::error::ReconcileError;
use super::matcher::{MatchConfidence, propose_mappings};
use super::normalize_name;

/// Configuration for the reconciler.
#[derive(Debug, Clone, Default)]
pub struct ReconcilerConfig {
    /// Confidence recorded on automatic mappings.
    pub confidence: MatchConfidence,
}

impl ReconcilerConfig {
    /// Set the confidence for exact and fuzzy matches.
    pub fn with_confidence(mut self, exact: f64, fuzzy: f64) -> Self {
        self.confidence = MatchConfidence { exact, fuzzy };
        self
    }
}

/// Outcome of one automatic reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub created: usize,
    /// Proposals the store refused; logged and skipped.
    pub failed: usize,
}

/// Owns the lifecycle of station mappings and groups.
pub struct Reconciler<S> {
    store: Arc<S>,
    config: ReconcilerConfig,
}

impl<S: StationStore> Reconciler<S> {
    pub fn new(store: Arc<S>, config: ReconcilerConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Match stored GDS stations against stored Paybilet stations and persist
    /// a mapping for every new pair.
    ///
    /// Stations already covered by an active mapping are left alone, so
    /// running the pass twice on the same data creates nothing the second
    /// time. Pairs whose mapping was deactivated are never proposed again.
    pub async fn run_automatic_reconciliation(&self) -> Result<ReconcileReport, ReconcileError> {
        let gds = self.store.load_stations(Some(Provider::Gds)).await?;
        let paybilet = self.store.load_stations(Some(Provider::Paybilet)).await?;
        let mappings = self.store.load_mappings().await?;

        let consumed: HashSet<StationId> = mappings
            .iter()
            .filter(|m| m.is_active)
            .flat_map(|m| m.sides().map(|s| s.id.clone()))
            .collect();

        let proposals = propose_mappings(&gds, &paybilet, &consumed, self.config.confidence);

        let mut report = ReconcileReport::default();
        for proposal in proposals {
            let a = proposal.station_a.as_ref().map(|s| &s.id);
            let b = proposal.station_b.as_ref().map(|s| &s.id);
            if mappings.iter().any(|m| !m.is_active && m.links_pair(a, b)) {
                debug!(name = %proposal.display_name, "pair was retired, not remapping");
                continue;
            }

            let name = proposal.display_name.clone();
            match self.store.save_mapping(proposal).await {
                Ok(mapping) => {
                    debug!(
                        mapping = %mapping.id,
                        name = %mapping.display_name,
                        confidence = mapping.confidence,
                        "automatic mapping created"
                    );
                    report.created += 1;
                }
                Err(e) => {
                    warn!(name = %name, error = %e, "failed to save automatic mapping, skipping");
                    report.failed += 1;
                }
            }
        }

        info!(
            gds = gds.len(),
            paybilet = paybilet.len(),
            created = report.created,
            failed = report.failed,
            "automatic reconciliation finished"
        );
        Ok(report)
    }

    /// Link two stations from different providers by hand.
    pub async fn map_manually(
        &self,
        first: &StationId,
        second: &StationId,
    ) -> Result<StationMapping, ReconcileError> {
        if first.provider() == second.provider() {
            return Err(ReconcileError::InvalidReference(format!(
                "{first} and {second} belong to the same provider"
            )));
        }

        let first = self.station(first).await?;
        let second = self.station(second).await?;

        let mapping = self
            .store
            .save_mapping(NewMapping::link(
                first.to_ref(),
                second.to_ref(),
                1.0,
                MappingOrigin::Manual,
            ))
            .await?;

        info!(mapping = %mapping.id, name = %mapping.display_name, "manual mapping created");
        Ok(mapping)
    }

    /// Retire a mapping. It stays in the store but no longer takes part in
    /// resolution, and the automatic pass will not recreate it.
    pub async fn deactivate_mapping(&self, id: MappingId) -> Result<StationMapping, ReconcileError> {
        let mapping = self
            .store
            .update_mapping(
                id,
                MappingPatch {
                    is_active: Some(false),
                    is_primary_in_group: Some(false),
                    ..Default::default()
                },
            )
            .await?;
        info!(mapping = %mapping.id, name = %mapping.display_name, "mapping deactivated");
        Ok(mapping)
    }

    pub async fn rename_mapping(
        &self,
        id: MappingId,
        name: &str,
    ) -> Result<StationMapping, ReconcileError> {
        let name = non_empty_name(name, "mapping")?;
        Ok(self
            .store
            .update_mapping(
                id,
                MappingPatch {
                    display_name: Some(name),
                    ..Default::default()
                },
            )
            .await?)
    }

    pub async fn mappings(&self) -> Result<Vec<StationMapping>, ReconcileError> {
        Ok(self.store.load_mappings().await?)
    }

    pub async fn groups(&self) -> Result<Vec<StationGroup>, ReconcileError> {
        Ok(self.store.load_groups().await?)
    }

    /// Create a group. The primary is always a member, whether or not it is
    /// repeated in `members`.
    pub async fn create_group(
        &self,
        name: &str,
        primary: &StationId,
        members: &[StationId],
    ) -> Result<StationGroup, ReconcileError> {
        let name = non_empty_name(name, "group")?;

        let primary = self.station(primary).await?.to_ref();
        let mut member_stations = vec![primary.clone()];
        for id in members {
            if member_stations.iter().any(|s| &s.id == id) {
                continue;
            }
            member_stations.push(self.station(id).await?.to_ref());
        }

        let group = self
            .store
            .save_group(NewGroup {
                name,
                primary_station: primary,
                member_stations,
            })
            .await?;
        self.sync_primary_flags(&group).await?;

        info!(group = %group.id, name = %group.name, members = group.member_stations.len(), "group created");
        Ok(group)
    }

    pub async fn add_to_group(
        &self,
        group_id: GroupId,
        station: &StationId,
    ) -> Result<StationGroup, ReconcileError> {
        let group = self.active_group(group_id).await?;
        if group.contains(station) {
            return Ok(group);
        }

        let mut members = group.member_stations;
        members.push(self.station(station).await?.to_ref());

        let group = self
            .store
            .update_group(
                group_id,
                GroupPatch {
                    member_stations: Some(members),
                    ..Default::default()
                },
            )
            .await?;
        self.sync_primary_flags(&group).await?;
        Ok(group)
    }

    /// Remove a member. Removing the primary promotes the next member;
    /// removing the last member deactivates the group.
    pub async fn remove_from_group(
        &self,
        group_id: GroupId,
        station: &StationId,
    ) -> Result<StationGroup, ReconcileError> {
        let group = self.active_group(group_id).await?;
        if !group.contains(station) {
            return Err(ReconcileError::InvalidReference(format!(
                "station {station} is not in group {group_id}"
            )));
        }

        let members: Vec<StationRef> = group
            .member_stations
            .iter()
            .filter(|s| &s.id != station)
            .cloned()
            .collect();

        let patch = match members.first() {
            None => GroupPatch {
                member_stations: Some(Vec::new()),
                is_active: Some(false),
                ..Default::default()
            },
            Some(next) if &group.primary_station.id == station => GroupPatch {
                primary_station: Some(next.clone()),
                member_stations: Some(members.clone()),
                ..Default::default()
            },
            Some(_) => GroupPatch {
                member_stations: Some(members.clone()),
                ..Default::default()
            },
        };

        self.clear_primary_flag(station).await?;
        let group = self.store.update_group(group_id, patch).await?;

        if group.is_active {
            self.sync_primary_flags(&group).await?;
        } else {
            info!(group = %group.id, "last member removed, group deactivated");
        }
        Ok(group)
    }

    pub async fn set_group_primary(
        &self,
        group_id: GroupId,
        station: &StationId,
    ) -> Result<StationGroup, ReconcileError> {
        let group = self.active_group(group_id).await?;
        let primary = group
            .member_stations
            .iter()
            .find(|s| &s.id == station)
            .cloned()
            .ok_or_else(|| {
                ReconcileError::InvalidReference(format!(
                    "station {station} is not in group {group_id}"
                ))
            })?;

        let group = self
            .store
            .update_group(
                group_id,
                GroupPatch {
                    primary_station: Some(primary),
                    ..Default::default()
                },
            )
            .await?;
        self.sync_primary_flags(&group).await?;
        Ok(group)
    }

    pub async fn rename_group(
        &self,
        group_id: GroupId,
        name: &str,
    ) -> Result<StationGroup, ReconcileError> {
        let name = non_empty_name(name, "group")?;
        self.active_group(group_id).await?;
        Ok(self
            .store
            .update_group(
                group_id,
                GroupPatch {
                    name: Some(name),
                    ..Default::default()
                },
            )
            .await?)
    }

    /// Create one group per active mapping whose stations are all ungrouped.
    /// The GDS side becomes the primary. Manual mappings are grouped first.
    pub async fn auto_group(&self) -> Result<Vec<StationGroup>, ReconcileError> {
        let mut mappings = self.store.load_mappings().await?;
        mappings.retain(|m| m.is_active);
        mappings.sort_by_key(|m| (!m.is_manual(), m.id));

        let mut grouped: HashSet<StationId> = self
            .store
            .load_groups()
            .await?
            .iter()
            .filter(|g| g.is_active)
            .flat_map(|g| g.member_stations.iter().map(|s| s.id.clone()))
            .collect();

        let mut created = Vec::new();
        for mapping in &mappings {
            let members: Vec<StationRef> = mapping.sides().cloned().collect();
            if members.iter().any(|s| grouped.contains(&s.id)) {
                continue;
            }
            let Some(primary) = members.first().cloned() else {
                continue;
            };

            let new = NewGroup {
                name: mapping.display_name.clone(),
                primary_station: primary,
                member_stations: members.clone(),
            };
            match self.store.save_group(new).await {
                Ok(group) => {
                    grouped.extend(members.into_iter().map(|s| s.id));
                    self.sync_primary_flags(&group).await?;
                    created.push(group);
                }
                Err(e) => {
                    warn!(mapping = %mapping.id, error = %e, "failed to group mapping, skipping");
                }
            }
        }

        info!(created = created.len(), "automatic grouping finished");
        Ok(created)
    }

    /// Every station equivalent to the given name or station id.
    ///
    /// Manual mappings win over automatic ones; when no mapping matches, the
    /// stored stations are searched by normalized name. A station id always
    /// resolves to at least that station.
    pub async fn resolve_equivalents(
        &self,
        name_or_id: &str,
    ) -> Result<Vec<StationRef>, ReconcileError> {
        let query = name_or_id.trim();
        let mappings: Vec<StationMapping> = self
            .store
            .load_mappings()
            .await?
            .into_iter()
            .filter(|m| m.is_active)
            .collect();

        if let Ok(id) = StationId::parse(query) {
            let station = self.station(&id).await?;
            let mut refs = vec![station.to_ref()];
            for side in preferred(&mappings, |m| m.involves(&id)) {
                push_unique(&mut refs, side);
            }
            return Ok(refs);
        }

        let wanted = normalize_name(query);
        if wanted.is_empty() {
            return Ok(Vec::new());
        }

        let mut refs = Vec::new();
        for side in preferred(&mappings, |m| {
            normalize_name(&m.display_name) == wanted
                || m.sides().any(|s| normalize_name(&s.name) == wanted)
        }) {
            push_unique(&mut refs, side);
        }
        if !refs.is_empty() {
            return Ok(refs);
        }

        debug!(query = %query, "no mapping matched, falling back to name search");
        Ok(self
            .store
            .load_stations(None)
            .await?
            .iter()
            .filter(|s| normalize_name(&s.name).contains(&wanted))
            .map(Station::to_ref)
            .collect())
    }

    async fn station(&self, id: &StationId) -> Result<Station, ReconcileError> {
        self.store
            .load_stations(Some(id.provider()))
            .await?
            .into_iter()
            .find(|s| &s.id == id)
            .ok_or_else(|| ReconcileError::InvalidReference(format!("station {id}")))
    }

    async fn active_group(&self, id: GroupId) -> Result<StationGroup, ReconcileError> {
        self.store
            .load_groups()
            .await?
            .into_iter()
            .find(|g| g.id == id && g.is_active)
            .ok_or_else(|| ReconcileError::InvalidReference(format!("group {id}")))
    }

    /// Mark exactly the group's primary mappings as primary.
    async fn sync_primary_flags(&self, group: &StationGroup) -> Result<(), ReconcileError> {
        for mapping in self.store.load_mappings().await? {
            if !mapping.is_active || !group.member_stations.iter().any(|s| mapping.involves(&s.id)) {
                continue;
            }
            let is_primary = mapping.involves(&group.primary_station.id);
            if mapping.is_primary_in_group != is_primary {
                self.set_primary_flag(&mapping, is_primary).await?;
            }
        }
        Ok(())
    }

    async fn clear_primary_flag(&self, station: &StationId) -> Result<(), ReconcileError> {
        for mapping in self.store.load_mappings().await? {
            if mapping.is_primary_in_group && mapping.involves(station) {
                self.set_primary_flag(&mapping, false).await?;
            }
        }
        Ok(())
    }

    async fn set_primary_flag(
        &self,
        mapping: &StationMapping,
        is_primary: bool,
    ) -> Result<(), ReconcileError> {
        self.store
            .update_mapping(
                mapping.id,
                MappingPatch {
                    is_primary_in_group: Some(is_primary),
                    ..Default::default()
                },
            )
            .await?;
        Ok(())
    }
}

/// Sides of the mappings matching `pred`: manual mappings if any match,
/// otherwise automatic ones.
fn preferred<'a>(
    mappings: &'a [StationMapping],
    pred: impl Fn(&StationMapping) -> bool,
) -> Vec<&'a StationRef> {
    let matching: Vec<&StationMapping> = mappings.iter().filter(|m| pred(m)).collect();
    let tier = if matching.iter().any(|m| m.is_manual()) {
        MappingOrigin::Manual
    } else {
        MappingOrigin::Automatic
    };
    matching
        .into_iter()
        .filter(|m| m.origin == tier)
        .flat_map(|m| m.sides())
        .collect()
}

fn non_empty_name(name: &str, what: &str) -> Result<String, ReconcileError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ReconcileError::InvalidReference(format!("{what} name is empty")));
    }
    Ok(name.to_string())
}

fn push_unique(refs: &mut Vec<StationRef>, station: &StationRef) {
    if !refs.iter().any(|r| r.id == station.id) {
        refs.push(station.clone());
    }
}
