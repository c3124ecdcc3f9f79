//! Pure name matching between the two providers' station lists.

use std::collections::{HashMap, HashSet};

use crate::domain::{MappingOrigin, NewMapping, Station, StationId};

use super::normalize_name;

/// Confidence assigned to each kind of automatic match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchConfidence {
    pub exact: f64,
    pub fuzzy: f64,
}

impl Default for MatchConfidence {
    fn default() -> Self {
        Self {
            exact: 1.0,
            fuzzy: 0.8,
        }
    }
}

/// Propose automatic mappings between GDS and Paybilet stations.
///
/// Stations in `consumed` are skipped, and every station appears in at most
/// one proposal. Exact matches on the normalized name are found first; the
/// remaining stations are then paired when one normalized name contains the
/// other, first match in input order winning.
pub fn propose_mappings(
    gds: &[Station],
    paybilet: &[Station],
    consumed: &HashSet<StationId>,
    confidence: MatchConfidence,
) -> Vec<NewMapping> {
    let mut consumed = consumed.clone();
    let mut proposals = Vec::new();

    let gds: Vec<(&Station, String)> = normalized(gds, &consumed);
    let paybilet: Vec<(&Station, String)> = normalized(paybilet, &consumed);

    let mut by_name: HashMap<&str, Vec<&Station>> = HashMap::new();
    for (station, name) in &paybilet {
        by_name.entry(name.as_str()).or_default().push(station);
    }

    for (a, name) in &gds {
        let Some(b) = by_name
            .get(name.as_str())
            .and_then(|candidates| candidates.iter().find(|b| !consumed.contains(&b.id)))
        else {
            continue;
        };
        consumed.insert(a.id.clone());
        consumed.insert(b.id.clone());
        proposals.push(NewMapping::link(
            a.to_ref(),
            b.to_ref(),
            confidence.exact,
            MappingOrigin::Automatic,
        ));
    }

    for (a, a_name) in &gds {
        if consumed.contains(&a.id) {
            continue;
        }
        let Some((b, _)) = paybilet.iter().find(|(b, b_name)| {
            !consumed.contains(&b.id) && (a_name.contains(b_name.as_str()) || b_name.contains(a_name.as_str()))
        }) else {
            continue;
        };
        consumed.insert(a.id.clone());
        consumed.insert(b.id.clone());
        proposals.push(NewMapping::link(
            a.to_ref(),
            b.to_ref(),
            confidence.fuzzy,
            MappingOrigin::Automatic,
        ));
    }

    proposals
}

/// Unconsumed stations paired with their normalized names. Stations whose
/// name normalizes to nothing can never match and are dropped.
fn normalized<'a>(stations: &'a [Station], consumed: &HashSet<StationId>) -> Vec<(&'a Station, String)> {
    stations
        .iter()
        .filter(|s| !consumed.contains(&s.id))
        .map(|s| (s, normalize_name(&s.name)))
        .filter(|(_, name)| !name.is_empty())
        .collect()
}
