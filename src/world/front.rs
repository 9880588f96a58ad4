//! Front topology: edges, regions and posture assignments
//!
//! A front edge is a settlement adjacency whose endpoints are controlled by
//! two different known factions. A front region clusters contiguous front
//! edges between the same faction pair. Both are derived from the control
//! map at the start of every turn step.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::core::types::{EdgeId, FactionId, FrontRegionId, SettlementId};
use crate::world::settlement::SettlementGraph;

/// Desired stance of a faction on a front segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Posture {
    Hold,
    Probe,
    Push,
}

/// A faction's base posture intent for one front edge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostureAssignment {
    pub posture: Posture,
    pub base_weight: u32,
}

impl PostureAssignment {
    pub fn new(posture: Posture, base_weight: u32) -> Self {
        Self {
            posture,
            base_weight,
        }
    }
}

/// Posture weight after commitment friction and capacity scaling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveAssignment {
    pub posture: Posture,
    pub base_weight: u32,
    pub effective_weight: u32,
}

/// A contested adjacency between settlements of two different factions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontEdge {
    pub id: EdgeId,
    pub a: SettlementId,
    pub b: SettlementId,
    /// Lexicographically smaller faction of the pair
    pub side_a: FactionId,
    pub side_b: FactionId,
    pub active: bool,
}

impl FrontEdge {
    /// Canonical id of the edge between two settlements
    pub fn canonical_id(a: &SettlementId, b: &SettlementId) -> EdgeId {
        if a <= b {
            EdgeId::new(format!("{a}~{b}"))
        } else {
            EdgeId::new(format!("{b}~{a}"))
        }
    }

    pub fn involves(&self, faction: &FactionId) -> bool {
        &self.side_a == faction || &self.side_b == faction
    }
}

/// A contiguous cluster of front edges between the same faction pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontRegion {
    pub id: FrontRegionId,
    pub side_a: FactionId,
    pub side_b: FactionId,
    pub edges: BTreeSet<EdgeId>,
}

impl FrontRegion {
    pub fn involves(&self, faction: &FactionId) -> bool {
        &self.side_a == faction || &self.side_b == faction
    }
}

/// Derive the active front edges from the current control map
pub fn derive_front_edges(
    control: &BTreeMap<SettlementId, Option<FactionId>>,
    graph: &SettlementGraph,
) -> BTreeMap<EdgeId, FrontEdge> {
    let mut edges = BTreeMap::new();
    for (a, b) in graph.edges() {
        let holder_a = control.get(a).and_then(|c| c.as_ref());
        let holder_b = control.get(b).and_then(|c| c.as_ref());
        let (fa, fb) = match (holder_a, holder_b) {
            (Some(fa), Some(fb)) if fa != fb => (fa, fb),
            _ => continue,
        };
        let (side_a, side_b) = if fa <= fb {
            (fa.clone(), fb.clone())
        } else {
            (fb.clone(), fa.clone())
        };
        let id = FrontEdge::canonical_id(a, b);
        edges.insert(
            id.clone(),
            FrontEdge {
                id,
                a: a.clone(),
                b: b.clone(),
                side_a,
                side_b,
                active: true,
            },
        );
    }
    edges
}

/// Cluster front edges into contiguous regions per faction pair.
///
/// Two edges are contiguous when they share a settlement endpoint. Region
/// ids are assigned per faction pair in order of each cluster's smallest
/// edge id, so the numbering is stable across runs.
pub fn derive_front_regions(
    edges: &BTreeMap<EdgeId, FrontEdge>,
) -> BTreeMap<FrontRegionId, FrontRegion> {
    // Endpoint index per faction pair; lookup only, order never observed.
    let mut by_endpoint: AHashMap<(FactionId, FactionId, SettlementId), Vec<EdgeId>> =
        AHashMap::new();
    for edge in edges.values() {
        let pair = (edge.side_a.clone(), edge.side_b.clone());
        for endpoint in [&edge.a, &edge.b] {
            by_endpoint
                .entry((pair.0.clone(), pair.1.clone(), endpoint.clone()))
                .or_default()
                .push(edge.id.clone());
        }
    }

    let mut regions = BTreeMap::new();
    let mut region_index: BTreeMap<(FactionId, FactionId), u32> = BTreeMap::new();
    let mut assigned: BTreeSet<EdgeId> = BTreeSet::new();

    // BTreeMap iteration visits edge ids sorted, so each cluster is first
    // entered through its smallest edge.
    for (edge_id, edge) in edges {
        if assigned.contains(edge_id) {
            continue;
        }
        let pair = (edge.side_a.clone(), edge.side_b.clone());
        let mut cluster: BTreeSet<EdgeId> = BTreeSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(edge_id.clone());
        assigned.insert(edge_id.clone());

        while let Some(current) = queue.pop_front() {
            cluster.insert(current.clone());
            let current_edge = &edges[&current];
            for endpoint in [&current_edge.a, &current_edge.b] {
                let key = (pair.0.clone(), pair.1.clone(), endpoint.clone());
                let Some(linked) = by_endpoint.get(&key) else {
                    continue;
                };
                for other in linked {
                    if assigned.insert(other.clone()) {
                        queue.push_back(other.clone());
                    }
                }
            }
        }

        let index = region_index.entry(pair.clone()).or_insert(0);
        let id = FrontRegionId::new(format!("{}--{}#{}", pair.0, pair.1, index));
        *index += 1;

        regions.insert(
            id.clone(),
            FrontRegion {
                id,
                side_a: pair.0,
                side_b: pair.1,
                edges: cluster,
            },
        );
    }

    regions
}
