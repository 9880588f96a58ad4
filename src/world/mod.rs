//! World state for the turn resolution engine
//!
//! The whole mutable state of a running conflict lives in [`WorldState`],
//! threaded explicitly through each system of the turn step. Observable
//! collections are ordered maps so iteration and serialization are canonical.

pub mod events;
pub mod formation;
pub mod front;
pub mod generate;
pub mod settlement;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub use events::{ControlEvent, ControlMechanism, EventLog};
pub use formation::{Assignment, Formation, FormationKind, FormationStatus, MilitiaPool, Readiness};
pub use front::{EffectiveAssignment, FrontEdge, FrontRegion, Posture, PostureAssignment};
pub use settlement::{Municipality, Settlement, SettlementGraph};

use crate::core::types::{
    EdgeId, FactionId, FormationId, FrontRegionId, MunicipalityId, SettlementId, Turn,
};

/// A political/military side
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Faction {
    pub id: FactionId,
    /// Census key this faction's population aligns with
    pub ethnicity: String,
    /// Total base posture weight the faction's command can direct; 0 = unlimited
    pub command_capacity: u32,
}

impl Faction {
    pub fn new(id: impl Into<FactionId>, ethnicity: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ethnicity: ethnicity.into(),
            command_capacity: 0,
        }
    }

    pub fn with_command_capacity(mut self, capacity: u32) -> Self {
        self.command_capacity = capacity;
        self
    }
}

/// A settlement resisting a wave flip.
///
/// While the record exists the settlement keeps its old controller; the
/// record is deleted when the holdout is cleared, surrenders, or the
/// settlement is re-flipped by a later wave.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holdout {
    /// The formerly-controlling, resisting faction
    pub holding: FactionId,
    /// The attacker waiting to take over
    pub occupying: FactionId,
    pub resistance: i64,
    pub since_turn: Turn,
    /// Consecutive turns without supply connectivity for the holding faction
    pub isolated_turns: u32,
}

/// Complete mutable world state shared by the turn-step systems
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldState {
    pub turn: Turn,
    /// Scenario seed, recorded for deterministic gate hashing
    pub seed: u64,
    pub factions: BTreeMap<FactionId, Faction>,
    pub municipalities: BTreeMap<MunicipalityId, Municipality>,
    pub settlements: BTreeMap<SettlementId, Settlement>,
    pub graph: SettlementGraph,
    /// Current controller per settlement; `None` = no/unknown controller
    pub control: BTreeMap<SettlementId, Option<FactionId>>,
    pub holdouts: BTreeMap<SettlementId, Holdout>,
    pub formations: BTreeMap<FormationId, Formation>,
    pub militia_pools: BTreeMap<MunicipalityId, MilitiaPool>,
    pub front_edges: BTreeMap<EdgeId, FrontEdge>,
    pub front_regions: BTreeMap<FrontRegionId, FrontRegion>,
    /// Base posture intent per faction and front edge
    pub posture: BTreeMap<FactionId, BTreeMap<EdgeId, PostureAssignment>>,
    /// Output of the commitment step, read by downstream combat resolution
    pub effective_posture: BTreeMap<FactionId, BTreeMap<EdgeId, EffectiveAssignment>>,
    /// Front edges frozen by a ceasefire
    pub ceasefire: BTreeSet<EdgeId>,
    pub events: EventLog,
}

impl WorldState {
    pub fn new(seed: u64) -> Self {
        Self {
            turn: 0,
            seed,
            factions: BTreeMap::new(),
            municipalities: BTreeMap::new(),
            settlements: BTreeMap::new(),
            graph: SettlementGraph::default(),
            control: BTreeMap::new(),
            holdouts: BTreeMap::new(),
            formations: BTreeMap::new(),
            militia_pools: BTreeMap::new(),
            front_edges: BTreeMap::new(),
            front_regions: BTreeMap::new(),
            posture: BTreeMap::new(),
            effective_posture: BTreeMap::new(),
            ceasefire: BTreeSet::new(),
            events: EventLog::new(),
        }
    }

    /// Current controller of a settlement, if any
    pub fn controller(&self, id: &SettlementId) -> Option<&FactionId> {
        self.control.get(id).and_then(|c| c.as_ref())
    }

    pub fn set_controller(&mut self, id: SettlementId, faction: Option<FactionId>) {
        self.control.insert(id, faction);
    }

    /// A faction's ethnic population share in a settlement
    pub fn ethnic_share(&self, settlement: &SettlementId, faction: &FactionId) -> f64 {
        let Some(settlement) = self.settlements.get(settlement) else {
            return 0.0;
        };
        let Some(faction) = self.factions.get(faction) else {
            return 0.0;
        };
        settlement.share(&faction.ethnicity)
    }

    /// Settlement ids of a municipality, in sorted order
    pub fn settlements_in(&self, municipality: &MunicipalityId) -> Vec<SettlementId> {
        self.settlements
            .values()
            .filter(|s| &s.municipality == municipality)
            .map(|s| s.id.clone())
            .collect()
    }

    /// Recompute front edges and regions from the current control map.
    ///
    /// Posture assignments are keyed by edge id and survive re-derivation;
    /// entries for edges that no longer exist simply find no active segment.
    pub fn sync_front_topology(&mut self) {
        self.front_edges = front::derive_front_edges(&self.control, &self.graph);
        self.front_regions = front::derive_front_regions(&self.front_edges);
    }
}
