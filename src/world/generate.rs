//! Synthetic scenario generation
//!
//! Deterministic, seed-driven world builder used by the demo binary, the
//! benches and the integration tests. The engine core never touches the RNG;
//! everything random happens here, before the first turn is resolved.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::core::types::{ControlStatus, EdgeId, FactionId, MunicipalityId, SettlementId, Turn};
use crate::turn::{Overrun, SupplyMap, TurnInputs};
use crate::world::{
    Assignment, Faction, Formation, FormationKind, MilitiaPool, Municipality, Posture,
    PostureAssignment, Settlement, SettlementGraph, WorldState,
};

/// Faction roster used by generated scenarios
const FACTION_ROSTER: [(&str, &str); 3] = [
    ("north", "northern"),
    ("south", "southern"),
    ("east", "eastern"),
];

/// Shape of a generated scenario
#[derive(Debug, Clone)]
pub struct ScenarioParams {
    /// Number of factions, capped at the roster size
    pub factions: usize,
    pub municipalities: usize,
    pub settlements_per_municipality: usize,
    pub formations_per_faction: usize,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            factions: 2,
            municipalities: 8,
            settlements_per_municipality: 4,
            formations_per_faction: 6,
        }
    }
}

fn municipality_id(index: usize) -> MunicipalityId {
    MunicipalityId::new(format!("m{index:02}"))
}

fn settlement_id(mun: usize, index: usize) -> SettlementId {
    SettlementId::new(format!("m{mun:02}-s{index}"))
}

/// Generate a world from a seed.
///
/// Municipalities form a chain of ethnic bands, one per faction, so fronts
/// emerge around the band boundaries. The same seed and params always yield
/// the identical world.
pub fn generate_world(params: &ScenarioParams, seed: u64) -> WorldState {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut world = WorldState::new(seed);

    let faction_count = params.factions.clamp(1, FACTION_ROSTER.len());
    for (id, ethnicity) in FACTION_ROSTER.iter().take(faction_count) {
        world
            .factions
            .insert(FactionId::from(*id), Faction::new(*id, *ethnicity));
    }

    // Municipalities, settlements, census and initial control.
    let mut graph_edges: Vec<(SettlementId, SettlementId)> = Vec::new();
    for mun_index in 0..params.municipalities {
        let mun_id = municipality_id(mun_index);
        let home = mun_index * faction_count / params.municipalities.max(1);
        let status = match rng.gen_range(0..4u32) {
            0 | 1 => ControlStatus::Consolidated,
            2 => ControlStatus::Contested,
            _ => ControlStatus::Fragmented,
        };
        world
            .municipalities
            .insert(mun_id.clone(), Municipality::new(mun_id.clone(), status));

        for s_index in 0..params.settlements_per_municipality {
            let sid = settlement_id(mun_index, s_index);
            let population = rng.gen_range(200..20_000);
            let mut settlement = Settlement::new(sid.clone(), mun_id.clone(), population);

            // Home ethnicity dominates, the rest share what remains.
            let home_share = 0.45 + rng.gen::<f64>() * 0.4;
            let mut remaining = 0.95 - home_share;
            let mut best = (home, home_share);
            for f_index in 0..faction_count {
                let share = if f_index == home {
                    home_share
                } else {
                    let share = (remaining * rng.gen::<f64>()).max(0.0);
                    remaining -= share;
                    share
                };
                if share > best.1 {
                    best = (f_index, share);
                }
                settlement = settlement.with_share(FACTION_ROSTER[f_index].1, share);
            }
            world.settlements.insert(sid.clone(), settlement);

            // Plurality controller, occasionally nobody.
            let controller = if rng.gen_bool(0.05) {
                None
            } else {
                Some(FactionId::from(FACTION_ROSTER[best.0].0))
            };
            world.set_controller(sid.clone(), controller);

            // Chain within the municipality.
            if s_index > 0 {
                graph_edges.push((settlement_id(mun_index, s_index - 1), sid.clone()));
            }
        }

        // Link to the previous municipality plus one random cross edge.
        if mun_index > 0 {
            graph_edges.push((
                settlement_id(mun_index - 1, 0),
                settlement_id(mun_index, 0),
            ));
            let a = rng.gen_range(0..params.settlements_per_municipality);
            let b = rng.gen_range(0..params.settlements_per_municipality);
            graph_edges.push((settlement_id(mun_index - 1, a), settlement_id(mun_index, b)));
        }
    }
    world.graph = SettlementGraph::new(graph_edges);
    world.sync_front_topology();

    // Militia pools follow each municipality's dominant faction.
    let mun_ids: Vec<MunicipalityId> = world.municipalities.keys().cloned().collect();
    for mun_id in &mun_ids {
        let plurality = world
            .settlements_in(mun_id)
            .first()
            .and_then(|sid| world.controller(sid).cloned());
        let pool =
            MilitiaPool::new(mun_id.clone(), plurality).with_available(rng.gen_range(50..800));
        world.militia_pools.insert(mun_id.clone(), pool);
    }

    // Formations with mixed kinds; a third carry kind only as a tag to
    // exercise the normalization pass.
    let faction_ids: Vec<FactionId> = world.factions.keys().cloned().collect();
    for faction_id in &faction_ids {
        let own_settlements: Vec<SettlementId> = world
            .control
            .iter()
            .filter(|(_, c)| c.as_ref() == Some(faction_id))
            .map(|(sid, _)| sid.clone())
            .collect();

        let own_edges: Vec<EdgeId> = world
            .front_edges
            .values()
            .filter(|e| e.involves(faction_id))
            .map(|e| e.id.clone())
            .collect();
        let own_regions: Vec<_> = world
            .front_regions
            .values()
            .filter(|r| r.involves(faction_id))
            .map(|r| r.id.clone())
            .collect();

        for k in 0..params.formations_per_faction {
            let id = format!("{faction_id}-bde-{k:02}");
            let created: Turn = rng.gen_range(0..3);
            let mut formation = Formation::new(id.as_str(), faction_id.clone(), created)
                .with_personnel(rng.gen_range(300..3000))
                .with_fatigue(rng.gen_range(0..25));

            let kind = match rng.gen_range(0..10u32) {
                0..=2 => FormationKind::Militia,
                3 => FormationKind::TerritorialDefense,
                4 => FormationKind::OperationalGroup,
                _ => FormationKind::Brigade,
            };
            if k % 3 == 0 {
                formation = match kind {
                    FormationKind::Militia => formation.with_tag("militia"),
                    FormationKind::TerritorialDefense => {
                        formation.with_tag("territorial_defense")
                    }
                    FormationKind::OperationalGroup => formation.with_tag("operational_group"),
                    FormationKind::CorpsAsset => formation.with_tag("corps_asset"),
                    FormationKind::Brigade => formation,
                };
            } else {
                formation = formation.with_kind(kind);
            }

            if !own_settlements.is_empty() {
                let hq = own_settlements[rng.gen_range(0..own_settlements.len())].clone();
                let hq_mun = world.settlements[&hq].municipality.clone();
                formation = formation.with_hq(hq).with_municipality(hq_mun);
            }

            formation.assignment = match rng.gen_range(0..3u32) {
                0 if !own_edges.is_empty() => Some(Assignment::Edge(
                    own_edges[rng.gen_range(0..own_edges.len())].clone(),
                )),
                1 if !own_regions.is_empty() => Some(Assignment::Region(
                    own_regions[rng.gen_range(0..own_regions.len())].clone(),
                )),
                _ => None,
            };

            world.formations.insert(formation.id.clone(), formation);
        }

        // Base posture weights on roughly two thirds of the faction's front.
        let mut demand = 0u32;
        for edge_id in &own_edges {
            if rng.gen_bool(0.33) {
                continue;
            }
            let weight = rng.gen_range(1..=10u32);
            demand += weight;
            let posture = match rng.gen_range(0..3u32) {
                0 => Posture::Hold,
                1 => Posture::Probe,
                _ => Posture::Push,
            };
            world
                .posture
                .entry(faction_id.clone())
                .or_default()
                .insert(edge_id.clone(), PostureAssignment::new(posture, weight));
        }

        // Some factions run a command capacity below their demand.
        if demand > 0 && rng.gen_bool(0.5) {
            world
                .factions
                .get_mut(faction_id)
                .expect("faction exists")
                .command_capacity = (demand * 2 / 3).max(1);
        }
    }

    world
}

/// Deterministic external inputs for one turn of a generated scenario.
///
/// Stands in for the supply and combat layers: most formations are supplied,
/// and every third turn one front municipality is overrun by the stronger
/// side of a random front edge.
pub fn synthetic_turn_inputs(world: &WorldState, rng: &mut ChaCha8Rng) -> TurnInputs {
    let mut supply = SupplyMap::new();
    for id in world.formations.keys() {
        supply.insert(id.clone(), rng.gen_bool(0.85));
    }

    let mut overruns = Vec::new();
    if world.turn % 3 == 1 && !world.front_edges.is_empty() {
        let edges: Vec<_> = world.front_edges.values().collect();
        let edge = edges[rng.gen_range(0..edges.len())];
        let (attacker, defender) = if rng.gen_bool(0.5) {
            (edge.side_a.clone(), edge.side_b.clone())
        } else {
            (edge.side_b.clone(), edge.side_a.clone())
        };
        // Overrun the municipality on the defender's side of the edge.
        let defender_settlement = [&edge.a, &edge.b]
            .into_iter()
            .find(|sid| world.controller(sid) == Some(&defender));
        if let Some(sid) = defender_settlement {
            overruns.push(Overrun {
                municipality: world.settlements[sid].municipality.clone(),
                attacker,
                previous: Some(defender),
            });
        }
    }

    TurnInputs { supply, overruns }
}
