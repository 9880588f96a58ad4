//! Settlement control resolution: wave flips, resisted holdouts and
//! isolation-driven surrender
//!
//! Municipality-level overruns are decided outside the engine; this module
//! turns an overrun into settlement-by-settlement outcomes and then, every
//! turn, works through the surviving holdouts.

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::core::config::EngineConfig;
use crate::core::types::{FactionId, FormationId, MunicipalityId, SettlementId};
use crate::world::{
    ControlEvent, ControlMechanism, Formation, FormationKind, Holdout, WorldState,
};

/// Divisor of the log-population term in the holdout resistance scale
const RESISTANCE_LOG_DIVISOR: f64 = 4.0;

/// Adjacency degree that would saturate the proximity term (before its cap)
const PROXIMITY_DEGREE_DIVISOR: f64 = 20.0;

/// A municipality overrun decided by the surrounding combat layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Overrun {
    pub municipality: MunicipalityId,
    pub attacker: FactionId,
    pub previous: Option<FactionId>,
}

/// Outcome of one municipality wave flip
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaveFlipSummary {
    pub municipality: MunicipalityId,
    pub attacker: FactionId,
    pub flipped: Vec<SettlementId>,
    pub holdouts: Vec<SettlementId>,
}

/// Outcome of one holdout cleanup pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleanupSummary {
    pub processed: u32,
    /// Holdouts that spent this turn without a supply link
    pub isolated: u32,
    pub surrendered: Vec<SettlementId>,
    pub cleared: Vec<SettlementId>,
    /// Holdouts that resisted but lost resistance to a formation
    pub worn_down: u32,
}

/// Population term of the holdout resistance scale
fn population_factor(config: &EngineConfig, population: u32) -> f64 {
    if population == 0 {
        return 1.0;
    }
    let log_term = (population.max(100) as f64).log10() / RESISTANCE_LOG_DIVISOR;
    1.0 + log_term.min(config.resistance_population_cap)
}

/// Proximity term of the holdout resistance scale
fn proximity_factor(config: &EngineConfig, degree: usize) -> f64 {
    if degree == 0 {
        return 1.0;
    }
    1.0 + (degree as f64 / PROXIMITY_DEGREE_DIVISOR).min(config.resistance_proximity_cap)
}

/// Resistance of a freshly created holdout
pub fn holdout_resistance(
    config: &EngineConfig,
    hostile_share: f64,
    population: u32,
    degree: usize,
) -> i64 {
    let scaled = hostile_share
        * config.resistance_base_factor
        * population_factor(config, population)
        * proximity_factor(config, degree);
    (scaled.round() as i64).max(0)
}

/// Apply a municipality wave flip for an externally decided overrun.
///
/// Settlements with favorable demographics flip immediately; the rest become
/// holdouts that keep their current controller until cleared or surrendered.
pub fn apply_wave_flip(
    world: &mut WorldState,
    config: &EngineConfig,
    overrun: &Overrun,
) -> WaveFlipSummary {
    let turn = world.turn;
    let mut summary = WaveFlipSummary {
        municipality: overrun.municipality.clone(),
        attacker: overrun.attacker.clone(),
        flipped: Vec::new(),
        holdouts: Vec::new(),
    };

    for sid in world.settlements_in(&overrun.municipality) {
        let current = world.controller(&sid).cloned();
        if current.as_ref() == Some(&overrun.attacker) {
            continue;
        }
        // Already contested by the same occupier: leave the standing holdout.
        if let Some(holdout) = world.holdouts.get(&sid) {
            if holdout.occupying == overrun.attacker {
                continue;
            }
        }

        let attacker_share = world.ethnic_share(&sid, &overrun.attacker);
        let defender_share = overrun
            .previous
            .as_ref()
            .map(|f| world.ethnic_share(&sid, f))
            .unwrap_or(0.0);
        let holding = current.clone().or_else(|| overrun.previous.clone());

        let flips = attacker_share >= config.wave_flip_ethnic_threshold
            && attacker_share >= defender_share;

        // With no known holder there is no one left to resist.
        if flips || holding.is_none() {
            world.set_controller(sid.clone(), Some(overrun.attacker.clone()));
            world.holdouts.remove(&sid);
            world.events.push(ControlEvent {
                turn,
                settlement: sid.clone(),
                municipality: Some(overrun.municipality.clone()),
                from: current,
                to: Some(overrun.attacker.clone()),
                mechanism: ControlMechanism::WaveFlip,
            });
            summary.flipped.push(sid);
            continue;
        }

        let holding = holding.expect("holding faction checked above");
        let hostile_share = if defender_share > 0.0 {
            defender_share
        } else {
            1.0 - attacker_share
        };
        let population = world
            .settlements
            .get(&sid)
            .map(|s| s.population)
            .unwrap_or(0);
        let degree = world.graph.degree(&sid);
        let resistance = holdout_resistance(config, hostile_share, population, degree);

        world.holdouts.insert(
            sid.clone(),
            Holdout {
                holding: holding.clone(),
                occupying: overrun.attacker.clone(),
                resistance,
                since_turn: turn,
                isolated_turns: 0,
            },
        );
        world.events.push(ControlEvent {
            turn,
            settlement: sid.clone(),
            municipality: Some(overrun.municipality.clone()),
            from: current,
            to: Some(holding),
            mechanism: ControlMechanism::HoldoutCreated,
        });
        summary.holdouts.push(sid);
    }

    tracing::debug!(
        municipality = %overrun.municipality,
        attacker = %overrun.attacker,
        flipped = summary.flipped.len(),
        holdouts = summary.holdouts.len(),
        "wave flip applied"
    );

    summary
}

/// BFS from a holdout toward any same-faction non-holdout settlement.
///
/// Same-faction holdouts are themselves traversed, so a chain of holdouts
/// stays connected as long as it eventually reaches a solid anchor.
fn has_supply_link(world: &WorldState, start: &SettlementId, holding: &FactionId) -> bool {
    let mut visited: AHashSet<SettlementId> = AHashSet::new();
    let mut queue = VecDeque::new();
    visited.insert(start.clone());
    queue.push_back(start.clone());

    while let Some(current) = queue.pop_front() {
        for neighbor in world.graph.neighbors(&current) {
            if !visited.insert(neighbor.clone()) {
                continue;
            }
            if world.controller(neighbor) != Some(holding) {
                continue;
            }
            if !world.holdouts.contains_key(neighbor) {
                return true;
            }
            queue.push_back(neighbor.clone());
        }
    }
    false
}

/// Whether a formation can project into a holdout settlement
fn can_reach(
    world: &WorldState,
    formation: &Formation,
    sid: &SettlementId,
    occupying: &FactionId,
) -> bool {
    let holdout_mun = world.settlements.get(sid).map(|s| &s.municipality);
    if let (Some(formation_mun), Some(holdout_mun)) =
        (formation.municipality.as_ref(), holdout_mun)
    {
        if formation_mun == holdout_mun {
            return true;
        }
    }

    let neighbors = world.graph.neighbors(sid);
    if let Some(hq) = &formation.hq {
        if hq == sid || neighbors.contains(hq) {
            return true;
        }
    }

    // The formation's municipality already has a foothold next door.
    if let Some(formation_mun) = formation.municipality.as_ref() {
        for neighbor in neighbors {
            if world.settlements.get(neighbor).map(|s| &s.municipality) == Some(formation_mun)
                && world.controller(neighbor) == Some(occupying)
            {
                return true;
            }
        }
    }

    false
}

/// Run the holdout cleanup pass over all holdouts, in sorted settlement order
pub fn run_holdout_cleanup(world: &mut WorldState, config: &EngineConfig) -> CleanupSummary {
    let turn = world.turn;
    let mut summary = CleanupSummary::default();

    let holdout_sids: Vec<SettlementId> = world.holdouts.keys().cloned().collect();
    let formation_ids: Vec<FormationId> = world.formations.keys().cloned().collect();
    let mut clears_used: AHashMap<FormationId, u32> = AHashMap::new();

    for sid in holdout_sids {
        let Some(holdout) = world.holdouts.get(&sid) else {
            continue;
        };
        let holding = holdout.holding.clone();
        let occupying = holdout.occupying.clone();
        let mut resistance = holdout.resistance;
        summary.processed += 1;

        let linked = has_supply_link(world, &sid, &holding);
        let isolated_turns = {
            let holdout = world
                .holdouts
                .get_mut(&sid)
                .expect("holdout present in this pass");
            if linked {
                holdout.isolated_turns = 0;
            } else {
                holdout.isolated_turns += 1;
                summary.isolated += 1;
            }
            holdout.isolated_turns
        };

        if isolated_turns >= config.isolation_surrender_turns {
            world.holdouts.remove(&sid);
            world.set_controller(sid.clone(), Some(occupying.clone()));
            let municipality = world.settlements.get(&sid).map(|s| s.municipality.clone());
            world.events.push(ControlEvent {
                turn,
                settlement: sid.clone(),
                municipality,
                from: Some(holding),
                to: Some(occupying),
                mechanism: ControlMechanism::HoldoutSurrendered,
            });
            summary.surrendered.push(sid);
            continue;
        }

        let mut cleared_by: Option<FormationId> = None;
        let mut worn = false;
        for fid in &formation_ids {
            let Some(formation) = world.formations.get(fid) else {
                continue;
            };
            if formation.faction != occupying || !formation.is_active() {
                continue;
            }
            if !matches!(
                formation.resolved_kind(),
                FormationKind::Brigade | FormationKind::Militia
            ) {
                continue;
            }
            if formation.personnel < config.cleanup_min_personnel {
                continue;
            }
            if clears_used.get(fid).copied().unwrap_or(0) >= config.cleanup_clears_per_formation {
                continue;
            }
            if !can_reach(world, formation, &sid, &occupying) {
                continue;
            }

            let cohesion = formation.cohesion.unwrap_or(config.brigade_base_cohesion);
            let strength = formation.personnel as f64 * cohesion as f64 / 100.0;
            if strength > resistance as f64 * config.cleanup_resistance_factor {
                cleared_by = Some(fid.clone());
                break;
            }
            // Not enough to clear outright: wear the resistance down.
            resistance = (resistance - (strength / 10.0).floor() as i64).max(0);
            worn = true;
        }

        if let Some(fid) = cleared_by {
            *clears_used.entry(fid).or_insert(0) += 1;
            world.holdouts.remove(&sid);
            world.set_controller(sid.clone(), Some(occupying.clone()));
            let municipality = world.settlements.get(&sid).map(|s| s.municipality.clone());
            world.events.push(ControlEvent {
                turn,
                settlement: sid.clone(),
                municipality,
                from: Some(holding),
                to: Some(occupying),
                mechanism: ControlMechanism::HoldoutCleared,
            });
            summary.cleared.push(sid);
        } else {
            if worn {
                summary.worn_down += 1;
            }
            world
                .holdouts
                .get_mut(&sid)
                .expect("holdout survives this pass")
                .resistance = resistance;
        }
    }

    tracing::debug!(
        turn,
        processed = summary.processed,
        cleared = summary.cleared.len(),
        surrendered = summary.surrendered.len(),
        "holdout cleanup pass complete"
    );

    summary
}
