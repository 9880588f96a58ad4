//! Formation lifecycle: kind normalization, activation gating, cohesion
//! degradation and readiness derivation
//!
//! Runs first in the turn step so that every active formation carries a
//! current readiness stamp before commitment and control resolution read it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::config::EngineConfig;
use crate::core::hash::gate_hash;
use crate::core::types::{FactionId, FormationId, MunicipalityId, Turn};
use crate::world::{Formation, FormationKind, MilitiaPool, Readiness, WorldState};

/// External supply verdict per formation for the current turn
pub type SupplyMap = BTreeMap<FormationId, bool>;

/// Per-formation lifecycle record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleRecord {
    pub formation: FormationId,
    pub faction: FactionId,
    pub kind: FormationKind,
    pub readiness_before: Readiness,
    pub readiness_after: Readiness,
    pub cohesion_before: i32,
    pub cohesion_after: i32,
    pub activation_gated: bool,
    pub activation_turn: Option<Turn>,
    pub supplied: bool,
}

/// Per-faction lifecycle rollup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactionLifecycleSummary {
    pub faction: FactionId,
    pub total: u32,
    pub forming: u32,
    pub active: u32,
    pub overextended: u32,
    pub degraded: u32,
    pub militia: u32,
    pub brigades: u32,
}

/// Report of one lifecycle step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleReport {
    pub by_formation: Vec<LifecycleRecord>,
    pub by_faction: Vec<FactionLifecycleSummary>,
}

/// Municipality authority derived from political control status
pub fn municipality_authority_map(world: &WorldState) -> BTreeMap<MunicipalityId, f64> {
    world
        .municipalities
        .iter()
        .map(|(id, municipality)| (id.clone(), municipality.control.authority()))
        .collect()
}

/// Starting cohesion for a formation of the given kind.
///
/// Militia raised later in the opening phase start slightly better
/// organized; territorial defense sits midway between militia and brigades.
pub fn base_cohesion(config: &EngineConfig, kind: FormationKind, created_turn: Turn) -> i32 {
    match kind {
        FormationKind::Militia => {
            let lateness = created_turn.min(config.militia_emergence_window) as i32;
            config.militia_base_cohesion + lateness * 2
        }
        FormationKind::TerritorialDefense => {
            (config.militia_base_cohesion + config.brigade_base_cohesion) / 2
        }
        _ => config.brigade_base_cohesion,
    }
}

/// Derive readiness from cohesion, fatigue and the activation gate.
///
/// Priority order, first match wins: degraded, overextended, forming, active.
pub fn derive_readiness(
    config: &EngineConfig,
    cohesion: i32,
    fatigue: i32,
    activation_gated: bool,
) -> Readiness {
    if cohesion < config.degraded_cohesion || fatigue > config.degraded_fatigue {
        Readiness::Degraded
    } else if cohesion < config.overextended_cohesion || fatigue > config.overextended_fatigue {
        Readiness::Overextended
    } else if activation_gated || cohesion < config.active_min_cohesion {
        Readiness::Forming
    } else {
        Readiness::Active
    }
}

/// Whether a forming brigade passes the activation gate this turn
fn can_activate(
    config: &EngineConfig,
    current_turn: Turn,
    formation: &Formation,
    supplied: bool,
    authority: Option<f64>,
) -> bool {
    let age = current_turn.saturating_sub(formation.created_turn);
    if age < config.brigade_formation_min_turns {
        return false;
    }

    if let Some(authority) = authority {
        if authority < config.brigade_authority_threshold {
            return false;
        }
    }

    if supplied {
        return true;
    }
    matches!(
        formation.last_supplied_turn,
        Some(last) if current_turn.saturating_sub(last) <= config.supply_grace_turns
    )
}

fn unsupplied_loss(config: &EngineConfig, kind: FormationKind) -> i32 {
    match kind {
        FormationKind::Militia => config.unsupplied_loss_militia,
        FormationKind::Brigade | FormationKind::TerritorialDefense => config.unsupplied_loss_line,
        FormationKind::OperationalGroup | FormationKind::CorpsAsset => {
            config.unsupplied_loss_corps
        }
    }
}

#[derive(Default)]
struct Tally {
    total: u32,
    forming: u32,
    active: u32,
    overextended: u32,
    degraded: u32,
    militia: u32,
    brigades: u32,
}

/// Run the lifecycle step over every active formation, in sorted id order
pub fn run_lifecycle_step(
    world: &mut WorldState,
    config: &EngineConfig,
    supply: &SupplyMap,
) -> LifecycleReport {
    let current_turn = world.turn;
    let authority = municipality_authority_map(world);

    let mut records = Vec::new();
    let mut tallies: BTreeMap<FactionId, Tally> = BTreeMap::new();

    for formation in world.formations.values_mut() {
        if !formation.is_active() {
            continue;
        }

        formation.normalize();
        let kind = formation.resolved_kind();

        if formation.cohesion.is_none() {
            formation.cohesion = Some(base_cohesion(config, kind, formation.created_turn));
        }
        let cohesion_before = formation.cohesion.unwrap_or(config.brigade_base_cohesion);
        let readiness_before = formation.readiness;
        let supplied = supply.get(&formation.id).copied().unwrap_or(true);

        // Activation gate applies only to brigades still forming.
        if readiness_before == Readiness::Forming && kind == FormationKind::Brigade {
            let mun_authority = formation
                .municipality
                .as_ref()
                .and_then(|m| authority.get(m))
                .copied();
            let activates = can_activate(config, current_turn, formation, supplied, mun_authority);
            formation.activation_gated = !activates;
            if activates && formation.activation_turn.is_none() {
                formation.activation_turn = Some(current_turn);
            }
        } else {
            formation.activation_gated = false;
        }

        let mut cohesion_after = cohesion_before;
        if !supplied {
            cohesion_after -= unsupplied_loss(config, kind);
        }
        cohesion_after = cohesion_after.clamp(0, 100);
        formation.cohesion = Some(cohesion_after);

        formation.readiness =
            derive_readiness(config, cohesion_after, formation.fatigue, formation.activation_gated);

        if supplied {
            formation.last_supplied_turn = Some(current_turn);
        }

        records.push(LifecycleRecord {
            formation: formation.id.clone(),
            faction: formation.faction.clone(),
            kind,
            readiness_before,
            readiness_after: formation.readiness,
            cohesion_before,
            cohesion_after,
            activation_gated: formation.activation_gated,
            activation_turn: formation.activation_turn,
            supplied,
        });

        let tally = tallies.entry(formation.faction.clone()).or_default();
        tally.total += 1;
        match formation.readiness {
            Readiness::Forming => tally.forming += 1,
            Readiness::Active => tally.active += 1,
            Readiness::Overextended => tally.overextended += 1,
            Readiness::Degraded => tally.degraded += 1,
        }
        match kind {
            FormationKind::Militia => tally.militia += 1,
            FormationKind::Brigade => tally.brigades += 1,
            _ => {}
        }
    }

    let by_faction: Vec<FactionLifecycleSummary> = tallies
        .into_iter()
        .map(|(faction, tally)| FactionLifecycleSummary {
            faction,
            total: tally.total,
            forming: tally.forming,
            active: tally.active,
            overextended: tally.overextended,
            degraded: tally.degraded,
            militia: tally.militia,
            brigades: tally.brigades,
        })
        .collect();

    tracing::debug!(
        turn = current_turn,
        formations = records.len(),
        factions = by_faction.len(),
        "formation lifecycle step complete"
    );

    LifecycleReport {
        by_formation: records,
        by_faction,
    }
}

/// Militia emergence gate, queried by the external spawner.
///
/// Unsupplied municipalities pass a deterministic 50% coin derived from the
/// scenario seed, the turn and the municipality id, so replays are identical.
pub fn should_spawn_militia(
    world: &WorldState,
    config: &EngineConfig,
    pool: &MilitiaPool,
    supplied: bool,
) -> bool {
    if world.turn >= config.militia_emergence_window {
        return false;
    }
    if pool.faction.is_none() {
        return false;
    }
    if pool.available < config.militia_spawn_min_manpower {
        return false;
    }
    if !supplied && gate_hash(world.seed, world.turn, pool.municipality.as_str()) % 2 == 0 {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ControlStatus;
    use crate::world::{Faction, Municipality};
    use proptest::prelude::*;

    fn world_with(formations: Vec<Formation>) -> WorldState {
        let mut world = WorldState::new(11);
        world
            .factions
            .insert(FactionId::from("north"), Faction::new("north", "northern"));
        world.municipalities.insert(
            MunicipalityId::from("m-strong"),
            Municipality::new("m-strong", ControlStatus::Consolidated),
        );
        world.municipalities.insert(
            MunicipalityId::from("m-weak"),
            Municipality::new("m-weak", ControlStatus::Fragmented),
        );
        for formation in formations {
            world.formations.insert(formation.id.clone(), formation);
        }
        world
    }

    fn supplied_none() -> SupplyMap {
        SupplyMap::new()
    }

    #[test]
    fn test_readiness_priority_order() {
        let config = EngineConfig::default();
        // Degraded beats everything, even with zero fatigue.
        assert_eq!(derive_readiness(&config, 10, 0, false), Readiness::Degraded);
        // Fatigue rule fires before the cohesion-based active check.
        assert_eq!(
            derive_readiness(&config, 50, 25, false),
            Readiness::Overextended
        );
        assert_eq!(derive_readiness(&config, 35, 0, false), Readiness::Forming);
        assert_eq!(derive_readiness(&config, 45, 0, true), Readiness::Forming);
        assert_eq!(derive_readiness(&config, 45, 0, false), Readiness::Active);
        assert_eq!(derive_readiness(&config, 50, 41, true), Readiness::Degraded);
    }

    #[test]
    fn test_readiness_priority_exhaustive() {
        let config = EngineConfig::default();
        for cohesion in 0..=100 {
            for fatigue in 0..=50 {
                for gated in [false, true] {
                    let readiness = derive_readiness(&config, cohesion, fatigue, gated);
                    let expected = if cohesion < 15 || fatigue > 40 {
                        Readiness::Degraded
                    } else if cohesion < 30 || fatigue > 20 {
                        Readiness::Overextended
                    } else if gated || cohesion < 40 {
                        Readiness::Forming
                    } else {
                        Readiness::Active
                    };
                    assert_eq!(readiness, expected, "cohesion={cohesion} fatigue={fatigue} gated={gated}");
                }
            }
        }
    }

    #[test]
    fn test_base_cohesion_by_kind() {
        let config = EngineConfig::default();
        assert_eq!(base_cohesion(&config, FormationKind::Militia, 0), 30);
        assert_eq!(base_cohesion(&config, FormationKind::Militia, 4), 38);
        // Lateness caps at the emergence window.
        assert_eq!(base_cohesion(&config, FormationKind::Militia, 9), 42);
        assert_eq!(
            base_cohesion(&config, FormationKind::TerritorialDefense, 0),
            45
        );
        assert_eq!(base_cohesion(&config, FormationKind::Brigade, 0), 60);
        assert_eq!(base_cohesion(&config, FormationKind::CorpsAsset, 3), 60);
    }

    #[test]
    fn test_cohesion_initialized_once() {
        let config = EngineConfig::default();
        let mut world = world_with(vec![
            Formation::new("f1", "north", 0).with_kind(FormationKind::Brigade),
            Formation::new("f2", "north", 0)
                .with_kind(FormationKind::Brigade)
                .with_cohesion(77),
        ]);
        let report = run_lifecycle_step(&mut world, &config, &supplied_none());
        assert_eq!(report.by_formation[0].cohesion_before, 60);
        assert_eq!(report.by_formation[1].cohesion_before, 77);
    }

    #[test]
    fn test_unsupplied_degradation_rates_and_clamp() {
        let config = EngineConfig::default();
        let mut world = world_with(vec![
            Formation::new("f-bde", "north", 0)
                .with_kind(FormationKind::Brigade)
                .with_cohesion(50),
            Formation::new("f-mil", "north", 0)
                .with_kind(FormationKind::Militia)
                .with_cohesion(2),
            Formation::new("f-og", "north", 0)
                .with_kind(FormationKind::OperationalGroup)
                .with_cohesion(50),
        ]);
        let supply: SupplyMap = [
            (FormationId::from("f-bde"), false),
            (FormationId::from("f-mil"), false),
            (FormationId::from("f-og"), false),
        ]
        .into();

        let report = run_lifecycle_step(&mut world, &config, &supply);
        let cohesion_of = |id: &str| {
            report
                .by_formation
                .iter()
                .find(|r| r.formation.as_str() == id)
                .unwrap()
                .cohesion_after
        };
        assert_eq!(cohesion_of("f-bde"), 48);
        // Militia lose 3 but clamp at zero.
        assert_eq!(cohesion_of("f-mil"), 0);
        assert_eq!(cohesion_of("f-og"), 49);
    }

    #[test]
    fn test_supplied_cohesion_unchanged() {
        let config = EngineConfig::default();
        let mut world = world_with(vec![Formation::new("f1", "north", 0)
            .with_kind(FormationKind::Militia)
            .with_cohesion(33)]);
        let report = run_lifecycle_step(&mut world, &config, &supplied_none());
        assert_eq!(report.by_formation[0].cohesion_after, 33);
    }

    #[test]
    fn test_brigade_activation_gate_requires_age() {
        let config = EngineConfig::default();
        let mut world = world_with(vec![Formation::new("f1", "north", 0)
            .with_kind(FormationKind::Brigade)
            .with_cohesion(60)]);
        world.turn = 2;
        let report = run_lifecycle_step(&mut world, &config, &supplied_none());
        assert!(report.by_formation[0].activation_gated);
        assert_eq!(report.by_formation[0].readiness_after, Readiness::Forming);

        world.turn = 3;
        let report = run_lifecycle_step(&mut world, &config, &supplied_none());
        assert!(!report.by_formation[0].activation_gated);
        assert_eq!(report.by_formation[0].activation_turn, Some(3));
        assert_eq!(report.by_formation[0].readiness_after, Readiness::Active);
    }

    #[test]
    fn test_brigade_activation_gate_blocks_on_low_authority() {
        let config = EngineConfig::default();
        let mut world = world_with(vec![Formation::new("f1", "north", 0)
            .with_kind(FormationKind::Brigade)
            .with_cohesion(60)
            .with_municipality("m-weak")]);
        world.turn = 5;
        let report = run_lifecycle_step(&mut world, &config, &supplied_none());
        // Fragmented municipality: authority 0.2 < 0.4.
        assert!(report.by_formation[0].activation_gated);

        world
            .formations
            .get_mut(&FormationId::from("f1"))
            .unwrap()
            .municipality = Some(MunicipalityId::from("m-strong"));
        let report = run_lifecycle_step(&mut world, &config, &supplied_none());
        assert!(!report.by_formation[0].activation_gated);
    }

    #[test]
    fn test_brigade_activation_supply_grace() {
        let config = EngineConfig::default();
        let mut formation = Formation::new("f1", "north", 0)
            .with_kind(FormationKind::Brigade)
            .with_cohesion(60);
        formation.last_supplied_turn = Some(3);
        let mut world = world_with(vec![formation]);
        world.turn = 5;
        let supply: SupplyMap = [(FormationId::from("f1"), false)].into();

        // Last supplied 2 turns ago: within grace.
        let report = run_lifecycle_step(&mut world, &config, &supply);
        assert!(!report.by_formation[0].activation_gated);

        let mut stale = Formation::new("f2", "north", 0)
            .with_kind(FormationKind::Brigade)
            .with_cohesion(60);
        stale.last_supplied_turn = Some(1);
        let mut world = world_with(vec![stale]);
        world.turn = 5;
        let supply: SupplyMap = [(FormationId::from("f2"), false)].into();
        let report = run_lifecycle_step(&mut world, &config, &supply);
        assert!(report.by_formation[0].activation_gated);
    }

    #[test]
    fn test_activation_turn_stamped_once() {
        let config = EngineConfig::default();
        let mut world = world_with(vec![Formation::new("f1", "north", 0)
            .with_kind(FormationKind::Brigade)
            .with_cohesion(60)]);
        world.turn = 4;
        run_lifecycle_step(&mut world, &config, &supplied_none());
        world.turn = 9;
        // Force back to forming so the gate is re-evaluated.
        {
            let formation = world.formations.get_mut(&FormationId::from("f1")).unwrap();
            formation.readiness = Readiness::Forming;
        }
        run_lifecycle_step(&mut world, &config, &supplied_none());
        assert_eq!(
            world.formations[&FormationId::from("f1")].activation_turn,
            Some(4)
        );
    }

    #[test]
    fn test_disbanded_formations_skipped() {
        let config = EngineConfig::default();
        let mut formation = Formation::new("f1", "north", 0).with_kind(FormationKind::Brigade);
        formation.status = crate::world::FormationStatus::Disbanded;
        let mut world = world_with(vec![formation]);
        let report = run_lifecycle_step(&mut world, &config, &supplied_none());
        assert!(report.by_formation.is_empty());
        assert!(report.by_faction.is_empty());
    }

    #[test]
    fn test_faction_rollup_counts() {
        let config = EngineConfig::default();
        let mut world = world_with(vec![
            Formation::new("f1", "north", 0)
                .with_kind(FormationKind::Brigade)
                .with_cohesion(60),
            Formation::new("f2", "north", 0)
                .with_kind(FormationKind::Militia)
                .with_cohesion(10),
            Formation::new("f3", "north", 0)
                .with_kind(FormationKind::OperationalGroup)
                .with_cohesion(25),
        ]);
        world.turn = 5;
        let report = run_lifecycle_step(&mut world, &config, &supplied_none());
        assert_eq!(report.by_faction.len(), 1);
        let summary = &report.by_faction[0];
        assert_eq!(summary.total, 3);
        assert_eq!(summary.active, 1);
        assert_eq!(summary.degraded, 1);
        assert_eq!(summary.overextended, 1);
        assert_eq!(summary.militia, 1);
        assert_eq!(summary.brigades, 1);
    }

    #[test]
    fn test_militia_emergence_window() {
        let config = EngineConfig::default();
        let pool = MilitiaPool::new("m1", Some(FactionId::from("north"))).with_available(500);
        let mut world = WorldState::new(11);
        world.turn = 5;
        assert!(should_spawn_militia(&world, &config, &pool, true));
        world.turn = 6;
        assert!(!should_spawn_militia(&world, &config, &pool, true));
    }

    #[test]
    fn test_militia_emergence_requires_faction_and_manpower() {
        let config = EngineConfig::default();
        let world = WorldState::new(11);
        let orphan = MilitiaPool::new("m1", None).with_available(500);
        assert!(!should_spawn_militia(&world, &config, &orphan, true));
        let thin = MilitiaPool::new("m1", Some(FactionId::from("north"))).with_available(99);
        assert!(!should_spawn_militia(&world, &config, &thin, true));
    }

    #[test]
    fn test_militia_emergence_unsupplied_gate_is_deterministic() {
        let config = EngineConfig::default();
        let mut world = WorldState::new(11);
        world.turn = 2;
        let pool = MilitiaPool::new("m1", Some(FactionId::from("north"))).with_available(500);

        let expected = gate_hash(11, 2, "m1") % 2 == 1;
        let first = should_spawn_militia(&world, &config, &pool, false);
        let second = should_spawn_militia(&world, &config, &pool, false);
        assert_eq!(first, expected);
        assert_eq!(first, second);
    }

    proptest! {
        #[test]
        fn prop_cohesion_stays_in_bounds(
            cohesion in 0i32..=100,
            fatigue in 0i32..=60,
            supplied: bool,
            kind_index in 0usize..5,
        ) {
            let kinds = [
                FormationKind::Militia,
                FormationKind::TerritorialDefense,
                FormationKind::Brigade,
                FormationKind::OperationalGroup,
                FormationKind::CorpsAsset,
            ];
            let config = EngineConfig::default();
            let mut world = world_with(vec![Formation::new("f1", "north", 0)
                .with_kind(kinds[kind_index])
                .with_cohesion(cohesion)
                .with_fatigue(fatigue)]);
            world.turn = 4;
            let supply: SupplyMap = [(FormationId::from("f1"), supplied)].into();

            let report = run_lifecycle_step(&mut world, &config, &supply);
            let record = &report.by_formation[0];
            prop_assert!((0..=100).contains(&record.cohesion_after));
            let expected = derive_readiness(
                &config,
                record.cohesion_after,
                fatigue,
                record.activation_gated,
            );
            prop_assert_eq!(record.readiness_after, expected);
        }
    }
}
