//! Turn step orchestration
//!
//! One call to [`run_turn`] resolves a full turn against the shared world
//! state: front topology refresh, formation lifecycle, posture commitment,
//! then settlement control. The pass is synchronous and deterministic; the
//! caller owns turn numbering and supplies the external inputs.

pub mod commitment;
pub mod control;
pub mod lifecycle;

use serde::{Deserialize, Serialize};

pub use commitment::{
    run_commitment_step, CommitmentEdgeAudit, CommitmentFactionSummary, CommitmentReport,
};
pub use control::{
    apply_wave_flip, holdout_resistance, run_holdout_cleanup, CleanupSummary, Overrun,
    WaveFlipSummary,
};
pub use lifecycle::{
    base_cohesion, derive_readiness, municipality_authority_map, run_lifecycle_step,
    should_spawn_militia, FactionLifecycleSummary, LifecycleRecord, LifecycleReport, SupplyMap,
};

use crate::core::config::EngineConfig;
use crate::core::types::Turn;
use crate::world::{ControlEvent, WorldState};

/// External inputs to one turn step
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnInputs {
    /// Supply verdict per formation; formations absent from the map count
    /// as supplied
    pub supply: SupplyMap,
    /// Municipality overruns decided by the surrounding combat layer
    pub overruns: Vec<Overrun>,
}

/// Settlement control section of the turn report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlReport {
    pub waves: Vec<WaveFlipSummary>,
    pub cleanup: CleanupSummary,
    /// Control events emitted during this turn, in resolution order
    pub events: Vec<ControlEvent>,
}

/// Aggregated report of one resolved turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnReport {
    pub turn: Turn,
    pub lifecycle: LifecycleReport,
    pub commitment: CommitmentReport,
    pub control: ControlReport,
}

/// Resolve one turn against the world state
pub fn run_turn(world: &mut WorldState, config: &EngineConfig, inputs: &TurnInputs) -> TurnReport {
    let turn = world.turn;
    tracing::info!(turn, "resolving turn");

    world.sync_front_topology();

    let lifecycle = run_lifecycle_step(world, config, &inputs.supply);
    let commitment = run_commitment_step(world, config, &inputs.supply);

    let events_mark = world.events.len();
    let mut overruns = inputs.overruns.clone();
    overruns.sort_by(|a, b| a.municipality.cmp(&b.municipality));

    let mut waves = Vec::new();
    for overrun in &overruns {
        waves.push(apply_wave_flip(world, config, overrun));
    }
    let cleanup = run_holdout_cleanup(world, config);
    let events = world.events.since(events_mark).to_vec();

    tracing::info!(
        turn,
        formations = lifecycle.by_formation.len(),
        control_events = events.len(),
        holdouts_open = world.holdouts.len(),
        "turn resolved"
    );

    TurnReport {
        turn,
        lifecycle,
        commitment,
        control: ControlReport {
            waves,
            cleanup,
            events,
        },
    }
}
