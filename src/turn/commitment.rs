//! Front posture commitment: formation assignments into effective,
//! friction-adjusted posture weight per front edge
//!
//! Intent (base weight) only ever shrinks here: commitment friction scales a
//! faction's desired weight by what its formations can actually back, and an
//! optional command-capacity squeeze rescales everything a faction wants
//! beyond what its command can direct.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::core::config::EngineConfig;
use crate::core::types::{EdgeId, FactionId};
use crate::turn::lifecycle::SupplyMap;
use crate::world::{Assignment, EffectiveAssignment, Posture, WorldState};

/// Per-(faction, edge) commitment audit row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitmentEdgeAudit {
    pub faction: FactionId,
    pub edge: EdgeId,
    pub base_weight: u32,
    /// Integer milli-points (one fully backed formation = 1000)
    pub commit_points: i64,
    /// Commitment over demand, clamped to [0,1]
    pub friction: f64,
    pub effective_weight: u32,
}

/// Per-faction commitment totals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitmentFactionSummary {
    pub faction: FactionId,
    pub formations_active: u32,
    pub assigned_region: u32,
    pub assigned_edge: u32,
    pub total_commit_points: i64,
    pub total_demand_weight: u32,
    pub total_effective_weight: u32,
    pub command_capacity: u32,
    pub capacity_applied: bool,
    /// 1.0 when no capacity squeeze applied
    pub global_factor: f64,
}

/// Report of one commitment step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitmentReport {
    pub by_faction: Vec<CommitmentFactionSummary>,
    pub by_edge: Vec<CommitmentEdgeAudit>,
}

/// Commit contribution of one formation, in milli-points
fn commit_contribution(config: &EngineConfig, fatigue: i32, supplied: bool) -> i64 {
    let base = if supplied {
        config.commit_base_points
    } else {
        config.unsupplied_commit_points
    };
    (base - fatigue.max(0) as i64 * config.fatigue_commit_penalty).max(0)
}

/// Run the commitment step for every faction, in sorted id order
pub fn run_commitment_step(
    world: &mut WorldState,
    config: &EngineConfig,
    supply: &SupplyMap,
) -> CommitmentReport {
    let mut summaries = Vec::new();
    let mut audits = Vec::new();

    for (faction_id, faction) in &world.factions {
        let mut formations_active = 0u32;
        let mut assigned_region = 0u32;
        let mut assigned_edge = 0u32;
        let mut commit_by_edge: BTreeMap<EdgeId, i64> = BTreeMap::new();

        for formation in world.formations.values() {
            if &formation.faction != faction_id || !formation.is_active() {
                continue;
            }
            formations_active += 1;

            let Some(assignment) = &formation.assignment else {
                continue;
            };
            let supplied = supply.get(&formation.id).copied().unwrap_or(true);
            let contribution = commit_contribution(config, formation.fatigue, supplied);

            match assignment {
                Assignment::Edge(edge_id) => {
                    assigned_edge += 1;
                    *commit_by_edge.entry(edge_id.clone()).or_insert(0) += contribution;
                }
                Assignment::Region(region_id) => {
                    assigned_region += 1;
                    // Unknown regions are skipped, not errors.
                    let Some(region) = world.front_regions.get(region_id) else {
                        continue;
                    };
                    if !region.involves(faction_id) {
                        continue;
                    }
                    // Split across the region's currently active edges; the
                    // BTreeSet walk keeps them in lexicographic order.
                    let split_edges: Vec<&EdgeId> = region
                        .edges
                        .iter()
                        .filter(|e| {
                            world
                                .front_edges
                                .get(*e)
                                .map(|edge| edge.active)
                                .unwrap_or(false)
                        })
                        .collect();
                    if split_edges.is_empty() {
                        continue;
                    }

                    let share = contribution / split_edges.len() as i64;
                    let remainder = contribution - share * split_edges.len() as i64;
                    for (index, edge_id) in split_edges.iter().enumerate() {
                        let extra = if (index as i64) < remainder { 1 } else { 0 };
                        *commit_by_edge.entry((*edge_id).clone()).or_insert(0) += share + extra;
                    }
                }
            }
        }

        let empty = BTreeMap::new();
        let base_posture = world.posture.get(faction_id).unwrap_or(&empty);

        // Walk the union of demanded and committed edges, sorted.
        let edge_ids: BTreeSet<EdgeId> = base_posture
            .keys()
            .chain(commit_by_edge.keys())
            .cloned()
            .collect();

        let mut effective: BTreeMap<EdgeId, EffectiveAssignment> = BTreeMap::new();
        let mut total_demand = 0u32;
        let mut total_effective = 0u32;

        for edge_id in &edge_ids {
            let (posture, base_weight) = base_posture
                .get(edge_id)
                .map(|a| (a.posture, a.base_weight))
                .unwrap_or((Posture::Hold, 0));

            // Commitment alone never invents intent.
            if base_weight == 0 {
                effective.insert(
                    edge_id.clone(),
                    EffectiveAssignment {
                        posture,
                        base_weight: 0,
                        effective_weight: 0,
                    },
                );
                continue;
            }

            total_demand += base_weight;
            let commit_points = commit_by_edge.get(edge_id).copied().unwrap_or(0);

            if world.ceasefire.contains(edge_id) {
                effective.insert(
                    edge_id.clone(),
                    EffectiveAssignment {
                        posture,
                        base_weight,
                        effective_weight: 0,
                    },
                );
                audits.push(CommitmentEdgeAudit {
                    faction: faction_id.clone(),
                    edge: edge_id.clone(),
                    base_weight,
                    commit_points,
                    friction: 0.0,
                    effective_weight: 0,
                });
                continue;
            }

            let demand_points = base_weight as i64 * 1000;
            let friction = (commit_points as f64 / demand_points as f64).clamp(0.0, 1.0);
            let effective_weight = (base_weight as f64 * friction).floor() as u32;
            total_effective += effective_weight;

            effective.insert(
                edge_id.clone(),
                EffectiveAssignment {
                    posture,
                    base_weight,
                    effective_weight,
                },
            );
            audits.push(CommitmentEdgeAudit {
                faction: faction_id.clone(),
                edge: edge_id.clone(),
                base_weight,
                commit_points,
                friction,
                effective_weight,
            });
        }

        // Command capacity squeeze: shrink-only global rescale.
        let capacity = faction.command_capacity;
        let mut global_factor = 1.0;
        let mut capacity_applied = false;
        if capacity > 0 && total_demand > capacity {
            global_factor = capacity as f64 / total_demand as f64;
            capacity_applied = true;
            for assignment in effective.values_mut() {
                let old = assignment.effective_weight;
                let new = (old as f64 * global_factor).floor() as u32;
                assignment.effective_weight = new;
                total_effective = total_effective - old + new;
            }
            for audit in audits.iter_mut().filter(|a| &a.faction == faction_id) {
                audit.effective_weight =
                    (audit.effective_weight as f64 * global_factor).floor() as u32;
            }
        }

        let total_commit_points: i64 = commit_by_edge.values().sum();

        summaries.push(CommitmentFactionSummary {
            faction: faction_id.clone(),
            formations_active,
            assigned_region,
            assigned_edge,
            total_commit_points,
            total_demand_weight: total_demand,
            total_effective_weight: total_effective,
            command_capacity: capacity,
            capacity_applied,
            global_factor,
        });

        world.effective_posture.insert(faction_id.clone(), effective);
    }

    // Canonical report order: (faction, edge).
    audits.sort_by(|a, b| (&a.faction, &a.edge).cmp(&(&b.faction, &b.edge)));

    tracing::debug!(
        factions = summaries.len(),
        audited_edges = audits.len(),
        "front posture commitment step complete"
    );

    CommitmentReport {
        by_faction: summaries,
        by_edge: audits,
    }
}
