//! Engine configuration with documented tunables
//!
//! All numeric thresholds of the three turn-step systems are collected here.
//! The config is a plain value threaded explicitly into every system call;
//! there is no global accessor.

use serde::{Deserialize, Serialize};

use crate::core::error::{EngineError, Result};

/// Tunables for the turn resolution engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === FORMATION LIFECYCLE ===
    /// Number of opening war turns during which militia pools may spawn
    pub militia_emergence_window: u32,

    /// Starting cohesion for militia formations
    ///
    /// Later-raised militia start slightly higher: +2 per turn of war
    /// already elapsed at creation, capped by the emergence window.
    pub militia_base_cohesion: i32,

    /// Starting cohesion for brigades, operational groups and corps assets
    pub brigade_base_cohesion: i32,

    /// Turns a brigade must exist before it may pass the activation gate
    pub brigade_formation_min_turns: u32,

    /// Minimum municipality authority for brigade activation, in [0,1]
    pub brigade_authority_threshold: f64,

    /// Turns since last resupply that still satisfy the activation supply gate
    pub supply_grace_turns: u32,

    /// Cohesion at or above which an ungated formation counts as active
    pub active_min_cohesion: i32,

    /// Cohesion below which a formation is overextended
    pub overextended_cohesion: i32,

    /// Cohesion below which a formation is degraded
    pub degraded_cohesion: i32,

    /// Fatigue above which a formation is overextended
    pub overextended_fatigue: i32,

    /// Fatigue above which a formation is degraded
    pub degraded_fatigue: i32,

    /// Per-turn cohesion loss for unsupplied militia
    pub unsupplied_loss_militia: i32,

    /// Per-turn cohesion loss for unsupplied brigades and territorial defense
    pub unsupplied_loss_line: i32,

    /// Per-turn cohesion loss for unsupplied operational groups / corps assets
    pub unsupplied_loss_corps: i32,

    /// Minimum available pool manpower for the militia emergence gate
    pub militia_spawn_min_manpower: u32,

    // === FRONT POSTURE COMMITMENT ===
    /// Commit contribution of one supplied formation, in milli-points
    pub commit_base_points: i64,

    /// Commit contribution of an unsupplied formation, in milli-points
    pub unsupplied_commit_points: i64,

    /// Milli-points deducted from a formation's contribution per fatigue point
    pub fatigue_commit_penalty: i64,

    // === SETTLEMENT CONTROL ===
    /// Minimum attacker ethnic share for an immediate wave flip, in [0,1]
    pub wave_flip_ethnic_threshold: f64,

    /// Resistance contributed per full hostile population share
    pub resistance_base_factor: f64,

    /// Cap on the log-population term of the holdout resistance scale
    pub resistance_population_cap: f64,

    /// Cap on the adjacency-degree term of the holdout resistance scale
    pub resistance_proximity_cap: f64,

    /// Holdouts a single formation may clear per turn
    pub cleanup_clears_per_formation: u32,

    /// Consecutive unsupplied turns after which a holdout surrenders
    pub isolation_surrender_turns: u32,

    /// Minimum personnel for a formation to take part in holdout cleanup
    pub cleanup_min_personnel: u32,

    /// Fraction of resistance a formation's strength must exceed to clear
    pub cleanup_resistance_factor: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            // Lifecycle
            militia_emergence_window: 6,
            militia_base_cohesion: 30,
            brigade_base_cohesion: 60,
            brigade_formation_min_turns: 3,
            brigade_authority_threshold: 0.4,
            supply_grace_turns: 2,
            active_min_cohesion: 40,
            overextended_cohesion: 30,
            degraded_cohesion: 15,
            overextended_fatigue: 20,
            degraded_fatigue: 40,
            unsupplied_loss_militia: 3,
            unsupplied_loss_line: 2,
            unsupplied_loss_corps: 1,
            militia_spawn_min_manpower: 100,

            // Commitment
            commit_base_points: 1000,
            unsupplied_commit_points: 500,
            fatigue_commit_penalty: 50,

            // Control
            wave_flip_ethnic_threshold: 0.30,
            resistance_base_factor: 100.0,
            resistance_population_cap: 1.5,
            resistance_proximity_cap: 0.5,
            cleanup_clears_per_formation: 2,
            isolation_surrender_turns: 4,
            cleanup_min_personnel: 100,
            cleanup_resistance_factor: 0.5,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML; absent keys keep their defaults
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(raw)?;
        config
            .validate()
            .map_err(EngineError::Config)?;
        Ok(config)
    }

    /// Load a config from a TOML file
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Validate internal consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(self.degraded_cohesion < self.overextended_cohesion
            && self.overextended_cohesion < self.active_min_cohesion)
        {
            return Err(format!(
                "cohesion thresholds must be ordered: degraded ({}) < overextended ({}) < active ({})",
                self.degraded_cohesion, self.overextended_cohesion, self.active_min_cohesion
            ));
        }

        if self.overextended_fatigue >= self.degraded_fatigue {
            return Err(format!(
                "overextended_fatigue ({}) must be < degraded_fatigue ({})",
                self.overextended_fatigue, self.degraded_fatigue
            ));
        }

        if !(0.0..=1.0).contains(&self.wave_flip_ethnic_threshold) {
            return Err(format!(
                "wave_flip_ethnic_threshold ({}) must be in [0,1]",
                self.wave_flip_ethnic_threshold
            ));
        }

        if !(0.0..=1.0).contains(&self.brigade_authority_threshold) {
            return Err(format!(
                "brigade_authority_threshold ({}) must be in [0,1]",
                self.brigade_authority_threshold
            ));
        }

        if self.unsupplied_commit_points > self.commit_base_points {
            return Err(format!(
                "unsupplied_commit_points ({}) must be <= commit_base_points ({})",
                self.unsupplied_commit_points, self.commit_base_points
            ));
        }

        if self.commit_base_points < 0 || self.fatigue_commit_penalty < 0 {
            return Err("commit point values must be non-negative".into());
        }

        if self.isolation_surrender_turns == 0 {
            return Err("isolation_surrender_turns must be >= 1".into());
        }

        if self.cleanup_resistance_factor <= 0.0 {
            return Err("cleanup_resistance_factor must be positive".into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_unordered_cohesion_thresholds_rejected() {
        let config = EngineConfig {
            degraded_cohesion: 35,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_overrides_single_field() {
        let config = EngineConfig::from_toml_str("isolation_surrender_turns = 6").unwrap();
        assert_eq!(config.isolation_surrender_turns, 6);
        assert_eq!(config.militia_emergence_window, 6);
    }

    #[test]
    fn test_toml_invalid_values_rejected() {
        let result = EngineConfig::from_toml_str("wave_flip_ethnic_threshold = 1.5");
        assert!(result.is_err());
    }
}
