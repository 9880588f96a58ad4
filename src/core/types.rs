//! Core identifier and enum types used throughout the engine
//!
//! All identifiers wrap strings and order lexicographically: every observable
//! iteration in the turn step walks sorted identifiers, so `Ord` on these
//! newtypes is load-bearing for replay determinism.

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

string_id!(
    /// A political/military side controlling settlements and formations
    FactionId
);

string_id!(
    /// A single populated place on the map
    SettlementId
);

string_id!(
    /// An administrative municipality grouping settlements
    MunicipalityId
);

string_id!(
    /// An armed formation (militia, brigade, corps asset, ...)
    FormationId
);

string_id!(
    /// A front segment between two adjacent settlements held by different factions
    EdgeId
);

string_id!(
    /// A cluster of contiguous front edges between the same faction pair
    FrontRegionId
);

/// Simulation turn counter
pub type Turn = u32;

/// Political control status of a municipality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlStatus {
    Consolidated,
    Contested,
    Fragmented,
}

impl ControlStatus {
    /// Authority value used by the brigade activation gate
    pub fn authority(self) -> f64 {
        match self {
            ControlStatus::Consolidated => 1.0,
            ControlStatus::Contested => 0.5,
            ControlStatus::Fragmented => 0.2,
        }
    }
}
