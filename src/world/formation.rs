//! Armed formations and municipal militia pools

use serde::{Deserialize, Serialize};

use crate::core::types::{
    EdgeId, FactionId, FormationId, FrontRegionId, MunicipalityId, SettlementId, Turn,
};

/// Tag prefix carrying a formation's home municipality in legacy data
pub const MUNICIPALITY_TAG_PREFIX: &str = "mun:";

/// Organizational kind of a formation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormationKind {
    Militia,
    TerritorialDefense,
    Brigade,
    OperationalGroup,
    CorpsAsset,
}

impl FormationKind {
    /// Infer a kind from free-form tags, in fixed priority order
    pub fn from_tags(tags: &[String]) -> Option<Self> {
        for (tag, kind) in [
            ("militia", FormationKind::Militia),
            ("territorial_defense", FormationKind::TerritorialDefense),
            ("operational_group", FormationKind::OperationalGroup),
            ("corps_asset", FormationKind::CorpsAsset),
        ] {
            if tags.iter().any(|t| t == tag) {
                return Some(kind);
            }
        }
        None
    }
}

/// Whether a formation still exists as a fighting force
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormationStatus {
    Active,
    Disbanded,
}

/// Operational readiness, derived each turn from cohesion and fatigue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    Forming,
    Active,
    Overextended,
    Degraded,
}

/// Front assignment of a formation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Assignment {
    Region(FrontRegionId),
    Edge(EdgeId),
}

/// An armed formation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Formation {
    pub id: FormationId,
    pub faction: FactionId,
    /// Resolved kind; `None` until the normalization pass has run
    pub kind: Option<FormationKind>,
    pub tags: Vec<String>,
    pub status: FormationStatus,
    pub readiness: Readiness,
    /// `None` until first lifecycle initialization; clamped to [0,100] after
    pub cohesion: Option<i32>,
    pub personnel: u32,
    pub fatigue: i32,
    pub activation_gated: bool,
    /// Turn of first successful activation, stamped once
    pub activation_turn: Option<Turn>,
    pub created_turn: Turn,
    /// Home municipality; `None` until normalization resolves the `mun:` tag
    pub municipality: Option<MunicipalityId>,
    /// Headquarters settlement, used for holdout cleanup reach
    pub hq: Option<SettlementId>,
    pub last_supplied_turn: Option<Turn>,
    pub assignment: Option<Assignment>,
}

impl Formation {
    pub fn new(
        id: impl Into<FormationId>,
        faction: impl Into<FactionId>,
        created_turn: Turn,
    ) -> Self {
        Self {
            id: id.into(),
            faction: faction.into(),
            kind: None,
            tags: Vec::new(),
            status: FormationStatus::Active,
            readiness: Readiness::Forming,
            cohesion: None,
            personnel: 0,
            fatigue: 0,
            activation_gated: false,
            activation_turn: None,
            created_turn,
            municipality: None,
            hq: None,
            last_supplied_turn: None,
            assignment: None,
        }
    }

    pub fn with_kind(mut self, kind: FormationKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_personnel(mut self, personnel: u32) -> Self {
        self.personnel = personnel;
        self
    }

    pub fn with_fatigue(mut self, fatigue: i32) -> Self {
        self.fatigue = fatigue;
        self
    }

    pub fn with_cohesion(mut self, cohesion: i32) -> Self {
        self.cohesion = Some(cohesion);
        self
    }

    pub fn with_municipality(mut self, municipality: impl Into<MunicipalityId>) -> Self {
        self.municipality = Some(municipality.into());
        self
    }

    pub fn with_hq(mut self, hq: impl Into<SettlementId>) -> Self {
        self.hq = Some(hq.into());
        self
    }

    pub fn with_assignment(mut self, assignment: Assignment) -> Self {
        self.assignment = Some(assignment);
        self
    }

    /// One-time normalization: resolve kind and municipality from tags.
    ///
    /// Explicit fields win; tags are only a fallback. After this pass
    /// downstream code never re-infers anything from tags.
    pub fn normalize(&mut self) {
        if self.kind.is_none() {
            self.kind = Some(FormationKind::from_tags(&self.tags).unwrap_or(FormationKind::Brigade));
        }
        if self.municipality.is_none() {
            self.municipality = self
                .tags
                .iter()
                .find_map(|t| t.strip_prefix(MUNICIPALITY_TAG_PREFIX))
                .map(MunicipalityId::from);
        }
    }

    /// Resolved kind; brigade before normalization has run
    pub fn resolved_kind(&self) -> FormationKind {
        self.kind.unwrap_or(FormationKind::Brigade)
    }

    pub fn is_active(&self) -> bool {
        self.status == FormationStatus::Active
    }
}

/// Per-municipality manpower reservoir for raising militia
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilitiaPool {
    pub municipality: MunicipalityId,
    pub faction: Option<FactionId>,
    pub available: u32,
    pub committed: u32,
    pub exhausted: u32,
}

impl MilitiaPool {
    pub fn new(municipality: impl Into<MunicipalityId>, faction: Option<FactionId>) -> Self {
        Self {
            municipality: municipality.into(),
            faction,
            available: 0,
            committed: 0,
            exhausted: 0,
        }
    }

    pub fn with_available(mut self, available: u32) -> Self {
        self.available = available;
        self
    }
}
