//! Control-change event log

use serde::{Deserialize, Serialize};

use crate::core::types::{FactionId, MunicipalityId, SettlementId, Turn};

/// How a settlement's control record changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMechanism {
    WaveFlip,
    HoldoutCreated,
    HoldoutCleared,
    HoldoutSurrendered,
}

/// A discrete settlement control-change event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlEvent {
    pub turn: Turn,
    pub settlement: SettlementId,
    pub municipality: Option<MunicipalityId>,
    pub from: Option<FactionId>,
    pub to: Option<FactionId>,
    pub mechanism: ControlMechanism,
}

/// Append-only log of control events, in resolution order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<ControlEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: ControlEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[ControlEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events appended at or after a previously recorded length
    pub fn since(&self, mark: usize) -> &[ControlEvent] {
        &self.events[mark.min(self.events.len())..]
    }
}
