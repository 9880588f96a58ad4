//! Settlements, municipalities and the settlement adjacency graph

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::types::{ControlStatus, MunicipalityId, SettlementId};

/// A single populated place with its census data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    pub id: SettlementId,
    pub municipality: MunicipalityId,
    pub population: u32,
    /// Ethnicity key -> population share; shares sum to <= 1
    pub composition: BTreeMap<String, f64>,
}

impl Settlement {
    pub fn new(
        id: impl Into<SettlementId>,
        municipality: impl Into<MunicipalityId>,
        population: u32,
    ) -> Self {
        Self {
            id: id.into(),
            municipality: municipality.into(),
            population,
            composition: BTreeMap::new(),
        }
    }

    pub fn with_share(mut self, ethnicity: impl Into<String>, share: f64) -> Self {
        self.composition.insert(ethnicity.into(), share);
        self
    }

    /// Population share of an ethnicity, 0.0 when absent from the census
    pub fn share(&self, ethnicity: &str) -> f64 {
        self.composition.get(ethnicity).copied().unwrap_or(0.0)
    }
}

/// An administrative municipality
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Municipality {
    pub id: MunicipalityId,
    pub control: ControlStatus,
}

impl Municipality {
    pub fn new(id: impl Into<MunicipalityId>, control: ControlStatus) -> Self {
        Self {
            id: id.into(),
            control,
        }
    }
}

/// Undirected settlement adjacency graph.
///
/// Edges are stored canonically (smaller id first, sorted, deduplicated) and
/// neighbor lists are sorted, so traversal order never depends on insertion
/// order. Serializes as the canonical edge list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<(SettlementId, SettlementId)>")]
#[serde(into = "Vec<(SettlementId, SettlementId)>")]
pub struct SettlementGraph {
    edges: Vec<(SettlementId, SettlementId)>,
    adjacency: AHashMap<SettlementId, Vec<SettlementId>>,
}

impl SettlementGraph {
    pub fn new(raw_edges: Vec<(SettlementId, SettlementId)>) -> Self {
        let mut edges: Vec<(SettlementId, SettlementId)> = raw_edges
            .into_iter()
            .filter(|(a, b)| a != b)
            .map(|(a, b)| if a <= b { (a, b) } else { (b, a) })
            .collect();
        edges.sort();
        edges.dedup();

        let mut adjacency: AHashMap<SettlementId, Vec<SettlementId>> = AHashMap::new();
        for (a, b) in &edges {
            adjacency.entry(a.clone()).or_default().push(b.clone());
            adjacency.entry(b.clone()).or_default().push(a.clone());
        }
        for neighbors in adjacency.values_mut() {
            neighbors.sort();
        }

        Self { edges, adjacency }
    }

    /// Canonical edge list (smaller endpoint first, sorted)
    pub fn edges(&self) -> &[(SettlementId, SettlementId)] {
        &self.edges
    }

    /// Sorted neighbors of a settlement; empty for unknown ids
    pub fn neighbors(&self, id: &SettlementId) -> &[SettlementId] {
        self.adjacency.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of adjacency edges touching a settlement
    pub fn degree(&self, id: &SettlementId) -> usize {
        self.neighbors(id).len()
    }
}

impl From<Vec<(SettlementId, SettlementId)>> for SettlementGraph {
    fn from(edges: Vec<(SettlementId, SettlementId)>) -> Self {
        Self::new(edges)
    }
}

impl From<SettlementGraph> for Vec<(SettlementId, SettlementId)> {
    fn from(graph: SettlementGraph) -> Self {
        graph.edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid(s: &str) -> SettlementId {
        SettlementId::from(s)
    }

    #[test]
    fn test_graph_canonicalizes_edges() {
        let graph = SettlementGraph::new(vec![
            (sid("b"), sid("a")),
            (sid("a"), sid("b")),
            (sid("c"), sid("c")),
        ]);
        assert_eq!(graph.edges(), &[(sid("a"), sid("b"))]);
    }

    #[test]
    fn test_neighbors_are_sorted() {
        let graph = SettlementGraph::new(vec![
            (sid("m"), sid("z")),
            (sid("m"), sid("a")),
            (sid("m"), sid("k")),
        ]);
        assert_eq!(graph.neighbors(&sid("m")), &[sid("a"), sid("k"), sid("z")]);
        assert_eq!(graph.degree(&sid("m")), 3);
    }

    #[test]
    fn test_unknown_settlement_has_no_neighbors() {
        let graph = SettlementGraph::new(vec![(sid("a"), sid("b"))]);
        assert!(graph.neighbors(&sid("x")).is_empty());
        assert_eq!(graph.degree(&sid("x")), 0);
    }

    #[test]
    fn test_graph_serde_roundtrip() {
        let graph = SettlementGraph::new(vec![(sid("b"), sid("a")), (sid("b"), sid("c"))]);
        let json = serde_json::to_string(&graph).unwrap();
        let back: SettlementGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(back.edges(), graph.edges());
        assert_eq!(back.neighbors(&sid("b")), graph.neighbors(&sid("b")));
    }

    #[test]
    fn test_settlement_share_defaults_to_zero() {
        let settlement = Settlement::new("s1", "m1", 500).with_share("northern", 0.6);
        assert_eq!(settlement.share("northern"), 0.6);
        assert_eq!(settlement.share("southern"), 0.0);
    }
}
