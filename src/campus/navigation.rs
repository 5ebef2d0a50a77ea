//! Campus map and shortest-path routing
//!
//! The map is a weighted undirected graph of named locations. Every edge in
//! the file is walkable both ways; an edge's `direction` text describes the
//! forward walk, and the reverse walk gets a generated instruction.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{Context, Result};
use petgraph::algo::astar;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::intent::fuzzy::{self, FuzzyMatcher};

/// One leg of a route
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteStep {
    pub from: String,
    pub to: String,
    pub instruction: String,
    pub distance: f64,
}

/// Shortest route between two locations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    /// Display names of every stop, origin first
    pub stops: Vec<String>,
    pub steps: Vec<RouteStep>,
    /// Total distance in meters
    pub total_distance: f64,
}

/// Average walking speed in meters per minute
pub const WALKING_METERS_PER_MINUTE: f64 = 80.0;

impl Route {
    /// Estimated walking time, at least one minute for a non-empty route
    pub fn walking_minutes(&self) -> u32 {
        if self.steps.is_empty() {
            return 0;
        }
        ((self.total_distance / WALKING_METERS_PER_MINUTE).round() as u32).max(1)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NavigationError {
    #[error("unknown location: {0}")]
    UnknownLocation(String),

    #[error("no path from {from} to {to}")]
    NoPath { from: String, to: String },
}

/// Routing surface the dispatcher uses
pub trait RouteFinder: Send + Sync {
    /// Resolve a spoken location to a node id
    fn locate(&self, name: &str) -> Option<String>;

    /// Display name of a node id
    fn display_name(&self, id: &str) -> Option<String>;

    /// Display names of every location, for entity extraction
    fn location_names(&self) -> Vec<String>;

    /// Shortest route between two node ids
    fn shortest_path(&self, from: &str, to: &str) -> Result<Route, NavigationError>;
}

#[derive(Debug, Deserialize)]
struct MapFile {
    nodes: BTreeMap<String, NodeSpec>,
    #[serde(default)]
    edges: Vec<EdgeSpec>,
}

#[derive(Debug, Deserialize)]
struct NodeSpec {
    name: String,
}

#[derive(Debug, Deserialize)]
struct EdgeSpec {
    from: String,
    to: String,
    distance: f64,
    #[serde(default)]
    direction: Option<String>,
}

/// Walkable path between two locations; `forward` describes the walk from
/// the endpoint it was declared from
#[derive(Debug, Clone)]
struct Leg {
    distance: f64,
    forward: String,
}

/// In-memory campus graph; node weights are node ids
#[derive(Debug, Clone)]
pub struct CampusMap {
    graph: UnGraph<String, Leg>,
    names: HashMap<NodeIndex, String>,
    index: HashMap<String, NodeIndex>,
    matcher: FuzzyMatcher,
}

impl CampusMap {
    /// Load `campus_map.json`; failure is fatal at startup
    pub fn load(path: &Path, matcher: FuzzyMatcher) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read campus map {}", path.display()))?;
        Self::from_json(&text, matcher)
            .with_context(|| format!("failed to parse campus map {}", path.display()))
    }

    pub fn from_json(text: &str, matcher: FuzzyMatcher) -> Result<Self> {
        let file: MapFile = serde_json::from_str(text)?;

        let mut graph = UnGraph::new_undirected();
        let mut names = HashMap::new();
        let mut index = HashMap::new();
        for (id, node) in file.nodes {
            let idx = graph.add_node(id.clone());
            names.insert(idx, node.name);
            index.insert(id, idx);
        }

        for edge in file.edges {
            let (Some(&from), Some(&to)) = (index.get(&edge.from), index.get(&edge.to)) else {
                warn!(from = %edge.from, to = %edge.to, "skipping edge with unknown endpoint");
                continue;
            };
            if !edge.distance.is_finite() || edge.distance < 0.0 {
                warn!(from = %edge.from, to = %edge.to, distance = edge.distance, "skipping edge with invalid distance");
                continue;
            }

            let forward = edge
                .direction
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| format!("Walk from {} to {}.", names[&from], names[&to]));
            graph.add_edge(
                from,
                to,
                Leg {
                    distance: edge.distance,
                    forward,
                },
            );
        }

        let map = Self {
            graph,
            names,
            index,
            matcher,
        };

        let isolated = map
            .graph
            .node_indices()
            .filter(|&n| map.graph.neighbors(n).next().is_none())
            .count();
        if isolated > 0 && map.len() > 1 {
            warn!(isolated, "campus map has locations with no paths");
        }
        info!(locations = map.len(), paths = map.graph.edge_count(), "campus map loaded");

        Ok(map)
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn node(&self, id: &str) -> Result<NodeIndex, NavigationError> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| NavigationError::UnknownLocation(id.to_string()))
    }

    fn name(&self, node: NodeIndex) -> String {
        self.names.get(&node).cloned().unwrap_or_else(|| self.graph[node].clone())
    }

    /// Node ids and display names in id order
    fn locations(&self) -> Vec<(&str, &str)> {
        let mut locations: Vec<(&str, &str)> = self
            .index
            .iter()
            .map(|(id, idx)| (id.as_str(), self.names.get(idx).map_or(id.as_str(), String::as_str)))
            .collect();
        locations.sort_unstable();
        locations
    }

    /// Spoken instruction for walking `leg` from `from` to `to`
    fn instruction(&self, leg: &Leg, declared_from: NodeIndex, from: NodeIndex, to: NodeIndex) -> String {
        if declared_from == from {
            leg.forward.clone()
        } else {
            format!("Walk from {} towards {}.", self.name(from), self.name(to))
        }
    }
}

impl RouteFinder for CampusMap {
    /// Exact id or name first, then the closest-length substring match, then
    /// the best fuzzy match above the threshold.
    fn locate(&self, name: &str) -> Option<String> {
        let wanted = fuzzy::normalize(name);
        if wanted.is_empty() {
            return None;
        }

        let locations = self.locations();
        if let Some((id, _)) = locations
            .iter()
            .find(|(id, name)| fuzzy::normalize(id) == wanted || fuzzy::normalize(name) == wanted)
        {
            return Some(id.to_string());
        }

        let substring = locations
            .iter()
            .filter(|(_, name)| {
                let candidate = fuzzy::normalize(name);
                candidate.contains(&wanted) || wanted.contains(&candidate)
            })
            .min_by_key(|(_, name)| fuzzy::normalize(name).len().abs_diff(wanted.len()));
        if let Some((id, _)) = substring {
            return Some(id.to_string());
        }

        let names: Vec<&str> = locations.iter().map(|(_, name)| *name).collect();
        let found = self.matcher.find(name, &names)?;
        locations
            .iter()
            .find(|(_, name)| *name == found.value)
            .map(|(id, _)| id.to_string())
    }

    fn display_name(&self, id: &str) -> Option<String> {
        self.index.get(id).map(|&idx| self.name(idx))
    }

    fn location_names(&self) -> Vec<String> {
        self.locations().into_iter().map(|(_, name)| name.to_string()).collect()
    }

    fn shortest_path(&self, from: &str, to: &str) -> Result<Route, NavigationError> {
        let start = self.node(from)?;
        let goal = self.node(to)?;

        let Some((total_distance, path)) = astar(
            &self.graph,
            start,
            |n| n == goal,
            |e| e.weight().distance,
            |_| 0.0,
        ) else {
            return Err(NavigationError::NoPath {
                from: self.name(start),
                to: self.name(goal),
            });
        };

        let mut steps = Vec::with_capacity(path.len().saturating_sub(1));
        for pair in path.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let Some(edge) = self
                .graph
                .edges_connecting(a, b)
                .min_by(|x, y| x.weight().distance.total_cmp(&y.weight().distance))
            else {
                continue;
            };
            let (declared_from, _) = self.graph.edge_endpoints(edge.id()).unwrap_or((a, b));
            steps.push(RouteStep {
                from: self.name(a),
                to: self.name(b),
                instruction: self.instruction(edge.weight(), declared_from, a, b),
                distance: edge.weight().distance,
            });
        }

        Ok(Route {
            stops: path.iter().map(|&n| self.name(n)).collect(),
            steps,
            total_distance,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE_MAP: &str = r#"{
        "nodes": {
            "main_gate": {"name": "Main Gate"},
            "admin_block": {"name": "Admin Block"},
            "library": {"name": "Library"},
            "canteen": {"name": "Canteen"},
            "cs_block": {"name": "Computer Science Block"},
            "boys_hostel": {"name": "Boys Hostel"}
        },
        "edges": [
            {"from": "main_gate", "to": "admin_block", "distance": 100, "direction": "Walk straight ahead to the Admin Block."},
            {"from": "admin_block", "to": "library", "distance": 80, "direction": "Turn left at the Admin Block and continue to the Library."},
            {"from": "main_gate", "to": "canteen", "distance": 150},
            {"from": "canteen", "to": "library", "distance": 200},
            {"from": "library", "to": "cs_block", "distance": 60},
            {"from": "library", "to": "nowhere", "distance": 10}
        ]
    }"#;

    pub(crate) fn sample_map() -> CampusMap {
        CampusMap::from_json(SAMPLE_MAP, FuzzyMatcher::default()).unwrap()
    }

    #[test]
    fn test_unknown_endpoint_edges_are_skipped() {
        let map = sample_map();
        assert_eq!(map.len(), 6);
        assert_eq!(map.graph.edge_count(), 5);
    }

    #[test]
    fn test_shortest_path_prefers_lower_distance() {
        let route = sample_map().shortest_path("main_gate", "library").unwrap();
        assert_eq!(route.stops, ["Main Gate", "Admin Block", "Library"]);
        assert_eq!(route.total_distance, 180.0);
        assert_eq!(route.steps.len(), 2);
        assert_eq!(route.steps[0].instruction, "Walk straight ahead to the Admin Block.");
        assert_eq!(route.walking_minutes(), 2);
    }

    #[test]
    fn test_reverse_edges_get_generated_instructions() {
        let route = sample_map().shortest_path("library", "admin_block").unwrap();
        assert_eq!(route.steps[0].instruction, "Walk from Library towards Admin Block.");
    }

    #[test]
    fn test_same_origin_and_destination() {
        let route = sample_map().shortest_path("library", "library").unwrap();
        assert!(route.steps.is_empty());
        assert_eq!(route.stops, ["Library"]);
        assert_eq!(route.walking_minutes(), 0);
    }

    #[test]
    fn test_disconnected_location_has_no_path() {
        let err = sample_map().shortest_path("main_gate", "boys_hostel").unwrap_err();
        assert_eq!(
            err,
            NavigationError::NoPath {
                from: "Main Gate".to_string(),
                to: "Boys Hostel".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_node_id() {
        let err = sample_map().shortest_path("main_gate", "moon").unwrap_err();
        assert_eq!(err, NavigationError::UnknownLocation("moon".to_string()));
    }

    #[test]
    fn test_locate_cascade() {
        let map = sample_map();
        assert_eq!(map.locate("library").as_deref(), Some("library"));
        assert_eq!(map.locate("main_gate").as_deref(), Some("main_gate"));
        assert_eq!(map.locate("computer science").as_deref(), Some("cs_block"));
        assert_eq!(map.locate("libary").as_deref(), Some("library"));
        assert_eq!(map.locate("swimming pool"), None);
        assert_eq!(map.locate(""), None);
    }

    #[test]
    fn test_malformed_map_is_error() {
        assert!(CampusMap::from_json("{\"edges\": []}", FuzzyMatcher::default()).is_err());
    }
}
