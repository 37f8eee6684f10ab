//! Prerequisite graph data structure.
//!
//! # Responsibility
//! - Store skills in fetch order with set-backed prerequisite lists.
//! - Maintain a reverse (dependents) index alongside the forward lists.
//! - Provide the primitive edge mutations used by edit sessions.
//!
//! # Invariants
//! - `b ∈ prerequisites(a)` iff `a ∈ dependents(b)`.
//! - A prerequisite list holds each id at most once and keeps insertion order.
//! - Both endpoints of every edge are nodes of this model.

use crate::graph::cycle::topological_order;
use crate::model::skill::{SkillId, SkillNode};
use log::warn;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors raised while building a graph from fetched nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphBuildError {
    /// A fetched node has an empty id.
    EmptyId,
    /// Two fetched nodes share one id.
    DuplicateNode(SkillId),
    /// A node lists itself as prerequisite.
    SelfPrerequisite(SkillId),
    /// A node references an id missing from the same batch.
    DanglingPrerequisite {
        node_id: SkillId,
        prerequisite_id: SkillId,
    },
    /// Fetched edges already contain a cycle through these nodes.
    CycleInSource(Vec<SkillId>),
}

impl Display for GraphBuildError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "skill id must not be empty"),
            Self::DuplicateNode(id) => write!(f, "duplicate skill id in scope: {id}"),
            Self::SelfPrerequisite(id) => write!(f, "skill lists itself as prerequisite: {id}"),
            Self::DanglingPrerequisite {
                node_id,
                prerequisite_id,
            } => write!(
                f,
                "skill {node_id} references prerequisite {prerequisite_id} outside the loaded scope"
            ),
            Self::CycleInSource(ids) => {
                write!(f, "prerequisite cycle in source data: {}", ids.join(", "))
            }
        }
    }
}

impl Error for GraphBuildError {}

/// Insertion-ordered id set.
#[derive(Debug, Clone, Default)]
pub(crate) struct PrerequisiteSet {
    order: Vec<SkillId>,
    members: HashSet<SkillId>,
}

impl PrerequisiteSet {
    fn insert(&mut self, id: &str) -> bool {
        if !self.members.insert(id.to_string()) {
            return false;
        }
        self.order.push(id.to_string());
        true
    }

    fn remove(&mut self, id: &str) -> bool {
        if !self.members.remove(id) {
            return false;
        }
        self.order.retain(|value| value != id);
        true
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.members.contains(id)
    }

    pub(crate) fn as_slice(&self) -> &[SkillId] {
        &self.order
    }

    /// Order-insensitive comparison against a plain id list.
    pub(crate) fn same_members(&self, other: &[SkillId]) -> bool {
        let other: HashSet<&str> = other.iter().map(String::as_str).collect();
        other.len() == self.members.len() && other.iter().all(|id| self.members.contains(*id))
    }
}

#[derive(Debug, Clone)]
struct SkillEntry {
    position: usize,
    name: String,
    difficulty: Option<u32>,
    prerequisites: PrerequisiteSet,
}

/// In-memory prerequisite graph for one scope.
#[derive(Debug, Clone, Default)]
pub struct GraphModel {
    order: Vec<SkillId>,
    entries: HashMap<SkillId, SkillEntry>,
    dependents: HashMap<SkillId, BTreeSet<SkillId>>,
}

impl GraphModel {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from fetched nodes.
    ///
    /// # Errors
    /// - A node has an empty id, or two nodes share one id. Other id and
    ///   name rules apply only when skills are created.
    /// - A node lists itself or an id outside `nodes` as prerequisite.
    /// - The fetched edges already form a cycle.
    pub fn from_nodes(nodes: Vec<SkillNode>) -> Result<Self, GraphBuildError> {
        let mut model = Self::new();
        for node in &nodes {
            if node.id.is_empty() {
                return Err(GraphBuildError::EmptyId);
            }
            if model.entries.contains_key(&node.id) {
                return Err(GraphBuildError::DuplicateNode(node.id.clone()));
            }
            model.order.push(node.id.clone());
            model.entries.insert(
                node.id.clone(),
                SkillEntry {
                    position: model.order.len() - 1,
                    name: node.name.clone(),
                    difficulty: node.difficulty,
                    prerequisites: PrerequisiteSet::default(),
                },
            );
        }

        for node in &nodes {
            for prerequisite in node.prerequisites() {
                if *prerequisite == node.id {
                    return Err(GraphBuildError::SelfPrerequisite(node.id.clone()));
                }
                if !model.entries.contains_key(prerequisite) {
                    return Err(GraphBuildError::DanglingPrerequisite {
                        node_id: node.id.clone(),
                        prerequisite_id: prerequisite.clone(),
                    });
                }
                if !model.add_edge(prerequisite, &node.id) {
                    warn!(
                        "event=graph_build module=graph status=duplicate_edge node_id={} prerequisite_id={}",
                        node.id, prerequisite
                    );
                }
            }
        }

        topological_order(&model).map_err(GraphBuildError::CycleInSource)?;
        Ok(model)
    }

    /// Inserts `prerequisite` into `dependent`'s prerequisite set.
    ///
    /// Returns `false` without mutating when the edge already exists, when
    /// both ends are the same node, or when either end is unknown. Cycle
    /// checks are the caller's job.
    pub fn add_edge(&mut self, prerequisite: &str, dependent: &str) -> bool {
        if prerequisite == dependent || !self.entries.contains_key(prerequisite) {
            return false;
        }
        let Some(entry) = self.entries.get_mut(dependent) else {
            return false;
        };
        if !entry.prerequisites.insert(prerequisite) {
            return false;
        }
        self.dependents
            .entry(prerequisite.to_string())
            .or_default()
            .insert(dependent.to_string());
        true
    }

    /// Removes `prerequisite` from `dependent`'s prerequisite set.
    ///
    /// Returns whether an edge was removed.
    pub fn remove_edge(&mut self, prerequisite: &str, dependent: &str) -> bool {
        let Some(entry) = self.entries.get_mut(dependent) else {
            return false;
        };
        if !entry.prerequisites.remove(prerequisite) {
            return false;
        }
        if let Some(dependents) = self.dependents.get_mut(prerequisite) {
            dependents.remove(dependent);
            if dependents.is_empty() {
                self.dependents.remove(prerequisite);
            }
        }
        true
    }

    /// Removes every edge touching `node_id`.
    ///
    /// Returns ids whose prerequisite sets changed, in load order.
    pub fn detach(&mut self, node_id: &str) -> Vec<SkillId> {
        let mut changed = Vec::new();

        let own: Vec<SkillId> = self.prerequisites(node_id).to_vec();
        for prerequisite in &own {
            self.remove_edge(prerequisite, node_id);
        }
        if !own.is_empty() {
            changed.push(node_id.to_string());
        }

        let dependents: Vec<SkillId> = self.dependents(node_id).cloned().collect();
        for dependent in dependents {
            if self.remove_edge(node_id, &dependent) {
                changed.push(dependent);
            }
        }

        changed.sort_by_key(|id| self.position(id));
        changed
    }

    /// Returns `true` when the node is part of this graph.
    pub fn contains(&self, node_id: &str) -> bool {
        self.entries.contains_key(node_id)
    }

    /// Returns `true` when `dependent` directly requires `prerequisite`.
    pub fn has_edge(&self, prerequisite: &str, dependent: &str) -> bool {
        self.entries
            .get(dependent)
            .is_some_and(|entry| entry.prerequisites.contains(prerequisite))
    }

    /// Prerequisites of one node in insertion order; empty for unknown ids.
    pub fn prerequisites(&self, node_id: &str) -> &[SkillId] {
        self.entries
            .get(node_id)
            .map(|entry| entry.prerequisites.as_slice())
            .unwrap_or(&[])
    }

    /// Alias of [`GraphModel::prerequisites`].
    pub fn neighbors(&self, node_id: &str) -> &[SkillId] {
        self.prerequisites(node_id)
    }

    /// Nodes that directly require `node_id`, ordered by id.
    pub fn dependents<'a>(&'a self, node_id: &str) -> impl Iterator<Item = &'a SkillId> + 'a {
        self.dependents.get(node_id).into_iter().flatten()
    }

    /// Node ids in load order.
    pub fn node_ids(&self) -> &[SkillId] {
        &self.order
    }

    /// Load-order index of one node.
    pub fn position(&self, node_id: &str) -> Option<usize> {
        self.entries.get(node_id).map(|entry| entry.position)
    }

    /// Returns a detached copy of one node.
    pub fn node(&self, node_id: &str) -> Option<SkillNode> {
        self.entries.get_key_value(node_id).map(|(id, entry)| {
            let prerequisites = entry.prerequisites.as_slice();
            SkillNode {
                id: id.clone(),
                name: entry.name.clone(),
                difficulty: entry.difficulty,
                prerequisite_ids: (!prerequisites.is_empty()).then(|| prerequisites.to_vec()),
            }
        })
    }

    /// Returns all nodes in load order.
    pub fn snapshot(&self) -> Vec<SkillNode> {
        self.order.iter().filter_map(|id| self.node(id)).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Total number of prerequisite edges.
    pub fn edge_count(&self) -> usize {
        self.entries
            .values()
            .map(|entry| entry.prerequisites.as_slice().len())
            .sum()
    }

    /// Returns the stored id string, borrowed from this model.
    pub(crate) fn key(&self, node_id: &str) -> Option<&str> {
        self.entries
            .get_key_value(node_id)
            .map(|(key, _)| key.as_str())
    }

    pub(crate) fn prerequisite_set(&self, node_id: &str) -> Option<&PrerequisiteSet> {
        self.entries.get(node_id).map(|entry| &entry.prerequisites)
    }

    pub(crate) fn reverse_index(&self) -> &HashMap<SkillId, BTreeSet<SkillId>> {
        &self.dependents
    }
}

#[cfg(test)]
mod tests {
    use super::{GraphBuildError, GraphModel};
    use crate::model::skill::SkillNode;

    fn chain() -> GraphModel {
        GraphModel::from_nodes(vec![
            SkillNode::new("a", "A"),
            SkillNode::new("b", "B").with_prerequisites(["a"]),
            SkillNode::new("c", "C").with_prerequisites(["b"]),
        ])
        .expect("chain should build")
    }

    #[test]
    fn add_edge_is_idempotent() {
        let mut model = chain();
        assert!(model.add_edge("a", "c"));
        assert!(!model.add_edge("a", "c"));
        assert_eq!(model.prerequisites("c"), ["b", "a"]);
        assert_eq!(model.edge_count(), 3);
    }

    #[test]
    fn add_then_remove_restores_edge_set() {
        let mut model = chain();
        let before = model.prerequisites("c").to_vec();
        assert!(model.add_edge("a", "c"));
        assert!(model.remove_edge("a", "c"));
        assert_eq!(model.prerequisites("c"), before.as_slice());
        assert!(!model.remove_edge("a", "c"));
    }

    #[test]
    fn self_loop_and_unknown_ends_never_mutate() {
        let mut model = chain();
        assert!(!model.add_edge("a", "a"));
        assert!(!model.add_edge("zzz", "a"));
        assert!(!model.add_edge("a", "zzz"));
        assert_eq!(model.edge_count(), 2);
    }

    #[test]
    fn reverse_index_tracks_forward_lists() {
        let mut model = chain();
        model.add_edge("a", "c");
        let dependents: Vec<&String> = model.dependents("a").collect();
        assert_eq!(dependents, ["b", "c"]);

        model.remove_edge("a", "b");
        let dependents: Vec<&String> = model.dependents("a").collect();
        assert_eq!(dependents, ["c"]);
    }

    #[test]
    fn detach_reports_changed_nodes_in_load_order() {
        let mut model = chain();
        let changed = model.detach("b");
        assert_eq!(changed, ["b", "c"]);
        assert_eq!(model.edge_count(), 0);
        assert!(model.detach("b").is_empty());
    }

    #[test]
    fn from_nodes_rejects_malformed_batches() {
        let dangling = GraphModel::from_nodes(vec![
            SkillNode::new("a", "A").with_prerequisites(["ghost"])
        ])
        .unwrap_err();
        assert!(matches!(
            dangling,
            GraphBuildError::DanglingPrerequisite { ref prerequisite_id, .. } if prerequisite_id == "ghost"
        ));

        let duplicate =
            GraphModel::from_nodes(vec![SkillNode::new("a", "A"), SkillNode::new("a", "A2")])
                .unwrap_err();
        assert_eq!(duplicate, GraphBuildError::DuplicateNode("a".to_string()));

        let self_loop =
            GraphModel::from_nodes(vec![SkillNode::new("a", "A").with_prerequisites(["a"])])
                .unwrap_err();
        assert_eq!(self_loop, GraphBuildError::SelfPrerequisite("a".to_string()));

        let cycle = GraphModel::from_nodes(vec![
            SkillNode::new("a", "A").with_prerequisites(["b"]),
            SkillNode::new("b", "B").with_prerequisites(["a"]),
        ])
        .unwrap_err();
        assert!(matches!(cycle, GraphBuildError::CycleInSource(_)));
    }

    #[test]
    fn from_nodes_accepts_loose_ids_and_blank_names_but_not_empty_ids() {
        let model = GraphModel::from_nodes(vec![
            SkillNode::new("kick flip", ""),
            SkillNode::new("heel", "  ").with_prerequisites(["kick flip"]),
        ])
        .unwrap();
        assert_eq!(model.prerequisites("heel"), ["kick flip"]);

        let empty = GraphModel::from_nodes(vec![SkillNode::new("", "Nameless")]).unwrap_err();
        assert_eq!(empty, GraphBuildError::EmptyId);
    }

    #[test]
    fn duplicate_prerequisites_collapse_to_one_edge() {
        let model = GraphModel::from_nodes(vec![
            SkillNode::new("a", "A"),
            SkillNode::new("b", "B").with_prerequisites(["a", "a"]),
        ])
        .unwrap();
        assert_eq!(model.prerequisites("b"), ["a"]);
    }

    #[test]
    fn snapshot_keeps_load_order_and_null_for_empty_lists() {
        let model = chain();
        let snapshot = model.snapshot();
        let ids: Vec<&str> = snapshot.iter().map(|node| node.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(snapshot[0].prerequisite_ids, None);
        assert_eq!(snapshot[2].prerequisite_ids, Some(vec!["b".to_string()]));
    }
}
