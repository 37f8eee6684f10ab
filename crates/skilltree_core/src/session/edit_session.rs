//! Baseline/current graph pair with dirty-set tracking.
//!
//! # Responsibility
//! - Gate edge changes through referential, self-loop and cycle checks.
//! - Keep the dirty set precise after every mutation.
//! - Produce the per-node persistence diff and fold saved nodes back into
//!   the baseline.
//!
//! # Invariants
//! - Rejected changes never touch `current`.
//! - `reset()` and `commit()` both leave the dirty set empty.
//! - `diff()` lists prerequisites before dependents, so applying it one
//!   entry at a time never leaves the store or the baseline cyclic.

use crate::graph::cycle::{topological_order, would_create_cycle};
use crate::graph::model::GraphModel;
use crate::model::skill::SkillId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Structural edge operation requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOp {
    Add,
    Remove,
}

/// Full replacement prerequisite list for one dirty node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeEdgesUpdate {
    pub node_id: SkillId,
    pub prerequisite_ids: Vec<SkillId>,
}

/// Rejected or impossible edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    /// No scope is loaded; editing is blocked until a successful load.
    NoScopeLoaded,
    /// Endpoint is not part of the loaded scope.
    UnknownNode(SkillId),
    /// Both endpoints are the same node.
    SelfLoop(SkillId),
    /// Edge would make `prerequisite_id` transitively depend on itself.
    CycleRejected {
        prerequisite_id: SkillId,
        dependent_id: SkillId,
    },
}

impl EditError {
    /// `true` for self-loop and cross-scope rejections.
    pub fn is_invalid_edge(&self) -> bool {
        matches!(self, Self::UnknownNode(_) | Self::SelfLoop(_))
    }

    /// `true` when the edge was refused by the acyclicity gate.
    pub fn is_cycle_rejection(&self) -> bool {
        matches!(self, Self::CycleRejected { .. })
    }
}

impl Display for EditError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoScopeLoaded => write!(f, "no scope loaded"),
            Self::UnknownNode(id) => write!(f, "skill is not part of the loaded scope: {id}"),
            Self::SelfLoop(id) => write!(f, "skill cannot require itself: {id}"),
            Self::CycleRejected {
                prerequisite_id,
                dependent_id,
            } => write!(
                f,
                "edge {prerequisite_id} -> {dependent_id} would create a prerequisite cycle"
            ),
        }
    }
}

impl Error for EditError {}

/// Baseline plus working copy of one scope's graph.
#[derive(Debug, Clone, Default)]
pub struct EditSession {
    baseline: GraphModel,
    current: GraphModel,
    dirty: HashSet<SkillId>,
}

impl EditSession {
    /// Starts a session; the baseline is a deep copy of `model`.
    pub fn begin(model: GraphModel) -> Self {
        Self {
            baseline: model.clone(),
            current: model,
            dirty: HashSet::new(),
        }
    }

    /// Live graph including unsaved edits.
    pub fn current(&self) -> &GraphModel {
        &self.current
    }

    /// Graph as last loaded or persisted.
    pub fn baseline(&self) -> &GraphModel {
        &self.baseline
    }

    /// Applies one edge change.
    ///
    /// Returns whether the graph changed. Idempotent repeats return
    /// `Ok(false)`.
    ///
    /// # Errors
    /// - `UnknownNode` when either end is outside the scope.
    /// - `SelfLoop` when both ends are equal.
    /// - `CycleRejected` when an add would close a cycle.
    pub fn apply_edge_change(
        &mut self,
        prerequisite: &str,
        dependent: &str,
        op: EdgeOp,
    ) -> Result<bool, EditError> {
        for id in [prerequisite, dependent] {
            if !self.current.contains(id) {
                return Err(EditError::UnknownNode(id.to_string()));
            }
        }
        if prerequisite == dependent {
            return Err(EditError::SelfLoop(dependent.to_string()));
        }

        let mutated = match op {
            EdgeOp::Add => {
                if self.current.has_edge(prerequisite, dependent) {
                    return Ok(false);
                }
                if would_create_cycle(&self.current, prerequisite, dependent) {
                    return Err(EditError::CycleRejected {
                        prerequisite_id: prerequisite.to_string(),
                        dependent_id: dependent.to_string(),
                    });
                }
                self.current.add_edge(prerequisite, dependent)
            }
            EdgeOp::Remove => self.current.remove_edge(prerequisite, dependent),
        };

        if mutated {
            self.refresh_dirty(dependent);
        }
        Ok(mutated)
    }

    /// Drops every edge touching `node_id`; returns nodes whose sets changed.
    pub fn detach(&mut self, node_id: &str) -> Result<Vec<SkillId>, EditError> {
        if !self.current.contains(node_id) {
            return Err(EditError::UnknownNode(node_id.to_string()));
        }
        let changed = self.current.detach(node_id);
        for id in &changed {
            self.refresh_dirty(id);
        }
        Ok(changed)
    }

    pub fn is_dirty(&self, node_id: &str) -> bool {
        self.dirty.contains(node_id)
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    /// Dirty ids in load order.
    pub fn dirty_ids(&self) -> Vec<SkillId> {
        self.current
            .node_ids()
            .iter()
            .filter(|id| self.dirty.contains(id.as_str()))
            .cloned()
            .collect()
    }

    /// Complete current prerequisite list of every dirty node.
    ///
    /// Entries follow the topological order of `current` (load order among
    /// independent nodes). A node's new prerequisites are written before the
    /// node itself, so any prefix of the batch keeps the graph acyclic.
    pub fn diff(&self) -> Vec<NodeEdgesUpdate> {
        let order = match topological_order(&self.current) {
            Ok(order) => order,
            Err(_) => self.current.node_ids().to_vec(),
        };
        order
            .into_iter()
            .filter(|id| self.dirty.contains(id.as_str()))
            .map(|node_id| NodeEdgesUpdate {
                prerequisite_ids: self.current.prerequisites(&node_id).to_vec(),
                node_id,
            })
            .collect()
    }

    /// Discards unsaved edits.
    pub fn reset(&mut self) {
        self.current = self.baseline.clone();
        self.dirty.clear();
    }

    /// Adopts the whole current graph as the new baseline.
    pub fn commit(&mut self) {
        self.baseline = self.current.clone();
        self.dirty.clear();
    }

    /// Adopts one node's current prerequisites as its baseline.
    pub fn mark_persisted(&mut self, node_id: &str) {
        let current: Vec<SkillId> = self.current.prerequisites(node_id).to_vec();
        let stale: Vec<SkillId> = self
            .baseline
            .prerequisites(node_id)
            .iter()
            .filter(|id| !current.contains(id))
            .cloned()
            .collect();
        for prerequisite in &stale {
            self.baseline.remove_edge(prerequisite, node_id);
        }
        for prerequisite in &current {
            self.baseline.add_edge(prerequisite, node_id);
        }
        self.dirty.remove(node_id);
    }

    fn refresh_dirty(&mut self, node_id: &str) {
        let unchanged = self
            .current
            .prerequisite_set(node_id)
            .is_some_and(|set| set.same_members(self.baseline.prerequisites(node_id)));
        if unchanged {
            self.dirty.remove(node_id);
        } else {
            self.dirty.insert(node_id.to_string());
        }
    }
}
