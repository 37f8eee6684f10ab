//! Acyclicity gate for prerequisite edges.
//!
//! # Responsibility
//! - Decide whether a proposed edge would close a cycle.
//! - Provide the topological ordering used by layout and load validation.
//!
//! # Invariants
//! - Queries are read-only over a `GraphModel`.
//! - Search cost is O(V+E) per call.

use crate::graph::model::GraphModel;
use crate::model::skill::SkillId;
use std::collections::{HashMap, HashSet, VecDeque};

/// Returns `true` when adding `prerequisite -> dependent` would create a cycle.
///
/// Walks the dependents index breadth-first from `dependent`; reaching
/// `prerequisite` means it already requires `dependent` transitively.
pub fn would_create_cycle(model: &GraphModel, prerequisite: &str, dependent: &str) -> bool {
    if prerequisite == dependent {
        return true;
    }

    let mut visited: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::new();
    queue.push_back(dependent);
    visited.insert(dependent);

    while let Some(current) = queue.pop_front() {
        for next in model.dependents(current) {
            if next == prerequisite {
                return true;
            }
            if visited.insert(next.as_str()) {
                queue.push_back(next.as_str());
            }
        }
    }
    false
}

/// Orders nodes so every prerequisite precedes its dependents.
///
/// Sources are seeded in load order and released in load order, so equal
/// graphs always yield equal orderings.
///
/// # Errors
/// Returns the ids that could not be ordered (members of, or downstream
/// from, a cycle) in load order.
pub fn topological_order(model: &GraphModel) -> Result<Vec<SkillId>, Vec<SkillId>> {
    let mut in_degree: HashMap<&str, usize> = model
        .node_ids()
        .iter()
        .map(|id| (id.as_str(), model.prerequisites(id).len()))
        .collect();

    let mut queue: VecDeque<&str> = model
        .node_ids()
        .iter()
        .map(String::as_str)
        .filter(|id| in_degree.get(id).copied() == Some(0))
        .collect();

    let mut ordered = Vec::with_capacity(model.len());
    while let Some(current) = queue.pop_front() {
        ordered.push(current.to_string());

        let mut released: Vec<&str> = Vec::new();
        for dependent in model.dependents(current) {
            if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                *degree = degree.saturating_sub(1);
                if *degree == 0 {
                    released.push(dependent.as_str());
                }
            }
        }
        released.sort_by_key(|id| model.position(id));
        queue.extend(released);
    }

    if ordered.len() == model.len() {
        return Ok(ordered);
    }

    let placed: HashSet<&str> = ordered.iter().map(String::as_str).collect();
    Err(model
        .node_ids()
        .iter()
        .filter(|id| !placed.contains(id.as_str()))
        .cloned()
        .collect())
}
