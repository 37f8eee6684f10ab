//! Introspection helpers for debugging and tests.

use crate::graph::cycle::topological_order;
use crate::graph::model::GraphModel;
use crate::model::skill::SkillId;
use std::fmt::{Display, Formatter};

/// One broken structural invariant found by [`validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphIssue {
    SelfLoop(SkillId),
    DanglingEdge {
        node_id: SkillId,
        prerequisite_id: SkillId,
    },
    /// Forward edge without its reverse-index entry.
    MissingReverseEntry {
        prerequisite_id: SkillId,
        dependent_id: SkillId,
    },
    /// Reverse-index entry without its forward edge.
    StaleReverseEntry {
        prerequisite_id: SkillId,
        dependent_id: SkillId,
    },
    Cycle(Vec<SkillId>),
}

impl Display for GraphIssue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SelfLoop(id) => write!(f, "self loop on {id}"),
            Self::DanglingEdge {
                node_id,
                prerequisite_id,
            } => write!(f, "{node_id} requires unknown node {prerequisite_id}"),
            Self::MissingReverseEntry {
                prerequisite_id,
                dependent_id,
            } => write!(
                f,
                "edge {prerequisite_id} -> {dependent_id} missing from dependents index"
            ),
            Self::StaleReverseEntry {
                prerequisite_id,
                dependent_id,
            } => write!(
                f,
                "dependents index lists {prerequisite_id} -> {dependent_id} without an edge"
            ),
            Self::Cycle(ids) => write!(f, "cycle through {}", ids.join(", ")),
        }
    }
}

/// Renders one line per node: `id <- p1, p2` (or `id` alone), load order.
pub fn dump_graph(model: &GraphModel) -> String {
    let mut out = String::new();
    for id in model.node_ids() {
        out.push_str(id);
        let prerequisites = model.prerequisites(id);
        if !prerequisites.is_empty() {
            out.push_str(" <- ");
            out.push_str(&prerequisites.join(", "));
        }
        out.push('\n');
    }
    out
}

/// Re-checks every structural invariant; an empty result means healthy.
pub fn validate(model: &GraphModel) -> Vec<GraphIssue> {
    let mut issues = Vec::new();

    for id in model.node_ids() {
        for prerequisite in model.prerequisites(id) {
            if prerequisite == id {
                issues.push(GraphIssue::SelfLoop(id.clone()));
                continue;
            }
            if !model.contains(prerequisite) {
                issues.push(GraphIssue::DanglingEdge {
                    node_id: id.clone(),
                    prerequisite_id: prerequisite.clone(),
                });
                continue;
            }
            if !model.dependents(prerequisite).any(|dependent| dependent == id) {
                issues.push(GraphIssue::MissingReverseEntry {
                    prerequisite_id: prerequisite.clone(),
                    dependent_id: id.clone(),
                });
            }
        }
    }

    let mut reverse: Vec<(&SkillId, &SkillId)> = model
        .reverse_index()
        .iter()
        .flat_map(|(prerequisite, dependents)| {
            dependents.iter().map(move |dependent| (prerequisite, dependent))
        })
        .collect();
    reverse.sort();
    for (prerequisite, dependent) in reverse {
        let present = model
            .prerequisite_set(dependent)
            .is_some_and(|set| set.contains(prerequisite));
        if !present {
            issues.push(GraphIssue::StaleReverseEntry {
                prerequisite_id: prerequisite.clone(),
                dependent_id: dependent.clone(),
            });
        }
    }

    if let Err(stuck) = topological_order(model) {
        issues.push(GraphIssue::Cycle(stuck));
    }
    issues
}
