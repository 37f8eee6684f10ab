//! Layered layout for prerequisite graphs.
//!
//! # Responsibility
//! - Assign every node a rank (layer) and a slot within its rank.
//! - Reduce edge crossings with barycenter sweeps.
//! - Map `(rank, slot)` to fixed-spacing 2-D coordinates.
//!
//! # Invariants
//! - `rank(node) = 0` without prerequisites, else `1 + max(rank(prerequisite))`.
//! - Every edge points from a lower rank to a strictly higher rank.
//! - Identical graphs and configs always produce identical layouts.

use crate::graph::cycle::topological_order;
use crate::graph::model::GraphModel;
use crate::model::skill::SkillId;
use log::warn;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

const DEFAULT_RANK_SPACING: f64 = 240.0;
const DEFAULT_SLOT_SPACING: f64 = 120.0;
const DEFAULT_BARYCENTER_PASSES: usize = 4;

/// Axis along which ranks advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Prerequisites on the left, dependents to the right.
    #[default]
    LeftToRight,
    /// Prerequisites on top, dependents below.
    TopToBottom,
}

/// Layout tuning knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub orientation: Orientation,
    /// Distance between consecutive ranks.
    pub rank_spacing: f64,
    /// Distance between consecutive slots inside one rank.
    pub slot_spacing: f64,
    /// Number of alternating barycenter sweeps.
    pub barycenter_passes: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            orientation: Orientation::default(),
            rank_spacing: DEFAULT_RANK_SPACING,
            slot_spacing: DEFAULT_SLOT_SPACING,
            barycenter_passes: DEFAULT_BARYCENTER_PASSES,
        }
    }
}

/// Placement of one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutEntry {
    pub node_id: SkillId,
    pub rank: usize,
    pub slot: usize,
    pub x: f64,
    pub y: f64,
}

/// Computed layout, entries ordered by `(rank, slot)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout {
    entries: Vec<LayoutEntry>,
    /// Node id to position in `entries`.
    index: HashMap<SkillId, usize>,
    rank_count: usize,
    crossings: usize,
}

impl Layout {
    pub fn entries(&self) -> &[LayoutEntry] {
        &self.entries
    }

    /// Looks up one node's placement.
    pub fn entry(&self, node_id: &str) -> Option<&LayoutEntry> {
        self.index
            .get(node_id)
            .and_then(|&position| self.entries.get(position))
    }

    /// Number of non-empty ranks.
    pub fn rank_count(&self) -> usize {
        self.rank_count
    }

    /// Crossings between adjacent-rank edges in the chosen ordering.
    pub fn crossings(&self) -> usize {
        self.crossings
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Computes a full layered layout.
pub fn compute_layout(model: &GraphModel, config: &LayoutConfig) -> Layout {
    if model.is_empty() {
        return Layout::default();
    }

    let ranks = assign_ranks(model);
    let mut rank_order = build_rank_buckets(model, &ranks);
    minimize_crossings(&mut rank_order, model, &ranks, config.barycenter_passes);
    let crossings = total_crossings(&rank_order, model, &ranks);

    let mut entries = Vec::with_capacity(model.len());
    for (rank, bucket) in rank_order.iter().enumerate() {
        for (slot, id) in bucket.iter().enumerate() {
            let along = rank as f64 * config.rank_spacing;
            let across = slot as f64 * config.slot_spacing;
            let (x, y) = match config.orientation {
                Orientation::LeftToRight => (along, across),
                Orientation::TopToBottom => (across, along),
            };
            entries.push(LayoutEntry {
                node_id: (*id).to_string(),
                rank,
                slot,
                x,
                y,
            });
        }
    }

    let index = entries
        .iter()
        .enumerate()
        .map(|(position, entry)| (entry.node_id.clone(), position))
        .collect();
    Layout {
        entries,
        index,
        rank_count: rank_order.len(),
        crossings,
    }
}

/// Longest-path layering over a topological order.
///
/// Nodes that cannot be ordered (only possible if the acyclic invariant was
/// bypassed) are parked one rank past the deepest placed node.
fn assign_ranks(model: &GraphModel) -> HashMap<&str, usize> {
    let (ordered, stuck) = match topological_order(model) {
        Ok(ordered) => (ordered, Vec::new()),
        Err(stuck) => {
            warn!(
                "event=layout_rank module=graph status=cycle stuck_count={}",
                stuck.len()
            );
            let ordered = model
                .node_ids()
                .iter()
                .filter(|id| !stuck.contains(id))
                .cloned()
                .collect();
            (ordered, stuck)
        }
    };

    let mut ranks: HashMap<&str, usize> = HashMap::with_capacity(model.len());
    for id in &ordered {
        let rank = model
            .prerequisites(id)
            .iter()
            .filter_map(|prerequisite| ranks.get(prerequisite.as_str()))
            .map(|rank| rank + 1)
            .max()
            .unwrap_or(0);
        if let Some(key) = model.key(id) {
            ranks.insert(key, rank);
        }
    }

    let parked = ranks.values().copied().max().map_or(0, |max| max + 1);
    for id in &stuck {
        if let Some(key) = model.key(id) {
            ranks.insert(key, parked);
        }
    }
    ranks
}

/// Groups nodes by rank, load order inside each rank.
fn build_rank_buckets<'a>(
    model: &'a GraphModel,
    ranks: &HashMap<&str, usize>,
) -> Vec<Vec<&'a str>> {
    let depth = ranks.values().copied().max().map_or(0, |max| max + 1);
    let mut buckets: Vec<Vec<&str>> = vec![Vec::new(); depth];
    for id in model.node_ids() {
        if let Some(rank) = ranks.get(id.as_str()) {
            buckets[*rank].push(id.as_str());
        }
    }
    buckets.retain(|bucket| !bucket.is_empty());
    buckets
}

/// Iterated barycenter heuristic, keeping the best ordering seen.
fn minimize_crossings(
    rank_order: &mut Vec<Vec<&str>>,
    model: &GraphModel,
    ranks: &HashMap<&str, usize>,
    passes: usize,
) {
    if rank_order.len() <= 1 {
        return;
    }

    let mut best = rank_order.clone();
    let mut best_crossings = total_crossings(rank_order, model, ranks);

    for pass in 0..passes {
        if best_crossings == 0 {
            break;
        }
        if pass % 2 == 0 {
            for r in 1..rank_order.len() {
                sweep(rank_order, model, ranks, r, r - 1, Direction::Down);
            }
        } else {
            for r in (0..rank_order.len() - 1).rev() {
                sweep(rank_order, model, ranks, r, r + 1, Direction::Up);
            }
        }

        let crossings = total_crossings(rank_order, model, ranks);
        if crossings < best_crossings {
            best_crossings = crossings;
            best = rank_order.clone();
        }
    }

    *rank_order = best;
}

#[derive(Clone, Copy)]
enum Direction {
    /// Order by prerequisites in the rank above.
    Down,
    /// Order by dependents in the rank below.
    Up,
}

/// Reorders `rank_order[target]` by mean slot of neighbors in `rank_order[fixed]`.
///
/// Nodes without neighbors there keep their current slot as key.
fn sweep(
    rank_order: &mut [Vec<&str>],
    model: &GraphModel,
    ranks: &HashMap<&str, usize>,
    target: usize,
    fixed: usize,
    direction: Direction,
) {
    let fixed_rank = bucket_rank(&rank_order[fixed], ranks);
    let fixed_slots: HashMap<&str, usize> = rank_order[fixed]
        .iter()
        .enumerate()
        .map(|(slot, id)| (*id, slot))
        .collect();

    let mut scored: Vec<(&str, f64, usize)> = rank_order[target]
        .iter()
        .enumerate()
        .map(|(slot, id)| {
            let neighbor_slots: Vec<usize> = match direction {
                Direction::Down => model
                    .prerequisites(id)
                    .iter()
                    .filter(|other| ranks.get(other.as_str()) == fixed_rank.as_ref())
                    .filter_map(|other| fixed_slots.get(other.as_str()).copied())
                    .collect(),
                Direction::Up => model
                    .dependents(id)
                    .filter(|other| ranks.get(other.as_str()) == fixed_rank.as_ref())
                    .filter_map(|other| fixed_slots.get(other.as_str()).copied())
                    .collect(),
            };
            let key = if neighbor_slots.is_empty() {
                slot as f64
            } else {
                neighbor_slots.iter().sum::<usize>() as f64 / neighbor_slots.len() as f64
            };
            (*id, key, slot)
        })
        .collect();

    scored.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.2.cmp(&b.2))
            .then_with(|| a.0.cmp(b.0))
    });
    rank_order[target] = scored.into_iter().map(|(id, _, _)| id).collect();
}

fn bucket_rank(bucket: &[&str], ranks: &HashMap<&str, usize>) -> Option<usize> {
    bucket.first().and_then(|id| ranks.get(id).copied())
}

/// Crossings between two adjacent ranks, counting edges that span one rank.
fn count_crossings(
    upper: &[&str],
    lower: &[&str],
    model: &GraphModel,
    ranks: &HashMap<&str, usize>,
) -> usize {
    let upper_rank = bucket_rank(upper, ranks);
    let upper_slots: HashMap<&str, usize> = upper
        .iter()
        .enumerate()
        .map(|(slot, id)| (*id, slot))
        .collect();

    let mut edges: Vec<(usize, usize)> = Vec::new();
    for (lower_slot, id) in lower.iter().enumerate() {
        for prerequisite in model.prerequisites(id) {
            if ranks.get(prerequisite.as_str()) != upper_rank.as_ref() {
                continue;
            }
            if let Some(upper_slot) = upper_slots.get(prerequisite.as_str()) {
                edges.push((*upper_slot, lower_slot));
            }
        }
    }

    let mut crossings = 0;
    for i in 0..edges.len() {
        for j in (i + 1)..edges.len() {
            let (a1, b1) = edges[i];
            let (a2, b2) = edges[j];
            if (a1 < a2 && b1 > b2) || (a1 > a2 && b1 < b2) {
                crossings += 1;
            }
        }
    }
    crossings
}

fn total_crossings(
    rank_order: &[Vec<&str>],
    model: &GraphModel,
    ranks: &HashMap<&str, usize>,
) -> usize {
    rank_order
        .windows(2)
        .map(|pair| count_crossings(&pair[0], &pair[1], model, ranks))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::{compute_layout, LayoutConfig, Orientation};
    use crate::graph::model::GraphModel;
    use crate::model::skill::SkillNode;

    fn rank_of(layout: &super::Layout, id: &str) -> usize {
        layout.entry(id).expect("node should be placed").rank
    }

    #[test]
    fn chain_ranks_follow_longest_path() {
        let model = GraphModel::from_nodes(vec![
            SkillNode::new("a", "A"),
            SkillNode::new("b", "B").with_prerequisites(["a"]),
            SkillNode::new("c", "C").with_prerequisites(["b"]),
        ])
        .unwrap();
        let layout = compute_layout(&model, &LayoutConfig::default());

        assert_eq!(rank_of(&layout, "a"), 0);
        assert_eq!(rank_of(&layout, "b"), 1);
        assert_eq!(rank_of(&layout, "c"), 2);
        assert_eq!(layout.rank_count(), 3);
    }

    #[test]
    fn every_edge_points_to_a_higher_rank() {
        let model = GraphModel::from_nodes(vec![
            SkillNode::new("a", "A"),
            SkillNode::new("b", "B"),
            SkillNode::new("c", "C").with_prerequisites(["a"]),
            SkillNode::new("d", "D").with_prerequisites(["c", "b"]),
            SkillNode::new("e", "E").with_prerequisites(["a", "d"]),
        ])
        .unwrap();
        let layout = compute_layout(&model, &LayoutConfig::default());

        for id in model.node_ids() {
            for prerequisite in model.prerequisites(id) {
                assert!(rank_of(&layout, prerequisite) < rank_of(&layout, id));
            }
        }
        assert_eq!(rank_of(&layout, "e"), 3);
    }

    #[test]
    fn barycenter_untangles_crossed_pairs() {
        // Load order puts "y" under "a" and "x" under "b", which crosses.
        let model = GraphModel::from_nodes(vec![
            SkillNode::new("a", "A"),
            SkillNode::new("b", "B"),
            SkillNode::new("y", "Y").with_prerequisites(["b"]),
            SkillNode::new("x", "X").with_prerequisites(["a"]),
        ])
        .unwrap();

        let unsorted = compute_layout(
            &model,
            &LayoutConfig {
                barycenter_passes: 0,
                ..LayoutConfig::default()
            },
        );
        assert_eq!(unsorted.crossings(), 1);

        let layout = compute_layout(&model, &LayoutConfig::default());
        assert_eq!(layout.crossings(), 0);
        assert_eq!(layout.entry("x").unwrap().slot, 0);
        assert_eq!(layout.entry("y").unwrap().slot, 1);
    }

    #[test]
    fn coordinates_follow_orientation_and_spacing() {
        let model = GraphModel::from_nodes(vec![
            SkillNode::new("a", "A"),
            SkillNode::new("b", "B"),
            SkillNode::new("c", "C").with_prerequisites(["a"]),
        ])
        .unwrap();
        let config = LayoutConfig {
            orientation: Orientation::TopToBottom,
            rank_spacing: 100.0,
            slot_spacing: 50.0,
            barycenter_passes: 4,
        };
        let layout = compute_layout(&model, &config);

        let b = layout.entry("b").unwrap();
        assert_eq!((b.rank, b.slot), (0, 1));
        assert_eq!((b.x, b.y), (50.0, 0.0));

        let c = layout.entry("c").unwrap();
        assert_eq!((c.x, c.y), (0.0, 100.0));
    }

    #[test]
    fn layout_is_deterministic() {
        let nodes = vec![
            SkillNode::new("a", "A"),
            SkillNode::new("b", "B"),
            SkillNode::new("c", "C").with_prerequisites(["b"]),
            SkillNode::new("d", "D").with_prerequisites(["a", "b"]),
        ];
        let first = compute_layout(
            &GraphModel::from_nodes(nodes.clone()).unwrap(),
            &LayoutConfig::default(),
        );
        let second = compute_layout(
            &GraphModel::from_nodes(nodes).unwrap(),
            &LayoutConfig::default(),
        );
        assert_eq!(first, second);
    }

    #[test]
    fn empty_graph_has_empty_layout() {
        let layout = compute_layout(&GraphModel::new(), &LayoutConfig::default());
        assert!(layout.is_empty());
        assert_eq!(layout.rank_count(), 0);
        assert!(layout.entry("a").is_none());
    }

    #[test]
    fn entry_lookup_matches_entry_list() {
        let nodes: Vec<SkillNode> = (0..50)
            .map(|i| {
                let node = SkillNode::new(format!("n{i}"), "N");
                if i == 0 {
                    node
                } else {
                    node.with_prerequisites([format!("n{}", i / 2)])
                }
            })
            .collect();
        let model = GraphModel::from_nodes(nodes).unwrap();
        let layout = compute_layout(&model, &LayoutConfig::default());

        for entry in layout.entries() {
            assert_eq!(layout.entry(&entry.node_id), Some(entry));
        }
        assert_eq!(rank_of(&layout, "n49"), 6);
        assert!(layout.entry("ghost").is_none());
    }
}
