//! Nearest-wins version selection.
//!
//! Conflict groups are processed in sorted order. For each group the graph
//! is walked from the root, collecting every reachable member as a candidate
//! and every range it declares as a constraint. The winner is the candidate
//! closest to the root that satisfies all constraints; on equal depth the
//! higher version wins. Losing members are then unlinked from their parents,
//! which also drops subtrees that were only reachable through them before
//! later groups are processed.

use std::cmp::{Ordering, Reverse};
use std::collections::HashMap;

use repo_model::{Version, VersionConstraint};
use tracing::debug;

use crate::context::{ContextKey, TransformationContext};
use crate::error::GraphError;
use crate::graph::DependencyGraph;
use crate::node::NodeId;

use super::{ConflictId, ConflictIdSorter, ConflictIds, DependencyGraphTransformer};

/// Selects one version per conflict group and prunes the rest.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestVersionConflictResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Position {
    parent: NodeId,
    depth: usize,
}

#[derive(Debug, Clone)]
struct Candidate {
    version: Version,
    depth: usize,
}

impl Candidate {
    /// Shallower first, then higher version.
    fn rank(&self) -> (usize, Reverse<&Version>) {
        (self.depth, Reverse(&self.version))
    }
}

struct ConflictGroup {
    id: ConflictId,
    positions: Vec<Position>,
    constraints: Vec<VersionConstraint>,
    candidates: Vec<Candidate>,
    winner: Option<Candidate>,
    members: usize,
}

impl ConflictGroup {
    fn new(id: ConflictId) -> Self {
        Self {
            id,
            positions: Vec::new(),
            constraints: Vec::new(),
            candidates: Vec::new(),
            winner: None,
            members: 0,
        }
    }

    fn add_position(&mut self, parent: NodeId, depth: usize) {
        match self.positions.iter_mut().find(|p| p.parent == parent) {
            Some(position) => position.depth = position.depth.min(depth),
            None => self.positions.push(Position { parent, depth }),
        }
    }

    fn add_constraint(&mut self, constraint: &VersionConstraint) {
        if constraint.has_ranges() && !self.constraints.contains(constraint) {
            self.constraints.push(constraint.clone());
        }
    }

    fn is_acceptable(&self, version: &Version) -> bool {
        self.constraints.iter().all(|c| c.contains_version(version))
    }

    fn add_candidate(&mut self, version: &Version, depth: usize) {
        let candidate = match self.candidates.iter_mut().find(|c| &c.version == version) {
            Some(existing) => {
                existing.depth = existing.depth.min(depth);
                existing.clone()
            }
            None => {
                let candidate = Candidate {
                    version: version.clone(),
                    depth,
                };
                self.candidates.push(candidate.clone());
                candidate
            }
        };
        let nearer = self
            .winner
            .as_ref()
            .map_or(true, |w| candidate.rank().cmp(&w.rank()) == Ordering::Less);
        if nearer {
            self.winner = Some(candidate);
        }
    }

    /// Drop the winner if a newer constraint excludes it and pick the best
    /// acceptable candidate instead.
    fn revalidate_winner(&mut self) {
        let still_acceptable = self
            .winner
            .as_ref()
            .map_or(true, |w| self.is_acceptable(&w.version));
        if still_acceptable {
            return;
        }
        self.winner = self
            .candidates
            .iter()
            .filter(|c| self.is_acceptable(&c.version))
            .min_by(|a, b| a.rank().cmp(&b.rank()))
            .cloned();
    }

    fn constraint_strings(&self) -> Vec<String> {
        self.constraints.iter().map(|c| c.to_string()).collect()
    }
}

impl DependencyGraphTransformer for NearestVersionConflictResolver {
    fn transform_graph(
        &self,
        graph: &mut DependencyGraph,
        context: &mut TransformationContext,
    ) -> Result<NodeId, GraphError> {
        if !context.contains(ContextKey::SortedConflictIds) {
            ConflictIdSorter.transform_graph(graph, context)?;
        }
        let sorted = context
            .sorted_conflict_ids()
            .ok_or(GraphError::MissingContext(ContextKey::SortedConflictIds))?;
        let ids = context
            .conflict_ids()
            .ok_or(GraphError::MissingContext(ContextKey::ConflictIds))?;

        let root = graph.root();
        for &id in sorted {
            let mut group = ConflictGroup::new(id);
            select(graph, ids, &mut group);

            if group.members == 0 {
                continue;
            }
            let Some(winner) = group.winner.clone() else {
                return Err(GraphError::UnsolvableVersionConflict {
                    conflict: ids.describe(id),
                    constraints: group.constraint_strings(),
                });
            };
            debug!(
                conflict = %ids.describe(id),
                version = %winner.version,
                depth = winner.depth,
                "selected version"
            );
            prune(graph, ids, &group, &winner);
        }

        Ok(root)
    }
}

/// Walk the graph depth-first, revisiting a node only when it is reached at
/// a smaller depth than before.
fn select(graph: &DependencyGraph, ids: &ConflictIds, group: &mut ConflictGroup) {
    let mut depths = HashMap::new();
    let root = graph.root();
    if !visit(graph, ids, group, root, None, 0, &mut depths) {
        return;
    }

    // (node, depth, next child to visit)
    let mut stack = vec![(root, 0, 0)];
    while let Some(frame) = stack.last_mut() {
        let (node, depth, next) = *frame;
        let Some(&child) = graph.children(node).get(next) else {
            stack.pop();
            continue;
        };
        frame.2 += 1;

        if visit(graph, ids, group, child, Some(node), depth + 1, &mut depths) {
            stack.push((child, depth + 1, 0));
        }
    }
}

/// Record `node` for the group; returns whether its children are walked.
fn visit(
    graph: &DependencyGraph,
    ids: &ConflictIds,
    group: &mut ConflictGroup,
    node: NodeId,
    parent: Option<NodeId>,
    depth: usize,
    depths: &mut HashMap<NodeId, usize>,
) -> bool {
    match depths.get(&node) {
        Some(&seen) if seen <= depth => return false,
        _ => {
            depths.insert(node, depth);
        }
    }

    if ids.get(node) == Some(group.id) {
        group.members += 1;
        if let Some(parent) = parent {
            group.add_position(parent, depth);
        }
        let dependency_node = graph.node(node);
        if let Some(constraint) = dependency_node.version_constraint() {
            group.add_constraint(constraint);
        }
        let acceptable = match dependency_node.version() {
            Some(version) if group.is_acceptable(version) => {
                group.add_candidate(version, depth);
                true
            }
            _ => false,
        };
        group.revalidate_winner();
        if !acceptable {
            return false;
        }
    }
    true
}

fn prune(graph: &mut DependencyGraph, ids: &ConflictIds, group: &ConflictGroup, winner: &Candidate) {
    let mut settled = false;
    for position in &group.positions {
        let children: Vec<NodeId> = graph
            .children(position.parent)
            .iter()
            .copied()
            .filter(|&child| {
                if ids.get(child) != Some(group.id) {
                    return true;
                }
                let keep = !settled
                    && position.depth == winner.depth
                    && graph.node(child).version() == Some(&winner.version);
                if keep {
                    settled = true;
                }
                keep
            })
            .collect();
        graph.set_children(position.parent, children);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::DependencyNode;
    use crate::test_support::{node, ranged};

    fn resolve(graph: &mut DependencyGraph) -> Result<NodeId, GraphError> {
        let mut context = TransformationContext::new();
        NearestVersionConflictResolver.transform_graph(graph, &mut context)
    }

    fn versions(graph: &DependencyGraph, id: NodeId) -> Vec<String> {
        graph
            .children(id)
            .iter()
            .map(|&c| graph.node(c).artifact().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_highest_of_equal_depth_siblings_wins() {
        let mut graph = DependencyGraph::new(DependencyNode::root());
        let root = graph.root();
        graph.add_child(root, node("a:1"));
        let a3 = graph.add_child(root, node("a:3"));
        graph.add_child(root, node("a:2"));

        resolve(&mut graph).unwrap();
        assert_eq!(graph.children(root), &[a3]);
    }

    #[test]
    fn test_nearest_beats_higher() {
        // root -> a:1 ; root -> b -> a:5
        let mut graph = DependencyGraph::new(DependencyNode::root());
        let root = graph.root();
        let a1 = graph.add_child(root, node("a:1"));
        let b = graph.add_child(root, node("b:1"));
        graph.add_child(b, node("a:5"));

        resolve(&mut graph).unwrap();
        assert_eq!(graph.children(root), &[a1, b]);
        assert!(graph.children(b).is_empty());
    }

    #[test]
    fn test_range_rejection_falls_back_to_nearest_satisfying() {
        let mut graph = DependencyGraph::new(DependencyNode::root());
        let root = graph.root();
        graph.add_child(root, node("x:1"));
        let a = graph.add_child(root, node("a:1"));
        let b = graph.add_child(a, node("b:1"));
        graph.add_child(b, node("x:3"));
        let c = graph.add_child(root, node("c:1"));
        let x2 = graph.add_child(c, node("x:2"));
        let d = graph.add_child(root, node("d:1"));
        let e = graph.add_child(d, node("e:1"));
        graph.add_child(e, ranged("x:2", "[2,)"));

        resolve(&mut graph).unwrap();
        assert_eq!(
            versions(&graph, root),
            ["test:a:jar:1", "test:c:jar:1", "test:d:jar:1"]
        );
        assert!(graph.children(b).is_empty());
        assert_eq!(graph.children(c), &[x2]);
        assert!(graph.children(e).is_empty());
    }

    #[test]
    fn test_unsolvable_constraints_fail() {
        let mut graph = DependencyGraph::new(DependencyNode::root());
        let root = graph.root();
        let a = graph.add_child(root, node("a:1"));
        graph.add_child(a, ranged("x:1", "[1,2)"));
        let b = graph.add_child(root, node("b:1"));
        graph.add_child(b, ranged("x:3", "[3,4)"));

        let err = resolve(&mut graph).unwrap_err();
        match err {
            GraphError::UnsolvableVersionConflict {
                conflict,
                constraints,
            } => {
                assert_eq!(conflict, "test:x::jar");
                assert_eq!(constraints, ["[1,2)", "[3,4)"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_losing_subtree_is_not_a_candidate() {
        // root -> a:1 -> y:9 ; root -> b -> a:2 -> y:1 ; root -> c -> d -> y:2
        let mut graph = DependencyGraph::new(DependencyNode::root());
        let root = graph.root();
        let a1 = graph.add_child(root, node("a:1"));
        graph.add_child(a1, node("y:9"));
        let b = graph.add_child(root, node("b:1"));
        let a2 = graph.add_child(b, node("a:2"));
        graph.add_child(a2, node("y:1"));
        let c = graph.add_child(root, node("c:1"));
        let d = graph.add_child(c, node("d:1"));
        graph.add_child(d, node("y:2"));

        resolve(&mut graph).unwrap();
        assert!(graph.children(b).is_empty());
        assert_eq!(versions(&graph, a1), ["test:y:jar:9"]);
        assert!(graph.children(d).is_empty());
    }

    #[test]
    fn test_cyclic_graph_terminates() {
        // root -> a:1 -> b:1 -> a:2 (back to b)
        let mut graph = DependencyGraph::new(DependencyNode::root());
        let root = graph.root();
        let a1 = graph.add_child(root, node("a:1"));
        let b = graph.add_child(a1, node("b:1"));
        let a2 = graph.add_child(b, node("a:2"));
        graph.link(a2, b);

        resolve(&mut graph).unwrap();
        assert_eq!(graph.children(root), &[a1]);
        assert_eq!(graph.children(a1), &[b]);
        assert!(graph.children(b).is_empty());
    }
}
