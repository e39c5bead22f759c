//! Topological ordering of conflict groups.
//!
//! Builds a graph over conflict ids (an edge from a parent's group to each
//! child's group, self-edges ignored) and sorts it with Kahn's algorithm.
//! When only cyclic groups remain, the one with the smallest remaining
//! in-degree (first in discovery order on ties) is forced to in-degree zero.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::debug;

use crate::context::{ContextKey, ContextValue, TransformationContext};
use crate::error::GraphError;
use crate::graph::DependencyGraph;
use crate::node::NodeId;

use super::{ConflictId, ConflictIds, ConflictMarker, DependencyGraphTransformer};

/// Publishes [`ContextKey::SortedConflictIds`] and [`ContextKey::CyclicConflictIds`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictIdSorter;

/// Result of sorting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortedConflictIds {
    pub sorted: Vec<ConflictId>,
    /// Ids forced out of cycles, in order.
    pub cyclic: Vec<ConflictId>,
}

struct Vertex {
    id: ConflictId,
    children: Vec<usize>,
    in_degree: usize,
}

#[derive(Default)]
struct ConflictIdGraph {
    vertices: Vec<Vertex>,
    index: HashMap<ConflictId, usize>,
}

impl ConflictIdGraph {
    fn vertex(&mut self, id: ConflictId) -> usize {
        if let Some(&v) = self.index.get(&id) {
            return v;
        }
        self.vertices.push(Vertex {
            id,
            children: Vec::new(),
            in_degree: 0,
        });
        let v = self.vertices.len() - 1;
        self.index.insert(id, v);
        v
    }

    fn add_edge(&mut self, parent: usize, child: usize) {
        if parent == child || self.vertices[parent].children.contains(&child) {
            return;
        }
        self.vertices[parent].children.push(child);
        self.vertices[child].in_degree += 1;
    }
}

impl DependencyGraphTransformer for ConflictIdSorter {
    fn transform_graph(
        &self,
        graph: &mut DependencyGraph,
        context: &mut TransformationContext,
    ) -> Result<NodeId, GraphError> {
        if !context.contains(ContextKey::ConflictIds) {
            ConflictMarker.transform_graph(graph, context)?;
        }
        let ids = context
            .conflict_ids()
            .ok_or(GraphError::MissingContext(ContextKey::ConflictIds))?;

        let result = self.sort(graph, ids);
        context.put(ContextValue::SortedConflictIds(result.sorted));
        context.put(ContextValue::CyclicConflictIds(result.cyclic));
        Ok(graph.root())
    }
}

impl ConflictIdSorter {
    /// Sort the conflict ids of `graph`.
    pub fn sort(&self, graph: &DependencyGraph, ids: &ConflictIds) -> SortedConflictIds {
        let mut dag = ConflictIdGraph::default();
        let root = graph.root();
        let root_vertex = ids.get(root).map(|id| dag.vertex(id));
        build(graph, ids, root, root_vertex, &mut dag);

        topsort(dag)
    }
}

/// Depth-first walk adding one edge per parent/child pair. Vertices are
/// created in the order the walk first reaches them.
fn build(
    graph: &DependencyGraph,
    ids: &ConflictIds,
    root: NodeId,
    root_vertex: Option<usize>,
    dag: &mut ConflictIdGraph,
) {
    let mut visited = HashSet::from([root]);
    // (node, its vertex, next child to visit)
    let mut stack = vec![(root, root_vertex, 0)];
    while let Some(frame) = stack.last_mut() {
        let (node, vertex, next) = *frame;
        let Some(&child) = graph.children(node).get(next) else {
            stack.pop();
            continue;
        };
        frame.2 += 1;

        let child_vertex = ids.get(child).map(|id| dag.vertex(id));
        if let (Some(parent), Some(child_vertex)) = (vertex, child_vertex) {
            dag.add_edge(parent, child_vertex);
        }
        if visited.insert(child) {
            stack.push((child, child_vertex, 0));
        }
    }
}

fn topsort(dag: ConflictIdGraph) -> SortedConflictIds {
    let ConflictIdGraph { mut vertices, .. } = dag;
    let n = vertices.len();
    let mut done = vec![false; n];
    let mut sorted = Vec::with_capacity(n);
    let mut cyclic = Vec::new();

    let mut roots: VecDeque<usize> = (0..n).filter(|&v| vertices[v].in_degree == 0).collect();

    while sorted.len() < n {
        let v = match roots.pop_front() {
            Some(v) => v,
            None => {
                let Some(v) = (0..n)
                    .filter(|&v| !done[v])
                    .min_by_key(|&v| vertices[v].in_degree)
                else {
                    break;
                };
                debug!(
                    conflict_id = vertices[v].id.index(),
                    in_degree = vertices[v].in_degree,
                    "breaking conflict id cycle"
                );
                vertices[v].in_degree = 0;
                cyclic.push(vertices[v].id);
                v
            }
        };
        if done[v] {
            continue;
        }
        done[v] = true;
        sorted.push(vertices[v].id);

        let children = std::mem::take(&mut vertices[v].children);
        for &c in &children {
            if !done[c] && vertices[c].in_degree > 0 {
                vertices[c].in_degree -= 1;
                if vertices[c].in_degree == 0 {
                    roots.push_back(c);
                }
            }
        }
        vertices[v].children = children;
    }

    SortedConflictIds { sorted, cyclic }
}
