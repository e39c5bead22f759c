//! Arena-backed dependency graph.

use std::collections::HashSet;

use repo_model::Dependency;

use crate::node::{DependencyNode, NodeId};

/// A possibly cyclic dependency graph.
///
/// Nodes are owned by the graph and addressed by [`NodeId`]. Edges are
/// ordered child lists; a node may be the child of several parents, and
/// [`link`](Self::link) can close cycles. Passing a `NodeId` from another
/// graph panics.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    nodes: Vec<DependencyNode>,
    root: NodeId,
}

impl DependencyGraph {
    /// Graph consisting of the root only.
    pub fn new(root: DependencyNode) -> Self {
        Self {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &DependencyNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut DependencyNode {
        &mut self.nodes[id.0]
    }

    /// Number of nodes in the arena, including pruned ones.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Append a new node as the last child of `parent`.
    pub fn add_child(&mut self, parent: NodeId, node: DependencyNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Add an edge to an existing node.
    pub fn link(&mut self, parent: NodeId, child: NodeId) {
        assert!(child.0 < self.nodes.len(), "unknown node {:?}", child);
        self.nodes[parent.0].children.push(child);
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub(crate) fn set_children(&mut self, id: NodeId, children: Vec<NodeId>) {
        self.nodes[id.0].children = children;
    }

    /// Nodes reachable from the root in pre-order, each once.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            order.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        order
    }

    /// Dependencies of all reachable nodes in pre-order, skipping the
    /// synthetic root and repeated coordinates.
    pub fn dependencies(&self) -> Vec<&Dependency> {
        let mut seen = HashSet::new();
        self.preorder()
            .into_iter()
            .filter_map(|id| self.node(id).dependency())
            .filter(|d| seen.insert(d.artifact.clone()))
            .collect()
    }
}
