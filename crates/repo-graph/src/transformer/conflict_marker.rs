//! Conflict group assignment.
//!
//! Every node with a dependency gets the id of its conflict group: the set
//! of artifact keys (primary key, relocations, aliases) that denote the same
//! library. Nodes whose key sets overlap end up in one group, transitively.

use std::collections::{BTreeSet, HashMap, HashSet};

use repo_model::ArtifactKey;

use crate::context::{ContextValue, TransformationContext};
use crate::error::GraphError;
use crate::graph::DependencyGraph;
use crate::node::{DependencyNode, NodeId};

use super::DependencyGraphTransformer;

/// Identity of a conflict group. Nodes are conflict-equivalent iff their ids are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConflictId(usize);

impl ConflictId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Node to conflict group mapping produced by [`ConflictMarker`].
#[derive(Debug, Clone, Default)]
pub struct ConflictIds {
    by_node: HashMap<NodeId, ConflictId>,
    groups: Vec<BTreeSet<ArtifactKey>>,
}

impl ConflictIds {
    /// Group of a node; `None` for the synthetic root.
    pub fn get(&self, node: NodeId) -> Option<ConflictId> {
        self.by_node.get(&node).copied()
    }

    /// Artifact keys making up a group.
    pub fn keys(&self, id: ConflictId) -> &BTreeSet<ArtifactKey> {
        &self.groups[id.0]
    }

    /// Number of groups.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Number of marked nodes.
    pub fn node_count(&self) -> usize {
        self.by_node.len()
    }

    /// Groups in first-seen order.
    pub fn ids(&self) -> impl Iterator<Item = ConflictId> {
        (0..self.groups.len()).map(ConflictId)
    }

    /// Human-readable group name, e.g. `org.example:lib::jar`.
    pub fn describe(&self, id: ConflictId) -> String {
        self.keys(id)
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

/// Assigns conflict ids and stores them under [`ContextKey::ConflictIds`](crate::ContextKey).
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictMarker;

impl DependencyGraphTransformer for ConflictMarker {
    fn transform_graph(
        &self,
        graph: &mut DependencyGraph,
        context: &mut TransformationContext,
    ) -> Result<NodeId, GraphError> {
        let ids = self.mark(graph);
        context.put(ContextValue::ConflictIds(ids));
        Ok(graph.root())
    }
}

impl ConflictMarker {
    /// Compute conflict ids for every reachable node.
    pub fn mark(&self, graph: &DependencyGraph) -> ConflictIds {
        // Slots of merged-away groups become None.
        let mut groups: Vec<Option<BTreeSet<ArtifactKey>>> = Vec::new();
        let mut key_to_group: HashMap<ArtifactKey, usize> = HashMap::new();
        let mut marked = Vec::new();

        let mut visited = HashSet::new();
        let mut stack = vec![graph.root()];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let node = graph.node(id);
            if let Some(keys) = node_keys(node) {
                merge_into_groups(keys, &mut groups, &mut key_to_group);
                marked.push(id);
            }
            stack.extend(graph.children(id).iter().rev().copied());
        }

        // Compact live groups into dense ids, numbered by first appearance.
        let mut dense: HashMap<usize, ConflictId> = HashMap::new();
        let mut result = ConflictIds::default();
        for id in marked {
            let primary = graph
                .node(id)
                .artifact()
                .map(|a| a.key())
                .and_then(|k| key_to_group.get(&k).copied());
            let Some(slot) = primary else { continue };
            let conflict_id = *dense.entry(slot).or_insert_with(|| {
                let keys = groups[slot].clone().unwrap_or_default();
                result.groups.push(keys);
                ConflictId(result.groups.len() - 1)
            });
            result.by_node.insert(id, conflict_id);
        }
        result
    }
}

fn node_keys(node: &DependencyNode) -> Option<BTreeSet<ArtifactKey>> {
    let artifact = node.artifact()?;
    let mut keys = BTreeSet::new();
    keys.insert(artifact.key());
    keys.extend(node.relocations().iter().map(|a| a.key()));
    keys.extend(node.aliases().iter().map(|a| a.key()));
    Some(keys)
}

/// Add a node's keys, merging every group they touch into one.
///
/// All keys of merged groups are re-pointed at the surviving slot, so nodes
/// marked earlier follow the merge when ids are compacted.
fn merge_into_groups(
    keys: BTreeSet<ArtifactKey>,
    groups: &mut Vec<Option<BTreeSet<ArtifactKey>>>,
    key_to_group: &mut HashMap<ArtifactKey, usize>,
) {
    let touched: BTreeSet<usize> = keys
        .iter()
        .filter_map(|k| key_to_group.get(k).copied())
        .collect();

    let target = match touched.first() {
        Some(&first) => first,
        None => {
            groups.push(Some(BTreeSet::new()));
            groups.len() - 1
        }
    };

    for &other in touched.iter().skip(1) {
        let absorbed = groups[other].take().unwrap_or_default();
        for key in &absorbed {
            key_to_group.insert(key.clone(), target);
        }
        if let Some(group) = groups[target].as_mut() {
            group.extend(absorbed);
        }
    }

    for key in keys {
        key_to_group.insert(key.clone(), target);
        if let Some(group) = groups[target].as_mut() {
            group.insert(key);
        }
    }
}
