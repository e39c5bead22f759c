//! Effective scope calculation for Java-style scopes.
//!
//! One scope is chosen per conflict group and written to every node of the
//! group, except nodes whose scope was premanaged. Direct dependencies of the
//! root keep their declared scope; other groups collect the scope each node
//! inherits from each of its parents and pick a winner. Groups are processed
//! in sorted order so parent scopes are final before children read them.

use std::collections::{BTreeSet, HashMap, HashSet};

use repo_model::scopes::{COMPILE, PROVIDED, RUNTIME, SYSTEM, TEST};

use crate::context::{ContextKey, TransformationContext};
use crate::error::GraphError;
use crate::graph::DependencyGraph;
use crate::node::NodeId;

use super::{ConflictId, ConflictIdSorter, ConflictIds, DependencyGraphTransformer};

/// Scope a child declared with `child` gets when reached through a parent
/// whose scope is `parent`.
///
/// | child            | parent                 | result     |
/// |------------------|------------------------|------------|
/// | `system`, `test` | any                    | child      |
/// | other            | `compile` or `""`      | child      |
/// | other            | `test`, `runtime`      | parent     |
/// | other            | `system`, `provided`   | `provided` |
/// | other            | anything else          | `runtime`  |
pub fn inherited_scope(parent: &str, child: &str) -> String {
    let scope = if child == SYSTEM || child == TEST {
        child
    } else if parent.is_empty() || parent == COMPILE {
        child
    } else if parent == TEST || parent == RUNTIME {
        parent
    } else if parent == SYSTEM || parent == PROVIDED {
        PROVIDED
    } else {
        RUNTIME
    };
    scope.to_string()
}

/// Pick the winner among candidate scopes.
///
/// A single candidate wins; otherwise `system` is discarded and the first of
/// `compile`, `runtime`, `provided`, `test` present wins.
pub(crate) fn choose_effective_scope(mut scopes: BTreeSet<String>) -> String {
    if scopes.len() > 1 {
        scopes.remove(SYSTEM);
    }
    if scopes.len() == 1 {
        return scopes.into_iter().next().unwrap_or_default();
    }
    [COMPILE, RUNTIME, PROVIDED, TEST]
        .into_iter()
        .find(|s| scopes.contains(*s))
        .unwrap_or_default()
        .to_string()
}

#[derive(Default)]
struct ScopeGroup {
    scope: Option<String>,
    /// Nodes in discovery order with the parents they were reached from.
    nodes: Vec<(NodeId, Vec<NodeId>)>,
    positions: HashMap<NodeId, usize>,
}

impl ScopeGroup {
    fn add(&mut self, node: NodeId, parent: Option<NodeId>) {
        let slot = match self.positions.get(&node) {
            Some(&slot) => slot,
            None => {
                self.nodes.push((node, Vec::new()));
                self.positions.insert(node, self.nodes.len() - 1);
                self.nodes.len() - 1
            }
        };
        if let Some(parent) = parent {
            self.nodes[slot].1.push(parent);
        }
    }
}

/// Writes effective scopes onto the graph.
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaEffectiveScopeCalculator;

impl DependencyGraphTransformer for JavaEffectiveScopeCalculator {
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
        let mut groups = build_groups(graph, ids);

        let root_scope = graph.node(root).scope().to_string();
        if let Some(id) = ids.get(root) {
            if let Some(group) = groups.get_mut(&id) {
                group.scope = Some(root_scope.clone());
            }
        }
        // Direct dependencies are authoritative; the last declaration wins.
        for &child in graph.children(root) {
            let Some(group) = ids.get(child).and_then(|id| groups.get_mut(&id)) else {
                continue;
            };
            group.scope = Some(inherited_scope(&root_scope, graph.node(child).scope()));
        }

        let mut resolved = HashSet::new();
        for &id in sorted {
            resolved.insert(id);
            let Some(group) = groups.get_mut(&id) else {
                continue;
            };
            resolve(graph, ids, group, &resolved);
        }

        Ok(root)
    }
}

/// Every node by conflict group, with each parent edge it was reached over.
fn build_groups(graph: &DependencyGraph, ids: &ConflictIds) -> HashMap<ConflictId, ScopeGroup> {
    let mut groups: HashMap<ConflictId, ScopeGroup> = HashMap::new();
    let root = graph.root();
    if let Some(id) = ids.get(root) {
        groups.entry(id).or_default().add(root, None);
    }

    let mut visited = HashSet::from([root]);
    let mut stack = vec![(root, 0)];
    while let Some(frame) = stack.last_mut() {
        let (node, next) = *frame;
        let Some(&child) = graph.children(node).get(next) else {
            stack.pop();
            continue;
        };
        frame.1 += 1;

        if let Some(id) = ids.get(child) {
            groups.entry(id).or_default().add(child, Some(node));
        }
        if visited.insert(child) {
            stack.push((child, 0));
        }
    }
    groups
}

fn resolve(
    graph: &mut DependencyGraph,
    ids: &ConflictIds,
    group: &mut ScopeGroup,
    resolved: &HashSet<ConflictId>,
) {
    let scope = match &group.scope {
        Some(scope) => scope.clone(),
        None => {
            let scope = choose_effective_scope(inherited_scopes(graph, ids, group, resolved));
            group.scope = Some(scope.clone());
            scope
        }
    };

    for (node, _) in &group.nodes {
        let node = graph.node_mut(*node);
        if node.premanaged_scope().is_none() && node.scope() != scope {
            node.set_scope(&scope);
        }
    }
}

fn inherited_scopes(
    graph: &DependencyGraph,
    ids: &ConflictIds,
    group: &ScopeGroup,
    resolved: &HashSet<ConflictId>,
) -> BTreeSet<String> {
    let mut scopes = BTreeSet::new();
    for (node, parents) in &group.nodes {
        let child_scope = graph.node(*node).scope();
        if parents.is_empty() {
            scopes.insert(child_scope.to_string());
            continue;
        }
        for &parent in parents {
            // A parent group not yet resolved means a cycle; its scope is not final.
            if ids.get(parent).is_some_and(|id| !resolved.contains(&id)) {
                continue;
            }
            scopes.insert(inherited_scope(graph.node(parent).scope(), child_scope));
        }
    }
    if scopes.is_empty() {
        scopes.extend(
            group
                .nodes
                .iter()
                .map(|(node, _)| graph.node(*node).scope().to_string()),
        );
    }
    scopes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::DependencyNode;
    use crate::test_support::node;

    const ALL: [&str; 6] = [COMPILE, PROVIDED, RUNTIME, TEST, SYSTEM, ""];

    fn expected(parent: &str, child: &str) -> &'static str {
        match (parent, child) {
            (_, "system") => "system",
            (_, "test") => "test",
            ("compile" | "", c) => match c {
                "compile" => "compile",
                "provided" => "provided",
                "runtime" => "runtime",
                _ => "",
            },
            ("test", _) => "test",
            ("runtime", _) => "runtime",
            ("system" | "provided", _) => "provided",
            _ => "runtime",
        }
    }

    #[test]
    fn test_inheritance_table_all_pairs() {
        for parent in ALL {
            for child in ALL {
                assert_eq!(
                    inherited_scope(parent, child),
                    expected(parent, child),
                    "parent={:?} child={:?}",
                    parent,
                    child
                );
            }
        }
    }

    #[test]
    fn test_choose_effective_scope_precedence() {
        let set = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>();
        assert_eq!(choose_effective_scope(set(&["system"])), "system");
        assert_eq!(choose_effective_scope(set(&["system", "test"])), "test");
        assert_eq!(choose_effective_scope(set(&["test", "provided"])), "provided");
        assert_eq!(choose_effective_scope(set(&["runtime", "provided", "test"])), "runtime");
        assert_eq!(choose_effective_scope(set(&["compile", "runtime", "system"])), "compile");
    }

    fn transform(graph: &mut DependencyGraph) {
        let mut context = TransformationContext::new();
        JavaEffectiveScopeCalculator
            .transform_graph(graph, &mut context)
            .unwrap();
    }

    #[test]
    fn test_direct_dependency_scope_wins() {
        // root -> a(test); root -> b(compile) -> a(compile)
        let mut graph = DependencyGraph::new(DependencyNode::root());
        let root = graph.root();
        let a_direct = graph.add_child(root, node("a:1:test"));
        let b = graph.add_child(root, node("b:1"));
        let a_transitive = graph.add_child(b, node("a:1"));

        transform(&mut graph);
        assert_eq!(graph.node(a_direct).scope(), "test");
        assert_eq!(graph.node(a_transitive).scope(), "test");
    }

    #[test]
    fn test_last_direct_declaration_wins() {
        let mut graph = DependencyGraph::new(DependencyNode::root());
        let root = graph.root();
        let first = graph.add_child(root, node("a:1:runtime"));
        let second = graph.add_child(root, node("a:1:provided"));

        transform(&mut graph);
        assert_eq!(graph.node(first).scope(), "provided");
        assert_eq!(graph.node(second).scope(), "provided");
    }

    #[test]
    fn test_transitive_scope_inherits_from_resolved_parent() {
        // root -> a(runtime) -> b(compile) -> c(compile)
        let mut graph = DependencyGraph::new(DependencyNode::root());
        let root = graph.root();
        let a = graph.add_child(root, node("a:1:runtime"));
        let b = graph.add_child(a, node("b:1"));
        let c = graph.add_child(b, node("c:1"));

        transform(&mut graph);
        assert_eq!(graph.node(b).scope(), "runtime");
        assert_eq!(graph.node(c).scope(), "runtime");
    }

    #[test]
    fn test_widest_inherited_scope_wins() {
        // root -> a(provided) -> x ; root -> b(runtime) -> x
        let mut graph = DependencyGraph::new(DependencyNode::root());
        let root = graph.root();
        let a = graph.add_child(root, node("a:1:provided"));
        let b = graph.add_child(root, node("b:1:runtime"));
        let x1 = graph.add_child(a, node("x:1"));
        let x2 = graph.add_child(b, node("x:1"));

        transform(&mut graph);
        assert_eq!(graph.node(x1).scope(), "runtime");
        assert_eq!(graph.node(x2).scope(), "runtime");
    }

    #[test]
    fn test_premanaged_scope_is_kept() {
        let mut graph = DependencyGraph::new(DependencyNode::root());
        let root = graph.root();
        let a = graph.add_child(root, node("a:1:runtime"));
        let b = graph.add_child(a, node("b:1:compile").with_premanaged_scope("compile"));

        transform(&mut graph);
        assert_eq!(graph.node(b).scope(), "compile");
    }

    #[test]
    fn test_cyclic_groups_terminate() {
        // root -> a(runtime) -> b -> a'
        let mut graph = DependencyGraph::new(DependencyNode::root());
        let root = graph.root();
        let a = graph.add_child(root, node("a:1:runtime"));
        let b = graph.add_child(a, node("b:1"));
        let a2 = graph.add_child(b, node("a:1"));

        transform(&mut graph);
        assert_eq!(graph.node(a).scope(), "runtime");
        assert_eq!(graph.node(a2).scope(), "runtime");
        assert_eq!(graph.node(b).scope(), "runtime");
    }
}
