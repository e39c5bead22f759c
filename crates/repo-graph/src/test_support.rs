//! Node builders for unit tests.
//!
//! `"a:1"` is `test:a:jar:1` in scope compile, `"a:1:runtime"` sets the scope.

use repo_model::{Artifact, Dependency, VersionConstraint};

use crate::node::DependencyNode;

pub(crate) fn artifact(name: &str, version: &str) -> Artifact {
    Artifact::new("test", name, "jar", version)
}

pub(crate) fn node(spec: &str) -> DependencyNode {
    let parts: Vec<&str> = spec.split(':').collect();
    let scope = parts.get(2).copied().unwrap_or("compile");
    DependencyNode::new(Dependency::new(artifact(parts[0], parts[1]), scope))
}

/// Node selected at `spec`'s version out of `range`.
pub(crate) fn ranged(spec: &str, range: &str) -> DependencyNode {
    node(spec).with_version_constraint(VersionConstraint::parse(range).unwrap())
}
