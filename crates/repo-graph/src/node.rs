//! Dependency graph nodes.

use repo_model::{Artifact, Dependency, Version, VersionConstraint};

/// Identity of a node inside one [`DependencyGraph`](crate::DependencyGraph).
///
/// Two structurally equal nodes at different positions have different ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Arena index of the node.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A node of the dependency graph.
///
/// Only the synthetic root may lack a dependency. The scope lives in the
/// dependency value and is replaced, not mutated, by [`set_scope`](Self::set_scope).
#[derive(Debug, Clone)]
pub struct DependencyNode {
    dependency: Option<Dependency>,
    version: Option<Version>,
    version_constraint: Option<VersionConstraint>,
    premanaged_scope: Option<String>,
    relocations: Vec<Artifact>,
    aliases: Vec<Artifact>,
    request_context: String,
    pub(crate) children: Vec<NodeId>,
}

impl DependencyNode {
    /// Node for a dependency whose artifact version is both the selected
    /// version and the (single-version) constraint.
    pub fn new(dependency: Dependency) -> Self {
        let version = Version::new(dependency.artifact.version.as_str());
        Self {
            version_constraint: Some(VersionConstraint::preferred(version.clone())),
            version: Some(version),
            dependency: Some(dependency),
            premanaged_scope: None,
            relocations: Vec::new(),
            aliases: Vec::new(),
            request_context: String::new(),
            children: Vec::new(),
        }
    }

    /// Synthetic root without a dependency.
    pub fn root() -> Self {
        Self {
            dependency: None,
            version: None,
            version_constraint: None,
            premanaged_scope: None,
            relocations: Vec::new(),
            aliases: Vec::new(),
            request_context: String::new(),
            children: Vec::new(),
        }
    }

    /// Replace the declared constraint, e.g. with the range the artifact
    /// version was selected from.
    pub fn with_version_constraint(mut self, constraint: VersionConstraint) -> Self {
        self.version_constraint = Some(constraint);
        self
    }

    /// Mark the scope as set by dependency management; it is never overridden.
    pub fn with_premanaged_scope(mut self, scope: impl Into<String>) -> Self {
        self.premanaged_scope = Some(scope.into());
        self
    }

    pub fn with_relocations(mut self, relocations: impl IntoIterator<Item = Artifact>) -> Self {
        self.relocations.extend(relocations);
        self
    }

    pub fn with_aliases(mut self, aliases: impl IntoIterator<Item = Artifact>) -> Self {
        self.aliases.extend(aliases);
        self
    }

    pub fn with_request_context(mut self, context: impl Into<String>) -> Self {
        self.request_context = context.into();
        self
    }

    pub fn dependency(&self) -> Option<&Dependency> {
        self.dependency.as_ref()
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        self.dependency.as_ref().map(|d| &d.artifact)
    }

    /// The selected version.
    pub fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    pub fn version_constraint(&self) -> Option<&VersionConstraint> {
        self.version_constraint.as_ref()
    }

    /// Current scope, `""` for the synthetic root.
    pub fn scope(&self) -> &str {
        self.dependency.as_ref().map_or("", |d| d.scope.as_str())
    }

    pub fn premanaged_scope(&self) -> Option<&str> {
        self.premanaged_scope.as_deref()
    }

    pub fn relocations(&self) -> &[Artifact] {
        &self.relocations
    }

    pub fn aliases(&self) -> &[Artifact] {
        &self.aliases
    }

    pub fn request_context(&self) -> &str {
        &self.request_context
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Replace the scope of the dependency. No-op on the synthetic root.
    pub fn set_scope(&mut self, scope: &str) {
        if let Some(dependency) = &self.dependency {
            self.dependency = Some(dependency.with_scope(scope));
        }
    }
}
