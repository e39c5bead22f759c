//! Dependency graph transformation pipeline.
//!
//! A raw dependency graph (possibly cyclic) is rewritten in a fixed order:
//!
//! 1. [`ConflictMarker`] groups nodes that denote the same library,
//! 2. [`ConflictIdSorter`] orders those groups parent-before-child,
//! 3. [`JavaEffectiveScopeCalculator`] settles one scope per group,
//! 4. [`NearestVersionConflictResolver`] keeps one version per group and
//!    prunes the rest.
//!
//! Stages communicate through a [`TransformationContext`]. Nodes live in an
//! arena owned by [`DependencyGraph`] and are addressed by [`NodeId`], so all
//! visited-sets and depth tables are keyed by node identity.

mod context;
mod error;
mod graph;
mod node;
pub mod transformer;

#[cfg(test)]
mod test_support;

pub use context::{ContextKey, ContextValue, TransformationContext};
pub use error::GraphError;
pub use graph::DependencyGraph;
pub use node::{DependencyNode, NodeId};
pub use transformer::{
    inherited_scope, ChainedTransformer, ConflictId, ConflictIdSorter, ConflictIds,
    ConflictMarker, DependencyGraphTransformer, JavaEffectiveScopeCalculator,
    NearestVersionConflictResolver, SortedConflictIds,
};
