//! Graph transformers and their pipeline.

mod conflict_id_sorter;
mod conflict_marker;
mod nearest;
mod scope;

pub use conflict_id_sorter::{ConflictIdSorter, SortedConflictIds};
pub use conflict_marker::{ConflictId, ConflictIds, ConflictMarker};
pub use nearest::NearestVersionConflictResolver;
pub use scope::{inherited_scope, JavaEffectiveScopeCalculator};

use crate::context::TransformationContext;
use crate::error::GraphError;
use crate::graph::DependencyGraph;
use crate::node::NodeId;

/// A stage of the pipeline. Every stage takes and returns the root so
/// stages can be chained.
pub trait DependencyGraphTransformer: Send + Sync {
    fn transform_graph(
        &self,
        graph: &mut DependencyGraph,
        context: &mut TransformationContext,
    ) -> Result<NodeId, GraphError>;
}

/// Runs transformers in order, threading one context through all of them.
pub struct ChainedTransformer {
    transformers: Vec<Box<dyn DependencyGraphTransformer>>,
}

impl ChainedTransformer {
    pub fn new(transformers: Vec<Box<dyn DependencyGraphTransformer>>) -> Self {
        Self { transformers }
    }

    /// Marker, sorter, scope calculator, nearest-wins resolver.
    pub fn default_pipeline() -> Self {
        Self::new(vec![
            Box::new(ConflictMarker),
            Box::new(ConflictIdSorter),
            Box::new(JavaEffectiveScopeCalculator),
            Box::new(NearestVersionConflictResolver),
        ])
    }

    /// Run the chain with a fresh context.
    pub fn transform(&self, graph: &mut DependencyGraph) -> Result<NodeId, GraphError> {
        let mut context = TransformationContext::new();
        self.transform_graph(graph, &mut context)
    }
}

impl DependencyGraphTransformer for ChainedTransformer {
    fn transform_graph(
        &self,
        graph: &mut DependencyGraph,
        context: &mut TransformationContext,
    ) -> Result<NodeId, GraphError> {
        let mut root = graph.root();
        for transformer in &self.transformers {
            root = transformer.transform_graph(graph, context)?;
        }
        Ok(root)
    }
}
