//! Errors raised by graph transformers.

use crate::context::ContextKey;

/// Fatal errors of a transformation run. There is no partial result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("Could not resolve version conflict for {conflict} among {}", constraints.join(", "))]
    UnsolvableVersionConflict {
        /// The conflict group, rendered as its artifact keys.
        conflict: String,
        /// Every range constraint seen in the group.
        constraints: Vec<String>,
    },

    #[error("Transformation context is missing {0:?}")]
    MissingContext(ContextKey),
}
