//! Repository connectors: batched transfers against one remote repository.

mod events;
mod pool;
mod transfer;

pub use pool::ConnectionPool;
pub use transfer::{InterruptHandle, TransferConnector};

use crate::config::ConfigError;
use crate::transfer::{ArtifactDownload, ArtifactUpload, MetadataDownload, MetadataUpload};

/// Transport-agnostic transfer API.
///
/// Per-transfer failures are recorded on the transfers themselves; only
/// batch-level problems are returned as errors.
pub trait RepositoryConnector: Send + Sync {
    /// Download artifacts and metadata, blocking until every transfer is done.
    fn get(
        &self,
        artifact_downloads: &mut [ArtifactDownload],
        metadata_downloads: &mut [MetadataDownload],
    ) -> Result<(), ConnectorError>;

    /// Upload artifacts and metadata, blocking until every transfer is done.
    fn put(
        &self,
        artifact_uploads: &mut [ArtifactUpload],
        metadata_uploads: &mut [MetadataUpload],
    ) -> Result<(), ConnectorError>;

    /// Release pooled connections and worker threads. Idempotent.
    fn close(&self);
}

/// Batch-level connector errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectorError {
    #[error("Connector for {0} is closed")]
    Closed(String),

    #[error("Transfer batch was interrupted")]
    Interrupted,

    #[error("Could not start transfer workers: {0}")]
    Executor(String),

    #[error("No connector available to access repository {repository}")]
    NoConnector { repository: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}
