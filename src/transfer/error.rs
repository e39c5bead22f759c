//! Per-transfer failures.

use repo_model::{Artifact, Metadata};

use super::TransferCancelled;
use crate::checksum::ChecksumFailure;
use crate::transport::TransportError;

/// Underlying cause of a failed transfer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferFailure {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Checksum(#[from] ChecksumFailure),

    #[error("Transfer cancelled: {0}")]
    Cancelled(String),

    #[error("Transfer interrupted before it could complete")]
    Interrupted,

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransferFailure {
    fn from(e: std::io::Error) -> Self {
        TransferFailure::Io(e.to_string())
    }
}

impl From<TransferCancelled> for TransferFailure {
    fn from(e: TransferCancelled) -> Self {
        TransferFailure::Cancelled(e.0)
    }
}

/// The failure recorded on a transfer once it is done.
///
/// Not-found is kept apart from other failures so callers can tell a missing
/// resource from a broken transfer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    #[error("Could not find artifact {artifact} in {repository}")]
    ArtifactNotFound { artifact: Artifact, repository: String },

    #[error("Could not transfer artifact {artifact} from/to {repository}: {cause}")]
    ArtifactTransfer {
        artifact: Artifact,
        repository: String,
        cause: TransferFailure,
    },

    #[error("Could not find metadata {metadata} in {repository}")]
    MetadataNotFound { metadata: Metadata, repository: String },

    #[error("Could not transfer metadata {metadata} from/to {repository}: {cause}")]
    MetadataTransfer {
        metadata: Metadata,
        repository: String,
        cause: TransferFailure,
    },
}

impl TransferError {
    /// Error for an artifact transfer; a transport not-found becomes
    /// [`TransferError::ArtifactNotFound`].
    pub fn for_artifact(artifact: &Artifact, repository: &str, cause: TransferFailure) -> Self {
        match cause {
            TransferFailure::Transport(TransportError::NotFound(_)) => {
                TransferError::ArtifactNotFound {
                    artifact: artifact.clone(),
                    repository: repository.to_string(),
                }
            }
            cause => TransferError::ArtifactTransfer {
                artifact: artifact.clone(),
                repository: repository.to_string(),
                cause,
            },
        }
    }

    /// Error for a metadata transfer; a transport not-found becomes
    /// [`TransferError::MetadataNotFound`].
    pub fn for_metadata(metadata: &Metadata, repository: &str, cause: TransferFailure) -> Self {
        match cause {
            TransferFailure::Transport(TransportError::NotFound(_)) => {
                TransferError::MetadataNotFound {
                    metadata: metadata.clone(),
                    repository: repository.to_string(),
                }
            }
            cause => TransferError::MetadataTransfer {
                metadata: metadata.clone(),
                repository: repository.to_string(),
                cause,
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            TransferError::ArtifactNotFound { .. } | TransferError::MetadataNotFound { .. }
        )
    }

    pub fn cause(&self) -> Option<&TransferFailure> {
        match self {
            TransferError::ArtifactTransfer { cause, .. }
            | TransferError::MetadataTransfer { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repo_model::MetadataNature;

    #[test]
    fn test_transport_not_found_maps_to_not_found() {
        let artifact = Artifact::new("org.example", "lib", "jar", "1.0");
        let err = TransferError::for_artifact(
            &artifact,
            "central",
            TransportError::NotFound("org/example/lib/1.0/lib-1.0.jar".into()).into(),
        );
        assert!(err.is_not_found());
        assert!(err.cause().is_none());
        assert_eq!(
            err.to_string(),
            "Could not find artifact org.example:lib:jar:1.0 in central"
        );
    }

    #[test]
    fn test_other_failures_keep_cause() {
        let metadata = Metadata::new("org.example", "lib", "", MetadataNature::Release);
        let err = TransferError::for_metadata(
            &metadata,
            "central",
            ChecksumFailure::NotAvailable.into(),
        );
        assert!(!err.is_not_found());
        assert!(matches!(err.cause(), Some(TransferFailure::Checksum(_))));
        assert!(err.to_string().contains("no supported algorithms found"));
    }
}
