//! The four transfer requests.

use std::path::PathBuf;

use repo_model::{Artifact, Metadata};

use super::{TransferError, TransferState, TransferStatus};
use crate::checksum::ChecksumPolicy;

/// Common view of a transfer's lifecycle.
pub trait Transfer {
    fn status(&self) -> &TransferStatus;

    fn status_mut(&mut self) -> &mut TransferStatus;

    fn state(&self) -> TransferState {
        self.status().state()
    }

    fn error(&self) -> Option<&TransferError> {
        self.status().error()
    }
}

macro_rules! impl_transfer {
    ($($ty:ty),*) => {
        $(impl Transfer for $ty {
            fn status(&self) -> &TransferStatus {
                &self.status
            }

            fn status_mut(&mut self) -> &mut TransferStatus {
                &mut self.status
            }
        })*
    };
}

impl_transfer!(ArtifactDownload, ArtifactUpload, MetadataDownload, MetadataUpload);

/// Download of an artifact, or an existence check when no file is given.
#[derive(Debug, Clone)]
pub struct ArtifactDownload {
    pub artifact: Artifact,
    pub file: Option<PathBuf>,
    pub checksum_policy: ChecksumPolicy,
    pub request_context: String,
    status: TransferStatus,
}

impl ArtifactDownload {
    pub fn new(artifact: Artifact, file: impl Into<PathBuf>) -> Self {
        Self {
            artifact,
            file: Some(file.into()),
            checksum_policy: ChecksumPolicy::default(),
            request_context: String::new(),
            status: TransferStatus::new(),
        }
    }

    /// Only check that the artifact exists remotely.
    pub fn existence_check(artifact: Artifact) -> Self {
        Self {
            artifact,
            file: None,
            checksum_policy: ChecksumPolicy::default(),
            request_context: String::new(),
            status: TransferStatus::new(),
        }
    }

    pub fn with_checksum_policy(mut self, policy: ChecksumPolicy) -> Self {
        self.checksum_policy = policy;
        self
    }

    pub fn with_request_context(mut self, context: impl Into<String>) -> Self {
        self.request_context = context.into();
        self
    }

    pub fn is_existence_check(&self) -> bool {
        self.file.is_none()
    }
}

/// Upload of an artifact file.
#[derive(Debug, Clone)]
pub struct ArtifactUpload {
    pub artifact: Artifact,
    pub file: PathBuf,
    status: TransferStatus,
}

impl ArtifactUpload {
    pub fn new(artifact: Artifact, file: impl Into<PathBuf>) -> Self {
        Self {
            artifact,
            file: file.into(),
            status: TransferStatus::new(),
        }
    }
}

/// Download of a metadata file, or an existence check when no file is given.
#[derive(Debug, Clone)]
pub struct MetadataDownload {
    pub metadata: Metadata,
    pub file: Option<PathBuf>,
    pub checksum_policy: ChecksumPolicy,
    pub request_context: String,
    status: TransferStatus,
}

impl MetadataDownload {
    pub fn new(metadata: Metadata, file: impl Into<PathBuf>) -> Self {
        Self {
            metadata,
            file: Some(file.into()),
            checksum_policy: ChecksumPolicy::default(),
            request_context: String::new(),
            status: TransferStatus::new(),
        }
    }

    pub fn existence_check(metadata: Metadata) -> Self {
        Self {
            metadata,
            file: None,
            checksum_policy: ChecksumPolicy::default(),
            request_context: String::new(),
            status: TransferStatus::new(),
        }
    }

    pub fn with_checksum_policy(mut self, policy: ChecksumPolicy) -> Self {
        self.checksum_policy = policy;
        self
    }

    pub fn with_request_context(mut self, context: impl Into<String>) -> Self {
        self.request_context = context.into();
        self
    }
}

/// Upload of a metadata file.
#[derive(Debug, Clone)]
pub struct MetadataUpload {
    pub metadata: Metadata,
    pub file: PathBuf,
    status: TransferStatus,
}

impl MetadataUpload {
    pub fn new(metadata: Metadata, file: impl Into<PathBuf>) -> Self {
        Self {
            metadata,
            file: file.into(),
            status: TransferStatus::new(),
        }
    }
}
