//! The local repository: where resolved files are stored.

use std::path::{Path, PathBuf};

use repo_model::{Artifact, Maven2Layout, Metadata, RemoteRepository};

/// A directory laid out like a Maven 2 repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRepository {
    basedir: PathBuf,
}

impl LocalRepository {
    pub fn new(basedir: impl Into<PathBuf>) -> Self {
        Self {
            basedir: basedir.into(),
        }
    }

    pub fn basedir(&self) -> &Path {
        &self.basedir
    }

    pub fn artifact_path(&self, artifact: &Artifact) -> PathBuf {
        self.basedir.join(Maven2Layout.artifact_path(artifact))
    }

    /// Metadata is stored per repository: `maven-metadata-<id>.xml`.
    pub fn metadata_path(&self, metadata: &Metadata, repository: &RemoteRepository) -> PathBuf {
        let path = self.basedir.join(Maven2Layout.metadata_path(metadata));
        let (stem, extension) = match metadata.metadata_type.rsplit_once('.') {
            Some((stem, extension)) => (stem, format!(".{}", extension)),
            None => (metadata.metadata_type.as_str(), String::new()),
        };
        path.with_file_name(format!("{}-{}{}", stem, repository.id, extension))
    }

    /// The artifact's file, if it is present locally.
    pub fn find_artifact(&self, artifact: &Artifact) -> Option<PathBuf> {
        let path = self.artifact_path(artifact);
        path.is_file().then_some(path)
    }
}
