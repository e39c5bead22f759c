//! End-to-end resolution: transform a dependency graph, then make every
//! selected artifact available in the local repository.

use std::path::PathBuf;
use std::sync::Arc;

use repo_graph::{ChainedTransformer, DependencyGraph, GraphError, NodeId};
use repo_model::{Artifact, RemoteRepository};
use tracing::debug;

use crate::connector::{ConnectorError, RepositoryConnector, TransferConnector};
use crate::session::RepositorySystemSession;
use crate::transfer::{ArtifactDownload, Transfer, TransferError};
use crate::transport::{FileTransportFactory, TransportFactory};
use crate::update::{DefaultUpdateCheckManager, UpdateCheck, UpdateCheckError, UpdateCheckManager};

/// Why one artifact could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArtifactError {
    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Cached(#[from] UpdateCheckError),

    #[error(
        "Cannot access {repository} in offline mode and the artifact {artifact} has not been \
         downloaded from it before"
    )]
    Offline { artifact: Artifact, repository: String },
}

/// Outcome for one artifact of a resolution request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactResult {
    pub artifact: Artifact,
    /// Local file, once resolved.
    pub file: Option<PathBuf>,
    pub error: Option<ArtifactError>,
}

impl ArtifactResult {
    fn resolved(artifact: Artifact, file: PathBuf) -> Self {
        Self {
            artifact,
            file: Some(file),
            error: None,
        }
    }

    fn failed(artifact: Artifact, error: impl Into<ArtifactError>) -> Self {
        Self {
            artifact,
            file: None,
            error: Some(error.into()),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.file.is_some()
    }
}

/// Failures that abort a whole resolution request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Connector(#[from] ConnectorError),
}

/// Entry point tying the graph pipeline, update checks and connectors together.
pub struct RepositorySystem {
    transformer: ChainedTransformer,
    update_check_manager: Arc<dyn UpdateCheckManager>,
    factories: Vec<Arc<dyn TransportFactory>>,
}

impl Default for RepositorySystem {
    fn default() -> Self {
        Self::new()
    }
}

impl RepositorySystem {
    /// The default pipeline, tracking-file update checks and `file:` transport.
    pub fn new() -> Self {
        Self {
            transformer: ChainedTransformer::default_pipeline(),
            update_check_manager: Arc::new(DefaultUpdateCheckManager::new()),
            factories: vec![Arc::new(FileTransportFactory)],
        }
    }

    /// Register a transport; it takes precedence over those added before.
    pub fn with_transport_factory(mut self, factory: Arc<dyn TransportFactory>) -> Self {
        self.factories.insert(0, factory);
        self
    }

    pub fn with_update_check_manager(mut self, manager: Arc<dyn UpdateCheckManager>) -> Self {
        self.update_check_manager = manager;
        self
    }

    pub fn update_check_manager(&self) -> &dyn UpdateCheckManager {
        self.update_check_manager.as_ref()
    }

    /// A connector from the first transport supporting the repository.
    pub fn connector(
        &self,
        session: &RepositorySystemSession,
        repository: &RemoteRepository,
    ) -> Result<TransferConnector, ConnectorError> {
        let factory = self
            .factories
            .iter()
            .find(|f| f.supports(repository))
            .ok_or_else(|| ConnectorError::NoConnector {
                repository: repository.to_string(),
            })?;
        TransferConnector::new(session, repository.clone(), Arc::clone(factory))
    }

    /// Run the conflict-resolution pipeline over the graph.
    pub fn transform(&self, graph: &mut DependencyGraph) -> Result<NodeId, GraphError> {
        self.transformer.transform(graph)
    }

    /// Transform the graph and fetch its artifacts from `repository`.
    pub fn resolve_dependencies(
        &self,
        session: &RepositorySystemSession,
        graph: &mut DependencyGraph,
        repository: &RemoteRepository,
    ) -> Result<Vec<ArtifactResult>, ResolutionError> {
        self.transform(graph)?;
        let connector = self.connector(session, repository)?;
        let results = self.resolve_artifacts(session, graph, repository, &connector);
        connector.close();
        results
    }

    /// Make the artifacts of an already transformed graph available locally.
    ///
    /// Returns one result per distinct artifact, in graph pre-order. Only a
    /// batch-level connector failure is returned as an error.
    pub fn resolve_artifacts(
        &self,
        session: &RepositorySystemSession,
        graph: &DependencyGraph,
        repository: &RemoteRepository,
        connector: &dyn RepositoryConnector,
    ) -> Result<Vec<ArtifactResult>, ResolutionError> {
        let local = &session.local_repository;
        let mut results: Vec<Option<ArtifactResult>> = Vec::new();
        let mut downloads = Vec::new();
        let mut checks = Vec::new();

        for dependency in graph.dependencies() {
            let artifact = dependency.artifact.clone();
            let file = local.artifact_path(&artifact);
            let exists = file.is_file();
            let policy = repository.policy(artifact.is_snapshot());

            if exists && !artifact.is_snapshot() {
                debug!(%artifact, "using local copy");
                results.push(Some(ArtifactResult::resolved(artifact, file)));
                continue;
            }

            if !policy.enabled {
                let error = TransferError::ArtifactNotFound {
                    artifact: artifact.clone(),
                    repository: repository.to_string(),
                };
                results.push(Some(local_or(artifact, file, exists, error)));
                continue;
            }

            if session.offline {
                let error = ArtifactError::Offline {
                    artifact: artifact.clone(),
                    repository: repository.to_string(),
                };
                results.push(Some(local_or(artifact, file, exists, error)));
                continue;
            }

            let update_policy = session.effective_update_policy(&policy.update_policy);
            let mut check =
                UpdateCheck::new(artifact.clone(), file.clone(), repository.clone(), update_policy);
            self.update_check_manager.check_artifact(session, &mut check);

            if !check.required {
                if let Some(error) = check.error.take() {
                    results.push(Some(local_or(artifact, file, exists, error)));
                    continue;
                }
                if exists {
                    results.push(Some(ArtifactResult::resolved(artifact, file)));
                    continue;
                }
            }

            let checksum_policy = session.effective_checksum_policy(&policy.checksum_policy);
            downloads.push(ArtifactDownload::new(artifact, file).with_checksum_policy(checksum_policy));
            checks.push((results.len(), check));
            results.push(None);
        }

        if !downloads.is_empty() {
            debug!(repository = %repository.id, count = downloads.len(), "fetching artifacts");
            connector.get(&mut downloads, &mut [])?;
        }

        for (download, (index, check)) in downloads.into_iter().zip(checks) {
            self.update_check_manager
                .touch_artifact(session, &check, download.error());
            let result = match download.error() {
                None => ArtifactResult::resolved(download.artifact.clone(), check.file.clone()),
                Some(error) => ArtifactResult::failed(download.artifact.clone(), error.clone()),
            };
            results[index] = Some(result);
        }

        Ok(results.into_iter().flatten().collect())
    }
}

/// The local file if there is one, otherwise the failure.
fn local_or(
    artifact: Artifact,
    file: PathBuf,
    exists: bool,
    error: impl Into<ArtifactError>,
) -> ArtifactResult {
    if exists {
        ArtifactResult::resolved(artifact, file)
    } else {
        ArtifactResult::failed(artifact, error)
    }
}
