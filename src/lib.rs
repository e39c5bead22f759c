//! Repo Client - dependency resolution and artifact transfer
//!
//! This crate resolves Maven-style dependency graphs and moves the selected
//! artifacts between remote repositories and a local repository:
//! conflict resolution over the graph, a concurrent checksum-verifying
//! transfer connector, update checks and the session tying them together.

pub mod checksum;
pub mod config;
pub mod connector;
pub mod local;
pub mod session;
pub mod system;
pub mod transfer;
pub mod transport;
pub mod update;

pub use repo_graph;
pub use repo_model;

pub use checksum::{ChecksumAlgorithm, ChecksumPolicy};
pub use config::{ConfigError, ConnectorConfig};
pub use connector::{ConnectorError, InterruptHandle, RepositoryConnector, TransferConnector};
pub use local::LocalRepository;
pub use session::{RepositorySystemSession, ResolutionErrorPolicy};
pub use system::{ArtifactError, ArtifactResult, RepositorySystem, ResolutionError};
pub use transfer::{
    ArtifactDownload, ArtifactUpload, MetadataDownload, MetadataUpload, Transfer, TransferError,
    TransferEvent, TransferEventType, TransferListener, TransferState,
};
pub use transport::{FileTransport, MockRepository, Transport, TransportError, TransportFactory};
pub use update::{DefaultUpdateCheckManager, UpdateCheck, UpdateCheckManager, UpdatePolicy};
