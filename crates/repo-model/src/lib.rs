//! Value types shared by the dependency graph and the transfer engine.
//!
//! Everything in this crate is an immutable value: artifact coordinates,
//! dependency declarations, versions and constraints, remote repository
//! descriptors, and the Maven2 path layout that maps them onto storage.

mod artifact;
mod dependency;
mod layout;
mod metadata;
mod repository;
mod version;

pub use artifact::{Artifact, ArtifactKey, CoordinateError};
pub use dependency::{scopes, Dependency, Exclusion};
pub use layout::Maven2Layout;
pub use metadata::{Metadata, MetadataNature, MAVEN_METADATA_XML};
pub use repository::{Authentication, Proxy, RemoteRepository, RepositoryPolicy};
pub use version::{Bound, Version, VersionConstraint, VersionError, VersionRange};
