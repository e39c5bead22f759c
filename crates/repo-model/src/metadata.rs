//! Repository metadata descriptors.

use std::fmt;

use serde::{Deserialize, Serialize};

/// File name of Maven repository metadata.
pub const MAVEN_METADATA_XML: &str = "maven-metadata.xml";

/// Which kind of versions a metadata file describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetadataNature {
    Release,
    Snapshot,
    ReleaseOrSnapshot,
}

/// A metadata file at group, artifact or version level.
///
/// Empty `artifact_id`/`version` select the coarser levels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Metadata {
    pub group_id: String,
    #[serde(default)]
    pub artifact_id: String,
    #[serde(default)]
    pub version: String,
    #[serde(rename = "type")]
    pub metadata_type: String,
    pub nature: MetadataNature,
}

impl Metadata {
    /// `maven-metadata.xml` for the given coordinates.
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
        nature: MetadataNature,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
            metadata_type: MAVEN_METADATA_XML.to_string(),
            nature,
        }
    }
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.group_id)?;
        if !self.artifact_id.is_empty() {
            write!(f, ":{}", self.artifact_id)?;
            if !self.version.is_empty() {
                write!(f, ":{}", self.version)?;
            }
        }
        write!(f, "/{}", self.metadata_type)
    }
}
