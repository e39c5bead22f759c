//! Artifact coordinates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Suffix marking a version as a snapshot.
const SNAPSHOT: &str = "SNAPSHOT";

/// Errors from parsing coordinate strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordinateError {
    #[error("Bad artifact coordinates {0}, expected format is <groupId>:<artifactId>[:<extension>[:<classifier>]]:<version>")]
    Malformed(String),
}

/// An artifact coordinate: group, artifact id, classifier, extension and version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Artifact {
    pub group_id: String,
    pub artifact_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub classifier: String,
    pub extension: String,
    pub version: String,
}

/// Version-less identity of an artifact used for conflict detection.
///
/// Two artifacts with equal keys are the same library in different versions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactKey {
    pub group_id: String,
    pub artifact_id: String,
    pub classifier: String,
    pub extension: String,
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.group_id, self.artifact_id, self.classifier, self.extension
        )
    }
}

impl Artifact {
    /// Create an artifact with the given group, id, extension and version and no classifier.
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        extension: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            classifier: String::new(),
            extension: extension.into(),
            version: version.into(),
        }
    }

    /// Set the classifier.
    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = classifier.into();
        self
    }

    /// Copy of this artifact with a different version.
    pub fn with_version(&self, version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..self.clone()
        }
    }

    /// The conflict key (everything but the version).
    pub fn key(&self) -> ArtifactKey {
        ArtifactKey {
            group_id: self.group_id.clone(),
            artifact_id: self.artifact_id.clone(),
            classifier: self.classifier.clone(),
            extension: self.extension.clone(),
        }
    }

    /// Whether the version denotes a snapshot (`1.0-SNAPSHOT` or a timestamped snapshot).
    pub fn is_snapshot(&self) -> bool {
        self.version.ends_with(SNAPSHOT) || is_timestamped_snapshot(&self.version)
    }

    /// The base version, mapping timestamped snapshots back to `-SNAPSHOT`.
    pub fn base_version(&self) -> String {
        if is_timestamped_snapshot(&self.version) {
            // 1.0-20240101.101010-3 -> 1.0-SNAPSHOT
            let mut parts = self.version.rsplitn(3, '-');
            let _build = parts.next();
            let _stamp = parts.next();
            if let Some(base) = parts.next() {
                return format!("{}-{}", base, SNAPSHOT);
            }
        }
        self.version.clone()
    }
}

/// `<base>-yyyyMMdd.HHmmss-<build>`
fn is_timestamped_snapshot(version: &str) -> bool {
    let mut parts = version.rsplitn(3, '-');
    let build = parts.next().unwrap_or_default();
    let stamp = parts.next().unwrap_or_default();
    if parts.next().is_none() || build.is_empty() {
        return false;
    }
    let stamp_ok = stamp.len() == 15
        && stamp.as_bytes()[8] == b'.'
        && stamp
            .char_indices()
            .all(|(i, c)| i == 8 || c.is_ascii_digit());
    stamp_ok && build.chars().all(|c| c.is_ascii_digit())
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.extension)?;
        if !self.classifier.is_empty() {
            write!(f, ":{}", self.classifier)?;
        }
        write!(f, ":{}", self.version)
    }
}

impl FromStr for Artifact {
    type Err = CoordinateError;

    /// Parse `<groupId>:<artifactId>[:<extension>[:<classifier>]]:<version>`.
    fn from_str(coords: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = coords.split(':').collect();
        if parts.len() < 3 || parts.len() > 5 || parts.iter().any(|p| p.is_empty()) {
            return Err(CoordinateError::Malformed(coords.to_string()));
        }

        let (extension, classifier) = match parts.len() {
            3 => ("jar", ""),
            4 => (parts[2], ""),
            _ => (parts[2], parts[3]),
        };

        Ok(Artifact::new(
            parts[0],
            parts[1],
            extension,
            parts[parts.len() - 1],
        )
        .with_classifier(classifier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_short_coordinates() {
        let artifact: Artifact = "org.example:lib:1.0".parse().unwrap();
        assert_eq!(artifact.group_id, "org.example");
        assert_eq!(artifact.artifact_id, "lib");
        assert_eq!(artifact.extension, "jar");
        assert_eq!(artifact.classifier, "");
        assert_eq!(artifact.version, "1.0");
    }

    #[test]
    fn test_parse_full_coordinates() {
        let artifact: Artifact = "org.example:lib:zip:sources:2.1".parse().unwrap();
        assert_eq!(artifact.extension, "zip");
        assert_eq!(artifact.classifier, "sources");
        assert_eq!(artifact.to_string(), "org.example:lib:zip:sources:2.1");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!("lib".parse::<Artifact>().is_err());
        assert!("g::1".parse::<Artifact>().is_err());
        assert!("a:b:c:d:e:f".parse::<Artifact>().is_err());
    }

    #[test]
    fn test_key_ignores_version() {
        let a: Artifact = "g:a:1".parse().unwrap();
        let b: Artifact = "g:a:2".parse().unwrap();
        assert_eq!(a.key(), b.key());
        assert_eq!(a.key().to_string(), "g:a::jar");
    }

    #[test]
    fn test_snapshot_detection() {
        let plain: Artifact = "g:a:1.0".parse().unwrap();
        let snapshot: Artifact = "g:a:1.0-SNAPSHOT".parse().unwrap();
        let stamped: Artifact = "g:a:1.0-20240101.101010-3".parse().unwrap();

        assert!(!plain.is_snapshot());
        assert!(snapshot.is_snapshot());
        assert!(stamped.is_snapshot());
        assert_eq!(stamped.base_version(), "1.0-SNAPSHOT");
        assert_eq!(plain.base_version(), "1.0");
    }
}
