//! Dependency declarations.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::artifact::Artifact;

/// Scope names understood by the scope calculator.
pub mod scopes {
    pub const COMPILE: &str = "compile";
    pub const PROVIDED: &str = "provided";
    pub const RUNTIME: &str = "runtime";
    pub const TEST: &str = "test";
    pub const SYSTEM: &str = "system";
}

/// An exclusion pattern; `*` matches any value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Exclusion {
    pub group_id: String,
    pub artifact_id: String,
    #[serde(default = "wildcard")]
    pub classifier: String,
    #[serde(default = "wildcard")]
    pub extension: String,
}

fn wildcard() -> String {
    "*".to_string()
}

impl Exclusion {
    /// Exclude every classifier/extension of `group_id:artifact_id`.
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            classifier: wildcard(),
            extension: wildcard(),
        }
    }

    /// Whether this exclusion matches the artifact.
    pub fn matches(&self, artifact: &Artifact) -> bool {
        fn field(pattern: &str, value: &str) -> bool {
            pattern == "*" || pattern == value
        }
        field(&self.group_id, &artifact.group_id)
            && field(&self.artifact_id, &artifact.artifact_id)
            && field(&self.classifier, &artifact.classifier)
            && field(&self.extension, &artifact.extension)
    }
}

/// A declared dependency: an artifact plus scope, optionality and exclusions.
///
/// Dependencies are values; changing the scope produces a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub artifact: Artifact,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclusions: Vec<Exclusion>,
}

impl Dependency {
    /// Create a non-optional dependency without exclusions.
    pub fn new(artifact: Artifact, scope: impl Into<String>) -> Self {
        Self {
            artifact,
            scope: scope.into(),
            optional: false,
            exclusions: Vec::new(),
        }
    }

    /// Copy with a different scope.
    pub fn with_scope(&self, scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            ..self.clone()
        }
    }

    /// Copy with a different artifact.
    pub fn with_artifact(&self, artifact: Artifact) -> Self {
        Self {
            artifact,
            ..self.clone()
        }
    }

    /// Mark as optional.
    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    /// Add exclusions.
    pub fn with_exclusions(mut self, exclusions: impl IntoIterator<Item = Exclusion>) -> Self {
        self.exclusions.extend(exclusions);
        self
    }

    /// Whether any exclusion of this dependency matches the artifact.
    pub fn excludes(&self, artifact: &Artifact) -> bool {
        self.exclusions.iter().any(|e| e.matches(artifact))
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}", self.artifact, self.scope)?;
        if self.optional {
            write!(f, "?")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_scope_keeps_other_fields() {
        let artifact: Artifact = "g:a:1".parse().unwrap();
        let dep = Dependency::new(artifact, scopes::COMPILE)
            .optional(true)
            .with_exclusions([Exclusion::new("x", "y")]);

        let rescoped = dep.with_scope(scopes::RUNTIME);
        assert_eq!(rescoped.scope, "runtime");
        assert!(rescoped.optional);
        assert_eq!(rescoped.exclusions.len(), 1);
        assert_eq!(dep.scope, "compile");
    }

    #[test]
    fn test_exclusion_wildcards() {
        let exclusion = Exclusion::new("org.slf4j", "*");
        let hit: Artifact = "org.slf4j:slf4j-api:2.0".parse().unwrap();
        let miss: Artifact = "org.apache:commons:1".parse().unwrap();

        assert!(exclusion.matches(&hit));
        assert!(!exclusion.matches(&miss));
    }

    #[test]
    fn test_display() {
        let dep = Dependency::new("g:a:1".parse().unwrap(), "test").optional(true);
        assert_eq!(dep.to_string(), "g:a:jar:1 (test?)");
    }
}
