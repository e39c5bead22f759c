//! Remote repository descriptors and their policies.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Update and checksum policy for one kind of artifact (release or snapshot).
///
/// Policies are kept as the raw strings found in settings; they are parsed
/// by the consumer that enforces them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryPolicy {
    #[serde(default = "enabled")]
    pub enabled: bool,
    #[serde(default = "daily")]
    pub update_policy: String,
    #[serde(default = "warn")]
    pub checksum_policy: String,
}

fn enabled() -> bool {
    true
}

fn daily() -> String {
    "daily".to_string()
}

fn warn() -> String {
    "warn".to_string()
}

impl Default for RepositoryPolicy {
    fn default() -> Self {
        Self {
            enabled: enabled(),
            update_policy: daily(),
            checksum_policy: warn(),
        }
    }
}

impl RepositoryPolicy {
    pub fn new(
        enabled: bool,
        update_policy: impl Into<String>,
        checksum_policy: impl Into<String>,
    ) -> Self {
        Self {
            enabled,
            update_policy: update_policy.into(),
            checksum_policy: checksum_policy.into(),
        }
    }
}

/// Credentials for a repository.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authentication {
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl fmt::Debug for Authentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authentication")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Proxy to route repository traffic through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proxy {
    #[serde(rename = "type")]
    pub proxy_type: String,
    pub host: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<Authentication>,
}

/// A remote repository: identity, location and policies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRepository {
    pub id: String,
    pub url: String,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    #[serde(default)]
    pub release_policy: RepositoryPolicy,
    #[serde(default)]
    pub snapshot_policy: RepositoryPolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<Authentication>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<Proxy>,
}

fn default_content_type() -> String {
    "default".to_string()
}

impl RemoteRepository {
    /// Repository with the default layout and policies.
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            content_type: default_content_type(),
            release_policy: RepositoryPolicy::default(),
            snapshot_policy: RepositoryPolicy::default(),
            authentication: None,
            proxy: None,
        }
    }

    /// Replace both release and snapshot policies.
    pub fn with_policy(mut self, policy: RepositoryPolicy) -> Self {
        self.release_policy = policy.clone();
        self.snapshot_policy = policy;
        self
    }

    pub fn with_authentication(mut self, authentication: Authentication) -> Self {
        self.authentication = Some(authentication);
        self
    }

    /// The policy governing snapshot or release artifacts.
    pub fn policy(&self, snapshot: bool) -> &RepositoryPolicy {
        if snapshot {
            &self.snapshot_policy
        } else {
            &self.release_policy
        }
    }

    /// URL scheme (`file`, `https`, ...), lower-cased.
    pub fn protocol(&self) -> String {
        self.url
            .split_once(':')
            .map(|(scheme, _)| scheme.to_ascii_lowercase())
            .unwrap_or_default()
    }
}

impl fmt::Display for RemoteRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.id, self.url, self.content_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol() {
        assert_eq!(RemoteRepository::new("c", "HTTPS://repo.example/m2").protocol(), "https");
        assert_eq!(RemoteRepository::new("l", "file:///tmp/repo").protocol(), "file");
        assert_eq!(RemoteRepository::new("x", "no-scheme").protocol(), "");
    }

    #[test]
    fn test_policy_selection() {
        let mut repo = RemoteRepository::new("central", "file:///repo");
        repo.snapshot_policy = RepositoryPolicy::new(true, "always", "fail");

        assert_eq!(repo.policy(true).update_policy, "always");
        assert_eq!(repo.policy(false).update_policy, "daily");
    }

    #[test]
    fn test_deserialize_defaults() {
        let repo: RemoteRepository =
            serde_json::from_str(r#"{"id":"central","url":"file:///repo"}"#).unwrap();
        assert_eq!(repo.content_type, "default");
        assert!(repo.release_policy.enabled);
        assert_eq!(repo.release_policy.checksum_policy, "warn");
    }

    #[test]
    fn test_authentication_debug_redacts_password() {
        let auth = Authentication {
            username: "deployer".to_string(),
            password: "hunter2".to_string(),
        };
        let debug = format!("{:?}", auth);
        assert!(debug.contains("deployer"));
        assert!(!debug.contains("hunter2"));
    }
}
