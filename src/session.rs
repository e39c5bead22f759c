//! The repository system session: per-request settings shared by the
//! connector, the update checks and the resolution flow.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;

use crate::checksum::ChecksumPolicy;
use crate::config::{ConfigError, ConnectorConfig};
use crate::local::LocalRepository;
use crate::transfer::TransferListener;

/// Which remote failures are remembered between sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionErrorPolicy {
    pub cache_not_found: bool,
    pub cache_transfer_errors: bool,
}

impl Default for ResolutionErrorPolicy {
    fn default() -> Self {
        Self {
            cache_not_found: true,
            cache_transfer_errors: false,
        }
    }
}

/// Mutable state scoped to one session.
#[derive(Debug, Default)]
pub struct SessionData {
    checked: Mutex<HashSet<String>>,
}

impl SessionData {
    /// Whether the remote was already consulted for this key in this session.
    pub fn is_checked(&self, key: &str) -> bool {
        self.checked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }

    pub fn mark_checked(&self, key: impl Into<String>) {
        self.checked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into());
    }
}

/// Settings for one resolution or deployment request.
pub struct RepositorySystemSession {
    pub offline: bool,
    /// Overrides the repositories' checksum policies when set.
    pub checksum_policy: Option<ChecksumPolicy>,
    /// Overrides the repositories' update policies when set.
    pub update_policy: Option<String>,
    pub transfer_listener: Option<Arc<dyn TransferListener>>,
    pub local_repository: LocalRepository,
    /// Optional TOML settings layered under the configuration properties.
    pub settings_file: Option<PathBuf>,
    pub config_properties: BTreeMap<String, Value>,
    pub resolution_error_policy: ResolutionErrorPolicy,
    data: SessionData,
}

impl RepositorySystemSession {
    pub fn new(local_repository: impl AsRef<Path>) -> Self {
        Self {
            offline: false,
            checksum_policy: None,
            update_policy: None,
            transfer_listener: None,
            local_repository: LocalRepository::new(local_repository.as_ref()),
            settings_file: None,
            config_properties: BTreeMap::new(),
            resolution_error_policy: ResolutionErrorPolicy::default(),
            data: SessionData::default(),
        }
    }

    pub fn with_offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    pub fn with_checksum_policy(mut self, policy: ChecksumPolicy) -> Self {
        self.checksum_policy = Some(policy);
        self
    }

    pub fn with_update_policy(mut self, policy: impl Into<String>) -> Self {
        self.update_policy = Some(policy.into());
        self
    }

    pub fn with_transfer_listener(mut self, listener: Arc<dyn TransferListener>) -> Self {
        self.transfer_listener = Some(listener);
        self
    }

    pub fn with_settings_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_file = Some(path.into());
        self
    }

    /// Set a dotted configuration key such as `connector.threads.max`.
    pub fn with_config_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config_properties.insert(key.into(), value.into());
        self
    }

    pub fn with_resolution_error_policy(mut self, policy: ResolutionErrorPolicy) -> Self {
        self.resolution_error_policy = policy;
        self
    }

    pub fn data(&self) -> &SessionData {
        &self.data
    }

    /// Connector settings from the layered configuration.
    pub fn connector_config(&self) -> Result<ConnectorConfig, ConfigError> {
        ConnectorConfig::load(self.settings_file.as_deref(), &self.config_properties)
    }

    /// The session override, or the repository's policy.
    pub fn effective_checksum_policy(&self, repository_policy: &str) -> ChecksumPolicy {
        self.checksum_policy
            .unwrap_or_else(|| ChecksumPolicy::parse_lenient(repository_policy))
    }

    /// The session override, or the repository's policy.
    pub fn effective_update_policy(&self, repository_policy: &str) -> String {
        self.update_policy
            .clone()
            .unwrap_or_else(|| repository_policy.to_string())
    }
}
