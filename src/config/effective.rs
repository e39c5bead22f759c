//! Effective configuration with provenance
//!
//! The merged configuration plus where each layer came from, and the typed
//! [`ConnectorConfig`] view the transfer engine consumes.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::defaults::BuiltinDefaults;
use super::merge::{expand_dotted, merge_layers};
use super::{CHECKSUM_ALGORITHMS, CONNECT_TIMEOUT_MS, REQUEST_TIMEOUT_MS, THREADS_MAX, USER_AGENT};
use crate::checksum::ChecksumAlgorithm;

/// Origin of a configuration source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    Settings,
    Session,
}

/// A contributing config source with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (settings files only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw file bytes (settings files only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Merged configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    /// When this config was computed
    pub created_at: DateTime<Utc>,

    /// The merged configuration object
    pub config: Value,

    /// Contributing sources in precedence order
    pub sources: Vec<ConfigSource>,

    /// Redacted key paths
    pub redactions: Vec<String>,
}

/// Keys that hold credentials and are never kept in the merged config
const SECRET_KEYS: &[&str] = &["password", "passphrase", "private_key", "token"];

/// Upper bound for `connector.threads.max`.
pub const MAX_THREADS: u64 = 256;

impl EffectiveConfig {
    /// Build effective config from the settings file and session properties
    pub fn build(
        settings_path: Option<&Path>,
        properties: &BTreeMap<String, Value>,
    ) -> Result<Self, ConfigError> {
        let mut layers = vec![BuiltinDefaults::default().to_value()];
        let mut sources = vec![ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        }];

        if let Some(path) = settings_path {
            if path.exists() {
                let (value, digest) = Self::load_toml_file(path)?;
                layers.push(value);
                sources.push(ConfigSource {
                    origin: ConfigOrigin::Settings,
                    path: Some(path.to_string_lossy().to_string()),
                    digest: Some(digest),
                });
            }
        }

        if !properties.is_empty() {
            layers.push(expand_dotted(properties));
            sources.push(ConfigSource {
                origin: ConfigOrigin::Session,
                path: None,
                digest: None,
            });
        }

        let mut merged = merge_layers(layers);
        let redactions = Self::redact_secrets(&mut merged);

        Ok(Self {
            created_at: Utc::now(),
            config: merged,
            sources,
            redactions,
        })
    }

    /// Load and parse a TOML file, returning the value and digest
    fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
        let bytes = fs::read(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let digest = hex::encode(Sha256::digest(&bytes));

        let contents = String::from_utf8(bytes)
            .map_err(|e| ConfigError::Parse(format!("Invalid UTF-8: {}", e)))?;
        let toml_value: toml::Value = toml::from_str(&contents)
            .map_err(|e| ConfigError::Parse(format!("TOML parse error: {}", e)))?;

        Ok((Self::toml_to_json(toml_value), digest))
    }

    fn toml_to_json(toml: toml::Value) -> Value {
        match toml {
            toml::Value::String(s) => Value::String(s),
            toml::Value::Integer(i) => Value::Number(i.into()),
            toml::Value::Float(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            toml::Value::Boolean(b) => Value::Bool(b),
            toml::Value::Datetime(dt) => Value::String(dt.to_string()),
            toml::Value::Array(arr) => {
                Value::Array(arr.into_iter().map(Self::toml_to_json).collect())
            }
            toml::Value::Table(table) => Value::Object(
                table
                    .into_iter()
                    .map(|(k, v)| (k, Self::toml_to_json(v)))
                    .collect(),
            ),
        }
    }

    fn redact_secrets(value: &mut Value) -> Vec<String> {
        let mut redactions = Vec::new();
        Self::redact_recursive(value, String::new(), &mut redactions);
        redactions
    }

    fn redact_recursive(value: &mut Value, path: String, redactions: &mut Vec<String>) {
        match value {
            Value::Object(map) => {
                for (key, val) in map.iter_mut() {
                    let current_path = if path.is_empty() {
                        key.clone()
                    } else {
                        format!("{}.{}", path, key)
                    };
                    let key_lower = key.to_lowercase();
                    let is_secret = SECRET_KEYS.iter().any(|s| key_lower.contains(s));

                    if is_secret && !val.is_object() && !val.is_array() {
                        *val = Value::String("[REDACTED]".to_string());
                        redactions.push(current_path);
                    } else {
                        Self::redact_recursive(val, current_path, redactions);
                    }
                }
            }
            Value::Array(arr) => {
                for (i, val) in arr.iter_mut().enumerate() {
                    Self::redact_recursive(val, format!("{}[{}]", path, i), redactions);
                }
            }
            _ => {}
        }
    }

    /// Get a config value by path (dot-separated)
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.config;
        for part in path.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    pub fn get_u64(&self, path: &str) -> Option<u64> {
        self.get(path).and_then(|v| v.as_u64())
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(|v| v.as_str())
    }
}

/// Typed connector settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorConfig {
    /// Worker threads; `<= 1` means transfers run on the calling thread.
    pub threads: usize,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Verified on download and published on upload, in this order.
    pub checksum_algorithms: Vec<ChecksumAlgorithm>,
    pub user_agent: String,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        let defaults = BuiltinDefaults::default();
        Self {
            threads: defaults.threads_max as usize,
            connect_timeout: Duration::from_millis(defaults.connect_timeout_ms),
            request_timeout: Duration::from_millis(defaults.request_timeout_ms),
            checksum_algorithms: vec![ChecksumAlgorithm::Sha1, ChecksumAlgorithm::Md5],
            user_agent: defaults.user_agent,
        }
    }
}

impl ConnectorConfig {
    /// Validate and extract the connector keys.
    pub fn from_effective(config: &EffectiveConfig) -> Result<Self, ConfigError> {
        let threads = required_u64(config, THREADS_MAX)?;
        if threads > MAX_THREADS {
            return Err(invalid(
                THREADS_MAX,
                format!("must not exceed {}", MAX_THREADS),
            ));
        }
        let connect_timeout = positive_millis(config, CONNECT_TIMEOUT_MS)?;
        let request_timeout = positive_millis(config, REQUEST_TIMEOUT_MS)?;

        let names = config
            .get(CHECKSUM_ALGORITHMS)
            .and_then(Value::as_array)
            .ok_or_else(|| invalid(CHECKSUM_ALGORITHMS, "expected an array of algorithm names"))?;
        let mut checksum_algorithms = Vec::with_capacity(names.len());
        for name in names {
            let algorithm = name
                .as_str()
                .ok_or_else(|| invalid(CHECKSUM_ALGORITHMS, "algorithm names must be strings"))?
                .parse::<ChecksumAlgorithm>()
                .map_err(|e| invalid(CHECKSUM_ALGORITHMS, e.to_string()))?;
            if !checksum_algorithms.contains(&algorithm) {
                checksum_algorithms.push(algorithm);
            }
        }

        let user_agent = config
            .get_str(USER_AGENT)
            .ok_or_else(|| invalid(USER_AGENT, "expected a string"))?
            .to_string();

        Ok(Self {
            threads: threads as usize,
            connect_timeout,
            request_timeout,
            checksum_algorithms,
            user_agent,
        })
    }

    /// Merge the layers and extract the connector keys.
    pub fn load(
        settings_path: Option<&Path>,
        properties: &BTreeMap<String, Value>,
    ) -> Result<Self, ConfigError> {
        Self::from_effective(&EffectiveConfig::build(settings_path, properties)?)
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_checksum_algorithms(mut self, algorithms: Vec<ChecksumAlgorithm>) -> Self {
        self.checksum_algorithms = algorithms;
        self
    }
}

fn required_u64(config: &EffectiveConfig, key: &str) -> Result<u64, ConfigError> {
    config
        .get_u64(key)
        .ok_or_else(|| invalid(key, "expected a non-negative integer"))
}

fn positive_millis(config: &EffectiveConfig, key: &str) -> Result<Duration, ConfigError> {
    match required_u64(config, key)? {
        0 => Err(invalid(key, "must be greater than zero")),
        ms => Ok(Duration::from_millis(ms)),
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn properties(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_build_with_defaults_only() {
        let config = EffectiveConfig::build(None, &BTreeMap::new()).unwrap();

        assert_eq!(config.get_u64(THREADS_MAX), Some(5));
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0].origin, ConfigOrigin::Builtin);
    }

    #[test]
    fn test_session_properties_override_settings_file() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "[connector.threads]").unwrap();
        writeln!(temp, "max = 8").unwrap();
        writeln!(temp, "[connector.request.timeout]").unwrap();
        writeln!(temp, "ms = 5000").unwrap();

        let props = properties(&[(THREADS_MAX, json!(2))]);
        let config = EffectiveConfig::build(Some(temp.path()), &props).unwrap();

        assert_eq!(config.get_u64(THREADS_MAX), Some(2));
        assert_eq!(config.get_u64(REQUEST_TIMEOUT_MS), Some(5000));
        assert_eq!(config.sources.len(), 3);
        assert_eq!(config.sources[1].origin, ConfigOrigin::Settings);
        assert_eq!(config.sources[1].digest.as_ref().map(String::len), Some(64));
    }

    #[test]
    fn test_missing_settings_file_is_skipped() {
        let config =
            EffectiveConfig::build(Some(Path::new("/nonexistent/settings.toml")), &BTreeMap::new())
                .unwrap();
        assert_eq!(config.sources.len(), 1);
    }

    #[test]
    fn test_malformed_settings_file() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "[connector").unwrap();

        let err = EffectiveConfig::build(Some(temp.path()), &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_secret_redaction() {
        let props = properties(&[
            ("server.central.password", json!("hunter2")),
            ("server.central.username", json!("deployer")),
        ]);
        let config = EffectiveConfig::build(None, &props).unwrap();

        assert_eq!(config.get_str("server.central.password"), Some("[REDACTED]"));
        assert_eq!(config.get_str("server.central.username"), Some("deployer"));
        assert_eq!(config.redactions, ["server.central.password"]);
    }

    #[test]
    fn test_connector_config_defaults() {
        let config = ConnectorConfig::load(None, &BTreeMap::new()).unwrap();
        assert_eq!(config, ConnectorConfig::default());
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_connector_config_overrides() {
        let props = properties(&[
            (THREADS_MAX, json!(1)),
            (CHECKSUM_ALGORITHMS, json!(["sha-256", "SHA-1", "SHA-256"])),
        ]);
        let config = ConnectorConfig::load(None, &props).unwrap();

        assert_eq!(config.threads, 1);
        assert_eq!(
            config.checksum_algorithms,
            [ChecksumAlgorithm::Sha256, ChecksumAlgorithm::Sha1]
        );
    }

    #[test]
    fn test_invalid_values_name_the_key() {
        let err = ConnectorConfig::load(None, &properties(&[(THREADS_MAX, json!("many"))]))
            .unwrap_err();
        assert!(err.to_string().contains(THREADS_MAX));

        let err = ConnectorConfig::load(None, &properties(&[(CONNECT_TIMEOUT_MS, json!(0))]))
            .unwrap_err();
        assert!(err.to_string().contains(CONNECT_TIMEOUT_MS));

        let err =
            ConnectorConfig::load(None, &properties(&[(CHECKSUM_ALGORITHMS, json!(["CRC32"]))]))
                .unwrap_err();
        assert!(err.to_string().contains("CRC32"));
    }

    #[test]
    fn test_thread_count_is_bounded() {
        let err = ConnectorConfig::load(None, &properties(&[(THREADS_MAX, json!(u64::MAX))]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == THREADS_MAX));

        let config =
            ConnectorConfig::load(None, &properties(&[(THREADS_MAX, json!(MAX_THREADS))])).unwrap();
        assert_eq!(config.threads, MAX_THREADS as usize);
    }
}
