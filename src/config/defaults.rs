//! Built-in connector defaults (layer 1)

use serde::{Deserialize, Serialize};

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Transfer worker threads (default: 5)
    pub threads_max: u64,

    /// Connect timeout in milliseconds (default: 10 seconds)
    pub connect_timeout_ms: u64,

    /// Request timeout in milliseconds (default: 30 minutes)
    pub request_timeout_ms: u64,

    /// Checksum algorithms (default: SHA-1, then MD5)
    pub checksum_algorithms: Vec<String>,

    /// User agent (default: "repo-client/<version>")
    pub user_agent: String,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            threads_max: 5,
            connect_timeout_ms: 10_000,
            request_timeout_ms: 1_800_000,
            checksum_algorithms: vec!["SHA-1".to_string(), "MD5".to_string()],
            user_agent: format!("repo-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "connector": {
                "threads": { "max": self.threads_max },
                "connect": { "timeout": { "ms": self.connect_timeout_ms } },
                "request": { "timeout": { "ms": self.request_timeout_ms } },
                "checksums": { "algorithms": self.checksum_algorithms },
                "user": { "agent": self.user_agent }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let defaults = BuiltinDefaults::default();
        assert_eq!(defaults.threads_max, 5);
        assert_eq!(defaults.connect_timeout_ms, 10_000);
        assert_eq!(defaults.request_timeout_ms, 1_800_000);
        assert_eq!(defaults.checksum_algorithms, ["SHA-1", "MD5"]);
        assert!(defaults.user_agent.starts_with("repo-client/"));
    }

    #[test]
    fn test_to_value() {
        let value = BuiltinDefaults::default().to_value();

        assert_eq!(value["connector"]["threads"]["max"], 5);
        assert_eq!(value["connector"]["connect"]["timeout"]["ms"], 10_000);
        assert_eq!(value["connector"]["checksums"]["algorithms"][1], "MD5");
    }
}
