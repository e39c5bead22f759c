//! Connector configuration
//!
//! Implements the 3-layer configuration merge:
//! 1. Built-in defaults
//! 2. Settings file (TOML)
//! 3. Session configuration properties

mod defaults;
mod effective;
mod merge;

pub use defaults::BuiltinDefaults;
pub use effective::{ConfigError, ConfigOrigin, ConfigSource, ConnectorConfig, EffectiveConfig};
pub use merge::{deep_merge, expand_dotted, merge_layers};

/// Worker threads for concurrent transfers; `<= 1` runs transfers on the caller's thread.
pub const THREADS_MAX: &str = "connector.threads.max";

/// Connection establishment timeout in milliseconds.
pub const CONNECT_TIMEOUT_MS: &str = "connector.connect.timeout.ms";

/// Per-request timeout in milliseconds.
pub const REQUEST_TIMEOUT_MS: &str = "connector.request.timeout.ms";

/// Checksum algorithms to verify and publish, in preference order.
pub const CHECKSUM_ALGORITHMS: &str = "connector.checksums.algorithms";

/// User agent reported by network transports.
pub const USER_AGENT: &str = "connector.user.agent";
