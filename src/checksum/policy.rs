//! Checksum policies.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// What to do when a payload cannot be verified.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumPolicy {
    /// Skip verification entirely.
    Ignore,
    /// Report a corrupted transfer and keep the payload.
    #[default]
    Warn,
    /// Fail the transfer.
    Fail,
}

impl ChecksumPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            ChecksumPolicy::Ignore => "ignore",
            ChecksumPolicy::Warn => "warn",
            ChecksumPolicy::Fail => "fail",
        }
    }

    /// Parse a policy string; anything unrecognised is treated as `warn`.
    pub fn parse_lenient(policy: &str) -> Self {
        policy.parse().unwrap_or_else(|_| {
            warn!(policy, "unknown checksum policy, using warn");
            ChecksumPolicy::Warn
        })
    }

    /// The stricter of two policies.
    pub fn most_strict(self, other: ChecksumPolicy) -> ChecksumPolicy {
        self.max(other)
    }
}

impl fmt::Display for ChecksumPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChecksumPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(ChecksumPolicy::Ignore),
            "warn" => Ok(ChecksumPolicy::Warn),
            "fail" => Ok(ChecksumPolicy::Fail),
            other => Err(format!("unknown checksum policy '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_most_strict_wins() {
        use ChecksumPolicy::*;
        assert_eq!(Ignore.most_strict(Warn), Warn);
        assert_eq!(Fail.most_strict(Warn), Fail);
        assert_eq!(Ignore.most_strict(Ignore), Ignore);
        assert_eq!(Warn.most_strict(Fail), Fail);
    }

    #[test]
    fn test_parse() {
        assert_eq!("FAIL".parse(), Ok(ChecksumPolicy::Fail));
        assert_eq!(ChecksumPolicy::parse_lenient("bogus"), ChecksumPolicy::Warn);
        assert_eq!(ChecksumPolicy::parse_lenient("ignore"), ChecksumPolicy::Ignore);
    }
}
