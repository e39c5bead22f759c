//! Checksum computation, checksum side-files and checksum policies.

mod algorithm;
mod calculator;
mod file;
mod policy;

pub use algorithm::{ChecksumAlgorithm, UnknownAlgorithm};
pub use calculator::{ChecksumCalculator, Checksums};
pub use file::{parse_checksum, read_checksum_file, write_checksum_file};
pub use policy::ChecksumPolicy;

/// Why a payload could not be verified.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChecksumFailure {
    #[error("Checksum validation failed, expected {expected} but is {actual} ({algorithm})")]
    Mismatch {
        algorithm: ChecksumAlgorithm,
        expected: String,
        actual: String,
    },

    #[error("Checksum validation failed, no supported algorithms found")]
    NotAvailable,

    #[error("Checksum validation failed, could not read checksum: {0}")]
    Unreadable(String),
}

impl ChecksumFailure {
    /// A mismatch may be a corrupted transfer, so downloading again can help.
    pub fn is_retry_worthy(&self) -> bool {
        matches!(self, ChecksumFailure::Mismatch { .. })
    }
}
