//! Streaming digests over several algorithms at once.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};

use super::ChecksumAlgorithm;

/// Hex digests by algorithm.
pub type Checksums = BTreeMap<ChecksumAlgorithm, String>;

enum Hasher {
    Sha1(Sha1),
    Md5(Md5),
    Sha256(Sha256),
}

impl Hasher {
    fn new(algorithm: ChecksumAlgorithm) -> Self {
        match algorithm {
            ChecksumAlgorithm::Sha1 => Hasher::Sha1(Sha1::new()),
            ChecksumAlgorithm::Md5 => Hasher::Md5(Md5::new()),
            ChecksumAlgorithm::Sha256 => Hasher::Sha256(Sha256::new()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Hasher::Sha1(h) => h.update(data),
            Hasher::Md5(h) => h.update(data),
            Hasher::Sha256(h) => h.update(data),
        }
    }

    fn finish(self) -> String {
        match self {
            Hasher::Sha1(h) => hex::encode(h.finalize()),
            Hasher::Md5(h) => hex::encode(h.finalize()),
            Hasher::Sha256(h) => hex::encode(h.finalize()),
        }
    }
}

/// Feeds one byte stream into several digests.
pub struct ChecksumCalculator {
    hashers: Vec<(ChecksumAlgorithm, Hasher)>,
}

impl ChecksumCalculator {
    pub fn new(algorithms: &[ChecksumAlgorithm]) -> Self {
        Self {
            hashers: algorithms.iter().map(|&a| (a, Hasher::new(a))).collect(),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        for (_, hasher) in &mut self.hashers {
            hasher.update(data);
        }
    }

    /// Lower-case hex digests.
    pub fn finish(self) -> Checksums {
        self.hashers
            .into_iter()
            .map(|(algorithm, hasher)| (algorithm, hasher.finish()))
            .collect()
    }

    pub fn calculate_bytes(data: &[u8], algorithms: &[ChecksumAlgorithm]) -> Checksums {
        let mut calculator = Self::new(algorithms);
        calculator.update(data);
        calculator.finish()
    }

    /// Digest a file, reading it once.
    pub fn calculate_file(path: &Path, algorithms: &[ChecksumAlgorithm]) -> io::Result<Checksums> {
        let mut file = File::open(path)?;
        let mut calculator = Self::new(algorithms);
        let mut buffer = [0u8; 32 * 1024];
        loop {
            let read = file.read(&mut buffer)?;
            if read == 0 {
                break;
            }
            calculator.update(&buffer[..read]);
        }
        Ok(calculator.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const ALL: [ChecksumAlgorithm; 3] = [
        ChecksumAlgorithm::Sha1,
        ChecksumAlgorithm::Md5,
        ChecksumAlgorithm::Sha256,
    ];

    #[test]
    fn test_known_digests() {
        let sums = ChecksumCalculator::calculate_bytes(b"hello", &ALL);
        assert_eq!(sums[&ChecksumAlgorithm::Sha1], "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d");
        assert_eq!(sums[&ChecksumAlgorithm::Md5], "5d41402abc4b2a76b9719d911017c592");
        assert_eq!(
            sums[&ChecksumAlgorithm::Sha256],
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_file_matches_bytes() {
        let mut temp = tempfile::NamedTempFile::new().unwrap();
        let data = vec![7u8; 100_000];
        temp.write_all(&data).unwrap();

        let from_file = ChecksumCalculator::calculate_file(temp.path(), &ALL).unwrap();
        assert_eq!(from_file, ChecksumCalculator::calculate_bytes(&data, &ALL));
    }

    #[test]
    fn test_digest_lengths() {
        let sums = ChecksumCalculator::calculate_bytes(b"", &ALL);
        for (algorithm, hex) in sums {
            assert_eq!(hex.len(), algorithm.hex_len());
        }
    }
}
