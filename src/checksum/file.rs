//! Checksum side-files (`<file>.sha1`, `<file>.md5`).
//!
//! Accepted contents: a bare hex digest, a GNU line `<hash>  <filename>`,
//! or a BSD line `SHA1 (<filename>) = <hash>`. Only the first non-blank
//! line is considered.

use std::fs;
use std::io;
use std::path::Path;

/// Extract the digest from checksum file contents.
pub fn parse_checksum(text: &str) -> Option<String> {
    let line = text.lines().map(str::trim).find(|l| !l.is_empty())?;

    if let Some((_, hash)) = line.rsplit_once("= ") {
        let hash = hash.trim();
        if !hash.is_empty() && hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Some(hash.to_string());
        }
    }
    line.split_whitespace().next().map(str::to_string)
}

/// Read the digest from a checksum file.
pub fn read_checksum_file(path: &Path) -> io::Result<String> {
    let text = fs::read_to_string(path)?;
    parse_checksum(&text).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{} contains no checksum", path.display()),
        )
    })
}

/// Write a digest as a single lower-case line.
pub fn write_checksum_file(path: &Path, checksum: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, format!("{}\n", checksum.to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::{ChecksumAlgorithm, ChecksumCalculator};
    use proptest::prelude::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_formats() {
        assert_eq!(parse_checksum("abc123\n").as_deref(), Some("abc123"));
        assert_eq!(parse_checksum("\n\n  ABC123  \n").as_deref(), Some("ABC123"));
        assert_eq!(
            parse_checksum("abc123  lib-1.0.jar\n").as_deref(),
            Some("abc123")
        );
        assert_eq!(
            parse_checksum("SHA1 (lib-1.0.jar) = abc123").as_deref(),
            Some("abc123")
        );
        assert_eq!(parse_checksum("   \n"), None);
    }

    #[test]
    fn test_write_then_read_with_gnu_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lib.jar.sha1");
        let sums = ChecksumCalculator::calculate_bytes(b"payload", &[ChecksumAlgorithm::Sha1]);
        let sha1 = &sums[&ChecksumAlgorithm::Sha1];

        write_checksum_file(&path, &sha1.to_ascii_uppercase()).unwrap();
        assert_eq!(&read_checksum_file(&path).unwrap(), sha1);

        fs::write(&path, format!("{}  lib.jar\n", sha1.to_ascii_uppercase())).unwrap();
        assert!(read_checksum_file(&path)
            .unwrap()
            .eq_ignore_ascii_case(sha1));
    }

    #[test]
    fn test_read_empty_file_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.md5");
        fs::write(&path, "").unwrap();

        let err = read_checksum_file(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    proptest! {
        #[test]
        fn test_written_checksums_read_back(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            let dir = TempDir::new().unwrap();
            let sums = ChecksumCalculator::calculate_bytes(
                &data,
                &[ChecksumAlgorithm::Sha1, ChecksumAlgorithm::Md5],
            );
            for (algorithm, hex) in sums {
                let path = dir.path().join(format!("payload.{}", algorithm.extension()));
                write_checksum_file(&path, &hex).unwrap();
                prop_assert_eq!(read_checksum_file(&path).unwrap(), hex.clone());

                std::fs::write(&path, format!("{}  payload\n", hex)).unwrap();
                prop_assert_eq!(read_checksum_file(&path).unwrap(), hex);
            }
        }
    }
}
