//! SHA-256 integrity verification for downloaded artifacts.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use super::error::{TransferError, TransferResult};

/// Buffer size for reading files during checksum calculation (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Result of checking a file against an expected digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// The digest matched.
    Match,
    /// The digest did not match; `actual` is the lowercase hex digest.
    Mismatch { actual: String },
    /// No digest was given, so nothing was checked.
    Unspecified,
}

impl Verification {
    /// Whether the file may be kept.
    pub fn is_acceptable(&self) -> bool {
        !matches!(self, Self::Mismatch { .. })
    }
}

/// Calculate the SHA-256 checksum of a file.
///
/// Returns the lowercase hexadecimal digest.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn calculate_file_checksum(path: &Path) -> TransferResult<String> {
    let mut file = File::open(path).map_err(|e| TransferError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| TransferError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            })?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Check `path` against an optional expected digest.
///
/// The comparison ignores surrounding whitespace and hex case. An expected
/// value of `""` is treated as a real digest and therefore never matches.
/// With no expected value the file is not opened at all.
///
/// # Errors
///
/// Returns an error if a digest is expected and the file cannot be read.
pub fn verify(path: &Path, expected: Option<&str>) -> TransferResult<Verification> {
    let Some(expected) = expected else {
        return Ok(Verification::Unspecified);
    };

    let actual = calculate_file_checksum(path)?;
    let expected = expected.trim();
    if !expected.is_empty() && actual.eq_ignore_ascii_case(expected) {
        Ok(Verification::Match)
    } else {
        Ok(Verification::Mismatch { actual })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const HELLO_WORLD: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    fn hello_file(temp: &TempDir) -> std::path::PathBuf {
        let path = temp.path().join("test.txt");
        let mut file = File::create(&path).unwrap();
        file.write_all(b"hello world").unwrap();
        path
    }

    #[test]
    fn test_calculate_file_checksum() {
        let temp = TempDir::new().unwrap();
        let path = hello_file(&temp);
        assert_eq!(calculate_file_checksum(&path).unwrap(), HELLO_WORLD);
    }

    #[test]
    fn test_calculate_empty_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("empty.txt");
        File::create(&path).unwrap();

        assert_eq!(
            calculate_file_checksum(&path).unwrap(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_calculate_larger_than_buffer() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("large.bin");
        std::fs::write(&path, vec![0xABu8; 200_000]).unwrap();

        let first = calculate_file_checksum(&path).unwrap();
        let second = calculate_file_checksum(&path).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn test_verify_match_ignores_case_and_whitespace() {
        let temp = TempDir::new().unwrap();
        let path = hello_file(&temp);

        let upper = format!("  {}\n", HELLO_WORLD.to_uppercase());
        assert_eq!(verify(&path, Some(&upper)).unwrap(), Verification::Match);
    }

    #[test]
    fn test_verify_mismatch_reports_actual() {
        let temp = TempDir::new().unwrap();
        let path = hello_file(&temp);

        assert_eq!(
            verify(&path, Some("deadbeef")).unwrap(),
            Verification::Mismatch {
                actual: HELLO_WORLD.to_string()
            }
        );
    }

    #[test]
    fn test_empty_expected_never_matches() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("empty.txt");
        File::create(&path).unwrap();

        let result = verify(&path, Some("")).unwrap();
        assert!(!result.is_acceptable());

        let result = verify(&path, Some("   ")).unwrap();
        assert!(!result.is_acceptable());
    }

    #[test]
    fn test_unspecified_does_not_open_file() {
        let result = verify(Path::new("/nonexistent/file.bin"), None).unwrap();
        assert_eq!(result, Verification::Unspecified);
        assert!(result.is_acceptable());
    }

    #[test]
    fn test_verify_missing_file_with_hash_errors() {
        let result = verify(Path::new("/nonexistent/file.bin"), Some(HELLO_WORLD));
        assert!(matches!(result, Err(TransferError::ReadFailed { .. })));
    }
}
