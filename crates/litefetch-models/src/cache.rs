//! Local cache inspection
//!
//! A local file satisfies a remote one when it exists and its byte length
//! equals the size the host reports. No content hash is checked.

use std::path::Path;

use tokio::fs;

/// Whether `path` exists with exactly `expected_size` bytes
pub async fn is_cached(path: &Path, expected_size: u64) -> bool {
    match fs::metadata(path).await {
        Ok(metadata) => metadata.is_file() && metadata.len() == expected_size,
        Err(_) => false,
    }
}

/// Whether every `(path, expected_size)` pair is cached
pub async fn all_cached<P: AsRef<Path>>(files: &[(P, u64)]) -> bool {
    for (path, size) in files {
        if !is_cached(path.as_ref(), *size).await {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_exact_size_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, b"hello world!").unwrap();

        assert!(is_cached(&path, 12).await);
        assert!(!is_cached(&path, 13).await);
        assert!(!is_cached(&path, 0).await);
    }

    #[tokio::test]
    async fn test_missing_file_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.bin");

        assert!(!is_cached(&path, 0).await);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_empty_file_matches_zero_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty");
        std::fs::write(&path, b"").unwrap();

        assert!(is_cached(&path, 0).await);
        assert!(!is_cached(&path, 1).await);
    }

    #[tokio::test]
    async fn test_directory_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let len = std::fs::metadata(dir.path()).unwrap().len();
        assert!(!is_cached(dir.path(), len).await);
    }

    #[tokio::test]
    async fn test_all_cached() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        std::fs::write(&a, b"aa").unwrap();
        std::fs::write(&b, b"bbb").unwrap();

        assert!(all_cached(&[(&a, 2), (&b, 3)]).await);
        assert!(!all_cached(&[(&a, 2), (&b, 4)]).await);
        assert!(all_cached::<&Path>(&[]).await);
    }
}
