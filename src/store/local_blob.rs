//! Filesystem-backed blob store.

use super::BlobStore;
use anyhow::{bail, Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

/// Stores each blob as one file directly under a base directory.
pub struct LocalBlobStore {
    base_dir: PathBuf,
}

impl LocalBlobStore {
    /// Create the store, creating `base_dir` if needed.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)
            .with_context(|| format!("creating blob directory {}", base_dir.display()))?;
        Ok(Self { base_dir })
    }

    /// Keys are engine-generated but never trusted as paths.
    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty()
            || key.contains('/')
            || key.contains('\\')
            || key.contains("..")
            || key.contains('\0')
        {
            bail!("invalid blob key: {key:?}");
        }
        Ok(self.base_dir.join(key))
    }
}

impl BlobStore for LocalBlobStore {
    fn put(&self, key: &str, data: &[u8]) -> Result<String> {
        let path = self.path_for(key)?;
        fs::write(&path, data).with_context(|| format!("writing blob {}", path.display()))?;
        Ok(key.to_string())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading blob {}", path.display())),
        }
    }

    fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        fs::remove_file(&path).with_context(|| format!("deleting blob {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, LocalBlobStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path().join("blobs")).unwrap();
        (dir, store)
    }

    #[test]
    fn put_get_roundtrip() {
        let (_dir, store) = store();
        let key = store.put("abc_receipt.jpg", b"bytes").unwrap();
        assert_eq!(key, "abc_receipt.jpg");
        assert_eq!(store.get("abc_receipt.jpg").unwrap().unwrap(), b"bytes");
    }

    #[test]
    fn get_missing_is_none() {
        let (_dir, store) = store();
        assert!(store.get("nope.png").unwrap().is_none());
    }

    #[test]
    fn delete_removes_and_missing_delete_errors() {
        let (_dir, store) = store();
        store.put("k.png", b"x").unwrap();
        store.delete("k.png").unwrap();
        assert!(store.get("k.png").unwrap().is_none());
        assert!(store.delete("k.png").is_err());
    }

    #[test]
    fn rejects_path_like_keys() {
        let (_dir, store) = store();
        for key in ["", "../escape", "a/b", "a\\b", "x\0y"] {
            assert!(store.put(key, b"x").is_err(), "{key:?}");
        }
    }
}
