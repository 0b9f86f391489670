//! Per-file async locks keyed by canonical path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex, OnceLock};

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of one lock per distinct backing file.
///
/// Locks are created lazily the first time a path is seen. Different files never
/// share a lock, so unrelated creators proceed in parallel.
#[derive(Debug, Clone, Default)]
pub struct FileLocks {
    locks: Arc<StdMutex<HashMap<PathBuf, Arc<Mutex<()>>>>>,
}

impl FileLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn shared() -> Self {
        static SHARED: OnceLock<FileLocks> = OnceLock::new();
        SHARED.get_or_init(FileLocks::new).clone()
    }

    /// Get (or create) the lock guarding `path`.
    pub fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        let key = canonical_key(path);
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(key).or_default().clone()
    }

    /// Wait for exclusive access to `path`.
    pub async fn acquire(&self, path: &Path) -> OwnedMutexGuard<()> {
        self.lock_for(path).lock_owned().await
    }

    /// Number of distinct files seen so far.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolve `path` to an absolute, symlink-free key, even when the file does not exist yet.
pub fn canonical_key(path: &Path) -> PathBuf {
    if let Ok(canonical) = std::fs::canonicalize(path) {
        return canonical;
    }

    if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
        let parent = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };
        if let Ok(canonical_parent) = std::fs::canonicalize(parent) {
            return canonical_parent.join(name);
        }
    }

    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_file_shares_lock() {
        let dir = tempfile::tempdir().unwrap();
        let locks = FileLocks::new();

        let direct = dir.path().join("sync_data.json");
        let indirect = dir.path().join("sub").join("..").join("sync_data.json");
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let a = locks.lock_for(&direct);
        let b = locks.lock_for(&indirect);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(locks.len(), 1);
    }

    #[test]
    fn test_different_files_get_different_locks() {
        let dir = tempfile::tempdir().unwrap();
        let locks = FileLocks::new();

        let a = locks.lock_for(&dir.path().join("a.json"));
        let b = locks.lock_for(&dir.path().join("b.json"));
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_acquire_is_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let locks = FileLocks::new();
        let path = dir.path().join("x.json");

        let guard = locks.acquire(&path).await;
        assert!(locks.lock_for(&path).try_lock().is_err());
        drop(guard);
        assert!(locks.lock_for(&path).try_lock().is_ok());
    }
}
