//! Post path registry ("masquerade" mode).
//!
//! Maps a remote post id to the human-readable directory chosen for it the first time
//! the post was seen. Entries are never rewritten, so a post keeps its directory even
//! when its title changes remotely.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fs::{sanitize_dir_name, write_atomic};
use crate::store::lock::FileLocks;

const REGISTRY_VERSION: u32 = 1;

/// One registered post directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRegistryEntry {
    pub creator: String,
    pub post_id: String,
    /// Directory name relative to the creator's `posts/` directory.
    pub local_path: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct RegistryFile {
    version: u32,
    #[serde(default)]
    entries: Vec<PathRegistryEntry>,
}

impl Default for RegistryFile {
    fn default() -> Self {
        Self {
            version: REGISTRY_VERSION,
            entries: Vec::new(),
        }
    }
}

/// Lookup tables over one creator's entries.
struct RegistryIndex {
    by_post: HashMap<String, usize>,
    /// Lowercased paths, since Windows and macOS treat names case-insensitively.
    by_path: HashMap<String, usize>,
}

impl RegistryIndex {
    fn build(entries: &[PathRegistryEntry], creator: &str) -> Self {
        let mut by_post = HashMap::new();
        let mut by_path = HashMap::new();
        for (i, entry) in entries.iter().enumerate() {
            if entry.creator != creator {
                continue;
            }
            by_post.entry(entry.post_id.clone()).or_insert(i);
            by_path.entry(entry.local_path.to_lowercase()).or_insert(i);
        }
        Self { by_post, by_path }
    }

    fn path_taken(&self, name: &str) -> bool {
        self.by_path.contains_key(&name.to_lowercase())
    }
}

/// Persistent post-id → directory mapping backed by one JSON file.
#[derive(Debug, Clone)]
pub struct PathRegistry {
    path: PathBuf,
    creator: String,
    locks: FileLocks,
}

impl PathRegistry {
    /// Open the registry, creating the backing file if needed.
    ///
    /// Fails when the file cannot be created or parsed. Callers must treat that as fatal:
    /// continuing without the registry would give every known post a second directory.
    pub async fn open(path: &Path, creator: &str, locks: FileLocks) -> Result<Self> {
        let registry = Self {
            path: path.to_path_buf(),
            creator: creator.to_string(),
            locks,
        };

        let _guard = registry.locks.acquire(&registry.path).await;
        let exists = tokio::fs::try_exists(&registry.path)
            .await
            .map_err(|e| registry.error(e))?;
        if exists {
            registry.load().await?;
        } else {
            registry.save(&RegistryFile::default()).await?;
            tracing::debug!("Created post path registry {}", registry.path.display());
        }

        Ok(registry)
    }

    /// Stored entry for a post, if any.
    pub async fn get(&self, post_id: &str) -> Result<Option<PathRegistryEntry>> {
        let _guard = self.locks.acquire(&self.path).await;
        let file = self.load().await?;
        let index = RegistryIndex::build(&file.entries, &self.creator);
        Ok(index.by_post.get(post_id).map(|&i| file.entries[i].clone()))
    }

    /// Resolve the directory name of a post, registering it on first sight.
    pub async fn resolve(&self, post_id: &str, candidate_title: &str) -> Result<String> {
        let _guard = self.locks.acquire(&self.path).await;
        let mut file = self.load().await?;
        let index = RegistryIndex::build(&file.entries, &self.creator);

        if let Some(&i) = index.by_post.get(post_id) {
            return Ok(file.entries[i].local_path.clone());
        }

        let base = sanitize_dir_name(candidate_title).unwrap_or_else(|| post_id.to_string());
        let local_path = allocate_name(&index, &base, post_id);

        tracing::debug!(
            "Registering post {} as directory '{}'",
            post_id,
            local_path
        );
        file.entries.push(PathRegistryEntry {
            creator: self.creator.clone(),
            post_id: post_id.to_string(),
            local_path: local_path.clone(),
        });
        self.save(&file).await?;

        Ok(local_path)
    }

    async fn load(&self) -> Result<RegistryFile> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| self.error(e))?;
        let file: RegistryFile = serde_json::from_str(&content).map_err(|e| self.error(e))?;
        if file.version > REGISTRY_VERSION {
            return Err(self.error(format!(
                "unsupported registry version {}",
                file.version
            )));
        }
        Ok(file)
    }

    async fn save(&self, file: &RegistryFile) -> Result<()> {
        let json = serde_json::to_vec_pretty(file).map_err(|e| self.error(e))?;
        write_atomic(&self.path, &json)
            .await
            .map_err(|e| self.error(e))
    }

    fn error(&self, e: impl fmt::Display) -> Error {
        Error::Registry {
            path: self.path.clone(),
            message: e.to_string(),
        }
    }
}

/// Pick a name not yet used by another post.
fn allocate_name(index: &RegistryIndex, base: &str, post_id: &str) -> String {
    if !index.path_taken(base) {
        return base.to_string();
    }

    let suffixed = format!("{}_{}", base, post_id);
    if !index.path_taken(&suffixed) {
        return suffixed;
    }

    // Only reachable when another title literally equals "<base>_<post_id>"
    (2..)
        .map(|n| format!("{}_{}", suffixed, n))
        .find(|name| !index.path_taken(name))
        .unwrap_or(suffixed)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open_registry(dir: &Path) -> PathRegistry {
        PathRegistry::open(&dir.join("post_paths.json"), "artist", FileLocks::new())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_path_is_stable_across_title_changes() {
        let dir = tempfile::tempdir().unwrap();
        let registry = open_registry(dir.path()).await;

        let first = registry.resolve("p1", "First title").await.unwrap();
        let second = registry.resolve("p1", "Renamed title").await.unwrap();
        assert_eq!(first, "First title");
        assert_eq!(first, second);

        let reopened = open_registry(dir.path()).await;
        assert_eq!(reopened.resolve("p1", "Other").await.unwrap(), "First title");
    }

    #[tokio::test]
    async fn test_collision_is_suffixed_with_post_id() {
        let dir = tempfile::tempdir().unwrap();
        let registry = open_registry(dir.path()).await;

        let a = registry.resolve("p1", "Same: title").await.unwrap();
        let b = registry.resolve("p2", "Same? title").await.unwrap();
        assert_eq!(a, "Same_ title");
        assert_eq!(b, "Same_ title_p2");

        let entry = registry.get("p2").await.unwrap().unwrap();
        assert_eq!(entry.local_path, "Same_ title_p2");
        assert_eq!(entry.creator, "artist");
    }

    #[tokio::test]
    async fn test_collision_check_ignores_case() {
        let dir = tempfile::tempdir().unwrap();
        let registry = open_registry(dir.path()).await;

        registry.resolve("p1", "Title").await.unwrap();
        assert_eq!(registry.resolve("p2", "TITLE").await.unwrap(), "TITLE_p2");
    }

    #[tokio::test]
    async fn test_empty_title_falls_back_to_post_id() {
        let dir = tempfile::tempdir().unwrap();
        let registry = open_registry(dir.path()).await;

        assert_eq!(registry.resolve("p9", "  ?? ").await.unwrap(), "__");
        assert_eq!(registry.resolve("p10", "").await.unwrap(), "p10");
        assert_eq!(registry.resolve("p11", " ... ").await.unwrap(), "p11");
    }

    #[tokio::test]
    async fn test_concurrent_resolves_allocate_distinct_names() {
        let dir = tempfile::tempdir().unwrap();
        let registry = open_registry(dir.path()).await;

        let tasks = (0..5).map(|i| {
            let registry = registry.clone();
            async move { registry.resolve(&format!("p{}", i), "Same").await.unwrap() }
        });
        let mut names = futures::future::join_all(tasks).await;
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 5);
    }

    #[tokio::test]
    async fn test_open_fails_loudly_on_corrupt_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("post_paths.json");
        std::fs::write(&path, "garbage").unwrap();

        let result = PathRegistry::open(&path, "artist", FileLocks::new()).await;
        assert!(matches!(result, Err(Error::Registry { .. })));
    }

    #[tokio::test]
    async fn test_open_fails_when_directory_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("post_paths.json");

        let result = PathRegistry::open(&path, "artist", FileLocks::new()).await;
        assert!(matches!(result, Err(Error::Registry { .. })));
    }
}
