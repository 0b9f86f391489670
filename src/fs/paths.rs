//! Path and directory management.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::fs::naming::sanitize_path_component;

/// Name of the per-creator directory holding sync state.
pub const CACHE_DIR_NAME: &str = "__cache__";

/// Checkpoint file name inside the cache directory.
pub const CHECKPOINT_FILE_NAME: &str = "sync_data.json";

/// Post path registry file name inside the cache directory.
pub const REGISTRY_FILE_NAME: &str = "post_paths.json";

/// Suffix marking an in-progress download.
pub const PART_SUFFIX: &str = ".part";

/// Resolved on-disk locations for one creator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatorPaths {
    pub root: PathBuf,
}

impl CreatorPaths {
    /// Build the creator paths under the sync directory (with path traversal protection).
    pub fn new(sync_dir: &Path, creator_name: &str) -> Result<Self> {
        let folder = sanitize_path_component(creator_name)?;
        Ok(Self {
            root: sync_dir.join(folder),
        })
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join(CACHE_DIR_NAME)
    }

    pub fn checkpoint_file(&self) -> PathBuf {
        self.cache_dir().join(CHECKPOINT_FILE_NAME)
    }

    pub fn registry_file(&self) -> PathBuf {
        self.cache_dir().join(REGISTRY_FILE_NAME)
    }

    pub fn posts_dir(&self) -> PathBuf {
        self.root.join("posts")
    }

    /// Create the creator root and its cache directory.
    pub async fn ensure(&self) -> Result<()> {
        tokio::fs::create_dir_all(self.cache_dir()).await?;
        Ok(())
    }
}

/// The `.part` marker path for a final destination.
pub fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(PART_SUFFIX);
    PathBuf::from(name)
}

/// Write a post's text document into its directory, replacing any previous version.
pub async fn write_text_document(dir: &Path, content: &str, markdown: bool) -> Result<PathBuf> {
    let ext = if markdown { "md" } else { "txt" };
    let path = dir.join(format!("post.{}", ext));
    tokio::fs::write(&path, content).await?;
    Ok(path)
}
