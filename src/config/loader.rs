//! Configuration structures and loading logic.

use crate::api::Credentials;
use crate::config::modes::StorageType;
use crate::download::{MediaSelection, SyncSettings};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub target: TargetConfig,

    #[serde(default)]
    pub options: OptionsConfig,
}

/// Browser session credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Full `Cookie` header of a logged-in browser session.
    #[serde(default)]
    pub cookie: String,

    /// `Authorization` header of the same session (`Bearer ...`).
    #[serde(default)]
    pub authorization: String,
}

/// What to sync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Creator name or boosty.to link.
    #[serde(default)]
    pub creator_name: String,

    /// Link of a single post.
    #[serde(default)]
    pub post_link: String,

    /// File with one post link per line (batch mode).
    #[serde(default)]
    pub links_file: Option<PathBuf>,
}

/// Sync options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionsConfig {
    /// Root directory of all synced creators. Must exist.
    #[serde(default = "default_sync_dir")]
    pub sync_dir: PathBuf,

    #[serde(default)]
    pub storage_type: StorageType,

    #[serde(default = "default_true")]
    pub need_load_photo: bool,

    #[serde(default = "default_true")]
    pub need_load_video: bool,

    #[serde(default = "default_true")]
    pub need_load_audio: bool,

    #[serde(default = "default_true")]
    pub need_load_files: bool,

    /// Write a `.meta.json` sidecar next to each video.
    #[serde(default)]
    pub save_metadata: bool,

    /// Name post directories after post titles instead of ids.
    #[serde(default)]
    pub enable_post_masquerade: bool,

    #[serde(default = "default_true")]
    pub post_text_in_markdown: bool,

    /// Remember how far each stream got, so later syncs only fetch new content.
    #[serde(default = "default_true")]
    pub sync_offset_save: bool,

    #[serde(default = "default_parallel")]
    pub max_download_parallel: usize,

    /// Posts synced at once in batch mode. Defaults to `max_download_parallel`.
    #[serde(default)]
    pub max_post_parallel: Option<usize>,

    /// Bound all transfers of a run by one pool instead of one pool per batch of items.
    #[serde(default)]
    pub shared_download_pool: bool,

    /// Existing files smaller than this fraction of the remote size are reported.
    #[serde(default = "default_incomplete_threshold")]
    pub incomplete_threshold: f64,

    #[serde(default = "default_media_page_delay")]
    pub media_page_delay_ms: u64,

    #[serde(default = "default_posts_page_delay")]
    pub posts_page_delay_ms: u64,

    #[serde(default)]
    pub auto_confirm_download: bool,

    #[serde(default = "default_true")]
    pub final_statistics_table: bool,

    /// Show progress bars for large transfers and batches.
    #[serde(default = "default_true")]
    pub show_progress: bool,

    #[serde(default)]
    pub save_logs_to_file: bool,

    #[serde(default)]
    pub debug: bool,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            sync_dir: default_sync_dir(),
            storage_type: StorageType::default(),
            need_load_photo: true,
            need_load_video: true,
            need_load_audio: true,
            need_load_files: true,
            save_metadata: false,
            enable_post_masquerade: false,
            post_text_in_markdown: true,
            sync_offset_save: true,
            max_download_parallel: default_parallel(),
            max_post_parallel: None,
            shared_download_pool: false,
            incomplete_threshold: default_incomplete_threshold(),
            media_page_delay_ms: default_media_page_delay(),
            posts_page_delay_ms: default_posts_page_delay(),
            auto_confirm_download: false,
            final_statistics_table: true,
            show_progress: true,
            save_logs_to_file: false,
            debug: false,
        }
    }
}

fn default_sync_dir() -> PathBuf {
    PathBuf::from("./sync")
}

fn default_true() -> bool {
    true
}

fn default_parallel() -> usize {
    10
}

fn default_incomplete_threshold() -> f64 {
    0.8
}

fn default_media_page_delay() -> u64 {
    300
}

fn default_posts_page_delay() -> u64 {
    500
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Config(format!(
                    "Configuration file not found: {}. Create one from config.example.toml",
                    path.display()
                ))
            } else {
                Error::Io(e)
            }
        })?;

        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Session credentials, when both headers are configured.
    pub fn credentials(&self) -> Option<Credentials> {
        let cookie = self.auth.cookie.trim();
        let authorization = self.auth.authorization.trim();
        if cookie.is_empty() || authorization.is_empty() {
            return None;
        }
        Some(Credentials {
            cookie: cookie.to_string(),
            authorization: authorization.to_string(),
        })
    }

    pub fn max_post_parallel(&self) -> usize {
        self.options
            .max_post_parallel
            .unwrap_or(self.options.max_download_parallel)
    }

    /// Engine settings for a run. `authenticated` tells whether requests carry credentials.
    pub fn sync_settings(&self, authenticated: bool) -> SyncSettings {
        let o = &self.options;
        SyncSettings {
            sync_dir: o.sync_dir.clone(),
            media: MediaSelection {
                photo: o.need_load_photo,
                video: o.need_load_video,
                audio: o.need_load_audio,
                files: o.need_load_files,
            },
            authenticated,
            save_metadata: o.save_metadata,
            enable_post_masquerade: o.enable_post_masquerade,
            post_text_in_markdown: o.post_text_in_markdown,
            sync_offset_save: o.sync_offset_save,
            max_download_parallel: o.max_download_parallel,
            max_post_parallel: self.max_post_parallel(),
            shared_download_pool: o.shared_download_pool,
            incomplete_threshold: o.incomplete_threshold,
            media_page_delay: Duration::from_millis(o.media_page_delay_ms),
            posts_page_delay: Duration::from_millis(o.posts_page_delay_ms),
            show_progress: o.show_progress,
        }
    }
}
