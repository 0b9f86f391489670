//! Sync orchestration for one creator.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::Semaphore;

use crate::api::{ContentSource, FeedSource};
use crate::download::manager::{DownloadManager, DownloadSettings};
use crate::download::stats::SyncStats;
use crate::error::Result;
use crate::fs::CreatorPaths;
use crate::media::MediaKind;
use crate::store::{CheckpointStore, FileLocks, StreamKey};

/// Which media kinds a sync fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaSelection {
    pub photo: bool,
    pub video: bool,
    pub audio: bool,
    pub files: bool,
}

impl MediaSelection {
    pub fn all() -> Self {
        Self {
            photo: true,
            video: true,
            audio: true,
            files: true,
        }
    }

    pub fn allows(&self, kind: MediaKind) -> bool {
        match kind {
            MediaKind::Image => self.photo,
            MediaKind::Video => self.video,
            MediaKind::Audio => self.audio,
            MediaKind::File => self.files,
        }
    }
}

/// Everything a [`Syncer`] needs to know besides its sources.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub sync_dir: PathBuf,
    pub media: MediaSelection,
    /// Whether the feed source carries credentials. Gates audio and attached files.
    pub authenticated: bool,
    pub save_metadata: bool,
    pub enable_post_masquerade: bool,
    pub post_text_in_markdown: bool,
    /// Persist checkpoints. When off, every run is a full sync.
    pub sync_offset_save: bool,
    pub max_download_parallel: usize,
    pub max_post_parallel: usize,
    pub shared_download_pool: bool,
    pub incomplete_threshold: f64,
    pub media_page_delay: Duration,
    pub posts_page_delay: Duration,
    pub show_progress: bool,
}

impl SyncSettings {
    pub fn new(sync_dir: impl Into<PathBuf>) -> Self {
        Self {
            sync_dir: sync_dir.into(),
            media: MediaSelection::all(),
            authenticated: false,
            save_metadata: false,
            enable_post_masquerade: false,
            post_text_in_markdown: true,
            sync_offset_save: true,
            max_download_parallel: 10,
            max_post_parallel: 10,
            shared_download_pool: false,
            incomplete_threshold: 0.8,
            media_page_delay: Duration::from_millis(300),
            posts_page_delay: Duration::from_millis(500),
            show_progress: false,
        }
    }
}

/// Offsets of streams interrupted during a previous run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResumeOffsets {
    offsets: BTreeMap<StreamKey, String>,
}

impl ResumeOffsets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, stream: StreamKey) -> Option<&str> {
        self.offsets.get(&stream).map(String::as_str)
    }

    pub fn insert(&mut self, stream: StreamKey, offset: impl Into<String>) {
        self.offsets.insert(stream, offset.into());
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StreamKey, &str)> {
        self.offsets.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

/// Drives feed streams of creators into the sync directory.
pub struct Syncer {
    pub(crate) feed: Arc<dyn FeedSource>,
    pub(crate) content: Arc<dyn ContentSource>,
    pub(crate) settings: SyncSettings,
    pub(crate) stats: Arc<SyncStats>,
    pub(crate) locks: FileLocks,
    shared_slots: Option<Arc<Semaphore>>,
}

impl Syncer {
    pub fn new(
        feed: Arc<dyn FeedSource>,
        content: Arc<dyn ContentSource>,
        settings: SyncSettings,
        stats: Arc<SyncStats>,
    ) -> Self {
        let shared_slots = settings
            .shared_download_pool
            .then(|| Arc::new(Semaphore::new(settings.max_download_parallel.max(1))));
        Self {
            feed,
            content,
            settings,
            stats,
            locks: FileLocks::shared(),
            shared_slots,
        }
    }

    /// Use a private lock registry instead of the process-wide one.
    pub fn with_locks(mut self, locks: FileLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub fn stats(&self) -> &Arc<SyncStats> {
        &self.stats
    }

    /// A manager bounded by its own pool, or by the run-wide pool when shared.
    pub(crate) fn download_manager(&self) -> DownloadManager {
        let slots = match &self.shared_slots {
            Some(slots) => slots.clone(),
            None => Arc::new(Semaphore::new(self.settings.max_download_parallel.max(1))),
        };
        DownloadManager::new(
            self.content.clone(),
            DownloadSettings {
                incomplete_threshold: self.settings.incomplete_threshold,
                save_metadata: self.settings.save_metadata,
                show_progress: self.settings.show_progress,
            },
            self.stats.clone(),
            slots,
        )
    }

    pub(crate) fn creator_paths(&self, creator: &str) -> Result<CreatorPaths> {
        CreatorPaths::new(&self.settings.sync_dir, creator)
    }

    /// Open the creator's checkpoint store, if checkpoints are enabled.
    pub(crate) async fn open_checkpoints(
        &self,
        paths: &CreatorPaths,
        creator: &str,
    ) -> Result<Option<CheckpointStore>> {
        if !self.settings.sync_offset_save {
            return Ok(None);
        }
        let store = CheckpointStore::open(&paths.checkpoint_file(), creator, self.locks.clone()).await?;
        Ok(Some(store))
    }

    /// Runtime offsets left behind by an interrupted sync of `creator`.
    pub async fn pending_resume(&self, creator: &str) -> Result<ResumeOffsets> {
        let mut resume = ResumeOffsets::new();
        if !self.settings.sync_offset_save {
            return Ok(resume);
        }

        let paths = self.creator_paths(creator)?;
        if !tokio::fs::try_exists(paths.checkpoint_file()).await? {
            return Ok(resume);
        }

        let store = CheckpointStore::open(&paths.checkpoint_file(), creator, self.locks.clone()).await?;
        for (stream, record) in store.snapshot().await?.streams {
            if let Some(offset) = record.runtime_offset {
                resume.insert(stream, offset);
            }
        }
        Ok(resume)
    }

    /// Sync the media albums of `creator`, running the enabled streams concurrently.
    pub async fn run_media_sync(
        &self,
        creator: &str,
        streams: &[StreamKey],
        resume: &ResumeOffsets,
    ) -> Result<()> {
        if self.settings.media.files {
            tracing::warn!("Attached files are not available in media storage mode");
            tracing::warn!("Use storage_type = \"post\" to download attached files");
        }

        let streams: Vec<StreamKey> = streams
            .iter()
            .copied()
            .filter(|s| s.media_kind().is_some_and(|k| self.settings.media.allows(k)))
            .collect();
        if streams.contains(&StreamKey::Video) && !self.settings.authenticated {
            tracing::warn!("Some videos may not be downloaded because authorization is missing");
        }

        let paths = self.creator_paths(creator)?;
        paths.ensure().await?;
        let checkpoints = self.open_checkpoints(&paths, creator).await?;

        tracing::info!("Syncing {} media stream(s) of {}", streams.len(), creator);
        let runs = streams.iter().map(|&stream| {
            let start = resume.get(stream).map(str::to_string);
            let paths = &paths;
            let checkpoints = checkpoints.as_ref();
            async move {
                let result = self
                    .run_stream(stream, creator, paths, checkpoints, None, start)
                    .await;
                if let Err(ref e) = result {
                    tracing::error!("{} stream of {} failed: {}", stream, creator, e);
                }
                result
            }
        });

        join_all(runs).await.into_iter().collect::<Result<Vec<()>>>()?;
        Ok(())
    }
}
