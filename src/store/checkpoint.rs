//! Per-creator sync checkpoints.
//!
//! For every content stream the store keeps two marks:
//!
//! - `completed_offset`: the newest offset of the last fully finished scan (high-water mark).
//!   It only ever grows and is written once a stream completes.
//! - `runtime_offset`: the token of the page currently being processed. It is rewritten
//!   after every page/post and cleared on completion, so its presence on startup means the
//!   previous run stopped mid-stream.
//! - `run_first_offset`: the first offset seen by that unfinished run. A resumed run
//!   completes with it, reaching the same high-water mark as an uninterrupted run.
//!
//! Every operation reads the file, applies the change and writes it back atomically while
//! holding the file's lock. Nothing is cached between operations.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fs::write_atomic;
use crate::media::MediaKind;
use crate::store::lock::FileLocks;

/// A paginated content stream of a creator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKey {
    Photo,
    Video,
    Audio,
    Posts,
}

impl StreamKey {
    /// The media streams, in the order they are launched.
    pub const MEDIA: [StreamKey; 3] = [StreamKey::Photo, StreamKey::Video, StreamKey::Audio];

    /// Media kind downloaded by this stream (`None` for posts).
    pub fn media_kind(&self) -> Option<MediaKind> {
        match self {
            StreamKey::Photo => Some(MediaKind::Image),
            StreamKey::Video => Some(MediaKind::Video),
            StreamKey::Audio => Some(MediaKind::Audio),
            StreamKey::Posts => None,
        }
    }
}

impl fmt::Display for StreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKey::Photo => write!(f, "photo"),
            StreamKey::Video => write!(f, "video"),
            StreamKey::Audio => write!(f, "audio"),
            StreamKey::Posts => write!(f, "posts"),
        }
    }
}

/// Checkpoint marks of one stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    #[serde(default)]
    pub completed_offset: Option<i64>,
    #[serde(default)]
    pub runtime_offset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_first_offset: Option<i64>,
}

/// Contents of a creator's checkpoint file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncData {
    #[serde(default)]
    pub creator: String,
    #[serde(default)]
    pub last_sync_utc: Option<DateTime<Utc>>,
    #[serde(default)]
    pub streams: BTreeMap<StreamKey, CheckpointRecord>,
}

impl SyncData {
    pub fn record(&self, stream: StreamKey) -> CheckpointRecord {
        self.streams.get(&stream).cloned().unwrap_or_default()
    }
}

/// Write-through checkpoint store backed by one JSON file.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
    creator: String,
    locks: FileLocks,
}

impl CheckpointStore {
    /// Open the store, creating the file on first use.
    pub async fn open(path: &Path, creator: &str, locks: FileLocks) -> Result<Self> {
        let store = Self {
            path: path.to_path_buf(),
            creator: creator.to_string(),
            locks,
        };

        let _guard = store.locks.acquire(&store.path).await;
        if !tokio::fs::try_exists(&store.path)
            .await
            .map_err(|e| store.error(e))?
        {
            let data = SyncData {
                creator: store.creator.clone(),
                ..Default::default()
            };
            store.save(&data).await?;
            tracing::debug!("Created sync data file {}", store.path.display());
        } else {
            store.load().await?;
        }

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current contents of the file.
    pub async fn snapshot(&self) -> Result<SyncData> {
        let _guard = self.locks.acquire(&self.path).await;
        self.load().await
    }

    /// Checkpoint marks of one stream.
    pub async fn record(&self, stream: StreamKey) -> Result<CheckpointRecord> {
        Ok(self.snapshot().await?.record(stream))
    }

    /// Persist (or clear) the in-progress offset of a stream, together with the first
    /// offset its run has seen.
    pub async fn set_runtime_offset(
        &self,
        stream: StreamKey,
        offset: Option<String>,
        first_offset: Option<i64>,
    ) -> Result<()> {
        self.update(|data| {
            let record = data.streams.entry(stream).or_default();
            record.run_first_offset = offset.as_ref().and(first_offset);
            record.runtime_offset = offset;
        })
        .await
    }

    /// Record a graceful stream completion in one atomic write.
    ///
    /// Clears the runtime offset, raises the high-water mark to `first_offset` when it is
    /// newer than the stored one, and stamps the sync time.
    pub async fn complete_stream(&self, stream: StreamKey, first_offset: Option<i64>) -> Result<()> {
        self.update(|data| {
            let record = data.streams.entry(stream).or_default();
            record.runtime_offset = None;
            record.run_first_offset = None;
            if let Some(fot) = first_offset {
                if record.completed_offset.map_or(true, |done| fot > done) {
                    record.completed_offset = Some(fot);
                }
            }
            data.last_sync_utc = Some(Utc::now());
        })
        .await
    }

    /// Stamp the last sync time without touching any stream.
    pub async fn touch_last_sync(&self) -> Result<()> {
        self.update(|data| data.last_sync_utc = Some(Utc::now())).await
    }

    async fn update<F>(&self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut SyncData),
    {
        let _guard = self.locks.acquire(&self.path).await;
        let mut data = self.load().await?;
        mutate(&mut data);
        self.save(&data).await
    }

    async fn load(&self) -> Result<SyncData> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(SyncData {
                    creator: self.creator.clone(),
                    ..Default::default()
                })
            }
            Err(e) => return Err(self.error(e)),
        };

        serde_json::from_str(&content).map_err(|e| self.error(e))
    }

    async fn save(&self, data: &SyncData) -> Result<()> {
        let json = serde_json::to_vec_pretty(data).map_err(|e| self.error(e))?;
        write_atomic(&self.path, &json)
            .await
            .map_err(|e| self.error(e))
    }

    fn error(&self, e: impl fmt::Display) -> Error {
        Error::Checkpoint {
            path: self.path.clone(),
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open_store(dir: &Path) -> CheckpointStore {
        CheckpointStore::open(&dir.join("sync_data.json"), "artist", FileLocks::new())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_open_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path()).await;

        assert!(store.path().exists());
        let data = store.snapshot().await.unwrap();
        assert_eq!(data.creator, "artist");
        assert!(data.streams.is_empty());
        assert!(data.last_sync_utc.is_none());
    }

    #[tokio::test]
    async fn test_runtime_offset_round_trip_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path()).await;
        store
            .set_runtime_offset(StreamKey::Video, Some("1700:3".into()), Some(1800))
            .await
            .unwrap();

        let reopened = open_store(dir.path()).await;
        let record = reopened.record(StreamKey::Video).await.unwrap();
        assert_eq!(record.runtime_offset.as_deref(), Some("1700:3"));
        assert_eq!(record.run_first_offset, Some(1800));
        assert_eq!(record.completed_offset, None);
        assert_eq!(
            reopened.record(StreamKey::Photo).await.unwrap(),
            CheckpointRecord::default()
        );
    }

    #[tokio::test]
    async fn test_complete_stream_is_monotonic() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path()).await;

        store.complete_stream(StreamKey::Posts, Some(80)).await.unwrap();
        assert_eq!(store.record(StreamKey::Posts).await.unwrap().completed_offset, Some(80));

        store.complete_stream(StreamKey::Posts, Some(40)).await.unwrap();
        assert_eq!(store.record(StreamKey::Posts).await.unwrap().completed_offset, Some(80));

        store
            .set_runtime_offset(StreamKey::Posts, Some("50".into()), Some(90))
            .await
            .unwrap();
        store.complete_stream(StreamKey::Posts, None).await.unwrap();
        let record = store.record(StreamKey::Posts).await.unwrap();
        assert_eq!(record.completed_offset, Some(80));
        assert_eq!(record.runtime_offset, None);
        assert_eq!(record.run_first_offset, None);
        assert!(store.snapshot().await.unwrap().last_sync_utc.is_some());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sync_data.json");
        std::fs::write(&path, "{not json").unwrap();

        let result = CheckpointStore::open(&path, "artist", FileLocks::new()).await;
        assert!(matches!(result, Err(Error::Checkpoint { .. })));
    }

    #[tokio::test]
    async fn test_concurrent_streams_do_not_lose_updates() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path()).await;

        let writes = StreamKey::MEDIA.iter().map(|stream| {
            let store = store.clone();
            async move {
                store
                    .set_runtime_offset(*stream, Some(stream.to_string()), None)
                    .await
                    .unwrap();
            }
        });
        futures::future::join_all(writes).await;

        let data = store.snapshot().await.unwrap();
        assert_eq!(data.streams.len(), 3);
        assert_eq!(data.record(StreamKey::Audio).runtime_offset.as_deref(), Some("audio"));
    }
}
