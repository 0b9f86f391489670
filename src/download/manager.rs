//! Concurrency-bounded media downloads.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use futures::StreamExt;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Semaphore;

use crate::api::{ContentSource, ContentStream};
use crate::download::stats::SyncStats;
use crate::download::verify::{is_incomplete, verify_transfer, ContentHash, TransferExpectation};
use crate::error::{Error, Result};
use crate::fs::{part_path, sanitize_file_component, write_atomic};
use crate::media::{MediaItem, MediaKind, MediaPool};
use crate::output::progress::create_download_bar;

/// Minimum file size to show progress bar (20 MB).
const PROGRESS_THRESHOLD: u64 = 20 * 1024 * 1024;

/// Result of handling one media item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Fetched and verified.
    Downloaded,
    /// Already on disk, nothing transferred.
    Passed,
    /// Already on disk but smaller than the remote copy, or not matching its published hash.
    Incomplete,
    Error,
}

/// Knobs of a download manager.
#[derive(Debug, Clone)]
pub struct DownloadSettings {
    /// Fraction of the remote size below which an existing file counts as truncated.
    pub incomplete_threshold: f64,
    /// Write `<file>.meta.json` next to videos that carry metadata.
    pub save_metadata: bool,
    pub show_progress: bool,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            incomplete_threshold: 0.8,
            save_metadata: false,
            show_progress: false,
        }
    }
}

/// Outcomes of one manager invocation.
#[derive(Debug, Clone, Default)]
pub struct KindReport {
    pub outcomes: Vec<(PathBuf, DownloadOutcome)>,
    pub incomplete: Vec<PathBuf>,
}

impl KindReport {
    pub fn merge(&mut self, other: KindReport) {
        self.outcomes.extend(other.outcomes);
        self.incomplete.extend(other.incomplete);
    }

    pub fn count(&self, outcome: DownloadOutcome) -> usize {
        self.outcomes.iter().filter(|(_, o)| *o == outcome).count()
    }
}

/// Downloads the items of one kind from a pool into one directory.
pub struct DownloadManager {
    content: Arc<dyn ContentSource>,
    settings: DownloadSettings,
    stats: Arc<SyncStats>,
    slots: Arc<Semaphore>,
}

impl DownloadManager {
    /// `slots` bounds how many transfers run at once. Share one semaphore between
    /// managers for a global bound.
    pub fn new(
        content: Arc<dyn ContentSource>,
        settings: DownloadSettings,
        stats: Arc<SyncStats>,
        slots: Arc<Semaphore>,
    ) -> Self {
        Self {
            content,
            settings,
            stats,
            slots,
        }
    }

    /// Download every `kind` item of `pool` into `<root>/<kind folder>/`.
    ///
    /// Item failures become [`DownloadOutcome::Error`]; only a failure to create the
    /// target directory is returned as `Err`.
    pub async fn run(&self, pool: &MediaPool, kind: MediaKind, root: &Path) -> Result<KindReport> {
        let items: Vec<&MediaItem> = pool.of_kind(kind).collect();
        if items.is_empty() {
            return Ok(KindReport::default());
        }

        let dir = root.join(kind.folder_name());
        tokio::fs::create_dir_all(&dir).await?;
        tracing::debug!("Processing {} {} item(s) into {}", items.len(), kind, dir.display());

        let counters = self.stats.counters(kind);
        let dir = &dir;
        let tasks = assign_destinations(&items, dir)
            .into_iter()
            .map(|(item, dest)| async move {
                let outcome = match dest {
                    Ok(dest) => {
                        let outcome = self.process(item, &dest).await;
                        (dest, outcome)
                    }
                    Err(e) => {
                        tracing::warn!("Skipping {} {}: {}", kind, item.id, e);
                        (dir.join(&item.id), DownloadOutcome::Error)
                    }
                };
                counters.record(outcome.1);
                outcome
            });

        let mut report = KindReport::default();
        for (dest, outcome) in join_all(tasks).await {
            if outcome == DownloadOutcome::Incomplete {
                report.incomplete.push(dest.clone());
            }
            report.outcomes.push((dest, outcome));
        }
        Ok(report)
    }

    async fn process(&self, item: &MediaItem, dest: &Path) -> DownloadOutcome {
        let _permit = match self.slots.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                tracing::warn!("Download pool closed: {}", e);
                return DownloadOutcome::Error;
            }
        };

        match self.download(item, dest).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!("Failed to download {}: {}", dest.display(), e);
                DownloadOutcome::Error
            }
        }
    }

    async fn download(&self, item: &MediaItem, dest: &Path) -> Result<DownloadOutcome> {
        let part = part_path(dest);
        if tokio::fs::try_exists(&part).await? {
            // Leftover of an interrupted run; transfers always restart from zero
            match tokio::fs::remove_file(&part).await {
                Ok(()) => tracing::debug!("Removed stale partial file {}", part.display()),
                Err(e) => tracing::warn!("Could not remove {}: {}", part.display(), e),
            }
        }

        if tokio::fs::try_exists(dest).await? {
            return self.check_existing(item, dest).await;
        }

        tracing::info!("Downloading {}", dest.display());
        let result = match self.transfer(item, &part).await {
            Ok(()) => tokio::fs::rename(&part, dest).await.map_err(Error::from),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            if let Err(rm) = tokio::fs::remove_file(&part).await {
                tracing::debug!("Partial file {} left behind: {}", part.display(), rm);
            }
            return Err(e);
        }

        if self.settings.save_metadata {
            if let Some(metadata) = item.metadata.as_ref().filter(|_| item.kind == MediaKind::Video) {
                let sidecar = metadata_path(dest);
                let json = serde_json::to_vec_pretty(metadata)?;
                if let Err(e) = write_atomic(&sidecar, &json).await {
                    tracing::warn!("Failed to write metadata {}: {}", sidecar.display(), e);
                }
            }
        }

        Ok(DownloadOutcome::Downloaded)
    }

    /// Decide whether a file already on disk is usable.
    async fn check_existing(&self, item: &MediaItem, dest: &Path) -> Result<DownloadOutcome> {
        if item.is_playlist() {
            return Ok(DownloadOutcome::Passed);
        }

        // A published hash settles it without asking the server
        if let Some(hash) = ContentHash::from_fields(&item.hash_fields) {
            let digest = file_digest(dest, &hash).await?;
            if digest == hash.expected_hex() {
                return Ok(DownloadOutcome::Passed);
            }
            tracing::warn!(
                "File {} does not match its published hash (expected {}, got {})",
                dest.display(),
                hash.expected_hex(),
                digest
            );
            self.stats.add_incomplete_file(dest.to_path_buf());
            return Ok(DownloadOutcome::Incomplete);
        }

        let Some(expected) = self.content.probe_length(&item.url).await else {
            return Ok(DownloadOutcome::Passed);
        };

        let actual = tokio::fs::metadata(dest).await?.len();
        if is_incomplete(actual, expected, self.settings.incomplete_threshold) {
            tracing::warn!(
                "File {} looks incomplete: {} of {} bytes",
                dest.display(),
                actual,
                expected
            );
            self.stats.add_incomplete_file(dest.to_path_buf());
            return Ok(DownloadOutcome::Incomplete);
        }

        Ok(DownloadOutcome::Passed)
    }

    /// Stream `item` into `part` and verify it.
    async fn transfer(&self, item: &MediaItem, part: &Path) -> Result<()> {
        let ContentStream {
            content_length,
            mut body,
        } = self.content.open(&item.url).await?;

        let hash = ContentHash::from_fields(&item.hash_fields);
        let mut hasher = hash.as_ref().map(ContentHash::hasher);

        let progress = match content_length {
            Some(total) if self.settings.show_progress && total > PROGRESS_THRESHOLD => {
                Some(create_download_bar(total, &item.file_name()))
            }
            _ => None,
        };

        let mut file = File::create(part).await?;
        let mut written: u64 = 0;

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            if let Some(hasher) = hasher.as_mut() {
                hasher.update(&chunk);
            }
            written += chunk.len() as u64;

            if let Some(ref pb) = progress {
                pb.set_position(written);
            }
        }

        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        let expectation = TransferExpectation {
            hash,
            transport_length: content_length,
            declared_size: item.declared_size,
        };
        match verify_transfer(&expectation, written, hasher.map(|h| h.finalize_hex())) {
            Ok(Some(warning)) => tracing::warn!("{}: {}", item.file_name(), warning),
            Ok(None) => {}
            Err(message) => {
                return Err(Error::Integrity {
                    path: part.to_path_buf(),
                    message,
                })
            }
        }

        Ok(())
    }
}

/// Hex digest of a file on disk, using the algorithm of `hash`.
async fn file_digest(path: &Path, hash: &ContentHash) -> Result<String> {
    let mut file = File::open(path).await?;
    let mut hasher = hash.hasher();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let read = file.read(&mut buf).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(hasher.finalize_hex())
}

/// `<file>.meta.json` next to a downloaded file.
pub fn metadata_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".meta.json");
    dest.with_file_name(name)
}

/// Destination of every item, disambiguating attached files that share a title.
fn assign_destinations<'a>(
    items: &[&'a MediaItem],
    dir: &Path,
) -> Vec<(&'a MediaItem, Result<PathBuf>)> {
    let mut taken = HashSet::new();
    items
        .iter()
        .map(|&item| {
            let mut name = item.file_name();
            if !taken.insert(name.to_lowercase()) {
                name = format!("{}_{}", item.id, name);
                taken.insert(name.to_lowercase());
            }
            let dest = sanitize_file_component(&name).map(|name| dir.join(name));
            (item, dest)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::source::BoxStream;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory content server.
    #[derive(Default)]
    struct FakeContent {
        bodies: HashMap<String, Vec<u8>>,
        /// Reported length overrides (for truncated-file checks).
        lengths: HashMap<String, u64>,
        opens: AtomicUsize,
    }

    impl FakeContent {
        fn with(mut self, url: &str, body: &[u8]) -> Self {
            self.bodies.insert(url.to_string(), body.to_vec());
            self
        }
    }

    #[async_trait]
    impl ContentSource for FakeContent {
        async fn probe_length(&self, url: &str) -> Option<u64> {
            self.lengths
                .get(url)
                .copied()
                .or_else(|| self.bodies.get(url).map(|b| b.len() as u64))
        }

        async fn open(&self, url: &str) -> Result<ContentStream> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            let body = self
                .bodies
                .get(url)
                .cloned()
                .ok_or_else(|| Error::Download(format!("HTTP 404 for {}", url)))?;
            let chunks: Vec<Result<Bytes>> = body
                .chunks(3)
                .map(|c| Ok(Bytes::copy_from_slice(c)))
                .collect();
            let stream: BoxStream<Result<Bytes>> = Box::pin(futures::stream::iter(chunks));
            Ok(ContentStream {
                content_length: Some(body.len() as u64),
                body: stream,
            })
        }
    }

    fn manager(content: Arc<FakeContent>, stats: Arc<SyncStats>) -> DownloadManager {
        DownloadManager::new(
            content,
            DownloadSettings::default(),
            stats,
            Arc::new(Semaphore::new(2)),
        )
    }

    fn pool(items: Vec<MediaItem>) -> MediaPool {
        items.into_iter().collect()
    }

    #[tokio::test]
    async fn test_download_then_pass_on_rerun() {
        let dir = tempfile::tempdir().unwrap();
        let content = Arc::new(
            FakeContent::default()
                .with("http://x/a", b"hello world")
                .with("http://x/b", b"bytes"),
        );
        let stats = Arc::new(SyncStats::new());
        let manager = manager(content.clone(), stats.clone());
        let pool = pool(vec![
            MediaItem::new(MediaKind::Image, "a", "http://x/a"),
            MediaItem::new(MediaKind::Image, "b", "http://x/b"),
        ]);

        let report = manager.run(&pool, MediaKind::Image, dir.path()).await.unwrap();
        assert_eq!(report.count(DownloadOutcome::Downloaded), 2);
        let saved = std::fs::read(dir.path().join("photos").join("a.jpg")).unwrap();
        assert_eq!(saved, b"hello world");
        assert!(!dir.path().join("photos").join("a.jpg.part").exists());

        let report = manager.run(&pool, MediaKind::Image, dir.path()).await.unwrap();
        assert_eq!(report.count(DownloadOutcome::Passed), 2);
        assert_eq!(content.opens.load(Ordering::SeqCst), 2);

        let snap = stats.snapshot();
        assert_eq!(snap.kind(MediaKind::Image).downloaded, 2);
        assert_eq!(snap.kind(MediaKind::Image).passed, 2);
    }

    #[tokio::test]
    async fn test_failure_does_not_abort_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let content = Arc::new(FakeContent::default().with("http://x/ok", b"fine"));
        let stats = Arc::new(SyncStats::new());
        let manager = manager(content, stats.clone());
        let pool = pool(vec![
            MediaItem::new(MediaKind::Audio, "missing", "http://x/missing"),
            MediaItem::new(MediaKind::Audio, "ok", "http://x/ok"),
        ]);

        let report = manager.run(&pool, MediaKind::Audio, dir.path()).await.unwrap();
        assert_eq!(report.count(DownloadOutcome::Error), 1);
        assert_eq!(report.count(DownloadOutcome::Downloaded), 1);
        assert!(dir.path().join("audios").join("ok.mp3").exists());
        assert!(!dir.path().join("audios").join("missing.mp3.part").exists());
        assert_eq!(stats.snapshot().kind(MediaKind::Audio).errors, 1);
    }

    #[tokio::test]
    async fn test_hash_mismatch_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let content = Arc::new(FakeContent::default().with("http://x/v", b"abc"));
        let manager = manager(content, Arc::new(SyncStats::new()));
        let mut item = MediaItem::new(MediaKind::Video, "v", "http://x/v");
        item.hash_fields
            .insert("md5".into(), "00000000000000000000000000000000".into());

        let report = manager
            .run(&pool(vec![item]), MediaKind::Video, dir.path())
            .await
            .unwrap();
        assert_eq!(report.count(DownloadOutcome::Error), 1);
        assert!(!dir.path().join("videos").join("v.mp4").exists());
        assert!(!dir.path().join("videos").join("v.mp4.part").exists());
    }

    #[tokio::test]
    async fn test_truncated_file_is_flagged_incomplete() {
        let dir = tempfile::tempdir().unwrap();
        let photos = dir.path().join("photos");
        std::fs::create_dir_all(&photos).unwrap();
        std::fs::write(photos.join("short.jpg"), vec![0u8; 79]).unwrap();
        std::fs::write(photos.join("fine.jpg"), vec![0u8; 81]).unwrap();

        let mut content = FakeContent::default();
        content.lengths.insert("http://x/short".into(), 100);
        content.lengths.insert("http://x/fine".into(), 100);
        let content = Arc::new(content);
        let stats = Arc::new(SyncStats::new());
        let manager = manager(content.clone(), stats.clone());
        let pool = pool(vec![
            MediaItem::new(MediaKind::Image, "short", "http://x/short"),
            MediaItem::new(MediaKind::Image, "fine", "http://x/fine"),
        ]);

        let report = manager.run(&pool, MediaKind::Image, dir.path()).await.unwrap();
        assert_eq!(report.incomplete, vec![photos.join("short.jpg")]);
        assert_eq!(report.count(DownloadOutcome::Passed), 1);
        assert_eq!(stats.incomplete_files(), vec![photos.join("short.jpg")]);
        assert_eq!(content.opens.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_existing_file_checked_against_published_hash() {
        let dir = tempfile::tempdir().unwrap();
        let videos = dir.path().join("videos");
        std::fs::create_dir_all(&videos).unwrap();
        std::fs::write(videos.join("good.mp4"), b"abc").unwrap();
        std::fs::write(videos.join("bad.mp4"), b"abd").unwrap();

        // Reported lengths alone would flag the good file
        let mut content = FakeContent::default();
        content.lengths.insert("http://x/good".into(), 1000);
        content.lengths.insert("http://x/bad".into(), 3);
        let content = Arc::new(content);
        let manager = manager(content.clone(), Arc::new(SyncStats::new()));

        let md5_of_abc = "900150983cd24fb0d6963f7d28e17f72";
        let mut good = MediaItem::new(MediaKind::Video, "good", "http://x/good");
        good.hash_fields.insert("md5".into(), md5_of_abc.into());
        let mut bad = MediaItem::new(MediaKind::Video, "bad", "http://x/bad");
        bad.hash_fields.insert("md5".into(), md5_of_abc.into());

        let report = manager
            .run(&pool(vec![good, bad]), MediaKind::Video, dir.path())
            .await
            .unwrap();
        assert_eq!(report.count(DownloadOutcome::Passed), 1);
        assert_eq!(report.incomplete, vec![videos.join("bad.mp4")]);
        assert_eq!(content.opens.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stale_part_file_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let videos = dir.path().join("videos");
        std::fs::create_dir_all(&videos).unwrap();
        std::fs::write(videos.join("v.mp4.part"), b"stale junk").unwrap();

        let content = Arc::new(FakeContent::default().with("http://x/v", b"new"));
        let manager = manager(content, Arc::new(SyncStats::new()));
        let pool = pool(vec![MediaItem::new(MediaKind::Video, "v", "http://x/v")]);

        let report = manager.run(&pool, MediaKind::Video, dir.path()).await.unwrap();
        assert_eq!(report.count(DownloadOutcome::Downloaded), 1);
        assert_eq!(std::fs::read(videos.join("v.mp4")).unwrap(), b"new");
        assert!(!videos.join("v.mp4.part").exists());
    }

    #[tokio::test]
    async fn test_video_metadata_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let content = Arc::new(FakeContent::default().with("http://x/v", b"mp4"));
        let manager = DownloadManager::new(
            content,
            DownloadSettings {
                save_metadata: true,
                ..Default::default()
            },
            Arc::new(SyncStats::new()),
            Arc::new(Semaphore::new(1)),
        );
        let mut item = MediaItem::new(MediaKind::Video, "v", "http://x/v");
        let mut meta = serde_json::Map::new();
        meta.insert("title".into(), serde_json::json!("Clip"));
        item.metadata = Some(meta);

        manager
            .run(&pool(vec![item]), MediaKind::Video, dir.path())
            .await
            .unwrap();
        let sidecar = dir.path().join("videos").join("v.mp4.meta.json");
        let saved: serde_json::Value =
            serde_json::from_slice(&std::fs::read(sidecar).unwrap()).unwrap();
        assert_eq!(saved["title"], "Clip");
    }

    #[test]
    fn test_duplicate_file_titles_get_distinct_names() {
        let mut a = MediaItem::new(MediaKind::File, "f1", "u1");
        a.title = Some("doc.pdf".into());
        let mut b = MediaItem::new(MediaKind::File, "f2", "u2");
        b.title = Some("DOC.pdf".into());

        let dests = assign_destinations(&[&a, &b], Path::new("/d"));
        assert_eq!(dests[0].1.as_ref().unwrap(), Path::new("/d/doc.pdf"));
        assert_eq!(dests[1].1.as_ref().unwrap(), Path::new("/d/f2_DOC.pdf"));
    }

    #[tokio::test]
    async fn test_file_title_with_double_dots_downloads() {
        let dir = tempfile::tempdir().unwrap();
        let content = Arc::new(FakeContent::default().with("http://x/f1", b"pdf bytes"));
        let manager = manager(content, Arc::new(SyncStats::new()));
        let mut item = MediaItem::new(MediaKind::File, "f1", "http://x/f1");
        item.title = Some("notes..final.pdf".into());

        let report = manager
            .run(&pool(vec![item]), MediaKind::File, dir.path())
            .await
            .unwrap();
        assert_eq!(report.count(DownloadOutcome::Downloaded), 1);
        let saved = std::fs::read(dir.path().join("files").join("notes..final.pdf")).unwrap();
        assert_eq!(saved, b"pdf bytes");
    }

    #[test]
    fn test_metadata_path() {
        assert_eq!(
            metadata_path(Path::new("/v/clip.mp4")),
            PathBuf::from("/v/clip.mp4.meta.json")
        );
    }
}
