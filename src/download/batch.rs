//! Batch sync of a list of post links.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use futures::future::join_all;
use tokio::sync::Semaphore;

use crate::download::single::{PostSyncOutcome, SinglePostResult};
use crate::download::sync::Syncer;
use crate::error::Error;
use crate::fs::CreatorPaths;
use crate::output::progress::create_item_bar;
use crate::store::CheckpointStore;

/// One post to sync, as read from a links file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PostLink {
    pub creator: String,
    pub post_id: String,
    /// The link as the user wrote it.
    pub raw: String,
}

impl PostLink {
    pub fn new(creator: impl Into<String>, post_id: impl Into<String>) -> Self {
        let creator = creator.into();
        let post_id = post_id.into();
        let raw = format!("https://boosty.to/{}/posts/{}", creator, post_id);
        Self {
            creator,
            post_id,
            raw,
        }
    }
}

impl fmt::Display for PostLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Links of a batch, bucketed by outcome.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub succeeded: Vec<PostLink>,
    pub skipped: Vec<PostLink>,
    pub failed: Vec<(PostLink, PostSyncOutcome)>,
    /// Links whose posts have files that look truncated on disk.
    pub incomplete_links: Vec<PostLink>,
    pub incomplete_files: Vec<PathBuf>,
}

impl BatchReport {
    fn record(&mut self, link: PostLink, result: SinglePostResult) {
        if !result.incomplete.is_empty() {
            if !self.incomplete_links.contains(&link) {
                self.incomplete_links.push(link.clone());
            }
            for path in result.incomplete {
                if !self.incomplete_files.contains(&path) {
                    self.incomplete_files.push(path);
                }
            }
        }

        match result.outcome {
            PostSyncOutcome::Downloaded | PostSyncOutcome::Ok => self.succeeded.push(link),
            PostSyncOutcome::Skipped => self.skipped.push(link),
            outcome @ (PostSyncOutcome::NotFound | PostSyncOutcome::Error) => {
                self.failed.push((link, outcome))
            }
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.skipped.len() + self.failed.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn needs_remediation(&self) -> bool {
        !self.incomplete_files.is_empty()
    }
}

type PreparedCreator = Option<(CreatorPaths, Option<CheckpointStore>)>;

impl Syncer {
    /// Sync every link, at most `max_post_parallel` posts at a time.
    pub async fn run_links(&self, links: &[PostLink]) -> BatchReport {
        let prepared = self.prepare_creators(links).await;
        let limiter = Semaphore::new(self.settings.max_post_parallel.max(1));
        let progress = self
            .settings
            .show_progress
            .then(|| create_item_bar(links.len() as u64, "Posts"));

        let runs = links.iter().map(|link| {
            let limiter = &limiter;
            let prepared = &prepared;
            let progress = progress.as_ref();
            async move {
                let result = match limiter.acquire().await {
                    Ok(_permit) => match prepared.get(&link.creator) {
                        Some(Some((paths, checkpoints))) => {
                            self.sync_post(&link.creator, &link.post_id, paths, checkpoints.as_ref())
                                .await
                        }
                        _ => SinglePostResult::bare(PostSyncOutcome::Error),
                    },
                    Err(e) => {
                        tracing::error!("Post limiter closed: {}", e);
                        SinglePostResult::bare(PostSyncOutcome::Error)
                    }
                };
                if let Some(bar) = progress {
                    bar.inc(1);
                }
                (link.clone(), result)
            }
        });
        let results = join_all(runs).await;

        if let Some(bar) = progress {
            bar.finish_and_clear();
        }

        let mut report = BatchReport::default();
        for (link, result) in results {
            report.record(link, result);
        }
        report
    }

    /// Delete the incomplete files of `report` and sync their links again.
    pub async fn remediate(&self, report: &BatchReport) -> BatchReport {
        for path in &report.incomplete_files {
            match tokio::fs::remove_file(path).await {
                Ok(()) => tracing::info!("Deleted {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("Failed to delete file {}: {}", path.display(), e),
            }
        }
        self.stats.clear_incomplete_files();

        tracing::info!("Re-syncing {} link(s)", report.incomplete_links.len());
        self.run_links(&report.incomplete_links).await
    }

    /// Prepare each distinct creator once. A creator that fails to prepare fails all
    /// of its links.
    async fn prepare_creators(&self, links: &[PostLink]) -> HashMap<String, PreparedCreator> {
        let mut prepared = HashMap::new();
        for link in links {
            if prepared.contains_key(&link.creator) {
                continue;
            }
            let creator = link.creator.as_str();
            let result = async {
                let paths = self.creator_paths(creator)?;
                paths.ensure().await?;
                let checkpoints = self.open_checkpoints(&paths, creator).await?;
                Ok::<_, Error>((paths, checkpoints))
            }
            .await;

            let entry = match result {
                Ok(ready) => Some(ready),
                Err(e) => {
                    tracing::error!("Failed to prepare sync data for {}: {}", creator, e);
                    None
                }
            };
            prepared.insert(link.creator.clone(), entry);
        }
        prepared
    }
}
