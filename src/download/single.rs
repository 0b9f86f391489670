//! Single post sync.

use std::fmt;
use std::path::PathBuf;

use crate::api::PostLookup;
use crate::download::manager::{DownloadOutcome, KindReport};
use crate::download::sync::Syncer;
use crate::error::{Error, Result};
use crate::fs::CreatorPaths;
use crate::media::PostRecord;
use crate::store::CheckpointStore;

/// Overall result of syncing one post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostSyncOutcome {
    /// At least one file was fetched and nothing failed.
    Downloaded,
    /// Nothing new: every file already existed.
    Skipped,
    /// Stored a post with nothing to download.
    Ok,
    NotFound,
    Error,
}

impl fmt::Display for PostSyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostSyncOutcome::Downloaded => write!(f, "downloaded"),
            PostSyncOutcome::Skipped => write!(f, "skipped"),
            PostSyncOutcome::Ok => write!(f, "ok"),
            PostSyncOutcome::NotFound => write!(f, "not found"),
            PostSyncOutcome::Error => write!(f, "error"),
        }
    }
}

/// Outcome of a single post plus the files found truncated on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinglePostResult {
    pub outcome: PostSyncOutcome,
    pub incomplete: Vec<PathBuf>,
}

impl SinglePostResult {
    pub(crate) fn bare(outcome: PostSyncOutcome) -> Self {
        Self {
            outcome,
            incomplete: Vec::new(),
        }
    }
}

/// Collapse the item outcomes of one post.
pub fn classify_post(report: &KindReport) -> PostSyncOutcome {
    if report.count(DownloadOutcome::Error) > 0 {
        return PostSyncOutcome::Error;
    }
    if report.count(DownloadOutcome::Downloaded) > 0 {
        return PostSyncOutcome::Downloaded;
    }
    if report.outcomes.is_empty() {
        return PostSyncOutcome::Ok;
    }
    PostSyncOutcome::Skipped
}

impl Syncer {
    /// Fetch one post and store it like post mode does.
    ///
    /// Never fails: every problem is folded into the returned outcome.
    pub async fn run_single_post(&self, creator: &str, post_id: &str) -> SinglePostResult {
        let prepared = async {
            let paths = self.creator_paths(creator)?;
            paths.ensure().await?;
            let checkpoints = self.open_checkpoints(&paths, creator).await?;
            Ok::<_, Error>((paths, checkpoints))
        }
        .await;

        match prepared {
            Ok((paths, checkpoints)) => {
                self.sync_post(creator, post_id, &paths, checkpoints.as_ref())
                    .await
            }
            Err(e) => {
                tracing::error!("Cannot prepare sync of {}: {}", creator, e);
                SinglePostResult::bare(PostSyncOutcome::Error)
            }
        }
    }

    pub(crate) async fn sync_post(
        &self,
        creator: &str,
        post_id: &str,
        paths: &CreatorPaths,
        checkpoints: Option<&CheckpointStore>,
    ) -> SinglePostResult {
        let post = match self.feed.fetch_post(creator, post_id).await {
            Ok(PostLookup::Found(post)) => post,
            Ok(PostLookup::NotFound) => {
                tracing::error!("Post not found: {}", post_id);
                return SinglePostResult::bare(PostSyncOutcome::NotFound);
            }
            Err(e) => {
                tracing::error!(
                    "Failed to load post {}: {}. Check access rights or authorization",
                    post_id,
                    e
                );
                return SinglePostResult::bare(PostSyncOutcome::Error);
            }
        };

        let report = match self.store_single(&post, paths, creator).await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!("Failed to store post {}: {}", post_id, e);
                return SinglePostResult::bare(PostSyncOutcome::Error);
            }
        };

        let outcome = classify_post(&report);
        match outcome {
            PostSyncOutcome::Downloaded => tracing::info!("Post {}: download complete", post_id),
            PostSyncOutcome::Skipped => {
                tracing::info!("Post {}: nothing new to download", post_id)
            }
            PostSyncOutcome::Ok => tracing::info!("Post {}: no downloadable content", post_id),
            _ => tracing::warn!("Post {}: some files failed to download", post_id),
        }

        if let Some(store) = checkpoints {
            if let Err(e) = store.touch_last_sync().await {
                tracing::warn!("Failed to record sync time of {}: {}", creator, e);
            }
        }

        SinglePostResult {
            outcome,
            incomplete: report.incomplete,
        }
    }

    async fn store_single(
        &self,
        post: &PostRecord,
        paths: &CreatorPaths,
        creator: &str,
    ) -> Result<KindReport> {
        tokio::fs::create_dir_all(paths.posts_dir()).await?;
        let registry = self.open_registry(paths, creator).await?;
        self.process_post(post, paths, registry.as_ref()).await
    }
}
