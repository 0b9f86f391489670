//! Pagination driver shared by media and post streams.

use crate::download::cursor::StreamCursor;
use crate::download::sync::Syncer;
use crate::error::Result;
use crate::fs::CreatorPaths;
use crate::store::{CheckpointStore, PathRegistry, StreamKey};

impl Syncer {
    /// Walk one stream from `start_offset` back to where the previous sync ended.
    ///
    /// Media pages go straight to a download manager; post pages are processed post
    /// by post. The runtime offset is saved after every page (every post in post mode)
    /// so an interrupted run can resume, and the high-water mark is raised once the
    /// stream finishes.
    pub(crate) async fn run_stream(
        &self,
        stream: StreamKey,
        creator: &str,
        paths: &CreatorPaths,
        checkpoints: Option<&CheckpointStore>,
        registry: Option<&PathRegistry>,
        start_offset: Option<String>,
    ) -> Result<()> {
        let record = match checkpoints {
            Some(store) => store.record(stream).await?,
            None => Default::default(),
        };
        let completed = record.completed_offset;
        let delay = match stream {
            StreamKey::Posts => self.settings.posts_page_delay,
            _ => self.settings.media_page_delay,
        };

        if let Some(offset) = &start_offset {
            tracing::info!("Resuming {} stream of {} from offset {}", stream, creator, offset);
        }

        // A resumed run keeps the first offset of the run it continues
        let mut cursor = match &start_offset {
            Some(_) => StreamCursor::resumed(completed, record.run_first_offset),
            None => StreamCursor::new(completed),
        };
        let mut offset = start_offset;
        let mut pages = 0usize;

        loop {
            let page = self
                .feed
                .fetch_page(stream, creator, offset.as_deref())
                .await?;
            pages += 1;

            let terminal = cursor.observe(page.next_offset.as_deref());
            if terminal {
                tracing::debug!(
                    "Stopping {} stream: offset {:?} reached last synced offset {:?}",
                    stream,
                    page.next_offset,
                    completed
                );
            }
            tokio::time::sleep(delay).await;

            // Resuming at the offset of the page just handled refetches it, never skips it
            let resume_at = if terminal { None } else { offset.clone() };

            match stream.media_kind() {
                Some(kind) => {
                    self.download_manager()
                        .run(&page.media, kind, &paths.root)
                        .await?;
                    save_runtime_offset(checkpoints, stream, &resume_at, &cursor).await?;
                }
                None => {
                    for post in &page.posts {
                        self.process_post(post, paths, registry).await?;
                        save_runtime_offset(checkpoints, stream, &resume_at, &cursor).await?;
                    }
                }
            }

            if terminal || page.is_last {
                break;
            }
            match page.next_offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        if let Some(store) = checkpoints {
            store.complete_stream(stream, cursor.first_offset()).await?;
        }
        tracing::info!("Finished {} stream of {} ({} page(s))", stream, creator, pages);

        Ok(())
    }
}

async fn save_runtime_offset(
    checkpoints: Option<&CheckpointStore>,
    stream: StreamKey,
    offset: &Option<String>,
    cursor: &StreamCursor,
) -> Result<()> {
    match (checkpoints, offset) {
        (Some(store), Some(offset)) => {
            store
                .set_runtime_offset(stream, Some(offset.clone()), cursor.first_offset())
                .await
        }
        _ => Ok(()),
    }
}
