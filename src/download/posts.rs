//! Post storage mode.

use futures::future::join_all;

use crate::download::manager::KindReport;
use crate::download::sync::Syncer;
use crate::error::Result;
use crate::fs::{sanitize_path_component, write_text_document, CreatorPaths};
use crate::media::{MediaKind, PostRecord};
use crate::store::{PathRegistry, StreamKey};

impl Syncer {
    /// Sync every post of `creator` into `posts/<dir>/`.
    pub async fn run_post_sync(&self, creator: &str, resume_offset: Option<String>) -> Result<()> {
        let paths = self.creator_paths(creator)?;
        paths.ensure().await?;
        tokio::fs::create_dir_all(paths.posts_dir()).await?;

        let registry = self.open_registry(&paths, creator).await?;
        let checkpoints = self.open_checkpoints(&paths, creator).await?;

        tracing::info!("Syncing posts of {}", creator);
        self.run_stream(
            StreamKey::Posts,
            creator,
            &paths,
            checkpoints.as_ref(),
            registry.as_ref(),
            resume_offset,
        )
        .await
    }

    /// Open the path registry when masquerade mode is on.
    pub(crate) async fn open_registry(
        &self,
        paths: &CreatorPaths,
        creator: &str,
    ) -> Result<Option<PathRegistry>> {
        if !self.settings.enable_post_masquerade {
            return Ok(None);
        }
        match PathRegistry::open(&paths.registry_file(), creator, self.locks.clone()).await {
            Ok(registry) => Ok(Some(registry)),
            Err(e) => {
                tracing::error!(
                    "CRITICAL: cannot open post path registry: {}. If this keeps happening, \
                     disable 'enable_post_masquerade' in the config",
                    e
                );
                Err(e)
            }
        }
    }

    /// Store one post: its directory, text document and media.
    pub(crate) async fn process_post(
        &self,
        post: &PostRecord,
        paths: &CreatorPaths,
        registry: Option<&PathRegistry>,
    ) -> Result<KindReport> {
        let dir_name = match registry {
            Some(registry) => registry.resolve(&post.id, &post.title).await?,
            None => sanitize_path_component(&post.id)?,
        };
        let post_dir = paths.posts_dir().join(dir_name);
        tokio::fs::create_dir_all(&post_dir).await?;

        write_text_document(
            &post_dir,
            &post.document(self.settings.post_text_in_markdown),
            self.settings.post_text_in_markdown,
        )
        .await?;

        let post_dir = &post_dir;
        let downloads = self.post_kinds(post).into_iter().map(|kind| async move {
            self.download_manager().run(&post.media, kind, post_dir).await
        });

        let mut report = KindReport::default();
        for result in join_all(downloads).await {
            report.merge(result?);
        }
        tracing::debug!(
            "Post {} stored in {} ({} item(s))",
            post.id,
            post_dir.display(),
            report.outcomes.len()
        );
        Ok(report)
    }

    /// Kinds of `post` to download, applying the selection and authorization gates.
    fn post_kinds(&self, post: &PostRecord) -> Vec<MediaKind> {
        let mut kinds = Vec::new();
        for kind in MediaKind::ALL {
            if !self.settings.media.allows(kind) || post.media.count(kind) == 0 {
                continue;
            }
            if !self.settings.authenticated {
                match kind {
                    MediaKind::Audio | MediaKind::File => {
                        tracing::warn!(
                            "Cannot download {} items of post {} without authorization",
                            kind,
                            post.id
                        );
                        continue;
                    }
                    MediaKind::Video => tracing::warn!(
                        "Some videos of post {} may not be downloaded because authorization is missing",
                        post.id
                    ),
                    MediaKind::Image => {}
                }
            }
            kinds.push(kind);
        }
        kinds
    }
}
