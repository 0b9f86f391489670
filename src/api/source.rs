//! Seams between the sync engine and the remote platform.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::error::Result;
use crate::media::{MediaPool, PostRecord};
use crate::store::StreamKey;

/// Boxed stream of body chunks.
pub type BoxStream<T> = Pin<Box<dyn Stream<Item = T> + Send + 'static>>;

/// One page of a content stream.
#[derive(Debug, Clone, Default)]
pub struct FeedPage {
    /// Media of a photo/video/audio page.
    pub media: MediaPool,
    /// Posts of a posts page.
    pub posts: Vec<PostRecord>,
    /// Token of the next page, as returned by the API.
    pub next_offset: Option<String>,
    /// Whether the API reported this as the last page.
    pub is_last: bool,
}

/// Result of looking up one post.
#[derive(Debug, Clone)]
pub enum PostLookup {
    Found(PostRecord),
    NotFound,
}

/// A content body being transferred.
pub struct ContentStream {
    /// `Content-Length` of the transfer response, if sent.
    pub content_length: Option<u64>,
    pub body: BoxStream<Result<Bytes>>,
}

/// Paginated feed access.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch one page of a stream, starting at `offset` (`None` for the newest page).
    async fn fetch_page(
        &self,
        stream: StreamKey,
        creator: &str,
        offset: Option<&str>,
    ) -> Result<FeedPage>;

    /// Fetch a single post.
    async fn fetch_post(&self, creator: &str, post_id: &str) -> Result<PostLookup>;
}

/// Raw content access for media transfers.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// The size the server reports for `url`, if it reports one.
    async fn probe_length(&self, url: &str) -> Option<u64>;

    /// Start transferring `url`.
    async fn open(&self, url: &str) -> Result<ContentStream>;
}
