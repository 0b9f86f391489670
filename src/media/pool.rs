//! Per-page aggregation of media items and posts.

use crate::media::item::{MediaItem, MediaKind};

/// The media of one page or one post.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaPool {
    items: Vec<MediaItem>,
}

impl MediaPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item, ignoring repeats of an already pooled (kind, id) pair.
    pub fn add(&mut self, item: MediaItem) {
        let seen = self
            .items
            .iter()
            .any(|existing| existing.kind == item.kind && existing.id == item.id);
        if !seen {
            self.items.push(item);
        }
    }

    /// Items of one kind, in feed order.
    pub fn of_kind(&self, kind: MediaKind) -> impl Iterator<Item = &MediaItem> {
        self.items.iter().filter(move |item| item.kind == kind)
    }

    pub fn count(&self, kind: MediaKind) -> usize {
        self.of_kind(kind).count()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MediaItem> {
        self.items.iter()
    }
}

impl FromIterator<MediaItem> for MediaPool {
    fn from_iter<I: IntoIterator<Item = MediaItem>>(iter: I) -> Self {
        let mut pool = MediaPool::new();
        for item in iter {
            pool.add(item);
        }
        pool
    }
}

/// A post together with the media attached to it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostRecord {
    pub id: String,
    pub title: String,
    pub text_content: String,
    pub media: MediaPool,
}

impl PostRecord {
    /// Render the post's text document.
    pub fn document(&self, markdown: bool) -> String {
        let mut doc = String::new();
        if !self.title.is_empty() {
            if markdown {
                doc.push_str("# ");
            }
            doc.push_str(&self.title);
            doc.push_str("\n\n");
        }
        doc.push_str(self.text_content.trim_end());
        doc.push('\n');
        doc
    }
}
