//! Media item representation.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};

use crate::fs::naming::sanitize_filename_lossy;

/// Kind of downloadable content attached to a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    File,
}

impl MediaKind {
    /// Every kind, in the order they are reported.
    pub const ALL: [MediaKind; 4] = [
        MediaKind::Image,
        MediaKind::Video,
        MediaKind::Audio,
        MediaKind::File,
    ];

    /// Get the folder name for this media kind.
    pub fn folder_name(&self) -> &'static str {
        match self {
            MediaKind::Image => "photos",
            MediaKind::Video => "videos",
            MediaKind::Audio => "audios",
            MediaKind::File => "files",
        }
    }

    /// File extension used for id-named items. Attached files keep their own name.
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            MediaKind::Image => Some("jpg"),
            MediaKind::Video => Some("mp4"),
            MediaKind::Audio => Some("mp3"),
            MediaKind::File => None,
        }
    }

    /// Stable slot index, used for per-kind counters.
    pub fn index(&self) -> usize {
        match self {
            MediaKind::Image => 0,
            MediaKind::Video => 1,
            MediaKind::Audio => 2,
            MediaKind::File => 3,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Image => write!(f, "photo"),
            MediaKind::Video => write!(f, "video"),
            MediaKind::Audio => write!(f, "audio"),
            MediaKind::File => write!(f, "file"),
        }
    }
}

/// A downloadable media item, normalized from one block of a feed page.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaItem {
    /// Kind of content.
    pub kind: MediaKind,

    /// Remote media ID.
    pub id: String,

    /// Download URL, including the signed query when one is required.
    pub url: String,

    /// Original title (attached files use it as the file name).
    pub title: Option<String>,

    /// Size reported by the feed. Advisory only.
    pub declared_size: Option<u64>,

    /// Hash-like fields found on the raw item (`hash`, `md5`, `sha`, `checksum`).
    pub hash_fields: BTreeMap<String, String>,

    /// Whether the URL needed the post's signed query to be fetchable.
    pub requires_signed_query: bool,

    /// Structured metadata (video items only).
    pub metadata: Option<Map<String, Value>>,
}

impl MediaItem {
    /// Create a bare item; optional fields can be filled in afterwards.
    pub fn new(kind: MediaKind, id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            url: url.into(),
            title: None,
            declared_size: None,
            hash_fields: BTreeMap::new(),
            requires_signed_query: false,
            metadata: None,
        }
    }

    /// Check if the URL points at an HLS playlist rather than the asset itself.
    pub fn is_playlist(&self) -> bool {
        self.url.to_lowercase().contains(".m3u8")
    }

    /// Generate the on-disk filename for this item.
    pub fn file_name(&self) -> String {
        match self.kind.extension() {
            Some(ext) => format!("{}.{}", self.id, ext),
            None => self
                .title
                .as_deref()
                .and_then(sanitize_filename_lossy)
                .unwrap_or_else(|| self.id.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_by_kind() {
        assert_eq!(MediaItem::new(MediaKind::Image, "a1", "u").file_name(), "a1.jpg");
        assert_eq!(MediaItem::new(MediaKind::Video, "v1", "u").file_name(), "v1.mp4");
        assert_eq!(MediaItem::new(MediaKind::Audio, "s1", "u").file_name(), "s1.mp3");
    }

    #[test]
    fn test_attached_file_uses_title() {
        let mut item = MediaItem::new(MediaKind::File, "f1", "u");
        item.title = Some("notes: part 1.pdf".to_string());
        assert_eq!(item.file_name(), "notes_ part 1.pdf");

        item.title = Some("   ".to_string());
        assert_eq!(item.file_name(), "f1");
    }

    #[test]
    fn test_playlist_detection() {
        assert!(MediaItem::new(MediaKind::Video, "v", "https://x/VIDEO.M3U8?t=1").is_playlist());
        assert!(!MediaItem::new(MediaKind::Video, "v", "https://x/v.mp4").is_playlist());
    }
}
