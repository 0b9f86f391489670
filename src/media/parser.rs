//! Conversion of raw feed blocks into media items and posts.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::api::types::RawPost;
use crate::media::item::{MediaItem, MediaKind};
use crate::media::pool::{MediaPool, PostRecord};

/// Key fragments that mark a field as integrity data.
const HASH_KEY_TOKENS: [&str; 4] = ["hash", "md5", "sha", "checksum"];

/// Video player qualities, best first.
const PLAYER_QUALITY_ORDER: [&str; 8] = [
    "ultra_hd", "quad_hd", "full_hd", "high", "medium", "low", "tiny", "lowest",
];

/// Post-level context needed to normalize a block.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockContext<'a> {
    pub post_id: &'a str,
    pub post_title: &'a str,
    pub signed_query: &'a str,
}

/// Collect the hash-like fields of a raw block.
pub fn find_hash_fields(block: &Map<String, Value>) -> BTreeMap<String, String> {
    block
        .iter()
        .filter(|(key, _)| {
            let lower = key.to_lowercase();
            HASH_KEY_TOKENS.iter().any(|token| lower.contains(token))
        })
        .filter_map(|(key, value)| {
            let value = match value {
                Value::String(s) if !s.is_empty() => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            Some((key.clone(), value))
        })
        .collect()
}

/// Parse one content block into a media item. Text blocks and unknown types yield `None`.
pub fn parse_media_block(block: &Map<String, Value>, ctx: BlockContext<'_>) -> Option<MediaItem> {
    let block_type = block.get("type")?.as_str()?;
    let id = block_id(block)?;

    let (kind, url, signed) = match block_type {
        "image" => (MediaKind::Image, str_field(block, "url")?, false),
        "ok_video" => (MediaKind::Video, select_player_url(block)?, false),
        "audio_file" => (MediaKind::Audio, str_field(block, "url")?, true),
        "file" => (MediaKind::File, str_field(block, "url")?, true),
        _ => return None,
    };

    let url = if signed {
        format!("{}{}", url, ctx.signed_query)
    } else {
        url
    };

    let mut item = MediaItem::new(kind, id, url);
    item.title = str_field(block, "title");
    item.declared_size = block.get("size").and_then(Value::as_u64);
    item.hash_fields = find_hash_fields(block);
    item.requires_signed_query = signed;
    if kind == MediaKind::Video {
        item.metadata = Some(video_metadata(block, ctx));
    }

    Some(item)
}

/// Parse a full post into its record and media pool.
pub fn parse_post(raw: &RawPost) -> PostRecord {
    let ctx = BlockContext {
        post_id: &raw.id,
        post_title: &raw.title,
        signed_query: &raw.signed_query,
    };

    let mut text = String::new();
    let mut media = MediaPool::new();

    for block in &raw.data {
        match block.get("type").and_then(Value::as_str) {
            Some("text") => {
                if let Some(content) = block.get("content").and_then(Value::as_str) {
                    text.push_str(&decode_text_content(content));
                }
                if block.get("modificator").and_then(Value::as_str) == Some("BLOCK_END") {
                    text.push('\n');
                }
            }
            Some("link") => {
                let label = block
                    .get("content")
                    .and_then(Value::as_str)
                    .map(decode_text_content)
                    .unwrap_or_default();
                let url = str_field(block, "url").unwrap_or_default();
                if label.is_empty() || label == url {
                    text.push_str(&url);
                } else {
                    text.push_str(&format!("{} ({})", label, url));
                }
            }
            _ => {
                if let Some(item) = parse_media_block(block, ctx) {
                    media.add(item);
                }
            }
        }
    }

    PostRecord {
        id: raw.id.clone(),
        title: raw.title.trim().to_string(),
        text_content: text,
        media,
    }
}

/// Boosty text content is a JSON array whose first element is the text.
fn decode_text_content(content: &str) -> String {
    match serde_json::from_str::<Value>(content) {
        Ok(Value::Array(parts)) => parts
            .first()
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => content.to_string(),
    }
}

/// Pick the best-quality non-empty player URL.
fn select_player_url(block: &Map<String, Value>) -> Option<String> {
    let urls = block.get("playerUrls")?.as_array()?;

    urls.iter()
        .filter_map(|entry| {
            let url = entry.get("url")?.as_str()?;
            if url.is_empty() {
                return None;
            }
            let quality = entry.get("type").and_then(Value::as_str).unwrap_or("");
            let rank = PLAYER_QUALITY_ORDER
                .iter()
                .position(|q| *q == quality)
                .map(|pos| PLAYER_QUALITY_ORDER.len() - pos)
                .unwrap_or(0);
            Some((rank, url))
        })
        .max_by_key(|(rank, _)| *rank)
        .map(|(_, url)| url.to_string())
}

fn video_metadata(block: &Map<String, Value>, ctx: BlockContext<'_>) -> Map<String, Value> {
    let mut meta = Map::new();
    for key in ["title", "duration", "preview", "width", "height"] {
        if let Some(value) = block.get(key).filter(|v| !v.is_null()) {
            meta.insert(key.to_string(), value.clone());
        }
    }
    if !ctx.post_id.is_empty() {
        meta.insert("post_id".into(), Value::String(ctx.post_id.to_string()));
    }
    if !ctx.post_title.is_empty() {
        meta.insert("post_title".into(), Value::String(ctx.post_title.to_string()));
    }
    meta
}

fn block_id(block: &Map<String, Value>) -> Option<String> {
    match block.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn str_field(block: &Map<String, Value>, key: &str) -> Option<String> {
    block
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn block(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_find_hash_fields() {
        let b = block(json!({"id": "1", "md5Hash": "abc", "SHA256": "def", "fileChecksum": 7, "size": 3, "hash": null}));
        let fields = find_hash_fields(&b);
        assert_eq!(fields.len(), 3);
        assert_eq!(fields["md5Hash"], "abc");
        assert_eq!(fields["fileChecksum"], "7");
        assert!(!fields.contains_key("size"));
    }

    #[test]
    fn test_signed_query_only_for_restricted_kinds() {
        let ctx = BlockContext { signed_query: "?sig=1", ..Default::default() };

        let audio = parse_media_block(
            &block(json!({"type": "audio_file", "id": "a", "url": "https://x/a"})),
            ctx,
        )
        .unwrap();
        assert_eq!(audio.url, "https://x/a?sig=1");
        assert!(audio.requires_signed_query);

        let image = parse_media_block(
            &block(json!({"type": "image", "id": "i", "url": "https://x/i"})),
            ctx,
        )
        .unwrap();
        assert_eq!(image.url, "https://x/i");
        assert!(!image.requires_signed_query);
    }

    #[test]
    fn test_video_picks_best_quality() {
        let b = block(json!({
            "type": "ok_video", "id": "v", "title": "clip",
            "playerUrls": [
                {"type": "low", "url": "https://x/low"},
                {"type": "full_hd", "url": "https://x/fhd"},
                {"type": "ultra_hd", "url": ""},
                {"type": "hls", "url": "https://x/v.m3u8"}
            ]
        }));
        let ctx = BlockContext { post_id: "p1", ..Default::default() };
        let item = parse_media_block(&b, ctx).unwrap();
        assert_eq!(item.kind, MediaKind::Video);
        assert_eq!(item.url, "https://x/fhd");
        let meta = item.metadata.unwrap();
        assert_eq!(meta["title"], "clip");
        assert_eq!(meta["post_id"], "p1");
    }

    #[test]
    fn test_parse_post_text_and_media() {
        let raw = RawPost {
            id: "p1".into(),
            title: " Title ".into(),
            signed_query: "?s".into(),
            data: vec![
                block(json!({"type": "text", "content": "[\"Hello\",\"unstyled\",[]]", "modificator": ""})),
                block(json!({"type": "text", "content": "", "modificator": "BLOCK_END"})),
                block(json!({"type": "link", "content": "[\"site\",\"unstyled\",[]]", "url": "https://s"})),
                block(json!({"type": "image", "id": "i1", "url": "https://x/1", "size": 10})),
                block(json!({"type": "file", "id": "f1", "url": "https://x/f", "title": "a.zip"})),
                block(json!({"type": "smile", "id": "s"})),
            ],
            has_access: Some(true),
        };

        let post = parse_post(&raw);
        assert_eq!(post.title, "Title");
        assert_eq!(post.text_content, "Hello\nsite (https://s)");
        assert_eq!(post.media.len(), 2);
        let image = post.media.of_kind(MediaKind::Image).next().unwrap();
        assert_eq!(image.declared_size, Some(10));
        let file = post.media.of_kind(MediaKind::File).next().unwrap();
        assert_eq!(file.url, "https://x/f?s");
        assert_eq!(file.file_name(), "a.zip");
    }
}
