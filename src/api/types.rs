//! API response type definitions.

use serde::Deserialize;
use serde_json::{Map, Value};

/// Pagination trailer shared by list endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extra {
    #[serde(default)]
    pub is_last: bool,
    /// Next-page token. Boosty sends it as a string, but numbers are accepted too.
    #[serde(default)]
    pub offset: Option<Value>,
}

impl Extra {
    /// The next-page token as a string, if any.
    pub fn offset_token(&self) -> Option<String> {
        match self.offset.as_ref()? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// A post as returned by the blog endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPost {
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Content blocks (text, links, images, videos, audio, files).
    #[serde(default)]
    pub data: Vec<Map<String, Value>>,
    /// Query string granting access to restricted assets.
    #[serde(default)]
    pub signed_query: String,
    #[serde(default)]
    pub has_access: Option<bool>,
}

/// `GET /v1/blog/{creator}/post/` response.
#[derive(Debug, Deserialize)]
pub struct PostsResponse {
    #[serde(default)]
    pub data: Vec<RawPost>,
    #[serde(default)]
    pub extra: Extra,
}

/// `GET /v1/blog/{creator}/media_album/` response.
#[derive(Debug, Deserialize)]
pub struct MediaAlbumResponse {
    #[serde(default)]
    pub data: MediaAlbumData,
    #[serde(default)]
    pub extra: Extra,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaAlbumData {
    #[serde(default)]
    pub media_posts: Vec<MediaPost>,
}

/// One post's worth of media in a media album page.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaPost {
    #[serde(default)]
    pub post: Option<MediaPostHeader>,
    #[serde(default)]
    pub media: Vec<Map<String, Value>>,
}

/// The slice of post fields a media album entry carries.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaPostHeader {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub signed_query: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_token_variants() {
        let extra: Extra = serde_json::from_str(r#"{"isLast":false,"offset":"1700:55"}"#).unwrap();
        assert_eq!(extra.offset_token().as_deref(), Some("1700:55"));

        let extra: Extra = serde_json::from_str(r#"{"isLast":true,"offset":1700}"#).unwrap();
        assert_eq!(extra.offset_token().as_deref(), Some("1700"));
        assert!(extra.is_last);

        let extra: Extra = serde_json::from_str(r#"{"offset":""}"#).unwrap();
        assert_eq!(extra.offset_token(), None);
    }

    #[test]
    fn test_media_album_parsing() {
        let json = r#"{
            "data": {"mediaPosts": [{"post": {"id": "p1", "title": "T", "signedQuery": "?s=1"},
                                     "media": [{"type": "image", "id": "i1", "url": "https://img/1"}]}]},
            "extra": {"isLast": true, "offset": "100"}
        }"#;
        let resp: MediaAlbumResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.data.media_posts.len(), 1);
        assert_eq!(resp.data.media_posts[0].media.len(), 1);
        assert_eq!(
            resp.data.media_posts[0].post.as_ref().unwrap().signed_query,
            "?s=1"
        );
    }
}
