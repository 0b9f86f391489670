//! Boosty API HTTP client.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{header, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::api::source::{ContentSource, ContentStream, FeedPage, FeedSource, PostLookup};
use crate::api::types::{MediaAlbumResponse, PostsResponse, RawPost};
use crate::error::{Error, Result};
use crate::media::parser::BlockContext;
use crate::media::{parse_media_block, parse_post, MediaPool};
use crate::store::StreamKey;

/// Boosty API base URL.
const API_BASE: &str = "https://api.boosty.to";

/// Posts requested per posts page.
pub const POSTS_PAGE_SIZE: u32 = 20;

/// Media items requested per media album page.
pub const MEDIA_PAGE_SIZE: u32 = 300;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36";

/// Browser session credentials.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub cookie: String,
    pub authorization: String,
}

/// Boosty API client.
pub struct BoostyApi {
    client: Client,
    base_url: Url,
    credentials: Option<Credentials>,
}

impl BoostyApi {
    /// Create a new API client. Requests are authenticated only when credentials are given.
    pub fn new(credentials: Option<Credentials>) -> Result<Self> {
        Self::with_base_url(API_BASE, credentials)
    }

    /// Create a client talking to a different host.
    pub fn with_base_url(base_url: &str, credentials: Option<Credentials>) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        let mut headers = header::HeaderMap::new();
        headers.insert(
            "Sec-Ch-Ua",
            header::HeaderValue::from_static(
                "\"Google Chrome\";v=\"123\", \"Not:A-Brand\";v=\"8\", \"Chromium\";v=\"123\"",
            ),
        );
        headers.insert("Sec-Ch-Ua-Mobile", header::HeaderValue::from_static("?0"));
        headers.insert(
            "Sec-Ch-Ua-Platform",
            header::HeaderValue::from_static("\"Windows\""),
        );

        let client = Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Api(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }

    /// Whether requests carry authorization.
    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }

    /// Build authorization headers for API requests.
    fn auth_headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        if let Some(creds) = &self.credentials {
            headers.insert(
                header::COOKIE,
                creds
                    .cookie
                    .parse()
                    .map_err(|_| Error::Config("cookie contains invalid characters".into()))?,
            );
            headers.insert(
                header::AUTHORIZATION,
                creds.authorization.parse().map_err(|_| {
                    Error::Config("authorization contains invalid characters".into())
                })?,
            );
        }
        Ok(headers)
    }

    /// Make an authenticated GET request against the API.
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Response> {
        let url = self.base_url.join(path)?;
        tracing::debug!("GET {} {:?}", url, query);

        let response = self
            .client
            .get(url)
            .query(query)
            .headers(self.auth_headers()?)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("Response status: {}", status);

        // Check for rate limiting
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited(60));
        }

        // Check for auth errors
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Auth error response: {}", body);
            return Err(Error::Authentication(format!(
                "HTTP {}: {}",
                status,
                if body.is_empty() {
                    "Authentication failed"
                } else {
                    &body
                }
            )));
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        what: &str,
    ) -> Result<T> {
        let response = self.get(path, query).await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(Error::Api(format!(
                "Failed to get {}: HTTP {} - {}",
                what,
                status,
                excerpt(&text)
            )));
        }

        serde_json::from_str(&text).map_err(|e| {
            Error::Api(format!(
                "Failed to parse {}: {} - Response: {}",
                what,
                e,
                excerpt(&text)
            ))
        })
    }

    async fn fetch_media_album(
        &self,
        creator: &str,
        stream: StreamKey,
        offset: Option<&str>,
    ) -> Result<FeedPage> {
        let kind = stream
            .media_kind()
            .ok_or_else(|| Error::Api(format!("{} is not a media stream", stream)))?;
        let album_type = match stream {
            StreamKey::Photo => "image",
            StreamKey::Video => "video",
            _ => "audio",
        };

        let mut query = vec![
            ("type", album_type.to_string()),
            ("limit_by", "media".to_string()),
            ("limit", MEDIA_PAGE_SIZE.to_string()),
        ];
        if let Some(offset) = offset {
            query.push(("offset", offset.to_string()));
        }

        let path = format!("/v1/blog/{}/media_album/", creator);
        let response: MediaAlbumResponse = self.get_json(&path, &query, "media album").await?;

        let mut media = MediaPool::new();
        for entry in &response.data.media_posts {
            let post = entry.post.clone().unwrap_or_default();
            let ctx = BlockContext {
                post_id: &post.id,
                post_title: &post.title,
                signed_query: &post.signed_query,
            };
            for block in &entry.media {
                if let Some(item) = parse_media_block(block, ctx).filter(|i| i.kind == kind) {
                    media.add(item);
                }
            }
        }

        Ok(FeedPage {
            media,
            posts: Vec::new(),
            next_offset: response.extra.offset_token(),
            is_last: response.extra.is_last,
        })
    }

    async fn fetch_posts(&self, creator: &str, offset: Option<&str>) -> Result<FeedPage> {
        let mut query = vec![("limit", POSTS_PAGE_SIZE.to_string())];
        if let Some(offset) = offset {
            query.push(("offset", offset.to_string()));
        }

        let path = format!("/v1/blog/{}/post/", creator);
        let response: PostsResponse = self.get_json(&path, &query, "posts").await?;

        Ok(FeedPage {
            media: MediaPool::new(),
            posts: response.data.iter().map(parse_post).collect(),
            next_offset: response.extra.offset_token(),
            is_last: response.extra.is_last,
        })
    }

    /// Download a file from a URL (streaming).
    pub async fn download_file(&self, url: &str) -> Result<Response> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(Error::Download(format!(
                "Failed to download file: HTTP {}",
                response.status()
            )));
        }

        Ok(response)
    }
}

#[async_trait]
impl FeedSource for BoostyApi {
    async fn fetch_page(
        &self,
        stream: StreamKey,
        creator: &str,
        offset: Option<&str>,
    ) -> Result<FeedPage> {
        match stream {
            StreamKey::Posts => self.fetch_posts(creator, offset).await,
            _ => self.fetch_media_album(creator, stream, offset).await,
        }
    }

    async fn fetch_post(&self, creator: &str, post_id: &str) -> Result<PostLookup> {
        let path = format!("/v1/blog/{}/post/{}", creator, post_id);
        let response = self.get(&path, &[]).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(PostLookup::NotFound);
        }
        if !response.status().is_success() {
            return Err(Error::Api(format!(
                "Failed to get post {}: HTTP {}",
                post_id,
                response.status()
            )));
        }

        let text = response.text().await?;
        let raw: RawPost = serde_json::from_str(&text)
            .map_err(|e| Error::Api(format!("Failed to parse post: {} - Response: {}", e, text)))?;

        Ok(PostLookup::Found(parse_post(&raw)))
    }
}

#[async_trait]
impl ContentSource for BoostyApi {
    async fn probe_length(&self, url: &str) -> Option<u64> {
        // HEAD first
        match self.client.head(url).send().await {
            Ok(resp) if matches!(resp.status().as_u16(), 200 | 206) => {
                if let Some(len) = header_u64(&resp, header::CONTENT_LENGTH) {
                    return Some(len);
                }
            }
            Ok(resp) => tracing::debug!("HEAD {} returned {}", url, resp.status()),
            Err(e) => tracing::debug!("HEAD {} failed: {}", url, e),
        }

        // Fallback: single-byte range request
        let resp = self
            .client
            .get(url)
            .header(header::RANGE, "bytes=0-0")
            .send()
            .await
            .ok()?;
        match resp.status().as_u16() {
            // Content-Length of a partial response is the range size, not the file size
            206 => content_range_total(&resp),
            200 => header_u64(&resp, header::CONTENT_LENGTH),
            _ => None,
        }
    }

    async fn open(&self, url: &str) -> Result<ContentStream> {
        let response = self.download_file(url).await?;
        let content_length = response.content_length();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| Error::Download(format!("Stream error: {}", e))))
            .boxed();

        Ok(ContentStream {
            content_length,
            body,
        })
    }
}

/// First characters of a response body, for error messages.
fn excerpt(text: &str) -> String {
    text.chars().take(500).collect()
}

fn header_u64(resp: &Response, name: header::HeaderName) -> Option<u64> {
    resp.headers()
        .get(name)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Total size from `Content-Range: bytes 0-0/12345`.
fn content_range_total(resp: &Response) -> Option<u64> {
    let value = resp.headers().get(header::CONTENT_RANGE)?.to_str().ok()?;
    value.rsplit('/').next()?.trim().parse().ok()
}
