//! Boosty Downloader - incremental sync of Boosty creators' feeds.
//!
//! This library mirrors a creator's posts and media into a local directory and keeps
//! it up to date: each run only walks the feed back to where the previous run ended.
//!
//! # Features
//!
//! - Media mode (per-kind folders) and post mode (one directory per post)
//! - Checkpointed pagination with crash resume
//! - Concurrency-bounded downloads with `.part` files and integrity checks
//! - Detection of truncated files with opt-in re-download
//! - Stable human-readable post directories ("masquerade" mode)
//! - Batch sync of post link lists
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use boosty_downloader::{BoostyApi, Config, SyncStats, Syncer};
//! use boosty_downloader::store::StreamKey;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(Path::new("config.toml"))?;
//!     let credentials = config.credentials();
//!     let settings = config.sync_settings(credentials.is_some());
//!     let api = Arc::new(BoostyApi::new(credentials)?);
//!
//!     let syncer = Syncer::new(api.clone(), api, settings, Arc::new(SyncStats::new()));
//!     let resume = syncer.pending_resume("creator").await?;
//!     syncer.run_media_sync("creator", &StreamKey::MEDIA, &resume).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod fs;
pub mod media;
pub mod output;
pub mod store;

// Re-exports for convenience
pub use api::{BoostyApi, ContentSource, FeedSource};
pub use config::{Config, StorageType};
pub use download::{BatchReport, PostLink, PostSyncOutcome, SyncSettings, SyncStats, Syncer};
pub use error::{Error, Result};
pub use media::{MediaItem, MediaKind};
