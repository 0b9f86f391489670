//! Download module for feed synchronization.
//!
//! This module provides:
//! - The pagination cursor and stream driver
//! - The concurrency-bounded download manager with integrity checks
//! - Media, post, single post and batch sync on top of them
//! - Download statistics

pub mod batch;
pub mod cursor;
pub mod manager;
pub mod posts;
pub mod single;
pub mod stats;
pub mod stream;
pub mod sync;
pub mod verify;

pub use batch::{BatchReport, PostLink};
pub use cursor::{parse_offset_time, StreamCursor};
pub use manager::{DownloadManager, DownloadOutcome, DownloadSettings, KindReport};
pub use single::{PostSyncOutcome, SinglePostResult};
pub use stats::{StatsSnapshot, SyncStats};
pub use sync::{MediaSelection, ResumeOffsets, SyncSettings, Syncer};
