//! Boosty API module.
//!
//! This module provides:
//! - The feed and content traits the sync engine consumes
//! - HTTP client for the Boosty REST API
//! - API response types

pub mod client;
pub mod source;
pub mod types;

pub use client::{BoostyApi, Credentials};
pub use source::{ContentSource, ContentStream, FeedPage, FeedSource, PostLookup};
