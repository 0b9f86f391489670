//! Media module for item representation and parsing.

pub mod item;
pub mod parser;
pub mod pool;

pub use item::{MediaItem, MediaKind};
pub use parser::{find_hash_fields, parse_media_block, parse_post};
pub use pool::{MediaPool, PostRecord};
