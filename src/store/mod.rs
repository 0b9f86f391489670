//! Persistent sync state.
//!
//! This module provides:
//! - Per-stream checkpoints (high-water mark and crash-resume offset)
//! - The post path registry used by masquerade mode
//! - Per-file locks serializing access to both

pub mod checkpoint;
pub mod lock;
pub mod registry;

pub use checkpoint::{CheckpointRecord, CheckpointStore, StreamKey, SyncData};
pub use lock::FileLocks;
pub use registry::{PathRegistry, PathRegistryEntry};
